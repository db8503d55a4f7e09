//! Thread orchestration (§5): I/O, Decoder and Positioning threads wired
//! over bounded ring buffers, mirroring `ui/monitoring/workers.py` and
//! `ui/positioning/workers.py`'s three-thread shape without the Qt signal
//! bus — solutions and log lines are delivered over `std::sync::mpsc`
//! instead of Qt signals, and shutdown is a shared `AtomicBool` rather
//! than a Qt slot.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{error, info, warn};

use crate::config::{ApproxPosition, Config, LoggingSettings};
use crate::decoder::{DecodedMessage, MessageDecoder};
use crate::ephemeris::cache::EphemerisStore;
use crate::framer::RtcmFramer;
use crate::geometry::azimuth_elevation;
use crate::logger::{ObservationCsvLogger, RawFrameLogger};
use crate::merger::EpochMerger;
use crate::ringbuffer::RingBuffer;
use crate::solver::{self, PositioningSolution, PositionTrack, PositioningStats};
use crate::transport::Reader;
use crate::types::EpochObservation;

/// How long the I/O thread backs off between reconnect attempts, polled in
/// 100ms slices so shutdown stays responsive during the wait (§5, ported
/// from `ui/monitoring/workers.py`'s "wait 2-3s and reconnect").
const RECONNECT_BACKOFF: Duration = Duration::from_secs(3);
const RECONNECT_POLL: Duration = Duration::from_millis(100);
const GET_TIMEOUT: Duration = Duration::from_millis(100);

/// One line of status/log chatter, the Rust stand-in for
/// `PositioningSignals.log_signal`/`status_signal`.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    Log(String),
    Status { name: &'static str, active: bool },
}

/// Running handles for a started pipeline. Dropping this does not stop the
/// threads; call [`Pipeline::stop`] and then [`Pipeline::join`].
pub struct Pipeline {
    running: Arc<AtomicBool>,
    handles: Vec<JoinHandle<()>>,
}

impl Pipeline {
    /// Signal every thread to stop at its next blocking-call boundary and
    /// wake any blocked ring-buffer consumer (§5 "`close()` wakes blocked
    /// `get`/`put`").
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn join(self) {
        for handle in self.handles {
            let _ = handle.join();
        }
    }
}

/// Spawn the I/O, Decoder and Positioning threads described by §5, wired
/// front-to-back: `reader` feeds an `RtcmFramer` over a byte ring buffer,
/// decoded epochs flow through an `EpochMerger` to the WLS-SPP solver, and
/// solutions land on `solution_tx`. `reconnect` is called to obtain a fresh
/// `Reader` each time the current one reports a transport error, mirroring
/// the Python monitoring thread's "reconnect on failure" loop.
pub fn spawn<R, F>(
    config: Config,
    ephemeris: Arc<dyn EphemerisStore>,
    approx_position: Arc<ApproxPosition>,
    mut reconnect: F,
    solution_tx: Sender<PositioningSolution>,
) -> (Pipeline, Receiver<PipelineEvent>)
where
    R: Reader + 'static,
    F: FnMut() -> Result<R, crate::error::TransportError> + Send + 'static,
{
    let running = Arc::new(AtomicBool::new(true));
    let (event_tx, event_rx) = mpsc::channel();

    let raw_bytes: Arc<RingBuffer<Vec<u8>>> = Arc::new(RingBuffer::new(config.ring_buffer_capacity));
    let fragments: Arc<RingBuffer<EpochObservation>> = Arc::new(RingBuffer::new(config.ring_buffer_capacity));

    // Logger (optional, §5): a raw-frame ring and a merged-epoch ring, each
    // only allocated when its half of `LoggingSettings` is actually enabled.
    let raw_frame_log: Option<Arc<RingBuffer<Vec<u8>>>> = config
        .logging
        .as_ref()
        .filter(|l| l.raw_rtcm_enabled)
        .map(|_| Arc::new(RingBuffer::new(config.ring_buffer_capacity)));
    let epoch_log: Option<Arc<RingBuffer<EpochObservation>>> = config
        .logging
        .as_ref()
        .filter(|l| l.csv_enabled)
        .map(|_| Arc::new(RingBuffer::new(config.ring_buffer_capacity)));

    let io_handle = {
        let running = running.clone();
        let raw_bytes = raw_bytes.clone();
        let event_tx = event_tx.clone();
        thread::spawn(move || io_thread(running, raw_bytes, &mut reconnect, event_tx))
    };

    let decoder_handle = {
        let running = running.clone();
        let raw_bytes = raw_bytes.clone();
        let fragments = fragments.clone();
        let ephemeris = ephemeris.clone();
        let approx_position = approx_position.clone();
        let event_tx = event_tx.clone();
        let target_systems = config.target_systems.clone();
        let raw_frame_log = raw_frame_log.clone();
        thread::spawn(move || {
            decoder_thread(
                running,
                raw_bytes,
                fragments,
                ephemeris,
                approx_position,
                target_systems,
                raw_frame_log,
                event_tx,
            )
        })
    };

    let positioning_handle = {
        let running = running.clone();
        let event_tx = event_tx.clone();
        let epoch_log = epoch_log.clone();
        thread::spawn(move || {
            positioning_thread(
                running,
                fragments,
                config.clone(),
                approx_position_for_solver(&approx_position),
                epoch_log,
                solution_tx,
                event_tx,
            )
        })
    };

    let mut handles = vec![io_handle, decoder_handle, positioning_handle];
    if let Some(logging) = config.logging.clone() {
        let running = running.clone();
        let event_tx = event_tx.clone();
        handles.push(thread::spawn(move || {
            logger_thread(running, logging, raw_frame_log, epoch_log, event_tx)
        }));
    }

    (Pipeline { running, handles }, event_rx)
}

fn approx_position_for_solver(approx_position: &Arc<ApproxPosition>) -> Arc<ApproxPosition> {
    approx_position.clone()
}

/// Reads bytes from the transport and pushes them onto the raw ring
/// buffer; reconnects with a bounded, poll-responsive backoff on error
/// (§5, ported from `ui/monitoring/workers.py::run`).
fn io_thread<R, F>(
    running: Arc<AtomicBool>,
    raw_bytes: Arc<RingBuffer<Vec<u8>>>,
    reconnect: &mut F,
    event_tx: Sender<PipelineEvent>,
) where
    R: Reader + 'static,
    F: FnMut() -> Result<R, crate::error::TransportError>,
{
    let _ = event_tx.send(PipelineEvent::Log("I/O thread started".to_string()));

    let mut reader: Option<R> = None;
    let mut buf = [0u8; 4096];

    while running.load(Ordering::SeqCst) {
        if reader.is_none() {
            match reconnect() {
                Ok(r) => {
                    info!("transport connected");
                    let _ = event_tx.send(PipelineEvent::Status { name: "io", active: true });
                    reader = Some(r);
                }
                Err(e) => {
                    warn!("transport connect failed: {e}");
                    let _ = event_tx.send(PipelineEvent::Status { name: "io", active: false });
                    wait_with_shutdown_poll(&running, RECONNECT_BACKOFF);
                    continue;
                }
            }
        }

        let r = reader.as_mut().unwrap();
        match r.read(&mut buf) {
            Ok(0) => {
                warn!("transport returned EOF, reconnecting");
                r.close();
                reader = None;
                let _ = event_tx.send(PipelineEvent::Status { name: "io", active: false });
                wait_with_shutdown_poll(&running, RECONNECT_BACKOFF);
            }
            Ok(n) => {
                raw_bytes.put(buf[..n].to_vec(), false, None);
            }
            Err(e) => {
                warn!("transport read error: {e}, reconnecting");
                r.close();
                reader = None;
                let _ = event_tx.send(PipelineEvent::Status { name: "io", active: false });
                wait_with_shutdown_poll(&running, RECONNECT_BACKOFF);
            }
        }
    }

    if let Some(mut r) = reader {
        r.close();
    }
    raw_bytes.close();
    let _ = event_tx.send(PipelineEvent::Log("I/O thread stopped".to_string()));
}

fn wait_with_shutdown_poll(running: &AtomicBool, total: Duration) {
    let mut waited = Duration::ZERO;
    while waited < total && running.load(Ordering::SeqCst) {
        thread::sleep(RECONNECT_POLL);
        waited += RECONNECT_POLL;
    }
}

/// Frames raw bytes, decodes each frame, updates the ephemeris cache and
/// each observed satellite's geometry (position, azimuth, elevation), and
/// pushes the resulting `EpochObservation` fragments downstream (§4.1,
/// §4.6, §4.7; ported from `core/rtcm_handler.py::process_message`).
fn decoder_thread(
    running: Arc<AtomicBool>,
    raw_bytes: Arc<RingBuffer<Vec<u8>>>,
    fragments: Arc<RingBuffer<EpochObservation>>,
    ephemeris: Arc<dyn EphemerisStore>,
    approx_position: Arc<ApproxPosition>,
    target_systems: Vec<char>,
    raw_frame_log: Option<Arc<RingBuffer<Vec<u8>>>>,
    event_tx: Sender<PipelineEvent>,
) {
    let _ = event_tx.send(PipelineEvent::Log("decoder thread started".to_string()));

    let mut framer = RtcmFramer::new();
    let mut decoder = MessageDecoder::new(target_systems);

    while running.load(Ordering::SeqCst) {
        let Some(chunk) = raw_bytes.get(true, Some(GET_TIMEOUT)) else {
            if raw_bytes.is_closed() {
                break;
            }
            continue;
        };

        for frame in framer.feed(&chunk) {
            if let Some(raw_frame_log) = &raw_frame_log {
                raw_frame_log.put(frame.raw.clone(), false, None);
            }

            let now = hifitime::Epoch::now().unwrap_or(hifitime::Epoch::from_gpst_seconds(0.0));
            match decoder.decode(frame.message_type, &frame.payload, now) {
                Ok(Some(DecodedMessage::Ephemeris(eph))) => {
                    ephemeris.insert(eph);
                }
                Ok(Some(DecodedMessage::StationPosition(station))) => {
                    approx_position.set(station.ecef_m);
                }
                Ok(Some(DecodedMessage::Observation(mut epoch))) => {
                    update_geometry(&mut epoch, ephemeris.as_ref(), approx_position.get());
                    fragments.put(epoch, false, None);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("decode error on message {}: {e}", frame.message_type);
                }
            }
        }
    }

    fragments.close();
    if let Some(raw_frame_log) = &raw_frame_log {
        raw_frame_log.close();
    }
    let _ = event_tx.send(PipelineEvent::Log("decoder thread stopped".to_string()));
}

/// Resolve each satellite's ECEF position and az/el from the ephemeris
/// cache and the current approximate receiver position (§4.6's
/// `Observation.pos_ecef_m`/`elevation_deg`, computed here rather than in
/// the decoder itself since it needs ephemeris state the decoder doesn't
/// own).
fn update_geometry(epoch: &mut EpochObservation, ephemeris: &dyn EphemerisStore, approx_pos_m: [f64; 3]) {
    let know_approx = approx_pos_m != [0.0, 0.0, 0.0];
    for sat in epoch.satellites.values_mut() {
        let Some(pos) = ephemeris.propagate(crate::types::SatKey::new(sat.sys, sat.prn), epoch.gps_tow_s) else {
            continue;
        };
        sat.pos_ecef_m = Some(pos);
        if know_approx {
            let (az, el) = azimuth_elevation(approx_pos_m, pos);
            sat.azimuth_deg = Some(az);
            sat.elevation_deg = Some(el);
        }
    }
}

/// Consumes decoded fragments, merges same-second fragments via
/// `EpochMerger`, and runs the WLS-SPP solver on each completed epoch
/// (§4.7, §4.8; ported from `ui/positioning/workers.py::run`).
fn positioning_thread(
    running: Arc<AtomicBool>,
    fragments: Arc<RingBuffer<EpochObservation>>,
    config: Config,
    approx_position: Arc<ApproxPosition>,
    epoch_log: Option<Arc<RingBuffer<EpochObservation>>>,
    solution_tx: Sender<PositioningSolution>,
    event_tx: Sender<PipelineEvent>,
) {
    let _ = event_tx.send(PipelineEvent::Log("positioning thread started".to_string()));
    let _ = event_tx.send(PipelineEvent::Status { name: "positioning", active: true });

    let mut merger = EpochMerger::new();
    let mut track = PositionTrack::new(config.position_track_capacity);
    let mut stats = PositioningStats::default();

    let process = |epoch: EpochObservation,
                   approx_position: &Arc<ApproxPosition>,
                   track: &mut PositionTrack,
                   stats: &mut PositioningStats,
                   solution_tx: &Sender<PositioningSolution>| {
        let guess = if approx_position.is_known() {
            approx_position.get()
        } else {
            config.initial_guess_ecef_m
        };

        let started = std::time::Instant::now();
        match solver::solve(&epoch, guess, config.cutoff_elevation_deg, config.min_satellites, config.weight_mode, 0.0) {
            Ok(mut solution) => {
                solution.processing_time_ms = started.elapsed().as_secs_f64() * 1000.0;
                approx_position.set(solution.ecef_m);
                stats.update(&solution);
                track.push(solution.clone());
                let _ = solution_tx.send(solution);
            }
            Err(e) => {
                error!("solver error for epoch at GPS TOW {}: {e}", epoch.gps_tow_s);
            }
        }
    };

    while running.load(Ordering::SeqCst) {
        let Some(fragment) = fragments.get(true, Some(GET_TIMEOUT)) else {
            if fragments.is_closed() {
                if let Some(pending) = merger.flush() {
                    process(pending, &approx_position, &mut track, &mut stats, &solution_tx);
                }
                break;
            }
            continue;
        };

        if let Some(epoch) = merger.feed(fragment) {
            if let Some(epoch_log) = &epoch_log {
                epoch_log.put(epoch.clone(), false, None);
            }
            process(epoch, &approx_position, &mut track, &mut stats, &solution_tx);
        }
    }

    if let Some(epoch_log) = &epoch_log {
        epoch_log.close();
    }
    let _ = event_tx.send(PipelineEvent::Status { name: "positioning", active: false });
    let _ = event_tx.send(PipelineEvent::Log("positioning thread stopped".to_string()));
}

/// Drains whichever of the raw-frame / merged-epoch rings is enabled and
/// hands each item to the matching writer (§5 "Logger (optional)" thread,
/// §6 "Persisted state"; ported from `ui/monitoring/workers.py::LoggingThread`).
/// A closed, never-populated ring (the other sink disabled) reads back
/// `None` forever without blocking the live one, so a single thread can
/// serve both writers.
fn logger_thread(
    running: Arc<AtomicBool>,
    logging: LoggingSettings,
    raw_frame_log: Option<Arc<RingBuffer<Vec<u8>>>>,
    epoch_log: Option<Arc<RingBuffer<EpochObservation>>>,
    event_tx: Sender<PipelineEvent>,
) {
    let _ = event_tx.send(PipelineEvent::Log("logger thread started".to_string()));

    let directory = logging.directory.clone().unwrap_or_else(std::env::temp_dir);
    if let Err(e) = std::fs::create_dir_all(&directory) {
        error!("logger thread: cannot create {}: {e}", directory.display());
        let _ = event_tx.send(PipelineEvent::Log("logger thread stopped".to_string()));
        return;
    }

    let mut raw_logger = raw_frame_log.as_ref().and_then(|_| {
        RawFrameLogger::new(&directory, &logging.mount_label, logging.rotation_period)
            .map_err(|e| error!("logger thread: could not open raw RTCM sink: {e}"))
            .ok()
    });
    let mut csv_logger = epoch_log.as_ref().and_then(|_| {
        ObservationCsvLogger::new(&directory, &logging.mount_label, logging.rotation_period, logging.csv_sample_interval)
            .map_err(|e| error!("logger thread: could not open CSV sink: {e}"))
            .ok()
    });

    while running.load(Ordering::SeqCst) {
        let mut did_work = false;

        if let Some(ring) = &raw_frame_log {
            if let Some(frame) = ring.get(false, None) {
                did_work = true;
                if let Some(logger) = &mut raw_logger {
                    if let Err(e) = logger.write_frame(&frame) {
                        warn!("raw RTCM sink write failed: {e}");
                    }
                }
            } else if ring.is_closed() {
                raw_logger = None;
            }
        }

        if let Some(ring) = &epoch_log {
            if let Some(epoch) = ring.get(false, None) {
                did_work = true;
                if let Some(logger) = &mut csv_logger {
                    if let Err(e) = logger.sample(&epoch) {
                        warn!("observation CSV sink write failed: {e}");
                    }
                }
            } else if ring.is_closed() {
                csv_logger = None;
            }
        }

        if !did_work {
            thread::sleep(GET_TIMEOUT);
        }
    }

    let _ = event_tx.send(PipelineEvent::Log("logger thread stopped".to_string()));
}
