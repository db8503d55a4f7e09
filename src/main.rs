use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use log::{info, warn};

use rtcmlib::config::{ApproxPosition, Config, LoggingSettings};
use rtcmlib::ephemeris::cache::EphemerisStore;
use rtcmlib::transport::ntrip::NtripClient;
use rtcmlib::transport::serial::SerialTransport;
use rtcmlib::transport::Reader;
use rtcmlib::{pipeline, EphemerisCache, PipelineEvent};

#[derive(Parser)]
#[command(name = "gnss-rtproc", version, author = "Urban Traction, Inc.")]
#[command(about = "Real-time RTCM3 GNSS decoder and single-point-positioning engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream a live RTCM3 feed and print SPP solutions as they arrive.
    Stream {
        /// NTRIP caster hostname; omit to use a local serial receiver instead.
        #[arg(long)]
        host: Option<String>,
        #[arg(long, default_value_t = 2101)]
        port: u16,
        #[arg(long, default_value = "")]
        mountpoint: String,
        #[arg(long, default_value = "")]
        user: String,
        #[arg(long, default_value = "")]
        password: String,
        /// Serial device path; used when `--host` is not given.
        #[arg(long, default_value = "/dev/ttyUSB0")]
        serial_port: String,
        #[arg(long, default_value_t = 115_200)]
        baudrate: u32,
        /// Constellation letters to decode, e.g. "GREC".
        #[arg(long, default_value = "GREC")]
        systems: String,
        #[arg(long, default_value_t = 10.0)]
        cutoff_elevation_deg: f64,
        /// Directory for recorded raw RTCM / CSV output; omit to disable
        /// recording entirely.
        #[arg(long)]
        log_dir: Option<String>,
        /// Record a byte-faithful copy of every frame under `log_dir`.
        #[arg(long, requires = "log_dir")]
        log_raw: bool,
        /// Record sampled per-signal observation rows under `log_dir`.
        #[arg(long, requires = "log_dir")]
        log_csv: bool,
        #[arg(long, default_value_t = 3600)]
        log_rotation_secs: u64,
        #[arg(long, default_value_t = 1000)]
        log_csv_sample_interval_ms: u64,
    },
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Stream {
            host,
            port,
            mountpoint,
            user,
            password,
            serial_port,
            baudrate,
            systems,
            cutoff_elevation_deg,
            log_dir,
            log_raw,
            log_csv,
            log_rotation_secs,
            log_csv_sample_interval_ms,
        } => stream(
            host,
            port,
            mountpoint,
            user,
            password,
            serial_port,
            baudrate,
            systems,
            cutoff_elevation_deg,
            log_dir,
            log_raw,
            log_csv,
            log_rotation_secs,
            log_csv_sample_interval_ms,
        ),
    }
}

#[allow(clippy::too_many_arguments)]
fn stream(
    host: Option<String>,
    port: u16,
    mountpoint: String,
    user: String,
    password: String,
    serial_port: String,
    baudrate: u32,
    systems: String,
    cutoff_elevation_deg: f64,
    log_dir: Option<String>,
    log_raw: bool,
    log_csv: bool,
    log_rotation_secs: u64,
    log_csv_sample_interval_ms: u64,
) {
    let mount_label = if !mountpoint.is_empty() { mountpoint.clone() } else { serial_port.clone() };

    let mut config = Config {
        target_systems: systems.chars().collect(),
        cutoff_elevation_deg,
        ..Config::default()
    };
    config.obs_settings.host = host.clone().unwrap_or_default();
    config.obs_settings.port = port;
    config.obs_settings.mountpoint = mountpoint.clone();
    config.obs_settings.user = user.clone();
    config.obs_settings.password = password.clone();
    config.obs_settings.serial_port = serial_port.clone();
    config.obs_settings.baudrate = baudrate;
    if let Some(dir) = log_dir {
        config.logging = Some(LoggingSettings {
            directory: Some(std::path::PathBuf::from(dir)),
            mount_label,
            raw_rtcm_enabled: log_raw,
            csv_enabled: log_csv,
            rotation_period: Duration::from_secs(log_rotation_secs),
            csv_sample_interval: Duration::from_millis(log_csv_sample_interval_ms),
        });
    }

    let ephemeris: Arc<dyn EphemerisStore> = Arc::new(EphemerisCache::new());
    let approx_position = Arc::new(ApproxPosition::new(config.initial_guess_ecef_m));

    let (solution_tx, solution_rx) = mpsc::channel();

    let reconnect = move || -> Result<Box<dyn Reader>, rtcmlib::error::TransportError> {
        if let Some(host) = &host {
            let mut client = NtripClient::new(host.clone(), port, mountpoint.clone(), &user, &password);
            client.connect()?;
            Ok(Box::new(client) as Box<dyn Reader>)
        } else {
            // Long enough that a quiet inter-epoch gap at 1 Hz doesn't read
            // back as a 0-byte EOF and trigger a spurious reconnect.
            let mut serial = SerialTransport::new(serial_port.clone(), baudrate, Duration::from_secs(3));
            serial.connect()?;
            Ok(Box::new(serial) as Box<dyn Reader>)
        }
    };

    let (handle, events) = pipeline::spawn(config, ephemeris, approx_position, reconnect, solution_tx);

    let shutdown = Arc::new(AtomicBool::new(false));
    ctrlc_handler(shutdown.clone());

    loop {
        while let Ok(event) = events.try_recv() {
            match event {
                PipelineEvent::Log(msg) => info!("{msg}"),
                PipelineEvent::Status { name, active } => {
                    info!("status: {name} {}", if active { "up" } else { "down" })
                }
            }
        }
        while let Ok(solution) = solution_rx.try_recv() {
            info!(
                "fix {:?}: lat={:.7} lon={:.7} h={:.2}m sats={} hdop={:.2}",
                solution.status, solution.lat_deg, solution.lon_deg, solution.height_m, solution.num_satellites, solution.dop.hdop
            );
        }
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        std::thread::sleep(Duration::from_millis(50));
    }

    warn!("shutting down");
    handle.stop();
    handle.join();
}

/// No `ctrlc` crate in the teacher's or pack's manifests, so there is no
/// signal trap here; embedders of this binary get cooperative shutdown via
/// the `Pipeline` handle only. Kept as a named no-op so the intent (and
/// its absence) is visible at the call site rather than silently missing.
fn ctrlc_handler(_shutdown: Arc<AtomicBool>) {}
