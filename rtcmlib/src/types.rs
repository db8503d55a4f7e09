//! Core data model (§3): satellite keys, per-signal observations, epochs.

use std::collections::BTreeMap;
use std::fmt;

use hifitime::Epoch;

/// UTC instant carried on an [`EpochObservation`]. `hifitime::Epoch` already
/// tracks its own time scale, so we keep it as a transparent alias rather
/// than wrapping it.
pub type UtcTimestamp = Epoch;

/// A `<sys><nn>` satellite identifier, e.g. `G01`, `R24`, `E05`, `C14`.
///
/// `sys` is one of `G` (GPS), `R` (GLONASS), `E` (Galileo), `C` (BeiDou),
/// `J` (QZSS) or `S` (SBAS); `prn` is the zero-padded per-constellation
/// satellite number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SatKey {
    pub sys: char,
    pub prn: u8,
}

impl SatKey {
    pub fn new(sys: char, prn: u8) -> Self {
        Self { sys, prn }
    }
}

impl fmt::Display for SatKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:02}", self.sys, self.prn)
    }
}

/// One signal's worth of observables on one satellite, for one epoch.
///
/// `pseudorange_m` and `carrier_phase_cyc` of `0.0` denote "absent" (the
/// decoder already resolved the RTCM per-DF sentinel values at parse time;
/// by the time a [`SignalObservation`] exists, `0.0` simply means unset).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalObservation {
    pub pseudorange_m: f64,
    pub carrier_phase_cyc: f64,
    pub doppler_hz: f64,
    pub snr_dbhz: f64,
    pub lock_time: u32,
    pub half_cycle_flag: u8,
}

impl Default for SignalObservation {
    fn default() -> Self {
        Self {
            pseudorange_m: 0.0,
            carrier_phase_cyc: 0.0,
            doppler_hz: 0.0,
            snr_dbhz: 0.0,
            lock_time: 0,
            half_cycle_flag: 0,
        }
    }
}

/// Signal identifier, e.g. `"1C"`, `"2W"`, `"5Q"`. Small enough to keep as
/// a fixed two-byte array rather than a heap-allocated `String`.
pub type SignalId = [u8; 2];

pub fn signal_id(band: u8, attribute: char) -> SignalId {
    [band, attribute as u8]
}

pub fn signal_id_str(id: &SignalId) -> String {
    format!("{}{}", id[0] as char, id[1] as char)
}

/// Per-satellite state within one epoch: geometry (once an ephemeris and an
/// approximate receiver position are available) plus the signals observed.
#[derive(Debug, Clone)]
pub struct SatelliteState {
    pub sys: char,
    pub prn: u8,
    pub azimuth_deg: Option<f64>,
    pub elevation_deg: Option<f64>,
    pub pos_ecef_m: Option<[f64; 3]>,
    pub signals: BTreeMap<SignalId, SignalObservation>,
}

impl SatelliteState {
    pub fn new(sys: char, prn: u8) -> Self {
        Self {
            sys,
            prn,
            azimuth_deg: None,
            elevation_deg: None,
            pos_ecef_m: None,
            signals: BTreeMap::new(),
        }
    }
}

/// All observations sharing one decoded MSM message (a single-constellation
/// fragment of a UTC second); merged by [`crate::merger::EpochMerger`] into
/// a whole-second epoch before being handed to the solver.
#[derive(Debug, Clone)]
pub struct EpochObservation {
    pub gps_tow_s: f64,
    pub utc_datetime: UtcTimestamp,
    pub satellites: BTreeMap<SatKey, SatelliteState>,
}

impl EpochObservation {
    pub fn new(gps_tow_s: f64, utc_datetime: UtcTimestamp) -> Self {
        Self {
            gps_tow_s,
            utc_datetime,
            satellites: BTreeMap::new(),
        }
    }

    /// `floor_to_second(utc_datetime)` merge key (§3 invariants, §4.7).
    pub fn utc_second_key(&self) -> i64 {
        self.utc_datetime.to_gpst_seconds().floor() as i64
    }

    /// Merge `other`'s satellites into `self`, last-writer-wins per key
    /// (§4.7: "last-writer-wins for duplicate satellite keys within the
    /// same second").
    pub fn merge_from(&mut self, other: EpochObservation) {
        for (key, state) in other.satellites {
            self.satellites.insert(key, state);
        }
    }
}
