//! Layered configuration (§2, §6): a plain struct threaded through
//! constructors instead of `global_config.py`'s process-wide singleton
//! (§9 "Config threaded through constructors").

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use crate::solver::WeightMode;

/// Settings for the optional raw-frame / CSV recording sink (§5 "Logger
/// (optional)" thread, §6 "Persisted state"). `None` fields disable that
/// particular output; the pipeline only spawns a logger thread when at
/// least one is set.
#[derive(Debug, Clone, Default)]
pub struct LoggingSettings {
    pub directory: Option<std::path::PathBuf>,
    pub mount_label: String,
    pub raw_rtcm_enabled: bool,
    pub csv_enabled: bool,
    pub rotation_period: Duration,
    pub csv_sample_interval: Duration,
}

/// Connection parameters for one transport, NTRIP or serial.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub mountpoint: String,
    pub user: String,
    pub password: String,
    pub serial_port: String,
    pub baudrate: u32,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            host: String::new(),
            port: 2101,
            mountpoint: String::new(),
            user: String::new(),
            password: String::new(),
            serial_port: String::from("/dev/ttyUSB0"),
            baudrate: 115_200,
        }
    }
}

/// Engine-wide configuration (§2 ambient stack, §6 options table).
#[derive(Debug, Clone)]
pub struct Config {
    pub target_systems: Vec<char>,
    pub cutoff_elevation_deg: f64,
    pub min_satellites: usize,
    pub weight_mode: WeightMode,
    pub smoothing_window: usize,
    pub initial_guess_ecef_m: [f64; 3],
    pub obs_settings: ConnectionSettings,
    pub eph_settings: ConnectionSettings,
    pub ring_buffer_capacity: usize,
    pub position_track_capacity: usize,
    /// `None` disables the optional Logger thread (§5) entirely; `Some`
    /// spawns it with whichever of `raw_rtcm_enabled`/`csv_enabled` is set.
    pub logging: Option<LoggingSettings>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_systems: vec!['G', 'R', 'E', 'C'],
            cutoff_elevation_deg: 10.0,
            min_satellites: 4,
            weight_mode: WeightMode::Elevation,
            smoothing_window: 0,
            // Explicit fallback when no station/manual position is known yet
            // (§9 Open Question: "initial guess when approx_rec_pos == [0,0,0]").
            initial_guess_ecef_m: [4_000_000.0, 3_000_000.0, 5_000_000.0],
            obs_settings: ConnectionSettings::default(),
            eph_settings: ConnectionSettings {
                enabled: false,
                ..ConnectionSettings::default()
            },
            ring_buffer_capacity: 4096,
            position_track_capacity: 1000,
            logging: None,
        }
    }
}

/// Atomically published approximate receiver position (§4.6: station
/// 1005/1006 updates feed both the decoder's az/el computation and the
/// solver's initial guess).
pub struct ApproxPosition {
    cell: RwLock<[f64; 3]>,
    updates: AtomicU64,
}

impl Default for ApproxPosition {
    fn default() -> Self {
        Self::new([0.0, 0.0, 0.0])
    }
}

impl ApproxPosition {
    pub fn new(initial: [f64; 3]) -> Self {
        Self {
            cell: RwLock::new(initial),
            updates: AtomicU64::new(0),
        }
    }

    pub fn get(&self) -> [f64; 3] {
        *self.cell.read().unwrap()
    }

    pub fn set(&self, pos: [f64; 3]) {
        *self.cell.write().unwrap() = pos;
        self.updates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn is_known(&self) -> bool {
        self.get() != [0.0, 0.0, 0.0]
    }

    pub fn update_count(&self) -> u64 {
        self.updates.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_targets_four_constellations() {
        let config = Config::default();
        assert_eq!(config.target_systems.len(), 4);
        assert_eq!(config.min_satellites, 4);
    }

    #[test]
    fn approx_position_starts_unknown() {
        let pos = ApproxPosition::default();
        assert!(!pos.is_known());
        pos.set([1.0, 2.0, 3.0]);
        assert!(pos.is_known());
        assert_eq!(pos.update_count(), 1);
    }
}
