//! Ephemeris types, cache and orbit propagation (§3, §4.4).

pub mod cache;
pub mod glonass;
pub mod keplerian;

pub use cache::{EphemerisCache, EphemerisStore};
pub use glonass::GlonassEphemeris;
pub use keplerian::KeplerEphemeris;

use crate::types::SatKey;

/// Either flavor of broadcast ephemeris a satellite can carry.
#[derive(Debug, Clone)]
pub enum Ephemeris {
    Keplerian(KeplerEphemeris),
    Glonass(GlonassEphemeris),
}

impl Ephemeris {
    /// GPS time-of-week (seconds) the ephemeris set is referenced to. For
    /// GLONASS this is `tb` reinterpreted in the GPS time frame the caller
    /// already resolved the message's epoch into.
    pub fn reference_tow_s(&self) -> f64 {
        match self {
            Ephemeris::Keplerian(e) => e.toe_s,
            Ephemeris::Glonass(e) => e.tb_s,
        }
    }

    pub fn sat_key(&self) -> SatKey {
        match self {
            Ephemeris::Keplerian(e) => e.sat,
            Ephemeris::Glonass(e) => e.sat,
        }
    }

    /// Propagate to ECEF position (meters) at GPS time-of-week `t_s`.
    pub fn propagate(&self, t_s: f64) -> [f64; 3] {
        match self {
            Ephemeris::Keplerian(e) => keplerian::propagate(e, t_s).0,
            Ephemeris::Glonass(e) => glonass::propagate(e, t_s).0,
        }
    }
}
