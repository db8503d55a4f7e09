//! Shared ephemeris store (§4.4, §5 "Decoder/Positioning thread boundary"):
//! a dependency-inversion seam so the solver depends on a trait, not a
//! concrete cache, per the config-threading redesign.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use super::Ephemeris;
use crate::types::SatKey;

/// What the positioning side needs from ephemeris storage: look up a
/// satellite's broadcast state and ask it to propagate to a given time.
pub trait EphemerisStore: Send + Sync {
    fn propagate(&self, sat: SatKey, t_s: f64) -> Option<[f64; 3]>;
    fn insert(&self, eph: Ephemeris);
}

/// Mutex-protected map from satellite to its most recently received
/// ephemeris set. New ephemeris for a satellite only replaces the stored
/// one when its reference time actually changes (§4.4 "replace-only-on-toe
/// change"), so repeated re-broadcasts of the same set are a no-op.
pub struct EphemerisCache {
    table: Mutex<HashMap<SatKey, Ephemeris>>,
    updates: AtomicU64,
}

impl Default for EphemerisCache {
    fn default() -> Self {
        Self::new()
    }
}

impl EphemerisCache {
    pub fn new() -> Self {
        Self {
            table: Mutex::new(HashMap::new()),
            updates: AtomicU64::new(0),
        }
    }

    /// Count of ephemeris sets actually replaced (not mere re-broadcasts),
    /// surfaced for the end-to-end "ephemeris updates then reverts to
    /// steady decoding" scenario.
    pub fn update_count(&self) -> u64 {
        self.updates.load(Ordering::Relaxed)
    }

    pub fn get(&self, sat: SatKey) -> Option<Ephemeris> {
        self.table.lock().unwrap().get(&sat).cloned()
    }
}

impl EphemerisStore for EphemerisCache {
    fn propagate(&self, sat: SatKey, t_s: f64) -> Option<[f64; 3]> {
        self.table.lock().unwrap().get(&sat).map(|e| e.propagate(t_s))
    }

    fn insert(&self, eph: Ephemeris) {
        let sat = eph.sat_key();
        let mut table = self.table.lock().unwrap();
        let replace = match table.get(&sat) {
            Some(existing) => existing.reference_tow_s() != eph.reference_tow_s(),
            None => true,
        };
        if replace {
            table.insert(sat, eph);
            self.updates.fetch_add(1, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ephemeris::keplerian::KeplerEphemeris;

    fn sample(sat: SatKey, toe: f64) -> Ephemeris {
        Ephemeris::Keplerian(KeplerEphemeris {
            sat,
            toe_s: toe,
            sqrt_a: 5153.7,
            delta_n: 0.0,
            m0: 0.0,
            ecc: 0.0,
            omega: 0.0,
            cuc: 0.0,
            cus: 0.0,
            crc: 0.0,
            crs: 0.0,
            cic: 0.0,
            cis: 0.0,
            i0: 0.9,
            idot: 0.0,
            omega0: 0.0,
            omega_dot: 0.0,
        })
    }

    #[test]
    fn rebroadcast_with_same_toe_does_not_count_as_update() {
        let cache = EphemerisCache::new();
        let sat = SatKey::new('G', 5);
        cache.insert(sample(sat, 1000.0));
        cache.insert(sample(sat, 1000.0));
        assert_eq!(cache.update_count(), 1);
    }

    #[test]
    fn new_toe_replaces_and_counts() {
        let cache = EphemerisCache::new();
        let sat = SatKey::new('G', 5);
        cache.insert(sample(sat, 1000.0));
        cache.insert(sample(sat, 1600.0));
        assert_eq!(cache.update_count(), 2);
        assert_eq!(cache.get(sat).unwrap().reference_tow_s(), 1600.0);
    }

    #[test]
    fn missing_satellite_propagates_to_none() {
        let cache = EphemerisCache::new();
        assert!(cache.propagate(SatKey::new('G', 9), 0.0).is_none());
    }
}
