//! Epoch assembler/merger (§4.7): folds per-MSM observation fragments
//! sharing a UTC second into one [`EpochObservation`], flushing whenever a
//! new second starts or the pipeline shuts down.
//!
//! Grounded on the positioning worker's `current_epoch_utc`/`pending_epoch`
//! state machine: a fragment belonging to the in-progress second merges
//! into it; a fragment for a new second flushes the old one and starts
//! fresh.

use crate::types::EpochObservation;

pub struct EpochMerger {
    pending: Option<EpochObservation>,
    pending_key: Option<i64>,
}

impl Default for EpochMerger {
    fn default() -> Self {
        Self::new()
    }
}

impl EpochMerger {
    pub fn new() -> Self {
        Self {
            pending: None,
            pending_key: None,
        }
    }

    /// Feed one decoder fragment. Returns a completed epoch whenever the
    /// fragment belongs to a later second than the one in progress.
    pub fn feed(&mut self, fragment: EpochObservation) -> Option<EpochObservation> {
        let key = fragment.utc_second_key();

        match self.pending_key {
            Some(current) if current == key => {
                self.pending.as_mut().unwrap().merge_from(fragment);
                None
            }
            Some(current) if key > current => {
                let completed = self.pending.take();
                self.pending = Some(fragment);
                self.pending_key = Some(key);
                completed
            }
            Some(_) => {
                // Fragment for a second already flushed (out-of-order/late
                // arrival): merge into history is impossible, drop it.
                None
            }
            None => {
                self.pending = Some(fragment);
                self.pending_key = Some(key);
                None
            }
        }
    }

    /// Flush whatever is pending, e.g. on pipeline shutdown.
    pub fn flush(&mut self) -> Option<EpochObservation> {
        self.pending_key = None;
        self.pending.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SatKey;
    use hifitime::Epoch;

    fn fragment(second: f64, sat: char, prn: u8) -> EpochObservation {
        let utc = Epoch::from_gpst_seconds(second);
        let mut epoch = EpochObservation::new(second, utc);
        epoch
            .satellites
            .insert(SatKey::new(sat, prn), crate::types::SatelliteState::new(sat, prn));
        epoch
    }

    #[test]
    fn fragments_in_same_second_merge() {
        let mut merger = EpochMerger::new();
        assert!(merger.feed(fragment(1000.2, 'G', 1)).is_none());
        assert!(merger.feed(fragment(1000.6, 'R', 2)).is_none());
        let completed = merger.flush().unwrap();
        assert_eq!(completed.satellites.len(), 2);
    }

    #[test]
    fn new_second_flushes_previous() {
        let mut merger = EpochMerger::new();
        merger.feed(fragment(1000.1, 'G', 1));
        let completed = merger.feed(fragment(1001.1, 'G', 2)).unwrap();
        assert_eq!(completed.satellites.len(), 1);
        assert!(completed.satellites.contains_key(&SatKey::new('G', 1)));
    }

    #[test]
    fn flush_on_shutdown_returns_pending() {
        let mut merger = EpochMerger::new();
        merger.feed(fragment(2000.0, 'E', 3));
        let flushed = merger.flush();
        assert!(flushed.is_some());
        assert!(merger.flush().is_none());
    }
}
