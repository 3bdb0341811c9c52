//! Per-tick deltas of a fixed set of named readings.
//!
//! Diagnostics only: nothing in the control path reads these values.

use std::collections::BTreeMap;
use std::ops::Sub;

use crate::error::{ControlError, ControlResult};

/// Tracks the last snapshot of a set of readings and reports changes.
///
/// The key set is fixed by the seed snapshot. A later snapshot may carry a
/// subset of the keys but never a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct DeltaTracker<T> {
    last: BTreeMap<String, T>,
}

impl<T> DeltaTracker<T>
where
    T: Copy + Sub<Output = T>,
{
    /// Create a tracker seeded with the initial snapshot.
    pub fn new(initial: BTreeMap<String, T>) -> Self {
        Self { last: initial }
    }

    /// Retained snapshot.
    pub fn last(&self) -> &BTreeMap<String, T> {
        &self.last
    }

    /// Compute `new - previous` for every key in `snapshot`, then retain it.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::MissingKey`] if `snapshot` has a key the
    /// retained snapshot lacks. The retained snapshot is left untouched.
    pub fn tick(&mut self, snapshot: BTreeMap<String, T>) -> ControlResult<BTreeMap<String, T>> {
        let deltas = snapshot
            .iter()
            .map(|(key, &value)| {
                let previous = self
                    .last
                    .get(key)
                    .copied()
                    .ok_or_else(|| ControlError::MissingKey { key: key.clone() })?;
                Ok((key.clone(), value - previous))
            })
            .collect::<ControlResult<BTreeMap<_, _>>>()?;

        self.last = snapshot;
        Ok(deltas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn reports_new_minus_old() {
        let mut tracker = DeltaTracker::new(snapshot(&[("CORE_TEMP", 300.0), ("RODS", 50.0)]));
        let deltas = tracker
            .tick(snapshot(&[("CORE_TEMP", 310.5), ("RODS", 48.0)]))
            .unwrap();

        assert_eq!(deltas, snapshot(&[("CORE_TEMP", 10.5), ("RODS", -2.0)]));
        assert_eq!(tracker.last(), &snapshot(&[("CORE_TEMP", 310.5), ("RODS", 48.0)]));
    }

    #[test]
    fn repeated_snapshot_gives_zero() {
        let mut tracker = DeltaTracker::new(snapshot(&[("CORE_TEMP", 300.0)]));
        tracker.tick(snapshot(&[("CORE_TEMP", 305.0)])).unwrap();
        let deltas = tracker.tick(snapshot(&[("CORE_TEMP", 305.0)])).unwrap();

        assert_eq!(deltas["CORE_TEMP"], 0.0);
    }

    #[test]
    fn unknown_key_fails_and_keeps_state() {
        let seed = snapshot(&[("CORE_TEMP", 300.0)]);
        let mut tracker = DeltaTracker::new(seed.clone());
        let err = tracker
            .tick(snapshot(&[("CORE_TEMP", 301.0), ("CONDENSER_VOLUME", 1.0)]))
            .unwrap_err();

        assert_eq!(
            err,
            ControlError::MissingKey {
                key: "CONDENSER_VOLUME".to_string()
            }
        );
        assert_eq!(tracker.last(), &seed);
    }

    #[test]
    fn subset_snapshot_is_accepted() {
        let mut tracker = DeltaTracker::new(snapshot(&[("A", 1.0), ("B", 2.0)]));
        let deltas = tracker.tick(snapshot(&[("B", 5.0)])).unwrap();

        assert_eq!(deltas.len(), 1);
        assert_eq!(deltas["B"], 3.0);
    }

    #[test]
    fn works_for_integer_readings() {
        let mut tracker = DeltaTracker::new(BTreeMap::from([("TIME_STAMP".to_string(), 10_i64)]));
        let deltas = tracker
            .tick(BTreeMap::from([("TIME_STAMP".to_string(), 13_i64)]))
            .unwrap();
        assert_eq!(deltas["TIME_STAMP"], 3);
    }
}
