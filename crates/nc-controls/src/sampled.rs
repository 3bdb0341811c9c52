//! Sampled execution primitives.
//!
//! The plant advances in discrete timesteps and publishes the current one as
//! a plain number. Controllers run once per timestep, so the loop needs to
//! know when that number changes.

use serde::{Deserialize, Serialize};

/// Remembers the last plant timestep and reports when a new one appears.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimestepGate {
    last: Option<f64>,
}

impl TimestepGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last timestep that passed the gate.
    pub fn last(&self) -> Option<f64> {
        self.last
    }

    /// Record `timestep`; returns `true` if it differs from the last one.
    ///
    /// Any change counts, including the clock going backwards after the plant
    /// reloads a save.
    pub fn observe(&mut self, timestep: f64) -> bool {
        if self.last == Some(timestep) {
            false
        } else {
            self.last = Some(timestep);
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_observation_passes() {
        let mut gate = TimestepGate::new();
        assert_eq!(gate.last(), None);
        assert!(gate.observe(12.0));
        assert_eq!(gate.last(), Some(12.0));
    }

    #[test]
    fn repeated_timestep_is_held() {
        let mut gate = TimestepGate::new();
        gate.observe(1.0);
        assert!(!gate.observe(1.0));
        assert!(gate.observe(2.0));
        assert!(!gate.observe(2.0));
    }

    #[test]
    fn backwards_clock_counts_as_new() {
        let mut gate = TimestepGate::new();
        gate.observe(40.0);
        assert!(gate.observe(3.0));
        assert_eq!(gate.last(), Some(3.0));
    }
}
