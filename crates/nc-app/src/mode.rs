//! Plant operating mode.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Core temperature above which a running plant counts as in normal operation.
pub const NORMAL_ABOVE: f64 = 100.0;

/// Operating regime, derived fresh every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    Shutdown,
    Startup,
    Normal,
}

impl Mode {
    /// Classify the plant from the commanded mode and core temperature.
    ///
    /// There is no hysteresis at [`NORMAL_ABOVE`]: a temperature wandering
    /// across it switches between `Startup` and `Normal` every time.
    pub fn classify(commanded: &str, core_temperature: f64, shutdown_sentinel: &str) -> Mode {
        if commanded == shutdown_sentinel {
            Mode::Shutdown
        } else if core_temperature > NORMAL_ABOVE {
            Mode::Normal
        } else {
            Mode::Startup
        }
    }

    /// Rods are only driven by the controller in normal operation.
    pub fn drives_rods(self) -> bool {
        matches!(self, Mode::Normal)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::Shutdown => "shutdown",
            Mode::Startup => "startup",
            Mode::Normal => "normal",
        };
        f.write_str(name)
    }
}

/// Remembers the previous tick's mode to detect transitions.
#[derive(Debug, Clone, Default)]
pub struct ModeTracker {
    last: Option<Mode>,
}

impl ModeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<Mode> {
        self.last
    }

    /// Record `mode`; returns `true` if it differs from the previous tick.
    ///
    /// The first mode of a session is not a transition: the controllers were
    /// just seeded from live readings.
    pub fn update(&mut self, mode: Mode) -> bool {
        let changed = self.last.is_some_and(|last| last != mode);
        self.last = Some(mode);
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn classify_examples() {
        assert_eq!(Mode::classify("SHUTDOWN", 350.0, "SHUTDOWN"), Mode::Shutdown);
        assert_eq!(Mode::classify("RUN", 100.5, "SHUTDOWN"), Mode::Normal);
        assert_eq!(Mode::classify("RUN", 100.0, "SHUTDOWN"), Mode::Startup);
        assert_eq!(Mode::classify("", 20.0, "SHUTDOWN"), Mode::Startup);
        // exact match only
        assert_eq!(Mode::classify("shutdown", 20.0, "SHUTDOWN"), Mode::Startup);
    }

    #[test]
    fn boundary_flaps_without_hysteresis() {
        let mut tracker = ModeTracker::new();
        let temps = [99.9, 100.1, 99.9, 100.1];
        let transitions: Vec<bool> = temps
            .iter()
            .map(|&t| tracker.update(Mode::classify("RUN", t, "SHUTDOWN")))
            .collect();
        assert_eq!(transitions, vec![false, true, true, true]);
        assert_eq!(tracker.last(), Some(Mode::Normal));
    }

    #[test]
    fn steady_mode_is_not_a_transition() {
        let mut tracker = ModeTracker::new();
        assert!(!tracker.update(Mode::Startup));
        assert!(!tracker.update(Mode::Startup));
        assert!(tracker.update(Mode::Shutdown));
        assert!(!tracker.update(Mode::Shutdown));
    }

    #[test]
    fn only_normal_drives_rods() {
        assert!(Mode::Normal.drives_rods());
        assert!(!Mode::Startup.drives_rods());
        assert!(!Mode::Shutdown.drives_rods());
        assert_eq!(Mode::Normal.to_string(), "normal");
    }

    proptest! {
        #[test]
        fn sentinel_wins_at_any_temperature(temp in -1.0e4_f64..1.0e4) {
            prop_assert_eq!(Mode::classify("SHUTDOWN", temp, "SHUTDOWN"), Mode::Shutdown);
        }

        #[test]
        fn temperature_splits_running_modes(temp in -1.0e4_f64..1.0e4) {
            let expected = if temp > NORMAL_ABOVE { Mode::Normal } else { Mode::Startup };
            prop_assert_eq!(Mode::classify("RUN", temp, "SHUTDOWN"), expected);
        }
    }
}
