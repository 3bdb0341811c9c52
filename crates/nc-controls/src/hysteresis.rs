//! Two-threshold on/off control.
//!
//! A switch is commanded on below the low threshold and off above the high
//! threshold. Between the thresholds no command is issued, so a reading that
//! hovers around one setpoint cannot make the actuator chatter.

use crate::error::{ControlError, ControlResult};
use serde::{Deserialize, Serialize};

/// Band between the switch-on and switch-off thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HysteresisBand {
    /// Below this the switch is commanded on.
    pub low: f64,
    /// Above this the switch is commanded off.
    pub high: f64,
}

impl HysteresisBand {
    pub fn new(low: f64, high: f64) -> ControlResult<Self> {
        if !(low.is_finite() && high.is_finite()) {
            return Err(ControlError::InvalidArg {
                what: "hysteresis thresholds must be finite",
            });
        }
        if low >= high {
            return Err(ControlError::InvalidArg {
                what: "hysteresis low threshold must be below high threshold",
            });
        }
        Ok(Self { low, high })
    }

    /// Command for `value`, or `None` inside the band.
    pub fn command(&self, value: f64) -> Option<bool> {
        if value < self.low {
            Some(true)
        } else if value > self.high {
            Some(false)
        } else {
            None
        }
    }
}

/// Hysteresis band plus the last command it issued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HysteresisSwitch {
    pub band: HysteresisBand,
    state: Option<bool>,
}

impl HysteresisSwitch {
    pub fn new(band: HysteresisBand) -> Self {
        Self { band, state: None }
    }

    /// Last issued command, `None` until the reading first leaves the band.
    pub fn state(&self) -> Option<bool> {
        self.state
    }

    /// Evaluate `value`; returns the command to send, if any.
    pub fn update(&mut self, value: f64) -> Option<bool> {
        let command = self.band.command(value);
        if command.is_some() {
            self.state = command;
        }
        command
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_commands() {
        let band = HysteresisBand::new(26_000.0, 29_000.0).unwrap();
        assert_eq!(band.command(25_999.0), Some(true));
        assert_eq!(band.command(29_001.0), Some(false));
        assert_eq!(band.command(27_500.0), None);
        // thresholds themselves are inside the band
        assert_eq!(band.command(26_000.0), None);
        assert_eq!(band.command(29_000.0), None);
    }

    #[test]
    fn switch_holds_state_inside_band() {
        let mut switch = HysteresisSwitch::new(HysteresisBand::new(10.0, 20.0).unwrap());
        assert_eq!(switch.state(), None);

        assert_eq!(switch.update(5.0), Some(true));
        assert_eq!(switch.update(15.0), None);
        assert_eq!(switch.state(), Some(true));

        assert_eq!(switch.update(25.0), Some(false));
        assert_eq!(switch.update(12.0), None);
        assert_eq!(switch.state(), Some(false));
    }

    #[test]
    fn invalid_band() {
        assert!(HysteresisBand::new(20.0, 10.0).is_err());
        assert!(HysteresisBand::new(10.0, 10.0).is_err());
        assert!(HysteresisBand::new(f64::NAN, 10.0).is_err());
    }
}
