//! Discrete PID controller.
//!
//! The controller is stepped once per plant timestep and keeps:
//! - an integrator clamped to a configurable interval (anti-windup)
//! - the last sample, for the integral time delta
//! - the last two *distinct* samples, for the derivative slope
//!
//! Repeated readings (error unchanged within [`DISTINCT_EPS`]) contribute no
//! derivative action, so a plant value that has not refreshed yet never
//! produces a zero or undefined slope.

use std::fmt;

use crate::error::{ControlError, ControlResult};
use nc_core::DISTINCT_EPS;
use serde::{Deserialize, Serialize};

/// Closed interval the integrator is kept inside.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntegralLimits {
    pub min: f64,
    pub max: f64,
}

impl IntegralLimits {
    pub const UNBOUNDED: Self = Self {
        min: f64::MIN,
        max: f64::MAX,
    };
}

impl Default for IntegralLimits {
    fn default() -> Self {
        Self::UNBOUNDED
    }
}

/// PID controller configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidGains {
    /// Proportional gain.
    pub kp: f64,
    /// Integral gain, per plant time unit.
    pub ki: f64,
    /// Derivative gain.
    pub kd: f64,
    /// Integrator bounds. Defaults to the full `f64` range.
    #[serde(default)]
    pub integral_limits: IntegralLimits,
    /// Set when raising the actuator lowers the controlled quantity.
    #[serde(default)]
    pub inverted: bool,
}

impl PidGains {
    pub fn new(kp: f64, ki: f64, kd: f64) -> Self {
        Self {
            kp,
            ki,
            kd,
            integral_limits: IntegralLimits::UNBOUNDED,
            inverted: false,
        }
    }

    /// Set integrator bounds.
    pub fn with_integral_limits(mut self, min: f64, max: f64) -> Self {
        self.integral_limits = IntegralLimits { min, max };
        self
    }

    /// Mark the controlled quantity as falling when the output rises.
    pub fn inverted(mut self) -> Self {
        self.inverted = true;
        self
    }

    /// `-1.0` for inverted controllers, `1.0` otherwise.
    pub fn sign(&self) -> f64 {
        if self.inverted { -1.0 } else { 1.0 }
    }

    pub fn validate(&self) -> ControlResult<()> {
        if !(self.kp.is_finite() && self.ki.is_finite() && self.kd.is_finite()) {
            return Err(ControlError::InvalidArg {
                what: "gains must be finite",
            });
        }
        let IntegralLimits { min, max } = self.integral_limits;
        if min.is_nan() || max.is_nan() {
            return Err(ControlError::InvalidArg {
                what: "integral limits must not be NaN",
            });
        }
        if min > max {
            return Err(ControlError::InvalidArg {
                what: "integral min must not exceed integral max",
            });
        }
        Ok(())
    }
}

/// Terms of the most recent step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PidComponents {
    pub p: f64,
    pub i: f64,
    pub d: f64,
}

impl PidComponents {
    pub fn sum(&self) -> f64 {
        self.p + self.i + self.d
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Sample {
    t: f64,
    error: f64,
}

/// Stateful PID controller for a single channel.
#[derive(Debug, Clone)]
pub struct PIDController {
    gains: PidGains,
    integrator: f64,
    last_sample: Option<Sample>,
    current_distinct: Option<Sample>,
    last_distinct: Option<Sample>,
    components: PidComponents,
}

impl PIDController {
    /// Create a controller whose integrator starts at `initial_output`.
    ///
    /// Seeding with the actuator's present value keeps the first output close
    /// to where the actuator already is. The seed is clamped into the
    /// integral limits.
    pub fn new(gains: PidGains, initial_output: f64) -> ControlResult<Self> {
        gains.validate()?;
        if !initial_output.is_finite() {
            return Err(ControlError::InvalidArg {
                what: "initial output must be finite",
            });
        }
        Ok(Self {
            gains,
            integrator: clamp_to(initial_output, gains.integral_limits),
            last_sample: None,
            current_distinct: None,
            last_distinct: None,
            components: PidComponents::default(),
        })
    }

    pub fn gains(&self) -> &PidGains {
        &self.gains
    }

    /// Current integrator value.
    pub fn integrator(&self) -> f64 {
        self.integrator
    }

    /// Terms computed by the last call to [`step`](Self::step).
    pub fn components(&self) -> PidComponents {
        self.components
    }

    /// Advance the controller to plant time `t`.
    ///
    /// `direct_delta`, when given, is used as the error slope instead of the
    /// distinct-sample estimate.
    ///
    /// When the integrator hits its limits the clamped integrator is returned
    /// on its own, so the output sits exactly at the bound.
    pub fn step(&mut self, t: f64, target: f64, actual: f64, direct_delta: Option<f64>) -> f64 {
        let error = target - actual;
        let sign = self.gains.sign();
        let sample = Sample { t, error };

        let p = error * self.gains.kp * sign;

        let fresh = self
            .current_distinct
            .is_none_or(|current| (error - current.error).abs() > DISTINCT_EPS);
        if fresh {
            self.last_distinct = self.current_distinct;
            self.current_distinct = Some(sample);
        }

        let d = match direct_delta {
            Some(rate) => self.gains.kd * rate * sign,
            None if fresh => self
                .distinct_slope()
                .map_or(0.0, |slope| self.gains.kd * slope * sign),
            None => 0.0,
        };

        let mut limited = false;
        if let Some(prev) = self.last_sample {
            let dt = t - prev.t;
            let unclamped = self.integrator + self.gains.ki * error * dt * sign;
            let IntegralLimits { min, max } = self.gains.integral_limits;
            limited = unclamped > max || unclamped < min;
            self.integrator = clamp_to(unclamped, self.gains.integral_limits);
        }

        let i = self.integrator;
        self.last_sample = Some(sample);
        self.components = PidComponents { p, i, d };

        if limited { i } else { p + i + d }
    }

    /// Force the integrator to `value`.
    ///
    /// Sample history is kept, so the next step still integrates over the
    /// time since the last sample and may still see the old slope.
    pub fn reset(&mut self, value: f64) {
        self.integrator = clamp_to(value, self.gains.integral_limits);
    }

    fn distinct_slope(&self) -> Option<f64> {
        let (last, current) = (self.last_distinct?, self.current_distinct?);
        let dt = current.t - last.t;
        (dt > 0.0).then(|| (current.error - last.error) / dt)
    }
}

impl fmt::Display for PIDController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let PidComponents { p, i, d } = self.components;
        write!(
            f,
            "kp={} ki={} kd={}{} integrator={:.4} P/I/D={:.4}/{:.4}/{:.4}",
            self.gains.kp,
            self.gains.ki,
            self.gains.kd,
            if self.gains.inverted { " (inverted)" } else { "" },
            self.integrator,
            p,
            i,
            d
        )
    }
}

fn clamp_to(value: f64, limits: IntegralLimits) -> f64 {
    value.clamp(limits.min, limits.max)
}
