//! Control primitives for the Nucleares controller.
//!
//! This crate holds the plant-independent building blocks that the cascade in
//! `nc-app` composes into a control strategy.
//!
//! # Architecture
//!
//! - Signals are scalar `f64` values sampled once per plant timestep
//! - Controllers are stepped with the plant timestamp, never wall-clock time
//! - Every block keeps only the state it needs for the next sample
//!
//! # Blocks
//!
//! - **PID**: discrete PID with integrator clamping and distinct-sample derivative
//! - **Hysteresis**: two-threshold on/off switching
//! - **Delta tracking**: per-tick differences of a fixed set of readings
//! - **Timestep gate**: detects when the plant clock has advanced

pub mod controller;
pub mod delta;
pub mod error;
pub mod hysteresis;
pub mod sampled;

pub use controller::{IntegralLimits, PIDController, PidComponents, PidGains};
pub use delta::DeltaTracker;
pub use error::{ControlError, ControlResult};
pub use hysteresis::{HysteresisBand, HysteresisSwitch};
pub use sampled::TimestepGate;
