//! Control application for the Nucleares reactor simulation.
//!
//! This crate composes the primitives from `nc-controls` into the cascade
//! that drives the plant, and wraps it in the session supervisor used by
//! the command line front end.

pub mod cascade;
pub mod config;
pub mod error;
pub mod mode;
pub mod supervisor;

// Re-export key types for convenience
pub use cascade::{
    ActuatorCommand, CascadeController, ShapedSetpoint, TickReport, shape_core_target,
};
pub use config::{
    ControllerConfig, EndpointConfig, PowerTrackingConfig, SecondaryLoopNames, Targets,
    VariableNames,
};
pub use error::{AppError, AppResult};
pub use mode::{Mode, ModeTracker};
pub use supervisor::{RetryPolicy, Supervisor};
