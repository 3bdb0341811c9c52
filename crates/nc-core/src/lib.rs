//! nc-core: numeric foundation for the Nucleares controller.
//!
//! Contains:
//! - numeric (Real, finiteness checks, plant value parsing and formatting)
//! - error (shared error types)

pub mod error;
pub mod numeric;

// Re-exports: nice ergonomics for downstream crates
pub use error::{CoreError, CoreResult};
pub use numeric::*;
