//! Plant variable transport for the Nucleares controller.
//!
//! The plant exposes every process variable by name. This crate provides:
//! - [`PlantLink`], the read/write boundary the controller talks to
//! - [`HttpLink`], the implementation for the game's local web server
//! - [`MemoryLink`], an in-memory plant for tests
//! - [`TickCache`], a read cache scoped to a single control tick

pub mod cache;
pub mod error;
pub mod http;
pub mod link;

pub use cache::TickCache;
pub use error::{LinkError, LinkResult};
pub use http::HttpLink;
pub use link::{MemoryLink, PlantLink};
