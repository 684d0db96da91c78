//! Shared library for FWIP services
//!
//! Provides the error taxonomy, configuration resolution, tunable engine
//! parameters, and the event bus used by the routing engine.

pub mod config;
pub mod error;
pub mod events;
pub mod params;

pub use error::{Error, Result};
