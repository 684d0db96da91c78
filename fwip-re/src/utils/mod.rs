//! Shared helpers

pub mod values;
