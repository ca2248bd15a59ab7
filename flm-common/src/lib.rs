//! # flm common library
//!
//! Shared code for the face label migration workspace:
//! - Error type used by the storage and API layers
//! - Configuration loading and runtime settings context

pub mod config;
pub mod error;

pub use error::{Error, Result};
