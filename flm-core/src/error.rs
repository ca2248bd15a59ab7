//! Core error type
//!
//! Geometry and matching never fail on well-formed input; the only error the
//! engine reports is a rejected parameter set.

use thiserror::Error;

pub type CoreResult<T> = std::result::Result<T, CoreError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// A threshold or count parameter is outside its domain
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParams { name: &'static str, reason: String },
}
