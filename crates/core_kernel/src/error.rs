//! Kernel-level errors
//!
//! Failures that are not billing rules: unusable settings, an unknown
//! business timezone, or money arithmetic leaving the representable range.

use thiserror::Error;

use crate::money::MoneyError;
use crate::temporal::TemporalError;

#[derive(Debug, Error)]
pub enum CoreError {
    /// Settings could not be loaded or cannot be run with
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Calendar error: {0}")]
    Temporal(#[from] TemporalError),

    #[error("Money error: {0}")]
    Money(#[from] MoneyError),
}

impl CoreError {
    pub fn configuration(message: impl Into<String>) -> Self {
        CoreError::Configuration(message.into())
    }
}
