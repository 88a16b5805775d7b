//! Error types for crate construction, draws and the open/finish flow
//!
//! A failed key check is not an error: it is reported through
//! [`crate::engine::OpenResult::Aborted`].

use thiserror::Error;

/// Root error type for all keycrate operations
#[derive(Debug, Error)]
pub enum CrateError {
    /// Crate definition or settings are unusable
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// A single draw could not produce a reward
    #[error("Draw error: {0}")]
    Draw(#[from] DrawError),

    /// Open/finish flow errors
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
}

/// Configuration and validation errors
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Missing required field: {0}")]
    MissingRequired(String),

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unknown roll style '{roll}' for crate '{crate_id}'")]
    UnknownRollStyle { crate_id: String, roll: String },

    #[error("Duplicate crate id: {0}")]
    DuplicateCrate(String),

    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),
}

/// Draw errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DrawError {
    /// Nothing to draw from
    #[error("Reward pool is empty")]
    PoolExhausted,

    /// Every weight in the requested dimension is zero or negative
    #[error("No reward has a positive {0} weight")]
    NoPositiveWeight(&'static str),
}

/// Open/finish flow errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Illegal draw transition from {from} on {event}")]
    InvalidTransition { from: String, event: String },
}

impl From<toml::de::Error> for CrateError {
    fn from(e: toml::de::Error) -> Self {
        CrateError::Configuration(ConfigurationError::LoadFailed(e.to_string()))
    }
}

// Convenience type alias for Results
pub type CrateResult<T> = Result<T, CrateError>;
