//! Error taxonomy for the lab session.
//!
//! None of these are fatal: the session degrades to "keep showing the last
//! known-good state" and waits for the next user action.

use thiserror::Error;

/// Errors raised by user-facing flask actions
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LabError {
    #[error("Flask is full ({capacity} reagents max)")]
    CapacityExceeded { capacity: usize },

    #[error("Unknown reagent: {0}")]
    UnknownReagent(String),

    #[error("Session has been shut down")]
    SessionClosed,
}

/// Errors from the analysis collaborator and the result interpreter
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    /// Response arrived but did not match the expected shape
    #[error("Invalid analysis response: {0}")]
    InvalidResponse(String),

    /// Transport failure, timeout, non-success status, or disabled backend
    #[error("Analysis collaborator unavailable: {0}")]
    CollaboratorUnavailable(String),
}

/// Errors loading a reagent catalog file
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse catalog: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Duplicate reagent id: {0}")]
    DuplicateId(String),

    #[error("Reagent {id} has danger level {level} (max 100)")]
    InvalidDangerLevel { id: String, level: u8 },

    #[error("Catalog is empty")]
    Empty,
}

/// Errors validating configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),

    #[error("heat_step_min ({min}) must not exceed heat_step_max ({max})")]
    InvertedHeatStep { min: u32, max: u32 },
}
