//! Error types for the carving engine.
//!
//! Only engine-level failures surface to callers. Sub-check faults
//! (structural validators, malformed headers) degrade to a lower score or an
//! absent optional field and never abort an analysis.

use std::path::PathBuf;

use thiserror::Error;

/// Engine-level failure returned to the caller
#[derive(Debug, Error)]
pub enum EngineError {
    /// Scan was cancelled through a [`crate::CancelFlag`]
    #[error("scan cancelled at offset {offset}")]
    Cancelled { offset: u64 },

    /// Input could not be read at all
    #[error("failed to read input {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration rejected by [`crate::EngineConfig::validate`]
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Fault raised inside a structural validator walk.
///
/// Caught by the confidence scorer and turned into a zero bonus.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("structure truncated at offset {offset}")]
    Truncated { offset: usize },

    #[error("implausible {field} value {value} at offset {offset}")]
    Implausible {
        field: &'static str,
        value: u64,
        offset: usize,
    },

    #[error("missing {0} marker")]
    MissingMarker(&'static str),
}

pub type Result<T> = std::result::Result<T, EngineError>;
