//! Error handling for the flow editor.
//!
//! Interactive editing never fails loudly: lookups that miss are no-ops and
//! invalid numbers become null values. The error type below covers the
//! entry points that can legitimately fail (program loading, rename
//! validation, configuration and log file IO).

use thiserror::Error;

use crate::model::BlockId;

/// Main error type for editor operations.
#[derive(Error, Debug)]
pub enum EditorError {
    /// A program specification could not be parsed.
    #[error("Invalid program specification: {0}")]
    Spec(#[from] serde_json::Error),

    /// Two blocks in a program specification share an id.
    #[error("Duplicate block id {0} in program specification")]
    DuplicateBlockId(BlockId),

    /// A block id leaves no room for fresh ids after it.
    #[error("Block id {0} is out of range")]
    BlockIdOutOfRange(BlockId),

    /// A proposed block name was rejected by the validator.
    #[error("Invalid block name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },

    /// Errors related to configuration loading/saving.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub(crate) fn invalid_name(name: &str, reason: impl Into<String>) -> EditorError {
    EditorError::InvalidName {
        name: name.to_string(),
        reason: reason.into(),
    }
}

/// Result type alias for editor operations.
pub type Result<T> = std::result::Result<T, EditorError>;
