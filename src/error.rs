//! Error types for the audit engine

use std::path::PathBuf;
use thiserror::Error;

/// Result type for audit operations
pub type Result<T> = std::result::Result<T, AuditError>;

/// Audit engine errors
///
/// Parse and per-file processing errors are recovered at the file boundary
/// (they become findings or skips); everything else propagates.
#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Failed to process {path}: {message}")]
    FileProcessing { path: PathBuf, message: String },

    #[error("Parse error in {path} at line {line}: {message}")]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Invalid input: {0}")]
    InputValidation(String),

    #[error("Path traversal rejected: {path} resolves outside {root}")]
    PathTraversal { path: PathBuf, root: PathBuf },

    #[error("Audit state inconsistency: {0}")]
    Audit(String),

    #[error("Migration failed at {path}: {message}")]
    Migration { path: PathBuf, message: String },

    #[error("Wall-clock budget of {budget_secs}s exhausted after {completed} of {total} files")]
    Timeout {
        budget_secs: u64,
        completed: usize,
        total: usize,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
