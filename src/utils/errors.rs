//! Custom error types for the audit tool.

use thiserror::Error;

use crate::remote::RemoteError;

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Configuration error in {path}: {reason}")]
    Config { path: String, reason: String },

    #[error("Snapshot index {index} out of range ({len} timestamped entries)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Snapshot name has no timestamp suffix: {0}")]
    MalformedName(String),

    #[error("Malformed process record ({fields} fields): {line}")]
    MalformedRecord { fields: usize, line: String },

    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, AuditError>;
