//! Remote host access.
//!
//! The audit core talks to remote machines through the traits in this module.
//! `ssh` holds the production implementation on top of libssh2; tests swap in
//! in-memory fakes.

pub mod ssh;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
    Other,
}

/// One entry of a remote directory listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteEntry {
    /// Base name of the entry, without any parent path.
    pub name: String,

    #[serde(rename = "type")]
    pub kind: EntryKind,

    /// Size in bytes; meaningful only for files.
    pub size: u64,
}

impl RemoteEntry {
    pub fn file(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::File,
            size,
        }
    }

    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Directory,
            size: 0,
        }
    }
}

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("Path not found: {0}")]
    PathNotFound(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Transfer error: {0}")]
    Transfer(String),

    #[error("Command error: {0}")]
    Command(String),
}

/// Lists one remote directory, non-recursively.
pub trait DirectoryLister {
    fn list(&self, path: &str) -> Result<Vec<RemoteEntry>, RemoteError>;
}

/// Downloads a single remote file into a local directory, returning the local
/// path it was written to.
pub trait FileFetcher {
    fn fetch(&self, remote_path: &str, local_dir: &Path) -> Result<PathBuf, RemoteError>;
}

/// Output of a remote command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub exit_code: i32,
}

/// Runs a shell command on the remote host and captures stdout.
pub trait CommandRunner {
    fn run(&self, command: &str) -> Result<CommandOutput, RemoteError>;
}
