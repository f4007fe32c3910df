//! SSH-backed implementations of the remote access traits.
//!
//! One session per audited host: SFTP for listings and file fetches, a channel
//! per executed command. All calls are blocking and are expected to run inside
//! `tokio::task::spawn_blocking`.

use std::io::Read;
use std::net::TcpStream;
use std::path::{Path, PathBuf};

use super::{
    CommandOutput, CommandRunner, DirectoryLister, EntryKind, FileFetcher, RemoteEntry, RemoteError,
};

/// SFTP status code for a missing path (LIBSSH2_FX_NO_SUCH_FILE).
const SFTP_NO_SUCH_FILE: i32 = 2;

/// Connection parameters for one remote host.
#[derive(Debug, Clone)]
pub struct SshTarget {
    pub host: String,
    pub port: u16,
    pub username: String,
    /// Password authentication when set, SSH agent authentication otherwise.
    pub password: Option<String>,
    /// Per-call deadline applied to the whole session. A dead remote fails the
    /// current server's audit instead of hanging the run.
    pub timeout_ms: u32,
}

pub struct SshSession {
    sess: ssh2::Session,
}

impl SshSession {
    pub fn connect(target: &SshTarget) -> Result<Self, RemoteError> {
        let tcp = TcpStream::connect((target.host.as_str(), target.port)).map_err(|e| {
            RemoteError::Connection(format!("{}:{}: {}", target.host, target.port, e))
        })?;

        let mut sess =
            ssh2::Session::new().map_err(|e| RemoteError::Connection(e.to_string()))?;
        sess.set_tcp_stream(tcp);
        sess.set_timeout(target.timeout_ms);
        sess.handshake()
            .map_err(|e| RemoteError::Connection(format!("{}: {}", target.host, e)))?;

        match &target.password {
            Some(password) => sess.userauth_password(&target.username, password),
            None => sess.userauth_agent(&target.username),
        }
        .map_err(|e| {
            RemoteError::Connection(format!(
                "authentication failed for {}@{}: {}",
                target.username, target.host, e
            ))
        })?;

        if !sess.authenticated() {
            return Err(RemoteError::Connection(format!(
                "authentication failed for {}@{}",
                target.username, target.host
            )));
        }

        Ok(Self { sess })
    }

    fn sftp(&self) -> Result<ssh2::Sftp, RemoteError> {
        self.sess
            .sftp()
            .map_err(|e| RemoteError::Connection(e.to_string()))
    }
}

impl DirectoryLister for SshSession {
    fn list(&self, path: &str) -> Result<Vec<RemoteEntry>, RemoteError> {
        let sftp = self.sftp()?;
        let entries = sftp
            .readdir(Path::new(path))
            .map_err(|e| map_sftp_error(e, path))?;

        let mut listing = Vec::with_capacity(entries.len());
        for (entry_path, stat) in entries {
            let name = match entry_path.file_name() {
                Some(name) => name.to_string_lossy().to_string(),
                None => continue,
            };

            let kind = if stat.is_dir() {
                EntryKind::Directory
            } else if stat.is_file() {
                EntryKind::File
            } else {
                EntryKind::Other
            };

            listing.push(RemoteEntry {
                name,
                kind,
                size: stat.size.unwrap_or(0),
            });
        }

        Ok(listing)
    }
}

impl FileFetcher for SshSession {
    fn fetch(&self, remote_path: &str, local_dir: &Path) -> Result<PathBuf, RemoteError> {
        let file_name = remote_path.rsplit('/').next().unwrap_or(remote_path);
        let dest = local_dir.join(file_name);

        let sftp = self.sftp()?;
        let mut remote_file = sftp
            .open(Path::new(remote_path))
            .map_err(|e| RemoteError::Transfer(format!("{}: {}", remote_path, e)))?;

        let mut contents = Vec::new();
        remote_file
            .read_to_end(&mut contents)
            .map_err(|e| RemoteError::Transfer(format!("{}: {}", remote_path, e)))?;

        std::fs::write(&dest, &contents)
            .map_err(|e| RemoteError::Transfer(format!("{}: {}", dest.display(), e)))?;

        Ok(dest)
    }
}

impl CommandRunner for SshSession {
    fn run(&self, command: &str) -> Result<CommandOutput, RemoteError> {
        let mut channel = self
            .sess
            .channel_session()
            .map_err(|e| RemoteError::Command(e.to_string()))?;
        channel
            .exec(command)
            .map_err(|e| RemoteError::Command(format!("{}: {}", command, e)))?;

        let mut stdout = String::new();
        channel
            .read_to_string(&mut stdout)
            .map_err(|e| RemoteError::Command(e.to_string()))?;
        channel
            .wait_close()
            .map_err(|e| RemoteError::Command(e.to_string()))?;
        let exit_code = channel
            .exit_status()
            .map_err(|e| RemoteError::Command(e.to_string()))?;

        Ok(CommandOutput { stdout, exit_code })
    }
}

fn map_sftp_error(e: ssh2::Error, path: &str) -> RemoteError {
    if matches!(e.code(), ssh2::ErrorCode::SFTP(SFTP_NO_SUCH_FILE)) {
        RemoteError::PathNotFound(path.to_string())
    } else {
        RemoteError::Connection(format!("{}: {}", path, e))
    }
}
