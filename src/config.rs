//! Audit descriptors and environment configuration.
//!
//! Descriptors are human-authored JSON files mapping servers to the shape the
//! audits expect to find on them. Loading is fail-fast: a malformed descriptor
//! aborts the run before any remote call is made.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::checks::structure::StructureNode;
use crate::utils::errors::{AuditError, Result};

fn default_ssh_port() -> u16 {
    22
}

fn default_required_keys() -> Vec<String> {
    ["restart", "labels", "logging"]
        .iter()
        .map(|key| key.to_string())
        .collect()
}

/// Backup-server content descriptor entry: the applications whose backups a
/// server must carry, each with its expected structure tree.
#[derive(Debug, Clone, Deserialize)]
pub struct BackupContent {
    pub applications: BTreeMap<String, StructureNode>,
}

pub type BackupContentConfig = BTreeMap<String, BackupContent>;

/// Backup size-trend descriptor entry: the sub-folders whose sizes are
/// compared across consecutive snapshots.
#[derive(Debug, Clone, Deserialize)]
pub struct BackupLocations {
    #[serde(rename = "backup-folders")]
    pub backup_folders: Vec<String>,
}

pub type BackupLocationsConfig = BTreeMap<String, BTreeMap<String, BackupLocations>>;

/// App-server structure descriptor entry.
#[derive(Debug, Clone, Deserialize)]
pub struct AppServer {
    pub host: String,
    pub user: String,
    #[serde(default = "default_ssh_port")]
    pub port: u16,
    pub applications: BTreeMap<String, StructureNode>,
}

pub type AppServersConfig = BTreeMap<String, AppServer>;

/// Process-check descriptor entry: application names only.
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessServer {
    pub host: String,
    pub user: String,
    #[serde(default = "default_ssh_port")]
    pub port: u16,
    pub applications: Vec<String>,
}

pub type ProcessServersConfig = BTreeMap<String, ProcessServer>;

/// Compose-key descriptor entry.
#[derive(Debug, Clone, Deserialize)]
pub struct ComposeServer {
    pub host: String,
    pub user: String,
    #[serde(default = "default_ssh_port")]
    pub port: u16,

    /// Service keys every compose service must carry.
    #[serde(rename = "required-keys", default = "default_required_keys")]
    pub required_keys: Vec<String>,

    pub applications: BTreeMap<String, ComposeApp>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ComposeApp {
    #[serde(rename = "docker-compose-configs")]
    pub compose_configs: Vec<String>,
}

pub type ComposeServersConfig = BTreeMap<String, ComposeServer>;

/// Load one JSON descriptor, failing fast with the file path in the error.
pub fn load_descriptor<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|e| AuditError::Config {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    serde_json::from_str(&content).map_err(|e| AuditError::Config {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// SSH settings for the central backup server, read from the environment
/// (`.env` supported via dotenvy).
#[derive(Debug, Clone)]
pub struct BackupServerEnv {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: Option<String>,
}

impl BackupServerEnv {
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            host: require_env("FLEET_AUDIT_SFTP_HOST")?,
            port: std::env::var("FLEET_AUDIT_SFTP_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(22),
            username: require_env("FLEET_AUDIT_SFTP_USER")?,
            password: std::env::var("FLEET_AUDIT_SFTP_PASSWORD").ok(),
        })
    }
}

/// Session deadline for every SSH call, in milliseconds.
pub fn ssh_timeout_from_env() -> u32 {
    let _ = dotenvy::dotenv();
    std::env::var("FLEET_AUDIT_SSH_TIMEOUT_MS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(30_000)
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| AuditError::Config {
        path: ".env".into(),
        reason: format!("{} is not set", key),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backup_content_descriptor_parses() {
        let json = r#"{
            "abb-charlie": {
                "applications": {
                    "virtuoso": {
                        "expected-files": ["data.ttl"],
                        "dumps": {"expected-file-extensions": ["ttl"]}
                    }
                }
            }
        }"#;

        let config: BackupContentConfig = serde_json::from_str(json).unwrap();
        let apps = &config["abb-charlie"].applications;
        assert!(apps.contains_key("virtuoso"));
        assert!(apps["virtuoso"].children.contains_key("dumps"));
    }

    #[test]
    fn test_backup_locations_descriptor_parses() {
        let json = r#"{
            "abb-charlie": {
                "virtuoso": {"backup-folders": ["db", "dumps"]}
            }
        }"#;

        let config: BackupLocationsConfig = serde_json::from_str(json).unwrap();
        assert_eq!(
            config["abb-charlie"]["virtuoso"].backup_folders,
            vec!["db".to_string(), "dumps".to_string()]
        );
    }

    #[test]
    fn test_app_server_defaults_port() {
        let json = r#"{
            "app-1": {
                "host": "app-1.internal",
                "user": "audit",
                "applications": {"web": {"path": "/opt/web"}}
            }
        }"#;

        let config: AppServersConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config["app-1"].port, 22);
        assert_eq!(
            config["app-1"].applications["web"].path.as_deref(),
            Some("/opt/web")
        );
    }

    #[test]
    fn test_compose_server_defaults_required_keys() {
        let json = r#"{
            "app-1": {
                "host": "app-1.internal",
                "user": "audit",
                "applications": {
                    "web": {"docker-compose-configs": ["/opt/web/docker-compose.yml"]}
                }
            }
        }"#;

        let config: ComposeServersConfig = serde_json::from_str(json).unwrap();
        assert_eq!(
            config["app-1"].required_keys,
            vec!["restart".to_string(), "labels".to_string(), "logging".to_string()]
        );
    }

    #[test]
    fn test_missing_field_fails_fast() {
        // No "host" on the server entry.
        let json = r#"{"app-1": {"user": "audit", "applications": []}}"#;
        let result: std::result::Result<ProcessServersConfig, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn test_load_descriptor_from_file() -> std::io::Result<()> {
        let dir = tempfile::TempDir::new()?;
        let path = dir.path().join("process_servers.json");
        std::fs::write(
            &path,
            r#"{"app-1": {"host": "app-1.internal", "user": "audit", "applications": ["web"]}}"#,
        )?;

        let config: ProcessServersConfig = load_descriptor(&path).unwrap();
        assert_eq!(config["app-1"].applications, vec!["web".to_string()]);
        Ok(())
    }

    #[test]
    fn test_load_descriptor_reports_path() {
        let err =
            load_descriptor::<ProcessServersConfig>(Path::new("/nonexistent/servers.json"))
                .unwrap_err();
        match err {
            AuditError::Config { path, .. } => assert!(path.contains("servers.json")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
