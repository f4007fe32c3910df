//! Compose-file key audit.
//!
//! Fetches every declared compose file into a per-run scratch directory,
//! folds base and override documents into one, and reports the services
//! missing required keys.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

use serde_yaml::Value;
use uuid::Uuid;

use crate::checks::compose;
use crate::config::{ComposeServer, ComposeServersConfig};
use crate::remote::ssh::{SshSession, SshTarget};
use crate::remote::FileFetcher;
use crate::report::Reporter;
use crate::utils::errors::Result;

/// Missing services per required key, keyed by application (`server/app` in
/// the results of a full run).
pub type MissingKeys = BTreeMap<String, BTreeMap<String, Vec<String>>>;

/// Per-run scratch directory for fetched compose files.
///
/// The path is unique per run, so concurrent audits never share it. Removed
/// on drop.
pub struct ScratchDir {
    root: PathBuf,
}

impl ScratchDir {
    pub fn create() -> std::io::Result<Self> {
        let root = std::env::temp_dir().join(format!("fleet-audit-{}", Uuid::new_v4()));
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn subdir(&self, server: &str, app: &str) -> std::io::Result<PathBuf> {
        let dir = self.root.join(server).join(app);
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_dir_all(&self.root) {
            tracing::warn!(
                "Failed to remove scratch directory {}: {}",
                self.root.display(),
                e
            );
        }
    }
}

/// Connect to every configured server and audit its compose files.
pub fn run<W: Write>(
    config: &ComposeServersConfig,
    timeout_ms: u32,
    report: &mut Reporter<W>,
) -> Result<MissingKeys> {
    let scratch = ScratchDir::create()?;
    let mut results = MissingKeys::new();

    for (server, entry) in config {
        let target = SshTarget {
            host: entry.host.clone(),
            port: entry.port,
            username: entry.user.clone(),
            password: None,
            timeout_ms,
        };

        let session = match SshSession::connect(&target) {
            Ok(session) => session,
            Err(e) => {
                tracing::error!("Skipping {}: {}", server, e);
                continue;
            }
        };

        match audit_server(&session, server, entry, &scratch, report) {
            Ok(server_results) => {
                for (app, missing) in server_results {
                    results.insert(format!("{}/{}", server, app), missing);
                }
            }
            Err(e) => tracing::error!("Compose audit aborted for {}: {}", server, e),
        }
    }

    Ok(results)
}

/// Audit one server's applications, fetching and merging their compose files.
pub fn audit_server<F, W>(
    fetcher: &F,
    server: &str,
    entry: &ComposeServer,
    scratch: &ScratchDir,
    report: &mut Reporter<W>,
) -> Result<MissingKeys>
where
    F: FileFetcher + ?Sized,
    W: Write,
{
    let mut results = MissingKeys::new();

    for (app, app_entry) in &entry.applications {
        report.section(&format!(
            "Checking missing docker compose config keys for {} in {}",
            app, server
        ))?;

        let dest = scratch.subdir(server, app)?;

        let mut merged = Value::Null;
        for remote_path in &app_entry.compose_configs {
            let local = fetcher.fetch(remote_path, &dest)?;
            let content = fs::read_to_string(&local)?;
            let document: Value = serde_yaml::from_str(&content)?;
            merged = compose::merge_values(&merged, &document);
        }

        let missing = compose::services_missing_keys(&merged, &entry.required_keys);

        if missing.values().all(|services| services.is_empty()) {
            report.pass(&format!("All services for {} carry the required keys", app))?;
        } else {
            report.fail(&format!("Services with missing keys for {}:", app))?;
            for (key, services) in &missing {
                if !services.is_empty() {
                    report.note(&format!("{}: {}", key, services.join(", ")))?;
                }
            }
        }

        results.insert(app.clone(), missing);
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::RemoteError;
    use std::path::Path;

    /// Fetcher that "downloads" from an in-memory map of remote paths.
    struct MockFetcher {
        files: BTreeMap<String, String>,
    }

    impl FileFetcher for MockFetcher {
        fn fetch(
            &self,
            remote_path: &str,
            local_dir: &Path,
        ) -> std::result::Result<PathBuf, RemoteError> {
            let content = self
                .files
                .get(remote_path)
                .ok_or_else(|| RemoteError::Transfer(remote_path.to_string()))?;
            let file_name = remote_path.rsplit('/').next().unwrap_or(remote_path);
            let dest = local_dir.join(file_name);
            fs::write(&dest, content).map_err(|e| RemoteError::Transfer(e.to_string()))?;
            Ok(dest)
        }
    }

    fn server_entry() -> ComposeServer {
        let config: ComposeServersConfig = serde_json::from_str(
            r#"{
                "app-1": {
                    "host": "app-1.internal",
                    "user": "audit",
                    "applications": {
                        "web": {
                            "docker-compose-configs": [
                                "/opt/web/docker-compose.yml",
                                "/opt/web/docker-compose.override.yml"
                            ]
                        }
                    }
                }
            }"#,
        )
        .unwrap();
        config["app-1"].clone()
    }

    #[test]
    fn test_merged_documents_checked_for_keys() {
        let fetcher = MockFetcher {
            files: [
                (
                    "/opt/web/docker-compose.yml".to_string(),
                    "services:\n  web:\n    restart: always\n  worker:\n    image: worker:1\n"
                        .to_string(),
                ),
                (
                    "/opt/web/docker-compose.override.yml".to_string(),
                    "services:\n  web:\n    labels: [a]\n    logging:\n      driver: journald\n"
                        .to_string(),
                ),
            ]
            .into_iter()
            .collect(),
        };

        let scratch = ScratchDir::create().unwrap();
        let mut report = Reporter::new(Vec::new());
        let results =
            audit_server(&fetcher, "app-1", &server_entry(), &scratch, &mut report).unwrap();

        // `web` is complete once the override is merged in; `worker` misses
        // every required key.
        let missing = &results["web"];
        assert!(missing["restart"].contains(&"worker".to_string()));
        assert!(missing["labels"].contains(&"worker".to_string()));
        assert!(!missing["restart"].contains(&"web".to_string()));
        assert!(!missing["labels"].contains(&"web".to_string()));

        let out = String::from_utf8(report.into_inner()).unwrap();
        assert!(out.contains("restart: worker"));
    }

    #[test]
    fn test_fetch_failure_aborts_server() {
        let fetcher = MockFetcher {
            files: BTreeMap::new(),
        };

        let scratch = ScratchDir::create().unwrap();
        let mut report = Reporter::new(Vec::new());
        let err =
            audit_server(&fetcher, "app-1", &server_entry(), &scratch, &mut report).unwrap_err();
        assert!(matches!(
            err,
            crate::utils::errors::AuditError::Remote(RemoteError::Transfer(_))
        ));
    }

    #[test]
    fn test_scratch_dir_removed_on_drop() {
        let scratch = ScratchDir::create().unwrap();
        let root = scratch.root.clone();
        scratch.subdir("app-1", "web").unwrap();
        assert!(root.exists());

        drop(scratch);
        assert!(!root.exists());
    }
}
