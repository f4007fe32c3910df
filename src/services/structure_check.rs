//! App-server structure audit.
//!
//! Unlike the backup audit, which talks to one central backup server, this
//! audit connects to every app server in the descriptor with that server's
//! own host and user, then verifies each application's declared tree in
//! place. The tree root is the application node's `path` (an absolute path on
//! the app server).

use std::io::Write;

use crate::checks::structure::{self, Finding};
use crate::config::{AppServer, AppServersConfig};
use crate::remote::ssh::{SshSession, SshTarget};
use crate::remote::DirectoryLister;
use crate::report::Reporter;
use crate::utils::errors::Result;

/// Connect to every configured app server and audit its applications.
pub fn run<W: Write>(
    config: &AppServersConfig,
    timeout_ms: u32,
    report: &mut Reporter<W>,
) -> Result<Vec<(String, String, Vec<Finding>)>> {
    let mut results = Vec::new();

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

        match audit_server(&session, server, entry, report) {
            Ok(mut server_results) => results.append(&mut server_results),
            Err(e) => tracing::error!("Structure audit aborted for {}: {}", server, e),
        }
    }

    Ok(results)
}

/// Audit one server's applications against their declared trees.
pub fn audit_server<L, W>(
    lister: &L,
    server: &str,
    entry: &AppServer,
    report: &mut Reporter<W>,
) -> Result<Vec<(String, String, Vec<Finding>)>>
where
    L: DirectoryLister + ?Sized,
    W: Write,
{
    let mut results = Vec::new();

    for (app, node) in &entry.applications {
        report.section(&format!(
            "Checking app folder content for {} in {}",
            app, server
        ))?;

        let findings = structure::verify(node, "", lister)?;
        for finding in &findings {
            report.finding(finding)?;
        }

        if findings.iter().all(|f| !f.is_mismatch()) {
            report.pass("File and folder content check was successful")?;
        } else {
            report.fail("File and folder content check was unsuccessful")?;
        }

        results.push((server.to_string(), app.clone(), findings));
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{RemoteEntry, RemoteError};
    use std::collections::BTreeMap;

    struct MockLister {
        dirs: BTreeMap<String, Vec<RemoteEntry>>,
    }

    impl DirectoryLister for MockLister {
        fn list(&self, path: &str) -> std::result::Result<Vec<RemoteEntry>, RemoteError> {
            self.dirs
                .get(path)
                .cloned()
                .ok_or_else(|| RemoteError::PathNotFound(path.to_string()))
        }
    }

    fn server_entry() -> AppServer {
        let config: AppServersConfig = serde_json::from_str(
            r#"{
                "app-1": {
                    "host": "app-1.internal",
                    "user": "audit",
                    "applications": {
                        "web": {
                            "path": "/opt/web",
                            "expected-files": ["docker-compose.yml", ".env"]
                        }
                    }
                }
            }"#,
        )
        .unwrap();
        config["app-1"].clone()
    }

    #[test]
    fn test_audit_server_uses_declared_root() {
        let lister = MockLister {
            dirs: [(
                "/opt/web".to_string(),
                vec![
                    RemoteEntry::file("docker-compose.yml", 1),
                    RemoteEntry::file(".env", 1),
                ],
            )]
            .into_iter()
            .collect(),
        };

        let mut report = Reporter::new(Vec::new());
        let results = audit_server(&lister, "app-1", &server_entry(), &mut report).unwrap();

        assert_eq!(results.len(), 1);
        let (server, app, findings) = &results[0];
        assert_eq!(server, "app-1");
        assert_eq!(app, "web");
        assert!(findings.iter().all(|f| !f.is_mismatch()));

        let out = String::from_utf8(report.into_inner()).unwrap();
        assert!(out.contains("✅ File and folder content check was successful"));
    }

    #[test]
    fn test_audit_server_reports_mismatch() {
        let lister = MockLister {
            dirs: [(
                "/opt/web".to_string(),
                vec![RemoteEntry::file("docker-compose.yml", 1)],
            )]
            .into_iter()
            .collect(),
        };

        let mut report = Reporter::new(Vec::new());
        let results = audit_server(&lister, "app-1", &server_entry(), &mut report).unwrap();

        assert!(results[0].2.iter().any(|f| f.is_mismatch()));
        let out = String::from_utf8(report.into_inner()).unwrap();
        assert!(out.contains("missing: .env"));
        assert!(out.contains("❌ File and folder content check was unsuccessful"));
    }

    #[test]
    fn test_listing_error_propagates_to_caller() {
        let lister = MockLister {
            dirs: BTreeMap::new(),
        };
        let mut report = Reporter::new(Vec::new());

        let err = audit_server(&lister, "app-1", &server_entry(), &mut report).unwrap_err();
        assert!(matches!(
            err,
            crate::utils::errors::AuditError::Remote(RemoteError::PathNotFound(_))
        ));
    }
}
