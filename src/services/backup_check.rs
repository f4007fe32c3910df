//! Backup audit: freshness, completeness and size trend per backup server.
//!
//! Per server the audit runs a fixed sequence — fetch the snapshot listing,
//! select the latest and previous snapshots, check freshness against today,
//! check the top-level app folders, verify each app's declared structure, then
//! compare backed-up sizes across the two snapshots. Every step is soft: a
//! negative outcome is reported and the sequence continues.

use std::collections::BTreeSet;
use std::io::Write;

use chrono::{NaiveDate, NaiveDateTime};

use crate::checks::{size, snapshots, structure};
use crate::config::{BackupContentConfig, BackupLocationsConfig};
use crate::remote::{DirectoryLister, EntryKind};
use crate::report::Reporter;
use crate::utils::errors::{AuditError, Result};

/// Aggregate outcome of one backup audit run.
///
/// `is_clean` is advisory; callers needing a strict gate must inspect the
/// individual findings.
#[derive(Debug, Default)]
pub struct BackupAuditOutcome {
    /// Servers whose latest snapshot does not carry today's date.
    pub stale_servers: Vec<String>,
    /// Servers missing a top-level folder for at least one configured app.
    pub incomplete_servers: Vec<String>,
    /// Structure findings per (server, app).
    pub structure_findings: Vec<(String, String, Vec<structure::Finding>)>,
    /// Size totals per (server, app, backup folder) across the latest and
    /// previous snapshots.
    pub size_trends: Vec<SizeTrend>,
}

impl BackupAuditOutcome {
    pub fn is_clean(&self) -> bool {
        self.stale_servers.is_empty()
            && self.incomplete_servers.is_empty()
            && self
                .structure_findings
                .iter()
                .all(|(_, _, findings)| findings.iter().all(|f| !f.is_mismatch()))
    }
}

/// Size totals for one backup folder across two consecutive snapshots.
/// Whether a shrinking total is acceptable is a judgment left to the reader;
/// the audit reports both numbers.
#[derive(Debug, Clone)]
pub struct SizeTrend {
    pub server: String,
    pub app: String,
    pub folder: String,
    pub latest_date: String,
    pub latest_bytes: u64,
    pub previous_date: String,
    pub previous_bytes: u64,
}

/// Run the backup audit across all configured servers.
///
/// Transport errors abort the current server and the audit moves on; only
/// reporting I/O failures end the run.
pub fn run<L, W>(
    lister: &L,
    content: &BackupContentConfig,
    locations: &BackupLocationsConfig,
    today: NaiveDate,
    report: &mut Reporter<W>,
) -> Result<BackupAuditOutcome>
where
    L: DirectoryLister + ?Sized,
    W: Write,
{
    let mut outcome = BackupAuditOutcome::default();

    for (server, entry) in content {
        if let Err(e) = audit_server_content(lister, server, entry, today, report, &mut outcome) {
            if fatal(&e) {
                return Err(e);
            }
            tracing::error!("Backup audit aborted for {}: {}", server, e);
        }
    }

    report.section("Checking backup sizes")?;

    for (server, apps) in locations {
        if let Err(e) = audit_server_sizes(lister, server, apps, report, &mut outcome) {
            if fatal(&e) {
                return Err(e);
            }
            tracing::error!("Size audit aborted for {}: {}", server, e);
        }
    }

    Ok(outcome)
}

/// Reporting I/O errors are fatal to the whole run; remote and selection
/// errors only abort the current server.
fn fatal(e: &AuditError) -> bool {
    matches!(e, AuditError::Io(_))
}

fn audit_server_content<L, W>(
    lister: &L,
    server: &str,
    entry: &crate::config::BackupContent,
    today: NaiveDate,
    report: &mut Reporter<W>,
    outcome: &mut BackupAuditOutcome,
) -> Result<()>
where
    L: DirectoryLister + ?Sized,
    W: Write,
{
    let listing = lister.list(&format!("/{}", server))?;
    let latest = snapshots::select_nth_with_full_timestamp(&listing, 0)?;
    let snapshot_root = format!("/{}/{}", server, latest.name);

    report.section(&format!("Checking if {} has today's backup", server))?;

    let latest_date = snapshots::date_part(&latest.timestamp);
    if latest_date == today.format("%Y%m%d").to_string() {
        report.pass(&format!(
            "{} has a backup folder with today's timestamp",
            server
        ))?;
    } else {
        report.fail(&format!(
            "{} does not have a backup folder with today's timestamp (latest: {})",
            server, latest_date
        ))?;
        outcome.stale_servers.push(server.to_string());
    }

    let expected_apps: BTreeSet<String> = entry.applications.keys().cloned().collect();
    report.section(&format!(
        "Checking if {} has a top-level folder for each app ({})",
        server,
        expected_apps
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join(", ")
    ))?;

    let data_entries = lister.list(&format!("{}/data", snapshot_root))?;
    let actual_apps: BTreeSet<String> = data_entries
        .iter()
        .filter(|e| e.kind == EntryKind::Directory)
        .map(|e| e.name.clone())
        .collect();

    if expected_apps == actual_apps {
        report.pass(&format!(
            "{} has a top-level folder for each application",
            server
        ))?;
    } else {
        report.fail(&format!(
            "{} does not have a top-level folder for each application",
            server
        ))?;
        outcome.incomplete_servers.push(server.to_string());
    }

    for (app, node) in &entry.applications {
        report.section(&format!(
            "Checking app folder content for {} in {}",
            app, server
        ))?;

        let app_root = format!("{}/data/{}", snapshot_root, app);
        let findings = structure::verify(node, &app_root, lister)?;
        for finding in &findings {
            report.finding(finding)?;
        }

        if findings.iter().all(|f| !f.is_mismatch()) {
            report.pass(&format!(
                "File and folder content check for {} in {} was successful",
                app, server
            ))?;
        } else {
            report.fail(&format!(
                "File and folder content check for {} in {} was unsuccessful",
                app, server
            ))?;
        }
        outcome
            .structure_findings
            .push((server.to_string(), app.clone(), findings));
    }

    Ok(())
}

fn audit_server_sizes<L, W>(
    lister: &L,
    server: &str,
    apps: &std::collections::BTreeMap<String, crate::config::BackupLocations>,
    report: &mut Reporter<W>,
    outcome: &mut BackupAuditOutcome,
) -> Result<()>
where
    L: DirectoryLister + ?Sized,
    W: Write,
{
    // The listing is fetched again rather than reused from the content phase:
    // the two descriptors may name different server sets.
    let listing = lister.list(&format!("/{}", server))?;
    let latest = snapshots::select_nth_with_full_timestamp(&listing, 0)?;
    let previous = snapshots::select_nth_with_full_timestamp(&listing, 1)?;

    let latest_date = iso_date(&latest.name, &latest.timestamp)?;
    let previous_date = iso_date(&previous.name, &previous.timestamp)?;

    for (app, locations) in apps {
        report.section(&format!("Checking backups for {} on {}", app, server))?;

        for folder in &locations.backup_folders {
            let latest_path = format!("/{}/{}/data/{}/{}", server, latest.name, app, folder);
            let previous_path = format!("/{}/{}/data/{}/{}", server, previous.name, app, folder);

            let previous_files = file_sizes(lister.list(&previous_path)?);
            let latest_files = file_sizes(lister.list(&latest_path)?);

            let (previous_bytes, previous_human) = size::total_size(&previous_files);
            let (latest_bytes, latest_human) = size::total_size(&latest_files);

            report.note(&format!(
                "Backup size for {} on {} is {}",
                previous_path, previous_date, previous_human
            ))?;
            report.note(&format!(
                "Backup size for {} on {} is {}",
                latest_path, latest_date, latest_human
            ))?;

            outcome.size_trends.push(SizeTrend {
                server: server.to_string(),
                app: app.clone(),
                folder: folder.clone(),
                latest_date: latest_date.clone(),
                latest_bytes,
                previous_date: previous_date.clone(),
                previous_bytes,
            });
        }
    }

    Ok(())
}

fn file_sizes(entries: Vec<crate::remote::RemoteEntry>) -> Vec<(String, u64)> {
    entries
        .into_iter()
        .filter(|e| e.kind == EntryKind::File)
        .map(|e| (e.name, e.size))
        .collect()
}

fn iso_date(name: &str, timestamp: &str) -> Result<String> {
    let parsed = NaiveDateTime::parse_from_str(timestamp, snapshots::TIMESTAMP_FORMAT)
        .map_err(|_| AuditError::MalformedName(name.to_string()))?;
    Ok(parsed.date().format("%Y-%m-%d").to_string())
}
