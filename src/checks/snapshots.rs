//! Snapshot selection by name-encoded timestamp.
//!
//! Backup snapshots are directories named `<prefix>_<YYYYMMDDTHHMMSS>`, so
//! lexicographic order on the name equals chronological order. Snapshot
//! directories share their parent with non-timestamped control folders (an
//! incremental marker, lost+found and the like); an explicit predicate filters
//! those out before ranking, so rank 0 is always the genuinely latest backup.

use chrono::NaiveDateTime;

use crate::remote::{EntryKind, RemoteEntry};
use crate::utils::errors::{AuditError, Result};

/// Format of the timestamp suffix on snapshot directory names.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S";

/// A ranked snapshot with its extracted timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRef {
    pub name: String,
    /// Raw `YYYYMMDDTHHMMSS` suffix, or its `YYYYMMDD` date part when selected
    /// through the date-only variant.
    pub timestamp: String,
}

/// True when `name` carries an `_`-separated suffix that parses as a
/// `YYYYMMDDTHHMMSS` timestamp.
pub fn is_timestamped_snapshot(name: &str) -> bool {
    match name.rsplit_once('_') {
        Some((_, suffix)) => NaiveDateTime::parse_from_str(suffix, TIMESTAMP_FORMAT).is_ok(),
        None => false,
    }
}

/// Extract the raw timestamp suffix from a snapshot name.
///
/// An example snapshot name is `data_backup_20240117T054501`: splitting on the
/// last `_` yields `20240117T054501`.
pub fn timestamp_suffix(name: &str) -> Result<&str> {
    name.rsplit_once('_')
        .map(|(_, suffix)| suffix)
        .ok_or_else(|| AuditError::MalformedName(name.to_string()))
}

/// Truncate a full `YYYYMMDDTHHMMSS` timestamp to its `YYYYMMDD` date part.
pub fn date_part(timestamp: &str) -> &str {
    timestamp.split('T').next().unwrap_or(timestamp)
}

fn ranked_snapshots(entries: &[RemoteEntry]) -> Vec<&RemoteEntry> {
    let mut snapshots: Vec<&RemoteEntry> = entries
        .iter()
        .filter(|e| e.kind == EntryKind::Directory && is_timestamped_snapshot(&e.name))
        .collect();
    snapshots.sort_by(|a, b| b.name.cmp(&a.name));
    snapshots
}

fn select_nth(entries: &[RemoteEntry], n: usize) -> Result<&RemoteEntry> {
    let ranked = ranked_snapshots(entries);
    let len = ranked.len();
    ranked
        .get(n)
        .copied()
        .ok_or(AuditError::IndexOutOfRange { index: n, len })
}

/// Select the nth most recent snapshot (0 = latest), keeping the full
/// timestamp.
pub fn select_nth_with_full_timestamp(entries: &[RemoteEntry], n: usize) -> Result<SnapshotRef> {
    let entry = select_nth(entries, n)?;
    Ok(SnapshotRef {
        name: entry.name.clone(),
        timestamp: timestamp_suffix(&entry.name)?.to_string(),
    })
}

/// Select the nth most recent snapshot (0 = latest), truncating the timestamp
/// to its date part.
pub fn select_nth_with_date_only(entries: &[RemoteEntry], n: usize) -> Result<SnapshotRef> {
    let entry = select_nth(entries, n)?;
    let suffix = timestamp_suffix(&entry.name)?;
    Ok(SnapshotRef {
        name: entry.name.clone(),
        timestamp: date_part(suffix).to_string(),
    })
}
