//! Container process-status parsing.
//!
//! Input lines come from
//! `docker ps --format "{{.Names}},{{.Image}},{{.Command}},{{.Status}}"`.
//! Older descriptors produced three columns without the command field; both
//! arities are supported.

use std::fmt;

use crate::utils::errors::{AuditError, Result};

/// One parsed `docker ps` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRecord {
    pub name: String,
    pub image: String,
    pub command: Option<String>,
    /// Raw status column, e.g. `Exited (137) 1 hour ago`.
    pub status: String,
    /// First integer embedded in the status column.
    pub exit_code: i64,
}

impl fmt::Display for ProcessRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.name, self.image, self.status)
    }
}

/// Parse one comma-delimited process line.
///
/// Returns `Ok(None)` when the status column carries no embedded integer at
/// all. Lines with an unexpected field count are malformed.
pub fn parse_record(line: &str) -> Result<Option<ProcessRecord>> {
    let fields: Vec<&str> = line.split(',').collect();
    let (name, image, command, status) = match fields.as_slice() {
        [name, image, status] => (*name, *image, None, *status),
        [name, image, command, status] => (*name, *image, Some(command.to_string()), *status),
        _ => {
            return Err(AuditError::MalformedRecord {
                fields: fields.len(),
                line: line.to_string(),
            })
        }
    };

    Ok(first_integer(status).map(|exit_code| ProcessRecord {
        name: name.to_string(),
        image: image.to_string(),
        command,
        status: status.to_string(),
        exit_code,
    }))
}

/// Keep the records whose status carries a nonzero exit code.
///
/// Malformed lines are logged and skipped rather than failing the batch; a
/// single empty line means the host reported no processes at all.
pub fn non_zero_exits<'a, I>(lines: I) -> Vec<ProcessRecord>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut offenders = Vec::new();
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parse_record(line) {
            Ok(Some(record)) if record.exit_code != 0 => offenders.push(record),
            Ok(_) => {}
            Err(e) => tracing::warn!("Skipping process record: {}", e),
        }
    }
    offenders
}

/// First run of ASCII digits in `text`, parsed as an integer.
fn first_integer(text: &str) -> Option<i64> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let rest = &text[start..];
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    rest[..end].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_only_nonzero_exits() {
        let lines = vec![
            "app1,nginx:latest,run,Exited (0) 2 hours ago",
            "app2,redis:7,run,Exited (137) 1 hour ago",
        ];

        let offenders = non_zero_exits(lines);
        assert_eq!(offenders.len(), 1);
        assert_eq!(offenders[0].name, "app2");
        assert_eq!(offenders[0].exit_code, 137);
        assert_eq!(offenders[0].command.as_deref(), Some("run"));
    }

    #[test]
    fn test_empty_input_means_no_processes() {
        let offenders = non_zero_exits(vec![""]);
        assert!(offenders.is_empty());
    }

    #[test]
    fn test_three_field_records_supported() {
        let offenders = non_zero_exits(vec!["app1,nginx:latest,Exited (1) 5 minutes ago"]);
        assert_eq!(offenders.len(), 1);
        assert_eq!(offenders[0].name, "app1");
        assert!(offenders[0].command.is_none());
    }

    #[test]
    fn test_malformed_records_are_skipped() {
        let lines = vec![
            "too,few",
            "way,too,many,fields,here",
            "app2,redis:7,run,Exited (137) 1 hour ago",
        ];
        let offenders = non_zero_exits(lines);
        assert_eq!(offenders.len(), 1);
        assert_eq!(offenders[0].name, "app2");
    }

    #[test]
    fn test_malformed_record_error() {
        let err = parse_record("too,few").unwrap_err();
        assert!(matches!(
            err,
            AuditError::MalformedRecord { fields: 2, .. }
        ));
    }

    #[test]
    fn test_status_without_number_is_dropped() {
        let parsed = parse_record("app1,nginx:latest,run,Created").unwrap();
        assert!(parsed.is_none());
    }

    #[test]
    fn test_first_integer() {
        assert_eq!(first_integer("Exited (137) 1 hour ago"), Some(137));
        assert_eq!(first_integer("Exited (0) 2 hours ago"), Some(0));
        assert_eq!(first_integer("no digits"), None);
    }
}
