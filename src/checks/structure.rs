//! Declared-structure verification against remote directory listings.
//!
//! An expected-structure tree describes what a directory hierarchy must
//! contain: exact file sets, required file extensions and required
//! subdirectories. The matcher walks that tree breadth-first, lists the actual
//! directory behind each node and records a finding per declared check. A
//! mismatch never stops the walk — the full tree is always visited and the
//! caller receives every finding in traversal order. Only a failed listing
//! aborts.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::Deserialize;

use crate::remote::{DirectoryLister, EntryKind, RemoteError};

/// Declarative expectation for one directory.
///
/// In the JSON descriptor, the reserved keys below configure the node itself;
/// every other key whose value is an object is a subdirectory requirement. A
/// node declaring none of these is a leaf directory whose existence is checked
/// by its parent's folder comparison.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StructureNode {
    /// Relative path from the audit root. When omitted, the node's key under
    /// its parent is used as the path segment.
    #[serde(default)]
    pub path: Option<String>,

    /// Exact set of file names the directory must contain.
    #[serde(rename = "expected-files", default)]
    pub expected_files: Option<BTreeSet<String>>,

    /// Distinct file extensions the directory must contain.
    #[serde(rename = "expected-file-extensions", default)]
    pub expected_extensions: Option<BTreeSet<String>>,

    /// Subdirectory requirements.
    #[serde(flatten)]
    pub children: BTreeMap<String, StructureNode>,
}

/// One verification outcome, in traversal order.
///
/// Mismatches are data, not errors: they carry both sides of the comparison so
/// a reporter can show what is missing and what is unexpected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finding {
    FilesMatch {
        path: String,
    },
    FilesMismatch {
        path: String,
        expected: BTreeSet<String>,
        actual: BTreeSet<String>,
    },
    FoldersMatch {
        path: String,
    },
    FoldersMismatch {
        path: String,
        expected: BTreeSet<String>,
        actual: BTreeSet<String>,
    },
    ExtensionCounts {
        path: String,
        counts: BTreeMap<String, usize>,
    },
    ExtensionMismatch {
        path: String,
        expected: BTreeSet<String>,
        actual: BTreeSet<String>,
    },
}

impl Finding {
    pub fn path(&self) -> &str {
        match self {
            Finding::FilesMatch { path }
            | Finding::FilesMismatch { path, .. }
            | Finding::FoldersMatch { path }
            | Finding::FoldersMismatch { path, .. }
            | Finding::ExtensionCounts { path, .. }
            | Finding::ExtensionMismatch { path, .. } => path,
        }
    }

    /// True for the mismatch variants; count tallies are informational.
    pub fn is_mismatch(&self) -> bool {
        matches!(
            self,
            Finding::FilesMismatch { .. }
                | Finding::FoldersMismatch { .. }
                | Finding::ExtensionMismatch { .. }
        )
    }
}

/// Walk `expected` breadth-first against the directory tree under
/// `actual_root` and collect a finding per declared check.
pub fn verify<L>(
    expected: &StructureNode,
    actual_root: &str,
    lister: &L,
) -> Result<Vec<Finding>, RemoteError>
where
    L: DirectoryLister + ?Sized,
{
    let mut findings = Vec::new();
    let mut queue: VecDeque<(String, &StructureNode)> = VecDeque::new();
    queue.push_back((expected.path.clone().unwrap_or_default(), expected));

    while let Some((relative, node)) = queue.pop_front() {
        let current = join_path(actual_root, &relative);
        let entries = lister.list(&current)?;

        if let Some(expected_files) = &node.expected_files {
            let actual: BTreeSet<String> = entries
                .iter()
                .filter(|e| e.kind == EntryKind::File)
                .map(|e| e.name.clone())
                .collect();

            if *expected_files == actual {
                findings.push(Finding::FilesMatch {
                    path: current.clone(),
                });
            } else {
                findings.push(Finding::FilesMismatch {
                    path: current.clone(),
                    expected: expected_files.clone(),
                    actual,
                });
            }
        }

        if let Some(declared) = &node.expected_extensions {
            let observed: Vec<&str> = entries
                .iter()
                .filter(|e| e.kind == EntryKind::File)
                .filter_map(|e| extension_of(&e.name))
                .collect();
            let observed_set: BTreeSet<String> =
                observed.iter().map(|ext| ext.to_string()).collect();

            // The tally keeps zero entries for declared extensions with no
            // occurrences; the set comparison below is what decides a
            // mismatch.
            let mut counts: BTreeMap<String, usize> =
                declared.iter().map(|ext| (ext.clone(), 0)).collect();
            for ext in &observed {
                if let Some(count) = counts.get_mut(*ext) {
                    *count += 1;
                }
            }
            findings.push(Finding::ExtensionCounts {
                path: current.clone(),
                counts,
            });

            if *declared != observed_set {
                findings.push(Finding::ExtensionMismatch {
                    path: current.clone(),
                    expected: declared.clone(),
                    actual: observed_set,
                });
            }
        }

        if !node.children.is_empty() {
            let actual_dirs: BTreeSet<String> = entries
                .iter()
                .filter(|e| e.kind == EntryKind::Directory)
                .map(|e| e.name.clone())
                .collect();

            // The folder comparison only runs when both sides are non-empty.
            // An empty actual listing (or a node with no children) skips the
            // check entirely rather than reporting a trivial outcome; audits
            // depend on this behavior.
            if !actual_dirs.is_empty() {
                let declared_dirs: BTreeSet<String> = node.children.keys().cloned().collect();
                if declared_dirs == actual_dirs {
                    findings.push(Finding::FoldersMatch {
                        path: current.clone(),
                    });
                } else {
                    findings.push(Finding::FoldersMismatch {
                        path: current.clone(),
                        expected: declared_dirs,
                        actual: actual_dirs,
                    });
                }
            }
        }

        // Children are visited regardless of this node's outcome.
        for (key, child) in &node.children {
            let child_relative = match &child.path {
                Some(path) => path.clone(),
                None => join_path(&relative, key),
            };
            queue.push_back((child_relative, child));
        }
    }

    Ok(findings)
}

fn join_path(base: &str, relative: &str) -> String {
    if relative.is_empty() {
        base.trim_end_matches('/').to_string()
    } else if base.is_empty() {
        relative.to_string()
    } else {
        format!(
            "{}/{}",
            base.trim_end_matches('/'),
            relative.trim_start_matches('/')
        )
    }
}

/// Everything after the first `.`, so `a.tar.gz` yields `tar.gz`. Names
/// without a dot have no extension.
fn extension_of(name: &str) -> Option<&str> {
    name.split_once('.').map(|(_, ext)| ext)
}
