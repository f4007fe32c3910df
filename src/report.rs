//! Line-oriented audit reporting.
//!
//! Human-readable output with pass/fail glyphs, written through any
//! `io::Write` so tests can capture it. The reporter only renders; structured
//! findings stay available to callers that need a strict gate.

use std::collections::BTreeSet;
use std::io::{self, Write};

use crate::checks::structure::Finding;

pub const PASS: &str = "✅";
pub const FAIL: &str = "❌";

pub struct Reporter<W: Write> {
    out: W,
}

impl Reporter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Unwrap the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn section(&mut self, title: &str) -> io::Result<()> {
        writeln!(self.out, "\n#")?;
        writeln!(self.out, "# {}", title)?;
        writeln!(self.out, "#")
    }

    pub fn pass(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.out, "{} {}", PASS, message)
    }

    pub fn fail(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.out, "{} {}", FAIL, message)
    }

    pub fn note(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.out, "* {}", message)
    }

    pub fn finding(&mut self, finding: &Finding) -> io::Result<()> {
        match finding {
            Finding::FilesMatch { path } => {
                self.pass(&format!("Files in {} match the declared set", path))
            }
            Finding::FilesMismatch {
                path,
                expected,
                actual,
            } => {
                self.fail(&format!("Files in {} do not match the declared set", path))?;
                self.set_diff(expected, actual)
            }
            Finding::FoldersMatch { path } => {
                self.pass(&format!("Folders in {} match the declared set", path))
            }
            Finding::FoldersMismatch {
                path,
                expected,
                actual,
            } => {
                self.fail(&format!(
                    "Folders in {} do not match the declared set",
                    path
                ))?;
                self.set_diff(expected, actual)
            }
            Finding::ExtensionCounts { path, counts } => {
                for (extension, count) in counts {
                    self.note(&format!(
                        "{}: {} file(s) with extension {}",
                        path, count, extension
                    ))?;
                }
                Ok(())
            }
            Finding::ExtensionMismatch {
                path,
                expected,
                actual,
            } => {
                self.fail(&format!(
                    "Extensions in {} do not match the declared set",
                    path
                ))?;
                self.set_diff(expected, actual)
            }
        }
    }

    fn set_diff(
        &mut self,
        expected: &BTreeSet<String>,
        actual: &BTreeSet<String>,
    ) -> io::Result<()> {
        for name in expected.difference(actual) {
            self.note(&format!("missing: {}", name))?;
        }
        for name in actual.difference(expected) {
            self.note(&format!("unexpected: {}", name))?;
        }
        Ok(())
    }
}
