//! Container exit-status audit.
//!
//! For every configured app, lists the exited containers belonging to its
//! compose project and reports the ones that exited with a nonzero code.

use std::io::Write;

use crate::checks::processes::{self, ProcessRecord};
use crate::config::{ProcessServer, ProcessServersConfig};
use crate::remote::ssh::{SshSession, SshTarget};
use crate::remote::CommandRunner;
use crate::report::Reporter;
use crate::utils::errors::Result;

fn docker_ps_command(app: &str) -> String {
    format!(
        "docker ps -a -f \"label=com.docker.compose.project={}\" -f \"status=exited\" --format \"{{{{.Names}}}},{{{{.Image}}}},{{{{.Command}}}},{{{{.Status}}}}\"",
        app
    )
}

/// Connect to every configured server and audit its container statuses.
pub fn run<W: Write>(
    config: &ProcessServersConfig,
    timeout_ms: u32,
    report: &mut Reporter<W>,
) -> Result<Vec<(String, String, ProcessRecord)>> {
    let mut offenders = Vec::new();

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
            Ok(mut server_offenders) => offenders.append(&mut server_offenders),
            Err(e) => tracing::error!("Process audit aborted for {}: {}", server, e),
        }
    }

    Ok(offenders)
}

/// Audit one server's containers, app by app.
pub fn audit_server<R, W>(
    runner: &R,
    server: &str,
    entry: &ProcessServer,
    report: &mut Reporter<W>,
) -> Result<Vec<(String, String, ProcessRecord)>>
where
    R: CommandRunner + ?Sized,
    W: Write,
{
    let mut offenders = Vec::new();

    for app in &entry.applications {
        report.section(&format!(
            "Checking docker container statuses for {} on {}",
            app, server
        ))?;

        let output = runner.run(&docker_ps_command(app))?;
        let bad = processes::non_zero_exits(output.stdout.lines());

        if bad.is_empty() {
            report.pass(&format!(
                "{} has no processes that have exited with a non-zero exit code",
                app
            ))?;
        } else {
            for record in &bad {
                report.note(&record.to_string())?;
            }
            report.fail(&format!(
                "{} has processes that exited with a non-zero exit code",
                app
            ))?;
        }

        for record in bad {
            offenders.push((server.to_string(), app.clone(), record));
        }
    }

    Ok(offenders)
}
