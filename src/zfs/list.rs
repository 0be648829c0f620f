//! Snapshot history of one location.

use std::io;
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;

use super::Zfs;
use crate::error::{ProcessError, Result, ZyncError};
use crate::location::Location;
use crate::transport::terminate;

/// List the snapshots of `location`, oldest first.
///
/// Names are returned without the `<path>@` prefix, in the order zfs
/// reported them. A dataset without snapshots yields an empty list. The
/// listing's stderr goes straight to ours.
pub async fn list_snapshots(
    cancel: &CancellationToken,
    zfs: &Zfs,
    location: &Location,
) -> Result<Vec<String>> {
    let fail = |source| ZyncError::List {
        location: location.to_string(),
        source,
    };

    let invocation = zfs.list(location);
    tracing::info!(command = %invocation, "listing snapshots");

    let mut cmd = invocation.command();
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::inherit());

    let mut child = cmd.spawn().map_err(|source| {
        fail(ProcessError::Spawn {
            program: invocation.program.clone(),
            source,
        })
    })?;
    let wait_failed = |source| {
        fail(ProcessError::Wait {
            program: invocation.program.clone(),
            source,
        })
    };

    let mut stdout = child.stdout.take().ok_or_else(|| {
        wait_failed(io::Error::new(
            io::ErrorKind::BrokenPipe,
            "listing stdout was not captured",
        ))
    })?;

    // Read to end of stream first, then reap.
    let mut output = Vec::new();
    let read = tokio::select! {
        read = stdout.read_to_end(&mut output) => Some(read),
        _ = cancel.cancelled() => None,
    };
    let Some(read) = read else {
        terminate(&mut child).await;
        return Err(fail(ProcessError::Cancelled {
            program: invocation.program.clone(),
        }));
    };
    read.map_err(wait_failed)?;
    drop(stdout);
    let status = child.wait().await.map_err(wait_failed)?;

    ProcessError::check(&invocation.program, status).map_err(fail)?;

    let stdout = String::from_utf8_lossy(&output);
    let names = parse_listing(location, &stdout).map_err(fail)?;
    tracing::debug!(location = %location, count = names.len(), "listed snapshots");
    Ok(names)
}

/// Strip `<path>@` from every whitespace-separated entry, keeping order.
pub fn parse_listing(
    location: &Location,
    output: &str,
) -> std::result::Result<Vec<String>, ProcessError> {
    let prefix = format!("{}@", location.path());
    output
        .split_whitespace()
        .map(|entry| match entry.strip_prefix(&prefix) {
            Some(name) if !name.is_empty() => Ok(name.to_string()),
            _ => Err(ProcessError::MalformedOutput {
                line: entry.to_string(),
            }),
        })
        .collect()
}
