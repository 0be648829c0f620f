//! Creating a snapshot named after the current time.

use chrono::{DateTime, Local, TimeZone};
use std::process::Stdio;
use tokio_util::sync::CancellationToken;

use super::Zfs;
use crate::error::{ProcessError, Result, ZyncError};
use crate::location::Location;
use crate::transport::wait_or_terminate;

/// Snapshot name format, e.g. `2024-03-01-17:05:09`
pub const SNAPSHOT_NAME_FORMAT: &str = "%Y-%m-%d-%H:%M:%S";

pub fn snapshot_name<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format(SNAPSHOT_NAME_FORMAT).to_string()
}

/// Snapshot `location` now. Returns the new snapshot's name.
pub async fn create_snapshot(
    cancel: &CancellationToken,
    zfs: &Zfs,
    location: &Location,
) -> Result<String> {
    let name = snapshot_name(&Local::now());
    let fail = |source| ZyncError::Snapshot {
        location: location.to_string(),
        source,
    };

    let invocation = zfs.snapshot(location, &name);
    tracing::info!(command = %invocation, "creating snapshot");

    let mut cmd = invocation.command();
    cmd.stdout(Stdio::inherit());
    cmd.stderr(Stdio::inherit());

    let mut child = cmd.spawn().map_err(|source| {
        fail(ProcessError::Spawn {
            program: invocation.program.clone(),
            source,
        })
    })?;

    let status = match wait_or_terminate(&mut child, cancel).await {
        Some(status) => status.map_err(|source| {
            fail(ProcessError::Wait {
                program: invocation.program.clone(),
                source,
            })
        })?,
        None => {
            return Err(fail(ProcessError::Cancelled {
                program: invocation.program.clone(),
            }))
        }
    };
    ProcessError::check(&invocation.program, status).map_err(fail)?;

    Ok(name)
}
