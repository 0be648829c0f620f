//! Replication pipeline.
//!
//! Runs each increment as a `zfs send | zfs receive` pair:
//!
//! ```text
//! +--------------------+   OS pipe   +----------------------+
//! |  send (producer)   | ----------> |  receive (consumer)  |
//! |  spawned task      |             |  awaited in place    |
//! +--------------------+             +----------------------+
//! ```
//!
//! The receiver is started first and its stdin handed to the sender as
//! stdout, so no bytes pass through this process. Increments run strictly
//! one after another: each stream's base has to exist on the destination
//! before it can be received.

use std::io;
use std::process::Stdio;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::error::{ProcessError, Result, ZyncError};
use crate::location::Location;
use crate::replicate::plan::Increment;
use crate::transport::wait_or_terminate;
use crate::zfs::Zfs;

/// Apply `plan` from `src` to `dst`, stopping at the first failed receive.
///
/// Increments already received stay in place; running the sync again
/// resumes from them.
pub async fn execute(
    cancel: &CancellationToken,
    zfs: &Zfs,
    src: &Location,
    dst: &Location,
    plan: &[Increment],
) -> Result<()> {
    let total = plan.len();
    for (i, increment) in plan.iter().enumerate() {
        let index = i + 1;
        tracing::info!(index, total, increment = %increment, "transferring increment");
        transfer(cancel, zfs, src, dst, index, increment).await?;
        tracing::info!(index, total, snapshot = %increment.target(), "increment received");
    }
    Ok(())
}

async fn transfer(
    cancel: &CancellationToken,
    zfs: &Zfs,
    src: &Location,
    dst: &Location,
    index: usize,
    increment: &Increment,
) -> Result<()> {
    let fail = |source| ZyncError::Transfer {
        index,
        increment: increment.to_string(),
        source,
    };
    let setup = |source| ZyncError::StreamSetup { index, source };

    let receive = zfs.receive(dst);
    let send = zfs.send(src, increment);

    // 1. Consumer
    tracing::info!(command = %receive, "starting receive");
    let mut cmd = receive.command();
    cmd.stdin(Stdio::piped());
    cmd.stdout(Stdio::inherit());
    cmd.stderr(Stdio::inherit());
    let mut consumer = cmd.spawn().map_err(|source| {
        fail(ProcessError::Spawn {
            program: receive.program.clone(),
            source,
        })
    })?;

    let stdin = consumer.stdin.take().ok_or_else(|| {
        setup(io::Error::new(
            io::ErrorKind::BrokenPipe,
            "receive stdin was not captured",
        ))
    })?;
    let pipe: Stdio = stdin.try_into().map_err(setup)?;

    // 2. Producer, writing straight into the consumer's stdin
    tracing::info!(command = %send, "starting send");
    let mut cmd = send.command();
    cmd.stdout(pipe);
    cmd.stderr(Stdio::inherit());
    let producer_cancel = cancel.child_token();
    let producer = tokio::spawn(run_producer(
        cmd,
        send.program.clone(),
        producer_cancel.clone(),
    ));

    // 3. The receive's exit status decides the increment
    let received = match wait_or_terminate(&mut consumer, cancel).await {
        Some(Ok(status)) => ProcessError::check(&receive.program, status),
        Some(Err(source)) => Err(ProcessError::Wait {
            program: receive.program.clone(),
            source,
        }),
        None => Err(ProcessError::Cancelled {
            program: receive.program.clone(),
        }),
    };

    // Nothing reads the stream any more; don't leave the sender behind.
    if received.is_err() {
        producer_cancel.cancel();
    }

    match producer.await {
        Ok(Ok(())) => tracing::debug!(index, "send finished"),
        Ok(Err(ProcessError::Cancelled { .. })) if received.is_err() => {}
        Ok(Err(e)) => tracing::warn!(index, error = %e, "send failed"),
        Err(e) => tracing::warn!(index, error = %e, "send task panicked"),
    }

    received.map_err(fail)
}

/// Run the sender to completion.
///
/// `cmd` owns the pipe's write end until it is dropped, which happens right
/// after spawning on every path: from then on only the child holds it, so
/// the receiver sees end of stream as soon as the sender exits.
async fn run_producer(
    mut cmd: Command,
    program: String,
    cancel: CancellationToken,
) -> std::result::Result<(), ProcessError> {
    let spawned = cmd.spawn();
    drop(cmd);
    let mut child = spawned.map_err(|source| ProcessError::Spawn {
        program: program.clone(),
        source,
    })?;

    match wait_or_terminate(&mut child, &cancel).await {
        Some(Ok(status)) => ProcessError::check(&program, status),
        Some(Err(source)) => Err(ProcessError::Wait { program, source }),
        None => Err(ProcessError::Cancelled { program }),
    }
}
