//! Replication: list both sides, reconcile, stream the missing increments.

pub mod pipeline;
pub mod plan;

pub use pipeline::execute;
pub use plan::{common_point, reconcile, Increment, Plan};

use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::location::Location;
use crate::zfs::{list_snapshots, Zfs};

/// Compute the plan that would bring `dst` up to date with `src`.
///
/// Both histories are listed fresh on every call.
pub async fn plan_sync(
    cancel: &CancellationToken,
    zfs: &Zfs,
    src: &Location,
    dst: &Location,
) -> Result<Plan> {
    let src_history = list_snapshots(cancel, zfs, src).await?;
    if src_history.is_empty() {
        tracing::info!(source = %src, "source has no snapshots");
        return Ok(Vec::new());
    }

    let dst_history = list_snapshots(cancel, zfs, dst).await?;
    let plan = reconcile(&src_history, &dst_history)?;
    tracing::debug!(
        source_snapshots = src_history.len(),
        destination_snapshots = dst_history.len(),
        increments = plan.len(),
        "reconciled histories"
    );
    Ok(plan)
}

/// Bring `dst` up to date with `src`. Returns the increments applied.
pub async fn sync(
    cancel: &CancellationToken,
    zfs: &Zfs,
    src: &Location,
    dst: &Location,
) -> Result<Plan> {
    let plan = plan_sync(cancel, zfs, src, dst).await?;
    if plan.is_empty() {
        tracing::info!(source = %src, destination = %dst, "already up to date");
        return Ok(plan);
    }
    execute(cancel, zfs, src, dst, &plan).await?;
    Ok(plan)
}
