//! Computing which streams bring a destination up to date with its source.

use std::fmt;

use crate::error::{Result, ZyncError};

/// One send/receive step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Increment {
    /// Whole snapshot; only used when the destination has nothing yet
    Full { target: String },
    /// Delta between two consecutive source snapshots
    Incremental { from: String, target: String },
}

impl Increment {
    pub fn target(&self) -> &str {
        match self {
            Increment::Full { target } | Increment::Incremental { target, .. } => target,
        }
    }

    /// Snapshot the stream is based on; `None` for a full stream.
    pub fn base(&self) -> Option<&str> {
        match self {
            Increment::Full { .. } => None,
            Increment::Incremental { from, .. } => Some(from),
        }
    }
}

impl fmt::Display for Increment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Increment::Full { target } => write!(f, "full {}", target),
            Increment::Incremental { from, target } => write!(f, "{} -> {}", from, target),
        }
    }
}

/// Ordered increments; applying them in order replays the source history
/// on the destination.
pub type Plan = Vec<Increment>;

/// Newest destination snapshot that also exists in the source, as an index
/// into `src`.
pub fn common_point(src: &[String], dst: &[String]) -> Option<usize> {
    dst.iter()
        .rev()
        .find_map(|name| src.iter().position(|s| s == name))
}

/// Compare two histories (both oldest first) and build the plan.
///
/// Fails instead of guessing when the destination holds snapshots newer
/// than the common one, or holds snapshots but shares none with the
/// source: a forced receive would destroy them.
pub fn reconcile(src: &[String], dst: &[String]) -> Result<Plan> {
    if src.is_empty() {
        return Ok(Vec::new());
    }

    let start = match common_point(src, dst) {
        Some(idx) => {
            let common = &src[idx];
            if let Some(pos) = dst.iter().rposition(|name| name == common) {
                let extra = &dst[pos + 1..];
                if !extra.is_empty() {
                    return Err(ZyncError::Divergence {
                        common: common.clone(),
                        extra: extra.to_vec(),
                    });
                }
            }
            idx
        }
        None if dst.is_empty() => {
            let mut plan = vec![Increment::Full {
                target: src[0].clone(),
            }];
            plan.extend(chain(src, 0));
            return Ok(plan);
        }
        None => {
            return Err(ZyncError::NoCommonSnapshot {
                destination: dst.join(", "),
            })
        }
    };

    Ok(chain(src, start).collect())
}

fn chain(src: &[String], start: usize) -> impl Iterator<Item = Increment> + '_ {
    src[start..].windows(2).map(|pair| Increment::Incremental {
        from: pair[0].clone(),
        target: pair[1].clone(),
    })
}
