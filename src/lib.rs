//! zync - incremental ZFS snapshot replication.
//!
//! Lists the snapshot histories of a source and a destination dataset,
//! works out which streams the destination is missing, and pipes
//! `zfs send` into `zfs receive` for each of them in order. Either side
//! may live on another host reached through ssh.

pub mod config;
pub mod error;
pub mod location;
pub mod replicate;
pub mod transport;
pub mod zfs;

pub use config::Config;
pub use error::{ProcessError, Result, ZyncError};
pub use location::Location;
pub use replicate::{reconcile, sync, Increment, Plan};
pub use zfs::Zfs;
