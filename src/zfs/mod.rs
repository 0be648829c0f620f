//! zfs command lines.
//!
//! `Zfs` only builds argument vectors and invocations; running them is
//! left to [`list`], [`snapshot`] and the replication pipeline.

pub mod list;
pub mod snapshot;

pub use list::{list_snapshots, parse_listing};
pub use snapshot::{create_snapshot, snapshot_name};

use crate::config::{SshConfig, ZfsConfig};
use crate::location::Location;
use crate::replicate::Increment;
use crate::transport::Invocation;

#[derive(Debug, Clone, Default)]
pub struct Zfs {
    pub zfs: ZfsConfig,
    pub ssh: SshConfig,
}

impl Zfs {
    pub fn new(zfs: ZfsConfig, ssh: SshConfig) -> Self {
        Self { zfs, ssh }
    }

    fn argv(&self, privileged: bool, args: &[&str]) -> Vec<String> {
        let mut argv = Vec::with_capacity(args.len() + 3);
        // Children run in their own process group and cannot prompt.
        if privileged && self.zfs.sudo {
            argv.push(self.zfs.sudo_binary.clone());
            argv.push("-n".to_string());
        }
        argv.push(self.zfs.binary.clone());
        argv.extend(args.iter().map(|s| s.to_string()));
        argv
    }

    /// `zfs list -H -o name -t snapshot <path>`: one full snapshot name per
    /// line, oldest first.
    pub fn list(&self, location: &Location) -> Invocation {
        let argv = self.argv(
            false,
            &["list", "-H", "-o", "name", "-t", "snapshot", location.path()],
        );
        location.command(&argv, &self.ssh)
    }

    /// `zfs snapshot <path>@<name>`
    pub fn snapshot(&self, location: &Location, name: &str) -> Invocation {
        let argv = self.argv(true, &["snapshot", &location.snapshot(name)]);
        location.command(&argv, &self.ssh)
    }

    /// Producer side of an increment: `zfs send [-v] [-i <from>] <target>`
    pub fn send(&self, location: &Location, increment: &Increment) -> Invocation {
        let target = location.snapshot(increment.target());
        let from = increment.base().map(|base| location.snapshot(base));
        let mut args = vec!["send"];
        if self.zfs.verbose {
            args.push("-v");
        }
        if let Some(from) = &from {
            args.push("-i");
            args.push(from);
        }
        args.push(&target);
        let argv = self.argv(true, &args);
        location.command(&argv, &self.ssh)
    }

    /// Consumer side of an increment: `zfs receive -F [-v] <path>`.
    /// `-F` rolls the destination back to the stream's base first.
    pub fn receive(&self, location: &Location) -> Invocation {
        let mut args = vec!["receive", "-F"];
        if self.zfs.verbose {
            args.push("-v");
        }
        args.push(location.path());
        let argv = self.argv(true, &args);
        location.command(&argv, &self.ssh)
    }
}
