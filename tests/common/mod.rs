//! Fake `zfs` and `ssh` executables for integration tests.
//!
//! A dataset is a plain file whose lines are its snapshot names, oldest
//! first, so the dataset path of a `Location` is simply that file's path.
//! Every zfs call is appended to `calls.log` next to the dataset file.
//! Dropping `fail-send-<snap>`, `fail-send-after-<snap>`,
//! `fail-receive-<snap>` or `hang-receive` files next to the datasets
//! injects failures. A hanging receive records its pid in `receive.pid`.
//!
//! The fake `sudo` forks its command and waits for it, so the zfs process
//! is a grandchild of the tool like it is under the real sudo.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tempfile::TempDir;

use zync::config::{SshConfig, ZfsConfig};
use zync::{Location, Zfs};

const FAKE_ZFS: &str = r#"#!/bin/sh
cmd="$1"
shift
for last in "$@"; do :; done
ds="${last%%@*}"
dir=$(dirname "$ds")
echo "${ZYNC_FAKE_HOST:-local} $cmd $*" >> "$dir/calls.log"

case "$cmd" in
list)
    if [ ! -f "$ds" ]; then
        echo "cannot open '$ds': dataset does not exist" >&2
        exit 1
    fi
    while IFS= read -r snap; do
        [ -n "$snap" ] && echo "$ds@$snap"
    done < "$ds"
    ;;
snapshot)
    [ -f "$ds" ] || { echo "cannot open '$ds': dataset does not exist" >&2; exit 1; }
    echo "${last#*@}" >> "$ds"
    ;;
send)
    target="${last#*@}"
    from="-"
    prev=""
    for arg in "$@"; do
        [ "$prev" = "-i" ] && from="${arg#*@}"
        prev="$arg"
    done
    if [ -f "$dir/fail-send-$target" ]; then
        echo "send: injected failure" >&2
        exit 1
    fi
    grep -qxF "$target" "$ds" || { echo "send: no snapshot $target" >&2; exit 1; }
    echo "STREAM $from $target"
    if [ -f "$dir/fail-send-after-$target" ]; then
        echo "send: injected failure after stream" >&2
        exit 1
    fi
    ;;
receive)
    [ -f "$ds" ] || { echo "cannot open '$ds': dataset does not exist" >&2; exit 1; }
    if [ -f "$dir/hang-receive" ]; then
        echo $$ > "$dir/receive.pid"
        exec sleep 30
    fi
    read -r magic from target || { echo "receive: failed to read from stream" >&2; exit 1; }
    [ "$magic" = "STREAM" ] || { echo "receive: invalid stream" >&2; exit 1; }
    if [ -f "$dir/fail-receive-$target" ]; then
        echo "receive: injected failure" >&2
        exit 1
    fi
    newest=$(tail -n 1 "$ds")
    if [ "$from" = "-" ]; then
        [ -z "$newest" ] || { echo "receive: destination has snapshots" >&2; exit 1; }
    else
        [ "$from" = "$newest" ] || { echo "receive: base $from is not $newest" >&2; exit 1; }
    fi
    echo "$target" >> "$ds"
    ;;
*)
    echo "unknown command $cmd" >&2
    exit 2
    ;;
esac
exit 0
"#;

const FAKE_SSH: &str = r#"#!/bin/sh
ZYNC_FAKE_HOST="$1"
export ZYNC_FAKE_HOST
shift
exec sh -c "$*"
"#;

const FAKE_SUDO: &str = r#"#!/bin/sh
[ "$1" = "-n" ] && shift
"$@"
"#;

struct Tools {
    zfs: PathBuf,
    ssh: PathBuf,
    sudo: PathBuf,
}

/// Scripts are written once per test binary, before any test spawns a
/// process, to avoid executing a file another thread still has open.
fn tools() -> &'static Tools {
    static TOOLS: OnceLock<Tools> = OnceLock::new();
    TOOLS.get_or_init(|| {
        let dir = std::env::temp_dir().join(format!("zync-fake-tools-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let write = |name: &str, body: &str| {
            let path = dir.join(name);
            fs::write(&path, body).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
            path
        };
        Tools {
            zfs: write("zfs", FAKE_ZFS),
            ssh: write("ssh", FAKE_SSH),
            sudo: write("sudo", FAKE_SUDO),
        }
    })
}

pub struct FakePool {
    dir: TempDir,
    pub zfs: Zfs,
}

impl FakePool {
    pub fn new() -> Self {
        let tools = tools();
        let zfs = Zfs::new(
            ZfsConfig {
                binary: tools.zfs.display().to_string(),
                sudo: false,
                sudo_binary: tools.sudo.display().to_string(),
                verbose: true,
            },
            SshConfig {
                binary: tools.ssh.display().to_string(),
                options: Vec::new(),
            },
        );
        Self {
            dir: TempDir::new().unwrap(),
            zfs,
        }
    }

    pub fn zfs_binary(&self) -> &Path {
        &tools().zfs
    }

    pub fn dataset_path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Create dataset `name` holding `snapshots`, returning its local location.
    pub fn dataset(&self, name: &str, snapshots: &[&str]) -> Location {
        let mut content = String::new();
        for snap in snapshots {
            content.push_str(snap);
            content.push('\n');
        }
        fs::write(self.dataset_path(name), content).unwrap();
        self.local(name)
    }

    pub fn local(&self, name: &str) -> Location {
        Location::local(self.dataset_path(name).display().to_string()).unwrap()
    }

    pub fn remote(&self, host: &str, name: &str) -> Location {
        Location::remote(host, self.dataset_path(name).display().to_string()).unwrap()
    }

    pub fn snapshots(&self, name: &str) -> Vec<String> {
        fs::read_to_string(self.dataset_path(name))
            .unwrap()
            .lines()
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn fail_receive(&self, snapshot: &str) {
        fs::write(self.dir.path().join(format!("fail-receive-{}", snapshot)), "").unwrap();
    }

    pub fn fail_send(&self, snapshot: &str) {
        fs::write(self.dir.path().join(format!("fail-send-{}", snapshot)), "").unwrap();
    }

    /// Send writes the whole stream for `snapshot`, then exits non-zero.
    pub fn fail_send_after(&self, snapshot: &str) {
        fs::write(self.dir.path().join(format!("fail-send-after-{}", snapshot)), "").unwrap();
    }

    pub fn hang_receive(&self) {
        fs::write(self.dir.path().join("hang-receive"), "").unwrap();
    }

    /// Run privileged commands through the forking fake sudo.
    pub fn use_sudo(&mut self) {
        self.zfs.zfs.sudo = true;
    }

    /// Pid of the hanging receive, once it has started.
    pub fn receive_pid(&self) -> Option<i32> {
        fs::read_to_string(self.dir.path().join("receive.pid"))
            .ok()
            .and_then(|pid| pid.trim().parse().ok())
    }

    /// Logged zfs calls, each as `<host|local> <subcommand> <args...>`.
    pub fn calls(&self) -> Vec<String> {
        fs::read_to_string(self.dir.path().join("calls.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn calls_of(&self, subcommand: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.split_whitespace().nth(1) == Some(subcommand))
            .collect()
    }

    /// A config file pointing at the fake tools.
    pub fn config_file(&self) -> PathBuf {
        let tools = tools();
        let path = self.dir.path().join("config.toml");
        fs::write(
            &path,
            format!(
                "[zfs]\nbinary = \"{}\"\nsudo = false\n\n[ssh]\nbinary = \"{}\"\n",
                tools.zfs.display(),
                tools.ssh.display()
            ),
        )
        .unwrap();
        path
    }
}
