//! Process invocations - local or wrapped in `ssh <host> "<command>"`.
//!
//! Every zfs command the tool runs is first described as an [`Invocation`]
//! so it can be logged, compared in tests, and turned into a tokio
//! [`Command`] at the last moment.

use std::fmt;
use std::io;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;

use crate::config::SshConfig;

/// Time a stopped child gets between SIGTERM and SIGKILL.
pub const TERMINATE_GRACE: Duration = Duration::from_secs(2);

/// A program plus its argument vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Run `argv` on this machine. `argv` must not be empty.
    pub fn local(argv: &[String]) -> Self {
        let (program, args) = argv
            .split_first()
            .map(|(p, rest)| (p.clone(), rest.to_vec()))
            .unwrap_or_default();
        Self::new(program, args)
    }

    /// Run `argv` on `host` through ssh.
    ///
    /// The remote side receives a single command string: the arguments are
    /// joined with spaces and not quoted, so an argument containing
    /// whitespace or shell metacharacters is split by the remote shell.
    pub fn remote(ssh: &SshConfig, host: &str, argv: &[String]) -> Self {
        let mut args = ssh.options.clone();
        args.push(host.to_string());
        args.push(argv.join(" "));
        Self::new(ssh.binary.clone(), args)
    }

    /// Build the tokio command.
    ///
    /// The child leads its own process group so [`terminate`] reaches
    /// whatever it starts (zfs under sudo, the remote command under ssh).
    /// It is also killed when its handle is dropped. stdin is closed unless
    /// the caller overrides it.
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd.stdin(Stdio::null());
        cmd.kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);
        cmd
    }
}

/// Wait for `child`, stopping it if `cancel` fires first.
///
/// Returns `None` when cancelled; the child has been terminated and reaped
/// by then.
pub async fn wait_or_terminate(
    child: &mut Child,
    cancel: &CancellationToken,
) -> Option<io::Result<ExitStatus>> {
    let waited = tokio::select! {
        status = child.wait() => Some(status),
        _ = cancel.cancelled() => None,
    };
    if waited.is_none() {
        terminate(child).await;
    }
    waited
}

/// Stop `child` and every process in its group.
///
/// SIGTERM first (zfs cleans up a partial receive on it), SIGKILL for
/// whatever is still around after [`TERMINATE_GRACE`].
#[cfg(unix)]
pub async fn terminate(child: &mut Child) {
    let Some(pid) = child.id() else {
        // Already reaped
        return;
    };
    let group = pid as libc::pid_t;
    signal_group(group, libc::SIGTERM);
    if tokio::time::timeout(TERMINATE_GRACE, child.wait()).await.is_err() {
        tracing::debug!(pid, "child ignored SIGTERM, killing");
    }
    // The group outlives its leader while any member is alive.
    signal_group(group, libc::SIGKILL);
    let _ = child.wait().await;
}

#[cfg(not(unix))]
pub async fn terminate(child: &mut Child) {
    let _ = child.kill().await;
}

#[cfg(unix)]
fn signal_group(group: libc::pid_t, signal: libc::c_int) {
    // SAFETY: killpg only sends a signal; ESRCH (group already gone) is fine.
    let rc = unsafe { libc::killpg(group, signal) };
    if rc != 0 {
        let err = io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::ESRCH) {
            tracing::warn!(group, signal, error = %err, "failed to signal process group");
        }
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}
