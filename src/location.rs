//! Dataset locations: `[host:]path`.
//!
//! A location without a host is a local dataset. With a host, every
//! command against it is run through ssh. Since the first `:` separates
//! the host, a local path cannot contain one.

use std::fmt;
use std::str::FromStr;

use crate::config::SshConfig;
use crate::error::{Result, ZyncError};
use crate::transport::Invocation;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    host: Option<String>,
    path: String,
}

impl Location {
    pub fn local(path: impl Into<String>) -> Result<Self> {
        Self::new(None, path.into())
    }

    pub fn remote(host: impl Into<String>, path: impl Into<String>) -> Result<Self> {
        Self::new(Some(host.into()), path.into())
    }

    fn new(host: Option<String>, path: String) -> Result<Self> {
        let invalid = |reason: &str| ZyncError::InvalidLocation {
            input: match &host {
                Some(h) => format!("{}:{}", h, path),
                None => path.clone(),
            },
            reason: reason.to_string(),
        };
        if path.is_empty() {
            return Err(invalid("dataset path is empty"));
        }
        if host.is_none() && path.contains(':') {
            // Would read back as `host:path`
            return Err(invalid("local dataset path must not contain ':'"));
        }
        if let Some(h) = &host {
            if h.is_empty() {
                return Err(invalid("host is empty"));
            }
            if h.contains(':') {
                return Err(invalid("host must not contain ':'"));
            }
        }
        Ok(Self { host, path })
    }

    /// Split on the first `:`. Anything before it is the host.
    pub fn parse(text: &str) -> Result<Self> {
        match text.split_once(':') {
            Some((host, path)) => Self::remote(host, path),
            None => Self::local(text),
        }
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// Dataset name, e.g. `tank/home`
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_remote(&self) -> bool {
        self.host.is_some()
    }

    /// Full zfs name of one of this dataset's snapshots.
    pub fn snapshot(&self, name: &str) -> String {
        format!("{}@{}", self.path, name)
    }

    /// How to run `argv` against this location.
    pub fn command(&self, argv: &[String], ssh: &SshConfig) -> Invocation {
        match &self.host {
            Some(host) => Invocation::remote(ssh, host, argv),
            None => Invocation::local(argv),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.host {
            Some(host) => write!(f, "{}:{}", host, self.path),
            None => write!(f, "{}", self.path),
        }
    }
}

impl FromStr for Location {
    type Err = ZyncError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
