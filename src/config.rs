//! Configuration file support.
//!
//! Looked up from (first match wins):
//! 1. An explicit path (`--config` / `ZYNC_CONFIG`), which must exist
//! 2. `<config_dir>/zync/config.toml` (e.g. `~/.config/zync/config.toml`)
//! 3. Built-in defaults
//!
//! ```toml
//! [zfs]
//! binary = "/usr/sbin/zfs"
//! sudo = true
//! sudo_binary = "sudo"
//! verbose = true
//!
//! [ssh]
//! binary = "ssh"
//! options = ["-o", "BatchMode=yes"]
//! ```

use crate::error::{Result, ZyncError};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub zfs: ZfsConfig,
    pub ssh: SshConfig,
}

/// How the zfs command line tool is invoked.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ZfsConfig {
    /// zfs executable (name looked up in PATH, or absolute path)
    pub binary: String,
    /// Prefix snapshot, send and receive with `sudo -n`. Listing never uses it.
    pub sudo: bool,
    /// sudo executable. It runs non-interactively, so credentials must
    /// already be cached or granted NOPASSWD.
    pub sudo_binary: String,
    /// Pass `-v` to send and receive
    pub verbose: bool,
}

impl Default for ZfsConfig {
    fn default() -> Self {
        Self {
            binary: "zfs".to_string(),
            sudo: true,
            sudo_binary: "sudo".to_string(),
            verbose: true,
        }
    }
}

/// How remote hosts are reached.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct SshConfig {
    pub binary: String,
    /// Extra arguments placed before the host, e.g. `["-p", "2222"]`
    pub options: Vec<String>,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            binary: "ssh".to_string(),
            options: Vec::new(),
        }
    }
}

impl Config {
    /// Default config file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("zync").join("config.toml"))
    }

    /// Load configuration, falling back to defaults when no file exists.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ZyncError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
            .map_err(|e| ZyncError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}
