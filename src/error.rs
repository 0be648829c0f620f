use std::io;
use std::process::ExitStatus;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ZyncError>;

#[derive(Error, Debug)]
pub enum ZyncError {
    #[error("Invalid location '{input}': {reason}")]
    InvalidLocation { input: String, reason: String },

    #[error("Failed to list snapshots of {location}")]
    List {
        location: String,
        #[source]
        source: ProcessError,
    },

    #[error("Failed to set up stream for increment {index}")]
    StreamSetup {
        index: usize,
        #[source]
        source: io::Error,
    },

    #[error("Increment {index} ({increment}) failed")]
    Transfer {
        index: usize,
        increment: String,
        #[source]
        source: ProcessError,
    },

    #[error(
        "Destination has diverged: snapshot(s) {} are newer than common snapshot '{common}' and missing from source",
        .extra.join(", ")
    )]
    Divergence { common: String, extra: Vec<String> },

    #[error("Destination {destination} has snapshots but none in common with source")]
    NoCommonSnapshot { destination: String },

    #[error("Failed to create snapshot of {location}")]
    Snapshot {
        location: String,
        #[source]
        source: ProcessError,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Failure of one external command (zfs, sudo, ssh).
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Failed to start {program}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed waiting for {program}")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} exited with {status}")]
    Exit { program: String, status: ExitStatus },

    #[error("{program} was cancelled")]
    Cancelled { program: String },

    #[error("Unexpected output line: '{line}'")]
    MalformedOutput { line: String },
}

impl ProcessError {
    /// Map a finished child's status to `Ok(())` or `ProcessError::Exit`.
    pub fn check(program: &str, status: ExitStatus) -> std::result::Result<(), ProcessError> {
        if status.success() {
            Ok(())
        } else {
            Err(ProcessError::Exit {
                program: program.to_string(),
                status,
            })
        }
    }
}
