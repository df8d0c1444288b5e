// src/error.rs

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Core error types for pkguninst
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors not tied to a specific removal step
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Volume name did not resolve to an existing directory
    #[error("Volume is not mounted, or its name is invalid: {0}")]
    VolumeNotMounted(String),

    /// Package selection expression failed to compile
    #[error("RegEx is invalid: {pattern}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Neither identifiers nor an expression were given
    #[error("You must supply at least one package ID, or a single regex")]
    NoSelector,

    /// Both identifiers and an expression were given
    #[error("Package IDs and a regex cannot be combined")]
    ConflictingSelectors,

    /// A move into or out of the staging area was refused for lack of privilege
    #[error("Permission denied moving {path}")]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A move into or out of the staging area failed for another reason
    #[error("Failed to move {from} to {to}")]
    MoveFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Rollback after a failed relocation left files in the staging area
    #[error("{unrestored} file(s) cannot be restored, backup saved at: {}", staging_dir.display())]
    PartialRestore {
        unrestored: usize,
        staging_dir: PathBuf,
        #[source]
        source: Box<Error>,
    },

    /// The staging root is not a private directory of the current user
    #[error("Refusing to stage files in {}: {reason}", path.display())]
    UntrustedStagingRoot { path: PathBuf, reason: String },

    /// An external tool could not be started
    #[error("Failed to run {program}")]
    CommandSpawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// An external query tool exited unsuccessfully
    #[error("{program} exited with {status}: {stderr}")]
    CommandFailed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },

    /// The terminal prompt could not be shown or read
    #[error("Failed to get user input: {0}")]
    Prompt(String),
}

impl Error {
    /// Whether the failure comes down to missing privilege.
    ///
    /// Looks through [`Error::PartialRestore`] at the error that triggered
    /// the rollback, so callers can pick the "run as root" message.
    pub fn is_permission_denied(&self) -> bool {
        match self {
            Error::PermissionDenied { .. } => true,
            Error::PartialRestore { source, .. } => source.is_permission_denied(),
            Error::Io(e) => e.kind() == io::ErrorKind::PermissionDenied,
            _ => false,
        }
    }

    /// Builds the error for a failed move, classifying privilege failures.
    pub(crate) fn from_move(from: PathBuf, to: PathBuf, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::PermissionDenied {
            Error::PermissionDenied { path: from, source }
        } else {
            Error::MoveFailed { from, to, source }
        }
    }
}

/// Result type alias using pkguninst's Error type
pub type Result<T> = std::result::Result<T, Error>;
