// src/prune.rs

//! Directory pruning
//!
//! Directories are shared between packages, so a directory that cannot be
//! removed is expected and never an error.

use std::fs;
use std::io;
use std::path::PathBuf;
use tracing::debug;

/// A directory left in place, with the reason for diagnostics
#[derive(Debug)]
pub struct RetainedDirectory {
    pub path: PathBuf,
    pub reason: io::Error,
}

#[derive(Debug, Default)]
pub struct PruneReport {
    pub removed: Vec<PathBuf>,
    pub retained: Vec<RetainedDirectory>,
}

impl PruneReport {
    pub fn retained_paths(&self) -> impl Iterator<Item = &PathBuf> + '_ {
        self.retained.iter().map(|dir| &dir.path)
    }
}

/// Remove each directory that is empty, in the order given
///
/// Callers pass directories deepest first so children go before parents.
pub fn prune_directories(directories: &[PathBuf]) -> PruneReport {
    let mut report = PruneReport::default();

    for dir in directories {
        match fs::remove_dir(dir) {
            Ok(()) => {
                debug!("Removed directory {}", dir.display());
                report.removed.push(dir.clone());
            }
            Err(reason) => {
                debug!("Kept directory {}: {}", dir.display(), reason);
                report.retained.push(RetainedDirectory {
                    path: dir.clone(),
                    reason,
                });
            }
        }
    }

    report
}
