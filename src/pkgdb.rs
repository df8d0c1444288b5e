// src/pkgdb.rs

//! Package receipt database access
//!
//! The receipt database is only reached through [`PackageDatabase`]. The
//! shipped implementation, [`Pkgutil`], shells out to `pkgutil` and reads
//! its line-oriented output. All calls block until the tool exits.

use crate::error::{Error, Result};
use crate::volume::Volume;
use std::ffi::OsStr;
use std::path::PathBuf;
use std::process::{Command, Output};
use tracing::{debug, warn};

/// Kind of manifest entry to query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

impl EntryKind {
    fn pkgutil_flag(self) -> &'static str {
        match self {
            EntryKind::File => "--only-files",
            EntryKind::Directory => "--only-dirs",
        }
    }
}

/// Narrow interface to the receipt database
pub trait PackageDatabase {
    /// Raw identifier lines for packages installed on `volume`
    fn installed_packages(&self, volume: &Volume) -> Result<Vec<String>>;

    /// Raw path lines of one kind owned by `id`
    ///
    /// Lines are returned as printed by the database: possibly relative,
    /// possibly blank.
    fn owned_paths(&self, volume: &Volume, id: &str, kind: EntryKind) -> Result<Vec<String>>;

    /// Deregister the receipt for `id`
    ///
    /// `Ok(false)` means the database refused; that is a warning for the
    /// caller, not an error.
    fn forget(&self, volume: &Volume, id: &str) -> Result<bool>;
}

/// List installed package identifiers, sorted, blank lines dropped
pub fn list_installed(db: &dyn PackageDatabase, volume: &Volume) -> Result<Vec<String>> {
    let mut packages: Vec<String> = db
        .installed_packages(volume)?
        .into_iter()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect();
    packages.sort();
    debug!("Found {} package(s) on {}", packages.len(), volume);
    Ok(packages)
}

/// [`PackageDatabase`] backed by the `pkgutil` command
#[derive(Debug, Clone)]
pub struct Pkgutil {
    program: PathBuf,
}

impl Pkgutil {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn program_name(&self) -> String {
        self.program.display().to_string()
    }

    fn output<I, S>(&self, args: I) -> Result<Output>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut command = Command::new(&self.program);
        command.args(args);
        debug!("Running {:?}", command);

        command.output().map_err(|source| Error::CommandSpawn {
            program: self.program_name(),
            source,
        })
    }

    /// Run a query and split stdout into lines
    fn query<I, S>(&self, args: I) -> Result<Vec<String>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let output = self.output(args)?;
        if !output.status.success() {
            return Err(Error::CommandFailed {
                program: self.program_name(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::to_string)
            .collect())
    }
}

impl PackageDatabase for Pkgutil {
    fn installed_packages(&self, volume: &Volume) -> Result<Vec<String>> {
        self.query([
            OsStr::new("--pkgs"),
            OsStr::new("--volume"),
            volume.path().as_os_str(),
        ])
    }

    fn owned_paths(&self, volume: &Volume, id: &str, kind: EntryKind) -> Result<Vec<String>> {
        self.query([
            OsStr::new(kind.pkgutil_flag()),
            OsStr::new("--files"),
            OsStr::new(id),
            OsStr::new("--volume"),
            volume.path().as_os_str(),
        ])
    }

    fn forget(&self, volume: &Volume, id: &str) -> Result<bool> {
        let output = self.output([
            OsStr::new("--forget"),
            OsStr::new(id),
            OsStr::new("--volume"),
            volume.path().as_os_str(),
        ])?;

        if !output.status.success() {
            warn!(
                "{} --forget {} exited with {}: {}",
                self.program_name(),
                id,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(output.status.success())
    }
}
