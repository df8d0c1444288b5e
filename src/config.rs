// src/config.rs

//! Process-wide settings
//!
//! There are no configuration files. External tool locations, the staging
//! root and the volumes directory default to the standard macOS locations
//! and can be overridden from the environment.

use crate::volume::DEFAULT_VOLUMES_DIR;
use std::ffi::OsString;
use std::path::PathBuf;

/// Environment override for the package database tool
pub const PKGUTIL_ENV: &str = "PKGUNINST_PKGUTIL";
/// Environment override for the SIP status tool
pub const CSRUTIL_ENV: &str = "PKGUNINST_CSRUTIL";
/// Environment override for the staging root
pub const STAGING_DIR_ENV: &str = "PKGUNINST_STAGING_DIR";
/// Environment override for the volumes directory
pub const VOLUMES_DIR_ENV: &str = "PKGUNINST_VOLUMES_DIR";

/// Name of the staging root under the system temp directory
const STAGING_DIR_NAME: &str = "Package Uninstaller";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub pkgutil: PathBuf,
    pub csrutil: PathBuf,
    pub staging_root: PathBuf,
    pub volumes_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            pkgutil: PathBuf::from("pkgutil"),
            csrutil: PathBuf::from("csrutil"),
            staging_root: std::env::temp_dir().join(STAGING_DIR_NAME),
            volumes_dir: PathBuf::from(DEFAULT_VOLUMES_DIR),
        }
    }
}

impl Settings {
    /// Defaults with overrides from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var_os(key))
    }

    /// Defaults with overrides from an arbitrary variable lookup
    ///
    /// Empty values are ignored.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty()).map(PathBuf::from);
        let defaults = Self::default();

        Self {
            pkgutil: get(PKGUTIL_ENV).unwrap_or(defaults.pkgutil),
            csrutil: get(CSRUTIL_ENV).unwrap_or(defaults.csrutil),
            staging_root: get(STAGING_DIR_ENV).unwrap_or(defaults.staging_root),
            volumes_dir: get(VOLUMES_DIR_ENV).unwrap_or(defaults.volumes_dir),
        }
    }
}
