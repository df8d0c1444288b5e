// src/volume.rs

//! Volume resolution
//!
//! A volume is the mount point a package was installed on. Bare names are
//! looked up under the volumes directory (normally `/Volumes`); the result
//! must be an existing directory before anything else runs.

use crate::error::{Error, Result};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory macOS mounts secondary volumes under
pub const DEFAULT_VOLUMES_DIR: &str = "/Volumes";

/// A validated, mounted volume root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Volume(PathBuf);

impl Volume {
    /// The boot volume
    pub fn root() -> Self {
        Volume(PathBuf::from("/"))
    }

    /// Resolve a volume name, prefixing bare names with `volumes_dir`
    ///
    /// Fails with [`Error::VolumeNotMounted`] if the resulting path is not an
    /// existing directory.
    pub fn resolve_in(name: &str, volumes_dir: &Path) -> Result<Self> {
        let path = if name.starts_with('/') {
            PathBuf::from(name)
        } else {
            volumes_dir.join(name)
        };

        if !path.is_dir() {
            return Err(Error::VolumeNotMounted(path.display().to_string()));
        }

        debug!("Resolved volume '{}' to {}", name, path.display());
        Ok(Volume(path))
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    /// Applications directory on this volume
    pub fn applications_dir(&self) -> PathBuf {
        self.0.join("Applications")
    }
}

impl fmt::Display for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// List mounted volumes (subdirectories of `volumes_dir`), sorted
///
/// A missing volumes directory yields an empty list.
pub fn mounted_volumes(volumes_dir: &Path) -> Result<Vec<PathBuf>> {
    if !volumes_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut volumes = Vec::new();
    for entry in fs::read_dir(volumes_dir)? {
        let entry = entry?;
        if entry.path().is_dir() {
            volumes.push(entry.path());
        }
    }
    volumes.sort();
    Ok(volumes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_resolve_absolute_volume() {
        let dir = tempdir().unwrap();
        let volume = Volume::resolve_in(dir.path().to_str().unwrap(), Path::new("/nonexistent")).unwrap();
        assert_eq!(volume.path(), dir.path());
    }

    #[test]
    fn test_resolve_bare_name_under_volumes_dir() {
        let volumes = tempdir().unwrap();
        fs::create_dir(volumes.path().join("Backup")).unwrap();

        let volume = Volume::resolve_in("Backup", volumes.path()).unwrap();
        assert_eq!(volume.path(), volumes.path().join("Backup"));
    }

    #[test]
    fn test_resolve_unmounted_volume() {
        let volumes = tempdir().unwrap();
        let result = Volume::resolve_in("Missing", volumes.path());
        assert!(matches!(result.unwrap_err(), Error::VolumeNotMounted(_)));
    }

    #[test]
    fn test_resolve_file_is_not_a_volume() {
        let volumes = tempdir().unwrap();
        fs::write(volumes.path().join("disk.img"), b"").unwrap();
        assert!(Volume::resolve_in("disk.img", volumes.path()).is_err());
    }

    #[test]
    fn test_root_volume() {
        let volume = Volume::root();
        assert_eq!(volume.applications_dir(), PathBuf::from("/Applications"));
        assert_eq!(volume.to_string(), "/");
    }

    #[test]
    fn test_mounted_volumes_sorted_directories_only() {
        let volumes = tempdir().unwrap();
        fs::create_dir(volumes.path().join("Zeta")).unwrap();
        fs::create_dir(volumes.path().join("Alpha")).unwrap();
        fs::write(volumes.path().join(".DS_Store"), b"").unwrap();

        let found = mounted_volumes(volumes.path()).unwrap();
        assert_eq!(
            found,
            vec![volumes.path().join("Alpha"), volumes.path().join("Zeta")]
        );
    }

    #[test]
    fn test_mounted_volumes_missing_dir() {
        assert!(mounted_volumes(Path::new("/nonexistent/Volumes")).unwrap().is_empty());
    }
}
