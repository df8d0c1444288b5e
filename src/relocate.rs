// src/relocate.rs

//! Reversible bulk file removal
//!
//! Files are moved one at a time into a staging directory that mirrors
//! their absolute paths. If every move succeeds the staging directory is
//! deleted and the files are gone. If any move fails, every file moved so
//! far is moved back and the triggering error is returned. Files that
//! cannot be moved back stay in the staging directory, which is then kept
//! and reported through [`Error::PartialRestore`].
//!
//! The staging root must be a real directory owned by the effective user
//! and writable by no one else; otherwise nothing is moved.
//!
//! Moves across filesystems fall back to copy-then-delete, which keeps the
//! permission bits but not the owner or timestamps. A file restored after
//! such a move carries the restoring user's ownership and a fresh mtime.

use crate::error::{Error, Result};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info, warn};

/// Moves a single file (or symlink) between two paths
pub trait FileMover {
    fn move_file(&self, from: &Path, to: &Path) -> io::Result<()>;
}

/// [`FileMover`] over the real filesystem
///
/// Uses `rename`, falling back to copy-then-delete when source and
/// destination are on different filesystems.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsMover;

impl FileMover for FsMover {
    fn move_file(&self, from: &Path, to: &Path) -> io::Result<()> {
        match fs::rename(from, to) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::CrossesDevices => copy_then_remove(from, to),
            Err(e) => Err(e),
        }
    }
}

fn copy_then_remove(from: &Path, to: &Path) -> io::Result<()> {
    debug!("Cross-device move of {}", from.display());

    let meta = fs::symlink_metadata(from)?;
    if meta.file_type().is_symlink() {
        copy_symlink(from, to)?;
    } else {
        fs::copy(from, to)?;
    }

    if let Err(e) = fs::remove_file(from) {
        let _ = fs::remove_file(to);
        return Err(e);
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(from: &Path, to: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(fs::read_link(from)?, to)
}

#[cfg(not(unix))]
fn copy_symlink(from: &Path, to: &Path) -> io::Result<()> {
    fs::copy(from, to).map(|_| ())
}

/// Staging location for `file`: its absolute path re-rooted under `staging_dir`
pub fn staged_path(staging_dir: &Path, file: &Path) -> PathBuf {
    let mut staged = staging_dir.to_path_buf();
    for component in file.components() {
        if let Component::Normal(part) = component {
            staged.push(part);
        }
    }
    staged
}

#[cfg(unix)]
fn create_private_dir(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new().recursive(true).mode(0o700).create(path)
}

#[cfg(not(unix))]
fn create_private_dir(path: &Path) -> io::Result<()> {
    fs::create_dir_all(path)
}

/// Refuse a staging root another user could swap files in or out of
#[cfg(unix)]
fn verify_staging_root(path: &Path) -> Result<()> {
    use std::os::unix::fs::MetadataExt;

    let untrusted = |reason: &str| {
        Err(Error::UntrustedStagingRoot {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        })
    };

    let meta = fs::symlink_metadata(path)?;
    if meta.file_type().is_symlink() {
        return untrusted("it is a symbolic link");
    }
    if !meta.is_dir() {
        return untrusted("it is not a directory");
    }
    // SAFETY: geteuid has no preconditions and cannot fail
    let euid = unsafe { libc::geteuid() };
    if meta.uid() != euid {
        return untrusted("it is owned by another user");
    }
    if meta.mode() & 0o022 != 0 {
        return untrusted("it is writable by other users");
    }
    Ok(())
}

#[cfg(not(unix))]
fn verify_staging_root(path: &Path) -> Result<()> {
    if fs::symlink_metadata(path)?.is_dir() {
        Ok(())
    } else {
        Err(Error::UntrustedStagingRoot {
            path: path.to_path_buf(),
            reason: "it is not a directory".to_string(),
        })
    }
}

/// Moves a package's files out of the way, all or nothing
#[derive(Debug, Clone)]
pub struct Relocator<M = FsMover> {
    staging_root: PathBuf,
    mover: M,
}

impl Relocator {
    pub fn new(staging_root: impl Into<PathBuf>) -> Self {
        Self::with_mover(staging_root, FsMover)
    }
}

impl<M: FileMover> Relocator<M> {
    pub fn with_mover(staging_root: impl Into<PathBuf>, mover: M) -> Self {
        Self {
            staging_root: staging_root.into(),
            mover,
        }
    }

    /// Create a fresh staging directory for one attempt on `id`
    ///
    /// The name starts with the identifier; a directory kept by an earlier
    /// failed attempt is never reused.
    fn create_staging_dir(&self, id: &str) -> Result<TempDir> {
        create_private_dir(&self.staging_root)?;
        verify_staging_root(&self.staging_root)?;
        let prefix = format!("{}.", id.replace(['/', '\\'], "_"));
        let dir = tempfile::Builder::new()
            .prefix(&prefix)
            .tempdir_in(&self.staging_root)?;
        debug!("Staging directory for {}: {}", id, dir.path().display());
        Ok(dir)
    }

    /// Remove `files`, restoring all of them if any single move fails
    ///
    /// Returns the number of files removed.
    pub fn relocate(&self, id: &str, files: &[PathBuf]) -> Result<usize> {
        let staging = self.create_staging_dir(id)?;
        let mut moved: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(files.len());

        for file in files {
            let staged = staged_path(staging.path(), file);
            if let Some(parent) = staged.parent() {
                // A real problem here surfaces from the move below
                if let Err(e) = fs::create_dir_all(parent) {
                    debug!("Failed to create {}: {}", parent.display(), e);
                }
            }

            match self.mover.move_file(file, &staged) {
                Ok(()) => {
                    debug!("Staged {}", file.display());
                    moved.push((staged, file.clone()));
                }
                Err(source) => {
                    let cause = Error::from_move(file.clone(), staged, source);
                    warn!("{}", cause);
                    return Err(self.roll_back(id, staging, &moved, cause));
                }
            }
        }

        if let Err(e) = staging.close() {
            warn!("Failed to delete staging directory for {}: {}", id, e);
        }
        info!("Removed {} file(s) for {}", moved.len(), id);
        Ok(moved.len())
    }

    /// Move staged files back in the order they were staged
    fn roll_back(&self, id: &str, staging: TempDir, moved: &[(PathBuf, PathBuf)], cause: Error) -> Error {
        warn!("Error encountered, restoring {} file(s) for {}", moved.len(), id);

        let mut unrestored = 0;
        for (staged, original) in moved {
            match self.mover.move_file(staged, original) {
                Ok(()) => debug!("Restored {}", original.display()),
                Err(e) => {
                    warn!("Failed to restore {}: {}", original.display(), e);
                    unrestored += 1;
                }
            }
        }

        if unrestored == 0 {
            if let Err(e) = staging.close() {
                warn!("Failed to delete staging directory for {}: {}", id, e);
            }
            return cause;
        }

        let staging_dir = staging.keep();
        warn!(
            "{} file(s) cannot be restored, backup saved at: {}",
            unrestored,
            staging_dir.display()
        );
        Error::PartialRestore {
            unrestored,
            staging_dir,
            source: Box::new(cause),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tempfile::tempdir;

    /// Delegates to [`FsMover`], failing selected calls (1-based)
    struct FlakyMover {
        calls: Cell<usize>,
        fail_on: Vec<usize>,
        kind: io::ErrorKind,
    }

    impl FlakyMover {
        fn new(fail_on: &[usize], kind: io::ErrorKind) -> Self {
            Self {
                calls: Cell::new(0),
                fail_on: fail_on.to_vec(),
                kind,
            }
        }
    }

    impl FileMover for FlakyMover {
        fn move_file(&self, from: &Path, to: &Path) -> io::Result<()> {
            let call = self.calls.get() + 1;
            self.calls.set(call);
            if self.fail_on.contains(&call) {
                return Err(io::Error::from(self.kind));
            }
            FsMover.move_file(from, to)
        }
    }

    fn make_files(root: &Path, names: &[&str]) -> Vec<PathBuf> {
        names
            .iter()
            .map(|name| {
                let path = root.join(name);
                fs::create_dir_all(path.parent().unwrap()).unwrap();
                fs::write(&path, name.as_bytes()).unwrap();
                path
            })
            .collect()
    }

    fn staging_entries(root: &Path) -> Vec<PathBuf> {
        match fs::read_dir(root) {
            Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
            Err(_) => Vec::new(),
        }
    }

    #[test]
    fn test_staged_path_mirrors_absolute_path() {
        assert_eq!(
            staged_path(Path::new("/tmp/stage"), Path::new("/usr/local/bin/tool")),
            PathBuf::from("/tmp/stage/usr/local/bin/tool")
        );
        assert_eq!(
            staged_path(Path::new("/tmp/stage"), Path::new("/a/tool")),
            PathBuf::from("/tmp/stage/a/tool")
        );
    }

    #[test]
    fn test_relocate_success_removes_files_and_staging() {
        let root = tempdir().unwrap();
        let stage = tempdir().unwrap();
        let files = make_files(root.path(), &["usr/bin/a", "usr/lib/b", "etc/c"]);

        let relocator = Relocator::new(stage.path());
        let removed = relocator.relocate("com.example.tool", &files).unwrap();

        assert_eq!(removed, 3);
        assert!(files.iter().all(|f| !f.exists()));
        assert!(staging_entries(stage.path()).is_empty());
    }

    #[test]
    fn test_relocate_creates_missing_staging_root() {
        let root = tempdir().unwrap();
        let stage = tempdir().unwrap();
        let files = make_files(root.path(), &["x"]);

        let relocator = Relocator::new(stage.path().join("nested/root"));
        relocator.relocate("pkg", &files).unwrap();
        assert!(stage.path().join("nested/root").is_dir());
    }

    #[test]
    fn test_relocate_failure_restores_everything() {
        let root = tempdir().unwrap();
        let stage = tempdir().unwrap();
        let files = make_files(root.path(), &["one", "two", "three"]);

        let relocator = Relocator::with_mover(
            stage.path(),
            FlakyMover::new(&[2], io::ErrorKind::PermissionDenied),
        );
        let err = relocator.relocate("pkg", &files).unwrap_err();

        assert!(matches!(err, Error::PermissionDenied { .. }));
        for file in &files {
            assert!(file.exists(), "{} should be in place", file.display());
        }
        assert_eq!(fs::read(&files[0]).unwrap(), b"one");
        assert!(staging_entries(stage.path()).is_empty());
    }

    #[test]
    fn test_relocate_first_move_failure() {
        let root = tempdir().unwrap();
        let stage = tempdir().unwrap();
        let files = make_files(root.path(), &["one", "two"]);

        let relocator = Relocator::with_mover(stage.path(), FlakyMover::new(&[1], io::ErrorKind::Other));
        let err = relocator.relocate("pkg", &files).unwrap_err();

        assert!(matches!(err, Error::MoveFailed { .. }));
        assert!(!err.is_permission_denied());
        assert!(files.iter().all(|f| f.exists()));
        assert!(staging_entries(stage.path()).is_empty());
    }

    #[test]
    fn test_relocate_partial_restore_keeps_staging() {
        let root = tempdir().unwrap();
        let stage = tempdir().unwrap();
        let files = make_files(root.path(), &["one", "two", "three"]);

        // Calls: move one, move two, move three (fails), restore one (fails), restore two
        let relocator = Relocator::with_mover(
            stage.path(),
            FlakyMover::new(&[3, 4], io::ErrorKind::PermissionDenied),
        );
        let err = relocator.relocate("pkg", &files).unwrap_err();

        let (unrestored, staging_dir, source) = match err {
            Error::PartialRestore {
                unrestored,
                staging_dir,
                source,
            } => (unrestored, staging_dir, source),
            other => panic!("expected partial restore, got {other}"),
        };
        assert_eq!(unrestored, 1);
        assert!(source.is_permission_denied());

        // Stranded file is in the reported location, the others are home
        assert!(!files[0].exists());
        assert!(staged_path(&staging_dir, &files[0]).exists());
        assert!(files[1].exists());
        assert!(files[2].exists());
        assert!(staging_dir.starts_with(stage.path()));
    }

    #[test]
    fn test_relocate_does_not_reuse_kept_staging() {
        let root = tempdir().unwrap();
        let stage = tempdir().unwrap();
        let kept = stage.path().join("pkg.kept");
        fs::create_dir_all(&kept).unwrap();
        fs::write(kept.join("stranded"), b"keep me").unwrap();

        let files = make_files(root.path(), &["file"]);
        Relocator::new(stage.path()).relocate("pkg", &files).unwrap();

        assert_eq!(fs::read(kept.join("stranded")).unwrap(), b"keep me");
    }

    #[test]
    fn test_relocate_empty_list() {
        let stage = tempdir().unwrap();
        assert_eq!(Relocator::new(stage.path()).relocate("pkg", &[]).unwrap(), 0);
        assert!(staging_entries(stage.path()).is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_relocate_refuses_symlinked_staging_root() {
        use std::os::unix::fs::PermissionsExt;

        let root = tempdir().unwrap();
        let stage = tempdir().unwrap();
        let foreign = tempdir().unwrap();
        fs::set_permissions(foreign.path(), fs::Permissions::from_mode(0o777)).unwrap();
        let link = stage.path().join("link");
        std::os::unix::fs::symlink(foreign.path(), &link).unwrap();
        let files = make_files(root.path(), &["usr/local/bin/tool"]);

        let err = Relocator::new(&link).relocate("pkg", &files).unwrap_err();

        assert!(matches!(err, Error::UntrustedStagingRoot { .. }));
        assert!(files[0].exists());
        assert!(staging_entries(foreign.path()).is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_relocate_refuses_shared_staging_root() {
        use std::os::unix::fs::PermissionsExt;

        let root = tempdir().unwrap();
        let stage = tempdir().unwrap();
        let shared = stage.path().join("shared");
        fs::create_dir(&shared).unwrap();
        fs::set_permissions(&shared, fs::Permissions::from_mode(0o777)).unwrap();
        let files = make_files(root.path(), &["one", "two"]);

        let relocator = Relocator::with_mover(&shared, FlakyMover::new(&[], io::ErrorKind::Other));
        let err = relocator.relocate("pkg", &files).unwrap_err();

        assert!(matches!(err, Error::UntrustedStagingRoot { .. }));
        assert_eq!(relocator.mover.calls.get(), 0);
        assert!(files.iter().all(|f| f.exists()));
        assert!(staging_entries(&shared).is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_then_remove_keeps_permission_bits() {
        use std::os::unix::fs::PermissionsExt;

        let root = tempdir().unwrap();
        let from = make_files(root.path(), &["tool"]).remove(0);
        fs::set_permissions(&from, fs::Permissions::from_mode(0o750)).unwrap();
        let to = root.path().join("staged");

        copy_then_remove(&from, &to).unwrap();

        assert!(!from.exists());
        assert_eq!(fs::read(&to).unwrap(), b"tool");
        assert_eq!(fs::metadata(&to).unwrap().permissions().mode() & 0o777, 0o750);
    }

    #[cfg(unix)]
    #[test]
    fn test_relocate_creates_private_staging_root() {
        use std::os::unix::fs::PermissionsExt;

        let root = tempdir().unwrap();
        let stage = tempdir().unwrap();
        let files = make_files(root.path(), &["x"]);
        let fresh = stage.path().join("fresh");

        Relocator::new(&fresh).relocate("pkg", &files).unwrap();
        let mode = fs::metadata(&fresh).unwrap().permissions().mode();
        assert_eq!(mode & 0o077, 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_relocate_moves_symlink_itself() {
        let root = tempdir().unwrap();
        let stage = tempdir().unwrap();
        let target = make_files(root.path(), &["real"]).remove(0);
        let link = root.path().join("link");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        Relocator::new(stage.path()).relocate("pkg", &[link.clone()]).unwrap();
        assert!(fs::symlink_metadata(&link).is_err());
        assert!(target.exists());
    }
}
