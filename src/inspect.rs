// src/inspect.rs

//! Package inspection
//!
//! Turns a receipt's raw manifest into the deletion candidates for one
//! package: existing files in ascending order and existing directories
//! deepest first.

use crate::error::Result;
use crate::paths::normalize_manifest_path;
use crate::pkgdb::{EntryKind, PackageDatabase};
use crate::volume::Volume;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Files and directories a package still owns on disk
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PackageContents {
    /// Sorted ascending
    pub files: Vec<PathBuf>,
    /// Sorted descending, so children come before their parents
    pub directories: Vec<PathBuf>,
}


/// Anything present that is not a real directory, dangling symlinks included
fn is_present_file(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok_and(|meta| !meta.is_dir())
}

/// A real directory, not a symlink to one
fn is_present_dir(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok_and(|meta| meta.is_dir())
}

fn collect(
    db: &dyn PackageDatabase,
    volume: &Volume,
    id: &str,
    kind: EntryKind,
    exists: fn(&Path) -> bool,
) -> Result<Vec<PathBuf>> {
    let raw = db.owned_paths(volume, id, kind)?;
    let total = raw.len();

    let mut paths: Vec<PathBuf> = raw
        .iter()
        .filter_map(|line| normalize_manifest_path(line, volume))
        .filter(|path| exists(path))
        .collect();
    paths.sort();
    paths.dedup();

    debug!(
        "{}: {} of {} {:?} entries present",
        id,
        paths.len(),
        total,
        kind
    );
    Ok(paths)
}

/// Inspect the paths `id` owns on `volume`
///
/// Stale manifest entries are dropped silently. Has no side effects.
pub fn inspect_package(db: &dyn PackageDatabase, volume: &Volume, id: &str) -> Result<PackageContents> {
    let files = collect(db, volume, id, EntryKind::File, is_present_file)?;
    let mut directories = collect(db, volume, id, EntryKind::Directory, is_present_dir)?;
    directories.reverse();

    Ok(PackageContents { files, directories })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    /// Receipt database with fixed manifests
    #[derive(Default)]
    struct Manifests {
        files: HashMap<String, Vec<String>>,
        dirs: HashMap<String, Vec<String>>,
    }

    impl PackageDatabase for Manifests {
        fn installed_packages(&self, _volume: &Volume) -> Result<Vec<String>> {
            Ok(self.files.keys().cloned().collect())
        }

        fn owned_paths(&self, _volume: &Volume, id: &str, kind: EntryKind) -> Result<Vec<String>> {
            let map = match kind {
                EntryKind::File => &self.files,
                EntryKind::Directory => &self.dirs,
            };
            Ok(map.get(id).cloned().unwrap_or_default())
        }

        fn forget(&self, _volume: &Volume, _id: &str) -> Result<bool> {
            Ok(true)
        }
    }

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn volume(dir: &TempDir) -> Volume {
        Volume::resolve_in(dir.path().to_str().unwrap(), dir.path()).unwrap()
    }

    #[test]
    fn test_inspect_orders_and_filters() {
        let root = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("usr/local/lib/tool/plugins")).unwrap();
        fs::create_dir_all(root.path().join("usr/local/bin")).unwrap();
        fs::write(root.path().join("usr/local/bin/tool"), b"bin").unwrap();
        fs::write(root.path().join("usr/local/lib/tool/a.dylib"), b"lib").unwrap();

        let mut db = Manifests::default();
        db.files.insert(
            "com.example.tool".into(),
            lines(&["usr/local/lib/tool/a.dylib", "", "usr/local/bin/tool", "usr/local/bin/gone"]),
        );
        db.dirs.insert(
            "com.example.tool".into(),
            lines(&["usr/local/lib/tool", "usr/local/lib/tool/plugins", "usr/local/share/gone", "  "]),
        );

        let contents = inspect_package(&db, &volume(&root), "com.example.tool").unwrap();
        assert_eq!(
            contents.files,
            vec![
                root.path().join("usr/local/bin/tool"),
                root.path().join("usr/local/lib/tool/a.dylib"),
            ]
        );
        assert_eq!(
            contents.directories,
            vec![
                root.path().join("usr/local/lib/tool/plugins"),
                root.path().join("usr/local/lib/tool"),
            ]
        );
    }

    #[test]
    fn test_inspect_kind_must_match() {
        let root = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("opt/thing")).unwrap();
        fs::write(root.path().join("opt/file"), b"").unwrap();

        let mut db = Manifests::default();
        db.files.insert("pkg".into(), lines(&["opt/thing"]));
        db.dirs.insert("pkg".into(), lines(&["opt/file"]));

        let contents = inspect_package(&db, &volume(&root), "pkg").unwrap();
        assert!(contents.files.is_empty());
        assert!(contents.directories.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_inspect_keeps_dangling_symlink_as_file() {
        let root = TempDir::new().unwrap();
        std::os::unix::fs::symlink("missing-target", root.path().join("link")).unwrap();

        let mut db = Manifests::default();
        db.files.insert("pkg".into(), lines(&["link"]));

        let contents = inspect_package(&db, &volume(&root), "pkg").unwrap();
        assert_eq!(contents.files, vec![root.path().join("link")]);
    }

    #[test]
    fn test_inspect_is_idempotent() {
        let root = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("a/b/c")).unwrap();
        fs::write(root.path().join("a/b/c/f2"), b"").unwrap();
        fs::write(root.path().join("a/f1"), b"").unwrap();

        let mut db = Manifests::default();
        db.files.insert("pkg".into(), lines(&["a/b/c/f2", "a/f1", "a/f1"]));
        db.dirs.insert("pkg".into(), lines(&["a", "a/b/c", "a/b"]));

        let volume = volume(&root);
        let first = inspect_package(&db, &volume, "pkg").unwrap();
        let second = inspect_package(&db, &volume, "pkg").unwrap();
        assert_eq!(first, second);
        assert_eq!(first.files.len(), 2);
        assert_eq!(
            first.directories,
            vec![root.path().join("a/b/c"), root.path().join("a/b"), root.path().join("a")]
        );
    }
}
