// src/paths.rs

//! Manifest path normalization
//!
//! Receipts list owned paths relative to the install location, and paths
//! inside an application bundle omit the leading `Applications/`. This
//! module turns them into absolute paths on a volume. No I/O happens here.

use crate::volume::Volume;
use std::path::{Component, Path, PathBuf};

/// First `/`-separated segment of a manifest path
fn first_segment(raw: &str) -> &str {
    raw.split('/').next().unwrap_or_default()
}

/// Whether a manifest path lives inside an `.app` bundle
///
/// True when the first path segment ends in `.app`, ignoring case. An
/// absolute path has an empty first segment and is never app-rooted.
pub fn is_rooted_in_application(raw: &str) -> bool {
    let segment = first_segment(raw);
    segment
        .len()
        .checked_sub(".app".len())
        .and_then(|start| segment.get(start..))
        .is_some_and(|ext| ext.eq_ignore_ascii_case(".app"))
}

/// Convert a raw manifest path into an absolute path on `volume`
///
/// Returns `None` for blank input and for paths that would climb out of
/// the volume through `..` components.
pub fn normalize_manifest_path(raw: &str, volume: &Volume) -> Option<PathBuf> {
    let raw = raw.trim_end_matches(['\r', '\n']);
    if raw.trim().is_empty() {
        return None;
    }

    let path = if is_rooted_in_application(raw) {
        volume.applications_dir().join(raw)
    } else if Path::new(raw).is_absolute() {
        PathBuf::from(raw)
    } else {
        volume.path().join(raw)
    };

    if !path.has_root() || path.components().any(|c| c == Component::ParentDir) {
        return None;
    }

    Some(path)
}
