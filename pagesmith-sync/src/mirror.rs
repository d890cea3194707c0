//! Wipe-and-recopy mirror of an artifact set into a working area.
//!
//! ## `mirror`: 3-step protocol
//!
//! 1. Delete every entry directly under the area except `.git`.
//! 2. Copy every artifact entry into the area, creating directories as needed.
//! 3. Write the zero-byte marker file at the area root.
//!
//! Step 1 is what makes stale files from a previous publish impossible: the
//! area holds nothing but metadata when copying starts.
//!
//! Both loops stop with [`PublishError::Interrupted`] as soon as the
//! [`Teardown`] flag is set, so the caller can release the area while nothing
//! is writing into it.

use std::fs;
use std::path::{Path, PathBuf};

use crate::area::{check_interrupt, Teardown};
use crate::artifact::{ArtifactSet, EntryKind};
use crate::error::{io_err, PublishError};

/// Version-control metadata directory, never touched by the mirror.
pub const METADATA_DIR: &str = ".git";

/// What a mirror pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MirrorReport {
    /// Top-level entries removed from the area.
    pub removed: usize,
    pub copied_files: usize,
    pub copied_bytes: u64,
}

/// Make `area` (minus metadata) an exact copy of `source` plus `marker`.
pub fn mirror(
    source: &ArtifactSet,
    area: &Path,
    marker: &str,
    teardown: &Teardown,
) -> Result<MirrorReport, PublishError> {
    let removed = clear_area(area, teardown)?;
    let (copied_files, copied_bytes) = copy_artifacts(source, area, teardown)?;
    write_marker(area, marker)?;

    tracing::info!(
        "mirrored {} files ({} bytes) into {}, removed {} stale entries",
        copied_files,
        copied_bytes,
        area.display(),
        removed
    );
    Ok(MirrorReport {
        removed,
        copied_files,
        copied_bytes,
    })
}

/// Remove everything directly under `area` except [`METADATA_DIR`].
///
/// Symlinks are unlinked, never followed. Returns the number of entries removed.
pub fn clear_area(area: &Path, teardown: &Teardown) -> Result<usize, PublishError> {
    let mut removed = 0;
    for entry in fs::read_dir(area).map_err(|e| io_err(area, e))? {
        check_interrupt(teardown)?;
        let entry = entry.map_err(|e| io_err(area, e))?;
        if entry.file_name() == METADATA_DIR {
            continue;
        }
        let path = entry.path();
        let meta = fs::symlink_metadata(&path).map_err(|e| io_err(&path, e))?;
        if meta.is_dir() {
            fs::remove_dir_all(&path).map_err(|e| io_err(&path, e))?;
        } else {
            fs::remove_file(&path).map_err(|e| io_err(&path, e))?;
        }
        tracing::debug!("removed: {}", path.display());
        removed += 1;
    }
    Ok(removed)
}

/// Copy every entry of `source` into `area`. Returns `(files, bytes)`.
pub fn copy_artifacts(
    source: &ArtifactSet,
    area: &Path,
    teardown: &Teardown,
) -> Result<(usize, u64), PublishError> {
    let mut files = 0;
    let mut bytes = 0;
    for entry in source.entries() {
        check_interrupt(teardown)?;
        let from = source.root().join(&entry.relative);
        let to = area.join(&entry.relative);
        match entry.kind {
            EntryKind::Dir => {
                fs::create_dir_all(&to).map_err(|e| io_err(&to, e))?;
            }
            EntryKind::File => {
                if let Some(parent) = to.parent() {
                    fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
                }
                bytes += fs::copy(&from, &to).map_err(|e| io_err(&from, e))?;
                files += 1;
            }
        }
    }
    Ok((files, bytes))
}

/// Write (or truncate) the zero-byte marker at the area root.
pub fn write_marker(area: &Path, marker: &str) -> Result<PathBuf, PublishError> {
    let path = area.join(marker);
    fs::write(&path, b"").map_err(|e| io_err(&path, e))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn source_with(files: &[(&str, &str)]) -> TempDir {
        let tmp = TempDir::new().unwrap();
        for (rel, content) in files {
            let path = tmp.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        tmp
    }

    #[test]
    fn stale_files_are_removed_and_metadata_kept() {
        let source = source_with(&[("index.html", "new")]);
        let area = TempDir::new().unwrap();
        fs::create_dir_all(area.path().join(".git/refs")).unwrap();
        fs::write(area.path().join(".git/HEAD"), "ref: refs/heads/gh-pages").unwrap();
        fs::create_dir_all(area.path().join("old/deep")).unwrap();
        fs::write(area.path().join("old/deep/page.html"), "stale").unwrap();
        fs::write(area.path().join("index.html"), "old").unwrap();

        let set = ArtifactSet::scan(source.path()).unwrap();
        let report = mirror(&set, area.path(), ".nojekyll", &Teardown::new()).unwrap();

        assert_eq!(report.removed, 2);
        assert_eq!(report.copied_files, 1);
        assert!(!area.path().join("old").exists());
        assert_eq!(fs::read_to_string(area.path().join("index.html")).unwrap(), "new");
        assert_eq!(
            fs::read_to_string(area.path().join(".git/HEAD")).unwrap(),
            "ref: refs/heads/gh-pages"
        );
    }

    #[test]
    fn marker_is_zero_bytes() {
        let source = source_with(&[("index.html", "hi")]);
        let area = TempDir::new().unwrap();
        let set = ArtifactSet::scan(source.path()).unwrap();
        mirror(&set, area.path(), ".nojekyll", &Teardown::new()).unwrap();
        let meta = fs::metadata(area.path().join(".nojekyll")).unwrap();
        assert_eq!(meta.len(), 0);
    }

    #[test]
    fn marker_from_source_is_truncated() {
        let source = source_with(&[("index.html", "hi"), (".nojekyll", "not empty")]);
        let area = TempDir::new().unwrap();
        let set = ArtifactSet::scan(source.path()).unwrap();
        mirror(&set, area.path(), ".nojekyll", &Teardown::new()).unwrap();
        assert_eq!(fs::metadata(area.path().join(".nojekyll")).unwrap().len(), 0);
    }

    #[test]
    fn nested_structure_and_empty_dirs_are_preserved() {
        let source = source_with(&[("assets/a.css", "body{}"), ("index.html", "hi")]);
        fs::create_dir_all(source.path().join("empty/inner")).unwrap();
        let area = TempDir::new().unwrap();
        let set = ArtifactSet::scan(source.path()).unwrap();
        let report = mirror(&set, area.path(), ".nojekyll", &Teardown::new()).unwrap();

        assert_eq!(report.copied_files, 2);
        assert_eq!(report.copied_bytes, 8);
        assert_eq!(
            fs::read_to_string(area.path().join("assets/a.css")).unwrap(),
            "body{}"
        );
        assert!(area.path().join("empty/inner").is_dir());
    }

    #[test]
    #[cfg(unix)]
    fn symlinks_in_area_are_unlinked_not_followed() {
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("keep.txt"), "keep").unwrap();
        let area = TempDir::new().unwrap();
        std::os::unix::fs::symlink(outside.path(), area.path().join("link")).unwrap();

        let removed = clear_area(area.path(), &Teardown::new()).unwrap();
        assert_eq!(removed, 1);
        assert!(!area.path().join("link").exists());
        assert!(outside.path().join("keep.txt").exists(), "symlink target must survive");
    }

    #[test]
    fn interrupt_stops_copying_before_the_next_entry() {
        let source = source_with(&[("a.html", "a"), ("b.html", "b")]);
        let area = TempDir::new().unwrap();
        fs::write(area.path().join("old.html"), "old").unwrap();
        let set = ArtifactSet::scan(source.path()).unwrap();
        let teardown = Teardown::new();
        teardown.interrupt();

        let err = mirror(&set, area.path(), ".nojekyll", &teardown).unwrap_err();
        assert!(matches!(err, PublishError::Interrupted));
        assert!(area.path().join("old.html").exists(), "nothing touched after interrupt");
        assert!(!area.path().join("a.html").exists());

        let err = copy_artifacts(&set, area.path(), &teardown).unwrap_err();
        assert!(matches!(err, PublishError::Interrupted));
        assert!(!area.path().join(".nojekyll").exists());
    }
}
