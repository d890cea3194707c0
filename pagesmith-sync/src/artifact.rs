//! The artifact set: what a build produced and what gets published.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{io_err, PublishError};
use crate::mirror::METADATA_DIR;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
}

/// One entry below the artifact root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactEntry {
    /// Path relative to the artifact root.
    pub relative: PathBuf,
    pub kind: EntryKind,
    /// Size in bytes (0 for directories).
    pub len: u64,
}

/// A scanned, verified artifact directory.
///
/// Entries are ordered so that every directory precedes its contents.
#[derive(Debug, Clone)]
pub struct ArtifactSet {
    root: PathBuf,
    entries: Vec<ArtifactEntry>,
}

impl ArtifactSet {
    /// Scan `root`, failing if it is missing, not a directory, or empty.
    ///
    /// Symlinks are followed. A nested `.git` directory is never part of the set.
    pub fn scan(root: &Path) -> Result<Self, PublishError> {
        let meta = match std::fs::metadata(root) {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PublishError::SourceMissing {
                    path: root.to_path_buf(),
                })
            }
            Err(e) => return Err(io_err(root, e)),
        };
        if !meta.is_dir() {
            return Err(PublishError::SourceNotDirectory {
                path: root.to_path_buf(),
            });
        }

        let mut entries = Vec::new();
        let walker = WalkDir::new(root)
            .min_depth(1)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.file_name() != METADATA_DIR);
        for entry in walker {
            let entry = entry?;
            let relative = entry
                .path()
                .strip_prefix(root)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| PathBuf::from(entry.file_name()));
            let (kind, len) = if entry.file_type().is_dir() {
                (EntryKind::Dir, 0)
            } else {
                let meta = entry.metadata()?;
                (EntryKind::File, meta.len())
            };
            entries.push(ArtifactEntry {
                relative,
                kind,
                len,
            });
        }

        if entries.is_empty() {
            return Err(PublishError::SourceEmpty {
                path: root.to_path_buf(),
            });
        }

        tracing::debug!(
            "scanned {}: {} entries",
            root.display(),
            entries.len()
        );
        Ok(Self {
            root: root.to_path_buf(),
            entries,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn entries(&self) -> &[ArtifactEntry] {
        &self.entries
    }

    pub fn file_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.kind == EntryKind::File)
            .count()
    }

    pub fn total_bytes(&self) -> u64 {
        self.entries.iter().map(|e| e.len).sum()
    }
}
