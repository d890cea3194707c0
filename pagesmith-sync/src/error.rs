//! Error types for pagesmith-sync.

use std::path::PathBuf;

use thiserror::Error;

use pagesmith_core::ConfigError;
use pagesmith_git::GitOp;

/// All errors that can end a publish run.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The artifact directory does not exist.
    #[error("artifact source {path} does not exist; build the site first")]
    SourceMissing { path: PathBuf },

    #[error("artifact source {path} is not a directory")]
    SourceNotDirectory { path: PathBuf },

    #[error("artifact source {path} is empty")]
    SourceEmpty { path: PathBuf },

    /// DirectoryMode would wipe the directory the artifacts are read from.
    #[error("artifact source {source_dir} overlaps publish directory {target_dir}")]
    SourceOverlapsTarget {
        source_dir: PathBuf,
        target_dir: PathBuf,
    },

    /// The remote could not be asked whether the publish branch exists.
    #[error("could not query branch '{branch}' on {remote}: {output}")]
    RemoteQueryFailed {
        remote: String,
        branch: String,
        output: String,
    },

    /// A version-control step reported failure.
    #[error("git {op} failed: {output}")]
    Git { op: GitOp, output: String },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read artifact tree: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// An interrupt signal arrived during the run.
    #[error("publish interrupted")]
    Interrupted,
}

impl PublishError {
    /// Failures detected before any working area is touched.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            PublishError::SourceMissing { .. }
                | PublishError::SourceNotDirectory { .. }
                | PublishError::SourceEmpty { .. }
                | PublishError::SourceOverlapsTarget { .. }
        )
    }
}

/// Convenience constructor for [`PublishError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> PublishError {
    PublishError::Io {
        path: path.into(),
        source,
    }
}
