//! Domain types for a publish run.
//!
//! All path fields use `PathBuf`; never `&str` or `String` for filesystem paths.
//! Types that appear in the configuration file are serde-enabled.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A remote repository locator (URL or local path accepted by git).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteUrl(pub String);

impl fmt::Display for RemoteUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for RemoteUrl {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RemoteUrl {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl AsRef<str> for RemoteUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Name of the branch that hosts the published site.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BranchName(pub String);

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for BranchName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for BranchName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which publishing strategy to use, as written in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModeKind {
    /// Force-push to a dedicated branch from an ephemeral clone.
    #[default]
    Branch,
    /// Mirror into a tracked subdirectory of the current branch.
    Directory,
}

impl fmt::Display for ModeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModeKind::Branch => write!(f, "branch"),
            ModeKind::Directory => write!(f, "directory"),
        }
    }
}

/// What to do when the remote-branch query itself fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RemoteQueryPolicy {
    /// Proceed as if the branch did not exist (bootstrap an orphan branch).
    #[default]
    TreatAsAbsent,
    /// Fail the run.
    Abort,
}

/// Where the run's remote locator came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteSource {
    /// Supplied by flag, environment, or the `remote` config field.
    Explicit,
    /// Read from the invoking repository's `origin`.
    Origin,
    /// The configured `default_remote`.
    Fallback,
}

/// The resolved strategy for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishMode {
    /// Publish to `branch` via an ephemeral clone and a force push.
    Branch { branch: BranchName },
    /// Publish into `dir` (absolute) on whatever branch the repo has checked out.
    Directory { dir: PathBuf },
}

impl PublishMode {
    pub fn kind(&self) -> ModeKind {
        match self {
            PublishMode::Branch { .. } => ModeKind::Branch,
            PublishMode::Directory { .. } => ModeKind::Directory,
        }
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// Committer identity used for publish commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

impl Default for Identity {
    fn default() -> Self {
        Self {
            name: "GitHub Pages Bot".to_string(),
            email: "bot@example.com".to_string(),
        }
    }
}

/// Where a run publishes to. Immutable once resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishTarget {
    pub remote: RemoteUrl,
    pub remote_source: RemoteSource,
    pub mode: PublishMode,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
