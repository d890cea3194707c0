//! The version-control seam.
//!
//! Every operation reports a [`GitOutcome`] instead of an error: the caller
//! decides whether a failed step is fatal.

use std::fmt;
use std::path::Path;

use pagesmith_core::Identity;

/// Operations the publisher needs from version control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GitOp {
    OriginUrl,
    Toplevel,
    RemoteBranch,
    CloneBranch,
    Init,
    AddRemote,
    CheckoutOrphan,
    AddAll,
    Status,
    Commit,
    Push,
}

impl fmt::Display for GitOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GitOp::OriginUrl => "origin-url",
            GitOp::Toplevel => "toplevel",
            GitOp::RemoteBranch => "ls-remote",
            GitOp::CloneBranch => "clone",
            GitOp::Init => "init",
            GitOp::AddRemote => "remote-add",
            GitOp::CheckoutOrphan => "checkout-orphan",
            GitOp::AddAll => "add",
            GitOp::Status => "status",
            GitOp::Commit => "commit",
            GitOp::Push => "push",
        };
        f.write_str(name)
    }
}

/// Result of one version-control operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitOutcome {
    pub op: GitOp,
    pub success: bool,
    /// Captured stdout followed by stderr, trimmed.
    pub output: String,
}

impl GitOutcome {
    pub fn ok(op: GitOp, output: impl Into<String>) -> Self {
        Self {
            op,
            success: true,
            output: output.into(),
        }
    }

    pub fn failed(op: GitOp, output: impl Into<String>) -> Self {
        Self {
            op,
            success: false,
            output: output.into(),
        }
    }

    /// First non-empty output line, if the operation succeeded.
    pub fn value(&self) -> Option<&str> {
        if !self.success {
            return None;
        }
        self.output.lines().map(str::trim).find(|l| !l.is_empty())
    }
}

/// Whether the publish branch exists on the remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchPresence {
    Exists,
    Absent,
    /// The query could not be answered (network, auth, bad remote).
    QueryFailed { output: String },
}

/// Version-control gateway. Implementations never panic or return `Err`.
pub trait VersionControl {
    /// `git config --get remote.origin.url` inside `repo`.
    fn origin_url(&self, repo: &Path) -> GitOutcome;

    /// Top-level directory of the repository containing `dir`.
    fn toplevel(&self, dir: &Path) -> GitOutcome;

    /// Query the remote's heads for `branch`.
    fn remote_branch(&self, remote: &str, branch: &str) -> BranchPresence;

    /// Shallow (depth 1), single-branch clone of `branch` into `dest`.
    fn clone_branch(&self, remote: &str, branch: &str, dest: &Path) -> GitOutcome;

    fn init(&self, dir: &Path) -> GitOutcome;

    fn add_remote(&self, dir: &Path, name: &str, url: &str) -> GitOutcome;

    /// Start a branch with no ancestry.
    fn checkout_orphan(&self, dir: &Path, branch: &str) -> GitOutcome;

    /// Stage additions, modifications and deletions, optionally under `pathspec`.
    fn add_all(&self, dir: &Path, pathspec: Option<&Path>) -> GitOutcome;

    /// Porcelain status, optionally limited to `pathspec`. Empty output means clean.
    fn status(&self, dir: &Path, pathspec: Option<&Path>) -> GitOutcome;

    fn commit(
        &self,
        dir: &Path,
        identity: &Identity,
        message: &str,
        pathspec: Option<&Path>,
    ) -> GitOutcome;

    fn push(&self, dir: &Path, remote: &str, refspec: &str, force: bool) -> GitOutcome;
}
