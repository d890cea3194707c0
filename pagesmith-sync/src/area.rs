//! Working-area lifecycle.
//!
//! A [`WorkingArea`] is a scoped guard: [`prepare`] acquires it and it is
//! released exactly once, by [`WorkingArea::release`] or by `Drop` on an
//! early return. An interrupt only raises a flag on the shared [`Teardown`];
//! the run notices it between steps and unwinds through the normal release.
//! [`Teardown::purge`] is the forced path for a handler that cannot wait.
//! Release and purge both hold the [`Teardown`] slot lock while removing.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use chrono::Utc;
use tempfile::TempDir;

use pagesmith_core::{PublishConfig, PublishMode, PublishTarget, RemoteQueryPolicy};
use pagesmith_git::{BranchPresence, GitOutcome, VersionControl};

use crate::error::{io_err, PublishError};

const PURGE_ATTEMPTS: u32 = 20;
const PURGE_BACKOFF: Duration = Duration::from_millis(50);

// ---------------------------------------------------------------------------
// Teardown handle
// ---------------------------------------------------------------------------

/// Shared handle between a run and its interrupt handler.
///
/// Clones share state, so the handle can be moved into a `ctrlc` closure.
#[derive(Debug, Clone, Default)]
pub struct Teardown {
    inner: Arc<TeardownInner>,
}

#[derive(Debug, Default)]
struct TeardownInner {
    armed: Mutex<Option<PathBuf>>,
    interrupted: AtomicBool,
}

impl Teardown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ephemeral area currently owned by the run, if any.
    pub fn armed(&self) -> Option<PathBuf> {
        self.slot().clone()
    }

    pub fn is_interrupted(&self) -> bool {
        self.inner.interrupted.load(Ordering::SeqCst)
    }

    /// Record an interrupt. Returns `true` for the first one.
    ///
    /// Nothing is removed here: the run stops at its next check and releases
    /// the area on the way out.
    pub fn interrupt(&self) -> bool {
        !self.inner.interrupted.swap(true, Ordering::SeqCst)
    }

    /// Remove the armed area from outside the run.
    ///
    /// Holds the slot lock throughout and retries while a step still in
    /// flight writes into the tree. Returns the removed path, or an error if
    /// the directory is still there after the last attempt.
    pub fn purge(&self) -> Result<Option<PathBuf>, PublishError> {
        let mut slot = self.slot();
        let Some(path) = slot.clone() else {
            return Ok(None);
        };
        let mut attempt = 1;
        loop {
            match remove_tree(&path) {
                Ok(()) if !path.exists() => {
                    *slot = None;
                    tracing::info!("purged working area {}", path.display());
                    return Ok(Some(path));
                }
                Ok(()) if attempt >= PURGE_ATTEMPTS => {
                    return Err(io_err(
                        &path,
                        std::io::Error::new(ErrorKind::Other, "directory keeps reappearing"),
                    ))
                }
                Err(e) if attempt >= PURGE_ATTEMPTS => return Err(io_err(&path, e)),
                _ => {
                    attempt += 1;
                    thread::sleep(PURGE_BACKOFF);
                }
            }
        }
    }

    fn arm(&self, path: &Path) {
        *self.slot() = Some(path.to_path_buf());
    }

    /// Disarm and delete `dir`. Returns `false` when a purge got there first.
    fn release(&self, dir: TempDir) -> Result<bool, PublishError> {
        let mut slot = self.slot();
        if slot.as_deref() == Some(dir.path()) {
            *slot = None;
        }
        let path = dir.path().to_path_buf();
        match dir.close() {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_err(path, e)),
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<PathBuf>> {
        match self.inner.armed.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn remove_tree(path: &Path) -> std::io::Result<()> {
    match fs::remove_dir_all(path) {
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

// ---------------------------------------------------------------------------
// Working area
// ---------------------------------------------------------------------------

/// How the working area came to hold its initial content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AreaOrigin {
    /// Shallow clone of the existing publish branch.
    Cloned,
    /// Fresh repository on an orphan branch. `query_failure` carries the
    /// diagnostic when the branch query failed and was treated as absent.
    Orphan { query_failure: Option<String> },
    /// The permanent DirectoryMode directory.
    Permanent,
}

/// The location a run mutates.
#[derive(Debug)]
pub struct WorkingArea {
    path: PathBuf,
    origin: AreaOrigin,
    scratch: Option<Scratch>,
}

#[derive(Debug)]
struct Scratch {
    dir: TempDir,
    teardown: Teardown,
}

impl WorkingArea {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn origin(&self) -> &AreaOrigin {
        &self.origin
    }

    /// `true` when release deletes the area.
    pub fn is_ephemeral(&self) -> bool {
        self.scratch.is_some()
    }

    /// Release the area: ephemeral areas are deleted, permanent ones kept.
    pub fn release(mut self) -> Result<(), PublishError> {
        match self.scratch.take() {
            Some(Scratch { dir, teardown }) => {
                if teardown.release(dir)? {
                    tracing::info!("removed working area {}", self.path.display());
                }
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl Drop for WorkingArea {
    fn drop(&mut self) {
        if let Some(Scratch { dir, teardown }) = self.scratch.take() {
            if let Err(e) = teardown.release(dir) {
                tracing::warn!("failed to remove working area: {e}");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// prepare
// ---------------------------------------------------------------------------

/// Acquire the working area for `target`.
///
/// BranchMode allocates a fresh directory under the configured temp root and
/// either clones the publish branch (depth 1) or bootstraps an orphan branch.
/// Any failure releases the directory before returning.
pub fn prepare<G: VersionControl + ?Sized>(
    target: &PublishTarget,
    config: &PublishConfig,
    git: &G,
    teardown: &Teardown,
) -> Result<WorkingArea, PublishError> {
    match &target.mode {
        PublishMode::Branch { branch } => {
            let mut area = allocate(config, teardown)?;
            area.origin = populate(&area.path, target, &branch.0, config, git, teardown)?;
            Ok(area)
        }
        PublishMode::Directory { dir } => {
            fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
            Ok(WorkingArea {
                path: dir.clone(),
                origin: AreaOrigin::Permanent,
                scratch: None,
            })
        }
    }
}

/// `<temp_root>/<prefix>-<unix millis>-<random>`, created empty and armed.
fn allocate(config: &PublishConfig, teardown: &Teardown) -> Result<WorkingArea, PublishError> {
    let root = config.temp_root();
    fs::create_dir_all(&root).map_err(|e| io_err(&root, e))?;
    let dir = tempfile::Builder::new()
        .prefix(&format!(
            "{}-{}-",
            config.temp_prefix,
            Utc::now().timestamp_millis()
        ))
        .tempdir_in(&root)
        .map_err(|e| io_err(&root, e))?;
    let path = dir.path().to_path_buf();
    teardown.arm(&path);
    tracing::info!("created working area {}", path.display());
    Ok(WorkingArea {
        path,
        origin: AreaOrigin::Orphan {
            query_failure: None,
        },
        scratch: Some(Scratch {
            dir,
            teardown: teardown.clone(),
        }),
    })
}

fn populate<G: VersionControl + ?Sized>(
    dir: &Path,
    target: &PublishTarget,
    branch: &str,
    config: &PublishConfig,
    git: &G,
    teardown: &Teardown,
) -> Result<AreaOrigin, PublishError> {
    let remote: &str = target.remote.as_ref();
    let presence = git.remote_branch(remote, branch);
    check_interrupt(teardown)?;

    let query_failure = match presence {
        BranchPresence::Exists => {
            tracing::info!("branch {branch} exists on {remote}; cloning");
            require(git.clone_branch(remote, branch, dir))?;
            check_interrupt(teardown)?;
            return Ok(AreaOrigin::Cloned);
        }
        BranchPresence::Absent => None,
        BranchPresence::QueryFailed { output } => match config.on_query_failure {
            RemoteQueryPolicy::TreatAsAbsent => {
                tracing::warn!("branch query failed, treating {branch} as absent: {output}");
                Some(output)
            }
            RemoteQueryPolicy::Abort => {
                return Err(PublishError::RemoteQueryFailed {
                    remote: remote.to_string(),
                    branch: branch.to_string(),
                    output,
                })
            }
        },
    };

    tracing::info!("bootstrapping orphan branch {branch}");
    require(git.init(dir))?;
    check_interrupt(teardown)?;
    require(git.add_remote(dir, "origin", remote))?;
    check_interrupt(teardown)?;
    require(git.checkout_orphan(dir, branch))?;
    check_interrupt(teardown)?;
    Ok(AreaOrigin::Orphan { query_failure })
}

/// Turn a failed outcome into [`PublishError::Git`].
pub(crate) fn require(outcome: GitOutcome) -> Result<GitOutcome, PublishError> {
    if outcome.success {
        Ok(outcome)
    } else {
        tracing::warn!("git {} failed: {}", outcome.op, outcome.output);
        Err(PublishError::Git {
            op: outcome.op,
            output: outcome.output,
        })
    }
}

pub(crate) fn check_interrupt(teardown: &Teardown) -> Result<(), PublishError> {
    if teardown.is_interrupted() {
        Err(PublishError::Interrupted)
    } else {
        Ok(())
    }
}
