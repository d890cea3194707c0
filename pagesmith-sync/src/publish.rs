//! Publish orchestration.
//!
//! ## State machine
//!
//! ```text
//! Idle → SourceVerified → AreaPrepared → Synced → Committed → Pushed → Done
//!                                            └──── (nothing changed) ───→ Done
//! any non-terminal state ──→ Failed
//! ```
//!
//! The working area is released on every path out of `AreaPrepared` and
//! later, success or failure, before the run returns.

use std::fmt;
use std::path::{Path, PathBuf};

use pagesmith_core::{
    ModeKind, PublishConfig, PublishMode, PublishTarget, RemoteSource, RemoteUrl,
};
use pagesmith_git::VersionControl;

use crate::area::{self, check_interrupt, require, AreaOrigin, Teardown, WorkingArea};
use crate::artifact::ArtifactSet;
use crate::error::PublishError;
use crate::mirror::{self, MirrorReport};

// ---------------------------------------------------------------------------
// States, events, results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishState {
    Idle,
    SourceVerified,
    AreaPrepared,
    Synced,
    Committed,
    Pushed,
    Done,
    Failed,
}

impl PublishState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PublishState::Done | PublishState::Failed)
    }
}

impl fmt::Display for PublishState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PublishState::Idle => "idle",
            PublishState::SourceVerified => "source-verified",
            PublishState::AreaPrepared => "area-prepared",
            PublishState::Synced => "synced",
            PublishState::Committed => "committed",
            PublishState::Pushed => "pushed",
            PublishState::Done => "done",
            PublishState::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// A commit was created and pushed.
    Published,
    /// The target already matched the artifacts; nothing was committed.
    Unchanged,
}

/// Progress notifications for the caller's console.
#[derive(Debug, Clone, PartialEq)]
pub enum PublishEvent {
    Transition {
        from: PublishState,
        to: PublishState,
    },
    SourceScanned {
        root: PathBuf,
        files: usize,
        bytes: u64,
    },
    TargetResolved {
        remote: RemoteUrl,
        source: RemoteSource,
        mode: ModeKind,
    },
    AreaReady {
        path: PathBuf,
        origin: AreaOrigin,
    },
    Mirrored(MirrorReport),
    NothingToCommit,
    Committed {
        message: String,
    },
    Pushed {
        refspec: String,
        force: bool,
    },
    Released {
        path: PathBuf,
        removed: bool,
    },
    Failed {
        from: PublishState,
        error: String,
    },
}

/// Summary of a successful run.
#[derive(Debug, Clone)]
pub struct PublishReport {
    pub target: PublishTarget,
    pub outcome: PublishOutcome,
    pub mirror: MirrorReport,
    pub site_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Target resolution
// ---------------------------------------------------------------------------

/// Top-level directory of the repository containing `start`, or `start`
/// itself outside a repository.
pub fn resolve_repo_root<G: VersionControl + ?Sized>(git: &G, start: &Path) -> PathBuf {
    git.toplevel(start)
        .value()
        .map(PathBuf::from)
        .unwrap_or_else(|| start.to_path_buf())
}

/// Resolve the run's target: explicit remote, else `origin`, else the
/// configured default.
pub fn resolve_target<G: VersionControl + ?Sized>(
    config: &PublishConfig,
    git: &G,
    repo_root: &Path,
) -> PublishTarget {
    let mode = config.publish_mode(repo_root);
    if let Some(remote) = &config.remote {
        return PublishTarget {
            remote: RemoteUrl::from(remote.as_str()),
            remote_source: RemoteSource::Explicit,
            mode,
        };
    }
    match git.origin_url(repo_root).value() {
        Some(url) => PublishTarget {
            remote: RemoteUrl::from(url),
            remote_source: RemoteSource::Origin,
            mode,
        },
        None => PublishTarget {
            remote: RemoteUrl::from(config.default_remote.as_str()),
            remote_source: RemoteSource::Fallback,
            mode,
        },
    }
}

// ---------------------------------------------------------------------------
// Publisher
// ---------------------------------------------------------------------------

/// Drives one publish run.
pub struct Publisher<'a, G: VersionControl + ?Sized> {
    config: &'a PublishConfig,
    git: &'a G,
    repo_root: PathBuf,
    teardown: Teardown,
    history: Vec<PublishState>,
}

impl<'a, G: VersionControl + ?Sized> Publisher<'a, G> {
    pub fn new(config: &'a PublishConfig, git: &'a G, repo_root: impl Into<PathBuf>) -> Self {
        Self {
            config,
            git,
            repo_root: repo_root.into(),
            teardown: Teardown::new(),
            history: vec![PublishState::Idle],
        }
    }

    /// Share `teardown` with an interrupt handler.
    pub fn with_teardown(mut self, teardown: Teardown) -> Self {
        self.teardown = teardown;
        self
    }

    pub fn teardown(&self) -> &Teardown {
        &self.teardown
    }

    pub fn state(&self) -> PublishState {
        self.history
            .last()
            .copied()
            .unwrap_or(PublishState::Idle)
    }

    /// Every state visited, starting with `Idle`.
    pub fn history(&self) -> &[PublishState] {
        &self.history
    }

    /// Publish the artifact directory at `source`.
    ///
    /// Emits progress through `on_event`. On failure the state becomes
    /// [`PublishState::Failed`] and the working area has already been released.
    pub fn run(
        &mut self,
        source: &Path,
        on_event: &mut dyn FnMut(PublishEvent),
    ) -> Result<PublishReport, PublishError> {
        let result = self.run_steps(source, on_event).map_err(|e| {
            // A step cut short by the signal fails for that reason, not its own.
            if self.teardown.is_interrupted() {
                PublishError::Interrupted
            } else {
                e
            }
        });
        if let Err(e) = &result {
            let from = self.state();
            tracing::debug!("publish failed in state {from}: {e}");
            self.transition(PublishState::Failed, on_event);
            on_event(PublishEvent::Failed {
                from,
                error: e.to_string(),
            });
        }
        result
    }

    fn run_steps(
        &mut self,
        source: &Path,
        on_event: &mut dyn FnMut(PublishEvent),
    ) -> Result<PublishReport, PublishError> {
        check_interrupt(&self.teardown)?;

        // Idle → SourceVerified
        let artifacts = ArtifactSet::scan(source)?;
        on_event(PublishEvent::SourceScanned {
            root: source.to_path_buf(),
            files: artifacts.file_count(),
            bytes: artifacts.total_bytes(),
        });
        self.transition(PublishState::SourceVerified, on_event);

        let target = resolve_target(self.config, self.git, &self.repo_root);
        on_event(PublishEvent::TargetResolved {
            remote: target.remote.clone(),
            source: target.remote_source,
            mode: target.mode.kind(),
        });
        if let PublishMode::Directory { dir } = &target.mode {
            check_overlap(source, dir)?;
        }
        check_interrupt(&self.teardown)?;

        // SourceVerified → AreaPrepared
        let area = area::prepare(&target, self.config, self.git, &self.teardown)?;
        on_event(PublishEvent::AreaReady {
            path: area.path().to_path_buf(),
            origin: area.origin().clone(),
        });
        self.transition(PublishState::AreaPrepared, on_event);

        let area_path = area.path().to_path_buf();
        let ephemeral = area.is_ephemeral();
        let steps = self.sync_commit_push(&target, &artifacts, &area, on_event);
        let released = area.release();
        let (outcome, mirror) = match (steps, released) {
            (Ok(done), Ok(())) => done,
            (Err(e), released) => {
                if let Err(release_err) = released {
                    tracing::warn!("release after failure also failed: {release_err}");
                }
                return Err(e);
            }
            (Ok(_), Err(release_err)) => return Err(release_err),
        };
        on_event(PublishEvent::Released {
            path: area_path,
            removed: ephemeral,
        });

        self.transition(PublishState::Done, on_event);
        Ok(PublishReport {
            target,
            outcome,
            mirror,
            site_url: self.config.site_url.clone(),
        })
    }

    fn sync_commit_push(
        &mut self,
        target: &PublishTarget,
        artifacts: &ArtifactSet,
        area: &WorkingArea,
        on_event: &mut dyn FnMut(PublishEvent),
    ) -> Result<(PublishOutcome, MirrorReport), PublishError> {
        check_interrupt(&self.teardown)?;

        // AreaPrepared → Synced
        let report = mirror::mirror(
            artifacts,
            area.path(),
            &self.config.marker_file,
            &self.teardown,
        )?;
        on_event(PublishEvent::Mirrored(report));
        self.transition(PublishState::Synced, on_event);
        check_interrupt(&self.teardown)?;

        // Synced → Committed
        let repo_root = self.repo_root.clone();
        let (repo, pathspec) = match &target.mode {
            PublishMode::Branch { .. } => (area.path(), None),
            PublishMode::Directory { dir } => (repo_root.as_path(), Some(dir.as_path())),
        };
        let status = require(self.git.status(repo, pathspec))?;
        check_interrupt(&self.teardown)?;
        if status.output.trim().is_empty() {
            tracing::info!("working area matches the published content");
            on_event(PublishEvent::NothingToCommit);
            return Ok((PublishOutcome::Unchanged, report));
        }
        require(self.git.add_all(repo, pathspec))?;
        check_interrupt(&self.teardown)?;
        require(self.git.commit(
            repo,
            &self.config.identity,
            &self.config.commit_message,
            pathspec,
        ))?;
        on_event(PublishEvent::Committed {
            message: self.config.commit_message.clone(),
        });
        self.transition(PublishState::Committed, on_event);
        check_interrupt(&self.teardown)?;

        // Committed → Pushed
        let (remote, refspec, force) = match &target.mode {
            PublishMode::Branch { branch } => ("origin", branch.0.as_str(), true),
            PublishMode::Directory { .. } => (target.remote.0.as_str(), "HEAD", false),
        };
        require(self.git.push(repo, remote, refspec, force))?;
        on_event(PublishEvent::Pushed {
            refspec: refspec.to_string(),
            force,
        });
        self.transition(PublishState::Pushed, on_event);

        Ok((PublishOutcome::Published, report))
    }

    fn transition(&mut self, to: PublishState, on_event: &mut dyn FnMut(PublishEvent)) {
        let from = self.state();
        tracing::info!("publish: {from} -> {to}");
        self.history.push(to);
        on_event(PublishEvent::Transition { from, to });
    }
}

/// Refuse to mirror into a directory that contains, or is contained by, the
/// artifact source: the wipe step would delete the artifacts.
fn check_overlap(source: &Path, dir: &Path) -> Result<(), PublishError> {
    let source_abs = source
        .canonicalize()
        .unwrap_or_else(|_| source.to_path_buf());
    let dir_abs = canonical_or_joined(dir);
    if source_abs.starts_with(&dir_abs) || dir_abs.starts_with(&source_abs) {
        return Err(PublishError::SourceOverlapsTarget {
            source_dir: source.to_path_buf(),
            target_dir: dir.to_path_buf(),
        });
    }
    Ok(())
}

/// Canonicalize `path`, or its parent joined with the file name when `path`
/// does not exist yet.
fn canonical_or_joined(path: &Path) -> PathBuf {
    if let Ok(abs) = path.canonicalize() {
        return abs;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => parent
            .canonicalize()
            .map(|p| p.join(name))
            .unwrap_or_else(|_| path.to_path_buf()),
        _ => path.to_path_buf(),
    }
}
