//! In-memory [`VersionControl`] for deterministic tests.
//!
//! # Design
//!
//! `MockGit` records every call and simulates just enough of git's
//! filesystem behavior for the publisher to run end to end:
//!
//! - `clone_branch` creates the destination with a `.git` directory and
//!   materializes the current remote tree into it.
//! - `init` creates `<dir>/.git`.
//! - `status` diffs the working files (minus `.git`) against the remote tree.
//! - `commit` snapshots the working files; a successful `push` makes that
//!   snapshot the new remote tree.
//!
//! Any operation can be scripted to fail, and a hook can run when an
//! operation starts (used to simulate an interrupt mid-run).
//!
//! # Example
//!
//! ```
//! use pagesmith_git::mock::MockGit;
//! use pagesmith_git::{BranchPresence, GitOp, VersionControl};
//!
//! let git = MockGit::new().with_presence(BranchPresence::Absent);
//! assert_eq!(git.remote_branch("origin", "gh-pages"), BranchPresence::Absent);
//! assert_eq!(git.ops(), vec![GitOp::RemoteBranch]);
//! ```

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use pagesmith_core::Identity;
use walkdir::WalkDir;

use crate::gateway::{BranchPresence, GitOp, GitOutcome, VersionControl};

type Hook = Arc<dyn Fn() + Send + Sync>;

/// One recorded gateway call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    pub op: GitOp,
    pub args: Vec<String>,
}

/// Mock gateway. Clones share state.
#[derive(Clone, Default)]
pub struct MockGit {
    inner: Arc<Mutex<MockGitInner>>,
}

#[derive(Default)]
struct MockGitInner {
    presence: Option<BranchPresence>,
    origin: Option<String>,
    toplevel: Option<PathBuf>,
    /// Remote tree of the publish target (relative path → bytes).
    remote_tree: BTreeMap<String, Vec<u8>>,
    /// Snapshot taken by the last successful commit.
    committed: Option<BTreeMap<String, Vec<u8>>>,
    fail_on: HashSet<GitOp>,
    hooks: Vec<(GitOp, Hook)>,
    calls: Vec<MockCall>,
}

impl fmt::Debug for MockGit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("MockGit")
            .field("presence", &inner.presence)
            .field("remote_files", &inner.remote_tree.len())
            .field("fail_on", &inner.fail_on)
            .field("calls", &inner.calls.len())
            .finish()
    }
}

impl MockGit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fix the answer to `remote_branch`. When unset, presence follows the
    /// remote tree: `Exists` once anything has been pushed.
    pub fn with_presence(self, presence: BranchPresence) -> Self {
        self.lock().presence = Some(presence);
        self
    }

    pub fn with_origin(self, url: &str) -> Self {
        self.lock().origin = Some(url.to_string());
        self
    }

    pub fn with_toplevel(self, dir: &Path) -> Self {
        self.lock().toplevel = Some(dir.to_path_buf());
        self
    }

    /// Seed the remote tree (what a clone of the publish branch contains).
    pub fn with_remote_file(self, path: &str, contents: &[u8]) -> Self {
        self.lock()
            .remote_tree
            .insert(path.to_string(), contents.to_vec());
        self
    }

    pub fn fail_on(self, op: GitOp) -> Self {
        self.lock().fail_on.insert(op);
        self
    }

    /// Run `hook` whenever `op` starts, before it takes effect.
    pub fn on(self, op: GitOp, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.lock().hooks.push((op, Arc::new(hook)));
        self
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.lock().calls.clone()
    }

    pub fn ops(&self) -> Vec<GitOp> {
        self.lock().calls.iter().map(|c| c.op).collect()
    }

    pub fn called(&self, op: GitOp) -> bool {
        self.lock().calls.iter().any(|c| c.op == op)
    }

    /// Current remote tree.
    pub fn remote_tree(&self) -> BTreeMap<String, Vec<u8>> {
        self.lock().remote_tree.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MockGitInner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Record the call, run hooks, and report whether it is scripted to fail.
    fn enter(&self, op: GitOp, args: Vec<String>) -> bool {
        let hooks: Vec<Hook> = {
            let mut inner = self.lock();
            inner.calls.push(MockCall { op, args });
            inner
                .hooks
                .iter()
                .filter(|(hook_op, _)| *hook_op == op)
                .map(|(_, hook)| Arc::clone(hook))
                .collect()
        };
        for hook in hooks {
            hook();
        }
        self.lock().fail_on.contains(&op)
    }
}

fn scripted_failure(op: GitOp) -> GitOutcome {
    GitOutcome::failed(op, format!("mock: {op} failed"))
}

fn io_failure(op: GitOp, path: &Path, e: std::io::Error) -> GitOutcome {
    GitOutcome::failed(op, format!("mock: {}: {e}", path.display()))
}

/// Relative path → bytes for every file under `root`, skipping `.git`.
fn snapshot(root: &Path) -> std::io::Result<BTreeMap<String, Vec<u8>>> {
    let mut out = BTreeMap::new();
    if !root.exists() {
        return Ok(out);
    }
    let walker = WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_entry(|e| e.file_name() != ".git");
    for entry in walker {
        let entry = entry.map_err(std::io::Error::from)?;
        if entry.file_type().is_dir() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .replace('\\', "/");
        out.insert(rel, fs::read(entry.path())?);
    }
    Ok(out)
}

fn show(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn scope(dir: &Path, pathspec: Option<&Path>) -> PathBuf {
    match pathspec {
        Some(limit) if limit.is_absolute() => limit.to_path_buf(),
        Some(limit) => dir.join(limit),
        None => dir.to_path_buf(),
    }
}

impl VersionControl for MockGit {
    fn origin_url(&self, repo: &Path) -> GitOutcome {
        let op = GitOp::OriginUrl;
        if self.enter(op, vec![show(repo)]) {
            return scripted_failure(op);
        }
        match self.lock().origin.clone() {
            Some(url) => GitOutcome::ok(op, url),
            None => GitOutcome::failed(op, ""),
        }
    }

    fn toplevel(&self, dir: &Path) -> GitOutcome {
        let op = GitOp::Toplevel;
        if self.enter(op, vec![show(dir)]) {
            return scripted_failure(op);
        }
        match self.lock().toplevel.clone() {
            Some(top) => GitOutcome::ok(op, top.to_string_lossy()),
            None => GitOutcome::failed(op, "fatal: not a git repository"),
        }
    }

    fn remote_branch(&self, remote: &str, branch: &str) -> BranchPresence {
        let op = GitOp::RemoteBranch;
        if self.enter(op, vec![remote.to_string(), branch.to_string()]) {
            return BranchPresence::QueryFailed {
                output: format!("mock: {op} failed"),
            };
        }
        let inner = self.lock();
        match &inner.presence {
            Some(p) => p.clone(),
            None if inner.remote_tree.is_empty() => BranchPresence::Absent,
            None => BranchPresence::Exists,
        }
    }

    fn clone_branch(&self, remote: &str, branch: &str, dest: &Path) -> GitOutcome {
        let op = GitOp::CloneBranch;
        if self.enter(op, vec![remote.to_string(), branch.to_string(), show(dest)]) {
            return scripted_failure(op);
        }
        let tree = self.lock().remote_tree.clone();
        if let Err(e) = fs::create_dir_all(dest.join(".git")) {
            return io_failure(op, dest, e);
        }
        for (rel, bytes) in tree {
            let path = dest.join(&rel);
            if let Some(parent) = path.parent() {
                if let Err(e) = fs::create_dir_all(parent) {
                    return io_failure(op, parent, e);
                }
            }
            if let Err(e) = fs::write(&path, bytes) {
                return io_failure(op, &path, e);
            }
        }
        GitOutcome::ok(op, format!("Cloning into '{}'...", dest.display()))
    }

    fn init(&self, dir: &Path) -> GitOutcome {
        let op = GitOp::Init;
        if self.enter(op, vec![show(dir)]) {
            return scripted_failure(op);
        }
        match fs::create_dir_all(dir.join(".git")) {
            Ok(()) => GitOutcome::ok(op, "Initialized empty Git repository"),
            Err(e) => io_failure(op, dir, e),
        }
    }

    fn add_remote(&self, dir: &Path, name: &str, url: &str) -> GitOutcome {
        let op = GitOp::AddRemote;
        if self.enter(op, vec![show(dir), name.to_string(), url.to_string()]) {
            return scripted_failure(op);
        }
        GitOutcome::ok(op, "")
    }

    fn checkout_orphan(&self, dir: &Path, branch: &str) -> GitOutcome {
        let op = GitOp::CheckoutOrphan;
        if self.enter(op, vec![show(dir), branch.to_string()]) {
            return scripted_failure(op);
        }
        GitOutcome::ok(op, format!("Switched to a new branch '{branch}'"))
    }

    fn add_all(&self, dir: &Path, pathspec: Option<&Path>) -> GitOutcome {
        let op = GitOp::AddAll;
        let limit = pathspec.map(show).unwrap_or_default();
        if self.enter(op, vec![show(dir), limit]) {
            return scripted_failure(op);
        }
        GitOutcome::ok(op, "")
    }

    fn status(&self, dir: &Path, pathspec: Option<&Path>) -> GitOutcome {
        let op = GitOp::Status;
        let limit = pathspec.map(show).unwrap_or_default();
        if self.enter(op, vec![show(dir), limit]) {
            return scripted_failure(op);
        }
        let root = scope(dir, pathspec);
        let current = match snapshot(&root) {
            Ok(tree) => tree,
            Err(e) => return io_failure(op, &root, e),
        };
        let remote = self.lock().remote_tree.clone();
        let mut lines = Vec::new();
        for (rel, bytes) in &current {
            match remote.get(rel) {
                None => lines.push(format!("A  {rel}")),
                Some(old) if old != bytes => lines.push(format!("M  {rel}")),
                Some(_) => {}
            }
        }
        for rel in remote.keys().filter(|rel| !current.contains_key(*rel)) {
            lines.push(format!("D  {rel}"));
        }
        GitOutcome::ok(op, lines.join("\n"))
    }

    fn commit(
        &self,
        dir: &Path,
        identity: &Identity,
        message: &str,
        pathspec: Option<&Path>,
    ) -> GitOutcome {
        let op = GitOp::Commit;
        let author = format!("{} <{}>", identity.name, identity.email);
        if self.enter(op, vec![show(dir), author, message.to_string()]) {
            return scripted_failure(op);
        }
        let root = scope(dir, pathspec);
        match snapshot(&root) {
            Ok(tree) => {
                self.lock().committed = Some(tree);
                GitOutcome::ok(op, format!("[mock] {message}"))
            }
            Err(e) => io_failure(op, &root, e),
        }
    }

    fn push(&self, dir: &Path, remote: &str, refspec: &str, force: bool) -> GitOutcome {
        let op = GitOp::Push;
        let force_flag = if force { "-f" } else { "" };
        let args = vec![
            show(dir),
            remote.to_string(),
            refspec.to_string(),
            force_flag.to_string(),
        ];
        if self.enter(op, args) {
            return scripted_failure(op);
        }
        let mut inner = self.lock();
        match inner.committed.take() {
            Some(tree) => {
                inner.remote_tree = tree;
                GitOutcome::ok(op, format!("{refspec} -> {refspec}"))
            }
            None => GitOutcome::failed(op, "mock: nothing committed to push"),
        }
    }
}
