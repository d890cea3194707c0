//! [`VersionControl`] backed by the `git` executable.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use pagesmith_core::Identity;

use crate::gateway::{BranchPresence, GitOp, GitOutcome, VersionControl};

/// Spawns `git` (or a configured replacement) for every operation.
#[derive(Debug, Clone)]
pub struct GitCli {
    program: PathBuf,
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new("git")
    }
}

impl GitCli {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Check if the configured program runs at all.
    pub fn check_available(&self) -> bool {
        Command::new(&self.program)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    fn run<I, S>(&self, op: GitOp, cwd: Option<&Path>, args: I) -> GitOutcome
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
        let rendered = args
            .iter()
            .map(|a| a.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ");
        tracing::debug!("{op}: {} {rendered}", self.program.display());

        let mut cmd = Command::new(&self.program);
        cmd.args(&args).stdin(Stdio::inherit());
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }

        let output = match cmd.output() {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!("{op}: failed to spawn {}: {e}", self.program.display());
                return GitOutcome::failed(
                    op,
                    format!("failed to run {}: {e}", self.program.display()),
                );
            }
        };

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            if !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str(&stderr);
        }
        let text = text.trim().to_string();

        if output.status.success() {
            tracing::debug!("{op}: ok");
            GitOutcome::ok(op, text)
        } else {
            tracing::debug!("{op}: exit {:?}: {text}", output.status.code());
            GitOutcome::failed(op, text)
        }
    }
}

fn with_pathspec(mut args: Vec<OsString>, pathspec: Option<&Path>) -> Vec<OsString> {
    if let Some(limit) = pathspec {
        args.push("--".into());
        args.push(limit.as_os_str().to_owned());
    }
    args
}

/// `true` when `ls-remote` output lists exactly `refs/heads/<branch>`.
pub(crate) fn lists_head(output: &str, branch: &str) -> bool {
    let wanted = format!("refs/heads/{branch}");
    output
        .lines()
        .filter_map(|line| line.split_whitespace().nth(1))
        .any(|name| name == wanted)
}

impl VersionControl for GitCli {
    fn origin_url(&self, repo: &Path) -> GitOutcome {
        self.run(
            GitOp::OriginUrl,
            Some(repo),
            ["config", "--get", "remote.origin.url"],
        )
    }

    fn toplevel(&self, dir: &Path) -> GitOutcome {
        self.run(GitOp::Toplevel, Some(dir), ["rev-parse", "--show-toplevel"])
    }

    fn remote_branch(&self, remote: &str, branch: &str) -> BranchPresence {
        let pattern = format!("refs/heads/{branch}");
        let outcome = self.run(
            GitOp::RemoteBranch,
            None,
            ["ls-remote", "--heads", remote, pattern.as_str()],
        );
        if !outcome.success {
            return BranchPresence::QueryFailed {
                output: outcome.output,
            };
        }
        if lists_head(&outcome.output, branch) {
            BranchPresence::Exists
        } else {
            BranchPresence::Absent
        }
    }

    fn clone_branch(&self, remote: &str, branch: &str, dest: &Path) -> GitOutcome {
        let args: Vec<OsString> = vec![
            "clone".into(),
            "--branch".into(),
            branch.into(),
            "--single-branch".into(),
            "--depth".into(),
            "1".into(),
            "--".into(),
            remote.into(),
            dest.as_os_str().to_owned(),
        ];
        self.run(GitOp::CloneBranch, None, args)
    }

    fn init(&self, dir: &Path) -> GitOutcome {
        let args: Vec<OsString> = vec!["init".into(), dir.as_os_str().to_owned()];
        self.run(GitOp::Init, None, args)
    }

    fn add_remote(&self, dir: &Path, name: &str, url: &str) -> GitOutcome {
        self.run(GitOp::AddRemote, Some(dir), ["remote", "add", name, url])
    }

    fn checkout_orphan(&self, dir: &Path, branch: &str) -> GitOutcome {
        self.run(
            GitOp::CheckoutOrphan,
            Some(dir),
            ["checkout", "--orphan", branch],
        )
    }

    fn add_all(&self, dir: &Path, pathspec: Option<&Path>) -> GitOutcome {
        let args = with_pathspec(vec!["add".into(), "-A".into()], pathspec);
        self.run(GitOp::AddAll, Some(dir), args)
    }

    fn status(&self, dir: &Path, pathspec: Option<&Path>) -> GitOutcome {
        let args = with_pathspec(vec!["status".into(), "--porcelain".into()], pathspec);
        self.run(GitOp::Status, Some(dir), args)
    }

    fn commit(
        &self,
        dir: &Path,
        identity: &Identity,
        message: &str,
        pathspec: Option<&Path>,
    ) -> GitOutcome {
        let args = with_pathspec(
            vec![
                "-c".into(),
                format!("user.name={}", identity.name).into(),
                "-c".into(),
                format!("user.email={}", identity.email).into(),
                "commit".into(),
                "-m".into(),
                message.into(),
            ],
            pathspec,
        );
        self.run(GitOp::Commit, Some(dir), args)
    }

    fn push(&self, dir: &Path, remote: &str, refspec: &str, force: bool) -> GitOutcome {
        let mut args = vec!["push"];
        if force {
            args.push("-f");
        }
        args.push(remote);
        args.push(refspec);
        self.run(GitOp::Push, Some(dir), args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_head_matches_exact_ref_only() {
        let output = "abc123\trefs/heads/gh-pages\n";
        assert!(lists_head(output, "gh-pages"));
        assert!(!lists_head("abc123\trefs/heads/old/gh-pages\n", "gh-pages"));
        assert!(!lists_head("", "gh-pages"));
    }

    #[test]
    fn missing_program_reports_failure_instead_of_panicking() {
        let git = GitCli::new("/definitely/not/a/git/binary");
        assert!(!git.check_available());
        let outcome = git.init(Path::new("/tmp/pagesmith-never-created"));
        assert!(!outcome.success);
        assert_eq!(outcome.op, GitOp::Init);
        assert!(outcome.output.contains("failed to run"));
        assert!(matches!(
            git.remote_branch("https://example.invalid/x.git", "gh-pages"),
            BranchPresence::QueryFailed { .. }
        ));
    }

    #[test]
    fn pathspec_is_separated_by_double_dash() {
        let args = with_pathspec(vec!["add".into()], Some(Path::new("docs")));
        assert_eq!(args, vec![OsString::from("add"), "--".into(), "docs".into()]);
        assert_eq!(with_pathspec(vec!["add".into()], None).len(), 1);
    }
}
