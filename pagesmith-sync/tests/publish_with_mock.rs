use std::fs;
use std::path::{Path, PathBuf};

use pagesmith_core::{ModeKind, PublishConfig, RemoteSource};
use pagesmith_git::{mock::MockGit, BranchPresence, GitOp};
use pagesmith_sync::{
    PublishError, PublishEvent, PublishOutcome, PublishState, Publisher, Teardown,
};
use rstest::rstest;
use tempfile::TempDir;

fn write_site(root: &Path, files: &[(&str, &str)]) -> PathBuf {
    for (rel, content) in files {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(path, content).expect("write artifact");
    }
    root.to_path_buf()
}

fn branch_config(temp_root: &Path) -> PublishConfig {
    PublishConfig {
        temp_root: Some(temp_root.to_path_buf()),
        ..PublishConfig::default()
    }
}

fn leftovers(temp_root: &Path) -> Vec<PathBuf> {
    fs::read_dir(temp_root)
        .expect("read temp root")
        .map(|e| e.expect("entry").path())
        .collect()
}

fn keys(git: &MockGit) -> Vec<String> {
    git.remote_tree().keys().cloned().collect()
}

#[test]
fn first_publish_bootstraps_orphan_branch() {
    let work = TempDir::new().expect("work");
    let temp = TempDir::new().expect("temp");
    let dist = write_site(
        &work.path().join("dist"),
        &[("index.html", "hi"), ("assets/a.css", "body{}")],
    );
    let git = MockGit::new().with_presence(BranchPresence::Absent);
    let config = branch_config(temp.path());

    let mut events = Vec::new();
    let mut publisher = Publisher::new(&config, &git, work.path());
    let report = publisher
        .run(&dist, &mut |e| events.push(e))
        .expect("publish");

    assert_eq!(report.outcome, PublishOutcome::Published);
    assert_eq!(report.mirror.copied_files, 2);
    assert_eq!(report.target.remote_source, RemoteSource::Fallback);
    assert_eq!(
        git.ops(),
        vec![
            GitOp::OriginUrl,
            GitOp::RemoteBranch,
            GitOp::Init,
            GitOp::AddRemote,
            GitOp::CheckoutOrphan,
            GitOp::Status,
            GitOp::AddAll,
            GitOp::Commit,
            GitOp::Push,
        ]
    );
    assert_eq!(keys(&git), vec![".nojekyll", "assets/a.css", "index.html"]);
    assert!(git.remote_tree()[".nojekyll"].is_empty());

    let push = git.calls().pop().expect("push call");
    assert_eq!(push.args[1], "origin");
    assert_eq!(push.args[2], "gh-pages");
    assert_eq!(push.args[3], "-f");
    let commit = git
        .calls()
        .into_iter()
        .find(|c| c.op == GitOp::Commit)
        .expect("commit call");
    assert_eq!(commit.args[1], "GitHub Pages Bot <bot@example.com>");
    assert_eq!(commit.args[2], "Update GitHub Pages site content");

    assert!(leftovers(temp.path()).is_empty(), "working area must be removed");
    assert_eq!(
        publisher.history(),
        &[
            PublishState::Idle,
            PublishState::SourceVerified,
            PublishState::AreaPrepared,
            PublishState::Synced,
            PublishState::Committed,
            PublishState::Pushed,
            PublishState::Done,
        ]
    );
    assert!(events
        .iter()
        .any(|e| matches!(e, PublishEvent::Released { removed: true, .. })));
    assert_eq!(
        report.site_url.as_deref(),
        Some("https://cyberspacesec.github.io/go-iconhash/")
    );
}

#[test]
fn missing_source_invokes_no_git() {
    let work = TempDir::new().expect("work");
    let temp = TempDir::new().expect("temp");
    let git = MockGit::new();
    let config = branch_config(temp.path());

    let mut publisher = Publisher::new(&config, &git, work.path());
    let err = publisher
        .run(&work.path().join("dist"), &mut |_| {})
        .expect_err("missing source");

    assert!(matches!(err, PublishError::SourceMissing { .. }));
    assert!(git.calls().is_empty());
    assert_eq!(publisher.state(), PublishState::Failed);
    assert!(leftovers(temp.path()).is_empty());
}

#[test]
fn query_failure_takes_orphan_path() {
    let work = TempDir::new().expect("work");
    let temp = TempDir::new().expect("temp");
    let dist = write_site(&work.path().join("dist"), &[("index.html", "hi")]);
    let git = MockGit::new().with_presence(BranchPresence::QueryFailed {
        output: "fatal: could not read Username".to_string(),
    });
    let config = branch_config(temp.path());

    let mut events = Vec::new();
    Publisher::new(&config, &git, work.path())
        .run(&dist, &mut |e| events.push(e))
        .expect("publish");

    assert!(!git.called(GitOp::CloneBranch));
    assert!(git.called(GitOp::CheckoutOrphan));
    assert!(events.iter().any(|e| matches!(
        e,
        PublishEvent::AreaReady {
            origin: pagesmith_sync::AreaOrigin::Orphan {
                query_failure: Some(_)
            },
            ..
        }
    )));
}

#[test]
fn republishing_same_artifacts_is_unchanged() {
    let work = TempDir::new().expect("work");
    let temp = TempDir::new().expect("temp");
    let dist = write_site(&work.path().join("dist"), &[("index.html", "hi")]);
    let git = MockGit::new();
    let config = branch_config(temp.path());

    let first = Publisher::new(&config, &git, work.path())
        .run(&dist, &mut |_| {})
        .expect("first publish");
    assert_eq!(first.outcome, PublishOutcome::Published);
    let tree_after_first = git.remote_tree();
    let calls_after_first = git.calls().len();

    let mut publisher = Publisher::new(&config, &git, work.path());
    let second = publisher.run(&dist, &mut |_| {}).expect("second publish");

    assert_eq!(second.outcome, PublishOutcome::Unchanged);
    assert_eq!(git.remote_tree(), tree_after_first);
    let second_ops: Vec<_> = git.ops().split_off(calls_after_first);
    assert!(second_ops.contains(&GitOp::CloneBranch));
    assert!(!second_ops.contains(&GitOp::Commit));
    assert!(!second_ops.contains(&GitOp::Push));
    assert_eq!(publisher.state(), PublishState::Done);
    assert!(!publisher.history().contains(&PublishState::Committed));
    assert!(leftovers(temp.path()).is_empty());
}

#[test]
fn stale_remote_files_are_removed() {
    let work = TempDir::new().expect("work");
    let temp = TempDir::new().expect("temp");
    let dist = write_site(&work.path().join("dist"), &[("index.html", "new")]);
    let git = MockGit::new()
        .with_remote_file("index.html", b"old")
        .with_remote_file("old/page.html", b"stale");
    let config = branch_config(temp.path());

    let report = Publisher::new(&config, &git, work.path())
        .run(&dist, &mut |_| {})
        .expect("publish");

    assert_eq!(report.mirror.removed, 2);
    assert_eq!(keys(&git), vec![".nojekyll", "index.html"]);
    assert_eq!(git.remote_tree()["index.html"], b"new".to_vec());
}

#[rstest]
#[case::during_clone(GitOp::CloneBranch)]
#[case::during_status(GitOp::Status)]
#[case::during_commit(GitOp::Commit)]
fn interrupt_mid_run_removes_working_area(#[case] op: GitOp) {
    let work = TempDir::new().expect("work");
    let temp = TempDir::new().expect("temp");
    let dist = write_site(&work.path().join("dist"), &[("index.html", "hi")]);
    let teardown = Teardown::new();
    let handle = teardown.clone();
    let git = MockGit::new()
        .with_remote_file("index.html", b"old")
        .on(op, move || {
            handle.interrupt();
        });
    let config = branch_config(temp.path());

    let mut publisher = Publisher::new(&config, &git, work.path()).with_teardown(teardown);
    let err = publisher.run(&dist, &mut |_| {}).expect_err("interrupted");

    assert!(matches!(err, PublishError::Interrupted), "got: {err}");
    assert_eq!(publisher.state(), PublishState::Failed);
    assert!(!git.called(GitOp::Push), "push after interrupt");
    assert!(leftovers(temp.path()).is_empty(), "working area left behind");
    assert_eq!(git.remote_tree()["index.html"], b"old".to_vec());
}

#[test]
fn push_failure_still_releases_area() {
    let work = TempDir::new().expect("work");
    let temp = TempDir::new().expect("temp");
    let dist = write_site(&work.path().join("dist"), &[("index.html", "hi")]);
    let git = MockGit::new().fail_on(GitOp::Push);
    let config = branch_config(temp.path());

    let mut events = Vec::new();
    let mut publisher = Publisher::new(&config, &git, work.path());
    let err = publisher
        .run(&dist, &mut |e| events.push(e))
        .expect_err("push fails");

    assert!(matches!(err, PublishError::Git { op: GitOp::Push, .. }));
    assert!(leftovers(temp.path()).is_empty());
    assert_eq!(
        publisher.history().last().copied(),
        Some(PublishState::Failed)
    );
    assert!(events.iter().any(|e| matches!(
        e,
        PublishEvent::Failed {
            from: PublishState::Committed,
            ..
        }
    )));
    assert!(git.remote_tree().is_empty());
}

#[test]
fn directory_mode_publishes_into_repository() {
    let repo = TempDir::new().expect("repo");
    let dist = write_site(
        &repo.path().join("dist"),
        &[("index.html", "hi"), ("assets/a.css", "body{}")],
    );
    fs::create_dir_all(repo.path().join("docs")).expect("docs");
    fs::write(repo.path().join("docs/stale.html"), "old").expect("stale");
    let git = MockGit::new().with_origin("git@example.com:me/site.git");
    let config = PublishConfig {
        mode: ModeKind::Directory,
        ..PublishConfig::default()
    };

    let mut events = Vec::new();
    let report = Publisher::new(&config, &git, repo.path())
        .run(&dist, &mut |e| events.push(e))
        .expect("publish");

    assert_eq!(report.outcome, PublishOutcome::Published);
    let docs = repo.path().join("docs");
    assert!(docs.join("index.html").is_file());
    assert!(docs.join(".nojekyll").is_file());
    assert!(!docs.join("stale.html").exists());
    assert!(
        !git.called(GitOp::RemoteBranch) && !git.called(GitOp::Init),
        "directory mode runs no branch operations"
    );

    let push = git.calls().pop().expect("push");
    assert_eq!(push.args[1], "git@example.com:me/site.git");
    assert_eq!(push.args[2], "HEAD");
    assert_eq!(push.args[3], "", "directory mode never force-pushes");
    let add = git
        .calls()
        .into_iter()
        .find(|c| c.op == GitOp::AddAll)
        .expect("add");
    assert_eq!(PathBuf::from(&add.args[1]), docs);
    assert!(events
        .iter()
        .any(|e| matches!(e, PublishEvent::Released { removed: false, .. })));

    let again = Publisher::new(&config, &git, repo.path())
        .run(&dist, &mut |_| {})
        .expect("republish");
    assert_eq!(again.outcome, PublishOutcome::Unchanged);
}

#[test]
fn directory_mode_refuses_overlapping_source() {
    let repo = TempDir::new().expect("repo");
    let docs = write_site(&repo.path().join("docs"), &[("index.html", "hi")]);
    let git = MockGit::new();
    let config = PublishConfig {
        mode: ModeKind::Directory,
        ..PublishConfig::default()
    };

    let err = Publisher::new(&config, &git, repo.path())
        .run(&docs, &mut |_| {})
        .expect_err("overlap");

    assert!(matches!(err, PublishError::SourceOverlapsTarget { .. }));
    assert!(err.is_precondition());
    assert!(docs.join("index.html").is_file(), "artifacts must survive");
    assert!(!git.called(GitOp::Status));
}
