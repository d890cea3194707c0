//! End-to-end runs against the real `git` executable and a local bare
//! repository. Skipped when `git` is not on PATH.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use pagesmith_core::{ModeKind, PublishConfig};
use pagesmith_git::GitCli;
use pagesmith_sync::{PublishOutcome, Publisher};
use tempfile::TempDir;

fn git_available() -> bool {
    let available = GitCli::default().check_available();
    if !available {
        eprintln!("git not found on PATH; skipping");
    }
    available
}

fn git(cwd: &Path, args: &[&str]) -> String {
    let out = Command::new("git")
        .current_dir(cwd)
        .args(args)
        .output()
        .expect("spawn git");
    assert!(
        out.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn bare_remote(root: &Path) -> PathBuf {
    let remote = root.join("remote.git");
    fs::create_dir_all(&remote).expect("remote dir");
    git(&remote, &["init", "--bare", "--quiet"]);
    remote
}

fn site(root: &Path) -> PathBuf {
    let dist = root.join("dist");
    fs::create_dir_all(dist.join("assets")).expect("dist");
    fs::write(dist.join("index.html"), "hi").expect("index");
    fs::write(dist.join("assets/a.css"), "body{}").expect("css");
    dist
}

fn tracked(remote: &Path, rev: &str) -> Vec<String> {
    git(remote, &["ls-tree", "-r", "--name-only", rev])
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn branch_mode_creates_then_updates_publish_branch() {
    if !git_available() {
        return;
    }
    let tmp = TempDir::new().expect("tmp");
    let remote = bare_remote(tmp.path());
    let dist = site(tmp.path());
    let temp_root = tmp.path().join("scratch");
    let config = PublishConfig {
        remote: Some(remote.to_string_lossy().into_owned()),
        temp_root: Some(temp_root.clone()),
        ..PublishConfig::default()
    };
    let cli = GitCli::default();

    let first = Publisher::new(&config, &cli, tmp.path())
        .run(&dist, &mut |_| {})
        .expect("first publish");
    assert_eq!(first.outcome, PublishOutcome::Published);
    assert_eq!(
        tracked(&remote, "gh-pages"),
        vec![".nojekyll", "assets/a.css", "index.html"]
    );
    let author = git(&remote, &["log", "-1", "--format=%an <%ae>|%s", "gh-pages"]);
    assert_eq!(
        author.trim(),
        "GitHub Pages Bot <bot@example.com>|Update GitHub Pages site content"
    );

    let again = Publisher::new(&config, &cli, tmp.path())
        .run(&dist, &mut |_| {})
        .expect("republish");
    assert_eq!(again.outcome, PublishOutcome::Unchanged);
    assert_eq!(git(&remote, &["rev-list", "--count", "gh-pages"]).trim(), "1");

    fs::remove_file(dist.join("assets/a.css")).expect("remove css");
    fs::remove_dir(dist.join("assets")).expect("remove assets");
    fs::write(dist.join("about.html"), "about").expect("about");
    let third = Publisher::new(&config, &cli, tmp.path())
        .run(&dist, &mut |_| {})
        .expect("update");
    assert_eq!(third.outcome, PublishOutcome::Published);
    assert_eq!(
        tracked(&remote, "gh-pages"),
        vec![".nojekyll", "about.html", "index.html"]
    );

    let leftovers: Vec<_> = fs::read_dir(&temp_root).expect("scratch").collect();
    assert!(leftovers.is_empty(), "working areas must be removed");
}

#[test]
fn directory_mode_commits_and_pushes_docs() {
    if !git_available() {
        return;
    }
    let tmp = TempDir::new().expect("tmp");
    let remote = bare_remote(tmp.path());
    let repo = tmp.path().join("work");
    fs::create_dir_all(&repo).expect("work");
    git(&repo, &["init", "--quiet"]);
    let dist = site(tmp.path());
    let config = PublishConfig {
        remote: Some(remote.to_string_lossy().into_owned()),
        mode: ModeKind::Directory,
        ..PublishConfig::default()
    };
    let cli = GitCli::default();

    let report = Publisher::new(&config, &cli, &repo)
        .run(&dist, &mut |_| {})
        .expect("publish");
    assert_eq!(report.outcome, PublishOutcome::Published);

    let branch = git(&repo, &["rev-parse", "--abbrev-ref", "HEAD"]);
    assert_eq!(
        tracked(&remote, branch.trim()),
        vec!["docs/.nojekyll", "docs/assets/a.css", "docs/index.html"]
    );

    let again = Publisher::new(&config, &cli, &repo)
        .run(&dist, &mut |_| {})
        .expect("republish");
    assert_eq!(again.outcome, PublishOutcome::Unchanged);
}
