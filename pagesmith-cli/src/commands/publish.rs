//! `pagesmith publish`: mirror, commit and push the built site.

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use pagesmith_core::{ModeKind, PublishConfig, RemoteSource};
use pagesmith_git::GitCli;
use pagesmith_sync::{
    AreaOrigin, ArtifactSet, PublishEvent, PublishOutcome, PublishReport, Publisher, Teardown,
};

use super::RepoArgs;

/// Arguments for `pagesmith publish`.
#[derive(Args, Debug)]
pub struct PublishArgs {
    /// Built artifact directory.
    #[arg(default_value = "dist")]
    pub source: PathBuf,

    /// Publish target: branch | directory.
    #[arg(long, value_name = "MODE")]
    pub mode: Option<ModeArg>,

    /// Publish branch (branch mode).
    #[arg(long, value_name = "NAME")]
    pub branch: Option<String>,

    /// Publish directory relative to the repository root (directory mode).
    #[arg(long = "dir", value_name = "PATH")]
    pub directory: Option<PathBuf>,

    /// Remote to publish to. Defaults to the repository's origin.
    #[arg(long, env = "PAGESMITH_REMOTE", value_name = "URL")]
    pub remote: Option<String>,

    /// Commit message.
    #[arg(long, short = 'm')]
    pub message: Option<String>,

    #[command(flatten)]
    pub repo: RepoArgs,
}

/// Thin wrapper so clap can parse `ModeKind` from CLI args.
#[derive(Debug, Clone, Copy)]
pub struct ModeArg(pub ModeKind);

impl FromStr for ModeArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "branch" => Ok(Self(ModeKind::Branch)),
            "directory" | "dir" => Ok(Self(ModeKind::Directory)),
            other => Err(format!(
                "unknown mode '{other}'; expected: branch, directory"
            )),
        }
    }
}

impl PublishArgs {
    pub fn run(self) -> Result<()> {
        // Source preconditions come before any git process is spawned.
        ArtifactSet::scan(&self.source)
            .with_context(|| format!("cannot publish '{}'", self.source.display()))?;

        let (repo_root, mut config) = self.repo.resolve()?;
        self.apply_overrides(&mut config);
        config.validate().context("invalid publish settings")?;

        let git = GitCli::new(&config.git_program);
        if !git.check_available() {
            bail!(
                "git executable '{}' not found; install git or set git_program",
                config.git_program.display()
            );
        }

        let teardown = Teardown::new();
        install_interrupt_handler(teardown.clone())?;

        let mut publisher = Publisher::new(&config, &git, &repo_root).with_teardown(teardown);
        let report = publisher
            .run(&self.source, &mut render)
            .with_context(|| format!("publish of '{}' failed", self.source.display()))?;
        print_summary(&report);
        Ok(())
    }

    fn apply_overrides(&self, config: &mut PublishConfig) {
        if let Some(mode) = self.mode {
            config.mode = mode.0;
        }
        if let Some(branch) = &self.branch {
            config.branch = branch.clone();
        }
        if let Some(dir) = &self.directory {
            config.directory = dir.clone();
        }
        if let Some(remote) = &self.remote {
            config.remote = Some(remote.clone());
        }
        if let Some(message) = &self.message {
            config.commit_message = message.clone();
        }
    }
}

/// First Ctrl-C asks the run to stop; it unwinds and removes its working
/// area itself. A second one purges the area from here and exits.
fn install_interrupt_handler(teardown: Teardown) -> Result<()> {
    ctrlc::set_handler(move || {
        if teardown.interrupt() {
            eprintln!(
                "{} stopping; press Ctrl-C again to force",
                "[interrupted]".yellow().bold()
            );
            return;
        }
        match teardown.purge() {
            Ok(Some(path)) => eprintln!(
                "{} removed working area {}",
                "[interrupted]".yellow().bold(),
                path.display()
            ),
            Ok(None) => {}
            Err(e) => eprintln!("{} {e}", "[interrupted]".red().bold()),
        }
        std::process::exit(1);
    })
    .context("failed to install interrupt handler")
}

// ---------------------------------------------------------------------------
// Console output
// ---------------------------------------------------------------------------

fn render(event: PublishEvent) {
    match event {
        PublishEvent::Transition { from, to } => {
            tracing::debug!("{from} -> {to}");
        }
        PublishEvent::SourceScanned { root, files, bytes } => {
            println!(
                "{} {} files ({bytes} bytes) in {}",
                "[info]".blue().bold(),
                files,
                root.display()
            );
        }
        PublishEvent::TargetResolved {
            remote,
            source,
            mode,
        } => {
            let from = match source {
                RemoteSource::Explicit => "configured",
                RemoteSource::Origin => "origin",
                RemoteSource::Fallback => "default",
            };
            println!(
                "{} {mode} mode, remote {remote} ({from})",
                "[info]".blue().bold()
            );
        }
        PublishEvent::AreaReady { path, origin } => {
            let how = match &origin {
                AreaOrigin::Cloned => "cloned existing branch",
                AreaOrigin::Orphan { .. } => "new orphan branch",
                AreaOrigin::Permanent => "publish directory",
            };
            println!("{} {how} at {}", "[git]".yellow().bold(), path.display());
            if let AreaOrigin::Orphan {
                query_failure: Some(output),
            } = origin
            {
                println!(
                    "{} branch query failed, treated as absent: {output}",
                    "[warn]".yellow().bold()
                );
            }
        }
        PublishEvent::Mirrored(report) => {
            println!(
                "{} copied {} files, removed {} stale entries",
                "[info]".blue().bold(),
                report.copied_files,
                report.removed
            );
        }
        PublishEvent::NothingToCommit => {
            println!("{} no changes to publish", "[info]".blue().bold());
        }
        PublishEvent::Committed { message } => {
            println!("{} committed: {message}", "[git]".yellow().bold());
        }
        PublishEvent::Pushed { refspec, force } => {
            let how = if force { "force-pushed" } else { "pushed" };
            println!("{} {how} {refspec}", "[git]".yellow().bold());
        }
        PublishEvent::Released { path, removed } => {
            if removed {
                println!(
                    "{} removed working area {}",
                    "[info]".blue().bold(),
                    path.display()
                );
            }
        }
        PublishEvent::Failed { from, .. } => {
            eprintln!("{} stopped in state {from}", "[fail]".red().bold());
        }
    }
}

fn print_summary(report: &PublishReport) {
    match report.outcome {
        PublishOutcome::Published => {
            println!("{} published to {}", "✓".green().bold(), report.target.remote);
        }
        PublishOutcome::Unchanged => {
            println!(
                "{} {} already up to date",
                "✓".green().bold(),
                report.target.remote
            );
        }
    }
    if let Some(url) = &report.site_url {
        println!("  Site: {url}");
    }
}
