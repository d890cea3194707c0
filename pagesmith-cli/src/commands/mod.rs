//! Subcommands and the options they share.

pub mod config;
pub mod init;
pub mod publish;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;

use pagesmith_core::{config as settings, PublishConfig};
use pagesmith_git::GitCli;
use pagesmith_sync::resolve_repo_root;

/// Where to find the repository and its configuration.
#[derive(Args, Debug, Clone, Default)]
pub struct RepoArgs {
    /// Repository to work in. Defaults to the one containing the current directory.
    #[arg(long, value_name = "PATH")]
    pub repo: Option<PathBuf>,

    /// Configuration file. Defaults to <repo>/.pagesmith.yaml when present.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl RepoArgs {
    /// Top-level directory of the repository, or the start directory itself
    /// when it is not inside one. Discovery runs `git_program`.
    pub fn repo_root(&self, git_program: &Path) -> Result<PathBuf> {
        let start = match &self.repo {
            Some(path) => path.clone(),
            None => std::env::current_dir().context("cannot determine current directory")?,
        };
        if !start.is_dir() {
            bail!("repository path '{}' is not a directory", start.display());
        }
        let root = resolve_repo_root(&GitCli::new(git_program), &start);
        tracing::debug!("repository root: {}", root.display());
        Ok(root)
    }

    /// Repository root and effective configuration.
    ///
    /// An explicit `--config` is read first so its `git_program` also finds
    /// the root. Otherwise discovery uses the default program and the file
    /// is looked up at the root it found.
    pub fn resolve(&self) -> Result<(PathBuf, PublishConfig)> {
        match &self.config {
            Some(path) => {
                let config = load_explicit(path)?;
                let root = self.repo_root(&config.git_program)?;
                Ok((root, config))
            }
            None => {
                let root = self.repo_root(&PublishConfig::default().git_program)?;
                let config = settings::load_at(&root).with_context(|| {
                    format!("failed to load {}", settings::config_path_at(&root).display())
                })?;
                Ok((root, config))
            }
        }
    }
}

fn load_explicit(path: &Path) -> Result<PublishConfig> {
    settings::load_file(path)
        .with_context(|| format!("failed to load config '{}'", path.display()))
}
