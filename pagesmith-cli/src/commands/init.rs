//! `pagesmith init [--repo <path>]`

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use pagesmith_core::config::init_at;
use pagesmith_core::PublishConfig;

/// Write a default `.pagesmith.yaml` at the repository root.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Repository to initialize. Defaults to the one containing the current directory.
    #[arg(long, value_name = "PATH")]
    pub repo: Option<PathBuf>,
}

impl InitArgs {
    pub fn run(self) -> Result<()> {
        let repo = super::RepoArgs {
            repo: self.repo,
            config: None,
        };
        let root = repo.repo_root(&PublishConfig::default().git_program)?;
        let (path, config) = init_at(&root)
            .with_context(|| format!("failed to init '{}'", root.display()))?;

        println!("✓ Configuration at {}", path.display());
        println!(
            "  Mode: {}, remote: {}",
            config.mode,
            config.remote.as_deref().unwrap_or("origin")
        );
        Ok(())
    }
}
