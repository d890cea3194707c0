//! `pagesmith config`: show the effective configuration.

use anyhow::{Context, Result};
use clap::Args;

use pagesmith_core::config::to_yaml;

use super::RepoArgs;

/// Arguments for `pagesmith config`.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(flatten)]
    pub repo: RepoArgs,
}

impl ConfigArgs {
    pub fn run(self) -> Result<()> {
        let (_, config) = self.repo.resolve()?;
        let yaml = to_yaml(&config).context("failed to render configuration")?;
        print!("{yaml}");
        Ok(())
    }
}
