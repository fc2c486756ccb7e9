// brewtap/src/cli/install.rs
use brewtap_common::config::Config;
use brewtap_common::error::Result;
use brewtap_core::{assert_verified, HttpFetcher, Installer, SystemRunner};
use clap::Args;
use colored::Colorize;
use tracing::instrument;

use crate::cli::FormulaArgs;

#[derive(Debug, Args)]
pub struct InstallArgs {
    #[command(flatten)]
    pub formula: FormulaArgs,

    /// Run the formula's test after installing
    #[arg(long)]
    pub test: bool,
}

impl InstallArgs {
    #[instrument(skip(self, config), fields(formula = %self.formula.name))]
    pub async fn run(&self, config: &Config) -> Result<()> {
        let descriptor = self.formula.resolve(config)?;
        println!(
            "{}{} {}",
            "==> ".bold().blue(),
            "Installing".bold(),
            format!("{} {}", descriptor.name, descriptor.version).green()
        );

        let installer = Installer::new(config.clone(), HttpFetcher, SystemRunner);
        let artifact = installer.install(&descriptor).await?;
        let (files, bytes) = brewtap_core::install::summarize_keg(&artifact.keg_path);
        println!(
            "{}  {}: {} files, {}",
            "🍺".bold(),
            artifact.keg_path.display(),
            files,
            brewtap_core::install::human_size(bytes)
        );

        if self.test {
            println!("{}{}", "==> ".bold().blue(), "Testing".bold());
            assert_verified(&descriptor, &artifact, installer.runner()).await?;
            println!("{} {}", descriptor.test.expect, "✔".green());
        }
        Ok(())
    }
}
