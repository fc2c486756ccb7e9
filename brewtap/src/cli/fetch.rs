// brewtap/src/cli/fetch.rs
use brewtap_common::config::Config;
use brewtap_common::error::Result;
use clap::Args;
use colored::Colorize;
use tracing::instrument;

use crate::cli::FormulaArgs;

#[derive(Args, Debug)]
pub struct Fetch {
    #[command(flatten)]
    pub formula: FormulaArgs,
}

impl Fetch {
    #[instrument(skip(self, config), fields(formula = %self.formula.name))]
    pub async fn run(&self, config: &Config) -> Result<()> {
        let descriptor = self.formula.resolve(config)?;
        println!(
            "{}{} {}",
            "==> ".bold().blue(),
            "Fetching".bold(),
            descriptor.url
        );
        let path = brewtap_net::fetch_source(&descriptor, config).await?;
        println!("Downloaded to: {}", path.display());
        println!("SHA256: {}", descriptor.sha256);
        Ok(())
    }
}
