// brewtap/src/cli.rs
//! Defines the command-line argument structure using clap.
use brewtap_common::error::Result;
use brewtap_common::{Config, Formulary, PackageDescriptor};
use clap::{ArgAction, Args, Parser, Subcommand};

pub mod audit;
pub mod fetch;
pub mod info;
pub mod install;
pub mod list;
pub mod uninstall;

use crate::cli::audit::Audit;
use crate::cli::fetch::Fetch;
use crate::cli::info::Info;
use crate::cli::install::InstallArgs;
use crate::cli::list::List;
use crate::cli::test::Test;
use crate::cli::uninstall::Uninstall;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, name = "brewtap", bin_name = "brewtap")]
pub struct CliArgs {
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show a formula resolved for a version
    Info(Info),
    /// Check a formula for publishing problems
    Audit(Audit),
    /// Download and verify a formula's source archive
    Fetch(Fetch),
    /// Build and install a formula from source
    Install(InstallArgs),
    /// Run a formula's test against its installed binary
    Test(Test),
    /// Remove an installed formula
    Uninstall(Uninstall),
    /// List installed formulas
    List(List),
}

impl Command {
    pub async fn run(&self, config: &Config) -> Result<()> {
        match self {
            Self::Info(command) => command.run(config),
            Self::Audit(command) => command.run(config),
            Self::Fetch(command) => command.run(config).await,
            Self::Install(command) => command.run(config).await,
            Self::Test(command) => command.run(config).await,
            Self::Uninstall(command) => command.run(config),
            Self::List(command) => command.run(config),
        }
    }
}

/// Selects a formula and the release to resolve it for.
#[derive(Args, Debug, Clone)]
pub struct FormulaArgs {
    /// Formula name
    pub name: String,

    /// Release tag; defaults to the version the formula is pinned to
    #[arg(long = "version", value_name = "TAG")]
    pub release: Option<String>,

    /// Checksum for a release the formula does not record
    #[arg(long, value_name = "SHA256")]
    pub sha256: Option<String>,
}

impl FormulaArgs {
    pub fn resolve(&self, config: &Config) -> Result<PackageDescriptor> {
        Formulary::new(config).resolve(
            &self.name,
            self.release.as_deref(),
            self.sha256.as_deref(),
            config,
        )
    }
}
