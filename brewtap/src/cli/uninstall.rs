// brewtap/src/cli/uninstall.rs
use brewtap_common::config::Config;
use brewtap_common::error::Result;
use brewtap_common::KegRegistry;
use brewtap_core::uninstall_keg;
use clap::Args;
use colored::Colorize;

#[derive(Args, Debug)]
pub struct Uninstall {
    /// Formula name
    pub name: String,

    /// Remove every installed version, not just the latest
    #[arg(long)]
    pub all: bool,
}

impl Uninstall {
    pub fn run(&self, config: &Config) -> Result<()> {
        let registry = KegRegistry::new(config.clone());
        let kegs = if self.all {
            registry.installed_kegs_of(&self.name)?
        } else {
            vec![registry.require_installed_keg(&self.name)?]
        };
        if kegs.is_empty() {
            println!("{}", format!("{} is not installed", self.name).yellow());
            return Ok(());
        }
        for keg in kegs {
            let (files, _) = brewtap_core::install::summarize_keg(&keg.path);
            uninstall_keg(&keg, config)?;
            println!(
                "Uninstalling {}... ({} files)",
                keg.path.display(),
                files
            );
        }
        Ok(())
    }
}
