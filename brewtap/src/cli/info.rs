// brewtap/src/cli/info.rs
use brewtap_common::config::Config;
use brewtap_common::error::Result;
use brewtap_common::model::PackageDescriptor;
use brewtap_common::KegRegistry;
use clap::Args;
use colored::Colorize;

use crate::cli::FormulaArgs;

#[derive(Args, Debug)]
pub struct Info {
    #[command(flatten)]
    pub formula: FormulaArgs,

    /// Print the resolved formula as JSON
    #[arg(long)]
    pub json: bool,
}

impl Info {
    pub fn run(&self, config: &Config) -> Result<()> {
        let descriptor = self.formula.resolve(config)?;
        if self.json {
            println!("{}", serde_json::to_string_pretty(&descriptor)?);
            return Ok(());
        }
        print_descriptor(&descriptor);

        let registry = KegRegistry::new(config.clone());
        let kegs = registry.installed_kegs_of(&descriptor.name)?;
        if kegs.is_empty() {
            println!("Not installed");
        } else {
            for keg in kegs {
                println!("{} ({})", keg.path.display(), keg.version_str);
            }
        }
        Ok(())
    }
}

fn print_descriptor(d: &PackageDescriptor) {
    println!("{}: stable {}", d.name.bold().green(), d.version);
    println!("{}", d.desc);
    println!("{}", d.homepage.underline());
    println!("{} {}", "License:".bold(), d.license);
    println!("{} {}", "From:".bold(), d.url);
    println!("{} {}", "SHA256:".bold(), d.sha256);

    let build: Vec<&str> = d
        .build_dependencies()
        .iter()
        .map(|dep| dep.name.as_str())
        .collect();
    let runtime: Vec<&str> = d
        .runtime_dependencies()
        .iter()
        .map(|dep| dep.name.as_str())
        .collect();
    println!("{}", "==> Dependencies".bold().blue());
    if !build.is_empty() {
        println!("Build: {}", build.join(", "));
    }
    if !runtime.is_empty() {
        println!("Required: {}", runtime.join(", "));
    }

    println!("{}", "==> Build".bold().blue());
    println!(
        "{} build -trimpath -ldflags=\"{}\" {}",
        d.install.tool,
        d.ldflags_arg(),
        d.install.package
    );
    println!("{}", "==> Test".bold().blue());
    println!(
        "{} {} => expects \"{}\"",
        d.name,
        d.test.args.join(" "),
        d.test.expect
    );
}
