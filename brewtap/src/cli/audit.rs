// brewtap/src/cli/audit.rs
use brewtap_common::config::Config;
use brewtap_common::error::{BrewtapError, Result};
use clap::Args;
use colored::Colorize;

use crate::cli::FormulaArgs;

#[derive(Args, Debug)]
pub struct Audit {
    #[command(flatten)]
    pub formula: FormulaArgs,
}

impl Audit {
    pub fn run(&self, config: &Config) -> Result<()> {
        let descriptor = self.formula.resolve(config)?;
        let problems = descriptor.audit();
        if problems.is_empty() {
            println!("{} {} {}", "==>".bold().blue(), descriptor.name, "passes audit".green());
            return Ok(());
        }
        println!("{}:", descriptor.name.bold());
        for problem in &problems {
            println!("  * {problem}");
        }
        Err(BrewtapError::ValidationError(format!(
            "{} problem(s) in {}",
            problems.len(),
            descriptor.name
        )))
    }
}
