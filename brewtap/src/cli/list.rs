// brewtap/src/cli/list.rs
use brewtap_common::config::Config;
use brewtap_common::error::Result;
use brewtap_common::KegRegistry;
use brewtap_core::install::{human_size, summarize_keg};
use clap::Args;
use colored::Colorize;
use prettytable::{format, Cell, Row, Table};

#[derive(Args, Debug)]
pub struct List;

impl List {
    pub fn run(&self, config: &Config) -> Result<()> {
        let kegs = KegRegistry::new(config.clone()).list_installed_kegs()?;
        if kegs.is_empty() {
            println!("{}", "0 formulas installed".yellow());
            return Ok(());
        }

        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);
        table.add_row(Row::new(vec![
            Cell::new("Name").style_spec("b"),
            Cell::new("Version").style_spec("b"),
            Cell::new("Size").style_spec("b"),
            Cell::new("Installed").style_spec("b"),
        ]));
        for keg in &kegs {
            let (_, bytes) = summarize_keg(&keg.path);
            let installed = keg
                .receipt()
                .ok()
                .flatten()
                .map(|r| r.time)
                .unwrap_or_else(|| "-".to_string());
            table.add_row(Row::new(vec![
                Cell::new(&keg.name).style_spec("Fb"),
                Cell::new(&keg.version_str),
                Cell::new(&human_size(bytes)),
                Cell::new(&installed),
            ]));
        }
        table.printstd();
        println!("{}", format!("{} formula(s) installed", kegs.len()).bold());
        Ok(())
    }
}
