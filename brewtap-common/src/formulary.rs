use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

use tracing::debug;

use super::config::Config;
use super::error::{BrewtapError, Result};
use super::model::formula::{FormulaTemplate, PackageDescriptor};

/// Formulas shipped inside the binary, taken from the tap's `Formula/` directory.
const EMBEDDED_FORMULAS: &[(&str, &str)] =
    &[("merlion", include_str!("../../Formula/merlion.toml"))];

pub struct Formulary {
    formula_dir: Option<PathBuf>,
}

impl Formulary {
    pub fn new(config: &Config) -> Self {
        Self {
            formula_dir: config.formula_dir.clone(),
        }
    }

    /// Loads from the configured formula directory first, then from the embedded tap.
    pub fn load_formula(&self, name: &str) -> Result<FormulaTemplate> {
        if let Some(dir) = &self.formula_dir {
            let path = dir.join(format!("{name}.toml"));
            if path.is_file() {
                debug!("Loading formula '{}' from {}", name, path.display());
                let source = fs::read_to_string(&path)?;
                return FormulaTemplate::from_toml_str(&source).map_err(|e| {
                    BrewtapError::ParseError("formula file", format!("{}: {e}", path.display()))
                });
            }
            debug!(
                "Formula '{}' not found in {}, trying embedded formulas.",
                name,
                dir.display()
            );
        }

        match EMBEDDED_FORMULAS.iter().find(|(n, _)| *n == name) {
            Some((_, source)) => {
                debug!("Loading embedded formula '{}'", name);
                FormulaTemplate::from_toml_str(source)
            }
            None => Err(BrewtapError::NotFound(format!(
                "No formula named '{name}' in this tap"
            ))),
        }
    }

    /// Loads `name` and resolves it for `version`, or for its pinned version when `None`.
    pub fn resolve(
        &self,
        name: &str,
        version: Option<&str>,
        sha256: Option<&str>,
        config: &Config,
    ) -> Result<PackageDescriptor> {
        let template = self.load_formula(name)?;
        let version = version.unwrap_or(&template.version);
        match sha256 {
            Some(sum) => template.resolve_with_checksum(version, config.maintainer_identity(), sum),
            None => template.resolve(version, config.maintainer_identity()),
        }
    }

    pub fn names(&self) -> Result<Vec<String>> {
        let mut names: BTreeSet<String> = EMBEDDED_FORMULAS
            .iter()
            .map(|(n, _)| n.to_string())
            .collect();
        if let Some(dir) = &self.formula_dir {
            if dir.is_dir() {
                for entry in fs::read_dir(dir)?.flatten() {
                    let path = entry.path();
                    if path.extension().is_some_and(|ext| ext == "toml") {
                        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                            names.insert(stem.to_string());
                        }
                    }
                }
            }
        }
        Ok(names.into_iter().collect())
    }
}
