// brewtap-common/src/keg.rs
use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::config::Config;
use super::error::{BrewtapError, Result};

pub const RECEIPT_FILENAME: &str = "INSTALL_RECEIPT.json";

/// An installed version of a formula in the Cellar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledKeg {
    pub name: String,
    pub version_str: String,
    pub path: PathBuf,
}

impl InstalledKeg {
    pub fn binary_path(&self) -> PathBuf {
        self.path.join("bin").join(&self.name)
    }

    pub fn receipt(&self) -> Result<Option<InstallReceipt>> {
        InstallReceipt::read(&self.path)
    }

    pub fn artifact(&self) -> InstalledArtifact {
        InstalledArtifact {
            name: self.name.clone(),
            version: self.version_str.clone(),
            keg_path: self.path.clone(),
            binary_path: self.binary_path(),
        }
    }
}

/// What a successful install leaves behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledArtifact {
    pub name: String,
    pub version: String,
    pub keg_path: PathBuf,
    pub binary_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptSource {
    pub url: String,
    pub sha256: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptPlatform {
    pub os: String,
    pub arch: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallReceipt {
    pub name: String,
    pub version: String,
    /// RFC 3339 timestamp.
    pub time: String,
    pub source: ReceiptSource,
    pub built_on: ReceiptPlatform,
    #[serde(default)]
    pub ldflags: Vec<String>,
}

impl InstallReceipt {
    pub fn read(keg_path: &Path) -> Result<Option<Self>> {
        let path = keg_path.join(RECEIPT_FILENAME);
        if !path.is_file() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&raw)?))
    }

    pub fn write(&self, keg_path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(keg_path.join(RECEIPT_FILENAME), json)?;
        Ok(())
    }
}

/// Queries installed formulas in the Cellar.
#[derive(Debug)]
pub struct KegRegistry {
    config: Config,
}

impl KegRegistry {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn installed_kegs_of(&self, name: &str) -> Result<Vec<InstalledKeg>> {
        let formula_dir = self.config.formula_cellar_dir(name);
        if !formula_dir.is_dir() {
            debug!(
                "[KEG_REGISTRY:{}] {} not found, nothing installed.",
                name,
                formula_dir.display()
            );
            return Ok(Vec::new());
        }

        let mut kegs = Vec::new();
        for entry in fs::read_dir(&formula_dir)? {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!(
                        "[KEG_REGISTRY:{}] Failed to read entry in {}: {}",
                        name,
                        formula_dir.display(),
                        e
                    );
                    continue;
                }
            };
            let path = entry.path();
            let Some(version_str) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            // Staging kegs are never reported as installed.
            if version_str.starts_with('.') || !path.is_dir() {
                continue;
            }
            kegs.push(InstalledKeg {
                name: name.to_string(),
                version_str: version_str.to_string(),
                path: path.clone(),
            });
        }
        kegs.sort_by(|a, b| compare_versions(&a.version_str, &b.version_str));
        Ok(kegs)
    }

    /// The greatest installed version, see [`compare_versions`].
    pub fn get_installed_keg(&self, name: &str) -> Result<Option<InstalledKeg>> {
        Ok(self.installed_kegs_of(name)?.pop())
    }

    pub fn require_installed_keg(&self, name: &str) -> Result<InstalledKeg> {
        self.get_installed_keg(name)?
            .ok_or_else(|| BrewtapError::NotFound(format!("{name} is not installed")))
    }

    pub fn list_installed_kegs(&self) -> Result<Vec<InstalledKeg>> {
        let cellar = self.config.cellar_dir();
        if !cellar.is_dir() {
            return Ok(Vec::new());
        }
        let mut names: Vec<String> = fs::read_dir(&cellar)?
            .flatten()
            .filter(|e| e.path().is_dir())
            .filter_map(|e| e.file_name().to_str().map(str::to_string))
            .filter(|n| !n.starts_with('.'))
            .collect();
        names.sort();

        let mut kegs = Vec::new();
        for name in names {
            kegs.extend(self.installed_kegs_of(&name)?);
        }
        Ok(kegs)
    }
}

// Release tags like `1.2` or `v1.10.0`, padded to three components.
fn parse_release(version: &str) -> Option<semver::Version> {
    let bare = version.strip_prefix('v').unwrap_or(version);
    let padded = match bare.split('.').count() {
        1 => format!("{bare}.0.0"),
        2 => format!("{bare}.0"),
        _ => bare.to_string(),
    };
    semver::Version::parse(&padded).ok()
}

/// Orders release tags numerically where they parse as versions. Tags that do
/// not parse sort before those that do, and lexically among themselves.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    match (parse_release(a), parse_release(b)) {
        (Some(va), Some(vb)) => va.cmp(&vb).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => a.cmp(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keg(root: &Path, name: &str, version: &str) {
        fs::create_dir_all(root.join("Cellar").join(name).join(version).join("bin")).unwrap();
    }

    #[test]
    fn latest_keg_orders_versions_numerically() {
        let tmp = tempfile::tempdir().unwrap();
        make_keg(tmp.path(), "merlion", "1.9.0");
        make_keg(tmp.path(), "merlion", "1.10.0");

        let registry = KegRegistry::new(Config::with_root(tmp.path()));
        let latest = registry.require_installed_keg("merlion").unwrap();
        assert_eq!(latest.version_str, "1.10.0");
    }

    #[test]
    fn version_comparison_handles_short_and_odd_tags() {
        assert_eq!(compare_versions("1.2", "1.2.0"), Ordering::Less);
        assert_eq!(compare_versions("v2.0.0", "1.10.0"), Ordering::Greater);
        assert_eq!(compare_versions("1.0.0-rc1", "1.0.0"), Ordering::Less);
        assert_eq!(compare_versions("nightly", "0.1.0"), Ordering::Less);
        assert_eq!(compare_versions("alpha", "beta"), Ordering::Less);
    }

    #[test]
    fn lists_kegs_and_skips_staging() {
        let tmp = tempfile::tempdir().unwrap();
        make_keg(tmp.path(), "merlion", "1.1.0");
        make_keg(tmp.path(), "merlion", "1.2.0");
        make_keg(tmp.path(), "merlion", ".1.3.0.staging");

        let registry = KegRegistry::new(Config::with_root(tmp.path()));
        let versions: Vec<_> = registry
            .installed_kegs_of("merlion")
            .unwrap()
            .into_iter()
            .map(|k| k.version_str)
            .collect();
        assert_eq!(versions, vec!["1.1.0", "1.2.0"]);

        let latest = registry.require_installed_keg("merlion").unwrap();
        assert_eq!(latest.version_str, "1.2.0");
        assert_eq!(
            latest.binary_path(),
            tmp.path().join("Cellar/merlion/1.2.0/bin/merlion")
        );
    }

    #[test]
    fn missing_formula_is_not_installed() {
        let tmp = tempfile::tempdir().unwrap();
        let registry = KegRegistry::new(Config::with_root(tmp.path()));
        assert!(registry.get_installed_keg("merlion").unwrap().is_none());
        assert!(matches!(
            registry.require_installed_keg("merlion"),
            Err(BrewtapError::NotFound(_))
        ));
        assert!(registry.list_installed_kegs().unwrap().is_empty());
    }

    #[test]
    fn receipt_is_read_back() {
        let tmp = tempfile::tempdir().unwrap();
        let receipt = InstallReceipt {
            name: "merlion".into(),
            version: "1.2.0".into(),
            time: "2026-01-01T00:00:00+00:00".into(),
            source: ReceiptSource {
                url: "https://example.com/1.2.0.tar.gz".into(),
                sha256: "0".repeat(64),
            },
            built_on: ReceiptPlatform {
                os: "macos".into(),
                arch: "aarch64".into(),
            },
            ldflags: vec!["-s".into(), "-w".into()],
        };
        receipt.write(tmp.path()).unwrap();
        assert_eq!(InstallReceipt::read(tmp.path()).unwrap(), Some(receipt));
    }
}
