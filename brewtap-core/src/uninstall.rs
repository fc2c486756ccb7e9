// brewtap-core/src/uninstall.rs
use std::fs;
use std::path::Path;

use brewtap_common::config::Config;
use brewtap_common::error::{BrewtapError, Result};
use brewtap_common::keg::InstalledKeg;
use tracing::{debug, info, warn};

/// Unlinks and removes one installed keg.
pub fn uninstall_keg(keg: &InstalledKeg, config: &Config) -> Result<()> {
    if !keg.path.is_dir() {
        return Err(BrewtapError::NotFound(format!(
            "{} {} is not installed",
            keg.name, keg.version_str
        )));
    }

    unlink_binary(config, &keg.name, &keg.path)?;

    debug!("Removing keg {}", keg.path.display());
    fs::remove_dir_all(&keg.path)?;

    let formula_dir = config.formula_cellar_dir(&keg.name);
    if formula_dir.is_dir() && fs::read_dir(&formula_dir)?.next().is_none() {
        debug!("Removing empty {}", formula_dir.display());
        fs::remove_dir(&formula_dir)?;
    }
    info!("Uninstalled {} {}", keg.name, keg.version_str);
    Ok(())
}

// Only removes the link when it points into `keg_path`; another version may own it.
fn unlink_binary(config: &Config, name: &str, keg_path: &Path) -> Result<()> {
    let link = config.linked_binary_path(name);
    let Ok(meta) = link.symlink_metadata() else {
        return Ok(());
    };
    if !meta.file_type().is_symlink() {
        warn!(
            "{} is not a symlink, leaving it in place",
            link.display()
        );
        return Ok(());
    }
    let target = fs::read_link(&link)?;
    if target.starts_with(keg_path) {
        debug!("Unlinking {}", link.display());
        fs::remove_file(&link)?;
    } else {
        debug!(
            "{} points to {}, not into {}; keeping it",
            link.display(),
            target.display(),
            keg_path.display()
        );
    }
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use brewtap_common::KegRegistry;

    use crate::install::link_binary;

    fn install_fake(config: &Config, version: &str) -> InstalledKeg {
        let keg = config.keg_path("merlion", version);
        fs::create_dir_all(keg.join("bin")).unwrap();
        fs::write(keg.join("bin/merlion"), "").unwrap();
        link_binary(config, "merlion", &keg.join("bin/merlion")).unwrap();
        KegRegistry::new(config.clone())
            .get_installed_keg("merlion")
            .unwrap()
            .unwrap()
    }

    #[test]
    fn removes_keg_link_and_empty_cellar_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::with_root(tmp.path());
        let keg = install_fake(&config, "1.2.0");

        uninstall_keg(&keg, &config).unwrap();
        assert!(!keg.path.exists());
        assert!(config.linked_binary_path("merlion").symlink_metadata().is_err());
        assert!(!config.formula_cellar_dir("merlion").exists());
    }

    #[test]
    fn keeps_link_owned_by_another_version() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::with_root(tmp.path());
        let old = install_fake(&config, "1.1.0");
        install_fake(&config, "1.2.0");

        uninstall_keg(&old, &config).unwrap();
        let link = config.linked_binary_path("merlion");
        assert!(fs::read_link(link)
            .unwrap()
            .starts_with(config.keg_path("merlion", "1.2.0")));
        assert!(config.formula_cellar_dir("merlion").is_dir());
    }

    #[test]
    fn missing_keg_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::with_root(tmp.path());
        let keg = InstalledKeg {
            name: "merlion".into(),
            version_str: "1.2.0".into(),
            path: config.keg_path("merlion", "1.2.0"),
        };
        assert!(matches!(
            uninstall_keg(&keg, &config),
            Err(BrewtapError::NotFound(_))
        ));
    }
}
