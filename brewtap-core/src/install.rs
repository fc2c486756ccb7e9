// brewtap-core/src/install.rs
//! The install pipeline: resolve toolchain, fetch, verify, extract, build, promote.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use brewtap_common::config::Config;
use brewtap_common::error::{BrewtapError, Result};
use brewtap_common::keg::{InstallReceipt, InstalledArtifact, ReceiptPlatform, ReceiptSource};
use brewtap_common::model::PackageDescriptor;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::build::build_from_source;
use crate::extract::{extract_tarball, source_root};
use crate::process::CommandRunner;
use crate::toolchain::Toolchain;

/// Produces a local copy of a descriptor's source archive.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, descriptor: &PackageDescriptor, config: &Config) -> Result<PathBuf>;
}

/// Downloads over HTTPS into the download cache.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpFetcher;

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, descriptor: &PackageDescriptor, config: &Config) -> Result<PathBuf> {
        brewtap_net::fetch_source(descriptor, config).await
    }
}

/// Removes a staging keg unless it was promoted.
struct StagingGuard {
    path: PathBuf,
    armed: bool,
}

impl StagingGuard {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for StagingGuard {
    fn drop(&mut self) {
        if self.armed && self.path.exists() {
            debug!("Removing staging keg {}", self.path.display());
            if let Err(e) = fs::remove_dir_all(&self.path) {
                warn!(
                    "Failed to remove staging keg {}: {}",
                    self.path.display(),
                    e
                );
            }
        }
    }
}

pub struct Installer<F, R> {
    config: Config,
    fetcher: F,
    runner: R,
    search_path: Option<OsString>,
}

impl<F: Fetcher, R: CommandRunner> Installer<F, R> {
    pub fn new(config: Config, fetcher: F, runner: R) -> Self {
        Self {
            config,
            fetcher,
            runner,
            search_path: None,
        }
    }

    /// Resolve build tools in `path` instead of the process `PATH`.
    pub fn with_search_path(mut self, path: impl Into<OsString>) -> Self {
        self.search_path = Some(path.into());
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn resolve_toolchain(&self, descriptor: &PackageDescriptor) -> Result<Toolchain> {
        let deps = descriptor.build_dependencies();
        match &self.search_path {
            Some(path) => Toolchain::resolve_in(&deps, path.clone()),
            None => Toolchain::resolve(&deps),
        }
    }

    /// Fetches the archive and checks it against the descriptor's checksum.
    pub async fn fetch_verified(&self, descriptor: &PackageDescriptor) -> Result<PathBuf> {
        let archive = self.fetcher.fetch(descriptor, &self.config).await?;
        brewtap_net::verify_checksum(&archive, &descriptor.sha256)?;
        Ok(archive)
    }

    /// Runs every stage in order. Nothing appears in the Cellar or `bin` unless all succeed.
    pub async fn install(&self, descriptor: &PackageDescriptor) -> Result<InstalledArtifact> {
        let name = &descriptor.name;
        let version = &descriptor.version;

        info!("Resolving build dependencies for {} {}", name, version);
        let toolchain = self.resolve_toolchain(descriptor)?;

        info!("Fetching {}", descriptor.url);
        let archive = self.fetch_verified(descriptor).await?;
        debug!("Verified archive at {}", archive.display());

        let build_root = self.config.build_dir();
        fs::create_dir_all(&build_root)?;
        let workdir = tempfile::Builder::new()
            .prefix(&format!("{name}-{version}-"))
            .tempdir_in(&build_root)?;
        let extract_dir = workdir.path().join("src");
        extract_tarball(&archive, &extract_dir)?;
        let source_dir = source_root(&extract_dir)?;

        let staging = self.config.staging_keg_path(name, version);
        if staging.exists() {
            debug!("Removing leftover staging keg {}", staging.display());
            fs::remove_dir_all(&staging)?;
        }
        fs::create_dir_all(&staging)?;
        let mut guard = StagingGuard::new(staging.clone());

        info!("Building {} {}", name, version);
        build_from_source(
            descriptor,
            &toolchain,
            &source_dir,
            &staging.join("bin"),
            &self.config,
            &self.runner,
        )
        .await?;
        receipt_for(descriptor).write(&staging)?;

        let keg = self.config.keg_path(name, version);
        promote_staging(&staging, &keg)?;
        guard.disarm();

        let binary_path = keg.join("bin").join(name);
        if let Err(e) = link_binary(&self.config, name, &binary_path) {
            let _ = fs::remove_dir_all(&keg);
            return Err(e);
        }

        let (files, bytes) = summarize_keg(&keg);
        info!("{}: {} files, {}", keg.display(), files, human_size(bytes));
        Ok(InstalledArtifact {
            name: name.clone(),
            version: version.clone(),
            keg_path: keg,
            binary_path,
        })
    }
}

/// Moves the staging keg into place. An existing keg is set aside first and
/// restored if the move fails.
fn promote_staging(staging: &Path, keg: &Path) -> Result<()> {
    let previous = keg.exists().then(|| {
        let file_name = keg.file_name().unwrap_or_default().to_string_lossy();
        keg.with_file_name(format!(".{file_name}.previous"))
    });
    if let Some(previous) = &previous {
        debug!("Setting existing keg {} aside", keg.display());
        if previous.exists() {
            fs::remove_dir_all(previous)?;
        }
        fs::rename(keg, previous)?;
    }

    if let Err(e) = fs::rename(staging, keg) {
        if let Some(previous) = &previous {
            if let Err(restore) = fs::rename(previous, keg) {
                warn!(
                    "Could not restore {} from {}: {}",
                    keg.display(),
                    previous.display(),
                    restore
                );
            }
        }
        return Err(BrewtapError::InstallError(format!(
            "Failed to promote {} to {}: {e}",
            staging.display(),
            keg.display()
        )));
    }

    if let Some(previous) = previous {
        if let Err(e) = fs::remove_dir_all(&previous) {
            warn!("Failed to remove replaced keg {}: {}", previous.display(), e);
        }
    }
    Ok(())
}

fn receipt_for(descriptor: &PackageDescriptor) -> InstallReceipt {
    InstallReceipt {
        name: descriptor.name.clone(),
        version: descriptor.version.clone(),
        time: chrono::Utc::now().to_rfc3339(),
        source: ReceiptSource {
            url: descriptor.url.clone(),
            sha256: descriptor.sha256.clone(),
        },
        built_on: ReceiptPlatform {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
        },
        ldflags: descriptor.install.ldflags.clone(),
    }
}

/// Points `<root>/bin/<name>` at the keg's binary, replacing whatever was there.
pub fn link_binary(config: &Config, name: &str, target: &Path) -> Result<PathBuf> {
    let bin_dir = config.bin_dir();
    fs::create_dir_all(&bin_dir)?;
    let link = config.linked_binary_path(name);
    if link.symlink_metadata().is_ok() {
        fs::remove_file(&link)?;
    }
    #[cfg(unix)]
    std::os::unix::fs::symlink(target, &link)?;
    #[cfg(not(unix))]
    fs::copy(target, &link).map(|_| ())?;
    debug!("Linked {} -> {}", link.display(), target.display());
    Ok(link)
}

/// File count and total size of a keg.
pub fn summarize_keg(keg: &Path) -> (usize, u64) {
    WalkDir::new(keg)
        .into_iter()
        .flatten()
        .filter(|e| e.file_type().is_file())
        .fold((0, 0), |(files, bytes), e| {
            (files + 1, bytes + e.metadata().map(|m| m.len()).unwrap_or(0))
        })
}

pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes}B")
    } else {
        format!("{size:.1}{}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn human_sizes() {
        assert_eq!(human_size(512), "512B");
        assert_eq!(human_size(2048), "2.0KB");
        assert_eq!(human_size(5 * 1024 * 1024 + 512 * 1024), "5.5MB");
    }

    #[test]
    fn summary_counts_files_only() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("bin")).unwrap();
        fs::write(tmp.path().join("bin/merlion"), [0u8; 10]).unwrap();
        fs::write(tmp.path().join("INSTALL_RECEIPT.json"), "{}").unwrap();
        assert_eq!(summarize_keg(tmp.path()), (2, 12));
    }

    #[test]
    fn promotion_replaces_existing_keg() {
        let tmp = tempfile::tempdir().unwrap();
        let staging = tmp.path().join(".1.2.0.staging");
        let keg = tmp.path().join("1.2.0");
        fs::create_dir_all(&staging).unwrap();
        fs::write(staging.join("new"), "").unwrap();
        fs::create_dir_all(&keg).unwrap();
        fs::write(keg.join("old"), "").unwrap();

        promote_staging(&staging, &keg).unwrap();
        assert!(keg.join("new").is_file());
        assert!(!keg.join("old").exists());
        assert!(!staging.exists());
        assert!(!tmp.path().join(".1.2.0.previous").exists());
    }

    #[test]
    fn failed_promotion_restores_existing_keg() {
        let tmp = tempfile::tempdir().unwrap();
        let keg = tmp.path().join("1.2.0");
        fs::create_dir_all(&keg).unwrap();
        fs::write(keg.join("old"), "").unwrap();

        // Staging was never created, so the move cannot succeed.
        let err = promote_staging(&tmp.path().join(".1.2.0.staging"), &keg).unwrap_err();
        assert!(matches!(err, BrewtapError::InstallError(_)), "{err}");
        assert!(keg.join("old").is_file());
        assert!(!tmp.path().join(".1.2.0.previous").exists());
    }

    #[cfg(unix)]
    #[test]
    fn relinking_replaces_previous_link() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::with_root(tmp.path());
        let old = tmp.path().join("old");
        let new = tmp.path().join("new");
        fs::write(&old, "").unwrap();
        fs::write(&new, "").unwrap();

        link_binary(&config, "merlion", &old).unwrap();
        let link = link_binary(&config, "merlion", &new).unwrap();
        assert_eq!(fs::read_link(link).unwrap(), new);
    }
}
