// brewtap-common/src/config.rs
use std::env;
use std::path::{Path, PathBuf};

use directories::UserDirs;
use tracing::debug;

use super::error::Result;

// Used when neither BREWTAP_ROOT nor HOMEBREW_PREFIX is set.
const DEFAULT_FALLBACK_ROOT: &str = "/opt/homebrew";
// Owner of the tap the formulas ship in; stamped into builds as the maintainer identity.
pub const DEFAULT_TAP_USER: &str = "latentDream";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub root: PathBuf,
    pub tap_user: String,
    pub formula_dir: Option<PathBuf>,
    pub cache_override: Option<PathBuf>,
}

impl Config {
    pub fn load() -> Result<Self> {
        debug!("Loading brewtap configuration");

        let root_str = non_empty_var("BREWTAP_ROOT")
            .or_else(|| non_empty_var("HOMEBREW_PREFIX"))
            .unwrap_or_else(|| {
                debug!(
                    "Neither BREWTAP_ROOT nor HOMEBREW_PREFIX set, falling back to default: {}",
                    DEFAULT_FALLBACK_ROOT
                );
                DEFAULT_FALLBACK_ROOT.to_string()
            });
        let root = expand_home(&root_str);
        debug!("Effective root set to: {}", root.display());

        let tap_user =
            non_empty_var("BREWTAP_TAP_USER").unwrap_or_else(|| DEFAULT_TAP_USER.to_string());
        let formula_dir = non_empty_var("BREWTAP_FORMULA_DIR").map(|p| expand_home(&p));
        let cache_override = non_empty_var("BREWTAP_CACHE").map(|p| expand_home(&p));

        debug!("Configuration loaded successfully.");
        Ok(Self {
            root,
            tap_user,
            formula_dir,
            cache_override,
        })
    }

    /// A configuration rooted at `root` with no environment input.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            tap_user: DEFAULT_TAP_USER.to_string(),
            formula_dir: None,
            cache_override: None,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Identity embedded into builds through the `${maintainerIdentity}` placeholder.
    pub fn maintainer_identity(&self) -> &str {
        &self.tap_user
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.root.join("bin")
    }

    pub fn cellar_dir(&self) -> PathBuf {
        self.root.join("Cellar")
    }

    pub fn formula_cellar_dir(&self, formula_name: &str) -> PathBuf {
        self.cellar_dir().join(formula_name)
    }

    pub fn keg_path(&self, formula_name: &str, version_str: &str) -> PathBuf {
        self.formula_cellar_dir(formula_name).join(version_str)
    }

    /// Where a keg is assembled before it is promoted to `keg_path`.
    pub fn staging_keg_path(&self, formula_name: &str, version_str: &str) -> PathBuf {
        self.formula_cellar_dir(formula_name)
            .join(format!(".{version_str}.staging"))
    }

    pub fn linked_binary_path(&self, binary_name: &str) -> PathBuf {
        self.bin_dir().join(binary_name)
    }

    pub fn cache_dir(&self) -> PathBuf {
        match &self.cache_override {
            Some(dir) => dir.clone(),
            None => self.root.join("var").join("cache").join("brewtap"),
        }
    }

    pub fn downloads_dir(&self) -> PathBuf {
        self.cache_dir().join("downloads")
    }

    /// Scratch space for extracted sources; wiped per build.
    pub fn build_dir(&self) -> PathBuf {
        self.cache_dir().join("build")
    }

    /// Go's module and build caches, kept between builds.
    pub fn go_cache_dir(&self) -> PathBuf {
        self.cache_dir().join("go")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("var").join("log")
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|s| !s.is_empty())
}

/// Expands a leading `~` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    let rest = match path.strip_prefix('~') {
        Some("") => "",
        Some(rest) if rest.starts_with('/') => rest.trim_start_matches('/'),
        _ => return PathBuf::from(path),
    };
    match UserDirs::new() {
        Some(dirs) if rest.is_empty() => dirs.home_dir().to_path_buf(),
        Some(dirs) => dirs.home_dir().join(rest),
        None => {
            debug!("No home directory known, leaving '{}' as is", path);
            PathBuf::from(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_paths_follow_homebrew_layout() {
        let config = Config::with_root("/tmp/brewtap-root");
        assert_eq!(config.bin_dir(), PathBuf::from("/tmp/brewtap-root/bin"));
        assert_eq!(
            config.keg_path("merlion", "1.2.0"),
            PathBuf::from("/tmp/brewtap-root/Cellar/merlion/1.2.0")
        );
        assert_eq!(
            config.staging_keg_path("merlion", "1.2.0"),
            PathBuf::from("/tmp/brewtap-root/Cellar/merlion/.1.2.0.staging")
        );
        assert_eq!(
            config.downloads_dir(),
            PathBuf::from("/tmp/brewtap-root/var/cache/brewtap/downloads")
        );
    }

    #[test]
    fn cache_override_moves_every_cache_path() {
        let mut config = Config::with_root("/tmp/brewtap-root");
        config.cache_override = Some(PathBuf::from("/tmp/elsewhere"));
        assert_eq!(config.downloads_dir(), PathBuf::from("/tmp/elsewhere/downloads"));
        assert_eq!(config.go_cache_dir(), PathBuf::from("/tmp/elsewhere/go"));
    }

    #[test]
    fn tilde_expands_to_home() {
        let Some(dirs) = UserDirs::new() else {
            return;
        };
        let home = dirs.home_dir().to_path_buf();
        assert_eq!(expand_home("~"), home);
        assert_eq!(expand_home("~/brewtap/cache"), home.join("brewtap/cache"));
        assert_eq!(expand_home("/opt/homebrew"), PathBuf::from("/opt/homebrew"));
        assert_eq!(expand_home("~other/x"), PathBuf::from("~other/x"));
    }

    #[test]
    fn default_maintainer_is_tap_owner() {
        let config = Config::with_root("/tmp/x");
        assert_eq!(config.maintainer_identity(), "latentDream");
    }
}
