// brewtap-core/src/toolchain.rs
use std::collections::BTreeMap;
use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use brewtap_common::error::{BrewtapError, Result};
use brewtap_common::model::Dependency;
use tracing::debug;

/// Build tools located on a search path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    search_path: OsString,
    tools: BTreeMap<String, PathBuf>,
}

impl Toolchain {
    /// Resolves against the process `PATH`.
    pub fn resolve(deps: &[&Dependency]) -> Result<Self> {
        let path = env::var_os("PATH").unwrap_or_default();
        Self::resolve_in(deps, path)
    }

    /// Locates every dependency in `search_path`. All missing tools are reported at once.
    pub fn resolve_in(deps: &[&Dependency], search_path: impl Into<OsString>) -> Result<Self> {
        let search_path = search_path.into();
        let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
        let mut tools = BTreeMap::new();
        let mut missing = Vec::new();

        for dep in deps {
            match which::which_in(&dep.name, Some(&search_path), &cwd) {
                Ok(found) => {
                    debug!("Resolved build dependency '{}' at {}", dep.name, found.display());
                    tools.insert(dep.name.clone(), found);
                }
                Err(e) => {
                    debug!("Build dependency '{}' not found: {}", dep.name, e);
                    missing.push(dep.name.clone());
                }
            }
        }

        if !missing.is_empty() {
            return Err(BrewtapError::DependencyResolutionError(format!(
                "required build tool(s) not found on PATH: {}",
                missing.join(", ")
            )));
        }
        Ok(Self { search_path, tools })
    }

    pub fn tool(&self, name: &str) -> Result<&Path> {
        self.tools.get(name).map(PathBuf::as_path).ok_or_else(|| {
            BrewtapError::DependencyResolutionError(format!(
                "'{name}' is not a resolved build dependency"
            ))
        })
    }

    pub fn search_path_string(&self) -> String {
        self.search_path.to_string_lossy().into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brewtap_common::model::DependencyTag;

    #[cfg(unix)]
    fn fake_tool(dir: &Path, name: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join(name);
        std::fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[test]
    fn finds_tool_on_given_path() {
        let dir = tempfile::tempdir().unwrap();
        let go = fake_tool(dir.path(), "go");
        let dep = Dependency::new_with_tags("go", DependencyTag::BUILD);

        let toolchain = Toolchain::resolve_in(&[&dep], dir.path().as_os_str()).unwrap();
        assert_eq!(toolchain.tool("go").unwrap(), go.as_path());
        assert!(toolchain.tool("make").is_err());
    }

    #[test]
    fn reports_every_missing_tool() {
        let dir = tempfile::tempdir().unwrap();
        let go = Dependency::new_with_tags("go", DependencyTag::BUILD);
        let make = Dependency::new_with_tags("make", DependencyTag::BUILD);

        let err = Toolchain::resolve_in(&[&go, &make], dir.path().as_os_str()).unwrap_err();
        match err {
            BrewtapError::DependencyResolutionError(msg) => {
                assert!(msg.contains("go") && msg.contains("make"), "{msg}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn no_dependencies_resolves_trivially() {
        let toolchain = Toolchain::resolve_in(&[], "").unwrap();
        assert!(toolchain.tool("go").is_err());
    }
}
