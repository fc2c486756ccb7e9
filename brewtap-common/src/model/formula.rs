// brewtap-common/src/model/formula.rs
//! Formula templates as authored in a tap, and the descriptors they resolve to.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::dependency::{Dependency, DependencyExt};
use super::template::{self, Bindings};
use crate::error::{BrewtapError, Result};

const SHA256_HEX_LEN: usize = 64;

/// How the binary is produced from the extracted sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstallProcedure {
    /// Build tool; must also be declared in `depends_on`.
    pub tool: String,
    /// Package path handed to the build tool, relative to the source root.
    #[serde(default = "default_package")]
    pub package: String,
    #[serde(default)]
    pub ldflags: Vec<String>,
}

fn default_package() -> String {
    ".".to_string()
}

/// Post-install check: run the binary with `args`, expect `expect` in its output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestProcedure {
    #[serde(default)]
    pub args: Vec<String>,
    pub expect: String,
}

/// A formula file. String fields may contain `${version}` and `${maintainerIdentity}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FormulaTemplate {
    pub name: String,
    pub desc: String,
    pub homepage: String,
    pub url: String,
    /// Release the formula is pinned to; `sha256` belongs to this version.
    pub version: String,
    pub sha256: String,
    /// Checksums of other releases that may be requested explicitly.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub checksums: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mirrors: Vec<String>,
    pub license: String,
    #[serde(default)]
    pub depends_on: Vec<Dependency>,
    pub install: InstallProcedure,
    pub test: TestProcedure,
}

/// A fully substituted formula for one version. Never mutated once resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageDescriptor {
    pub name: String,
    pub desc: String,
    pub homepage: String,
    pub url: String,
    pub mirrors: Vec<String>,
    pub sha256: String,
    pub license: String,
    pub version: String,
    pub dependencies: Vec<Dependency>,
    pub install: InstallProcedure,
    pub test: TestProcedure,
}

impl FormulaTemplate {
    /// Parses a formula file and checks that every placeholder in it is known.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let template: FormulaTemplate = toml::from_str(source)?;
        validate_version(&template.version)?;
        // Dry run: surfaces unknown placeholders at load time instead of at install time.
        template.resolve(&template.version, "maintainer")?;
        debug!(
            "Parsed formula '{}' pinned at {}",
            template.name, template.version
        );
        Ok(template)
    }

    pub fn checksum_for(&self, version: &str) -> Option<&str> {
        if version == self.version {
            Some(self.sha256.as_str())
        } else {
            self.checksums.get(version).map(String::as_str)
        }
    }

    /// The pinned version followed by every other version with a known checksum.
    pub fn known_versions(&self) -> Vec<&str> {
        std::iter::once(self.version.as_str())
            .chain(
                self.checksums
                    .keys()
                    .map(String::as_str)
                    .filter(|v| *v != self.version),
            )
            .collect()
    }

    /// Instantiates the template for `version`, using the checksum recorded for it.
    pub fn resolve(&self, version: &str, maintainer_identity: &str) -> Result<PackageDescriptor> {
        let sha256 = self.checksum_for(version).ok_or_else(|| {
            BrewtapError::UnresolvedVersion(format!(
                "{} has no recorded checksum for version '{}' (known: {})",
                self.name,
                version,
                self.known_versions().join(", ")
            ))
        })?;
        self.resolve_with_checksum(version, maintainer_identity, sha256)
    }

    /// Instantiates the template for `version` with a caller supplied checksum.
    pub fn resolve_with_checksum(
        &self,
        version: &str,
        maintainer_identity: &str,
        sha256: &str,
    ) -> Result<PackageDescriptor> {
        validate_version(version)?;
        let bindings = Bindings {
            version,
            maintainer_identity,
        };
        Ok(PackageDescriptor {
            name: self.name.clone(),
            desc: self.desc.clone(),
            homepage: self.homepage.clone(),
            url: template::substitute(&self.url, &bindings)?,
            mirrors: template::substitute_all(&self.mirrors, &bindings)?,
            sha256: sha256.to_ascii_lowercase(),
            license: self.license.clone(),
            version: version.to_string(),
            dependencies: self.depends_on.clone(),
            install: InstallProcedure {
                tool: self.install.tool.clone(),
                package: template::substitute(&self.install.package, &bindings)?,
                ldflags: template::substitute_all(&self.install.ldflags, &bindings)?,
            },
            test: TestProcedure {
                args: template::substitute_all(&self.test.args, &bindings)?,
                expect: template::substitute(&self.test.expect, &bindings)?,
            },
        })
    }
}

impl PackageDescriptor {
    pub fn build_dependencies(&self) -> Vec<&Dependency> {
        self.dependencies.build_time()
    }

    pub fn runtime_dependencies(&self) -> Vec<&Dependency> {
        self.dependencies.runtime()
    }

    /// Cache file name of the source archive; versioned so releases never collide.
    pub fn archive_filename(&self) -> String {
        format!("{}-{}.tar.gz", self.name, self.version)
    }

    /// The single `-ldflags` value passed to the build tool.
    pub fn ldflags_arg(&self) -> String {
        self.install.ldflags.join(" ")
    }

    /// Problems a tap maintainer should fix before publishing. Empty when clean.
    pub fn audit(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if self.desc.trim().is_empty() {
            problems.push("desc is empty".to_string());
        }
        for (field, value) in [("homepage", &self.homepage), ("url", &self.url)] {
            if !value.starts_with("https://") {
                problems.push(format!("{field} should use https: {value}"));
            }
        }
        for mirror in &self.mirrors {
            if !mirror.starts_with("https://") {
                problems.push(format!("mirror should use https: {mirror}"));
            }
        }
        if !is_sha256_hex(&self.sha256) {
            problems.push(format!(
                "sha256 must be {SHA256_HEX_LEN} hex characters, got '{}'",
                self.sha256
            ));
        }
        if !is_spdx_expression(&self.license) {
            problems.push(format!("license is not an SPDX expression: '{}'", self.license));
        }
        if !self
            .build_dependencies()
            .iter()
            .any(|dep| dep.name == self.install.tool)
        {
            problems.push(format!(
                "install uses '{}' which is not a declared build dependency",
                self.install.tool
            ));
        }
        if !self.test.expect.contains(&self.version) {
            problems.push(format!(
                "test expectation '{}' does not mention the version",
                self.test.expect
            ));
        }

        problems
    }
}

/// Versions end up in URLs, paths and linker flags, so only tag-safe characters are allowed.
pub fn validate_version(version: &str) -> Result<()> {
    let valid_chars = version
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '+' | '-'));
    if version.is_empty() || !valid_chars || version.starts_with(|c| c == '.' || c == '-') {
        return Err(BrewtapError::UnresolvedVersion(format!(
            "'{version}' is not a valid release tag"
        )));
    }
    Ok(())
}

pub fn is_sha256_hex(value: &str) -> bool {
    value.len() == SHA256_HEX_LEN && value.chars().all(|c| c.is_ascii_hexdigit())
}

fn is_spdx_expression(license: &str) -> bool {
    let mut saw_id = false;
    for token in license
        .split(|c: char| c.is_whitespace() || c == '(' || c == ')')
        .filter(|t| !t.is_empty())
    {
        match token {
            "OR" | "AND" | "WITH" => {}
            id if id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '+'))
                && id.chars().any(|c| c.is_ascii_alphabetic()) =>
            {
                saw_id = true
            }
            _ => return false,
        }
    }
    saw_id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::dependency::DependencyTag;

    const FORMULA: &str = r#"
        name = "merlion"
        desc = "TUI for note-taking app with Obsidian Vault support"
        homepage = "https://note.merlion.dev"
        url = "https://github.com/latentDream/merlion/archive/refs/tags/${version}.tar.gz"
        version = "1.2.0"
        sha256 = "529d7b6ee2652550adc538bb8054dc593863c97f95531e3adb957e780df0048e"
        license = "MIT"

        [checksums]
        "1.1.0" = "1111111111111111111111111111111111111111111111111111111111111111"

        [[depends_on]]
        name = "go"
        tags = ["build"]

        [install]
        tool = "go"
        package = "./cmd/merlion"
        ldflags = [
            "-s",
            "-w",
            "-X merlion/cmd/merlion/version.Version=${version}",
            "-X merlion/cmd/merlion/version.Commit=${maintainerIdentity}",
        ]

        [test]
        args = ["version"]
        expect = "version: ${version}"
    "#;

    fn template() -> FormulaTemplate {
        FormulaTemplate::from_toml_str(FORMULA).unwrap()
    }

    #[test]
    fn resolves_pinned_release() {
        let d = template().resolve("1.2.0", "latentDream").unwrap();
        assert_eq!(
            d.url,
            "https://github.com/latentDream/merlion/archive/refs/tags/1.2.0.tar.gz"
        );
        assert!(d
            .install
            .ldflags
            .contains(&"-X merlion/cmd/merlion/version.Version=1.2.0".to_string()));
        assert!(d
            .install
            .ldflags
            .contains(&"-X merlion/cmd/merlion/version.Commit=latentDream".to_string()));
        assert_eq!(d.test.expect, "version: 1.2.0");
        assert_eq!(d.test.args, vec!["version".to_string()]);
        assert_eq!(d.archive_filename(), "merlion-1.2.0.tar.gz");
    }

    #[test]
    fn resolve_is_deterministic() {
        let t = template();
        let a = t.resolve("1.2.0", "latentDream").unwrap();
        let b = t.resolve("1.2.0", "latentDream").unwrap();
        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_vec(&a).unwrap(),
            serde_json::to_vec(&b).unwrap()
        );
    }

    #[test]
    fn other_known_release_uses_its_checksum() {
        let d = template().resolve("1.1.0", "latentDream").unwrap();
        assert_eq!(d.sha256, "1".repeat(64));
        assert!(d.url.ends_with("/1.1.0.tar.gz"));
    }

    #[test]
    fn unknown_release_without_checksum_is_unresolved() {
        let err = template().resolve("9.9.9", "latentDream").unwrap_err();
        assert!(matches!(err, BrewtapError::UnresolvedVersion(_)));
    }

    #[test]
    fn explicit_checksum_resolves_any_release() {
        let d = template()
            .resolve_with_checksum("9.9.9", "latentDream", &"AB".repeat(32))
            .unwrap();
        assert_eq!(d.sha256, "ab".repeat(32));
        assert_eq!(d.version, "9.9.9");
    }

    #[test]
    fn malformed_versions_are_rejected() {
        for bad in ["", "../1.2.0", "1.2.0/evil", "-rf", "1 2"] {
            assert!(validate_version(bad).is_err(), "accepted {bad:?}");
        }
        for good in ["1.2.0", "v1.2.0", "1.2.0-rc.1", "2024_01"] {
            assert!(validate_version(good).is_ok(), "rejected {good:?}");
        }
    }

    #[test]
    fn ldflags_join_into_one_argument() {
        let d = template().resolve("1.2.0", "latentDream").unwrap();
        assert_eq!(
            d.ldflags_arg(),
            "-s -w -X merlion/cmd/merlion/version.Version=1.2.0 -X merlion/cmd/merlion/version.Commit=latentDream"
        );
    }

    #[test]
    fn go_is_build_only() {
        let d = template().resolve("1.2.0", "latentDream").unwrap();
        assert_eq!(d.build_dependencies()[0].tags, DependencyTag::BUILD);
        assert!(d.runtime_dependencies().is_empty());
    }

    #[test]
    fn clean_formula_passes_audit() {
        let d = template().resolve("1.2.0", "latentDream").unwrap();
        assert!(d.audit().is_empty(), "{:?}", d.audit());
    }

    #[test]
    fn audit_flags_undeclared_tool_and_bad_checksum() {
        let mut t = template();
        t.depends_on.clear();
        let d = t
            .resolve_with_checksum("1.2.0", "latentDream", "deadbeef")
            .unwrap();
        let problems = d.audit();
        assert!(problems.iter().any(|p| p.contains("not a declared build dependency")));
        assert!(problems.iter().any(|p| p.contains("sha256")));
    }

    #[test]
    fn unknown_placeholder_fails_at_load() {
        let broken = FORMULA.replace("${maintainerIdentity}", "${commit}");
        assert!(FormulaTemplate::from_toml_str(&broken).is_err());
    }

    #[test]
    fn spdx_expressions() {
        assert!(is_spdx_expression("MIT"));
        assert!(is_spdx_expression("MIT OR Apache-2.0"));
        assert!(is_spdx_expression("(GPL-2.0-only WITH Classpath-exception-2.0)"));
        assert!(!is_spdx_expression(""));
        assert!(!is_spdx_expression("MIT/Apache"));
    }
}
