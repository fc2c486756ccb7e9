use std::path::PathBuf;
use std::process::{Command, Output};

use tempfile::TempDir;

struct TestContext {
    root: TempDir,
}

impl TestContext {
    fn new() -> Self {
        Self {
            root: TempDir::new().unwrap(),
        }
    }

    fn brewtap(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_brewtap"))
            .args(args)
            .env("BREWTAP_ROOT", self.root.path())
            .env_remove("HOMEBREW_PREFIX")
            .env_remove("BREWTAP_TAP_USER")
            .env_remove("BREWTAP_FORMULA_DIR")
            .env_remove("BREWTAP_CACHE")
            .output()
            .expect("failed to run brewtap")
    }

    fn cellar(&self) -> PathBuf {
        self.root.path().join("Cellar")
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn help_lists_subcommands() {
    let ctx = TestContext::new();
    let output = ctx.brewtap(&["--help"]);
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("Usage:"));
    for sub in ["info", "audit", "fetch", "install", "test", "uninstall", "list"] {
        assert!(out.contains(sub), "missing {sub} in help");
    }
}

#[test]
fn info_json_shows_resolved_formula() {
    let ctx = TestContext::new();
    let output = ctx.brewtap(&["info", "merlion", "--json"]);
    assert!(output.status.success(), "{output:?}");
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["version"], "1.2.0");
    assert_eq!(
        json["url"],
        "https://github.com/latentDream/merlion/archive/refs/tags/1.2.0.tar.gz"
    );
    let ldflags = json["install"]["ldflags"].to_string();
    assert!(ldflags.contains("version.Commit=latentDream"));
}

#[test]
fn unknown_release_without_checksum_fails() {
    let ctx = TestContext::new();
    let output = ctx.brewtap(&["info", "merlion", "--version", "9.9.9"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("9.9.9"));
}

#[test]
fn unknown_formula_fails() {
    let ctx = TestContext::new();
    let output = ctx.brewtap(&["info", "nosuchformula"]);
    assert!(!output.status.success());
}

#[test]
fn audit_passes_for_shipped_formula() {
    let ctx = TestContext::new();
    let output = ctx.brewtap(&["audit", "merlion"]);
    assert!(output.status.success(), "{output:?}");
}

#[test]
fn list_on_empty_prefix() {
    let ctx = TestContext::new();
    let output = ctx.brewtap(&["list"]);
    assert!(output.status.success(), "{output:?}");
    assert!(stdout(&output).contains("0 formulas installed"));
    assert!(!ctx.cellar().exists());
}

#[test]
fn test_requires_installed_keg() {
    let ctx = TestContext::new();
    let output = ctx.brewtap(&["test", "merlion"]);
    assert!(!output.status.success());
}
