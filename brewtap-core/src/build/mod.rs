// ===== brewtap-core/src/build/mod.rs =====
use std::path::{Path, PathBuf};

use brewtap_common::config::Config;
use brewtap_common::error::{BrewtapError, Result};
use brewtap_common::model::PackageDescriptor;

use crate::process::CommandRunner;
use crate::toolchain::Toolchain;

pub mod env;
pub mod go;

pub use env::BuildEnvironment;
pub use go::{go_build, go_build_command};

/// Runs the formula's install procedure, leaving the binary in `bin_dir`.
pub async fn build_from_source<R: CommandRunner + ?Sized>(
    descriptor: &PackageDescriptor,
    toolchain: &Toolchain,
    source_dir: &Path,
    bin_dir: &Path,
    config: &Config,
    runner: &R,
) -> Result<PathBuf> {
    match descriptor.install.tool.as_str() {
        "go" => {
            let build_env = BuildEnvironment::new(toolchain).with_go(config);
            go_build(descriptor, toolchain, &build_env, source_dir, bin_dir, runner).await
        }
        other => Err(BrewtapError::build(
            other,
            "not run",
            format!("unsupported build tool '{other}'; only 'go' formulas can be built"),
        )),
    }
}
