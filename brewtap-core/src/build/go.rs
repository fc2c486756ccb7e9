// FILE: brewtap-core/src/build/go.rs

use std::fs;
use std::path::{Path, PathBuf};

use brewtap_common::error::{BrewtapError, Result};
use brewtap_common::model::PackageDescriptor;
use tracing::debug;

use super::env::BuildEnvironment;
use crate::process::{CommandRunner, CommandSpec};
use crate::toolchain::Toolchain;

/// `go build` with Homebrew's std_go_args: trimmed paths, output into `bin_dir`, ldflags
/// as one argument.
pub fn go_build_command(
    descriptor: &PackageDescriptor,
    toolchain: &Toolchain,
    build_env: &BuildEnvironment,
    source_dir: &Path,
    bin_dir: &Path,
) -> Result<CommandSpec> {
    let go_exe = toolchain.tool("go")?;
    let output_binary_path = bin_dir.join(&descriptor.name);

    let mut spec = CommandSpec::new(go_exe)
        .arg("build")
        .arg("-trimpath")
        .arg(format!("-o={}", output_binary_path.display()));
    if !descriptor.install.ldflags.is_empty() {
        spec = spec.arg(format!("-ldflags={}", descriptor.ldflags_arg()));
    }
    Ok(spec
        .arg(descriptor.install.package.clone())
        .current_dir(source_dir)
        .env_clear()
        .envs(build_env.vars().clone()))
}

/// Builds the Go package and returns the path of the produced binary.
pub async fn go_build<R: CommandRunner + ?Sized>(
    descriptor: &PackageDescriptor,
    toolchain: &Toolchain,
    build_env: &BuildEnvironment,
    source_dir: &Path,
    bin_dir: &Path,
    runner: &R,
) -> Result<PathBuf> {
    debug!("Building Go module in {}", source_dir.display());
    fs::create_dir_all(bin_dir).map_err(|e| {
        BrewtapError::InstallError(format!(
            "Failed to create target bin dir {}: {e}",
            bin_dir.display()
        ))
    })?;

    let spec = go_build_command(descriptor, toolchain, build_env, source_dir, bin_dir)?;
    debug!("Running: {}", spec);
    let output = runner.run(&spec).await?;

    if !output.success() {
        return Err(BrewtapError::build(
            spec.to_string(),
            output.status_display(),
            output.combined(),
        ));
    }
    debug!("Go build stdout:\n{}", output.stdout);
    debug!("Go build stderr:\n{}", output.stderr);

    let output_binary_path = bin_dir.join(&descriptor.name);
    if !output_binary_path.is_file() {
        return Err(BrewtapError::build(
            spec.to_string(),
            output.status_display(),
            format!(
                "build reported success but {} was not produced",
                output_binary_path.display()
            ),
        ));
    }
    debug!(
        "Go build successful, binary placed at: {}",
        output_binary_path.display()
    );
    Ok(output_binary_path)
}
