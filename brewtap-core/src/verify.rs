// brewtap-core/src/verify.rs
use brewtap_common::error::{BrewtapError, Result};
use brewtap_common::keg::InstalledArtifact;
use brewtap_common::model::PackageDescriptor;
use tracing::{debug, info, warn};

use crate::process::{CommandOutput, CommandRunner, CommandSpec};

/// Outcome of running a formula's test block against an installed binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub expected: String,
    pub output: CommandOutput,
}

impl Verification {
    pub fn passed(&self) -> bool {
        self.output.combined().contains(&self.expected)
    }

    /// Turns a failed check into `TestAssertionError`.
    pub fn into_result(self) -> Result<()> {
        if self.passed() {
            Ok(())
        } else {
            Err(BrewtapError::TestAssertionError {
                expected: self.expected,
                output: self.output.combined(),
            })
        }
    }
}

/// Runs `<binary> <test args>` and captures what it prints on either stream.
pub async fn run_test<R: CommandRunner + ?Sized>(
    descriptor: &PackageDescriptor,
    artifact: &InstalledArtifact,
    runner: &R,
) -> Result<Verification> {
    if artifact.name != descriptor.name || artifact.version != descriptor.version {
        return Err(BrewtapError::ValidationError(format!(
            "installed artifact {} {} does not belong to {} {}",
            artifact.name, artifact.version, descriptor.name, descriptor.version
        )));
    }
    if !artifact.binary_path.is_file() {
        return Err(BrewtapError::NotFound(format!(
            "{} is not installed at {}",
            artifact.name,
            artifact.binary_path.display()
        )));
    }

    let spec = CommandSpec::new(&artifact.binary_path).args(descriptor.test.args.iter().cloned());
    debug!("Testing {} with: {}", artifact.name, spec);
    let output = runner.run(&spec).await?;
    if !output.success() {
        // Only the expected output decides the result.
        warn!("{} exited with {}", spec, output.status_display());
    }
    Ok(Verification {
        expected: descriptor.test.expect.clone(),
        output,
    })
}

/// True when the installed binary's output contains the formula's expected text.
pub async fn verify<R: CommandRunner + ?Sized>(
    descriptor: &PackageDescriptor,
    artifact: &InstalledArtifact,
    runner: &R,
) -> Result<bool> {
    let verification = run_test(descriptor, artifact, runner).await?;
    let passed = verification.passed();
    if passed {
        info!("Test passed: output of {} contains '{}'", artifact.name, verification.expected);
    } else {
        warn!(
            "Test failed: output of {} lacks '{}'",
            artifact.name, verification.expected
        );
    }
    Ok(passed)
}

/// Like [`verify`], but a failed assertion is an error carrying the observed output.
pub async fn assert_verified<R: CommandRunner + ?Sized>(
    descriptor: &PackageDescriptor,
    artifact: &InstalledArtifact,
    runner: &R,
) -> Result<()> {
    run_test(descriptor, artifact, runner).await?.into_result()
}
