// brewtap-core/src/process.rs
//! Structured subprocess invocation. Runners report what happened; callers decide what a
//! non-zero exit means.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use brewtap_common::error::{BrewtapError, Result};
use tokio::process::Command;
use tracing::{debug, error};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub envs: BTreeMap<String, String>,
    /// Start from an empty environment instead of inheriting ours.
    pub clear_env: bool,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            envs: BTreeMap::new(),
            clear_env: false,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.insert(key.into(), value.into());
        self
    }

    pub fn envs(mut self, vars: BTreeMap<String, String>) -> Self {
        self.envs.extend(vars);
        self
    }

    pub fn env_clear(mut self) -> Self {
        self.clear_env = true;
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            if arg.contains(char::is_whitespace) {
                write!(f, " \"{arg}\"")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    /// Exit code; `None` when the process was killed by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Stdout followed by stderr, the shell's `2>&1` view.
    pub fn combined(&self) -> String {
        let mut out = self.stdout.clone();
        if !self.stderr.is_empty() {
            if !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&self.stderr);
        }
        out
    }

    pub fn status_display(&self) -> String {
        match self.status {
            Some(code) => format!("exit status {code}"),
            None => "terminated by signal".to_string(),
        }
    }
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs `spec` to completion. Errors only when the program could not be started.
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput>;
}

/// Runs commands on the host with tokio.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        debug!(
            "Running command: {} (cwd: {:?}, envs: {:?})",
            spec,
            spec.cwd,
            spec.envs.keys().collect::<Vec<_>>()
        );

        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args);
        cmd.kill_on_drop(true);
        if let Some(dir) = &spec.cwd {
            cmd.current_dir(dir);
        }
        if spec.clear_env {
            cmd.env_clear();
        }
        cmd.envs(&spec.envs);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.stdin(Stdio::null());

        let output = cmd.output().await.map_err(|e| {
            error!("Failed to execute {}: {}", spec.program.display(), e);
            BrewtapError::CommandExecError(format!("{}: {e}", spec.program.display()))
        })?;

        let result = CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        if result.success() {
            debug!("Command finished successfully.");
        } else {
            debug!("Command failed with {}", result.status_display());
            if !result.stdout.trim().is_empty() {
                debug!("Stdout:\n{}", result.stdout.trim());
            }
            if !result.stderr.trim().is_empty() {
                debug!("Stderr:\n{}", result.stderr.trim());
            }
        }
        Ok(result)
    }
}
