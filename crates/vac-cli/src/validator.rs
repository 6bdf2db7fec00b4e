//! External CDDL schema validation.
//!
//! The validator is run as `<program> <schema> validate <file>` with output
//! captured. A non-zero exit status or a timeout is a failed validation,
//! never a crash of the calling command.

use std::{path::Path, process::Stdio, time::Duration};

use tokio::{process::Command, time::timeout};
use tracing::{debug, warn};

use crate::error::{CliError, Result};

/// Default validator program.
pub const DEFAULT_VALIDATOR: &str = "cddl";

/// Default validator time budget.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// How to run the external validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorConfig {
    /// Program to execute, looked up on `PATH`
    pub program: String,
    /// Time allowed before the validator is killed
    pub timeout: Duration,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self { program: DEFAULT_VALIDATOR.to_string(), timeout: DEFAULT_TIMEOUT }
    }
}

/// Result of one validator run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    /// Validator exited successfully
    Passed {
        /// Combined stdout and stderr
        output: String,
    },
    /// Validator exited with a failure status
    Failed {
        /// Exit code, `None` if killed by a signal
        code: Option<i32>,
        /// Combined stdout and stderr
        output: String,
    },
    /// Validator did not finish within the configured timeout
    TimedOut,
}

impl Validation {
    /// True for [`Validation::Passed`].
    pub fn passed(&self) -> bool {
        matches!(self, Self::Passed { .. })
    }
}

/// Validate `file` against `schema`.
///
/// # Errors
///
/// - `CliError::ValidatorSpawn` if the program cannot be started
pub async fn validate(config: &ValidatorConfig, schema: &Path, file: &Path) -> Result<Validation> {
    debug!(
        program = %config.program,
        schema = %schema.display(),
        file = %file.display(),
        "running validator"
    );

    let child = Command::new(&config.program)
        .arg(schema)
        .arg("validate")
        .arg(file)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| CliError::ValidatorSpawn { program: config.program.clone(), source })?;

    let Ok(output) = timeout(config.timeout, child.wait_with_output()).await else {
        warn!(program = %config.program, timeout = ?config.timeout, "validator timed out");
        return Ok(Validation::TimedOut);
    };
    let output = output
        .map_err(|source| CliError::ValidatorSpawn { program: config.program.clone(), source })?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let combined = format!("{stdout}{stderr}").trim().to_string();

    if output.status.success() {
        Ok(Validation::Passed { output: combined })
    } else {
        warn!(program = %config.program, status = %output.status, "validator rejected input");
        Ok(Validation::Failed { code: output.status.code(), output: combined })
    }
}
