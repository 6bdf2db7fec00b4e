//! CLI error types.
//!
//! A [`CliError`] means the command could not run to a verdict: a file is
//! missing, a key does not load, stdout is closed. A verification that runs
//! and fails is not an error; it is reported as
//! [`Outcome::Fail`](crate::Outcome::Fail).

use std::{io, path::PathBuf};

use thiserror::Error;
use vac_core::VacError;

/// Convenience alias for results in this crate.
pub type Result<T> = std::result::Result<T, CliError>;

/// Errors that stop a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Reading or writing a file failed
    #[error("{}: {source}", path.display())]
    Io {
        /// File or directory involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// Writing the report to the output stream failed
    #[error("output: {0}")]
    Output(#[from] io::Error),

    /// Signing pipeline error, with the file it concerns
    #[error("{}: {source}", path.display())]
    Vac {
        /// File being processed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: VacError,
    },

    /// JSON report serialization failed
    #[error("report: {0}")]
    Report(#[from] serde_json::Error),

    /// The external validator could not be started
    #[error("validator {program}: {source}")]
    ValidatorSpawn {
        /// Program name
        program: String,
        /// Underlying error
        #[source]
        source: io::Error,
    },
}

impl CliError {
    /// Attach `path` to an I/O error.
    pub fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }

    /// Attach `path` to a pipeline error.
    pub fn vac(path: impl Into<PathBuf>) -> impl FnOnce(VacError) -> Self {
        let path = path.into();
        move |source| Self::Vac { path, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_names_the_path() {
        let err = CliError::io("/tmp/missing.json")(io::Error::from(io::ErrorKind::NotFound));
        assert!(err.to_string().starts_with("/tmp/missing.json: "));
    }

    #[test]
    fn vac_error_names_the_path() {
        let err = CliError::vac("key.pem")(VacError::KeyLoad { reason: "not PEM".to_string() });
        assert_eq!(err.to_string(), "key.pem: key load failed: not PEM");
    }
}
