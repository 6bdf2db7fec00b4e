//! VAC Command-Line Interface
//!
//! Library half of the `vac` binary. Commands take an output stream instead
//! of printing, so they can be driven from tests with a `Vec<u8>`.
//!
//! # Commands
//!
//! | Command | Effect |
//! |---|---|
//! | `keygen --out DIR` | write `signing-key.pem` and `signing-key.pub.pem` |
//! | `sign --key --record --out` | write a detached `.sig.cbor` envelope |
//! | `verify --key --sig --record [--json]` | PASS/FAIL report |
//! | `batch-verify --key DIR` | verify every `NAME.json` / `NAME.sig.cbor` pair |
//! | `validate --schema --sig` | run an external CDDL validator |
//!
//! Exit status is 0 when the command passes and 1 otherwise.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod cli;
pub mod commands;
pub mod error;
pub mod files;
pub mod report;
pub mod validator;

pub use cli::{Cli, Command};
pub use commands::{Outcome, run};
pub use error::{CliError, Result};
pub use validator::ValidatorConfig;
