//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::validator::{DEFAULT_VALIDATOR, ValidatorConfig};

/// Sign and verify agent conversation records with detached COSE_Sign1
/// envelopes.
#[derive(Parser, Debug)]
#[command(name = "vac")]
#[command(about = "Detached COSE_Sign1 signatures for agent conversation records")]
#[command(version)]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` takes
    /// precedence
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Generate an Ed25519 key pair as PEM files
    Keygen {
        /// Directory for `signing-key.pem` and `signing-key.pub.pem`
        #[arg(long)]
        out: PathBuf,
    },

    /// Sign a JSON record, writing a detached envelope
    Sign {
        /// PKCS#8 PEM private key
        #[arg(long)]
        key: PathBuf,
        /// JSON record to sign
        #[arg(long)]
        record: PathBuf,
        /// Output path for the `.sig.cbor` envelope
        #[arg(long)]
        out: PathBuf,
        /// Issuer claim, instead of the record's model provider
        #[arg(long)]
        issuer: Option<String>,
        /// Subject claim, instead of the record's session id
        #[arg(long)]
        subject: Option<String>,
    },

    /// Verify an envelope against a JSON record
    Verify {
        /// SubjectPublicKeyInfo PEM public key
        #[arg(long)]
        key: PathBuf,
        /// Envelope file
        #[arg(long)]
        sig: PathBuf,
        /// JSON record the envelope should cover
        #[arg(long)]
        record: PathBuf,
        /// Emit a JSON report instead of text
        #[arg(long)]
        json: bool,
    },

    /// Verify every `NAME.json` / `NAME.sig.cbor` pair in a directory
    BatchVerify {
        /// SubjectPublicKeyInfo PEM public key
        #[arg(long)]
        key: PathBuf,
        /// Directory to scan
        dir: PathBuf,
    },

    /// Validate an envelope against a CDDL schema with an external tool
    Validate {
        /// CDDL schema file
        #[arg(long)]
        schema: PathBuf,
        /// Envelope file
        #[arg(long)]
        sig: PathBuf,
        /// Validator program, invoked as `<program> <schema> validate <file>`
        #[arg(long, default_value = DEFAULT_VALIDATOR)]
        validator: String,
        /// Seconds before the validator is killed
        #[arg(long, default_value_t = 60)]
        timeout_secs: u64,
    },
}

impl Command {
    /// Validator settings for [`Command::Validate`].
    pub fn validator_config(validator: &str, timeout_secs: u64) -> ValidatorConfig {
        ValidatorConfig {
            program: validator.to_string(),
            timeout: std::time::Duration::from_secs(timeout_secs),
        }
    }
}
