//! `vac` binary.
//!
//! # Usage
//!
//! ```bash
//! vac keygen --out keys/
//! vac sign --key keys/signing-key.pem --record run.json --out run.sig.cbor
//! vac verify --key keys/signing-key.pub.pem --sig run.sig.cbor --record run.json
//! ```

use std::{io, process::ExitCode};

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use vac_cli::{Cli, run};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    // Logs go to stderr; stdout carries the report.
    tracing_subscriber::registry().with(fmt::layer().with_writer(io::stderr)).with(filter).init();

    let mut stdout = io::stdout().lock();
    match run(cli.command, &mut stdout).await {
        Ok(outcome) => outcome.exit_code(),
        Err(err) => {
            tracing::error!(error = %err, "command failed");
            ExitCode::FAILURE
        },
    }
}
