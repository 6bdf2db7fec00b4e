//! Subcommand implementations.
//!
//! Each command writes its report to `out` and returns an [`Outcome`].
//! Problems that prevent a verdict are returned as [`CliError`].

use std::{
    collections::BTreeMap,
    fs,
    io::Write,
    path::{Path, PathBuf},
    process::ExitCode,
};

use serde_json::Value;
use tracing::{info, warn};
use vac_core::{SignOptions, Signer, VacError, VerifyJob, verify_batch, verify_str};
use vac_crypto::SigningKeyPair;

use crate::{
    cli::Command,
    error::{CliError, Result},
    files::{self, Visibility},
    report::{self, VerifyReport},
    validator::{self, Validation, ValidatorConfig},
};

/// File name of the generated private key.
pub const PRIVATE_KEY_FILE: &str = "signing-key.pem";

/// File name of the generated public key.
pub const PUBLIC_KEY_FILE: &str = "signing-key.pub.pem";

/// Suffix pairing an envelope with its record in batch mode.
pub const SIGNATURE_SUFFIX: &str = ".sig.cbor";

/// Verdict of a command that ran to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Everything checked out
    Pass,
    /// A check failed; details were written to the report
    Fail,
}

impl Outcome {
    /// Process exit code: 0 for pass, 1 for fail.
    pub fn exit_code(self) -> ExitCode {
        match self {
            Self::Pass => ExitCode::SUCCESS,
            Self::Fail => ExitCode::FAILURE,
        }
    }
}

/// Run a parsed command.
pub async fn run(command: Command, out: &mut dyn Write) -> Result<Outcome> {
    match command {
        Command::Keygen { out: dir } => keygen(&dir, out),
        Command::Sign { key, record, out: sig, issuer, subject } => {
            let options = SignOptions { issuer, subject, ..SignOptions::default() };
            sign(&key, &record, &sig, options, out)
        },
        Command::Verify { key, sig, record, json } => verify(&key, &sig, &record, json, out),
        Command::BatchVerify { key, dir } => batch_verify(&key, &dir, out),
        Command::Validate { schema, sig, validator, timeout_secs } => {
            let config = Command::validator_config(&validator, timeout_secs);
            validate(&config, &schema, &sig, out).await
        },
    }
}

/// Generate a key pair into `dir`.
pub fn keygen(dir: &Path, out: &mut dyn Write) -> Result<Outcome> {
    let key = SigningKeyPair::generate();
    let private_pem = key.to_pkcs8_pem().map_err(|e| CliError::vac(dir)(VacError::from(e)))?;
    let public_pem =
        key.public_key().to_spki_pem().map_err(|e| CliError::vac(dir)(VacError::from(e)))?;

    let private_path = dir.join(PRIVATE_KEY_FILE);
    let public_path = dir.join(PUBLIC_KEY_FILE);
    files::write_atomic(&private_path, private_pem.as_bytes(), Visibility::Private)?;
    files::write_atomic(&public_path, public_pem.as_bytes(), Visibility::Public)?;
    info!(
        fingerprint = %key.public_key().fingerprint(),
        dir = %dir.display(),
        "generated key pair"
    );

    writeln!(out, "Private key: {}", private_path.display())?;
    writeln!(out, "Public key:  {}", public_path.display())?;
    writeln!(out, "Algorithm:   Ed25519 (EdDSA)")?;
    Ok(Outcome::Pass)
}

/// Sign `record_path` with the key at `key_path`, writing the envelope to
/// `sig_path`.
///
/// The envelope file is written only after signing has fully succeeded.
pub fn sign(
    key_path: &Path,
    record_path: &Path,
    sig_path: &Path,
    options: SignOptions,
    out: &mut dyn Write,
) -> Result<Outcome> {
    let key = files::load_signing_key(key_path)?;
    let text = files::read_text(record_path)?;
    let signed =
        Signer::new(&key).options(options).sign_str(&text).map_err(CliError::vac(record_path))?;

    files::write_atomic(sig_path, signed.as_bytes(), Visibility::Public)?;

    let meta = signed.trace_metadata();
    let hash = meta.and_then(|m| m.content_hash.as_deref());
    let session_id = meta.and_then(|m| m.session_id.as_deref());
    let vendor = meta.and_then(|m| m.agent_vendor.as_deref());
    writeln!(out, "Signature:    {}", sig_path.display())?;
    writeln!(out, "Payload hash: {}", hash.unwrap_or(report::NOT_PRESENT))?;
    writeln!(out, "Session ID:   {}", session_id.unwrap_or(report::NOT_PRESENT))?;
    writeln!(out, "Agent vendor: {}", vendor.unwrap_or(report::NOT_PRESENT))?;
    writeln!(out, "Payload size: {} bytes (detached)", signed.payload_len())?;
    Ok(Outcome::Pass)
}

/// Verify the envelope at `sig_path` against `record_path`.
pub fn verify(
    key_path: &Path,
    sig_path: &Path,
    record_path: &Path,
    json: bool,
    out: &mut dyn Write,
) -> Result<Outcome> {
    let key = files::load_public_key(key_path)?;
    let envelope = files::read_bytes(sig_path)?;
    let text = files::read_text(record_path)?;

    let result = verify_str(&envelope, &text, &key);
    if json {
        VerifyReport::new(&result).write_json(out)?;
    } else {
        match &result {
            Ok(verification) => report::write_pass(out, verification)?,
            Err(err) => report::write_fail(out, err)?,
        }
    }

    Ok(if result.is_ok() { Outcome::Pass } else { Outcome::Fail })
}

/// A record/envelope pair found in a batch directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    /// Shared file stem
    pub name: String,
    /// `NAME.json`
    pub record: PathBuf,
    /// `NAME.sig.cbor`
    pub signature: PathBuf,
}

/// Find `NAME.json` files in `dir` and their `NAME.sig.cbor` envelopes,
/// sorted by name.
pub fn scan_batch_dir(dir: &Path) -> Result<Vec<BatchEntry>> {
    let mut entries = BTreeMap::new();
    for entry in fs::read_dir(dir).map_err(CliError::io(dir))? {
        let path = entry.map_err(CliError::io(dir))?.path();
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else { continue };
        let Some(name) = file_name.strip_suffix(".json") else { continue };
        if name.is_empty() {
            continue;
        }
        let signature = dir.join(format!("{name}{SIGNATURE_SUFFIX}"));
        entries.insert(name.to_string(), BatchEntry {
            name: name.to_string(),
            record: path,
            signature,
        });
    }
    Ok(entries.into_values().collect())
}

/// Verify every pair in `dir` in parallel.
pub fn batch_verify(key_path: &Path, dir: &Path, out: &mut dyn Write) -> Result<Outcome> {
    let key = files::load_public_key(key_path)?;
    let entries = scan_batch_dir(dir)?;
    if entries.is_empty() {
        writeln!(out, "FAIL: no NAME.json / NAME{SIGNATURE_SUFFIX} pairs in {}", dir.display())?;
        return Ok(Outcome::Fail);
    }

    // Read everything first; unreadable pairs fail individually.
    let loaded: Vec<std::result::Result<(Vec<u8>, Value), String>> =
        entries.iter().map(load_pair).collect();

    let jobs: Vec<VerifyJob<'_>> = loaded
        .iter()
        .filter_map(|pair| pair.as_ref().ok())
        .map(|(envelope, record)| VerifyJob { envelope, record })
        .collect();
    let mut verified = verify_batch(&jobs, &key).into_iter();

    let mut failed = 0usize;
    for (entry, pair) in entries.iter().zip(&loaded) {
        let verdict = match pair {
            Err(reason) => Err(reason.clone()),
            Ok(_) => match verified.next() {
                Some(Ok(_)) => Ok(()),
                Some(Err(err)) => Err(err.to_string()),
                None => Err("no result".to_string()),
            },
        };
        match verdict {
            Ok(()) => writeln!(out, "PASS  {}", entry.name)?,
            Err(reason) => {
                failed += 1;
                warn!(record = %entry.name, %reason, "batch entry failed");
                writeln!(out, "FAIL  {}: {reason}", entry.name)?;
            },
        }
    }

    let passed = entries.len() - failed;
    writeln!(out, "{passed} passed, {failed} failed, {} total", entries.len())?;
    Ok(if failed == 0 { Outcome::Pass } else { Outcome::Fail })
}

fn load_pair(entry: &BatchEntry) -> std::result::Result<(Vec<u8>, Value), String> {
    let envelope = files::read_bytes(&entry.signature).map_err(|e| e.to_string())?;
    let text = files::read_text(&entry.record).map_err(|e| e.to_string())?;
    let record = vac_core::parse_record(&text).map_err(|e| e.to_string())?;
    Ok((envelope, record))
}

/// Run the external validator on the envelope at `sig_path`.
pub async fn validate(
    config: &ValidatorConfig,
    schema: &Path,
    sig_path: &Path,
    out: &mut dyn Write,
) -> Result<Outcome> {
    let validation = validator::validate(config, schema, sig_path).await?;
    match &validation {
        Validation::Passed { .. } => {
            writeln!(out, "PASS: {} conforms to {}", sig_path.display(), schema.display())?;
        },
        Validation::Failed { code, output } => {
            let code = code.map_or_else(|| "signal".to_string(), |c| c.to_string());
            writeln!(out, "FAIL: {} exited with {code}", config.program)?;
            if !output.is_empty() {
                writeln!(out, "{output}")?;
            }
        },
        Validation::TimedOut => {
            writeln!(out, "FAIL: {} timed out after {:?}", config.program, config.timeout)?;
        },
    }

    Ok(if validation.passed() { Outcome::Pass } else { Outcome::Fail })
}
