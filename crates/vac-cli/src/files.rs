//! File helpers with path-annotated errors.
//!
//! Outputs are written to a temporary file in the destination directory and
//! renamed into place, so a failed or interrupted command never leaves a
//! partial key or envelope behind.

use std::{fs, io::Write, path::Path};

use tempfile::NamedTempFile;
use vac_core::VacError;
use vac_crypto::{PublicKey, SigningKeyPair};

use crate::error::{CliError, Result};

/// Who may read a written file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Owner only (private keys)
    Private,
    /// World-readable (public keys, envelopes)
    Public,
}

/// Read a UTF-8 text file.
pub fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(CliError::io(path))
}

/// Read a binary file.
pub fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(CliError::io(path))
}

/// Write `bytes` to `path` via a temporary file and rename.
///
/// Creates the parent directory if needed.
pub fn write_atomic(path: &Path, bytes: &[u8], visibility: Visibility) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(CliError::io(dir))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(CliError::io(dir))?;
    tmp.write_all(bytes).map_err(CliError::io(tmp.path()))?;
    tmp.as_file().sync_all().map_err(CliError::io(tmp.path()))?;
    set_visibility(tmp.as_file(), visibility).map_err(CliError::io(tmp.path()))?;
    tmp.persist(path).map_err(|e| CliError::io(path)(e.error))?;
    Ok(())
}

#[cfg(unix)]
fn set_visibility(file: &fs::File, visibility: Visibility) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    // NamedTempFile is created 0600; only public files need widening.
    if visibility == Visibility::Public {
        file.set_permissions(fs::Permissions::from_mode(0o644))?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn set_visibility(_file: &fs::File, _visibility: Visibility) -> std::io::Result<()> {
    Ok(())
}

/// Load a PKCS#8 PEM private key.
pub fn load_signing_key(path: &Path) -> Result<SigningKeyPair> {
    let pem = read_text(path)?;
    SigningKeyPair::from_pkcs8_pem(&pem).map_err(|e| CliError::vac(path)(VacError::from(e)))
}

/// Load a SubjectPublicKeyInfo PEM public key.
pub fn load_public_key(path: &Path) -> Result<PublicKey> {
    let pem = read_text(path)?;
    PublicKey::from_spki_pem(&pem).map_err(|e| CliError::vac(path)(VacError::from(e)))
}
