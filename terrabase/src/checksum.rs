//! SHA-256 content hashing and checksum sidecars.
//!
//! Elevation tiles and mosaic outputs carry a `<file>.sha256` sidecar
//! holding the lowercase hex digest of the file contents. Verification is
//! optional on the read side; a mismatch is always surfaced as a typed
//! error, never ignored.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use thiserror::Error;

/// Buffer size for reading files during checksum calculation (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Extension appended to the data file name for sidecars.
pub const SIDECAR_EXTENSION: &str = "sha256";

/// Result type for checksum operations.
pub type ChecksumResult<T> = Result<T, ChecksumError>;

/// Errors raised while computing or verifying checksums.
#[derive(Debug, Error)]
pub enum ChecksumError {
    /// Failed to read the data file or its sidecar.
    #[error("failed to read {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to write a sidecar file.
    #[error("failed to write {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// No sidecar exists next to the data file.
    #[error("no checksum sidecar found for {path}")]
    MissingSidecar { path: PathBuf },

    /// Recorded and computed digests disagree.
    #[error("checksum mismatch for {filename}: expected {expected}, got {actual}")]
    Mismatch {
        filename: String,
        expected: String,
        actual: String,
    },
}

/// SHA-256 digest of a byte slice as lowercase hex.
pub fn digest_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// SHA-256 digest of a file's contents as lowercase hex, read in
/// [`BUFFER_SIZE`] chunks.
pub fn digest_file(path: &Path) -> ChecksumResult<String> {
    let mut file = File::open(path).map_err(|source| ChecksumError::ReadFailed {
        path: path.to_path_buf(),
        source,
    })?;

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let bytes_read = file
            .read(&mut buffer)
            .map_err(|source| ChecksumError::ReadFailed {
                path: path.to_path_buf(),
                source,
            })?;

        if bytes_read == 0 {
            break;
        }

        hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Sidecar path for a data file: the file name with `.sha256` appended.
pub fn sidecar_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".");
    name.push(SIDECAR_EXTENSION);
    PathBuf::from(name)
}

/// Compute a file's digest and write it to the sidecar.
///
/// Returns the sidecar path.
pub fn write_sidecar(path: &Path) -> ChecksumResult<PathBuf> {
    let digest = digest_file(path)?;
    let sidecar = sidecar_path(path);
    fs::write(&sidecar, &digest).map_err(|source| ChecksumError::WriteFailed {
        path: sidecar.clone(),
        source,
    })?;
    Ok(sidecar)
}

/// Verify a file against its sidecar.
///
/// # Errors
///
/// `MissingSidecar` when no sidecar exists, `Mismatch` when the digests
/// disagree, `ReadFailed` when either file cannot be read.
pub fn verify_sidecar(path: &Path) -> ChecksumResult<()> {
    let sidecar = sidecar_path(path);
    if !sidecar.exists() {
        return Err(ChecksumError::MissingSidecar {
            path: path.to_path_buf(),
        });
    }

    let expected = fs::read_to_string(&sidecar).map_err(|source| ChecksumError::ReadFailed {
        path: sidecar.clone(),
        source,
    })?;
    let expected = expected.trim().to_ascii_lowercase();

    let actual = digest_file(path)?;
    if actual != expected {
        return Err(ChecksumError::Mismatch {
            filename: path
                .file_name()
                .unwrap_or_default()
                .to_string_lossy()
                .to_string(),
            expected,
            actual,
        });
    }

    Ok(())
}
