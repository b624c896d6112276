//! Integrity verification of downloaded artifacts.
//!
//! A download is never trusted on its own. Before the installer may promote
//! it, the verifier either
//!
//! - proves it matches a published SHA-256 digest (and size, when known), or
//! - in **degraded mode**, when nothing was published, checks that it is
//!   non-empty and carries an executable header for the target OS.
//!
//! Degraded mode is reported as [`Verification::Degraded`] so callers can
//! surface it; it is never mistaken for full verification.
//!
//! The installer only accepts a [`VerifiedArtifact`], which can only be
//! produced here, so an unverified download cannot reach the final path.

pub mod header;
pub mod manifest;

pub use header::ExecutableFormat;
pub use manifest::ChecksumManifest;

use crate::core::{FetchbinError, Result};
use crate::fetcher::DownloadResult;
use crate::platform::OperatingSystem;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::io::AsyncReadExt;
use tracing::{debug, info};

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Published metadata for one artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpectedIntegrity {
    /// Expected length in bytes
    pub size: Option<u64>,
    /// Expected SHA-256 digest, hex encoded, optionally `sha256:` prefixed
    pub sha256: Option<String>,
    /// Why no digest is available, reported in degraded mode
    pub unavailable_reason: Option<String>,
}

impl ExpectedIntegrity {
    /// Integrity backed by a published digest.
    #[must_use]
    pub fn digest(sha256: impl Into<String>) -> Self {
        Self {
            sha256: Some(sha256.into()),
            ..Self::default()
        }
    }

    /// No digest is available; verification will be degraded.
    #[must_use]
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            unavailable_reason: Some(reason.into()),
            ..Self::default()
        }
    }

    /// Fill in the expected size when nothing more authoritative is known.
    ///
    /// A size published alongside the digest takes precedence over one the
    /// server announced for this transfer.
    #[must_use]
    pub fn or_size(mut self, size: Option<u64>) -> Self {
        if self.size.is_none() {
            self.size = size;
        }
        self
    }

    fn normalized_digest(&self) -> Option<String> {
        self.sha256.as_deref().map(|d| d.trim().strip_prefix("sha256:").unwrap_or(d.trim()).to_ascii_lowercase())
    }
}

/// Outcome of a successful verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Verification {
    /// Digest matched.
    Verified {
        sha256: String,
    },
    /// No digest was available; only size and header were checked.
    Degraded {
        reason: String,
    },
}

impl Verification {
    /// Whether this outcome falls short of full verification.
    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }
}

/// A download that passed verification and may be promoted.
#[derive(Debug)]
pub struct VerifiedArtifact {
    download: DownloadResult,
    verification: Verification,
}

impl VerifiedArtifact {
    /// The verification outcome.
    #[must_use]
    pub const fn verification(&self) -> &Verification {
        &self.verification
    }

    /// The underlying download.
    #[must_use]
    pub const fn download(&self) -> &DownloadResult {
        &self.download
    }

    pub(crate) fn into_parts(self) -> (DownloadResult, Verification) {
        (self.download, self.verification)
    }
}

/// Verify a download for `artifact` built for `os`.
///
/// On failure the download is dropped, which deletes its temporary file.
///
/// # Errors
///
/// [`FetchbinError::IntegrityMismatch`] when the digest, size or header does
/// not match.
pub async fn verify_download(
    download: DownloadResult,
    artifact: &str,
    os: OperatingSystem,
    expected: &ExpectedIntegrity,
) -> Result<VerifiedArtifact> {
    let verification = verify_file(download.path(), artifact, os, expected).await?;
    Ok(VerifiedArtifact {
        download,
        verification,
    })
}

/// Verify an arbitrary file on disk.
pub async fn verify_file(
    path: &Path,
    artifact: &str,
    os: OperatingSystem,
    expected: &ExpectedIntegrity,
) -> Result<Verification> {
    let mismatch = |expected: String, actual: String| FetchbinError::IntegrityMismatch {
        artifact: artifact.to_string(),
        expected,
        actual,
    };

    let size = tokio::fs::metadata(path)
        .await
        .map_err(|e| FetchbinError::from_io("read artifact metadata", path, &e))?
        .len();

    if let Some(expected_size) = expected.size {
        if size != expected_size {
            return Err(mismatch(format!("{expected_size} bytes"), format!("{size} bytes")));
        }
    }

    if let Some(expected_digest) = expected.normalized_digest() {
        let actual = compute_sha256(path).await?;
        if actual != expected_digest {
            return Err(mismatch(format!("sha256:{expected_digest}"), format!("sha256:{actual}")));
        }
        info!("Checksum verified for {artifact}");
        return Ok(Verification::Verified {
            sha256: actual,
        });
    }

    // Degraded mode
    if size == 0 {
        return Err(mismatch("non-empty file".to_string(), "0 bytes".to_string()));
    }

    let wanted = ExecutableFormat::for_os(os);
    let prefix = read_prefix(path, header::HEADER_LEN).await?;
    match ExecutableFormat::sniff(&prefix) {
        Some(found) if found == wanted => {}
        Some(found) => {
            return Err(mismatch(
                format!("{} executable", wanted.name()),
                format!("{} executable", found.name()),
            ));
        }
        None => {
            return Err(mismatch(
                format!("{} executable", wanted.name()),
                "unrecognised file header".to_string(),
            ));
        }
    }

    let reason = format!(
        "{}; only size and {} header were checked",
        expected.unavailable_reason.as_deref().unwrap_or("no checksum available"),
        wanted.name()
    );
    info!("Degraded verification for {artifact}: {reason}");
    Ok(Verification::Degraded {
        reason,
    })
}

/// Compute the lowercase hex SHA-256 of a file without loading it into memory.
pub async fn compute_sha256(path: &Path) -> Result<String> {
    debug!("Computing SHA256 checksum for: {}", path.display());

    let read_error = |e: std::io::Error| FetchbinError::from_io("read artifact", path, &e);
    let mut file = tokio::fs::File::open(path).await.map_err(read_error)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];

    loop {
        let read = file.read(&mut buffer).await.map_err(read_error)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

async fn read_prefix(path: &Path, len: usize) -> Result<Vec<u8>> {
    let read_error = |e: std::io::Error| FetchbinError::from_io("read artifact header", path, &e);
    let file = tokio::fs::File::open(path).await.map_err(read_error)?;
    let mut prefix = Vec::with_capacity(len);
    file.take(len as u64).read_to_end(&mut prefix).await.map_err(read_error)?;
    Ok(prefix)
}
