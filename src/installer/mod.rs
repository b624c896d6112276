//! Promotion of verified artifacts into their final location.
//!
//! # Atomicity
//!
//! The fetcher writes its temporary file into the install directory, so
//! promotion is a single `rename(2)` within one filesystem. Executable
//! permissions are applied to the temporary file *before* the rename, which
//! means a file at the final path is always complete, verified and runnable:
//!
//! ```text
//! bin/.tool.Ab12Cd.download  --chmod 755-->  --rename-->  bin/tool
//! ```
//!
//! A previous installation at the final path stays untouched until the rename
//! replaces it, so a failure at any earlier stage leaves it in service.

pub mod link;

pub use link::{LinkKind, LinkOutcome, SkipReason, link_artifact};

use crate::core::{FetchbinError, Result};
use crate::verify::{Verification, VerifiedArtifact};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// An artifact in its final location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstalledArtifact {
    /// Where the executable now lives
    pub final_path: PathBuf,
    /// Permission bits of the installed file
    pub permission_bits: u32,
    /// Outcome of exposing the artifact on the command path, if requested
    pub link: Option<LinkOutcome>,
}

/// Promote `artifact` to `final_path` and optionally link it at `link_path`.
///
/// Returns the installed artifact together with the verification outcome the
/// artifact carried.
///
/// # Errors
///
/// Promotion failures, including an install directory that is not writable,
/// are fatal [`FetchbinError::FileSystemError`]s. Link failures never are;
/// they are reported in [`InstalledArtifact::link`].
pub fn install(
    artifact: VerifiedArtifact,
    final_path: &Path,
    link_path: Option<&Path>,
) -> Result<(InstalledArtifact, Verification)> {
    let (download, verification) = artifact.into_parts();
    let temp_path = download.into_temp_path();

    set_executable(&temp_path)?;

    temp_path.persist(final_path).map_err(|e| FetchbinError::from_io("promote artifact", final_path, &e.error))?;
    info!("Installed {}", final_path.display());

    let permission_bits = permission_bits(final_path)?;
    let link = link_path.map(|link_path| link_artifact(final_path, link_path));

    Ok((
        InstalledArtifact {
            final_path: final_path.to_path_buf(),
            permission_bits,
            link,
        },
        verification,
    ))
}

#[cfg(unix)]
fn set_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    std::fs::set_permissions(path, std::fs::Permissions::from_mode(crate::constants::EXECUTABLE_MODE))
        .map_err(|e| FetchbinError::from_io("set executable permission", path, &e))
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(unix)]
fn permission_bits(path: &Path) -> Result<u32> {
    use std::os::unix::fs::PermissionsExt;

    let metadata =
        std::fs::metadata(path).map_err(|e| FetchbinError::from_io("read artifact metadata", path, &e))?;
    Ok(metadata.permissions().mode() & 0o777)
}

#[cfg(not(unix))]
fn permission_bits(path: &Path) -> Result<u32> {
    let metadata =
        std::fs::metadata(path).map_err(|e| FetchbinError::from_io("read artifact metadata", path, &e))?;
    Ok(if metadata.permissions().readonly() {
        0o555
    } else {
        crate::constants::EXECUTABLE_MODE
    })
}
