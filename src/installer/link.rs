//! Exposing an installed artifact on the command search path.
//!
//! Linking is best effort. The artifact is already installed when this runs,
//! so every failure becomes a [`LinkOutcome::Skipped`] instead of an error.
//!
//! The link is first created under a temporary name in the link directory
//! and then renamed over the destination, so an existing link is replaced in
//! one step and a reader never sees a missing or half-written entry. When a
//! symbolic link cannot be created (unsupported filesystem, missing Windows
//! privilege) a copy is written the same way.

use crate::core::FetchbinError;
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// How the link was realised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    Symlink,
    Copy,
}

/// Why no link was created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum SkipReason {
    /// The link directory is not writable.
    PermissionDenied,
    /// The link path already is the installed artifact.
    AlreadyInPlace,
    /// Any other failure.
    Failed(String),
}

impl From<FetchbinError> for SkipReason {
    fn from(error: FetchbinError) -> Self {
        match error {
            FetchbinError::PermissionDenied {
                ..
            } => Self::PermissionDenied,
            other => Self::Failed(other.to_string()),
        }
    }
}

/// Result of a link attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LinkOutcome {
    Linked {
        path: PathBuf,
        kind: LinkKind,
    },
    Skipped {
        path: PathBuf,
        reason: SkipReason,
    },
}

impl LinkOutcome {
    /// Whether the link is missing for a reason the user should hear about.
    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        matches!(
            self,
            Self::Skipped {
                reason: SkipReason::PermissionDenied | SkipReason::Failed(_),
                ..
            }
        )
    }
}

/// Create or replace `link_path` so it resolves to `final_path`.
pub fn link_artifact(final_path: &Path, link_path: &Path) -> LinkOutcome {
    let skipped = |reason: SkipReason| LinkOutcome::Skipped {
        path: link_path.to_path_buf(),
        reason,
    };

    let Some(file_name) = link_path.file_name() else {
        return skipped(SkipReason::Failed(format!("'{}' has no file name", link_path.display())));
    };
    let link_dir = match link_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    if let Err(e) = std::fs::create_dir_all(&link_dir) {
        return skipped(link_error("create link directory", &link_dir, &e).into());
    }

    if is_same_location(final_path, &link_dir, file_name) {
        debug!("Link path {} is the installed artifact", link_path.display());
        return skipped(SkipReason::AlreadyInPlace);
    }

    let symlink_error = match replace_with_symlink(final_path, &link_dir, link_path) {
        Ok(()) => {
            info!("Linked {} -> {}", link_path.display(), final_path.display());
            return LinkOutcome::Linked {
                path: link_path.to_path_buf(),
                kind: LinkKind::Symlink,
            };
        }
        Err(e) => e,
    };
    debug!("Symlink at {} failed ({symlink_error}), falling back to copy", link_path.display());

    match replace_with_copy(final_path, &link_dir, link_path) {
        Ok(()) => {
            info!("Copied {} to {}", final_path.display(), link_path.display());
            LinkOutcome::Linked {
                path: link_path.to_path_buf(),
                kind: LinkKind::Copy,
            }
        }
        Err(e) => {
            let error = link_error("create link", link_path, &e);
            info!("Skipping link: {error}");
            skipped(error.into())
        }
    }
}

/// Permission and read-only failures are [`FetchbinError::PermissionDenied`];
/// anything else is a plain filesystem error.
fn link_error(operation: &str, path: &Path, error: &io::Error) -> FetchbinError {
    match error.kind() {
        io::ErrorKind::PermissionDenied | io::ErrorKind::ReadOnlyFilesystem => FetchbinError::PermissionDenied {
            operation: operation.to_string(),
            path: path.display().to_string(),
        },
        _ => FetchbinError::from_io(operation, path, error),
    }
}

fn is_same_location(final_path: &Path, link_dir: &Path, file_name: &std::ffi::OsStr) -> bool {
    match (final_path.canonicalize(), link_dir.canonicalize()) {
        (Ok(target), Ok(dir)) => dir.join(file_name) == target,
        _ => false,
    }
}

fn temp_prefix(link_path: &Path) -> String {
    let stem = link_path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    format!(".{stem}.")
}

fn replace_with_symlink(final_path: &Path, link_dir: &Path, link_path: &Path) -> io::Result<()> {
    let target = std::path::absolute(final_path)?;
    let temp = tempfile::Builder::new()
        .prefix(&temp_prefix(link_path))
        .suffix(".link")
        .make_in(link_dir, |path| create_symlink(&target, path))?;
    temp.into_temp_path().persist(link_path).map_err(|e| e.error)
}

fn replace_with_copy(final_path: &Path, link_dir: &Path, link_path: &Path) -> io::Result<()> {
    let mut temp =
        tempfile::Builder::new().prefix(&temp_prefix(link_path)).suffix(".link").tempfile_in(link_dir)?;
    let mut source = std::fs::File::open(final_path)?;
    io::copy(&mut source, temp.as_file_mut())?;
    temp.as_file().sync_all()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(
            temp.path(),
            std::fs::Permissions::from_mode(crate::constants::EXECUTABLE_MODE),
        )?;
    }

    temp.into_temp_path().persist(link_path).map_err(|e| e.error)
}

#[cfg(unix)]
fn create_symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn create_symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(target, link)
}

#[cfg(not(any(unix, windows)))]
fn create_symlink(_target: &Path, _link: &Path) -> io::Result<()> {
    Err(io::Error::new(io::ErrorKind::Unsupported, "symbolic links are not supported"))
}
