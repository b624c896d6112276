//! Error handling for fetchbin
//!
//! This module provides the typed error taxonomy for the provisioning engine and
//! the user-facing error reporting used by the CLI. The error system is built
//! around two types:
//!
//! - [`FetchbinError`] - Enumerated failures, one variant per failing stage
//! - [`ErrorContext`] - Wrapper that adds a suggestion and details for CLI users
//!
//! # Stages
//!
//! Every variant maps to the stage that produced it through
//! [`FetchbinError::stage`]. The CLI prints exactly one diagnostic line that
//! starts with this stage name, e.g.
//!
//! ```text
//! error[FetchFailed]: Download failed with HTTP 404 from https://host/v1.0.0/tool-linux-amd64
//! ```
//!
//! # Recoverability
//!
//! Only [`FetchbinError::TransportError`] is retried (by the fetcher, with
//! bounded exponential backoff). [`FetchbinError::PermissionDenied`] is produced
//! by the link step only; the installer records it as a skipped link and the
//! run still succeeds. All other variants are terminal for the invocation.
//!
//! # Examples
//!
//! ```rust,no_run
//! use fetchbin_cli::core::{FetchbinError, user_friendly_error};
//!
//! let error = FetchbinError::UnsupportedPlatform {
//!     os: "plan9".to_string(),
//!     arch: "amd64".to_string(),
//! };
//! assert_eq!(error.stage(), "UnsupportedPlatform");
//!
//! let ctx = user_friendly_error(anyhow::Error::from(error));
//! ctx.display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for fetchbin operations
///
/// Each variant carries the values needed to diagnose the failure without
/// re-running the command: raw platform strings, the rejected version, the
/// URL and HTTP status, or the expected and actual integrity values.
///
/// # Error Categories
///
/// ## Resolution (no network access has happened yet)
/// - [`UnsupportedPlatform`] - OS/architecture pair has no published artifact
/// - [`InvalidVersion`] - Version string is not a strict semantic version
/// - [`InvalidArtifactName`] - Artifact name cannot be safely placed in a URL
///
/// ## Transfer
/// - [`FetchFailed`] - Final HTTP response was not a success status
/// - [`TooManyRedirects`] - Redirect chain exceeded the hop bound
/// - [`TransportError`] - DNS, connection, timeout or truncated-body failure
///
/// ## Verification and placement
/// - [`IntegrityMismatch`] - Size, digest or executable header did not match
/// - [`PermissionDenied`] - Link creation was refused by the filesystem
/// - [`FileSystemError`] - Promotion into the install directory failed
///
/// ## Control
/// - [`Cancelled`] - Caller cancellation or overall timeout
/// - [`ConfigError`] - Invalid configuration values
///
/// [`UnsupportedPlatform`]: FetchbinError::UnsupportedPlatform
/// [`InvalidVersion`]: FetchbinError::InvalidVersion
/// [`InvalidArtifactName`]: FetchbinError::InvalidArtifactName
/// [`FetchFailed`]: FetchbinError::FetchFailed
/// [`TooManyRedirects`]: FetchbinError::TooManyRedirects
/// [`TransportError`]: FetchbinError::TransportError
/// [`IntegrityMismatch`]: FetchbinError::IntegrityMismatch
/// [`PermissionDenied`]: FetchbinError::PermissionDenied
/// [`FileSystemError`]: FetchbinError::FileSystemError
/// [`Cancelled`]: FetchbinError::Cancelled
/// [`ConfigError`]: FetchbinError::ConfigError
#[derive(Error, Debug)]
pub enum FetchbinError {
    /// The host OS and architecture do not map to a published artifact.
    ///
    /// The raw, unmapped values are kept verbatim for diagnostics.
    #[error("Unsupported platform: {os}-{arch}")]
    UnsupportedPlatform {
        /// Operating system name as reported or supplied
        os: String,
        /// CPU architecture name as reported or supplied
        arch: String,
    },

    /// The requested version is not a strict semantic version.
    #[error("Invalid version '{version}': {reason}")]
    InvalidVersion {
        /// The rejected version string
        version: String,
        /// Why it was rejected
        reason: String,
    },

    /// The artifact name contains characters that are unsafe in URLs or paths.
    #[error("Invalid artifact name '{name}'")]
    InvalidArtifactName {
        /// The rejected name
        name: String,
    },

    /// The final response after redirects had a non-success status.
    #[error("Download failed with HTTP {status} from {url}")]
    FetchFailed {
        /// HTTP status code of the final response
        status: u16,
        /// URL that produced the response
        url: String,
    },

    /// The redirect chain was longer than the configured bound.
    #[error("Too many redirects ({hops}) while fetching {url}")]
    TooManyRedirects {
        /// URL of the last hop that still redirected
        url: String,
        /// Number of redirects that were followed
        hops: usize,
    },

    /// Network-layer failure: DNS, connect, reset, timeout or truncated body.
    #[error("Transport error while fetching {url}: {reason}")]
    TransportError {
        /// URL being fetched when the failure happened
        url: String,
        /// Underlying cause, including its source chain
        reason: String,
    },

    /// Downloaded bytes did not match the expected size, digest or header.
    #[error("Integrity check failed for {artifact}: expected {expected}, got {actual}")]
    IntegrityMismatch {
        /// Artifact file name
        artifact: String,
        /// Expected value (digest, size or header kind)
        expected: String,
        /// Observed value
        actual: String,
    },

    /// The filesystem refused to create a link for lack of permission.
    #[error("Permission denied: {operation} at {path}")]
    PermissionDenied {
        /// The operation that was denied
        operation: String,
        /// Path where permission was denied
        path: String,
    },

    /// The operation was cancelled by the caller or hit the overall deadline.
    #[error("Operation cancelled: {reason}")]
    Cancelled {
        /// What triggered the cancellation
        reason: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration error
        message: String,
    },

    /// File system error while placing the artifact
    #[error("File system error: {operation} at {path}: {reason}")]
    FileSystemError {
        /// The file system operation that failed
        operation: String,
        /// Path where the error occurred
        path: String,
        /// Underlying cause
        reason: String,
    },

    /// Other error
    #[error("{message}")]
    Other {
        /// Generic error message
        message: String,
    },
}

impl FetchbinError {
    /// Name of the stage that produced this error, used as the prefix of the
    /// one-line CLI diagnostic.
    #[must_use]
    pub const fn stage(&self) -> &'static str {
        match self {
            Self::UnsupportedPlatform {
                ..
            } => "UnsupportedPlatform",
            Self::InvalidVersion {
                ..
            } => "InvalidVersion",
            Self::InvalidArtifactName {
                ..
            } => "InvalidArtifactName",
            Self::FetchFailed {
                ..
            } => "FetchFailed",
            Self::TooManyRedirects {
                ..
            } => "TooManyRedirects",
            Self::TransportError {
                ..
            } => "TransportError",
            Self::IntegrityMismatch {
                ..
            } => "IntegrityMismatch",
            Self::PermissionDenied {
                ..
            } => "PermissionDenied",
            Self::Cancelled {
                ..
            } => "Cancelled",
            Self::ConfigError {
                ..
            } => "ConfigError",
            Self::FileSystemError {
                ..
            } => "FileSystemError",
            Self::Other {
                ..
            } => "Error",
        }
    }

    /// Whether the fetcher may retry after this error.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::TransportError { .. })
    }

    /// Build a [`FetchbinError::FileSystemError`] from an IO error.
    ///
    /// Permission failures outside the link step are fatal and land here too;
    /// [`FetchbinError::PermissionDenied`] is reserved for linking.
    pub fn from_io(
        operation: impl Into<String>,
        path: &std::path::Path,
        error: &std::io::Error,
    ) -> Self {
        Self::FileSystemError {
            operation: operation.into(),
            path: path.display().to_string(),
            reason: error.to_string(),
        }
    }
}

/// Error context wrapper that provides user-friendly error information
///
/// `ErrorContext` wraps a [`FetchbinError`] and adds an optional suggestion for
/// resolution and optional details. [`ErrorContext::display`] prints a single
/// diagnostic line that names the failing stage.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: FetchbinError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub const fn new(error: FetchbinError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Render the single diagnostic line without colors.
    #[must_use]
    pub fn diagnostic_line(&self) -> String {
        self.render(&self.head(), self.hint().as_deref())
    }

    /// Display the error to stderr as one colored line.
    ///
    /// Details are only emitted through `tracing` at debug level so that the
    /// terminal output stays a single line.
    pub fn display(&self) {
        let head = self.head().red().bold().to_string();
        let hint = self.hint().map(|hint| hint.green().to_string());
        eprintln!("{}", self.render(&head, hint.as_deref()));

        if let Some(details) = &self.details {
            tracing::debug!("{details}");
        }
    }
}

impl ErrorContext {
    fn head(&self) -> String {
        format!("error[{}]", self.error.stage())
    }

    fn hint(&self) -> Option<String> {
        self.suggestion.as_ref().map(|suggestion| format!("(hint: {suggestion})"))
    }

    fn render(&self, head: &str, hint: Option<&str>) -> String {
        match hint {
            Some(hint) => format!("{head}: {} {hint}", self.error),
            None => format!("{head}: {}", self.error),
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error to a user-friendly [`ErrorContext`] with a suggestion
///
/// [`FetchbinError`] values are recognised even when wrapped in `anyhow`
/// context. Plain IO errors get filesystem guidance. Anything else becomes
/// [`FetchbinError::Other`] carrying the full cause chain on one line.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let error = match error.downcast::<FetchbinError>() {
        Ok(fetchbin_error) => return create_error_context(fetchbin_error),
        Err(error) => error,
    };

    let error = match error.downcast::<ErrorContext>() {
        Ok(ctx) => return ctx,
        Err(error) => error,
    };

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        return ErrorContext::new(FetchbinError::Other {
            message: format!("{error:#}"),
        })
        .with_details(format!("IO error kind: {:?}", io_error.kind()));
    }

    if error.downcast_ref::<toml::de::Error>().is_some() {
        return ErrorContext::new(FetchbinError::ConfigError {
            message: format!("{error:#}"),
        })
        .with_suggestion("Check the TOML syntax of the configuration file");
    }

    // `{:#}` joins the cause chain with ": " on a single line
    ErrorContext::new(FetchbinError::Other {
        message: format!("{error:#}"),
    })
}

fn create_error_context(error: FetchbinError) -> ErrorContext {
    match &error {
        FetchbinError::UnsupportedPlatform {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Supported targets are darwin, linux and windows on amd64 or arm64")
            .with_details("No prebuilt artifact is published for this operating system and architecture"),

        FetchbinError::InvalidVersion {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Use a plain semantic version such as 1.4.2 (no 'v' prefix)"),

        FetchbinError::InvalidArtifactName {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Artifact names may contain letters, digits, '.', '_' and '-'"),

        FetchbinError::FetchFailed {
            status,
            ..
        } => {
            let suggestion = match *status {
                404 => "Check that this version was released for your platform",
                401 | 403 => "The release host refused access; check credentials or proxy settings",
                _ => "The release host returned an error; try again later",
            };
            ErrorContext::new(error).with_suggestion(suggestion)
        }

        FetchbinError::TooManyRedirects {
            ..
        } => ErrorContext::new(error)
            .with_details("The release host redirected more times than allowed, which usually indicates a redirect loop"),

        FetchbinError::TransportError {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Check your network connection or proxy and run the install again"),

        FetchbinError::IntegrityMismatch {
            ..
        } => ErrorContext::new(error)
            .with_details("The downloaded file was discarded; any previously installed artifact was left untouched"),

        FetchbinError::PermissionDenied {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Choose a writable --link-dir or run the installed file directly"),

        FetchbinError::FileSystemError {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Check that the directory is writable or choose another with --install-dir"),

        FetchbinError::Cancelled {
            ..
        } => ErrorContext::new(error)
            .with_details("The partial download was removed"),

        FetchbinError::ConfigError {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Check the configuration file and FETCHBIN_* environment variables"),

        _ => ErrorContext::new(error),
    }
}
