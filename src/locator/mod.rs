//! Artifact location: from a target and a version to a download URL.
//!
//! Release hosts publish one binary per (version, OS, architecture) tuple
//! under a predictable layout:
//!
//! ```text
//! {base}/v{version}/{name}-{os}-{arch}{ext}
//! {base}/v{version}/checksums.txt
//! ```
//!
//! Both the version and the artifact name are validated before they are
//! placed into a URL, and URLs are assembled from path segments rather than
//! by string concatenation, so untrusted input can never change the host,
//! add query parameters or escape the release directory.

use crate::constants::{CHECKSUMS_FILE_NAME, MAX_ARTIFACT_NAME_LEN, MAX_VERSION_LEN};
use crate::core::{FetchbinError, Result};
use crate::platform::TargetDescriptor;
use regex::Regex;
use reqwest::Url;
use serde::Serialize;
use std::sync::LazyLock;

/// Full semantic-version grammar (no `v` prefix).
static SEMVER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(0|[1-9]\d*)\.(0|[1-9]\d*)\.(0|[1-9]\d*)(?:-((?:0|[1-9]\d*|\d*[a-zA-Z-][0-9a-zA-Z-]*)(?:\.(?:0|[1-9]\d*|\d*[a-zA-Z-][0-9a-zA-Z-]*))*))?(?:\+([0-9a-zA-Z-]+(?:\.[0-9a-zA-Z-]+)*))?$",
    )
    .expect("semver pattern is valid")
});

static ARTIFACT_NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").expect("artifact name pattern is valid")
});

/// Validate a requested version string.
///
/// # Errors
///
/// Returns [`FetchbinError::InvalidVersion`] for anything that is not a
/// strict `MAJOR.MINOR.PATCH[-pre][+build]` version.
///
/// # Examples
///
/// ```rust
/// use fetchbin_cli::locator::validate_version;
///
/// assert!(validate_version("2.3.1").is_ok());
/// assert!(validate_version("1.0.0-rc.1+build.5").is_ok());
/// assert!(validate_version("v1.2.3").is_err());
/// assert!(validate_version("1.2").is_err());
/// ```
pub fn validate_version(version: &str) -> Result<semver::Version> {
    let invalid = |reason: &str| FetchbinError::InvalidVersion {
        version: version.to_string(),
        reason: reason.to_string(),
    };

    if version.is_empty() {
        return Err(invalid("version is empty"));
    }
    if version.len() > MAX_VERSION_LEN {
        return Err(invalid("version is too long"));
    }
    if version.starts_with(['v', 'V']) {
        return Err(invalid("remove the leading 'v'"));
    }
    if !SEMVER_PATTERN.is_match(version) {
        return Err(invalid("expected MAJOR.MINOR.PATCH"));
    }

    semver::Version::parse(version).map_err(|e| invalid(&e.to_string()))
}

/// Validate an artifact name before it is used in URLs and file names.
pub fn validate_artifact_name(name: &str) -> Result<()> {
    if name.len() > MAX_ARTIFACT_NAME_LEN || !ARTIFACT_NAME_PATTERN.is_match(name) {
        return Err(FetchbinError::InvalidArtifactName {
            name: name.to_string(),
        });
    }
    Ok(())
}

/// The release host serving versioned artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseHost {
    base_url: Url,
}

impl ReleaseHost {
    /// Parse and validate a base URL.
    ///
    /// `https` is required; plain `http` is accepted only for loopback hosts.
    /// Query strings and fragments are dropped.
    pub fn parse(base_url: &str) -> Result<Self> {
        let config_error = |message: String| FetchbinError::ConfigError {
            message,
        };

        let mut url = Url::parse(base_url.trim())
            .map_err(|e| config_error(format!("invalid release base URL '{base_url}': {e}")))?;

        let loopback = matches!(
            url.host_str(),
            Some("localhost" | "127.0.0.1" | "[::1]" | "::1")
        );
        match url.scheme() {
            "https" => {}
            "http" if loopback => {}
            scheme => {
                return Err(config_error(format!(
                    "release base URL must use https, got '{scheme}'"
                )));
            }
        }
        if url.cannot_be_a_base() {
            return Err(config_error(format!("release base URL '{base_url}' cannot hold a path")));
        }

        url.set_query(None);
        url.set_fragment(None);

        Ok(Self {
            base_url: url,
        })
    }

    /// The validated base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn release_file_url(&self, version: &str, file_name: &str) -> Url {
        let mut url = self.base_url.clone();
        // `parse` rejected cannot-be-a-base URLs, so segments are always available
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(&format!("v{version}")).push(file_name);
        }
        url
    }
}

/// Everything needed to fetch one artifact. Constructed once per run.
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactReference {
    /// Validated version string
    pub version: String,
    /// Resolved target
    pub target: TargetDescriptor,
    /// Artifact (executable) name without platform decoration
    pub name: String,
    /// Release file name, e.g. `tool-linux-amd64`
    pub file_name: String,
    /// Download URL derived from the host, version and file name
    #[serde(serialize_with = "serialize_url")]
    pub url: Url,
    /// URL of the release's checksum manifest
    #[serde(serialize_with = "serialize_url")]
    pub checksums_url: Url,
}

fn serialize_url<S: serde::Serializer>(url: &Url, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(url.as_str())
}

impl ArtifactReference {
    /// Compose the reference for `name` at `version` on `target`.
    ///
    /// No network access happens here.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use fetchbin_cli::locator::{ArtifactReference, ReleaseHost};
    /// use fetchbin_cli::platform::TargetDescriptor;
    ///
    /// let host = ReleaseHost::parse("https://example.com/releases/download").unwrap();
    /// let target = TargetDescriptor::resolve("win32", "x64").unwrap();
    /// let reference = ArtifactReference::locate(&host, "tool", &target, "2.3.1").unwrap();
    /// assert_eq!(
    ///     reference.url.as_str(),
    ///     "https://example.com/releases/download/v2.3.1/tool-windows-amd64.exe"
    /// );
    /// ```
    pub fn locate(
        host: &ReleaseHost,
        name: &str,
        target: &TargetDescriptor,
        version: &str,
    ) -> Result<Self> {
        validate_artifact_name(name)?;
        validate_version(version)?;

        let file_name = format!(
            "{name}-{}-{}{}",
            target.os(),
            target.arch(),
            target.executable_suffix()
        );

        Ok(Self {
            version: version.to_string(),
            target: *target,
            name: name.to_string(),
            url: host.release_file_url(version, &file_name),
            checksums_url: host.release_file_url(version, CHECKSUMS_FILE_NAME),
            file_name,
        })
    }

    /// File name the artifact gets once installed, e.g. `tool` or `tool.exe`.
    #[must_use]
    pub fn installed_file_name(&self) -> String {
        format!("{}{}", self.name, self.target.executable_suffix())
    }
}
