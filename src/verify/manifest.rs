//! Parsing of release checksum manifests.
//!
//! Release pipelines publish a `checksums.txt` next to the artifacts, in the
//! format produced by `sha256sum`:
//!
//! ```text
//! # optional comment
//! 3a7bd3e2360a3d29eea436fcfb7e44c735d117c42d1c1835420b6b9942dd4f1b  tool-linux-amd64
//! sha256:9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08 *tool-windows-amd64.exe
//! ```

use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

use crate::core::{FetchbinError, Result};

const SHA256_HEX_LEN: usize = 64;

/// Expected digests keyed by release file name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChecksumManifest {
    entries: HashMap<String, String>,
}

impl ChecksumManifest {
    /// Parse manifest text. Malformed lines are skipped.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use fetchbin_cli::verify::ChecksumManifest;
    ///
    /// let digest = "a".repeat(64);
    /// let manifest = ChecksumManifest::parse(&format!("{digest}  tool-linux-amd64\n"));
    /// assert_eq!(manifest.lookup("tool-linux-amd64"), Some(digest.as_str()));
    /// assert_eq!(manifest.lookup("tool"), None);
    /// ```
    #[must_use]
    pub fn parse(content: &str) -> Self {
        let mut entries = HashMap::new();

        for (index, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut parts = line.split_whitespace();
            let (Some(digest), Some(file_name), None) = (parts.next(), parts.next(), parts.next())
            else {
                debug!("Skipping malformed checksum line {}: {line}", index + 1);
                continue;
            };

            let digest = digest.strip_prefix("sha256:").unwrap_or(digest);
            let file_name = file_name.strip_prefix('*').unwrap_or(file_name);
            if digest.len() != SHA256_HEX_LEN || !digest.bytes().all(|b| b.is_ascii_hexdigit()) {
                debug!("Skipping checksum line {} with invalid digest", index + 1);
                continue;
            }

            entries.insert(file_name.to_string(), digest.to_ascii_lowercase());
        }

        Self {
            entries,
        }
    }

    /// Read and parse a manifest from disk.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| FetchbinError::from_io("read checksum manifest", path, &e))?;
        let manifest = Self::parse(&content);
        debug!("Loaded {} checksum entries from {}", manifest.len(), path.display());
        Ok(manifest)
    }

    /// Lowercase hex digest for `file_name`, if listed.
    #[must_use]
    pub fn lookup(&self, file_name: &str) -> Option<&str> {
        self.entries.get(file_name).map(String::as_str)
    }

    /// Number of usable entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the manifest has no usable entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
