//! fetchbin - fetch, verify and provision prebuilt binaries
//!
//! Turns "version X of tool T must be runnable on this machine" into a
//! reliable, verifiable and idempotent operation. Given a release host that
//! publishes one executable per (version, OS, architecture), fetchbin picks
//! the right file, downloads it through redirects and transient network
//! failures, checks it before trusting it, and places it atomically.
//!
//! # Architecture Overview
//!
//! One invocation runs five stages strictly in order:
//!
//! ```text
//! platform ──> locator ──> fetcher ──> verify ──> installer
//!  (target)     (URL)      (temp file)  (trusted)  (final path + link)
//! ```
//!
//! Each stage hands an owned value to the next; nothing is shared between
//! invocations except the installed file and its link.
//!
//! # Core Modules
//!
//! - [`platform`] - Host OS/architecture to a canonical, supported target
//! - [`locator`] - Version validation and download URL construction
//! - [`fetcher`] - Bounded redirects, retries with backoff, streaming to a temp file
//! - [`verify`] - SHA-256 checksum manifests and degraded header checks
//! - [`installer`] - Atomic promotion, executable permissions, best-effort linking
//! - [`provision`] - The end-to-end pipeline with cancellation and timeout
//!
//! # Supporting Modules
//!
//! - [`cli`] - Command-line interface
//! - [`config`] - TOML config file and `FETCHBIN_*` environment overrides
//! - [`core`] - Error taxonomy and user-facing error reporting
//! - [`constants`] - Shared bounds and defaults
//! - [`utils`] - Logging setup and progress bars
//!
//! # Guarantees
//!
//! - A file at the final path is absent, the previous install, or a fully
//!   verified executable; never a partial download.
//! - Only transport failures are retried, a bounded number of times.
//! - A link that cannot be created downgrades to a warning.
//!
//! # Example
//!
//! ```rust,no_run
//! use fetchbin_cli::fetcher::{FetchOptions, Fetcher};
//! use fetchbin_cli::locator::ReleaseHost;
//! use fetchbin_cli::provision::{ChecksumSource, ProvisionRequest, Provisioner};
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let provisioner = Provisioner::new(Fetcher::new(FetchOptions::default())?);
//! let request = ProvisionRequest {
//!     version: "2.3.1".to_string(),
//!     os: None,
//!     arch: None,
//!     name: "tool".to_string(),
//!     host: ReleaseHost::parse("https://github.com/acme/tool/releases/download")?,
//!     install_dir: "bin".into(),
//!     link_dir: None,
//!     checksums: ChecksumSource::Release,
//!     timeout: Duration::from_secs(300),
//! };
//! let report = provisioner.provision(&request, &CancellationToken::new()).await?;
//! println!("installed {}", report.installed.final_path.display());
//! # Ok(())
//! # }
//! ```

// Provisioning pipeline
pub mod fetcher;
pub mod installer;
pub mod locator;
pub mod platform;
pub mod provision;
pub mod verify;

// Supporting modules
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod utils;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
