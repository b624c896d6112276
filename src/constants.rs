//! Global constants used throughout the fetchbin codebase.
//!
//! This module contains timeout durations, retry parameters, and other
//! numeric bounds that are shared between the fetcher, the provisioning
//! engine and the configuration defaults. Defining them centrally keeps
//! magic numbers discoverable.

use std::time::Duration;

/// Maximum number of redirect hops followed for a single request.
///
/// Release hosts typically redirect once (GitHub releases to its object
/// store). A chain longer than this is treated as a loop.
pub const MAX_REDIRECTS: usize = 5;

/// Maximum number of attempts for a transfer that fails at the transport layer.
pub const MAX_FETCH_ATTEMPTS: usize = 3;

/// Starting delay for exponential backoff between attempts (250ms).
///
/// The delay doubles on each retry attempt.
pub const STARTING_BACKOFF_DELAY_MS: u64 = 250;

/// Maximum backoff delay for exponential backoff (5 seconds).
///
/// Exponential backoff delays are capped at this value to prevent
/// excessive wait times during retry operations.
pub const MAX_BACKOFF_DELAY_MS: u64 = 5_000;

/// Overall deadline for fetching and verifying one artifact (5 minutes).
pub fn default_overall_timeout() -> Duration {
    Duration::from_secs(300)
}

/// Timeout for establishing a TCP/TLS connection (30 seconds).
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest silence tolerated while waiting for response headers or the next
/// body chunk (30 seconds). A stalled transfer fails the attempt as a
/// transport error, so it is retried like a dropped connection.
pub const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum accepted length of a version string.
pub const MAX_VERSION_LEN: usize = 64;

/// Maximum accepted length of an artifact name.
pub const MAX_ARTIFACT_NAME_LEN: usize = 64;

/// File name of the checksum manifest published next to release artifacts.
pub const CHECKSUMS_FILE_NAME: &str = "checksums.txt";

/// Unix permission bits applied to a promoted artifact.
pub const EXECUTABLE_MODE: u32 = 0o755;

/// User agent sent with every request.
pub const USER_AGENT: &str = concat!("fetchbin/", env!("CARGO_PKG_VERSION"));
