//! Test utilities for fetchbin
//!
//! Helpers shared by unit tests and the integration suite: logging setup,
//! sample executables and checksum manifests, and a local HTTP server that
//! misbehaves on demand.
//!
//! # Example
//!
//! ```rust,no_run
//! use fetchbin_cli::test_utils::{CannedResponse, FlakyServer, init_test_logging};
//!
//! # async fn example() -> std::io::Result<()> {
//! init_test_logging(None);
//! // Reset the first two connections, then serve the body
//! let server = FlakyServer::start(2, CannedResponse::ok(b"bytes".to_vec())).await?;
//! println!("{}", server.url("/v1.0.0/tool-linux-amd64"));
//! # Ok(())
//! # }
//! ```

pub mod fixtures;
pub mod server;

pub use fixtures::{fake_executable, sha256_hex, write_checksums};
pub use server::{CannedResponse, FlakyServer};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. Uses `level` when given, otherwise
/// `RUST_LOG`; with neither, tests run silently.
///
/// ```bash
/// RUST_LOG=fetchbin_cli=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .try_init();
    });
}
