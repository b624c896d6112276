//! Terminal-facing helpers
//!
//! - [`logging`] - `tracing` subscriber setup for the binary
//! - [`progress`] - Download progress bars that hide themselves when output
//!   is not interactive

pub mod logging;
pub mod progress;

pub use logging::{Verbosity, init_logging};
pub use progress::DownloadProgress;
