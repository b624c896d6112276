//! Integration test suite for fetchbin
//!
//! End-to-end tests that run the `fetchbin` binary against local `mockito`
//! release hosts and check the files it leaves behind.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **install**: Successful installs, redirects, idempotent re-runs, linking
//! - **failures**: Stage diagnostics, exit status, previous install preserved
//! - **locate**: URL resolution without network access
//! - **verify**: Standalone checksum verification

mod common;

mod failures;
mod install;
mod locate;
mod verify;
