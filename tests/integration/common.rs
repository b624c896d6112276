//! Shared helpers for the integration suite.

// Not every helper is used by every test module
#![allow(dead_code)]

use assert_cmd::Command;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub use fetchbin_cli::platform::OperatingSystem;
pub use fetchbin_cli::test_utils::{fake_executable, sha256_hex, write_checksums};

/// Environment variables that could leak into a test run from the host.
const ISOLATED_ENV: &[&str] = &[
    "FETCHBIN_CONFIG",
    "FETCHBIN_BASE_URL",
    "FETCHBIN_NAME",
    "FETCHBIN_INSTALL_DIR",
    "FETCHBIN_LINK_DIR",
    "FETCHBIN_TIMEOUT",
    "RUST_LOG",
];

/// A scratch directory with an empty config file and a fresh release host.
pub struct TestProject {
    pub dir: TempDir,
    pub server: mockito::ServerGuard,
}

impl TestProject {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("create temp dir");
        std::fs::write(dir.path().join("config.toml"), "").expect("write config");
        Self {
            dir,
            server: mockito::Server::new(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.path().join("bin")
    }

    pub fn link_dir(&self) -> PathBuf {
        self.path().join("links")
    }

    /// `fetchbin` with an isolated environment and config.
    pub fn fetchbin(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_fetchbin"));
        for key in ISOLATED_ENV {
            cmd.env_remove(key);
        }
        cmd.env("NO_COLOR", "1")
            .current_dir(self.path())
            .arg("--no-progress")
            .arg("--config")
            .arg(self.path().join("config.toml"));
        cmd
    }

    /// `fetchbin install <version>` for linux/amd64 against the mock host.
    pub fn install(&self, version: &str) -> Command {
        let mut cmd = self.fetchbin();
        cmd.args(["install", version, "--os", "linux", "--arch", "amd64", "--name", "tool"])
            .arg("--base-url")
            .arg(self.server.url())
            .arg("--install-dir")
            .arg(self.bin_dir());
        cmd
    }

    /// Serve `body` as the linux/amd64 artifact for `version`.
    pub fn serve_artifact(&mut self, version: &str, body: &[u8]) -> mockito::Mock {
        self.server
            .mock("GET", format!("/v{version}/tool-linux-amd64").as_str())
            .with_status(200)
            .with_body(body)
            .create()
    }

    /// Serve a `checksums.txt` for `version` covering `entries`.
    pub fn serve_checksums(&mut self, version: &str, entries: &[(&str, &[u8])]) -> mockito::Mock {
        let content: String =
            entries.iter().map(|(name, bytes)| format!("{}  {name}\n", sha256_hex(bytes))).collect();
        self.server
            .mock("GET", format!("/v{version}/checksums.txt").as_str())
            .with_status(200)
            .with_body(content)
            .create()
    }
}

/// A linux executable whose contents identify `tag`.
pub fn linux_binary(tag: &str) -> Vec<u8> {
    let mut bytes = fake_executable(OperatingSystem::Linux);
    bytes.extend_from_slice(tag.as_bytes());
    bytes
}

/// Temporary downloads left in `dir`.
pub fn leftovers(dir: &Path) -> Vec<PathBuf> {
    if !dir.exists() {
        return Vec::new();
    }
    fetchbin_cli::fetcher::leftover_downloads(dir).expect("read dir")
}
