//! Platform resolution: host OS and CPU architecture to a canonical target.
//!
//! The resolver accepts both the spellings used by Node-style runtimes
//! (`win32`, `x64`) and the ones reported by Rust's `std::env::consts`
//! (`windows`, `x86_64`, `aarch64`, `macos`), and maps them onto the canonical
//! identifiers used in release file names.
//!
//! | Canonical OS | Accepted input         |
//! |--------------|------------------------|
//! | `darwin`     | `darwin`, `macos`      |
//! | `linux`      | `linux`                |
//! | `windows`    | `windows`, `win32`     |
//!
//! | Canonical arch | Accepted input               |
//! |----------------|------------------------------|
//! | `amd64`        | `amd64`, `x64`, `x86_64`     |
//! | `arm64`        | `arm64`, `aarch64`           |
//!
//! Resolution is a pure function: no environment access happens unless
//! [`TargetDescriptor::current`] is called.

use crate::core::{FetchbinError, Result};
use serde::Serialize;
use std::fmt;

/// Operating systems with published artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatingSystem {
    /// macOS
    Darwin,
    /// Linux
    Linux,
    /// Windows
    Windows,
}

impl OperatingSystem {
    /// Canonical identifier used in artifact file names.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Darwin => "darwin",
            Self::Linux => "linux",
            Self::Windows => "windows",
        }
    }

    /// Suffix appended to executables on this OS.
    #[must_use]
    pub const fn executable_suffix(self) -> &'static str {
        match self {
            Self::Windows => ".exe",
            Self::Darwin | Self::Linux => "",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "darwin" | "macos" => Some(Self::Darwin),
            "linux" => Some(Self::Linux),
            "windows" | "win32" => Some(Self::Windows),
            _ => None,
        }
    }
}

impl fmt::Display for OperatingSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CPU architectures with published artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    /// x86-64
    Amd64,
    /// 64-bit ARM
    Arm64,
}

impl Architecture {
    /// Canonical identifier used in artifact file names.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Amd64 => "amd64",
            Self::Arm64 => "arm64",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "amd64" | "x64" | "x86_64" => Some(Self::Amd64),
            "arm64" | "aarch64" => Some(Self::Arm64),
            _ => None,
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every (OS, architecture) pair for which artifacts are published.
pub const SUPPORTED_TARGETS: &[(OperatingSystem, Architecture)] = &[
    (OperatingSystem::Darwin, Architecture::Amd64),
    (OperatingSystem::Darwin, Architecture::Arm64),
    (OperatingSystem::Linux, Architecture::Amd64),
    (OperatingSystem::Linux, Architecture::Arm64),
    (OperatingSystem::Windows, Architecture::Amd64),
    (OperatingSystem::Windows, Architecture::Arm64),
];

/// A resolved, supported target. Immutable once constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TargetDescriptor {
    os: OperatingSystem,
    arch: Architecture,
}

impl TargetDescriptor {
    /// Resolve raw OS and architecture names.
    ///
    /// # Errors
    ///
    /// Returns [`FetchbinError::UnsupportedPlatform`] with the raw inputs when
    /// either name is unknown or the pair is not in [`SUPPORTED_TARGETS`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use fetchbin_cli::platform::TargetDescriptor;
    ///
    /// let target = TargetDescriptor::resolve("win32", "x64").unwrap();
    /// assert_eq!(target.to_string(), "windows-amd64");
    /// assert!(TargetDescriptor::resolve("plan9", "amd64").is_err());
    /// ```
    pub fn resolve(os: &str, arch: &str) -> Result<Self> {
        let unsupported = || FetchbinError::UnsupportedPlatform {
            os: os.to_string(),
            arch: arch.to_string(),
        };

        let parsed_os = OperatingSystem::parse(os).ok_or_else(unsupported)?;
        let parsed_arch = Architecture::parse(arch).ok_or_else(unsupported)?;

        if !SUPPORTED_TARGETS.contains(&(parsed_os, parsed_arch)) {
            return Err(unsupported());
        }

        Ok(Self {
            os: parsed_os,
            arch: parsed_arch,
        })
    }

    /// Resolve the target of the running process.
    pub fn current() -> Result<Self> {
        Self::resolve(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Resolve from optional overrides, falling back to the running process
    /// for whichever half is not supplied.
    pub fn resolve_or_current(os: Option<&str>, arch: Option<&str>) -> Result<Self> {
        Self::resolve(
            os.unwrap_or(std::env::consts::OS),
            arch.unwrap_or(std::env::consts::ARCH),
        )
    }

    /// Operating system of this target.
    #[must_use]
    pub const fn os(&self) -> OperatingSystem {
        self.os
    }

    /// Architecture of this target.
    #[must_use]
    pub const fn arch(&self) -> Architecture {
        self.arch
    }

    /// Executable suffix for this target (`.exe` on Windows).
    #[must_use]
    pub const fn executable_suffix(&self) -> &'static str {
        self.os.executable_suffix()
    }
}

impl fmt::Display for TargetDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os, self.arch)
    }
}
