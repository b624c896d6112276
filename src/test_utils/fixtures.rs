//! Sample artifacts and checksum manifests.

use crate::platform::OperatingSystem;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Bytes that pass the degraded header check for `os`.
#[must_use]
pub fn fake_executable(os: OperatingSystem) -> Vec<u8> {
    let mut bytes = match os {
        OperatingSystem::Linux => b"\x7fELF\x02\x01\x01\x00".to_vec(),
        OperatingSystem::Darwin => vec![0xcf, 0xfa, 0xed, 0xfe, 0x0c, 0x00, 0x00, 0x01],
        OperatingSystem::Windows => b"MZ\x90\x00\x03\x00\x00\x00".to_vec(),
    };
    bytes.extend(std::iter::repeat_n(0u8, 56));
    bytes
}

/// Lowercase hex SHA-256 of `bytes`.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Write a `checksums.txt` style manifest into `dir`.
pub fn write_checksums(dir: &Path, entries: &[(&str, &[u8])]) -> std::io::Result<PathBuf> {
    let content: String =
        entries.iter().map(|(name, bytes)| format!("{}  {name}\n", sha256_hex(bytes))).collect();
    let path = dir.join("checksums.txt");
    std::fs::write(&path, content)?;
    Ok(path)
}
