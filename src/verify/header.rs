//! Executable header sniffing for degraded verification.
//!
//! When no digest is published the best available check is that the file
//! looks like an executable for the requested OS. This catches HTML error
//! pages, empty bodies and artifacts built for the wrong platform.

use crate::platform::OperatingSystem;

const ELF_MAGIC: &[u8] = b"\x7fELF";
const PE_MAGIC: &[u8] = b"MZ";
const MACH_O_MAGICS: &[[u8; 4]] = &[
    [0xfe, 0xed, 0xfa, 0xce], // 32-bit, big endian
    [0xce, 0xfa, 0xed, 0xfe], // 32-bit, little endian
    [0xfe, 0xed, 0xfa, 0xcf], // 64-bit, big endian
    [0xcf, 0xfa, 0xed, 0xfe], // 64-bit, little endian
    [0xca, 0xfe, 0xba, 0xbe], // universal
];

/// Bytes needed to recognise any supported header.
pub const HEADER_LEN: usize = 4;

/// Executable format recognised from a file prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutableFormat {
    Elf,
    MachO,
    Pe,
}

impl ExecutableFormat {
    /// Recognise the format from the first bytes of a file.
    #[must_use]
    pub fn sniff(prefix: &[u8]) -> Option<Self> {
        if prefix.starts_with(ELF_MAGIC) {
            Some(Self::Elf)
        } else if MACH_O_MAGICS.iter().any(|magic| prefix.starts_with(magic)) {
            Some(Self::MachO)
        } else if prefix.starts_with(PE_MAGIC) {
            Some(Self::Pe)
        } else {
            None
        }
    }

    /// The format native to `os`.
    #[must_use]
    pub const fn for_os(os: OperatingSystem) -> Self {
        match os {
            OperatingSystem::Linux => Self::Elf,
            OperatingSystem::Darwin => Self::MachO,
            OperatingSystem::Windows => Self::Pe,
        }
    }

    /// Human readable name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Elf => "ELF",
            Self::MachO => "Mach-O",
            Self::Pe => "PE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff() {
        assert_eq!(ExecutableFormat::sniff(b"\x7fELF\x02\x01"), Some(ExecutableFormat::Elf));
        assert_eq!(ExecutableFormat::sniff(&[0xcf, 0xfa, 0xed, 0xfe, 0x07]), Some(ExecutableFormat::MachO));
        assert_eq!(ExecutableFormat::sniff(&[0xca, 0xfe, 0xba, 0xbe]), Some(ExecutableFormat::MachO));
        assert_eq!(ExecutableFormat::sniff(b"MZ\x90\x00"), Some(ExecutableFormat::Pe));
        assert_eq!(ExecutableFormat::sniff(b"<!DOCTYPE html>"), None);
        assert_eq!(ExecutableFormat::sniff(b""), None);
    }

    #[test]
    fn test_for_os() {
        assert_eq!(ExecutableFormat::for_os(OperatingSystem::Linux), ExecutableFormat::Elf);
        assert_eq!(ExecutableFormat::for_os(OperatingSystem::Darwin), ExecutableFormat::MachO);
        assert_eq!(ExecutableFormat::for_os(OperatingSystem::Windows), ExecutableFormat::Pe);
    }
}
