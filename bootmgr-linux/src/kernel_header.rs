//! Kernel image version lookup
//!
//! A bzImage setup header stores, at [`KERNEL_VERSION_FIELD`], a 16-bit
//! offset to a NUL-terminated ASCII version string. The offset is relative
//! to [`KERNEL_VERSION_BASE`]. Nothing else in the image is interpreted.

use arrayvec::ArrayString;
use static_assertions::const_assert;

use bootmgr_api::volume::read_exact_at;
use bootmgr_api::{BootEntryError, FileHandle, Result, VolumeError};

/// Position of the `kernel_version` field in the setup header
pub const KERNEL_VERSION_FIELD: u64 = 0x20E;

/// Base the `kernel_version` offset is relative to
pub const KERNEL_VERSION_BASE: u64 = 0x200;

/// Version buffer size, terminator included
pub const MAX_KERNEL_VERSION_LEN: usize = 128;

const_assert!(MAX_KERNEL_VERSION_LEN > 1);
const_assert!(MAX_KERNEL_VERSION_LEN <= u16::MAX as usize);

/// Version string recovered from a kernel image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelVersion {
    text: ArrayString<{ MAX_KERNEL_VERSION_LEN - 1 }>,
}

impl KernelVersion {
    /// Build from raw header bytes; stops at the first NUL.
    ///
    /// Fails if the string is empty or not printable ASCII.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        let bytes = &bytes[..end.min(MAX_KERNEL_VERSION_LEN - 1)];

        if bytes.is_empty() {
            return Err(BootEntryError::VolumeCorrupted("kernel version string is empty"));
        }

        if !bytes.iter().all(|b| b.is_ascii_graphic() || *b == b' ') {
            return Err(BootEntryError::VolumeCorrupted("kernel version string is not ASCII"));
        }

        let mut text = ArrayString::new();
        for &byte in bytes {
            text.push(char::from(byte));
        }

        Ok(Self { text })
    }

    /// Full version banner, e.g. `6.1.0-13-amd64 (debian-kernel@...) #1 SMP ...`
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Kernel release, the first word of the banner
    pub fn release(&self) -> &str {
        self.text.split_ascii_whitespace().next().unwrap_or("")
    }
}

impl core::fmt::Display for KernelVersion {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.text)
    }
}

/// Read the version string embedded in an open kernel image.
///
/// Two bounded reads: the offset field, then the string itself. A file too
/// short for either read is reported as `VolumeCorrupted`; I/O errors from
/// the volume pass through converted.
pub fn read_kernel_version(file: &mut dyn FileHandle) -> Result<KernelVersion> {
    let mut field = [0u8; 2];
    read_exact_at(file, KERNEL_VERSION_FIELD, &mut field).map_err(|err| match err {
        VolumeError::Corrupted => BootEntryError::VolumeCorrupted("kernel header is truncated"),
        other => other.into(),
    })?;

    let offset = u16::from_le_bytes(field);
    if offset == 0 {
        return Err(BootEntryError::VolumeCorrupted("kernel header has no version string"));
    }

    file.set_position(KERNEL_VERSION_BASE + u64::from(offset))?;

    let mut buffer = [0u8; MAX_KERNEL_VERSION_LEN - 1];
    let mut filled = 0;
    while filled < buffer.len() {
        let read = file.read(&mut buffer[filled..])?;
        if read == 0 {
            break;
        }
        let terminated = buffer[filled..filled + read].contains(&0);
        filled += read;
        if terminated {
            break;
        }
    }

    if filled == 0 {
        return Err(BootEntryError::VolumeCorrupted("kernel version offset is past end of image"));
    }

    KernelVersion::from_bytes(&buffer[..filled])
}
