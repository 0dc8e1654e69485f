//! Volume file protocol
//!
//! The minimal file interface providers read through. It mirrors the
//! firmware file protocol: a volume opens handles relative to its root,
//! and a handle is either a regular file or a directory whose entries are
//! read one at a time through a cursor.
//!
//! Handles close when dropped, so every early return closes whatever the
//! enclosing scope opened.

use alloc::boxed::Box;
use alloc::string::String;
use core::fmt;

use bitflags::bitflags;

/// Path separator used by volume paths
pub const PATH_SEPARATOR: char = '\\';

bitflags! {
    /// File attributes, using the firmware bit values
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FileAttribute: u64 {
        const READ_ONLY = 0x01;
        const HIDDEN = 0x02;
        const SYSTEM = 0x04;
        const RESERVED = 0x08;
        const DIRECTORY = 0x10;
        const ARCHIVE = 0x20;
    }
}

/// One file or directory entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Name of the entry, without any directory component
    pub file_name: String,
    /// Size in bytes
    pub file_size: u64,
    /// Attribute bits
    pub attribute: FileAttribute,
}

impl FileInfo {
    pub fn is_directory(&self) -> bool {
        self.attribute.contains(FileAttribute::DIRECTORY)
    }
}

/// Volume-layer failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeError {
    NotFound,
    /// The entry did not fit the caller's bound; carries the size needed
    BufferTooSmall(usize),
    OutOfResources,
    NotADirectory,
    IsADirectory,
    InvalidPath,
    Corrupted,
    AccessDenied,
    Unsupported,
    DeviceError,
}

impl fmt::Display for VolumeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VolumeError::NotFound => f.write_str("not found"),
            VolumeError::BufferTooSmall(needed) => write!(f, "buffer too small ({} needed)", needed),
            VolumeError::OutOfResources => f.write_str("out of resources"),
            VolumeError::NotADirectory => f.write_str("not a directory"),
            VolumeError::IsADirectory => f.write_str("is a directory"),
            VolumeError::InvalidPath => f.write_str("invalid path"),
            VolumeError::Corrupted => f.write_str("volume corrupted"),
            VolumeError::AccessDenied => f.write_str("access denied"),
            VolumeError::Unsupported => f.write_str("unsupported"),
            VolumeError::DeviceError => f.write_str("device error"),
        }
    }
}

/// Result type for volume operations
pub type VolumeResult<T> = core::result::Result<T, VolumeError>;

/// A mounted, readable volume
pub trait Volume {
    /// Open `path` relative to the volume root.
    ///
    /// Paths use `\` separators; a leading separator is optional.
    fn open(&self, path: &str) -> VolumeResult<Box<dyn FileHandle + '_>>;
}

/// An open file or directory
pub trait FileHandle {
    /// Get information about the open file itself
    fn info(&mut self) -> VolumeResult<FileInfo>;

    /// Move the read position of a regular file
    fn set_position(&mut self, position: u64) -> VolumeResult<()>;

    /// Read from the current position; returns 0 at end of file
    fn read(&mut self, buffer: &mut [u8]) -> VolumeResult<usize>;

    /// Read the next directory entry.
    ///
    /// Returns `Ok(None)` once the directory is exhausted. An entry whose
    /// name is longer than `max_name_len` characters yields
    /// `Err(VolumeError::BufferTooSmall(needed))` and the cursor still moves
    /// past it, so a caller can skip that one entry and keep reading. Any
    /// other error leaves the cursor where it was.
    fn read_entry(&mut self, max_name_len: usize) -> VolumeResult<Option<FileInfo>>;

    /// Reset the directory cursor to the first entry
    fn rewind_entries(&mut self) -> VolumeResult<()>;
}

/// Fill `buffer` completely starting at `position`.
///
/// A short read is reported as `VolumeError::Corrupted`.
pub fn read_exact_at(file: &mut dyn FileHandle, position: u64, buffer: &mut [u8]) -> VolumeResult<()> {
    file.set_position(position)?;

    let mut filled = 0;
    while filled < buffer.len() {
        let read = file.read(&mut buffer[filled..])?;
        if read == 0 {
            return Err(VolumeError::Corrupted);
        }
        filled += read;
    }

    Ok(())
}

/// Convert a `/`-separated path into volume form with a leading `\`
pub fn to_volume_path(path: &str) -> String {
    let mut converted = String::with_capacity(path.len() + 1);

    for component in path.split(['/', PATH_SEPARATOR]).filter(|c| !c.is_empty()) {
        converted.push(PATH_SEPARATOR);
        converted.push_str(component);
    }

    if converted.is_empty() {
        converted.push(PATH_SEPARATOR);
    }

    converted
}

/// Join a directory path and an entry name
pub fn join_path(directory: &str, name: &str) -> String {
    let mut joined = to_volume_path(directory);
    if !joined.ends_with(PATH_SEPARATOR) {
        joined.push(PATH_SEPARATOR);
    }
    joined.push_str(name.trim_start_matches(['/', PATH_SEPARATOR]));
    joined
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_posix_paths() {
        assert_eq!(to_volume_path("/boot/vmlinuz-6.1"), "\\boot\\vmlinuz-6.1");
        assert_eq!(to_volume_path("vmlinuz"), "\\vmlinuz");
        assert_eq!(to_volume_path("\\loader\\entries\\"), "\\loader\\entries");
        assert_eq!(to_volume_path(""), "\\");
    }

    #[test]
    fn joins_entry_names() {
        assert_eq!(join_path("\\loader\\entries", "a.conf"), "\\loader\\entries\\a.conf");
        assert_eq!(join_path("\\", "a.conf"), "\\a.conf");
    }

    #[test]
    fn directory_attribute() {
        let info = FileInfo {
            file_name: "entries".into(),
            file_size: 0,
            attribute: FileAttribute::DIRECTORY | FileAttribute::READ_ONLY,
        };
        assert!(info.is_directory());
    }
}
