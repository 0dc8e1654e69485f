//! Loader entries directory scan
//!
//! Walks a BLS entries directory and yields the files that qualify as
//! entry candidates. Entries come back in the order the filesystem driver
//! enumerates them, which is not guaranteed to be stable across drivers.

use alloc::boxed::Box;

use static_assertions::const_assert_eq;

use bootmgr_api::{BootEntryError, FileHandle, FileInfo, MAX_ENTRY_NAME_LEN, Result, Volume, VolumeError};

/// Default entries directory, relative to the filesystem root
pub const LOADER_ENTRIES_DIR: &str = "\\loader\\entries";

/// Suffix of entry files, compared case-insensitively
pub const CONF_SUFFIX: &str = ".conf";

/// Prefix reserved for generated entries
pub const AUTO_PREFIX: &str = "auto-";

/// Longest entry file name read from the directory
pub const MAX_CANDIDATE_NAME_LEN: usize = MAX_ENTRY_NAME_LEN + CONF_SUFFIX.len();

const_assert_eq!(MAX_CANDIDATE_NAME_LEN, 132);

/// Whether a file name qualifies as an entry file
pub fn is_loader_entry_name(name: &str) -> bool {
    !name.starts_with('.') && !name.starts_with(AUTO_PREFIX) && has_conf_suffix(name)
}

/// Whether a directory entry is an entry candidate
pub fn is_candidate(info: &FileInfo) -> bool {
    !info.is_directory() && is_loader_entry_name(&info.file_name)
}

fn has_conf_suffix(name: &str) -> bool {
    name.len()
        .checked_sub(CONF_SUFFIX.len())
        .and_then(|start| name.get(start..))
        .is_some_and(|suffix| suffix.eq_ignore_ascii_case(CONF_SUFFIX))
}

/// File name without the `.conf` suffix
pub fn entry_stem(name: &str) -> &str {
    if has_conf_suffix(name) {
        &name[..name.len() - CONF_SUFFIX.len()]
    } else {
        name
    }
}

/// An open entries directory.
///
/// The directory cursor is rewound when the scan is dropped, on every exit
/// path.
pub struct EntryScan<'v> {
    directory: Box<dyn FileHandle + 'v>,
    skipped: usize,
}

impl<'v> EntryScan<'v> {
    /// Open `path` on `volume` for scanning.
    ///
    /// A missing directory is `NotFound`; a path that exists but is not a
    /// directory is `InvalidParameter`.
    pub fn open(volume: &'v dyn Volume, path: &str) -> Result<Self> {
        let mut directory = volume.open(path)?;

        let info = directory.info()?;
        if !info.is_directory() {
            return Err(BootEntryError::InvalidParameter("loader entries path is not a directory"));
        }

        directory.rewind_entries()?;

        Ok(Self { directory, skipped: 0 })
    }

    /// Next candidate, or `None` once the directory is exhausted.
    ///
    /// A name too long for the read bound skips that one entry. Any other
    /// read failure is returned and the scan should stop.
    pub fn next_candidate(&mut self) -> Result<Option<FileInfo>> {
        loop {
            match self.directory.read_entry(MAX_CANDIDATE_NAME_LEN) {
                Ok(Some(info)) if is_candidate(&info) => return Ok(Some(info)),
                Ok(Some(info)) => {
                    log::trace!("Skipping {}", info.file_name);
                    self.skipped += 1;
                }
                Ok(None) => return Ok(None),
                Err(VolumeError::BufferTooSmall(needed)) => {
                    log::warn!("Skipping directory entry with oversized name ({} bytes)", needed);
                    self.skipped += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Entries passed over so far
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl Drop for EntryScan<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.directory.rewind_entries() {
            log::debug!("Unable to rewind entries directory - {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::String;
    use alloc::vec::Vec;
    use bootmgr_api::memory::MemoryVolume;

    fn candidates(volume: &MemoryVolume) -> Vec<String> {
        let mut scan = EntryScan::open(volume, LOADER_ENTRIES_DIR).unwrap();
        let mut names = Vec::new();
        while let Some(info) = scan.next_candidate().unwrap() {
            names.push(info.file_name);
        }
        names
    }

    #[test]
    fn filters_names() {
        assert!(is_loader_entry_name("a.conf"));
        assert!(is_loader_entry_name("ARCH.CONF"));
        assert!(!is_loader_entry_name(".hidden.conf"));
        assert!(!is_loader_entry_name("auto-gen.conf"));
        assert!(is_loader_entry_name("AUTO-gen.conf"));
        assert!(!is_loader_entry_name("note.txt"));
        assert!(!is_loader_entry_name(".conf"));
        assert!(!is_loader_entry_name("conf"));
        assert!(!is_loader_entry_name("é.con"));
    }

    #[test]
    fn stems() {
        assert_eq!(entry_stem("arch.CONF"), "arch");
        assert_eq!(entry_stem("arch"), "arch");
    }

    #[test]
    fn scan_keeps_enumeration_order() {
        let volume = MemoryVolume::new();
        volume.add_file("\\loader\\entries\\b.conf", b"");
        volume.add_file("\\loader\\entries\\.hidden.conf", b"");
        volume.add_file("\\loader\\entries\\auto-gen.conf", b"");
        volume.add_file("\\loader\\entries\\note.txt", b"");
        volume.add_dir("\\loader\\entries\\sub.conf");
        volume.add_file("\\loader\\entries\\a.conf", b"");

        assert_eq!(candidates(&volume), ["b.conf", "a.conf"]);
    }

    #[test]
    fn oversized_names_skip_one_entry() {
        let volume = MemoryVolume::new();
        let long = alloc::format!("\\loader\\entries\\{}.conf", "x".repeat(MAX_ENTRY_NAME_LEN + 1));
        volume.add_file(&long, b"");
        volume.add_file("\\loader\\entries\\ok.conf", b"");

        let mut scan = EntryScan::open(&volume, LOADER_ENTRIES_DIR).unwrap();
        assert_eq!(scan.next_candidate().unwrap().unwrap().file_name, "ok.conf");
        assert_eq!(scan.next_candidate().unwrap(), None);
        assert_eq!(scan.skipped(), 1);
    }

    #[test]
    fn open_distinguishes_missing_and_not_directory() {
        let volume = MemoryVolume::new();
        assert_eq!(
            EntryScan::open(&volume, LOADER_ENTRIES_DIR).err(),
            Some(BootEntryError::NotFound)
        );

        volume.add_file("\\loader\\entries", b"not a directory");
        assert_eq!(
            EntryScan::open(&volume, LOADER_ENTRIES_DIR).err(),
            Some(BootEntryError::InvalidParameter("loader entries path is not a directory"))
        );
    }
}
