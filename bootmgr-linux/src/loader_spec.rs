//! Boot Loader Specification entry files
//!
//! A `.conf` entry is a list of `key value` lines. Blank lines and lines
//! starting with `#` are ignored, as are keys this loader does not use.

use alloc::string::String;
use alloc::vec::Vec;

use bootmgr_api::volume::{read_exact_at, to_volume_path};
use bootmgr_api::{BootEntryError, FileHandle, Result, VolumeError};

/// Firmware architecture name of this image, as entry files spell it
pub const NATIVE_ARCHITECTURE: Option<&str> = if cfg!(target_arch = "x86_64") {
    Some("x64")
} else if cfg!(target_arch = "x86") {
    Some("ia32")
} else if cfg!(target_arch = "aarch64") {
    Some("aa64")
} else if cfg!(target_arch = "arm") {
    Some("arm")
} else if cfg!(target_arch = "riscv64") {
    Some("riscv64")
} else if cfg!(target_arch = "loongarch64") {
    Some("loongarch64")
} else {
    None
};

/// Parsed contents of one entry file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoaderSpecRecord {
    pub title: Option<String>,
    pub version: Option<String>,
    pub sort_key: Option<String>,
    /// Kernel image, as written in the file
    pub linux: Option<String>,
    /// Initial ramdisks, in file order
    pub initrd: Vec<String>,
    /// All `options` lines joined with a space
    pub options: Option<String>,
    /// Firmware architecture the entry is meant for
    pub architecture: Option<String>,
}

impl LoaderSpecRecord {
    /// Parse entry file text
    pub fn parse(text: &str) -> Self {
        let mut record = Self::default();

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (key, value) = match line.split_once(|c: char| c.is_ascii_whitespace()) {
                Some((key, value)) => (key, value.trim()),
                None => (line, ""),
            };

            if value.is_empty() {
                continue;
            }

            let value = String::from(value);
            match key {
                "title" => record.title = Some(value),
                "version" => record.version = Some(value),
                "sort-key" => record.sort_key = Some(value),
                "linux" => record.linux = Some(value),
                "initrd" => record.initrd.push(value),
                "options" => match &mut record.options {
                    Some(options) => {
                        options.push(' ');
                        options.push_str(&value);
                    }
                    None => record.options = Some(value),
                },
                "architecture" => record.architecture = Some(value),
                _ => log::trace!("Ignoring entry key {}", key),
            }
        }

        record
    }

    /// Read and parse an open entry file of at most `max_size` bytes
    pub fn read(file: &mut dyn FileHandle, max_size: usize) -> Result<Self> {
        let info = file.info()?;
        if info.is_directory() {
            return Err(BootEntryError::InvalidParameter("entry is a directory"));
        }

        let size = usize::try_from(info.file_size)
            .ok()
            .filter(|size| *size <= max_size)
            .ok_or(BootEntryError::InvalidParameter("entry file is too large"))?;

        let mut data = Vec::new();
        data.try_reserve_exact(size)?;
        data.resize(size, 0);

        read_exact_at(file, 0, &mut data).map_err(|err| match err {
            VolumeError::Corrupted => BootEntryError::VolumeCorrupted("entry file is truncated"),
            other => other.into(),
        })?;

        let text = core::str::from_utf8(&data).map_err(|_| BootEntryError::InvalidParameter("entry file is not UTF-8"))?;

        Ok(Self::parse(text))
    }

    /// Kernel path in volume form
    pub fn kernel_path(&self) -> Option<String> {
        self.linux.as_deref().map(to_volume_path)
    }

    /// False when the entry names an architecture other than ours
    pub fn matches_architecture(&self) -> bool {
        match (self.architecture.as_deref(), NATIVE_ARCHITECTURE) {
            (Some(wanted), Some(native)) => wanted.eq_ignore_ascii_case(native),
            _ => true,
        }
    }

    /// Initrd paths in volume form
    pub fn initrd_paths(&self) -> impl Iterator<Item = String> + '_ {
        self.initrd.iter().map(|path| to_volume_path(path))
    }
}
