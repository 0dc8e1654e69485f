//! Linux boot entry provider
//!
//! Produces one boot entry per BLS entry file found under the configured
//! entries directory of a filesystem. The provider has no custom entries.

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use log::Level;

use bootmgr_api::volume::join_path;
use bootmgr_api::{
    BOOT_ENTRY_PROTOCOL_REVISION, BootEntry, BootEntryError, BootEntryKind, BootEntryProvider, BootFilesystem,
    EntryTarget, FileSystemPolicy, FsPolicy, FsRequest, Result,
};

use crate::config::LinuxBootConfig;
use crate::kernel_header::{KernelVersion, read_kernel_version};
use crate::loader_spec::LoaderSpecRecord;
use crate::scanner::{EntryScan, entry_stem};

/// BLS entry provider
pub struct LinuxBootProvider {
    policy: Arc<dyn FileSystemPolicy>,
    config: LinuxBootConfig,
}

impl LinuxBootProvider {
    /// Create a provider classifying filesystems through `policy`
    pub fn new(policy: Arc<dyn FileSystemPolicy>, config: LinuxBootConfig) -> Self {
        Self { policy, config }
    }

    pub fn config(&self) -> &LinuxBootConfig {
        &self.config
    }

    fn progress_level(&self) -> Level {
        if self.config.verbose { Level::Info } else { Level::Debug }
    }

    /// Scan one filesystem, stopping at the first entry named `prescan_name`
    fn scan_filesystem(&self, fs: &BootFilesystem, prescan_name: Option<&str>) -> Result<Vec<BootEntry>> {
        let mut scan = EntryScan::open(fs.volume(), &self.config.entries_dir)?;
        let mut entries: Vec<BootEntry> = Vec::new();

        loop {
            let info = match scan.next_candidate() {
                Ok(Some(info)) => info,
                Ok(None) => break,
                Err(BootEntryError::OutOfResources) => return Err(BootEntryError::OutOfResources),
                Err(err) => {
                    log::error!("Directory entry error on {} - {}", fs.handle(), err);
                    break;
                }
            };

            log::log!(self.progress_level(), "Ready to scan {}", info.file_name);

            let entry = match self.load_entry(fs, &info.file_name) {
                Ok(entry) => entry,
                Err(BootEntryError::OutOfResources) => return Err(BootEntryError::OutOfResources),
                Err(err) => {
                    log::warn!("Skipping {} - {}", info.file_name, err);
                    continue;
                }
            };

            if let Some(wanted) = prescan_name {
                if entry.name() == wanted {
                    entries.try_reserve_exact(1)?;
                    entries.push(entry);
                    return Ok(entries);
                }
                continue;
            }

            entries.try_reserve(1)?;
            entries.push(entry);
        }

        log::debug!("Passed over {} directory entries on {}", scan.skipped(), fs.handle());

        if entries.is_empty() {
            return Err(BootEntryError::NotFound);
        }

        Ok(entries)
    }

    /// Build the entry described by one entry file
    fn load_entry(&self, fs: &BootFilesystem, file_name: &str) -> Result<BootEntry> {
        let volume = fs.volume();
        let conf_path = join_path(&self.config.entries_dir, file_name);

        let record = {
            let mut file = volume.open(&conf_path)?;
            LoaderSpecRecord::read(file.as_mut(), self.config.max_conf_size)?
        };

        if !record.matches_architecture() {
            return Err(BootEntryError::InvalidParameter("entry is for another architecture"));
        }

        let kernel_path = record
            .kernel_path()
            .ok_or(BootEntryError::InvalidParameter("entry has no linux key"))?;

        let mut kernel = volume.open(&kernel_path)?;
        if kernel.info()?.is_directory() {
            return Err(BootEntryError::InvalidParameter("kernel path is a directory"));
        }

        let kernel_version = match read_kernel_version(kernel.as_mut()) {
            Ok(version) => {
                log::debug!("Kernel {} version {}", kernel_path, version);
                Some(version)
            }
            Err(BootEntryError::OutOfResources) => return Err(BootEntryError::OutOfResources),
            Err(err) => {
                log::warn!("No version for {} - {}", kernel_path, err);
                None
            }
        };
        drop(kernel);

        Ok(self.build_entry(fs, entry_stem(file_name), &record, kernel_path, kernel_version.as_ref()))
    }

    fn build_entry(
        &self,
        fs: &BootFilesystem,
        stem: &str,
        record: &LoaderSpecRecord,
        kernel_path: String,
        kernel_version: Option<&KernelVersion>,
    ) -> BootEntry {
        let release = kernel_version.map(KernelVersion::release).filter(|release| !release.is_empty());

        let mut name = String::new();
        let mut named_by_version = false;
        if let Some(title) = &record.title {
            name.push_str(title);
        } else if let Some(version) = record.version.as_deref().or(release) {
            name.push_str(version);
            named_by_version = true;
        } else {
            name.push_str(stem);
        }

        if self.config.version_in_name && !named_by_version && record.version.is_none() {
            if let Some(release) = release {
                name.push_str(" (");
                name.push_str(release);
                name.push(')');
            }
        }

        let mut entry = BootEntry::new(
            &name,
            BootEntryKind::Filesystem,
            EntryTarget::File { device: fs.handle(), path: kernel_path },
        );
        entry.id = String::from(stem);
        entry.initrds = record.initrd_paths().collect();
        entry.arguments = load_options(record.options.as_deref(), &entry.initrds, &self.config.extra_options);
        entry.kernel_version = kernel_version.map(|version| String::from(version.as_str()));
        entry.sort_key = record.sort_key.clone();

        entry
    }
}

/// Entry options, one `initrd=` per ramdisk, then configured extras
fn load_options(options: Option<&str>, initrds: &[String], extra: &str) -> String {
    let mut arguments = String::new();

    let mut append = |part: &str| {
        if part.is_empty() {
            return;
        }
        if !arguments.is_empty() {
            arguments.push(' ');
        }
        arguments.push_str(part);
    };

    append(options.unwrap_or(""));
    for initrd in initrds {
        append(&alloc::format!("initrd={}", initrd));
    }
    append(extra);

    arguments
}

impl BootEntryProvider for LinuxBootProvider {
    fn revision(&self) -> usize {
        BOOT_ENTRY_PROTOCOL_REVISION
    }

    fn get_boot_entries(&self, request: FsRequest<'_>, prescan_name: Option<&str>) -> Result<Vec<BootEntry>> {
        let FsRequest::Filesystem(fs) = request else {
            return Err(BootEntryError::NotFound);
        };

        let policy = fs.policy(self.policy.as_ref());
        if policy.intersects(FsPolicy::APPLE_FILESYSTEMS) {
            log::info!("{} - not scanning {}", policy.filesystem_label(), fs.handle());
            return Err(BootEntryError::NotFound);
        }

        if let Some(partition) = fs.partition() {
            log::debug!("TypeGUID: {} PARTUUID: {}", partition.type_guid, partition.unique_guid);
        }

        let result = self.scan_filesystem(fs, prescan_name);
        match &result {
            Ok(entries) => log::debug!("Found {} entries on {}", entries.len(), fs.handle()),
            Err(BootEntryError::NotFound) => log::info!("Nothing found on {}", fs.handle()),
            Err(_) => {}
        }

        result
    }
}
