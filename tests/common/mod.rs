//! Common test utilities
//!
//! Fixture machines: a set of filesystems, each an in-memory volume with a
//! policy classification, plus the oracle answering for them.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use bootmgr_api::memory::MemoryVolume;
use bootmgr_api::{BootFilesystem, FileSystemPolicy, FsHandle, FsPolicy, Guid, PartitionInfo};

/// Linux filesystem data partition type
pub const LINUX_DATA_GUID: Guid =
    Guid::new(0x0FC63DAF, 0x8483, 0x4772, [0x8E, 0x79, 0x3D, 0x69, 0xD8, 0x47, 0x7D, 0xE4]);

/// EFI system partition type
pub const ESP_GUID: Guid = Guid::new(0xC12A7328, 0xF81F, 0x11D2, [0xBA, 0x4B, 0x00, 0xA0, 0xC9, 0x3E, 0xC9, 0x3B]);

/// Build a bzImage-like image carrying `banner` as its version string
pub fn kernel_image(banner: &str) -> Vec<u8> {
    let mut data = vec![0u8; 0x800];
    data[0x20E..0x210].copy_from_slice(&0x200u16.to_le_bytes());
    data[0x400..0x400 + banner.len()].copy_from_slice(banner.as_bytes());
    data
}

/// Policy oracle backed by a fixed table; counts lookups per handle
#[derive(Default)]
pub struct FixturePolicy {
    kinds: Mutex<BTreeMap<FsHandle, FsPolicy>>,
    lookups: Mutex<BTreeMap<FsHandle, usize>>,
}

impl FixturePolicy {
    /// Classify `handle` as `kind` from now on
    pub fn set(&self, handle: FsHandle, kind: FsPolicy) {
        if let Ok(mut kinds) = self.kinds.lock() {
            kinds.insert(handle, kind);
        }
    }

    pub fn lookups(&self, handle: FsHandle) -> usize {
        self.lookups.lock().map(|lookups| lookups.get(&handle).copied().unwrap_or(0)).unwrap_or(0)
    }
}

impl FileSystemPolicy for FixturePolicy {
    fn classify(&self, handle: FsHandle) -> FsPolicy {
        if let Ok(mut lookups) = self.lookups.lock() {
            *lookups.entry(handle).or_default() += 1;
        }
        self.kinds
            .lock()
            .ok()
            .and_then(|kinds| kinds.get(&handle).copied())
            .unwrap_or(FsPolicy::empty())
    }
}

/// A machine with several filesystems
pub struct FixtureMachine {
    volumes: Vec<Arc<MemoryVolume>>,
    filesystems: Vec<BootFilesystem>,
    policy: Arc<FixturePolicy>,
}

impl FixtureMachine {
    pub fn new() -> Self {
        Self {
            volumes: Vec::new(),
            filesystems: Vec::new(),
            policy: Arc::new(FixturePolicy::default()),
        }
    }

    /// Add a filesystem of kind `kind`; returns its volume for population
    pub fn add_filesystem(&mut self, kind: FsPolicy, partition_type: Guid) -> Arc<MemoryVolume> {
        let handle = FsHandle(0x100 + self.filesystems.len());
        let volume = Arc::new(MemoryVolume::new());

        let partition = PartitionInfo {
            type_guid: partition_type,
            unique_guid: Guid::new(handle.0 as u32, 0, 0, [0; 8]),
        };

        self.policy.set(handle, kind);
        self.filesystems.push(BootFilesystem::new(handle, volume.clone()).with_partition(partition));
        self.volumes.push(volume.clone());
        volume
    }

    pub fn filesystems(&self) -> &[BootFilesystem] {
        &self.filesystems
    }

    pub fn volume(&self, index: usize) -> &MemoryVolume {
        &self.volumes[index]
    }

    pub fn handle(&self, index: usize) -> FsHandle {
        self.filesystems[index].handle()
    }

    pub fn policy(&self) -> Arc<dyn FileSystemPolicy> {
        self.policy.clone()
    }

    pub fn policy_lookups(&self, index: usize) -> usize {
        self.policy.lookups(self.handle(index))
    }

    /// Dual-boot machine: an ESP with Arch and Fedora entries, an APFS
    /// container that also carries entries, and an empty ext4 root.
    pub fn dual_boot() -> Self {
        let mut machine = Self::new();

        let esp = machine.add_filesystem(FsPolicy::ALLOW_FS_ESP | FsPolicy::ALLOW_DEVICE_NVME, ESP_GUID);
        esp.add_file("\\vmlinuz-linux", &kernel_image("6.6.1-arch1-1 (linux@archlinux) #1 SMP PREEMPT_DYNAMIC"));
        esp.add_file("\\initramfs-linux.img", b"initramfs");
        esp.add_file(
            "\\loader\\entries\\arch.conf",
            b"title Arch Linux\nlinux /vmlinuz-linux\ninitrd /initramfs-linux.img\noptions root=LABEL=arch rw\n",
        );
        esp.add_file("\\vmlinuz-6.5.6-300.fc39.x86_64", &kernel_image("6.5.6-300.fc39.x86_64 (mockbuild@fedoraproject.org) #1 SMP"));
        esp.add_file(
            "\\loader\\entries\\fedora.conf",
            b"# Boot Loader Specification type#1 entry\nversion 6.5.6-300.fc39.x86_64\nsort-key fedora\nlinux /vmlinuz-6.5.6-300.fc39.x86_64\noptions root=UUID=5c8f rhgb quiet\n",
        );
        esp.add_file("\\loader\\entries\\auto-windows.conf", b"title Windows\nlinux /nope\n");
        esp.add_file("\\loader\\loader.conf", b"timeout 3\n");

        let apfs = machine.add_filesystem(FsPolicy::ALLOW_FS_APFS | FsPolicy::ALLOW_DEVICE_NVME, Guid::zero());
        apfs.add_file("\\vmlinuz", &kernel_image("6.1.0"));
        apfs.add_file("\\loader\\entries\\hidden.conf", b"title Should Not Appear\nlinux /vmlinuz\n");

        let root = machine.add_filesystem(FsPolicy::ALLOW_FS_EXT | FsPolicy::ALLOW_DEVICE_SATA, LINUX_DATA_GUID);
        root.add_dir("\\home");

        machine
    }
}

impl Default for FixtureMachine {
    fn default() -> Self {
        Self::new()
    }
}
