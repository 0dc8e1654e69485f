//! Scannable filesystems
//!
//! A [`BootFilesystem`] is one volume the orchestrator found during a boot
//! menu build. Providers receive it wrapped in an [`FsRequest`], which is
//! also how the "custom entries only" request is spelled.

use alloc::sync::Arc;
use core::fmt;

use bitflags::bitflags;
use spin::Once;

use crate::guid::Guid;
use crate::volume::Volume;

bitflags! {
    /// Filesystem and device classification, in scan policy bit layout
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FsPolicy: u32 {
        const FILE_SYSTEM_LOCK = 1 << 0;
        const DEVICE_LOCK = 1 << 1;

        const ALLOW_FS_APFS = 1 << 8;
        const ALLOW_FS_HFS = 1 << 9;
        const ALLOW_FS_ESP = 1 << 10;
        const ALLOW_FS_NTFS = 1 << 11;
        const ALLOW_FS_EXT = 1 << 12;

        const ALLOW_DEVICE_SATA = 1 << 16;
        const ALLOW_DEVICE_SASEX = 1 << 17;
        const ALLOW_DEVICE_SCSI = 1 << 18;
        const ALLOW_DEVICE_NVME = 1 << 19;
        const ALLOW_DEVICE_ATAPI = 1 << 20;
        const ALLOW_DEVICE_USB = 1 << 21;
        const ALLOW_DEVICE_FIREWIRE = 1 << 22;
        const ALLOW_DEVICE_SDCARD = 1 << 23;
        const ALLOW_DEVICE_PCI = 1 << 24;

        const FILE_SYSTEM_BITS = 0x0000_FF00;
        const DEVICE_BITS = 0x00FF_0000;
    }
}

impl FsPolicy {
    /// Apple-native and legacy Apple filesystems
    pub const APPLE_FILESYSTEMS: FsPolicy = FsPolicy::ALLOW_FS_APFS.union(FsPolicy::ALLOW_FS_HFS);

    /// Short label of the first filesystem kind bit set, for logging
    pub fn filesystem_label(&self) -> &'static str {
        if self.contains(FsPolicy::ALLOW_FS_APFS) {
            "APFS"
        } else if self.contains(FsPolicy::ALLOW_FS_HFS) {
            "HFS"
        } else if self.contains(FsPolicy::ALLOW_FS_ESP) {
            "ESP"
        } else if self.contains(FsPolicy::ALLOW_FS_NTFS) {
            "NTFS"
        } else if self.contains(FsPolicy::ALLOW_FS_EXT) {
            "EXT"
        } else {
            "unknown"
        }
    }
}

/// Opaque platform handle of a filesystem
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FsHandle(pub usize);

impl fmt::Display for FsHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Filesystem classification service owned outside this subsystem
pub trait FileSystemPolicy {
    /// Classify the filesystem behind `handle`
    fn classify(&self, handle: FsHandle) -> FsPolicy;
}

impl<F> FileSystemPolicy for F
where
    F: Fn(FsHandle) -> FsPolicy,
{
    fn classify(&self, handle: FsHandle) -> FsPolicy {
        self(handle)
    }
}

/// GPT identity of the partition backing a filesystem
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionInfo {
    pub type_guid: Guid,
    pub unique_guid: Guid,
}

/// One scannable volume
pub struct BootFilesystem {
    handle: FsHandle,
    volume: Arc<dyn Volume>,
    partition: Option<PartitionInfo>,
    policy: Once<FsPolicy>,
}

impl BootFilesystem {
    /// Create a filesystem record for `volume`
    pub fn new(handle: FsHandle, volume: Arc<dyn Volume>) -> Self {
        Self {
            handle,
            volume,
            partition: None,
            policy: Once::new(),
        }
    }

    /// Attach GPT partition identity
    pub fn with_partition(mut self, partition: PartitionInfo) -> Self {
        self.partition = Some(partition);
        self
    }

    pub fn handle(&self) -> FsHandle {
        self.handle
    }

    pub fn volume(&self) -> &dyn Volume {
        self.volume.as_ref()
    }

    pub fn partition(&self) -> Option<&PartitionInfo> {
        self.partition.as_ref()
    }

    /// Policy bitmask, asked of `oracle` on first use and cached afterwards
    pub fn policy(&self, oracle: &dyn FileSystemPolicy) -> FsPolicy {
        *self.policy.call_once(|| {
            let policy = oracle.classify(self.handle);
            log::trace!("Filesystem {} classified as {:#x}", self.handle, policy.bits());
            policy
        })
    }
}

impl fmt::Debug for BootFilesystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BootFilesystem")
            .field("handle", &self.handle)
            .field("partition", &self.partition)
            .field("policy", &self.policy.get())
            .finish()
    }
}

/// What a provider is asked to enumerate
#[derive(Debug, Clone, Copy)]
pub enum FsRequest<'a> {
    /// Entries living on one concrete filesystem
    Filesystem(&'a BootFilesystem),
    /// Provider-global custom entries, not bound to any filesystem
    CustomEntries,
}

impl<'a> FsRequest<'a> {
    pub fn filesystem(&self) -> Option<&'a BootFilesystem> {
        match *self {
            FsRequest::Filesystem(fs) => Some(fs),
            FsRequest::CustomEntries => None,
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, FsRequest::CustomEntries)
    }
}

impl fmt::Display for FsRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FsRequest::Filesystem(fs) => write!(f, "filesystem {}", fs.handle()),
            FsRequest::CustomEntries => f.write_str("custom entries"),
        }
    }
}
