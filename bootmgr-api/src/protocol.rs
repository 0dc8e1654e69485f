//! Boot entry provider contract
//!
//! Every boot entry provider implements [`BootEntryProvider`] and publishes
//! it under [`BOOT_ENTRY_PROTOCOL_GUID`]. The aggregator is the only caller.

use alloc::vec::Vec;

use crate::entry::BootEntry;
use crate::error::Result;
use crate::filesystem::FsRequest;
use crate::guid::Guid;

/// Contract identifier providers are published under
pub const BOOT_ENTRY_PROTOCOL_GUID: Guid =
    Guid::new(0x8604716E, 0xADD4, 0x45B4, [0x84, 0x95, 0x08, 0xE3, 0x6D, 0x49, 0x7F, 0x4F]);

/// Contract revision; bump on any incompatible change
pub const BOOT_ENTRY_PROTOCOL_REVISION: usize = 0;

/// Boot entry provider
pub trait BootEntryProvider {
    /// Contract revision this provider was built against
    fn revision(&self) -> usize;

    /// Return the boot entries associated with `request`.
    ///
    /// [`FsRequest::CustomEntries`] must be supported by every provider: it
    /// either yields the provider's global entries or fails with
    /// `NotFound`, never with any other error.
    ///
    /// When `prescan_name` is present, only the first entry with that name
    /// (in the same order the full list would have been returned) is
    /// produced, as a list of length one. It is meaningless for
    /// `CustomEntries` and ignored there. Providers able to return more than
    /// one entry for a filesystem must honour it.
    ///
    /// On success the list is non-empty and owned by the caller. Fails with
    /// `NotFound` when nothing matched and `OutOfResources` on allocation
    /// failure; any other error comes from a sub-operation and is passed
    /// through unchanged. Must not alter the filesystem it is given.
    fn get_boot_entries(&self, request: FsRequest<'_>, prescan_name: Option<&str>) -> Result<Vec<BootEntry>>;
}
