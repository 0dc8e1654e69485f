//! Bootmgr API
//!
//! Core interfaces and types shared by the boot entry aggregator and every
//! boot entry provider.
//!
//! # Architecture
//!
//! - **Protocol**: the provider contract and its revision
//! - **Entry**: presentable boot entries handed to the boot menu
//! - **Filesystem**: scannable volumes, scan requests and the policy oracle
//! - **Volume**: the file protocol providers read through
//! - **Error**: the error taxonomy shared across the workspace
//!
//! # Usage
//!
//! ```rust
//! use bootmgr_api::{BootEntryError, FsRequest, Result};
//! use bootmgr_api::entry::BootEntry;
//! use bootmgr_api::protocol::{BootEntryProvider, BOOT_ENTRY_PROTOCOL_REVISION};
//!
//! struct NothingHere;
//!
//! impl BootEntryProvider for NothingHere {
//!     fn revision(&self) -> usize {
//!         BOOT_ENTRY_PROTOCOL_REVISION
//!     }
//!
//!     fn get_boot_entries(
//!         &self,
//!         _request: FsRequest<'_>,
//!         _prescan_name: Option<&str>,
//!     ) -> Result<Vec<BootEntry>> {
//!         Err(BootEntryError::NotFound)
//!     }
//! }
//! ```

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod entry;
pub mod error;
pub mod filesystem;
pub mod guid;
pub mod memory;
pub mod protocol;
pub mod volume;

// Re-export commonly used items
pub use entry::{BootEntry, BootEntryKind, EntryTarget, MAX_ENTRY_NAME_LEN};
pub use error::{BootEntryError, ErrorClass, Result};
pub use filesystem::{BootFilesystem, FileSystemPolicy, FsHandle, FsPolicy, FsRequest, PartitionInfo};
pub use guid::Guid;
pub use protocol::{BOOT_ENTRY_PROTOCOL_GUID, BOOT_ENTRY_PROTOCOL_REVISION, BootEntryProvider};
pub use volume::{FileAttribute, FileHandle, FileInfo, Volume, VolumeError, VolumeResult};
