//! Bootmgr Linux
//!
//! Boot entry provider for Linux installations laid out per the Boot
//! Loader Specification: one `.conf` file per entry under
//! `\loader\entries`.
//!
//! - **Scanner**: entries directory walk and candidate filtering
//! - **Loader spec**: entry file parsing
//! - **Kernel header**: version string lookup in bzImage headers
//! - **Provider**: the [`LinuxBootProvider`] tying the above together
//! - **UEFI volume**: firmware file access (`uefi_support` feature)
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use bootmgr_api::{FsHandle, FsPolicy};
//! use bootmgr_linux::LinuxBootConfig;
//! use bootmgr_registry::{DiscoveryPass, ProviderTable};
//!
//! let mut table = ProviderTable::new();
//! let policy = Arc::new(|_: FsHandle| FsPolicy::ALLOW_FS_ESP);
//! bootmgr_linux::install(&mut table, policy, LinuxBootConfig::default()).unwrap();
//!
//! let pass = DiscoveryPass::begin(&table);
//! assert_eq!(pass.registrations().len(), 1);
//! ```

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod config;
pub mod kernel_header;
pub mod loader_spec;
pub mod provider;
pub mod scanner;

#[cfg(feature = "uefi_support")]
pub mod uefi_volume;

use alloc::sync::Arc;

use bootmgr_api::{BOOT_ENTRY_PROTOCOL_GUID, BootEntryError, FileSystemPolicy, Result};
use bootmgr_registry::{ProviderHandle, ProviderTable};

pub use config::LinuxBootConfig;
pub use kernel_header::{KernelVersion, read_kernel_version};
pub use loader_spec::LoaderSpecRecord;
pub use provider::LinuxBootProvider;
pub use scanner::{EntryScan, is_loader_entry_name};

/// Publish a Linux provider in `table`.
///
/// Fails with `InvalidParameter` if `config` does not validate.
pub fn install(
    table: &mut ProviderTable,
    policy: Arc<dyn FileSystemPolicy>,
    config: LinuxBootConfig,
) -> Result<ProviderHandle> {
    config.validate().map_err(BootEntryError::InvalidParameter)?;

    log::info!("Installing Linux boot entry provider for {}", config.entries_dir);
    let provider = LinuxBootProvider::new(policy, config);
    Ok(table.install(BOOT_ENTRY_PROTOCOL_GUID, Arc::new(provider)))
}
