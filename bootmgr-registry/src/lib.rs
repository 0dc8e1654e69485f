//! Bootmgr Registry
//!
//! Provider bookkeeping and result aggregation for the boot entry
//! subsystem.
//!
//! - **Table**: installed providers, keyed by handle, in install order
//! - **Discovery**: one discovery pass; validates providers once and merges
//!   their entries per filesystem
//!
//! # Usage
//!
//! ```rust
//! use bootmgr_api::FsRequest;
//! use bootmgr_registry::{DiscoveryPass, ProviderTable};
//!
//! let table = ProviderTable::new();
//! let mut pass = DiscoveryPass::begin(&table);
//! assert!(pass.registrations().is_empty());
//! assert!(pass.query_providers(FsRequest::CustomEntries).is_err());
//! ```

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod discovery;
pub mod table;

pub use discovery::{DiscoveryPass, EntryProviderRegistration, RegistrationState};
pub use table::{ProviderHandle, ProviderLocator, ProviderTable};
