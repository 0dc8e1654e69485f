//! Provider table
//!
//! This module keeps the set of installed providers, the way firmware keeps
//! protocol interfaces on handles: providers are installed under a contract
//! GUID and later located by that GUID.

use alloc::collections::BTreeMap;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use bootmgr_api::{BootEntryError, BootEntryProvider, Guid, Result};

/// Opaque handle a provider is installed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProviderHandle(pub usize);

impl fmt::Display for ProviderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Platform-level provider lookup
#[cfg_attr(test, mockall::automock)]
pub trait ProviderLocator {
    /// Handles carrying `protocol`, in discovery order.
    ///
    /// Fails with `NotFound` when no handle carries it.
    fn locate(&self, protocol: &Guid) -> Result<Vec<ProviderHandle>>;

    /// Interface installed on `handle` under `protocol`
    fn open(&self, handle: ProviderHandle, protocol: &Guid) -> Result<Arc<dyn BootEntryProvider>>;
}

struct InstalledProvider {
    protocol: Guid,
    provider: Arc<dyn BootEntryProvider>,
}

/// Installed providers, enumerated in install order
pub struct ProviderTable {
    /// Installed interfaces
    providers: BTreeMap<ProviderHandle, InstalledProvider>,
    /// Next available handle
    next_handle: usize,
}

impl ProviderTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self {
            providers: BTreeMap::new(),
            next_handle: 1,
        }
    }

    /// Install `provider` under `protocol` on a fresh handle
    pub fn install(&mut self, protocol: Guid, provider: Arc<dyn BootEntryProvider>) -> ProviderHandle {
        let handle = ProviderHandle(self.next_handle);
        self.next_handle += 1;

        self.providers.insert(handle, InstalledProvider { protocol, provider });
        log::debug!("Installed provider {} for {}", handle, protocol);

        handle
    }

    /// Remove the provider installed on `handle`
    pub fn uninstall(&mut self, handle: ProviderHandle) -> Result<()> {
        self.providers
            .remove(&handle)
            .map(|_| ())
            .ok_or(BootEntryError::NotFound)
    }

    /// Number of installed providers
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl Default for ProviderTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderLocator for ProviderTable {
    fn locate(&self, protocol: &Guid) -> Result<Vec<ProviderHandle>> {
        let handles: Vec<ProviderHandle> = self
            .providers
            .iter()
            .filter(|(_, installed)| installed.protocol == *protocol)
            .map(|(handle, _)| *handle)
            .collect();

        if handles.is_empty() {
            return Err(BootEntryError::NotFound);
        }

        Ok(handles)
    }

    fn open(&self, handle: ProviderHandle, protocol: &Guid) -> Result<Arc<dyn BootEntryProvider>> {
        let installed = self
            .providers
            .get(&handle)
            .ok_or(BootEntryError::InvalidParameter("unknown provider handle"))?;

        if installed.protocol != *protocol {
            return Err(BootEntryError::Unsupported);
        }

        Ok(Arc::clone(&installed.provider))
    }
}
