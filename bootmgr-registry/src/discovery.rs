//! Discovery pass
//!
//! A [`DiscoveryPass`] is created at the start of a boot menu build and
//! dropped at its end. It locates installed providers once, validates each
//! provider's contract revision on first use, and queries the remaining
//! providers in discovery order for every filesystem it is asked about.
//!
//! Provider failures never abort the pass: a provider that finds nothing,
//! or fails, simply contributes nothing for that filesystem.

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use bootmgr_api::{
    BOOT_ENTRY_PROTOCOL_GUID, BOOT_ENTRY_PROTOCOL_REVISION, BootEntry, BootEntryError, BootEntryProvider,
    BootFilesystem, FsRequest, Result,
};

use crate::table::{ProviderHandle, ProviderLocator};

/// Validation state of a registration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationState {
    /// Not queried yet; revision unchecked
    Pending,
    /// Revision matched; queried on every request
    Valid,
    /// Skipped for the rest of the pass
    Invalid,
}

/// One installed provider, as seen by a discovery pass
pub struct EntryProviderRegistration {
    handle: ProviderHandle,
    /// Dropped once the registration is invalidated
    provider: Option<Arc<dyn BootEntryProvider>>,
    revision: Option<usize>,
    state: RegistrationState,
}

impl EntryProviderRegistration {
    pub fn handle(&self) -> ProviderHandle {
        self.handle
    }

    /// Revision the provider published, once checked
    pub fn revision(&self) -> Option<usize> {
        self.revision
    }

    pub fn state(&self) -> RegistrationState {
        self.state
    }

    pub fn is_valid(&self) -> bool {
        self.state != RegistrationState::Invalid
    }

    fn invalidate(&mut self) {
        self.provider = None;
        self.state = RegistrationState::Invalid;
    }

    /// Provider to query, checking its revision on first use
    fn usable(&mut self) -> Option<Arc<dyn BootEntryProvider>> {
        match self.state {
            RegistrationState::Invalid => None,
            RegistrationState::Valid => self.provider.clone(),
            RegistrationState::Pending => {
                let provider = self.provider.clone()?;
                let revision = provider.revision();
                self.revision = Some(revision);

                if revision != BOOT_ENTRY_PROTOCOL_REVISION {
                    let err = BootEntryError::IncompatibleRevision {
                        found: revision,
                        expected: BOOT_ENTRY_PROTOCOL_REVISION,
                    };
                    log::error!("Disabling provider {} - {}", self.handle, err);
                    self.invalidate();
                    return None;
                }

                self.state = RegistrationState::Valid;
                Some(provider)
            }
        }
    }
}

impl fmt::Debug for EntryProviderRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryProviderRegistration")
            .field("handle", &self.handle)
            .field("revision", &self.revision)
            .field("state", &self.state)
            .finish()
    }
}

/// Pass-local provider context
#[derive(Debug)]
pub struct DiscoveryPass {
    registrations: Vec<EntryProviderRegistration>,
}

impl DiscoveryPass {
    /// Start a pass with every provider `locator` knows about
    pub fn begin(locator: &dyn ProviderLocator) -> Self {
        let registrations = Self::discover_providers(locator);
        log::info!("Discovery pass started with {} providers", registrations.len());
        Self { registrations }
    }

    /// Locate installed providers.
    ///
    /// No installed provider is a normal outcome and yields an empty list.
    pub fn discover_providers(locator: &dyn ProviderLocator) -> Vec<EntryProviderRegistration> {
        let handles = match locator.locate(&BOOT_ENTRY_PROTOCOL_GUID) {
            Ok(handles) => handles,
            Err(BootEntryError::NotFound) => Vec::new(),
            Err(err) => {
                log::error!("Error locating provider handles - {}", err);
                Vec::new()
            }
        };

        handles
            .into_iter()
            .map(|handle| match locator.open(handle, &BOOT_ENTRY_PROTOCOL_GUID) {
                Ok(provider) => EntryProviderRegistration {
                    handle,
                    provider: Some(provider),
                    revision: None,
                    state: RegistrationState::Pending,
                },
                Err(err) => {
                    log::error!("Unable to open provider {} - {}", handle, err);
                    EntryProviderRegistration {
                        handle,
                        provider: None,
                        revision: None,
                        state: RegistrationState::Invalid,
                    }
                }
            })
            .collect()
    }

    pub fn registrations(&self) -> &[EntryProviderRegistration] {
        &self.registrations
    }

    /// Query every still-valid provider for `request` and merge the results.
    ///
    /// Entries keep registration order, then each provider's own order.
    /// Fails with `NotFound` when no provider returned entries, and with
    /// `OutOfResources` if the merged list cannot grow.
    pub fn query_providers(&mut self, request: FsRequest<'_>) -> Result<Vec<BootEntry>> {
        let mut merged: Vec<BootEntry> = Vec::new();
        let mut contributed = false;

        for registration in &mut self.registrations {
            let Some(provider) = registration.usable() else {
                continue;
            };

            match provider.get_boot_entries(request, None) {
                Ok(entries) if entries.is_empty() => {
                    log::debug!("Provider {} returned an empty list for {}", registration.handle, request);
                }
                Ok(mut entries) => {
                    merged.try_reserve(entries.len())?;
                    for entry in &mut entries {
                        entry.is_external = true;
                    }
                    log::debug!(
                        "Provider {} returned {} entries for {}",
                        registration.handle,
                        entries.len(),
                        request
                    );
                    merged.append(&mut entries);
                    contributed = true;
                }
                Err(BootEntryError::NotFound) => {}
                Err(err) => {
                    log::error!("Unable to fetch boot entries from provider {} - {}", registration.handle, err);
                }
            }
        }

        if !contributed {
            return Err(BootEntryError::NotFound);
        }

        Ok(merged)
    }

    /// Query every filesystem in order, then the custom entries request.
    ///
    /// An empty result is a normal empty menu, not an error.
    pub fn collect(&mut self, filesystems: &[BootFilesystem]) -> Result<Vec<BootEntry>> {
        let mut all: Vec<BootEntry> = Vec::new();

        let requests = filesystems
            .iter()
            .map(FsRequest::Filesystem)
            .chain(core::iter::once(FsRequest::CustomEntries));

        for request in requests {
            match self.query_providers(request) {
                Ok(mut entries) => {
                    all.try_reserve(entries.len())?;
                    all.append(&mut entries);
                }
                Err(BootEntryError::NotFound) => {
                    log::debug!("Nothing found for {}", request);
                }
                Err(err) => return Err(err),
            }
        }

        Ok(all)
    }
}
