//! End-to-end discovery scenarios

use std::sync::Arc;

use bootmgr_api::{
    BOOT_ENTRY_PROTOCOL_GUID, BOOT_ENTRY_PROTOCOL_REVISION, BootEntry, BootEntryError, BootEntryKind,
    BootEntryProvider, EntryTarget, FsPolicy, FsRequest, Guid, Result,
};
use bootmgr_linux::{LinuxBootConfig, LinuxBootProvider};
use bootmgr_registry::{DiscoveryPass, ProviderTable, RegistrationState};
use proptest::prelude::*;

use crate::common::{ESP_GUID, FixtureMachine, kernel_image};
use crate::discover;

struct ToolsProvider {
    revision: usize,
}

impl BootEntryProvider for ToolsProvider {
    fn revision(&self) -> usize {
        self.revision
    }

    fn get_boot_entries(&self, request: FsRequest<'_>, _prescan_name: Option<&str>) -> Result<Vec<BootEntry>> {
        if !request.is_custom() {
            return Err(BootEntryError::NotFound);
        }

        Ok(vec![BootEntry::new("UEFI Shell", BootEntryKind::Custom, EntryTarget::Payload(b"shell".to_vec()))])
    }
}

fn names(entries: &[BootEntry]) -> Vec<&str> {
    entries.iter().map(BootEntry::name).collect()
}

#[test]
fn test_dual_boot_menu() {
    let machine = FixtureMachine::dual_boot();
    let entries = discover(&machine, LinuxBootConfig::default()).unwrap();

    assert_eq!(names(&entries), ["Arch Linux", "6.5.6-300.fc39.x86_64"]);
    assert!(entries.iter().all(|entry| entry.device() == Some(machine.handle(0))));
    assert!(entries.iter().all(|entry| entry.is_external));

    let arch = &entries[0];
    assert_eq!(arch.id, "arch");
    assert_eq!(arch.path(), Some("\\vmlinuz-linux"));
    assert_eq!(arch.arguments, "root=LABEL=arch rw initrd=\\initramfs-linux.img");
    assert_eq!(
        arch.kernel_version.as_deref(),
        Some("6.6.1-arch1-1 (linux@archlinux) #1 SMP PREEMPT_DYNAMIC")
    );

    let fedora = &entries[1];
    assert_eq!(fedora.sort_key.as_deref(), Some("fedora"));
    assert_eq!(fedora.arguments, "root=UUID=5c8f rhgb quiet");
}

#[test]
fn test_apple_volume_is_never_opened() {
    let machine = FixtureMachine::dual_boot();
    discover(&machine, LinuxBootConfig::default()).unwrap();

    assert!(machine.volume(1).opened_paths().is_empty());
    assert_eq!(machine.volume(2).open_count("\\loader\\entries"), 1);
}

#[test]
fn test_policy_is_classified_once_per_filesystem() {
    let machine = FixtureMachine::dual_boot();
    let first = discover(&machine, LinuxBootConfig::default()).unwrap();
    let second = discover(&machine, LinuxBootConfig::default()).unwrap();

    assert_eq!(first, second);
    for index in 0..machine.filesystems().len() {
        assert_eq!(machine.policy_lookups(index), 1);
    }
}

#[test]
fn test_custom_and_stale_providers() {
    let machine = FixtureMachine::dual_boot();

    let mut table = ProviderTable::new();
    table.install(BOOT_ENTRY_PROTOCOL_GUID, Arc::new(ToolsProvider { revision: BOOT_ENTRY_PROTOCOL_REVISION + 7 }));
    bootmgr_linux::install(&mut table, machine.policy(), LinuxBootConfig::default()).unwrap();
    table.install(BOOT_ENTRY_PROTOCOL_GUID, Arc::new(ToolsProvider { revision: BOOT_ENTRY_PROTOCOL_REVISION }));

    let mut pass = DiscoveryPass::begin(&table);
    let entries = pass.collect(machine.filesystems()).unwrap();

    assert_eq!(names(&entries), ["Arch Linux", "6.5.6-300.fc39.x86_64", "UEFI Shell"]);
    assert_eq!(entries[2].kind, BootEntryKind::Custom);

    let states: Vec<RegistrationState> = pass.registrations().iter().map(|r| r.state()).collect();
    assert_eq!(states, [RegistrationState::Invalid, RegistrationState::Valid, RegistrationState::Valid]);
}

#[test]
fn test_invalid_configuration_is_rejected() {
    let machine = FixtureMachine::dual_boot();
    let config = LinuxBootConfig { max_conf_size: 0, ..LinuxBootConfig::default() };

    assert_eq!(
        discover(&machine, config),
        Err(BootEntryError::InvalidParameter("Entry file size bound must not be zero"))
    );
}

#[test]
fn test_prescan_on_dual_boot_esp() {
    let machine = FixtureMachine::dual_boot();
    let provider = LinuxBootProvider::new(machine.policy(), LinuxBootConfig::default());
    let esp = FsRequest::Filesystem(&machine.filesystems()[0]);

    let found = provider.get_boot_entries(esp, Some("6.5.6-300.fc39.x86_64")).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, "fedora");

    assert_eq!(provider.get_boot_entries(esp, Some("Windows")), Err(BootEntryError::NotFound));
}

#[test]
fn test_empty_machine_is_an_empty_menu() {
    let mut machine = FixtureMachine::new();
    machine.add_filesystem(FsPolicy::ALLOW_FS_ESP, ESP_GUID);

    assert_eq!(discover(&machine, LinuxBootConfig::default()), Ok(Vec::new()));
}

proptest! {
    #[test]
    fn prop_entries_are_grouped_by_filesystem(layout in prop::collection::vec((0usize..4, any::<bool>()), 1..5)) {
        let mut machine = FixtureMachine::new();
        let mut expected = Vec::new();

        for (index, (count, apple)) in layout.iter().enumerate() {
            let kind = if *apple { FsPolicy::ALLOW_FS_HFS } else { FsPolicy::ALLOW_FS_ESP };
            let volume = machine.add_filesystem(kind, Guid::zero());
            volume.add_file("\\vmlinuz", &kernel_image("6.1.0"));

            for entry in 0..*count {
                let title = format!("fs{} entry{}", index, entry);
                volume.add_file(
                    &format!("\\loader\\entries\\{}.conf", entry),
                    format!("title {}\nlinux /vmlinuz\n", title).as_bytes(),
                );
                if !*apple {
                    expected.push(title);
                }
            }
        }

        let entries = discover(&machine, LinuxBootConfig::default()).unwrap();
        prop_assert_eq!(names(&entries), expected);
    }
}
