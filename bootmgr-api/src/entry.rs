//! Boot entries
//!
//! A [`BootEntry`] is one presentable boot option. Entries are owned
//! values: a provider builds them, the aggregator takes them over, and the
//! orchestrator drops them once consumed.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::filesystem::FsHandle;

/// Maximum display name length in bytes, terminator excluded.
///
/// Entry names may end up in firmware variable storage as 8-bit
/// NUL-terminated strings.
pub const MAX_ENTRY_NAME_LEN: usize = 127;

/// Entry kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootEntryKind {
    /// Bound to the filesystem it was found on
    Filesystem,
    /// Provider-global entry not bound to any scanned filesystem
    Custom,
}

/// How the orchestrator locates what the entry boots
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryTarget {
    /// A file on a device
    File { device: FsHandle, path: String },
    /// Provider-specific payload
    Payload(Vec<u8>),
}

/// One discovered boot option
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootEntry {
    name: String,
    /// Stable identifier within the provider, e.g. the source file stem
    pub id: String,
    pub kind: BootEntryKind,
    pub target: EntryTarget,
    /// Load options passed to the target
    pub arguments: String,
    /// Initial ramdisk paths, in declaration order
    pub initrds: Vec<String>,
    /// Kernel version recovered from the image, if any
    pub kernel_version: Option<String>,
    /// Ordering hint for the orchestrator; this subsystem never sorts
    pub sort_key: Option<String>,
    /// Created by a provider rather than the orchestrator itself
    pub is_external: bool,
}

impl BootEntry {
    /// Create an entry; `name` is capped to [`MAX_ENTRY_NAME_LEN`] bytes
    pub fn new(name: &str, kind: BootEntryKind, target: EntryTarget) -> Self {
        Self {
            name: cap_entry_name(name),
            id: String::new(),
            kind,
            target,
            arguments: String::new(),
            initrds: Vec::new(),
            kernel_version: None,
            sort_key: None,
            is_external: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Replace the display name, applying the same cap
    pub fn set_name(&mut self, name: &str) {
        self.name = cap_entry_name(name);
    }

    /// Device the target lives on, if it is file based
    pub fn device(&self) -> Option<FsHandle> {
        match self.target {
            EntryTarget::File { device, .. } => Some(device),
            EntryTarget::Payload(_) => None,
        }
    }

    /// Path of the target, if it is file based
    pub fn path(&self) -> Option<&str> {
        match &self.target {
            EntryTarget::File { path, .. } => Some(path),
            EntryTarget::Payload(_) => None,
        }
    }
}

impl fmt::Display for BootEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            EntryTarget::File { device, path } => write!(f, "{} ({}:{})", self.name, device, path),
            EntryTarget::Payload(payload) => write!(f, "{} ({} byte payload)", self.name, payload.len()),
        }
    }
}

/// Truncate `name` to at most [`MAX_ENTRY_NAME_LEN`] bytes on a character boundary
pub fn cap_entry_name(name: &str) -> String {
    if name.len() <= MAX_ENTRY_NAME_LEN {
        return String::from(name);
    }

    let mut end = MAX_ENTRY_NAME_LEN;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    String::from(&name[..end])
}

/// Keep only the first entry named `prescan_name`, in enumeration order
pub fn retain_prescan(entries: Vec<BootEntry>, prescan_name: &str) -> Option<BootEntry> {
    entries.into_iter().find(|entry| entry.name() == prescan_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    fn file_entry(name: &str) -> BootEntry {
        BootEntry::new(
            name,
            BootEntryKind::Filesystem,
            EntryTarget::File { device: FsHandle(1), path: "\\vmlinuz".to_string() },
        )
    }

    #[test]
    fn names_are_capped() {
        let long = "x".repeat(MAX_ENTRY_NAME_LEN + 40);
        let entry = file_entry(&long);
        assert_eq!(entry.name().len(), MAX_ENTRY_NAME_LEN);

        let exact = "y".repeat(MAX_ENTRY_NAME_LEN);
        assert_eq!(cap_entry_name(&exact), exact);
    }

    #[test]
    fn cap_respects_char_boundaries() {
        let wide = "é".repeat(200);
        let capped = cap_entry_name(&wide);
        assert_eq!(capped.len(), 126);
        assert_eq!(capped.chars().count(), 63);

        let mixed = alloc::format!("{}€", "a".repeat(MAX_ENTRY_NAME_LEN - 1));
        assert_eq!(cap_entry_name(&mixed), "a".repeat(MAX_ENTRY_NAME_LEN - 1));
    }

    #[test]
    fn prescan_picks_first_match() {
        let mut second = file_entry("Fedora");
        second.id = "second".to_string();
        let mut first = file_entry("Fedora");
        first.id = "first".to_string();

        let picked = retain_prescan(vec![file_entry("Arch"), first, second], "Fedora").unwrap();
        assert_eq!(picked.id, "first");
        assert!(retain_prescan(vec![file_entry("Arch")], "Fedora").is_none());
    }

    #[test]
    fn accessors_follow_target() {
        let entry = file_entry("Arch");
        assert_eq!(entry.device(), Some(FsHandle(1)));
        assert_eq!(entry.path(), Some("\\vmlinuz"));

        let custom = BootEntry::new("Shell", BootEntryKind::Custom, EntryTarget::Payload(vec![1, 2]));
        assert_eq!(custom.device(), None);
        assert_eq!(alloc::format!("{}", custom), "Shell (2 byte payload)");
    }
}
