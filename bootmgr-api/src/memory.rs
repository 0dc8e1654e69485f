//! In-memory volume
//!
//! A [`Volume`] backed by a tree held in memory. Directories enumerate in
//! insertion order and names match case-insensitively, as on FAT. Open and
//! directory read failures can be injected to exercise error paths, and
//! every open is recorded.

use alloc::boxed::Box;
use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;

use spin::Mutex;

use crate::volume::{FileAttribute, FileHandle, FileInfo, PATH_SEPARATOR, Volume, VolumeError, VolumeResult};

#[derive(Clone)]
enum MemNode {
    File(Arc<[u8]>),
    Dir(MemDir),
}

#[derive(Clone, Default)]
struct MemDir {
    entries: Vec<(String, MemNode)>,
    /// Entry index at which reads fail, and with what
    read_failure: Option<(usize, VolumeError)>,
}

impl MemDir {
    fn child(&self, name: &str) -> Option<&MemNode> {
        self.entries
            .iter()
            .find(|(entry, _)| entry.eq_ignore_ascii_case(name))
            .map(|(_, node)| node)
    }

    fn child_mut(&mut self, name: &str) -> Option<&mut MemNode> {
        self.entries
            .iter_mut()
            .find(|(entry, _)| entry.eq_ignore_ascii_case(name))
            .map(|(_, node)| node)
    }

    fn info_of(name: &str, node: &MemNode) -> FileInfo {
        match node {
            MemNode::File(data) => FileInfo {
                file_name: name.to_string(),
                file_size: data.len() as u64,
                attribute: FileAttribute::ARCHIVE,
            },
            MemNode::Dir(_) => FileInfo {
                file_name: name.to_string(),
                file_size: 0,
                attribute: FileAttribute::DIRECTORY,
            },
        }
    }
}

fn components(path: &str) -> impl Iterator<Item = &str> {
    path.split(['/', PATH_SEPARATOR]).filter(|c| !c.is_empty())
}

/// Volume held entirely in memory
#[derive(Default)]
pub struct MemoryVolume {
    root: Mutex<MemDir>,
    open_failures: Mutex<Vec<(String, VolumeError)>>,
    opened: Mutex<Vec<String>>,
}

impl MemoryVolume {
    /// Create an empty volume
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a directory, creating missing parents
    pub fn add_dir(&self, path: &str) -> &Self {
        let mut root = self.root.lock();
        Self::ensure_dir(&mut root, components(path));
        self
    }

    /// Add or replace a file, creating missing parent directories
    pub fn add_file(&self, path: &str, contents: &[u8]) -> &Self {
        let mut parts: Vec<&str> = components(path).collect();
        let Some(name) = parts.pop() else {
            return self;
        };

        let mut root = self.root.lock();
        let Some(dir) = Self::ensure_dir(&mut root, parts.into_iter()) else {
            return self;
        };

        let node = MemNode::File(Arc::from(contents));
        match dir.child_mut(name) {
            Some(existing) => *existing = node,
            None => dir.entries.push((name.to_string(), node)),
        }
        self
    }

    /// Make every open of `path` fail with `error`
    pub fn fail_open(&self, path: &str, error: VolumeError) -> &Self {
        self.open_failures.lock().push((normalize(path), error));
        self
    }

    /// Make reading entry number `index` of directory `path` fail with `error`
    pub fn fail_dir_read(&self, path: &str, index: usize, error: VolumeError) -> &Self {
        let mut root = self.root.lock();
        if let Some(dir) = Self::ensure_dir(&mut root, components(path)) {
            dir.read_failure = Some((index, error));
        }
        self
    }

    /// Paths opened so far, in order, normalized
    pub fn opened_paths(&self) -> Vec<String> {
        self.opened.lock().clone()
    }

    /// Number of opens of `path`
    pub fn open_count(&self, path: &str) -> usize {
        let wanted = normalize(path);
        self.opened
            .lock()
            .iter()
            .filter(|opened| opened.eq_ignore_ascii_case(&wanted))
            .count()
    }

    fn ensure_dir<'d, 'p>(dir: &'d mut MemDir, mut parts: impl Iterator<Item = &'p str>) -> Option<&'d mut MemDir> {
        let Some(name) = parts.next() else {
            return Some(dir);
        };

        if dir.child(name).is_none() {
            dir.entries.push((name.to_string(), MemNode::Dir(MemDir::default())));
        }

        match dir.child_mut(name) {
            Some(MemNode::Dir(child)) => Self::ensure_dir(child, parts),
            _ => None,
        }
    }
}

fn normalize(path: &str) -> String {
    let mut normalized = String::new();
    for component in components(path) {
        normalized.push(PATH_SEPARATOR);
        normalized.push_str(component);
    }
    if normalized.is_empty() {
        normalized.push(PATH_SEPARATOR);
    }
    normalized
}

impl Volume for MemoryVolume {
    fn open(&self, path: &str) -> VolumeResult<Box<dyn FileHandle + '_>> {
        let normalized = normalize(path);
        self.opened.lock().push(normalized.clone());

        if let Some((_, error)) = self
            .open_failures
            .lock()
            .iter()
            .find(|(failing, _)| failing.eq_ignore_ascii_case(&normalized))
        {
            return Err(*error);
        }

        let root = self.root.lock();
        let parts: Vec<&str> = components(path).collect();
        let mut dir: &MemDir = &root;
        let mut name = String::from(PATH_SEPARATOR);

        for (index, component) in parts.iter().enumerate() {
            match dir.child(component).ok_or(VolumeError::NotFound)? {
                MemNode::Dir(next) => {
                    dir = next;
                    name = component.to_string();
                }
                MemNode::File(data) if index + 1 == parts.len() => {
                    let handle = MemHandle {
                        info: FileInfo {
                            file_name: component.to_string(),
                            file_size: data.len() as u64,
                            attribute: FileAttribute::ARCHIVE,
                        },
                        content: Content::File { data: data.clone(), position: 0 },
                    };
                    return Ok(Box::new(handle));
                }
                MemNode::File(_) => return Err(VolumeError::NotFound),
            }
        }

        Ok(Box::new(MemHandle::directory(name, dir)))
    }
}

enum Content {
    File { data: Arc<[u8]>, position: u64 },
    Dir { entries: Vec<FileInfo>, cursor: usize, read_failure: Option<(usize, VolumeError)> },
}

struct MemHandle {
    info: FileInfo,
    content: Content,
}

impl MemHandle {
    fn directory(name: String, dir: &MemDir) -> Self {
        Self {
            info: FileInfo { file_name: name, file_size: 0, attribute: FileAttribute::DIRECTORY },
            content: Content::Dir {
                entries: dir.entries.iter().map(|(n, node)| MemDir::info_of(n, node)).collect(),
                cursor: 0,
                read_failure: dir.read_failure,
            },
        }
    }
}

impl FileHandle for MemHandle {
    fn info(&mut self) -> VolumeResult<FileInfo> {
        Ok(self.info.clone())
    }

    fn set_position(&mut self, target: u64) -> VolumeResult<()> {
        match &mut self.content {
            Content::File { position, .. } => {
                *position = target;
                Ok(())
            }
            Content::Dir { cursor, .. } if target == 0 => {
                *cursor = 0;
                Ok(())
            }
            Content::Dir { .. } => Err(VolumeError::Unsupported),
        }
    }

    fn read(&mut self, buffer: &mut [u8]) -> VolumeResult<usize> {
        match &mut self.content {
            Content::File { data, position } => {
                let start = usize::try_from(*position).unwrap_or(usize::MAX).min(data.len());
                let count = buffer.len().min(data.len() - start);
                buffer[..count].copy_from_slice(&data[start..start + count]);
                *position += count as u64;
                Ok(count)
            }
            Content::Dir { .. } => Err(VolumeError::IsADirectory),
        }
    }

    fn read_entry(&mut self, max_name_len: usize) -> VolumeResult<Option<FileInfo>> {
        let Content::Dir { entries, cursor, read_failure } = &mut self.content else {
            return Err(VolumeError::NotADirectory);
        };

        if let Some((index, error)) = read_failure {
            if *index == *cursor {
                return Err(*error);
            }
        }

        let Some(entry) = entries.get(*cursor) else {
            return Ok(None);
        };
        *cursor += 1;

        let name_len = entry.file_name.encode_utf16().count();
        if name_len > max_name_len {
            return Err(VolumeError::BufferTooSmall((name_len + 1) * 2));
        }

        Ok(Some(entry.clone()))
    }

    fn rewind_entries(&mut self) -> VolumeResult<()> {
        match &mut self.content {
            Content::Dir { cursor, .. } => {
                *cursor = 0;
                Ok(())
            }
            Content::File { .. } => Err(VolumeError::NotADirectory),
        }
    }
}
