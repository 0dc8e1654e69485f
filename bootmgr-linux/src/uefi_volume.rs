//! UEFI volume backend
//!
//! Implements the volume file protocol over the firmware Simple File System
//! protocol, so the provider can scan real filesystems.

use alloc::boxed::Box;
use alloc::string::ToString;
use alloc::sync::Arc;

use spin::Mutex;
use uefi::boot::{self, ScopedProtocol};
use uefi::proto::media::file::{
    Directory, File, FileAttribute as UefiAttribute, FileInfo as UefiFileInfo, FileMode, FileType, RegularFile,
};
use uefi::proto::media::fs::SimpleFileSystem;
use uefi::{CString16, Handle, Status};

use bootmgr_api::volume::to_volume_path;
use bootmgr_api::{
    BootFilesystem, FileAttribute, FileHandle, FileInfo, FsHandle, Volume, VolumeError, VolumeResult,
};

fn volume_error<D: core::fmt::Debug>(err: uefi::Error<D>) -> VolumeError {
    match err.status() {
        Status::NOT_FOUND => VolumeError::NotFound,
        Status::OUT_OF_RESOURCES => VolumeError::OutOfResources,
        Status::ACCESS_DENIED | Status::SECURITY_VIOLATION => VolumeError::AccessDenied,
        Status::VOLUME_CORRUPTED => VolumeError::Corrupted,
        Status::UNSUPPORTED => VolumeError::Unsupported,
        Status::INVALID_PARAMETER => VolumeError::InvalidPath,
        _ => VolumeError::DeviceError,
    }
}

fn file_info(info: &UefiFileInfo) -> FileInfo {
    FileInfo {
        file_name: info.file_name().to_string(),
        file_size: info.file_size(),
        attribute: FileAttribute::from_bits_truncate(info.attribute().bits()),
    }
}

/// A filesystem opened through Simple File System
pub struct UefiVolume {
    protocol: Mutex<ScopedProtocol<SimpleFileSystem>>,
}

impl UefiVolume {
    /// Open the filesystem installed on `handle`
    pub fn open(handle: Handle) -> uefi::Result<Self> {
        let protocol = boot::open_protocol_exclusive::<SimpleFileSystem>(handle)?;
        Ok(Self { protocol: Mutex::new(protocol) })
    }
}

/// Wrap the filesystem on `handle` for a discovery pass
pub fn boot_filesystem(handle: Handle) -> uefi::Result<BootFilesystem> {
    let volume = UefiVolume::open(handle)?;
    Ok(BootFilesystem::new(FsHandle(handle.as_ptr() as usize), Arc::new(volume)))
}

impl Volume for UefiVolume {
    fn open(&self, path: &str) -> VolumeResult<Box<dyn FileHandle + '_>> {
        let mut root = self.protocol.lock().open_volume().map_err(volume_error)?;

        let path = to_volume_path(path);
        if path == "\\" {
            return Ok(Box::new(UefiHandle::Dir(root)));
        }

        let name = CString16::try_from(path.as_str()).map_err(|_| VolumeError::InvalidPath)?;
        let file = root
            .open(&name, FileMode::Read, UefiAttribute::empty())
            .map_err(volume_error)?;

        match file.into_type().map_err(volume_error)? {
            FileType::Regular(file) => Ok(Box::new(UefiHandle::File(file))),
            FileType::Dir(dir) => Ok(Box::new(UefiHandle::Dir(dir))),
        }
    }
}

enum UefiHandle {
    File(RegularFile),
    Dir(Directory),
}

impl FileHandle for UefiHandle {
    fn info(&mut self) -> VolumeResult<FileInfo> {
        let info = match self {
            UefiHandle::File(file) => file.get_boxed_info::<UefiFileInfo>(),
            UefiHandle::Dir(dir) => dir.get_boxed_info::<UefiFileInfo>(),
        }
        .map_err(volume_error)?;

        Ok(file_info(&info))
    }

    fn set_position(&mut self, position: u64) -> VolumeResult<()> {
        match self {
            UefiHandle::File(file) => file.set_position(position).map_err(volume_error),
            UefiHandle::Dir(dir) if position == 0 => dir.reset_entry_readout().map_err(volume_error),
            UefiHandle::Dir(_) => Err(VolumeError::Unsupported),
        }
    }

    fn read(&mut self, buffer: &mut [u8]) -> VolumeResult<usize> {
        match self {
            UefiHandle::File(file) => file.read(buffer).map_err(volume_error),
            UefiHandle::Dir(_) => Err(VolumeError::IsADirectory),
        }
    }

    fn read_entry(&mut self, max_name_len: usize) -> VolumeResult<Option<FileInfo>> {
        let UefiHandle::Dir(dir) = self else {
            return Err(VolumeError::NotADirectory);
        };

        let Some(info) = dir.read_entry_boxed().map_err(volume_error)? else {
            return Ok(None);
        };

        let name_len = info.file_name().num_chars();
        if name_len > max_name_len {
            return Err(VolumeError::BufferTooSmall((name_len + 1) * 2));
        }

        Ok(Some(file_info(&info)))
    }

    fn rewind_entries(&mut self) -> VolumeResult<()> {
        match self {
            UefiHandle::Dir(dir) => dir.reset_entry_readout().map_err(volume_error),
            UefiHandle::File(_) => Err(VolumeError::NotADirectory),
        }
    }
}
