//! Boot entry error handling
//!
//! This module defines the error type shared by the aggregator and all
//! providers, and the classification used to decide how far a failure
//! propagates.

use core::fmt;

use crate::volume::VolumeError;

/// Boot entry error type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootEntryError {
    /// Nothing matched; routine and never surfaced to the user
    NotFound,

    /// Memory allocation failed
    OutOfResources,

    /// Structural errors
    InvalidParameter(&'static str),
    BufferTooSmall(usize),
    VolumeCorrupted(&'static str),

    /// Device and firmware errors
    DeviceError,
    AccessDenied,
    Unsupported,

    /// Provider published a revision other than the one we were built against
    IncompatibleRevision { found: usize, expected: usize },
}

/// How a failure is treated by the component that observes it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Expected absence; contributes nothing, logged at most at debug level
    NotFound,
    /// Allocation failure; fatal to the current call
    ResourceExhaustion,
    /// Malformed input; discarded at the smallest granularity possible
    Structural,
    /// Provider broke the contract; disabled for the rest of the pass
    ContractViolation,
    /// Genuine I/O failure unrelated to expected absence
    Io,
}

impl BootEntryError {
    /// Convert to a firmware-style status code
    pub fn as_status_code(&self) -> usize {
        const ERROR_BIT: usize = 1 << (usize::BITS - 1);

        let code = match self {
            BootEntryError::InvalidParameter(_) => 2,
            BootEntryError::Unsupported => 3,
            BootEntryError::BufferTooSmall(_) => 5,
            BootEntryError::DeviceError => 7,
            BootEntryError::VolumeCorrupted(_) => 10,
            BootEntryError::OutOfResources => 9,
            BootEntryError::AccessDenied => 15,
            BootEntryError::NotFound => 14,
            BootEntryError::IncompatibleRevision { .. } => 25,
        };

        ERROR_BIT | code
    }

    /// Get a human-readable description of the error
    pub fn description(&self) -> &'static str {
        match self {
            BootEntryError::NotFound => "Not found",
            BootEntryError::OutOfResources => "Out of resources",
            BootEntryError::InvalidParameter(msg) => msg,
            BootEntryError::BufferTooSmall(_) => "Buffer too small",
            BootEntryError::VolumeCorrupted(msg) => msg,
            BootEntryError::DeviceError => "Device error",
            BootEntryError::AccessDenied => "Access denied",
            BootEntryError::Unsupported => "Unsupported",
            BootEntryError::IncompatibleRevision { .. } => "Incompatible protocol revision",
        }
    }

    /// Classify the error
    pub fn class(&self) -> ErrorClass {
        match self {
            BootEntryError::NotFound => ErrorClass::NotFound,
            BootEntryError::OutOfResources => ErrorClass::ResourceExhaustion,
            BootEntryError::InvalidParameter(_)
            | BootEntryError::BufferTooSmall(_)
            | BootEntryError::VolumeCorrupted(_) => ErrorClass::Structural,
            BootEntryError::IncompatibleRevision { .. } => ErrorClass::ContractViolation,
            BootEntryError::DeviceError
            | BootEntryError::AccessDenied
            | BootEntryError::Unsupported => ErrorClass::Io,
        }
    }

    /// Check if this is the routine "nothing here" outcome
    pub fn is_not_found(&self) -> bool {
        matches!(self, BootEntryError::NotFound)
    }
}

impl fmt::Display for BootEntryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootEntryError::BufferTooSmall(needed) => {
                write!(f, "{} (need {} bytes)", self.description(), needed)
            }
            BootEntryError::IncompatibleRevision { found, expected } => {
                write!(f, "{} {} (!= {})", self.description(), found, expected)
            }
            _ => f.write_str(self.description()),
        }
    }
}

impl From<VolumeError> for BootEntryError {
    fn from(err: VolumeError) -> Self {
        match err {
            VolumeError::NotFound => BootEntryError::NotFound,
            VolumeError::BufferTooSmall(needed) => BootEntryError::BufferTooSmall(needed),
            VolumeError::OutOfResources => BootEntryError::OutOfResources,
            VolumeError::NotADirectory => BootEntryError::InvalidParameter("not a directory"),
            VolumeError::IsADirectory => BootEntryError::InvalidParameter("is a directory"),
            VolumeError::InvalidPath => BootEntryError::InvalidParameter("invalid path"),
            VolumeError::Corrupted => BootEntryError::VolumeCorrupted("volume corrupted"),
            VolumeError::AccessDenied => BootEntryError::AccessDenied,
            VolumeError::Unsupported => BootEntryError::Unsupported,
            VolumeError::DeviceError => BootEntryError::DeviceError,
        }
    }
}

impl From<alloc::collections::TryReserveError> for BootEntryError {
    fn from(_: alloc::collections::TryReserveError) -> Self {
        BootEntryError::OutOfResources
    }
}

/// Result type used throughout the boot entry subsystem
pub type Result<T = ()> = core::result::Result<T, BootEntryError>;
