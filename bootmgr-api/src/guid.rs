//! GUID value type
//!
//! Identifies the provider contract and GPT partitions.

use core::fmt;

use static_assertions::assert_eq_size;

/// Mixed-endian GUID as laid out by firmware
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(C)]
pub struct Guid {
    pub data1: u32,
    pub data2: u16,
    pub data3: u16,
    pub data4: [u8; 8],
}

impl Guid {
    /// Create a GUID from its four fields
    pub const fn new(data1: u32, data2: u16, data3: u16, data4: [u8; 8]) -> Self {
        Self { data1, data2, data3, data4 }
    }

    /// The all-zero GUID
    pub const fn zero() -> Self {
        Self::new(0, 0, 0, [0; 8])
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::zero()
    }
}

assert_eq_size!(Guid, [u8; 16]);

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = &self.data4;
        write!(
            f,
            "{:08X}-{:04X}-{:04X}-{:02X}{:02X}-{:02X}{:02X}{:02X}{:02X}{:02X}{:02X}",
            self.data1, self.data2, self.data3, d[0], d[1], d[2], d[3], d[4], d[5], d[6], d[7]
        )
    }
}
