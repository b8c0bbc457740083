//! Constants used in the FAT structures
//!
//! Marker bytes found in directory records, and the cluster values found in each FAT variant.
//! Cluster values are stored in native endianness, masked to the width of the variant.

/// Size of every directory record, short or long
pub const DIR_ENTRY_SIZE: usize = 32;

/// First name byte of the record that ends a directory
pub const END_OF_DIRECTORY: u8 = 0x00;
/// First name byte of a deleted record
pub const DELETED_ENTRY: u8 = 0xE5;
/// Stored in place of a leading 0xE5 name byte, which would otherwise read as deleted
pub const KANJI_LEAD_BYTE: u8 = 0x05;

/// Attribute byte of a long file name fragment.
/// This is a sentinel value and must be compared for equality.
pub const LONG_NAME_ATTRIBUTE: u8 = 0x0F;
/// Set in the sequence number of the fragment holding the end of the name
pub const LFN_LAST_ENTRY_MASK: u8 = 0x40;
/// Ordinal bits of a fragment sequence number
pub const LFN_ORDINAL_MASK: u8 = 0x3F;
/// UTF-16 code units carried by one fragment
pub const LFN_CHARS_PER_ENTRY: usize = 13;
/// Terminates a long name shorter than its last fragment
pub const LFN_TERMINATOR: u16 = 0x0000;
/// Pads the last fragment after the terminator
pub const LFN_FILL: u16 = 0xFFFF;

/// Reserved byte hint: the base name is stored uppercase but displayed lowercase
pub const NT_LOWERCASE_BASE: u8 = 0x08;
/// Reserved byte hint: the extension is stored uppercase but displayed lowercase
pub const NT_LOWERCASE_EXTENSION: u8 = 0x10;

/// The first cluster number that refers to the data region
pub const FIRST_DATA_CLUSTER: u32 = 2;

/// FAT12 cluster values
pub mod fat12 {
    pub const CLUSTER_FREE: u32 = 0x000;
    pub const CLUSTER_RESERVED_MIN: u32 = 0xFF0;
    pub const CLUSTER_BAD: u32 = 0xFF7;
    pub const CLUSTER_END_MIN: u32 = 0xFF8;
    pub const ENTRY_MASK: u32 = 0xFFF;
}

/// FAT16 cluster values
pub mod fat16 {
    pub const CLUSTER_FREE: u32 = 0x0000;
    pub const CLUSTER_RESERVED_MIN: u32 = 0xFFF0;
    pub const CLUSTER_BAD: u32 = 0xFFF7;
    pub const CLUSTER_END_MIN: u32 = 0xFFF8;
    pub const ENTRY_MASK: u32 = 0xFFFF;
}

/// FAT32 cluster values
/// Note:
/// The top four bits are reserved and must be ignored when reading a cluster value
pub mod fat32 {
    pub const CLUSTER_FREE: u32 = 0x0000_0000;
    pub const CLUSTER_RESERVED_MIN: u32 = 0x0FFF_FFF0;
    pub const CLUSTER_BAD: u32 = 0x0FFF_FFF7;
    pub const CLUSTER_END_MIN: u32 = 0x0FFF_FFF8;
    pub const ENTRY_MASK: u32 = 0x0FFF_FFFF;
}
