use fatscan_io::ImageReader;

use super::constants::{
    DELETED_ENTRY, DIR_ENTRY_SIZE, END_OF_DIRECTORY, LFN_CHARS_PER_ENTRY, LONG_NAME_ATTRIBUTE,
};
use crate::error::ScanError;

/// A short (8.3) directory record, describing one file or directory
#[repr(C, packed)]
#[derive(Clone, Copy, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct RawShortEntry {
    /// DIR_Name[0..8]
    ///
    /// The base name, padded with spaces.
    /// A first byte of 0xE5 marks the record as deleted, and 0x00 marks the end of the directory.
    /// A first byte of 0x05 stands for a real 0xE5 (used by kanji names).
    pub name: [u8; 8],
    /// DIR_Name[8..11]
    ///
    /// The extension, padded with spaces
    pub extension: [u8; 3],
    /// DIR_Attr
    pub attributes: u8,
    /// DIR_NTRes
    ///
    /// Reserved, Windows NT keeps lowercase display hints here
    pub reserved: u8,
    /// DIR_CrtTimeTenth
    ///
    /// Creation time refinement, in 10ms units (0 to 199)
    pub creation_time_fine: u8,
    /// DIR_CrtTime
    ///
    /// The creation time, granularity is 2 seconds
    pub creation_time: [u8; 2],
    /// DIR_CrtDate
    pub creation_date: [u8; 2],
    /// DIR_LstAccDate
    pub last_access_date: [u8; 2],
    /// DIR_FstClusHI
    ///
    /// The high word of the first cluster number, only used by FAT32
    pub first_cluster_high: [u8; 2],
    /// DIR_WrtTime
    pub last_write_time: [u8; 2],
    /// DIR_WrtDate
    pub last_write_date: [u8; 2],
    /// DIR_FstClusLO
    pub first_cluster_low: [u8; 2],
    /// DIR_FileSize
    ///
    /// Must be 0 for directories and volume labels
    pub size: [u8; 4],
}

impl RawShortEntry {
    /// The 11 byte name field, as used by the long name checksum
    pub fn raw_name(&self) -> [u8; 11] {
        let mut raw = [0u8; 11];
        raw[..8].copy_from_slice(&self.name);
        raw[8..].copy_from_slice(&self.extension);
        raw
    }

    pub fn to_bytes(&self) -> [u8; DIR_ENTRY_SIZE] {
        bytemuck::cast(*self)
    }
}

/// A long file name fragment
///
/// Each fragment carries 13 UTF-16 code units of the name, split over three spans.
/// Fragments are stored in reverse order directly before the short entry they name.
#[repr(C, packed)]
#[derive(Clone, Copy, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct RawLfnEntry {
    /// LDIR_Ord
    ///
    /// The 1-based ordinal of the fragment, with 0x40 set on the fragment holding the end of the
    /// name
    pub sequence_number: u8,
    /// LDIR_Name1, code units 1 to 5
    pub name1: [u8; 10],
    /// LDIR_Attr, always 0x0F
    pub attributes: u8,
    /// LDIR_Type, always 0
    pub ty: u8,
    /// LDIR_Chksum
    ///
    /// Checksum of the 11 byte name of the short entry that follows the fragments,
    /// see [`crate::structures::lfn::short_name_checksum`]
    pub checksum: u8,
    /// LDIR_Name2, code units 6 to 11
    pub name2: [u8; 12],
    /// LDIR_FstClusLO, always 0
    pub first_cluster_low: [u8; 2],
    /// LDIR_Name3, code units 12 and 13
    pub name3: [u8; 4],
}

impl RawLfnEntry {
    /// The 13 code units of this fragment, in name order
    pub fn units(&self) -> [u16; LFN_CHARS_PER_ENTRY] {
        let mut units = [0u16; LFN_CHARS_PER_ENTRY];
        let spans = self
            .name1
            .chunks_exact(2)
            .chain(self.name2.chunks_exact(2))
            .chain(self.name3.chunks_exact(2));
        for (unit, bytes) in units.iter_mut().zip(spans) {
            *unit = u16::from_le_bytes([bytes[0], bytes[1]]);
        }
        units
    }

    pub fn to_bytes(&self) -> [u8; DIR_ENTRY_SIZE] {
        bytemuck::cast(*self)
    }
}

/// One decoded 32 byte directory record
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum RawRecord {
    /// No records follow this one in the directory
    EndOfDirectory,
    /// A deleted record, either short or long
    Deleted,
    Short(RawShortEntry),
    LongName(RawLfnEntry),
}

impl RawRecord {
    pub fn from_bytes(bytes: [u8; DIR_ENTRY_SIZE]) -> Self {
        match bytes[0] {
            END_OF_DIRECTORY => return Self::EndOfDirectory,
            DELETED_ENTRY => return Self::Deleted,
            _ => {}
        }
        // The long name marker is a reserved combination, only an exact match counts
        if bytes[11] == LONG_NAME_ATTRIBUTE {
            Self::LongName(bytemuck::cast(bytes))
        } else {
            Self::Short(bytemuck::cast(bytes))
        }
    }

    /// Reads and decodes the record at `offset`.
    ///
    /// # Errors
    /// Returns [`ScanError::InvalidImage`] if the image is empty or cannot supply 32 bytes at
    /// `offset`, and any error raised by the image itself.
    pub fn read<R: ImageReader + ?Sized>(image: &R, offset: u64) -> Result<Self, ScanError> {
        if image.is_empty() {
            return Err(ScanError::InvalidImage {
                offset,
                reason: "image is empty",
            });
        }
        let fits = offset
            .checked_add(DIR_ENTRY_SIZE as u64)
            .is_some_and(|end| end <= image.len());
        if !fits {
            return Err(ScanError::InvalidImage {
                offset,
                reason: "image is truncated inside a directory record",
            });
        }
        let mut bytes = [0u8; DIR_ENTRY_SIZE];
        image.read_range(offset, &mut bytes)?;
        Ok(Self::from_bytes(bytes))
    }
}

impl core::fmt::Debug for RawRecord {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::EndOfDirectory => f.write_str("EndOfDirectory"),
            Self::Deleted => f.write_str("Deleted"),
            Self::Short(entry) => f
                .debug_struct("Short")
                .field("name", &entry.raw_name())
                .field("attributes", &entry.attributes)
                .finish_non_exhaustive(),
            Self::LongName(entry) => f
                .debug_struct("LongName")
                .field("sequence_number", &entry.sequence_number)
                .field("checksum", &entry.checksum)
                .finish_non_exhaustive(),
        }
    }
}
