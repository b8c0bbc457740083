use super::{
    FatStr,
    raw::{
        constants::{
            DELETED_ENTRY, KANJI_LEAD_BYTE, LONG_NAME_ATTRIBUTE, NT_LOWERCASE_BASE,
            NT_LOWERCASE_EXTENSION,
        },
        directory::RawShortEntry,
    },
    time::{FatDate, FatTimestamp},
};

bitflags::bitflags! {
    /// File Attributes
    ///
    /// Every bit of the attribute byte has a name, so no attribute byte is ever rejected.
    /// `DEVICE` and `RESERVED` are carried through without affecting the scan.
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FileAttributes: u8 {
        const READ_ONLY = 0x01;
        const HIDDEN = 0x02;
        const SYSTEM = 0x04;
        const VOLUME_LABEL = 0x08;
        const DIRECTORY = 0x10;
        const ARCHIVE = 0x20;
        const DEVICE = 0x40;
        const RESERVED = 0x80;
    }
}

impl FileAttributes {
    /// Whether an attribute byte marks a long file name fragment.
    ///
    /// The marker is the exact value 0x0F; a byte that merely contains those four bits is a
    /// regular entry.
    pub const fn is_long_name(byte: u8) -> bool {
        byte == LONG_NAME_ATTRIBUTE
    }

    pub const fn is_long_name_marker(self) -> bool {
        Self::is_long_name(self.bits())
    }
}

/// A decoded short (8.3) directory entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShortEntry {
    /// The base name, as stored (a leading 0x05 is kept as is)
    pub name: FatStr<8>,
    pub extension: FatStr<3>,
    pub attributes: FileAttributes,
    /// The reserved byte at 0x0C, which carries lowercase display hints
    pub reserved: u8,
    /// Creation time, including the 10ms refinement
    pub created: FatTimestamp,
    pub accessed: FatDate,
    pub modified: FatTimestamp,
    /// The first cluster; the high word is only meaningful on FAT32, and zero elsewhere
    pub cluster: u32,
    pub size: u32,
}

impl From<&RawShortEntry> for ShortEntry {
    fn from(value: &RawShortEntry) -> Self {
        let high = u16::from_le_bytes(value.first_cluster_high) as u32;
        let low = u16::from_le_bytes(value.first_cluster_low) as u32;
        Self {
            name: FatStr::from_bytes(value.name),
            extension: FatStr::from_bytes(value.extension),
            attributes: FileAttributes::from_bits_retain(value.attributes),
            reserved: value.reserved,
            created: FatTimestamp::with_fine(
                u16::from_le_bytes(value.creation_date),
                u16::from_le_bytes(value.creation_time),
                value.creation_time_fine,
            ),
            accessed: FatDate::from_bytes(value.last_access_date),
            modified: FatTimestamp::new(
                u16::from_le_bytes(value.last_write_date),
                u16::from_le_bytes(value.last_write_time),
            ),
            cluster: (high << 16) | low,
            size: u32::from_le_bytes(value.size),
        }
    }
}

impl ShortEntry {
    /// Encodes the entry back into its on-disk record
    pub fn to_raw(&self) -> RawShortEntry {
        RawShortEntry {
            name: self.name.raw,
            extension: self.extension.raw,
            attributes: self.attributes.bits(),
            reserved: self.reserved,
            creation_time_fine: self.created.time.fine,
            creation_time: self.created.time.to_raw().to_le_bytes(),
            creation_date: self.created.date.to_raw().to_le_bytes(),
            last_access_date: self.accessed.to_raw().to_le_bytes(),
            first_cluster_high: ((self.cluster >> 16) as u16).to_le_bytes(),
            last_write_time: self.modified.time.to_raw().to_le_bytes(),
            last_write_date: self.modified.date.to_raw().to_le_bytes(),
            first_cluster_low: (self.cluster as u16).to_le_bytes(),
            size: self.size.to_le_bytes(),
        }
    }

    /// The 11 byte name field, as used by the long name checksum
    pub fn raw_name(&self) -> [u8; 11] {
        let mut raw = [0u8; 11];
        raw[..8].copy_from_slice(&self.name.raw);
        raw[8..].copy_from_slice(&self.extension.raw);
        raw
    }

    pub fn is_directory(&self) -> bool {
        self.attributes.contains(FileAttributes::DIRECTORY)
    }

    pub fn is_volume_label(&self) -> bool {
        self.attributes.contains(FileAttributes::VOLUME_LABEL)
    }

    /// Whether this is the `.` or `..` entry at the start of a subdirectory
    pub fn is_dot_entry(&self) -> bool {
        self.extension.is_blank() && matches!(self.name.trimmed(), b"." | b"..")
    }

    /// The name as it would be displayed, `NAME.EXT` or `NAME`
    pub fn display_name(&self) -> String {
        let mut name = self.name;
        if name.raw[0] == KANJI_LEAD_BYTE {
            name.raw[0] = DELETED_ENTRY;
        }
        let mut display = name.to_string_lossy(self.reserved & NT_LOWERCASE_BASE != 0);
        if !self.extension.is_blank() {
            display.push('.');
            display.push_str(
                &self
                    .extension
                    .to_string_lossy(self.reserved & NT_LOWERCASE_EXTENSION != 0),
            );
        }
        display
    }
}
