//! Structures for FAT directories
//!
//! Raw byte structures are defined in the `raw` module.
//! The `directory` module decodes short entries and their attributes.
//! The `lfn` module folds long file name fragments into names.
//! The `time` module decodes packed dates and times.
//! The `fat` module walks cluster chains through the allocation table.
//! Raw structures are for reading from the image, the other modules hold the same information
//! in the current endianness.

pub mod raw;

pub mod directory;
pub mod fat;
pub mod lfn;
pub mod time;

/// A fixed width, space padded name field
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FatStr<const N: usize> {
    pub raw: [u8; N],
}

impl<const N: usize> core::fmt::Debug for FatStr<N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FatStr")
            .field("max_len", &Self::MAX_LEN)
            .field("str", &self.to_string_lossy(false))
            .finish()
    }
}

impl<const N: usize> Default for FatStr<N> {
    fn default() -> Self {
        Self {
            // Fat uses spaces for padding
            raw: [b' '; N],
        }
    }
}

impl<const N: usize> FatStr<N> {
    pub const MAX_LEN: usize = N;

    pub const fn from_bytes(raw: [u8; N]) -> Self {
        Self { raw }
    }

    /// Pads `s` with spaces, truncating anything past `N` bytes
    pub fn new_truncate(s: &str) -> Self {
        let bytes = s.as_bytes();
        let len = bytes.len().min(N);
        let mut str = Self::default();
        str.raw[..len].copy_from_slice(&bytes[..len]);
        str
    }

    /// The name without its trailing padding
    pub fn trimmed(&self) -> &[u8] {
        let len = self
            .raw
            .iter()
            .rposition(|b| *b != b' ')
            .map_or(0, |last| last + 1);
        &self.raw[..len]
    }

    pub fn is_blank(&self) -> bool {
        self.trimmed().is_empty()
    }

    /// Renders the name one byte per character; bytes above 0x7F map to the Latin-1 range
    pub fn to_string_lossy(&self, lowercase: bool) -> String {
        self.trimmed()
            .iter()
            .map(|b| {
                let c = char::from(*b);
                if lowercase { c.to_ascii_lowercase() } else { c }
            })
            .collect()
    }

    pub fn as_slice(&self) -> &[u8; N] {
        &self.raw
    }
}
