//! Read-only byte sources for FAT images.
//!
//! Images are represented by the [`ImageReader`] trait, which is implemented for byte slices and
//! vectors by default, and for files on disk through [`FileImage`]. The errors returned by these
//! sources are [`ReadError`].
//!
//! Every read takes `&self`: a source is a read-only view of a fixed-size image, so one handle can
//! be shared between any number of decoders.

use std::{
    fs::File,
    io::{Read, Seek, SeekFrom},
    path::Path,
};

/// Errors that can occur when reading from an image.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    /// The requested range does not fit inside the image.
    #[error("read of {len}b at offset {offset:#x} is past the end of a {image_len}b image")]
    OutOfRange { offset: u64, len: u64, image_len: u64 },
    /// The backing storage failed while reading.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A fixed-size binary image that supports reads at arbitrary byte offsets.
///
/// # Examples
/// ```
/// use fatscan_io::{ImageReader, ReadError};
///
/// let disk = [0xEBu8, 0x3C, 0x90, 0x00];
/// let image = &disk[..];
///
/// assert_eq!(image.read_at(1)?, 0x3C);
///
/// let mut buffer = [0u8; 2];
/// image.read_range(2, &mut buffer)?;
/// assert_eq!(buffer, [0x90, 0x00]);
///
/// assert!(image.read_at(4).is_err());
/// # Ok::<(), ReadError>(())
/// ```
pub trait ImageReader {
    /// Total size of the image in bytes.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fills `buffer` with the bytes starting at `offset`.
    ///
    /// # Errors
    /// Returns [`ReadError::OutOfRange`] if `offset + buffer.len()` exceeds the image, or
    /// [`ReadError::Io`] if the backing storage fails.
    fn read_range(&self, offset: u64, buffer: &mut [u8]) -> Result<(), ReadError>;

    /// Reads the single byte at `offset`.
    fn read_at(&self, offset: u64) -> Result<u8, ReadError> {
        let mut byte = [0u8; 1];
        self.read_range(offset, &mut byte)?;
        Ok(byte[0])
    }
}

/// Checks that `len` bytes at `offset` lie inside an image of `image_len` bytes.
pub fn check_range(offset: u64, len: usize, image_len: u64) -> Result<(), ReadError> {
    let len = len as u64;
    match offset.checked_add(len) {
        Some(end) if end <= image_len => Ok(()),
        _ => Err(ReadError::OutOfRange {
            offset,
            len,
            image_len,
        }),
    }
}

impl ImageReader for [u8] {
    fn len(&self) -> u64 {
        <[u8]>::len(self) as u64
    }

    fn read_range(&self, offset: u64, buffer: &mut [u8]) -> Result<(), ReadError> {
        check_range(offset, buffer.len(), ImageReader::len(self))?;
        let start = offset as usize;
        buffer.copy_from_slice(&self[start..start + buffer.len()]);
        Ok(())
    }
}

impl ImageReader for Vec<u8> {
    fn len(&self) -> u64 {
        self.as_slice().len() as u64
    }

    fn read_range(&self, offset: u64, buffer: &mut [u8]) -> Result<(), ReadError> {
        self.as_slice().read_range(offset, buffer)
    }
}

impl<T: ImageReader + ?Sized> ImageReader for &T {
    fn len(&self) -> u64 {
        (**self).len()
    }

    fn read_range(&self, offset: u64, buffer: &mut [u8]) -> Result<(), ReadError> {
        (**self).read_range(offset, buffer)
    }
}

/// An image backed by a file on disk.
///
/// The file length is captured once when the image is opened; the file must not change size
/// while it is being read.
#[derive(Debug)]
pub struct FileImage {
    file: spin::Mutex<File>,
    len: u64,
}

impl FileImage {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ReadError> {
        let file = File::open(path.as_ref())?;
        Self::from_file(file)
    }

    pub fn from_file(file: File) -> Result<Self, ReadError> {
        let len = file.metadata()?.len();
        log::debug!("Opened image of {len}b");
        Ok(Self {
            file: spin::Mutex::new(file),
            len,
        })
    }
}

impl ImageReader for FileImage {
    fn len(&self) -> u64 {
        self.len
    }

    fn read_range(&self, offset: u64, buffer: &mut [u8]) -> Result<(), ReadError> {
        check_range(offset, buffer.len(), self.len)?;
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(buffer)?;
        Ok(())
    }
}
