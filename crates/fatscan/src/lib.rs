//! A library for decoding the directory tree of FAT12, FAT16 and FAT32 images
//!
//! The crate reads directories only: it finds every short entry, attaches the long file name
//! stored before it, validates timestamps and follows subdirectory cluster chains. It never
//! writes to the image and never reads file contents.
//!
//! Boot sector parsing is left to the caller, which supplies the location of the root directory
//! and the cluster size. Cluster chains are resolved through [`ClusterMap`]; [`FatTable`] reads
//! them from the allocation table of the image.
//!
//! Damaged entries do not stop a build. Anything suspicious is attached to the entry as an
//! [`EntryWarning`], and only a failure to read the image is returned as a [`ScanError`].
//!
//! ```
//! use fatscan::{FatTable, FatType, RootDirectory, build_tree};
//!
//! let mut image = vec![0u8; 2048];
//! image[512..523].copy_from_slice(b"HELLO   TXT");
//! image[523] = 0x20;
//!
//! let fat = FatTable::new(&image, FatType::Fat12, 0, 512, 1024);
//! let root = build_tree(&image, RootDirectory::fixed(512, 16), 512, &fat)?;
//! assert_eq!(root.children()[0].name(), "HELLO.TXT");
//! # Ok::<(), fatscan::ScanError>(())
//! ```

pub mod entry;
pub mod error;
pub mod structures;
pub mod tree;

pub use entry::{Directory, DirectoryEntry, EntryInfo, File};
pub use error::{Corruption, EntryWarning, ScanError, TimestampField};
pub use structures::{
    directory::FileAttributes,
    fat::{ClusterMap, FatTable, FatType},
};
pub use tree::{DEFAULT_MAX_DEPTH, RootDirectory, TreeBuilder, build_tree};

pub use fatscan_io::{FileImage, ImageReader, ReadError};
