//! Recursive directory tree construction
//!
//! The builder reads directory records in 32 byte steps, folds long name runs into the short
//! entries that follow them, and descends into every subdirectory it finds. Problems with single
//! entries become warnings on those entries; only an unreadable image stops the build.

use core::sync::atomic::{AtomicBool, Ordering};
use std::collections::HashSet;

use fatscan_io::ImageReader;

use crate::{
    entry::{Directory, DirectoryEntry, EntryInfo, File},
    error::{Corruption, ScanError},
    structures::{
        directory::ShortEntry,
        fat::ClusterMap,
        lfn::{LfnAssembler, LfnFragment},
        raw::{constants::DIR_ENTRY_SIZE, directory::RawRecord},
    },
};

/// How many nested subdirectory levels are followed unless configured otherwise
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Where the root directory lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootDirectory {
    /// The fixed region after the allocation tables (FAT12 and FAT16)
    Region { offset: u64, len: u64 },
    /// A cluster chain like any other directory (FAT32)
    Cluster(u32),
}

impl RootDirectory {
    /// A fixed root region holding `entries` records, as given by the boot sector
    pub const fn fixed(offset: u64, entries: u16) -> Self {
        Self::Region {
            offset,
            len: entries as u64 * DIR_ENTRY_SIZE as u64,
        }
    }
}

/// A contiguous byte range holding directory records
#[derive(Debug, Clone, Copy)]
struct Span {
    offset: u64,
    len: u64,
}

/// Builds the directory tree of an image.
///
/// The builder holds no state between builds, so building twice from the same image gives equal
/// trees.
pub struct TreeBuilder<'a, R: ImageReader + ?Sized, C: ClusterMap + ?Sized> {
    image: &'a R,
    clusters: &'a C,
    bytes_per_cluster: u32,
    max_depth: usize,
    cancel: Option<&'a AtomicBool>,
}

impl<R: ImageReader + ?Sized, C: ClusterMap + ?Sized> core::fmt::Debug for TreeBuilder<'_, R, C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TreeBuilder")
            .field("image_len", &self.image.len())
            .field("bytes_per_cluster", &self.bytes_per_cluster)
            .field("max_depth", &self.max_depth)
            .field("cancellable", &self.cancel.is_some())
            .finish()
    }
}

impl<'a, R: ImageReader + ?Sized, C: ClusterMap + ?Sized> TreeBuilder<'a, R, C> {
    pub fn new(image: &'a R, clusters: &'a C, bytes_per_cluster: u32) -> Self {
        Self {
            image,
            clusters,
            bytes_per_cluster,
            max_depth: DEFAULT_MAX_DEPTH,
            cancel: None,
        }
    }

    /// Limits how many subdirectory levels below the root are expanded.
    /// Deeper directories are kept, without children, and carry a warning.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Checked before descending into each subdirectory; once set the build returns
    /// [`ScanError::Cancelled`]
    pub fn with_cancel_flag(mut self, cancel: &'a AtomicBool) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn build(&self, root: RootDirectory) -> Result<Directory, ScanError> {
        if self.image.is_empty() {
            return Err(ScanError::InvalidImage {
                offset: 0,
                reason: "image is empty",
            });
        }
        if self.bytes_per_cluster == 0 || self.bytes_per_cluster % DIR_ENTRY_SIZE as u32 != 0 {
            return Err(ScanError::InvalidImage {
                offset: 0,
                reason: "cluster size is not a multiple of the directory record size",
            });
        }

        // Start clusters of every directory expanded so far
        let mut expanded = HashSet::new();
        let spans = match root {
            RootDirectory::Region { offset, len } => vec![Span { offset, len }],
            RootDirectory::Cluster(cluster) => {
                expanded.insert(cluster);
                let spans = self.chain_spans(cluster)?;
                if spans.is_empty() {
                    return Err(ScanError::InvalidImage {
                        offset: 0,
                        reason: "root directory cluster has no chain",
                    });
                }
                spans
            }
        };
        log::debug!("Building directory tree from {root:?}");
        let children = self.read_directory(&spans, 0, &mut expanded)?;
        Ok(Directory::root(children))
    }

    fn check_cancelled(&self) -> Result<(), ScanError> {
        match self.cancel {
            Some(cancel) if cancel.load(Ordering::Relaxed) => {
                log::debug!("Directory scan cancelled");
                Err(ScanError::Cancelled)
            }
            _ => Ok(()),
        }
    }

    fn chain_spans(&self, start: u32) -> Result<Vec<Span>, ScanError> {
        let chain = self.clusters.chain_of(start)?;
        Ok(chain
            .into_iter()
            .map(|cluster| Span {
                offset: self.clusters.cluster_offset(cluster, self.bytes_per_cluster),
                len: self.bytes_per_cluster as u64,
            })
            .collect())
    }

    /// Reads the records of one directory. The spans are scanned as a single sequence, so a long
    /// name run may continue from one cluster into the next.
    fn read_directory(
        &self,
        spans: &[Span],
        depth: usize,
        expanded: &mut HashSet<u32>,
    ) -> Result<Vec<DirectoryEntry>, ScanError> {
        let mut entries = Vec::new();
        let mut lfn = LfnAssembler::new();

        'spans: for span in spans {
            log::trace!("Scanning {}b of directory records at {:#x}", span.len, span.offset);
            for index in 0..span.len / DIR_ENTRY_SIZE as u64 {
                let offset = span.offset + index * DIR_ENTRY_SIZE as u64;
                let record = RawRecord::read(self.image, offset)?;
                log::trace!("Record at {offset:#x}: {record:?}");
                match record {
                    RawRecord::EndOfDirectory => {
                        log::trace!("End of directory at {offset:#x}");
                        break 'spans;
                    }
                    RawRecord::Deleted => {
                        lfn.discard();
                    }
                    RawRecord::LongName(raw) => {
                        lfn.push(LfnFragment::from(&raw));
                    }
                    RawRecord::Short(raw) => {
                        let short = ShortEntry::from(&raw);
                        let long_name = lfn.finish(&short.raw_name());
                        let info = EntryInfo::new(short, long_name, offset);
                        entries.push(self.entry(info, depth, expanded)?);
                    }
                }
            }
        }
        // Fragments with no short entry after them
        lfn.discard();

        log::debug!("Read {} entries at depth {depth}", entries.len());
        Ok(entries)
    }

    fn entry(
        &self,
        mut info: EntryInfo,
        depth: usize,
        expanded: &mut HashSet<u32>,
    ) -> Result<DirectoryEntry, ScanError> {
        let short = *info.short_entry();
        // `.` and `..` point back up the tree; they are kept as leaves
        if !short.is_directory() || short.is_dot_entry() {
            return Ok(DirectoryEntry::File(File::new(info)));
        }
        if depth >= self.max_depth {
            info.push_warning(
                Corruption::DepthExceeded {
                    limit: self.max_depth,
                }
                .into(),
            );
            return Ok(DirectoryEntry::Directory(Directory::new(info, Vec::new())));
        }
        // Each directory is expanded once; a second reference is a cycle or a cross-link
        if expanded.contains(&short.cluster) {
            info.push_warning(
                Corruption::RevisitedCluster {
                    cluster: short.cluster,
                }
                .into(),
            );
            return Ok(DirectoryEntry::Directory(Directory::new(info, Vec::new())));
        }

        self.check_cancelled()?;
        let spans = self.chain_spans(short.cluster)?;
        if spans.is_empty() {
            info.push_warning(
                Corruption::InvalidStartCluster {
                    cluster: short.cluster,
                }
                .into(),
            );
            return Ok(DirectoryEntry::Directory(Directory::new(info, Vec::new())));
        }
        expanded.insert(short.cluster);
        log::trace!("Descending into {} at cluster {}", info.name(), short.cluster);
        let children = self.read_directory(&spans, depth + 1, expanded)?;
        Ok(DirectoryEntry::Directory(Directory::new(info, children)))
    }
}

/// Builds the directory tree rooted at `root`.
///
/// `clusters` resolves subdirectory chains, and the root chain too when the root is a cluster.
pub fn build_tree<R: ImageReader + ?Sized, C: ClusterMap + ?Sized>(
    image: &R,
    root: RootDirectory,
    bytes_per_cluster: u32,
    clusters: &C,
) -> Result<Directory, ScanError> {
    TreeBuilder::new(image, clusters, bytes_per_cluster).build(root)
}
