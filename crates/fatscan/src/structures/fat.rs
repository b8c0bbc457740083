//! Cluster chains
//!
//! Directories outside the fixed FAT12/FAT16 root live in cluster chains. The tree builder only
//! sees chains through the [`ClusterMap`] trait; [`FatTable`] is the implementation that reads
//! them out of the allocation table of an image.

use std::collections::HashSet;

use fatscan_io::ImageReader;

use super::raw::constants::{FIRST_DATA_CLUSTER, fat12, fat16, fat32};
use crate::error::ScanError;

/// Source of cluster chains and of the byte layout of the data region
pub trait ClusterMap {
    /// The full chain starting at `start`, including `start` itself, with no cluster repeated.
    /// Empty if `start` does not name a data cluster.
    fn chain_of(&self, start: u32) -> Result<Vec<u32>, ScanError>;

    /// The byte offset of the first byte of `cluster`
    fn cluster_offset(&self, cluster: u32, bytes_per_cluster: u32) -> u64;
}

impl<T: ClusterMap + ?Sized> ClusterMap for &T {
    fn chain_of(&self, start: u32) -> Result<Vec<u32>, ScanError> {
        (**self).chain_of(start)
    }

    fn cluster_offset(&self, cluster: u32, bytes_per_cluster: u32) -> u64 {
        (**self).cluster_offset(cluster, bytes_per_cluster)
    }
}

/// The width of the allocation table entries.
/// This is supplied by whoever parsed the boot sector, it is never guessed here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatType {
    Fat12,
    Fat16,
    Fat32,
}

/// What an allocation table entry says about the cluster it belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterValue {
    Free,
    Next(u32),
    Reserved,
    Bad,
    EndOfChain,
}

impl FatType {
    /// Number of bits in one table entry
    pub const fn entry_bits(self) -> u64 {
        match self {
            Self::Fat12 => 12,
            Self::Fat16 => 16,
            Self::Fat32 => 32,
        }
    }

    pub const fn classify(self, value: u32) -> ClusterValue {
        let (mask, free, reserved_min, bad, end_min) = match self {
            Self::Fat12 => (
                fat12::ENTRY_MASK,
                fat12::CLUSTER_FREE,
                fat12::CLUSTER_RESERVED_MIN,
                fat12::CLUSTER_BAD,
                fat12::CLUSTER_END_MIN,
            ),
            Self::Fat16 => (
                fat16::ENTRY_MASK,
                fat16::CLUSTER_FREE,
                fat16::CLUSTER_RESERVED_MIN,
                fat16::CLUSTER_BAD,
                fat16::CLUSTER_END_MIN,
            ),
            Self::Fat32 => (
                fat32::ENTRY_MASK,
                fat32::CLUSTER_FREE,
                fat32::CLUSTER_RESERVED_MIN,
                fat32::CLUSTER_BAD,
                fat32::CLUSTER_END_MIN,
            ),
        };
        let value = value & mask;
        if value == free {
            ClusterValue::Free
        } else if value >= end_min {
            ClusterValue::EndOfChain
        } else if value == bad {
            ClusterValue::Bad
        } else if value >= reserved_min || value < FIRST_DATA_CLUSTER {
            ClusterValue::Reserved
        } else {
            ClusterValue::Next(value)
        }
    }
}

/// An allocation table inside an image
#[derive(Debug)]
pub struct FatTable<'a, R: ImageReader + ?Sized> {
    image: &'a R,
    fat_type: FatType,
    /// Byte offset of the first table
    fat_offset: u64,
    /// Size of one table in bytes
    fat_len: u64,
    /// Byte offset of cluster 2
    data_offset: u64,
}

impl<'a, R: ImageReader + ?Sized> FatTable<'a, R> {
    pub fn new(
        image: &'a R,
        fat_type: FatType,
        fat_offset: u64,
        fat_len: u64,
        data_offset: u64,
    ) -> Self {
        Self {
            image,
            fat_type,
            fat_offset,
            fat_len,
            data_offset,
        }
    }

    pub fn fat_type(&self) -> FatType {
        self.fat_type
    }

    /// Number of entries the table has room for, including the two reserved ones
    pub fn entry_count(&self) -> u64 {
        self.fat_len * 8 / self.fat_type.entry_bits()
    }

    fn is_data_cluster(&self, cluster: u32) -> bool {
        cluster >= FIRST_DATA_CLUSTER && (cluster as u64) < self.entry_count()
    }

    /// Reads the raw table entry of `cluster`
    pub fn entry(&self, cluster: u32) -> Result<u32, ScanError> {
        let cluster = cluster as u64;
        let value = match self.fat_type {
            FatType::Fat12 => {
                let mut bytes = [0u8; 2];
                self.image
                    .read_range(self.fat_offset + cluster * 3 / 2, &mut bytes)?;
                let packed = u16::from_le_bytes(bytes);
                // Two entries share three bytes, odd clusters take the high 12 bits
                if cluster & 1 == 1 {
                    (packed >> 4) as u32
                } else {
                    (packed & 0x0FFF) as u32
                }
            }
            FatType::Fat16 => {
                let mut bytes = [0u8; 2];
                self.image
                    .read_range(self.fat_offset + cluster * 2, &mut bytes)?;
                u16::from_le_bytes(bytes) as u32
            }
            FatType::Fat32 => {
                let mut bytes = [0u8; 4];
                self.image
                    .read_range(self.fat_offset + cluster * 4, &mut bytes)?;
                u32::from_le_bytes(bytes) & fat32::ENTRY_MASK
            }
        };
        Ok(value)
    }

    /// The cluster that follows `cluster`, or `None` at the end of its chain
    pub fn next_cluster(&self, cluster: u32) -> Result<Option<u32>, ScanError> {
        match self.fat_type.classify(self.entry(cluster)?) {
            ClusterValue::Next(next) if self.is_data_cluster(next) => Ok(Some(next)),
            ClusterValue::EndOfChain => Ok(None),
            value => {
                log::warn!("Cluster chain broken after cluster {cluster}: {value:?}");
                Ok(None)
            }
        }
    }
}

impl<R: ImageReader + ?Sized> ClusterMap for FatTable<'_, R> {
    fn chain_of(&self, start: u32) -> Result<Vec<u32>, ScanError> {
        let mut chain = Vec::new();
        if !self.is_data_cluster(start) {
            return Ok(chain);
        }
        let mut visited = HashSet::new();
        let mut cluster = start;
        while visited.insert(cluster) {
            chain.push(cluster);
            match self.next_cluster(cluster)? {
                Some(next) if visited.contains(&next) => {
                    log::warn!("Cluster chain from {start} loops back to cluster {next}");
                    break;
                }
                Some(next) => cluster = next,
                None => break,
            }
        }
        log::trace!("Cluster chain from {start} has {} cluster(s)", chain.len());
        Ok(chain)
    }

    fn cluster_offset(&self, cluster: u32, bytes_per_cluster: u32) -> u64 {
        self.data_offset
            + cluster.saturating_sub(FIRST_DATA_CLUSTER) as u64 * bytes_per_cluster as u64
    }
}
