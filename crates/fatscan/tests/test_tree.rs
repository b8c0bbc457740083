use std::{
    collections::HashMap,
    io::Write,
    sync::atomic::{AtomicBool, Ordering},
};

use fatscan::{
    ClusterMap, Corruption, DirectoryEntry, EntryWarning, FatTable, FatType, FileImage,
    RootDirectory, ScanError, TimestampField, TreeBuilder, build_tree,
    structures::lfn::short_name_checksum,
};
use pretty_assertions::assert_eq;

const BYTES_PER_CLUSTER: u32 = 512;
const DATA_OFFSET: u64 = 4096;
const ROOT: RootDirectory = RootDirectory::fixed(1024, 16);

/// 2013-07-19 19:26:18
const DATE: u16 = 0x42F3;
const TIME: u16 = 0x9B49;

fn short(name: &[u8; 11], attributes: u8, cluster: u32, size: u32) -> [u8; 32] {
    let mut record = [0u8; 32];
    record[..11].copy_from_slice(name);
    record[11] = attributes;
    record[16..18].copy_from_slice(&DATE.to_le_bytes());
    record[20..22].copy_from_slice(&((cluster >> 16) as u16).to_le_bytes());
    record[22..24].copy_from_slice(&TIME.to_le_bytes());
    record[24..26].copy_from_slice(&DATE.to_le_bytes());
    record[26..28].copy_from_slice(&(cluster as u16).to_le_bytes());
    record[28..32].copy_from_slice(&size.to_le_bytes());
    record
}

fn file(name: &[u8; 11]) -> [u8; 32] {
    short(name, 0x20, 0, 100)
}

fn deleted(name: &[u8; 11]) -> [u8; 32] {
    let mut record = file(name);
    record[0] = 0xE5;
    record
}

/// The long name fragments for `name`, in disk order (highest ordinal first)
fn long_name(name: &str, checksum: u8) -> Vec<[u8; 32]> {
    let mut units: Vec<u16> = name.encode_utf16().collect();
    if units.len() % 13 != 0 {
        units.push(0x0000);
    }
    while units.len() % 13 != 0 {
        units.push(0xFFFF);
    }
    let count = units.len() / 13;
    let mut records: Vec<[u8; 32]> = units
        .chunks_exact(13)
        .enumerate()
        .map(|(index, chunk)| {
            let mut record = [0u8; 32];
            record[0] = index as u8 + 1;
            if index + 1 == count {
                record[0] |= 0x40;
            }
            record[11] = 0x0F;
            record[13] = checksum;
            let slots = (1..11)
                .step_by(2)
                .chain((14..26).step_by(2))
                .chain((28..32).step_by(2));
            for (slot, unit) in slots.zip(chunk) {
                record[slot..slot + 2].copy_from_slice(&unit.to_le_bytes());
            }
            record
        })
        .collect();
    records.reverse();
    records
}

fn with_long_name(name: &str, short_record: [u8; 32]) -> Vec<[u8; 32]> {
    let mut raw_name = [0u8; 11];
    raw_name.copy_from_slice(&short_record[..11]);
    let mut records = long_name(name, short_name_checksum(&raw_name));
    records.push(short_record);
    records
}

fn cluster_offset(cluster: u32) -> u64 {
    DATA_OFFSET + (cluster as u64 - 2) * BYTES_PER_CLUSTER as u64
}

struct Image {
    bytes: Vec<u8>,
}

impl Image {
    fn new() -> Self {
        Self {
            bytes: vec![0u8; DATA_OFFSET as usize + 8 * BYTES_PER_CLUSTER as usize],
        }
    }

    fn put(&mut self, offset: u64, records: &[[u8; 32]]) -> &mut Self {
        for (index, record) in records.iter().enumerate() {
            let start = offset as usize + index * 32;
            self.bytes[start..start + 32].copy_from_slice(record);
        }
        self
    }

    fn root(&mut self, records: &[[u8; 32]]) -> &mut Self {
        let RootDirectory::Region { offset, .. } = ROOT else {
            unreachable!()
        };
        self.put(offset, records)
    }

    fn cluster(&mut self, cluster: u32, records: &[[u8; 32]]) -> &mut Self {
        self.put(cluster_offset(cluster), records)
    }
}

/// Chains given up front; any other start cluster has no chain
#[derive(Default)]
struct Chains(HashMap<u32, Vec<u32>>);

impl Chains {
    fn with(mut self, chain: &[u32]) -> Self {
        self.0.insert(chain[0], chain.to_vec());
        self
    }
}

impl ClusterMap for Chains {
    fn chain_of(&self, start: u32) -> Result<Vec<u32>, ScanError> {
        Ok(self.0.get(&start).cloned().unwrap_or_default())
    }

    fn cluster_offset(&self, cluster: u32, bytes_per_cluster: u32) -> u64 {
        assert_eq!(bytes_per_cluster, BYTES_PER_CLUSTER);
        cluster_offset(cluster)
    }
}

fn names(entries: &[DirectoryEntry]) -> Vec<&str> {
    entries.iter().map(DirectoryEntry::name).collect()
}

#[test]
fn end_marker_stops_scan_and_deleted_records_are_skipped() {
    let mut image = Image::new();
    image.root(&[
        file(b"FIRST   TXT"),
        deleted(b"GONE    TXT"),
        file(b"SECOND  TXT"),
        [0u8; 32],
        file(b"HIDDEN  TXT"),
    ]);
    let root = build_tree(&image.bytes, ROOT, BYTES_PER_CLUSTER, &Chains::default()).unwrap();
    assert!(root.is_root());
    assert_eq!(names(root.children()), vec!["FIRST.TXT", "SECOND.TXT"]);

    let first = root.children()[0].info().unwrap();
    assert_eq!(first.size(), 100);
    assert_eq!(first.offset(), 1024);
    assert_eq!(
        first.modified().map(|t| t.to_string()),
        Some("2013-07-19 19:26:18".to_string())
    );
    // Creation date without a creation time
    assert_eq!(
        first.created().map(|t| t.to_string()),
        Some("2013-07-19 00:00:00".to_string())
    );
    assert!(first.warnings().is_empty());
}

#[test]
fn zero_dates_are_unset() {
    let mut record = file(b"UNSET   TXT");
    record[16..18].fill(0);
    // A time of day with no date is still unset
    record[14..16].copy_from_slice(&TIME.to_le_bytes());

    let mut image = Image::new();
    image.root(&[record]);
    let root = build_tree(&image.bytes, ROOT, BYTES_PER_CLUSTER, &Chains::default()).unwrap();

    let entry = root.children()[0].info().unwrap();
    assert_eq!(entry.created(), None);
    assert_eq!(entry.accessed(), None);
    assert!(entry.modified().is_some());
    assert!(entry.warnings().is_empty());
}

#[test]
fn long_names_attach_to_their_short_entry() {
    let mut records = with_long_name("Quarterly Report 2013.xlsx", file(b"QUARTE~1XLS"));
    records.push(file(b"README  TXT"));
    let mut mismatched = long_name("checksum is off.bin", 0x00);
    mismatched.push(file(b"CHECKS~1BIN"));
    records.extend(mismatched);

    let mut image = Image::new();
    image.root(&records);
    let root = build_tree(&image.bytes, ROOT, BYTES_PER_CLUSTER, &Chains::default()).unwrap();
    assert_eq!(
        names(root.children()),
        vec!["Quarterly Report 2013.xlsx", "README.TXT", "checksum is off.bin"]
    );

    let report = root.children()[0].info().unwrap();
    assert_eq!(report.short_name(), "QUARTE~1.XLS");
    assert_eq!(report.long_name(), Some("Quarterly Report 2013.xlsx"));
    assert!(report.warnings().is_empty());

    assert_eq!(root.children()[1].info().unwrap().long_name(), None);

    let checksum = short_name_checksum(b"CHECKS~1BIN");
    assert_eq!(
        root.children()[2].warnings(),
        &[EntryWarning::ChecksumMismatch {
            expected: checksum,
            found: 0x00
        }]
    );
}

#[test]
fn orphaned_fragments_are_dropped() {
    let mut records = long_name("orphaned by deletion.txt", 0x12);
    records.push(deleted(b"ORPHAN~1TXT"));
    records.push(file(b"PLAIN   TXT"));
    records.extend(long_name("never finished", 0x34));

    let mut image = Image::new();
    image.root(&records);
    let root = build_tree(&image.bytes, ROOT, BYTES_PER_CLUSTER, &Chains::default()).unwrap();
    assert_eq!(names(root.children()), vec!["PLAIN.TXT"]);
    assert!(root.children()[0].warnings().is_empty());
}

fn nested_image() -> (Image, Chains) {
    let mut image = Image::new();
    image
        .root(&[
            short(b"DOCS       ", 0x10, 2, 0),
            short(b"EMPTY      ", 0x10, 3, 0),
            file(b"TOP     TXT"),
        ])
        .cluster(
            2,
            &[
                short(b".          ", 0x10, 2, 0),
                short(b"..         ", 0x10, 0, 0),
                file(b"NOTES   TXT"),
            ],
        )
        .cluster(3, &[[0u8; 32]]);
    (image, Chains::default().with(&[2]).with(&[3]))
}

#[test]
fn subdirectories_are_traversed() {
    let (image, chains) = nested_image();
    let root = build_tree(&image.bytes, ROOT, BYTES_PER_CLUSTER, &chains).unwrap();
    assert_eq!(names(root.children()), vec!["DOCS", "EMPTY", "TOP.TXT"]);

    let docs = root.children()[0].as_directory().unwrap();
    assert_eq!(names(docs.children()), vec![".", "..", "NOTES.TXT"]);
    // Dot entries are leaves
    assert!(!docs.children()[0].is_directory());
    assert!(docs.children()[1].info().unwrap().is_dot_entry());

    let empty = root.find("empty").unwrap().as_directory().unwrap();
    assert_eq!(empty.child_count(), 0);
    assert!(root.children()[1].warnings().is_empty());

    let mut seen = Vec::new();
    root.walk(|depth, entry| seen.push((depth, entry.name().to_string())));
    assert_eq!(seen.len(), 6);
    assert_eq!(seen[3], (1, "NOTES.TXT".to_string()));
}

#[test]
fn building_twice_gives_equal_trees() {
    let (image, chains) = nested_image();
    let builder = TreeBuilder::new(&image.bytes, &chains, BYTES_PER_CLUSTER);
    let first = builder.build(ROOT).unwrap();
    let second = builder.build(ROOT).unwrap();
    assert_eq!(first, second);
}

#[test]
fn directory_with_size_is_flagged_and_traversed() {
    let mut image = Image::new();
    image
        .root(&[short(b"SIZED      ", 0x10, 4, 1024)])
        .cluster(4, &[file(b"INSIDE  TXT")]);
    let root = build_tree(&image.bytes, ROOT, BYTES_PER_CLUSTER, &Chains::default().with(&[4]))
        .unwrap();

    let sized = &root.children()[0];
    assert_eq!(
        sized.warnings(),
        &[EntryWarning::from(Corruption::NonZeroSize { size: 1024 })]
    );
    assert_eq!(names(sized.as_directory().unwrap().children()), vec!["INSIDE.TXT"]);
}

#[test]
fn directory_spans_non_contiguous_clusters() {
    // Cluster 5 is full; the last long name fragment of the run crosses into cluster 3
    let mut first: Vec<[u8; 32]> = (0..15)
        .map(|i| file(format!("FILE{i:<4}TXT").as_bytes().try_into().unwrap()))
        .collect();
    let mut crossing = with_long_name("spans two clusters.dat", file(b"SPANST~1DAT"));
    assert_eq!(crossing.len(), 3);
    first.extend(crossing.drain(..1));
    assert_eq!(first.len(), 16);
    crossing.push(file(b"LAST    TXT"));

    let mut image = Image::new();
    image
        .root(&[short(b"BIG        ", 0x10, 5, 0)])
        .cluster(5, &first)
        .cluster(3, &crossing);
    let chains = Chains::default().with(&[5, 3]);
    let root = build_tree(&image.bytes, ROOT, BYTES_PER_CLUSTER, &chains).unwrap();

    let big = root.children()[0].as_directory().unwrap();
    assert_eq!(big.child_count(), 17);
    assert_eq!(big.children()[0].name(), "FILE0.TXT");
    assert_eq!(big.children()[15].name(), "spans two clusters.dat");
    assert!(big.children()[15].warnings().is_empty());
    assert_eq!(big.children()[16].name(), "LAST.TXT");
}

#[test]
fn subdirectory_without_chain_is_flagged() {
    let mut image = Image::new();
    image.root(&[short(b"BROKEN     ", 0x10, 0, 0), file(b"AFTER   TXT")]);
    let root = build_tree(&image.bytes, ROOT, BYTES_PER_CLUSTER, &Chains::default()).unwrap();

    let broken = &root.children()[0];
    assert!(broken.is_directory());
    assert_eq!(broken.as_directory().unwrap().child_count(), 0);
    assert_eq!(
        broken.warnings(),
        &[EntryWarning::from(Corruption::InvalidStartCluster { cluster: 0 })]
    );
    assert_eq!(root.children()[1].name(), "AFTER.TXT");
}

#[test]
fn nesting_is_cut_by_depth_cap() {
    // D2 -> D3 -> D4 -> D5 -> D6, each in its own cluster
    let mut image = Image::new();
    image.root(&[short(b"D2         ", 0x10, 2, 0)]);
    let mut chains = Chains::default();
    for cluster in 2..6 {
        let name = format!("D{:<10}", cluster + 1);
        let record = short(name.as_bytes().try_into().unwrap(), 0x10, cluster + 1, 0);
        image.cluster(cluster, &[record]);
        chains = chains.with(&[cluster]);
    }
    let root = TreeBuilder::new(&image.bytes, &chains.with(&[6]), BYTES_PER_CLUSTER)
        .with_max_depth(3)
        .build(ROOT)
        .unwrap();

    let mut deepest = 0;
    let mut flagged = Vec::new();
    root.walk(|depth, entry| {
        deepest = deepest.max(depth);
        if !entry.warnings().is_empty() {
            flagged.push((depth, entry.name().to_string(), entry.warnings().to_vec()));
        }
    });
    assert_eq!(deepest, 3);
    assert_eq!(
        flagged,
        vec![(
            3,
            "D5".to_string(),
            vec![EntryWarning::from(Corruption::DepthExceeded { limit: 3 })]
        )]
    );
    let d5 = root.find("D2/D3/D4/D5").unwrap().as_directory().unwrap();
    assert_eq!(d5.child_count(), 0);
}

#[test]
fn directories_pointing_back_at_their_parent_are_not_expanded() {
    let revisited = vec![EntryWarning::from(Corruption::RevisitedCluster { cluster: 2 })];
    let parent_cluster = [
        short(b"A          ", 0x10, 2, 0),
        short(b"B          ", 0x10, 2, 0),
        file(b"KEPT    TXT"),
    ];

    // PARENT lives in cluster 2, and both of its subdirectories start there too
    let mut image = Image::new();
    image
        .root(&[short(b"PARENT     ", 0x10, 2, 0)])
        .cluster(2, &parent_cluster);
    let chains = Chains::default().with(&[2]);
    let root = build_tree(&image.bytes, ROOT, BYTES_PER_CLUSTER, &chains).unwrap();

    let parent = root.children()[0].as_directory().unwrap();
    assert!(root.children()[0].warnings().is_empty());
    assert_eq!(names(parent.children()), vec!["A", "B", "KEPT.TXT"]);
    for sibling in &parent.children()[..2] {
        assert_eq!(sibling.as_directory().unwrap().child_count(), 0);
        assert_eq!(sibling.warnings(), revisited.as_slice());
    }
    let mut count = 0;
    root.walk(|_, _| count += 1);
    assert_eq!(count, 4);

    // The same records as a cluster root: the root itself is the directory being revisited
    let root = build_tree(&image.bytes, RootDirectory::Cluster(2), BYTES_PER_CLUSTER, &chains)
        .unwrap();
    assert_eq!(names(root.children()), vec!["A", "B", "KEPT.TXT"]);
    assert_eq!(root.children()[0].warnings(), revisited.as_slice());
    assert_eq!(root.children()[1].warnings(), revisited.as_slice());
}

#[test]
fn cross_linked_directory_is_expanded_once() {
    let mut image = Image::new();
    image
        .root(&[
            short(b"FIRST      ", 0x10, 3, 0),
            short(b"SECOND     ", 0x10, 3, 0),
        ])
        .cluster(3, &[file(b"SHARED  TXT")]);
    let chains = Chains::default().with(&[3]);
    let root = build_tree(&image.bytes, ROOT, BYTES_PER_CLUSTER, &chains).unwrap();

    assert!(root.find("FIRST/SHARED.TXT").is_some());
    let second = &root.children()[1];
    assert_eq!(second.as_directory().unwrap().child_count(), 0);
    assert_eq!(
        second.warnings(),
        &[EntryWarning::from(Corruption::RevisitedCluster { cluster: 3 })]
    );
}

#[test]
fn invalid_timestamps_are_warnings() {
    let mut record = file(b"BADDATE TXT");
    // Month 13
    let bad = (33u16 << 9) | (13 << 5) | 1;
    record[24..26].copy_from_slice(&bad.to_le_bytes());

    let mut image = Image::new();
    image.root(&[record]);
    let root = build_tree(&image.bytes, ROOT, BYTES_PER_CLUSTER, &Chains::default()).unwrap();

    let entry = root.children()[0].info().unwrap();
    assert_eq!(entry.modified(), None);
    assert!(entry.accessed().is_none());
    assert_eq!(
        entry.warnings(),
        &[EntryWarning::InvalidTimestamp {
            field: TimestampField::Modified,
            date: bad,
            time: TIME
        }]
    );
}

#[test]
fn unreadable_images_are_errors() {
    let empty: Vec<u8> = Vec::new();
    assert!(matches!(
        build_tree(&empty, ROOT, BYTES_PER_CLUSTER, &Chains::default()),
        Err(ScanError::InvalidImage { .. })
    ));

    // The root region runs past the end of the image, with no end marker before it
    let mut truncated = vec![0u8; 1024 + 48];
    truncated[1024..1056].copy_from_slice(&file(b"CUT     TXT"));
    assert!(matches!(
        build_tree(&truncated, ROOT, BYTES_PER_CLUSTER, &Chains::default()),
        Err(ScanError::InvalidImage { .. })
    ));
}

#[test]
fn cancelled_build_stops_before_subdirectories() {
    let (image, chains) = nested_image();
    let cancel = AtomicBool::new(false);
    let builder =
        TreeBuilder::new(&image.bytes, &chains, BYTES_PER_CLUSTER).with_cancel_flag(&cancel);
    assert!(builder.build(ROOT).is_ok());

    cancel.store(true, Ordering::Relaxed);
    assert!(matches!(builder.build(ROOT), Err(ScanError::Cancelled)));
}

/// Sets the 12 bit table entry of `cluster`
fn set_fat12(fat: &mut [u8], cluster: usize, value: u16) {
    let offset = cluster * 3 / 2;
    if cluster & 1 == 1 {
        fat[offset] = (fat[offset] & 0x0F) | ((value as u8 & 0x0F) << 4);
        fat[offset + 1] = (value >> 4) as u8;
    } else {
        fat[offset] = value as u8;
        fat[offset + 1] = (fat[offset + 1] & 0xF0) | ((value >> 8) as u8 & 0x0F);
    }
}

/// A small FAT12 layout: table at 512, root at 1024, clusters of one 512b sector from 1536
fn fat12_image() -> Vec<u8> {
    let mut image = vec![0u8; 1536 + 4 * 512];
    let fat = &mut image[512..1024];
    set_fat12(fat, 0, 0xFF8);
    set_fat12(fat, 1, 0xFFF);
    set_fat12(fat, 2, 4);
    set_fat12(fat, 3, 0xFFF);
    set_fat12(fat, 4, 0xFFF);

    let mut sub = vec![
        short(b".          ", 0x10, 2, 0),
        short(b"..         ", 0x10, 0, 0),
    ];
    for i in 0..14 {
        sub.push(file(format!("DATA{i:<4}BIN").as_bytes().try_into().unwrap()));
    }
    let mut root = with_long_name("Sub Directory", short(b"SUBDIR~1   ", 0x10, 2, 0));
    root.push(short(b"VOLUME     ", 0x08, 0, 0));

    let records = [
        (1024usize, root),
        (1536, sub),
        (2560, vec![file(b"TAIL    BIN")]),
    ];
    for (offset, records) in records {
        for (index, record) in records.iter().enumerate() {
            let start = offset + index * 32;
            image[start..start + 32].copy_from_slice(record);
        }
    }
    image
}

#[test]
fn fat12_image_end_to_end() {
    let image = fat12_image();
    let fat = FatTable::new(&image, FatType::Fat12, 512, 512, 1536);
    let root = build_tree(&image, RootDirectory::fixed(1024, 16), 512, &fat).unwrap();

    assert_eq!(names(root.children()), vec!["Sub Directory", "VOLUME"]);
    assert!(root.children()[1].info().unwrap().short_entry().is_volume_label());

    let sub = root.find("Sub Directory").unwrap().as_directory().unwrap();
    assert_eq!(sub.child_count(), 17);
    assert_eq!(sub.children()[16].name(), "TAIL.BIN");
    assert!(root.find("SUBDIR~1/DATA13.BIN").is_some());
}

#[test]
fn file_backed_image_matches_memory() {
    let image = fat12_image();
    let mut file = tempfile::tempfile().unwrap();
    file.write_all(&image).unwrap();
    let on_disk = FileImage::from_file(file).unwrap();

    let from_disk = {
        let fat = FatTable::new(&on_disk, FatType::Fat12, 512, 512, 1536);
        build_tree(&on_disk, RootDirectory::fixed(1024, 16), 512, &fat).unwrap()
    };
    let from_memory = {
        let fat = FatTable::new(&image, FatType::Fat12, 512, 512, 1536);
        build_tree(&image, RootDirectory::fixed(1024, 16), 512, &fat).unwrap()
    };
    assert_eq!(from_disk, from_memory);
}

#[test]
fn looping_fat32_root_lists_each_record_once() {
    // Table at 512 where cluster 2 names itself as its successor, data region from 1536
    let mut image = vec![0u8; 1536 + 2 * 512];
    image[512 + 8..512 + 12].copy_from_slice(&2u32.to_le_bytes());
    for i in 0..16 {
        let record = file(format!("LOOP{i:<4}BIN").as_bytes().try_into().unwrap());
        let start = 1536 + i * 32;
        image[start..start + 32].copy_from_slice(&record);
    }

    let fat = FatTable::new(&image, FatType::Fat32, 512, 512, 1536);
    assert_eq!(fat.chain_of(2).unwrap(), vec![2]);
    let root = build_tree(&image, RootDirectory::Cluster(2), 512, &fat).unwrap();
    assert_eq!(root.child_count(), 16);
    assert_eq!(root.children()[0].name(), "LOOP0.BIN");
    assert_eq!(root.children()[15].name(), "LOOP15.BIN");
}
