//! The decoded directory tree handed to callers.
//!
//! A tree is built once, top down, and never changes afterwards. Each directory owns its children
//! in on-disk order; there are no parent links.

use chrono::{NaiveDate, NaiveDateTime};

use crate::{
    error::{Corruption, EntryWarning, TimestampField},
    structures::{
        directory::{FileAttributes, ShortEntry},
        lfn::LongName,
        time::{validate_date, validate_timestamp},
    },
};

/// Everything known about one short entry, with its long name folded in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    short: ShortEntry,
    long_name: Option<String>,
    name: String,
    created: Option<NaiveDateTime>,
    accessed: Option<NaiveDate>,
    modified: Option<NaiveDateTime>,
    offset: u64,
    warnings: Vec<EntryWarning>,
}

impl EntryInfo {
    /// Builds the entry for the short record found at byte `offset`.
    ///
    /// Timestamps outside the calendar and sizes on directories or volume labels are recorded as
    /// warnings, never rejected.
    pub fn new(short: ShortEntry, long_name: Option<LongName>, offset: u64) -> Self {
        let (long_name, long_warnings) = match long_name {
            Some(long) => (Some(long.name), long.warnings),
            None => (None, Vec::new()),
        };
        let name = match &long_name {
            Some(long) if !long.is_empty() => long.clone(),
            _ => short.display_name(),
        };
        let mut info = Self {
            short,
            long_name,
            name,
            created: None,
            accessed: None,
            modified: None,
            offset,
            warnings: Vec::new(),
        };

        for warning in long_warnings {
            info.push_warning(warning);
        }
        match validate_timestamp(TimestampField::Created, short.created) {
            Ok(created) => info.created = created,
            Err(warning) => info.push_warning(warning),
        }
        match validate_date(TimestampField::Accessed, short.accessed) {
            Ok(accessed) => info.accessed = accessed,
            Err(warning) => info.push_warning(warning),
        }
        match validate_timestamp(TimestampField::Modified, short.modified) {
            Ok(modified) => info.modified = modified,
            Err(warning) => info.push_warning(warning),
        }

        if (short.is_directory() || short.is_volume_label()) && short.size != 0 {
            info.push_warning(Corruption::NonZeroSize { size: short.size }.into());
        }
        info
    }

    pub(crate) fn push_warning(&mut self, warning: EntryWarning) {
        log::warn!("{} (record at {:#x}): {warning}", self.name(), self.offset);
        self.warnings.push(warning);
    }

    /// The long name if there is one, otherwise the short name as `NAME.EXT`
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn short_name(&self) -> String {
        self.short.display_name()
    }

    pub fn long_name(&self) -> Option<&str> {
        self.long_name.as_deref()
    }

    /// The decoded short record, as stored
    pub fn short_entry(&self) -> &ShortEntry {
        &self.short
    }

    pub fn attributes(&self) -> FileAttributes {
        self.short.attributes
    }

    pub fn created(&self) -> Option<NaiveDateTime> {
        self.created
    }

    pub fn accessed(&self) -> Option<NaiveDate> {
        self.accessed
    }

    pub fn modified(&self) -> Option<NaiveDateTime> {
        self.modified
    }

    pub fn size(&self) -> u32 {
        self.short.size
    }

    pub fn cluster(&self) -> u32 {
        self.short.cluster
    }

    /// Byte offset of the short record in the image
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn is_dot_entry(&self) -> bool {
        self.short.is_dot_entry()
    }

    pub fn warnings(&self) -> &[EntryWarning] {
        &self.warnings
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    info: EntryInfo,
}

impl File {
    pub fn new(info: EntryInfo) -> Self {
        Self { info }
    }

    pub fn info(&self) -> &EntryInfo {
        &self.info
    }
}

/// A directory and its children, in on-disk order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directory {
    /// `None` for the root, which has no record of its own
    info: Option<EntryInfo>,
    children: Vec<DirectoryEntry>,
}

impl Directory {
    pub fn root(children: Vec<DirectoryEntry>) -> Self {
        Self {
            info: None,
            children,
        }
    }

    pub fn new(info: EntryInfo, children: Vec<DirectoryEntry>) -> Self {
        Self {
            info: Some(info),
            children,
        }
    }

    pub fn is_root(&self) -> bool {
        self.info.is_none()
    }

    pub fn info(&self) -> Option<&EntryInfo> {
        self.info.as_ref()
    }

    pub fn name(&self) -> &str {
        self.info.as_ref().map_or("/", EntryInfo::name)
    }

    pub fn children(&self) -> &[DirectoryEntry] {
        &self.children
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Visits every entry below this directory depth first, in on-disk order.
    /// Direct children are at depth 0.
    pub fn walk<F: FnMut(usize, &DirectoryEntry)>(&self, mut visit: F) {
        self.walk_inner(0, &mut visit);
    }

    fn walk_inner<F: FnMut(usize, &DirectoryEntry)>(&self, depth: usize, visit: &mut F) {
        for child in &self.children {
            visit(depth, child);
            if let DirectoryEntry::Directory(directory) = child {
                directory.walk_inner(depth + 1, visit);
            }
        }
    }

    /// Looks up a `/` separated path below this directory.
    ///
    /// Each component matches either the long or the short name, ignoring ASCII case.
    pub fn find(&self, path: &str) -> Option<&DirectoryEntry> {
        let mut components = path.split('/').filter(|c| !c.is_empty());
        let first = components.next()?;
        let mut current = self.child(first)?;
        for component in components {
            current = current.as_directory()?.child(component)?;
        }
        Some(current)
    }

    fn child(&self, name: &str) -> Option<&DirectoryEntry> {
        self.children.iter().find(|child| {
            child.info().is_some_and(|info| {
                info.name().eq_ignore_ascii_case(name)
                    || info.short_name().eq_ignore_ascii_case(name)
            })
        })
    }
}

/// One node of a decoded tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryEntry {
    File(File),
    Directory(Directory),
}

impl DirectoryEntry {
    /// The record behind this entry, `None` only for a root directory
    pub fn info(&self) -> Option<&EntryInfo> {
        match self {
            Self::File(file) => Some(file.info()),
            Self::Directory(directory) => directory.info(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::File(file) => file.info().name(),
            Self::Directory(directory) => directory.name(),
        }
    }

    pub fn attributes(&self) -> FileAttributes {
        self.info()
            .map_or(FileAttributes::DIRECTORY, EntryInfo::attributes)
    }

    pub fn size(&self) -> u32 {
        self.info().map_or(0, EntryInfo::size)
    }

    pub fn warnings(&self) -> &[EntryWarning] {
        self.info().map(EntryInfo::warnings).unwrap_or_default()
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, Self::Directory(_))
    }

    pub fn as_directory(&self) -> Option<&Directory> {
        match self {
            Self::Directory(directory) => Some(directory),
            Self::File(_) => None,
        }
    }

    pub fn as_file(&self) -> Option<&File> {
        match self {
            Self::File(file) => Some(file),
            Self::Directory(_) => None,
        }
    }
}
