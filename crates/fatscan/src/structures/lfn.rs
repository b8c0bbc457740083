//! Long file name reassembly
//!
//! A long name is stored as a run of fragments directly before the short entry it belongs to,
//! usually in descending ordinal order. [`LfnAssembler`] collects a run, and folds it into a
//! name once the short entry shows up.

use super::raw::{
    constants::{
        LFN_CHARS_PER_ENTRY, LFN_FILL, LFN_LAST_ENTRY_MASK, LFN_ORDINAL_MASK, LFN_TERMINATOR,
    },
    directory::RawLfnEntry,
};
use crate::error::{Corruption, EntryWarning};

/// The checksum of an 11 byte short name, stored in every fragment of its long name
pub fn short_name_checksum(name: &[u8; 11]) -> u8 {
    name.iter()
        .fold(0u8, |sum, byte| sum.rotate_right(1).wrapping_add(*byte))
}

/// A decoded long name fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LfnFragment {
    /// 1-based position of the fragment in the name
    pub ordinal: u8,
    /// Set on the fragment holding the end of the name, which is the first one on disk
    pub is_last: bool,
    pub checksum: u8,
    pub units: [u16; LFN_CHARS_PER_ENTRY],
}

impl From<&RawLfnEntry> for LfnFragment {
    fn from(value: &RawLfnEntry) -> Self {
        Self {
            ordinal: value.sequence_number & LFN_ORDINAL_MASK,
            is_last: value.sequence_number & LFN_LAST_ENTRY_MASK != 0,
            checksum: value.checksum,
            units: value.units(),
        }
    }
}

/// A reassembled long name, and anything that looked wrong while building it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LongName {
    pub name: String,
    pub warnings: Vec<EntryWarning>,
}

/// Collects a run of fragments until the short entry that owns them is found
#[derive(Debug, Default)]
pub struct LfnAssembler {
    fragments: Vec<LfnFragment>,
}

impl LfnAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Adds a fragment to the current run.
    ///
    /// A fragment that repeats an ordinal already in the run, or a second fragment marked as
    /// last, cannot belong to the same name: it opens a new run and the pending one is dropped as
    /// an orphan. Returns how many orphaned fragments were dropped.
    pub fn push(&mut self, fragment: LfnFragment) -> usize {
        let starts_new_run = self
            .fragments
            .iter()
            .any(|f| f.ordinal == fragment.ordinal || (f.is_last && fragment.is_last));
        let discarded = if starts_new_run { self.discard() } else { 0 };
        self.fragments.push(fragment);
        discarded
    }

    /// Drops the current run, returning how many fragments it held
    pub fn discard(&mut self) -> usize {
        let count = self.fragments.len();
        if count > 0 {
            log::debug!("Discarding {count} orphaned long name fragment(s)");
            self.fragments.clear();
        }
        count
    }

    /// Folds the current run into the name of the short entry `short_name`.
    ///
    /// Returns `None` if no fragments were collected. Checksum and sequence problems do not
    /// discard the name; they are reported alongside it.
    pub fn finish(&mut self, short_name: &[u8; 11]) -> Option<LongName> {
        if self.fragments.is_empty() {
            return None;
        }
        let mut fragments = core::mem::take(&mut self.fragments);
        fragments.sort_by_key(|fragment| fragment.ordinal);

        let mut warnings = Vec::new();
        let expected = short_name_checksum(short_name);
        if let Some(fragment) = fragments.iter().find(|f| f.checksum != expected) {
            warnings.push(EntryWarning::ChecksumMismatch {
                expected,
                found: fragment.checksum,
            });
        }

        let in_sequence = fragments
            .iter()
            .enumerate()
            .all(|(index, f)| f.ordinal as usize == index + 1);
        let closed = fragments.last().is_some_and(|f| f.is_last);
        if !in_sequence || !closed {
            warnings.push(Corruption::IncompleteLongName.into());
        }

        let mut units: Vec<u16> = fragments
            .iter()
            .flat_map(|f| f.units)
            .take_while(|unit| *unit != LFN_TERMINATOR)
            .collect();
        while units.last() == Some(&LFN_FILL) {
            units.pop();
        }

        Some(LongName {
            name: String::from_utf16_lossy(&units),
            warnings,
        })
    }
}
