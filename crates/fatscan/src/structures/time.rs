//! Packed FAT dates and times
//!
//! Decoding is pure bit extraction and never fails. Whether the result is a real calendar value is
//! decided separately by [`FatDate::to_naive`] and friends, so the caller chooses the policy.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::{EntryWarning, TimestampField};

/// Years in a FAT date count from 1980
pub const FAT_EPOCH_YEAR: u16 = 1980;

/// A FAT date
///
/// Bits 0-4 hold the day, bits 5-8 the month, and bits 9-15 the years since 1980.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FatDate {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

impl FatDate {
    pub const fn from_raw(raw: u16) -> Self {
        Self {
            year: (raw >> 9) + FAT_EPOCH_YEAR,
            month: ((raw >> 5) & 0x0F) as u8,
            day: (raw & 0x1F) as u8,
        }
    }

    pub const fn from_bytes(bytes: [u8; 2]) -> Self {
        Self::from_raw(u16::from_le_bytes(bytes))
    }

    pub const fn to_raw(self) -> u16 {
        ((self.year.wrapping_sub(FAT_EPOCH_YEAR) & 0x7F) << 9)
            | ((self.month as u16 & 0x0F) << 5)
            | (self.day as u16 & 0x1F)
    }

    /// Returns `None` if the fields do not name a real day
    pub fn to_naive(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year as i32, self.month as u32, self.day as u32)
    }
}

/// A FAT time of day
///
/// Bits 0-4 hold the seconds divided by two, bits 5-10 the minutes, and bits 11-15 the hours.
/// Creation times are refined by an extra byte counting 10ms units, which is folded into
/// `seconds` and `millis`. The byte itself is kept in `fine` so the time re-encodes exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FatTime {
    pub hours: u8,
    pub minutes: u8,
    pub seconds: u8,
    pub millis: u16,
    /// The refinement byte as stored, 0 when there is none
    pub fine: u8,
}

impl FatTime {
    pub const fn from_raw(raw: u16) -> Self {
        Self {
            hours: (raw >> 11) as u8,
            minutes: ((raw >> 5) & 0x3F) as u8,
            seconds: (raw & 0x1F) as u8 * 2,
            millis: 0,
            fine: 0,
        }
    }

    /// Decodes a time with its 10ms refinement byte.
    ///
    /// Valid bytes are 0 to 199, adding up to 1990ms. Larger bytes are decoded the same way and
    /// may push `seconds` past 59, which calendar validation then rejects.
    pub const fn with_fine(raw: u16, fine: u8) -> Self {
        let mut time = Self::from_raw(raw);
        let extra = fine as u16 * 10;
        time.seconds += (extra / 1000) as u8;
        time.millis = extra % 1000;
        time.fine = fine;
        time
    }

    /// Whole seconds contributed by the refinement byte
    const fn fine_seconds(self) -> u8 {
        (self.fine as u16 * 10 / 1000) as u8
    }

    /// Encodes the 16-bit time word. The refinement byte is stored separately, see `fine`.
    pub const fn to_raw(self) -> u16 {
        let seconds = self.seconds.wrapping_sub(self.fine_seconds());
        ((self.hours as u16 & 0x1F) << 11)
            | ((self.minutes as u16 & 0x3F) << 5)
            | ((seconds as u16 / 2) & 0x1F)
    }

    /// Returns `None` if the fields do not name a real time of day
    pub fn to_naive(self) -> Option<NaiveTime> {
        NaiveTime::from_hms_milli_opt(
            self.hours as u32,
            self.minutes as u32,
            self.seconds as u32,
            self.millis as u32,
        )
    }
}

/// A FAT date and time pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FatTimestamp {
    pub date: FatDate,
    pub time: FatTime,
}

impl FatTimestamp {
    pub const fn new(date: u16, time: u16) -> Self {
        Self {
            date: FatDate::from_raw(date),
            time: FatTime::from_raw(time),
        }
    }

    pub const fn with_fine(date: u16, time: u16, fine: u8) -> Self {
        Self {
            date: FatDate::from_raw(date),
            time: FatTime::with_fine(time, fine),
        }
    }

    pub fn to_naive(self) -> Option<NaiveDateTime> {
        Some(NaiveDateTime::new(self.date.to_naive()?, self.time.to_naive()?))
    }
}

impl core::fmt::Display for FatTimestamp {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        // MM/DD/YYYY HH:MM:SS, printed as stored even when out of range
        write!(
            f,
            "{:02}/{:02}/{:04} {:02}:{:02}:{:02}",
            self.date.month,
            self.date.day,
            self.date.year,
            self.time.hours,
            self.time.minutes,
            self.time.seconds
        )
    }
}

/// Checks a stored timestamp against the calendar.
///
/// A zero date means the field was never set, which is `Ok(None)`.
pub fn validate_timestamp(
    field: TimestampField,
    timestamp: FatTimestamp,
) -> Result<Option<NaiveDateTime>, EntryWarning> {
    if timestamp.date.to_raw() == 0 {
        return Ok(None);
    }
    timestamp
        .to_naive()
        .map(Some)
        .ok_or(EntryWarning::InvalidTimestamp {
            field,
            date: timestamp.date.to_raw(),
            time: timestamp.time.to_raw(),
        })
}

/// Like [`validate_timestamp`], for fields that only store a date
pub fn validate_date(
    field: TimestampField,
    date: FatDate,
) -> Result<Option<NaiveDate>, EntryWarning> {
    if date.to_raw() == 0 {
        return Ok(None);
    }
    date.to_naive()
        .map(Some)
        .ok_or(EntryWarning::InvalidTimestamp {
            field,
            date: date.to_raw(),
            time: 0,
        })
}
