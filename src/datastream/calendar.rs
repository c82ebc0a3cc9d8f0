//! QTime and QDateTime wire encodings.
//!
//! A QTime carries only milliseconds since midnight, with no date and no
//! timezone. Turning it into an absolute instant needs a reference day and
//! offset supplied by the caller (see [`anchor_time`]); decoding the same bytes
//! against a different day yields a different instant. That is inherent to the
//! protocol.
//!
//! A QDateTime carries a Julian day number, milliseconds into that day and a
//! UTC flag. Writers here always emit UTC.

use chrono::{DateTime, FixedOffset, NaiveTime, TimeZone, Timelike, Utc};

use crate::error::{DataStreamError, Result};

/// Julian day number of 1970-01-01.
pub const UNIX_EPOCH_JULIAN_DAY: i64 = 2_440_588;

pub const MSECS_PER_DAY: u32 = 86_400_000;

/// Wire value of a null QTime.
pub const NULL_TIME: u32 = 0xFFFF_FFFF;

/// Raw QDateTime fields as they appear on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireDateTime {
    pub day: u32,
    pub msecs: u32,
    pub is_utc: bool,
}

impl WireDateTime {
    /// The null QDateTime.
    pub const NULL: Self = Self {
        day: 0,
        msecs: 0xFFFF_FFFF,
        is_utc: true,
    };

    pub fn is_null(&self) -> bool {
        self.day == 0 && self.msecs == 0xFFFF_FFFF
    }

    /// Encodes an instant as a UTC QDateTime, rounded to the nearest millisecond.
    pub fn from_instant(instant: &DateTime<Utc>) -> Result<Self> {
        let millis = (instant.timestamp_micros() + 500).div_euclid(1000);
        let day = millis.div_euclid(i64::from(MSECS_PER_DAY)) + UNIX_EPOCH_JULIAN_DAY;
        let msecs = millis.rem_euclid(i64::from(MSECS_PER_DAY)) as u32;
        let day = u32::try_from(day).map_err(|_| {
            DataStreamError::ValueOutOfRange(format!("{instant} is outside the QDateTime range"))
        })?;
        Ok(Self {
            day,
            msecs,
            is_utc: true,
        })
    }

    /// Decodes into an instant, or `None` for the null QDateTime.
    ///
    /// Local (non-UTC) values are interpreted in `offset`.
    pub fn to_instant(&self, offset: FixedOffset) -> Result<Option<DateTime<Utc>>> {
        if self.is_null() {
            return Ok(None);
        }
        if self.msecs >= MSECS_PER_DAY {
            return Err(DataStreamError::ValueOutOfRange(format!(
                "QDateTime has {} ms into the day",
                self.msecs
            )));
        }
        let mut millis = (i64::from(self.day) - UNIX_EPOCH_JULIAN_DAY) * i64::from(MSECS_PER_DAY)
            + i64::from(self.msecs);
        if !self.is_utc {
            millis -= i64::from(offset.local_minus_utc()) * 1000;
        }
        DateTime::from_timestamp_millis(millis).map(Some).ok_or_else(|| {
            DataStreamError::ValueOutOfRange(format!("QDateTime day {} is unrepresentable", self.day))
        })
    }
}

/// Milliseconds since midnight of a wall-clock time. Leap-second nanoseconds
/// are clamped into the last millisecond of the second.
pub fn time_to_msecs(time: &NaiveTime) -> u32 {
    let millis = (time.nanosecond() / 1_000_000).min(999);
    time.num_seconds_from_midnight() * 1000 + millis
}

/// Decodes a QTime wire value, `None` for the null QTime.
pub fn msecs_to_time(msecs: u32) -> Result<Option<NaiveTime>> {
    if msecs == NULL_TIME {
        return Ok(None);
    }
    if msecs >= MSECS_PER_DAY {
        return Err(DataStreamError::ValueOutOfRange(format!(
            "QTime has {msecs} ms since midnight"
        )));
    }
    NaiveTime::from_num_seconds_from_midnight_opt(msecs / 1000, (msecs % 1000) * 1_000_000)
        .map(Some)
        .ok_or_else(|| DataStreamError::ValueOutOfRange(format!("QTime {msecs} ms")))
}

/// Places a time of day on the calendar day of `reference`, in its offset.
pub fn anchor_time(time: NaiveTime, reference: &DateTime<FixedOffset>) -> Result<DateTime<FixedOffset>> {
    reference
        .offset()
        .from_local_datetime(&reference.date_naive().and_time(time))
        .single()
        .ok_or_else(|| DataStreamError::ValueOutOfRange(format!("{time} on {reference}")))
}

/// The wall-clock time an instant shows in its own timezone, which is what a
/// QTime carries.
pub fn time_of<Tz: TimeZone>(instant: &DateTime<Tz>) -> NaiveTime {
    instant.time()
}
