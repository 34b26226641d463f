//! Time handling for reservations
//!
//! Provides:
//! - `Interval` - Half-open `[start, end)` span of UTC instants
//! - `parse_instant` - Accepts RFC 3339 timestamps or bare `YYYY-MM-DD` dates
//! - `slot_key` - Order-preserving byte-string encoding of an instant
//!
//! Instants are stored as nanoseconds since the Unix epoch, so every instant
//! the crate accepts must fit that range (years 1677 to 2262). Nothing is
//! rounded between validation, storage and the overlap check.

use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use std::fmt;

/// A half-open interval `[start, end)` of UTC instants.
///
/// # Invariants
/// `start` is always strictly less than `end`; a zero-length interval cannot
/// be constructed. Both bounds are representable as [`to_nanos`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl Interval {
    /// Create an interval, failing with `InvalidInterval` unless `start < end`
    /// and with `InvalidDate` when a bound is outside the storable range
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        to_nanos(start)?;
        to_nanos(end)?;
        if start < end {
            Ok(Self { start, end })
        } else {
            Err(Error::InvalidInterval { start, end })
        }
    }

    /// Inclusive start
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Exclusive end
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Half-open overlap test: `a.start < b.end && b.start < a.end`.
    ///
    /// Intervals that merely touch (one ends exactly when the other starts)
    /// do not overlap.
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Check whether `instant` lies inside `[start, end)`
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }

    /// Replace either bound, re-validating the ordering
    pub fn with_bounds(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Self> {
        Self::new(start.unwrap_or(self.start), end.unwrap_or(self.end))
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

/// Parse an instant from RFC 3339 (`2025-09-01T10:00:00Z`) or a bare calendar
/// date (`2025-09-01`, read as midnight UTC).
pub fn parse_instant(input: &str) -> Result<DateTime<Utc>> {
    let trimmed = input.trim();
    let parsed = DateTime::parse_from_rfc3339(trimmed)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|midnight| midnight.and_utc())
        })
        .ok_or_else(|| Error::InvalidDate(input.to_string()))?;
    to_nanos(parsed)?;
    Ok(parsed)
}

/// Encode a [`to_nanos`] value as a fixed-width string whose lexicographic
/// order matches chronological order (sign bit flipped).
pub fn slot_key(nanos: i64) -> String {
    let ordered = (nanos as u64) ^ (1u64 << 63);
    format!("{:020}", ordered)
}

/// Nanoseconds since the Unix epoch, the storage representation of instants
pub fn to_nanos(instant: DateTime<Utc>) -> Result<i64> {
    instant
        .timestamp_nanos_opt()
        .ok_or_else(|| Error::InvalidDate(format!("{} is out of range", instant.to_rfc3339())))
}

/// Inverse of [`to_nanos`]
pub fn from_nanos(nanos: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_nanos(nanos)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> DateTime<Utc> {
        parse_instant(&format!("2025-01-{:02}", d)).unwrap()
    }

    #[test]
    fn test_interval_requires_strict_order() {
        assert!(Interval::new(day(1), day(5)).is_ok());
        assert!(matches!(
            Interval::new(day(5), day(5)),
            Err(Error::InvalidInterval { .. })
        ));
        assert!(matches!(
            Interval::new(day(6), day(5)),
            Err(Error::InvalidInterval { .. })
        ));
    }

    #[test]
    fn test_back_to_back_does_not_overlap() {
        let a = Interval::new(day(1), day(5)).unwrap();
        let b = Interval::new(day(5), day(10)).unwrap();
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
    }

    #[test]
    fn test_overlap_cases() {
        let a = Interval::new(day(1), day(5)).unwrap();
        assert!(a.overlaps(&a));
        assert!(a.overlaps(&Interval::new(day(3), day(8)).unwrap()));
        assert!(a.overlaps(&Interval::new(day(2), day(3)).unwrap()));
        assert!(Interval::new(day(2), day(3)).unwrap().overlaps(&a));
        assert!(!a.overlaps(&Interval::new(day(6), day(8)).unwrap()));
    }

    #[test]
    fn test_contains_is_half_open() {
        let a = Interval::new(day(1), day(5)).unwrap();
        assert!(a.contains(day(1)));
        assert!(a.contains(day(4)));
        assert!(!a.contains(day(5)));
    }

    #[test]
    fn test_with_bounds_revalidates() {
        let a = Interval::new(day(1), day(5)).unwrap();
        let moved = a.with_bounds(Some(day(2)), Some(day(6))).unwrap();
        assert_eq!(moved.start(), day(2));
        assert_eq!(moved.end(), day(6));
        assert!(a.with_bounds(Some(day(5)), None).is_err());
        assert_eq!(a.with_bounds(None, Some(day(9))).unwrap().start(), day(1));
    }

    #[test]
    fn test_parse_instant_formats() {
        let date_only = parse_instant("2025-09-01").unwrap();
        assert_eq!(date_only.to_rfc3339(), "2025-09-01T00:00:00+00:00");

        let with_offset = parse_instant("2025-09-01T12:00:00+02:00").unwrap();
        assert_eq!(with_offset.to_rfc3339(), "2025-09-01T10:00:00+00:00");

        assert!(matches!(
            parse_instant("not a date"),
            Err(Error::InvalidDate(_))
        ));
        assert!(matches!(
            parse_instant("2300-01-01"),
            Err(Error::InvalidDate(_))
        ));
    }

    #[test]
    fn test_slot_key_preserves_order() {
        let before_epoch = parse_instant("1960-06-01").unwrap();
        let epoch = parse_instant("1970-01-01").unwrap();
        let later = day(1);
        let key = |instant| slot_key(to_nanos(instant).unwrap());
        assert!(key(before_epoch) < key(epoch));
        assert!(key(epoch) < key(later));
        assert_eq!(key(later).len(), 20);
    }

    #[test]
    fn test_nanos_round_trip() {
        let instant = parse_instant("2025-03-04T05:06:07.123456789Z").unwrap();
        assert_eq!(from_nanos(to_nanos(instant).unwrap()), instant);
    }

    #[test]
    fn test_sub_millisecond_bounds_are_kept() {
        let start = parse_instant("2025-01-01T00:00:00.0001Z").unwrap();
        let end = parse_instant("2025-01-01T00:00:00.0009Z").unwrap();
        let tiny = Interval::new(start, end).unwrap();
        assert_eq!(tiny.start(), start);
        assert!(tiny.overlaps(&tiny));

        let a = Interval::new(day(1), parse_instant("2025-01-05T00:00:00.0009Z").unwrap())
            .unwrap();
        let b = Interval::new(parse_instant("2025-01-05T00:00:00.0005Z").unwrap(), day(10))
            .unwrap();
        assert!(a.overlaps(&b));
    }

    #[test]
    fn test_interval_rejects_unstorable_bounds() {
        let far = NaiveDate::from_ymd_opt(2300, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap()
            .and_utc();
        assert!(matches!(
            Interval::new(day(1), far),
            Err(Error::InvalidDate(_))
        ));
    }
}
