//! iCalendar DATE, PERIOD and typed property values (RFC 5545 §3.3).

use std::fmt;

use chrono::NaiveDate;

use super::{DateTime, Duration, UtcOffset};

/// DATE value (RFC 5545 §3.3.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Date {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

impl Date {
    #[must_use]
    pub const fn new(year: u16, month: u8, day: u8) -> Self {
        Self { year, month, day }
    }

    /// Returns the chrono date, or `None` if the date does not exist.
    #[must_use]
    pub fn naive(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(
            i32::from(self.year),
            u32::from(self.month),
            u32::from(self.day),
        )
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}{:02}{:02}", self.year, self.month, self.day)
    }
}

/// PERIOD value (RFC 5545 §3.3.9).
///
/// A precise period of time, defined by either:
/// - An explicit start and end (both DATE-TIME)
/// - A start DATE-TIME and a DURATION
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Period {
    Explicit { start: DateTime, end: DateTime },
    Duration { start: DateTime, duration: Duration },
}

impl Period {
    #[must_use]
    pub fn explicit(start: DateTime, end: DateTime) -> Self {
        Self::Explicit { start, end }
    }

    #[must_use]
    pub fn start(&self) -> &DateTime {
        match self {
            Self::Explicit { start, .. } | Self::Duration { start, .. } => start,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Explicit { start, end } => write!(f, "{start}/{end}"),
            Self::Duration { start, duration } => write!(f, "{start}/{duration}"),
        }
    }
}

/// Typed property value (RFC 5545 §3.3).
///
/// Text is held unescaped. `Unknown` keeps the raw text of values whose type
/// is not modeled, and is also the blanked form left by `novalue` projection.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Date(Date),
    DateTime(DateTime),
    DateList(Vec<Date>),
    DateTimeList(Vec<DateTime>),
    Duration(Duration),
    Integer(i64),
    Period(Period),
    PeriodList(Vec<Period>),
    /// RECUR value, kept verbatim for the recurrence engine.
    Recur(String),
    Text(String),
    UtcOffset(UtcOffset),
    Unknown(String),
}

impl Value {
    /// Returns whether this value carries a DATE or DATE-TIME.
    #[must_use]
    pub const fn is_temporal(&self) -> bool {
        matches!(
            self,
            Self::Date(_) | Self::DateTime(_) | Self::DateList(_) | Self::DateTimeList(_)
        )
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ",")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

/// Renders the value in its unescaped textual form.
///
/// The serializer applies TEXT escaping on top of this.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Date(d) => write!(f, "{d}"),
            Self::DateTime(dt) => write!(f, "{dt}"),
            Self::DateList(list) => write_list(f, list),
            Self::DateTimeList(list) => write_list(f, list),
            Self::Duration(d) => write!(f, "{d}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Period(p) => write!(f, "{p}"),
            Self::PeriodList(list) => write_list(f, list),
            Self::UtcOffset(o) => write!(f, "{o}"),
            Self::Recur(s) | Self::Text(s) | Self::Unknown(s) => f.write_str(s),
        }
    }
}
