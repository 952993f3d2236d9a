//! VTIMEZONE observance rules (RFC 5545 §3.6.5).
//!
//! Converts wall-clock times in a calendar-defined zone to UTC using its
//! STANDARD and DAYLIGHT observances. Annual transition rules of the
//! `FREQ=YEARLY;BYMONTH=m;BYDAY=nDD` shape are evaluated directly; other
//! rules only contribute their DTSTART and RDATEs.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Weekday};

use crate::rfc::ical::core::{ComponentId, ComponentKind, ICalendar, UtcOffset, Value};

/// Error while reading a VTIMEZONE component.
#[derive(Debug, thiserror::Error)]
pub enum VTimezoneError {
    #[error("Component is not a VTIMEZONE")]
    NotATimezone,

    #[error("Missing required TZID property")]
    MissingTzid,

    #[error("VTIMEZONE must have at least one STANDARD or DAYLIGHT component")]
    NoObservances,

    #[error("Missing required property {0} in {1} component")]
    MissingProperty(&'static str, &'static str),

    #[error("Invalid {0} value: {1}")]
    InvalidValue(&'static str, String),
}

/// Kind of timezone observance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObservanceKind {
    Standard,
    Daylight,
}

impl ObservanceKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "STANDARD",
            Self::Daylight => "DAYLIGHT",
        }
    }
}

/// Annual transition of the form "nth weekday of month".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AnnualRule {
    month: u32,
    /// 1-based from the start of the month, negative from the end.
    ordinal: i32,
    weekday: Weekday,
    /// Last year the rule applies, from UNTIL.
    until_year: Option<i32>,
}

/// One STANDARD or DAYLIGHT sub-component.
#[derive(Debug, Clone, PartialEq)]
pub struct Observance {
    pub kind: ObservanceKind,
    pub offset_from: UtcOffset,
    pub offset_to: UtcOffset,
    /// Local onset of the observance.
    pub dtstart: NaiveDateTime,
    pub rdates: Vec<NaiveDateTime>,
    rule: Option<AnnualRule>,
}

impl Observance {
    /// Latest onset of this observance at or before `local`.
    fn last_onset(&self, local: NaiveDateTime) -> Option<NaiveDateTime> {
        if local < self.dtstart {
            return None;
        }

        let mut best = self.dtstart;
        for rdate in &self.rdates {
            if *rdate <= local && *rdate > best {
                best = *rdate;
            }
        }

        if let Some(rule) = self.rule {
            let last_year = rule
                .until_year
                .map_or(local.year(), |until| until.min(local.year()));
            // Only the two most recent years can hold the latest onset.
            let first_year = self.dtstart.year().max(last_year - 1);
            for year in first_year..=last_year {
                let onset = nth_weekday_of_month(
                    year,
                    rule.month,
                    rule.weekday,
                    rule.ordinal,
                    self.dtstart.time(),
                );
                if let Some(onset) = onset
                    && onset <= local
                    && onset > best
                {
                    best = onset;
                }
            }
        }

        Some(best)
    }
}

/// A VTIMEZONE reduced to its observances.
#[derive(Debug, Clone, PartialEq)]
pub struct VTimezone {
    pub tzid: String,
    pub observances: Vec<Observance>,
}

impl VTimezone {
    /// Reads the VTIMEZONE component `id` of `cal`.
    ///
    /// ## Errors
    /// Returns an error if `id` is not a VTIMEZONE or lacks required
    /// properties.
    pub fn parse(cal: &ICalendar, id: ComponentId) -> Result<Self, VTimezoneError> {
        let component = cal.get(id);
        if component.kind != ComponentKind::Timezone {
            return Err(VTimezoneError::NotATimezone);
        }

        let tzid = component
            .text_of("TZID")
            .ok_or(VTimezoneError::MissingTzid)?
            .to_string();

        let mut observances = Vec::new();
        for child in component.children() {
            let kind = match cal.get(*child).kind {
                ComponentKind::Standard => ObservanceKind::Standard,
                ComponentKind::Daylight => ObservanceKind::Daylight,
                _ => continue,
            };
            observances.push(parse_observance(cal, *child, kind)?);
        }

        if observances.is_empty() {
            return Err(VTimezoneError::NoObservances);
        }

        Ok(Self { tzid, observances })
    }

    /// Returns the UTC offset in effect at a local time.
    ///
    /// Before the first onset the earliest observance's TZOFFSETFROM applies.
    #[must_use]
    pub fn offset_at(&self, local: NaiveDateTime) -> UtcOffset {
        self.observances
            .iter()
            .filter_map(|obs| obs.last_onset(local).map(|onset| (onset, obs)))
            .max_by_key(|(onset, _)| *onset)
            .map_or_else(
                || {
                    self.observances
                        .iter()
                        .min_by_key(|obs| obs.dtstart)
                        .map_or(UtcOffset::UTC, |obs| obs.offset_from)
                },
                |(_, obs)| obs.offset_to,
            )
    }

    /// Converts a local time in this zone to naive UTC.
    #[must_use]
    pub fn to_utc(&self, local: NaiveDateTime) -> NaiveDateTime {
        local - TimeDelta::seconds(i64::from(self.offset_at(local).as_seconds()))
    }
}

fn parse_observance(
    cal: &ICalendar,
    id: ComponentId,
    kind: ObservanceKind,
) -> Result<Observance, VTimezoneError> {
    let component = cal.get(id);
    let kind_str = kind.as_str();

    let dtstart = component
        .get_property("DTSTART")
        .ok_or(VTimezoneError::MissingProperty("DTSTART", kind_str))?;
    let dtstart = dtstart
        .as_datetime()
        .and_then(crate::rfc::ical::core::DateTime::naive)
        .ok_or_else(|| VTimezoneError::InvalidValue("DTSTART", dtstart.value_text()))?;

    let offset = |name: &'static str| match component.get_property(name).map(|p| &p.value) {
        Some(Value::UtcOffset(offset)) => Ok(*offset),
        Some(other) => Err(VTimezoneError::InvalidValue(name, other.to_string())),
        None => Err(VTimezoneError::MissingProperty(name, kind_str)),
    };
    let offset_to = offset("TZOFFSETTO")?;
    let offset_from = offset("TZOFFSETFROM")?;

    let rule = match component.get_property("RRULE").map(|p| &p.value) {
        Some(Value::Recur(rule)) => parse_annual_rule(rule),
        _ => None,
    };

    let rdates = component
        .get_properties("RDATE")
        .flat_map(|p| match &p.value {
            Value::DateTime(dt) => vec![dt.clone()],
            Value::DateTimeList(list) => list.clone(),
            _ => Vec::new(),
        })
        .filter_map(|dt| dt.naive())
        .collect();

    Ok(Observance {
        kind,
        offset_from,
        offset_to,
        dtstart,
        rdates,
        rule,
    })
}

/// Parses `FREQ=YEARLY;BYMONTH=m;BYDAY=nDD[;UNTIL=...]`.
fn parse_annual_rule(rule: &str) -> Option<AnnualRule> {
    let mut freq = None;
    let mut month = None;
    let mut byday = None;
    let mut until_year = None;
    for part in rule.split(';') {
        let (key, value) = part.split_once('=')?;
        match key.to_ascii_uppercase().as_str() {
            "FREQ" => freq = Some(value.to_ascii_uppercase()),
            "BYMONTH" => month = value.parse::<u32>().ok(),
            "BYDAY" => byday = parse_byday(value),
            "UNTIL" => until_year = value.get(0..4).and_then(|y| y.parse().ok()),
            _ => {}
        }
    }

    if freq.as_deref() != Some("YEARLY") {
        return None;
    }
    let (ordinal, weekday) = byday?;
    Some(AnnualRule {
        month: month?,
        ordinal,
        weekday,
        until_year,
    })
}

/// Parses a BYDAY value like "1SU", "-1SU" or "2MO".
fn parse_byday(s: &str) -> Option<(i32, Weekday)> {
    let s = s.trim();
    if s.len() < 3 || !s.is_ascii() {
        return None;
    }
    let (ordinal, day) = s.split_at(s.len() - 2);
    let ordinal: i32 = ordinal.trim_start_matches('+').parse().ok()?;

    let weekday = match day.to_ascii_uppercase().as_str() {
        "SU" => Weekday::Sun,
        "MO" => Weekday::Mon,
        "TU" => Weekday::Tue,
        "WE" => Weekday::Wed,
        "TH" => Weekday::Thu,
        "FR" => Weekday::Fri,
        "SA" => Weekday::Sat,
        _ => return None,
    };
    Some((ordinal, weekday))
}

/// Calculates the nth occurrence of a weekday in a month.
///
/// Positive ordinals count from the first of the month, negative from the
/// last day.
fn nth_weekday_of_month(
    year: i32,
    month: u32,
    weekday: Weekday,
    ordinal: i32,
    time: NaiveTime,
) -> Option<NaiveDateTime> {
    let ordinal = u8::try_from(ordinal.unsigned_abs())
        .ok()
        .filter(|n| *n > 0)
        .map(|n| (n, ordinal > 0))?;

    let date = match ordinal {
        (n, true) => NaiveDate::from_weekday_of_month_opt(year, month, weekday, n)?,
        (n, false) => {
            let (next_year, next_month) = if month == 12 {
                (year + 1, 1)
            } else {
                (year, month + 1)
            };
            let last = NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()?;
            let back = (7 + last.weekday().num_days_from_monday()
                - weekday.num_days_from_monday())
                % 7;
            let date = last - TimeDelta::days(i64::from(back) + 7 * (i64::from(n) - 1));
            if date.month() != month {
                return None;
            }
            date
        }
    };
    Some(NaiveDateTime::new(date, time))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rfc::ical::parse::parse_str;

    const EASTERN: &str = "\
BEGIN:VCALENDAR\r\n\
BEGIN:VTIMEZONE\r\n\
TZID:Custom/Eastern\r\n\
BEGIN:STANDARD\r\n\
DTSTART:19701101T020000\r\n\
RRULE:FREQ=YEARLY;BYMONTH=11;BYDAY=1SU\r\n\
TZOFFSETFROM:-0400\r\n\
TZOFFSETTO:-0500\r\n\
END:STANDARD\r\n\
BEGIN:DAYLIGHT\r\n\
DTSTART:19700308T020000\r\n\
RRULE:FREQ=YEARLY;BYMONTH=3;BYDAY=2SU\r\n\
TZOFFSETFROM:-0500\r\n\
TZOFFSETTO:-0400\r\n\
END:DAYLIGHT\r\n\
END:VTIMEZONE\r\n\
END:VCALENDAR\r\n";

    fn local(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn eastern() -> VTimezone {
        let cal = parse_str(EASTERN).unwrap();
        let tz = cal.root_component().children()[0];
        VTimezone::parse(&cal, tz).unwrap()
    }

    #[test]
    fn parse_byday_forms() {
        assert_eq!(parse_byday("1SU"), Some((1, Weekday::Sun)));
        assert_eq!(parse_byday("-1SU"), Some((-1, Weekday::Sun)));
        assert_eq!(parse_byday("+2MO"), Some((2, Weekday::Mon)));
        assert_eq!(parse_byday("SU"), None);
    }

    #[test]
    fn nth_weekday_from_both_ends() {
        let two = NaiveTime::from_hms_opt(2, 0, 0).unwrap();
        assert_eq!(
            nth_weekday_of_month(2026, 3, Weekday::Sun, 2, two),
            Some(local(2026, 3, 8, 2, 0))
        );
        assert_eq!(
            nth_weekday_of_month(2026, 10, Weekday::Sun, -1, two),
            Some(local(2026, 10, 25, 2, 0))
        );
        assert_eq!(nth_weekday_of_month(2026, 2, Weekday::Sun, 5, two), None);
    }

    #[test]
    fn offsets_follow_dst_rules() {
        let tz = eastern();
        assert_eq!(tz.tzid, "Custom/Eastern");
        assert_eq!(tz.offset_at(local(2026, 1, 15, 12, 0)).as_seconds(), -5 * 3600);
        assert_eq!(tz.offset_at(local(2026, 7, 15, 12, 0)).as_seconds(), -4 * 3600);
        assert_eq!(
            tz.to_utc(local(2026, 7, 15, 10, 0)),
            local(2026, 7, 15, 14, 0)
        );
    }

    #[test]
    fn before_first_onset_uses_offset_from() {
        let tz = eastern();
        assert_eq!(tz.offset_at(local(1960, 6, 1, 0, 0)).as_seconds(), -5 * 3600);
    }

    #[test]
    fn rejects_incomplete_timezones() {
        let cal = parse_str("BEGIN:VCALENDAR\r\nBEGIN:VTIMEZONE\r\nTZID:X\r\nEND:VTIMEZONE\r\nEND:VCALENDAR\r\n")
            .unwrap();
        let tz = cal.root_component().children()[0];
        assert!(matches!(
            VTimezone::parse(&cal, tz),
            Err(VTimezoneError::NoObservances)
        ));
        assert!(matches!(
            VTimezone::parse(&cal, cal.root()),
            Err(VTimezoneError::NotATimezone)
        ));
    }
}
