//! Value type parsers for iCalendar (RFC 5545 §3.3).
//!
//! Numeric sub-fields are fixed-width ASCII; inputs with non-ASCII bytes are
//! rejected up front so byte slicing stays on character boundaries.
#![expect(
    clippy::map_err_ignore,
    reason = "Integer parse errors carry no detail beyond the kind reported here"
)]

use super::error::{ParseError, ParseErrorKind, ParseResult};
use crate::rfc::ical::core::{Date, DateTime, DateTimeForm, Duration, Period, UtcOffset};

fn digits<T: std::str::FromStr>(
    s: &str,
    kind: ParseErrorKind,
    line: usize,
    col: usize,
) -> ParseResult<T> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::new(kind, line, col));
    }
    s.parse::<T>().map_err(|_| ParseError::new(kind, line, col))
}

/// Parses a DATE value (RFC 5545 §3.3.4).
///
/// Format: YYYYMMDD (e.g., "19970714")
///
/// ## Errors
/// Returns an error if the string is not a valid 8-digit date.
pub fn parse_date(s: &str, line: usize, col: usize) -> ParseResult<Date> {
    let kind = ParseErrorKind::InvalidDate;
    if s.len() != 8 || !s.is_ascii() {
        return Err(ParseError::new(kind, line, col));
    }

    let date = Date {
        year: digits(&s[0..4], kind, line, col)?,
        month: digits(&s[4..6], kind, line, col)?,
        day: digits(&s[6..8], kind, line, col)?,
    };

    if !(1..=12).contains(&date.month) || !(1..=31).contains(&date.day) {
        return Err(ParseError::new(kind, line, col));
    }
    Ok(date)
}

/// Parses a DATE-TIME value (RFC 5545 §3.3.5).
///
/// Format: YYYYMMDD"T"HHMMSS[Z] (e.g., "19970714T133000Z")
///
/// TZID comes from the property parameter, not the value itself.
///
/// ## Errors
/// Returns an error if the string is not a valid datetime format.
pub fn parse_datetime(
    s: &str,
    tzid: Option<&str>,
    line: usize,
    col: usize,
) -> ParseResult<DateTime> {
    let invalid = || ParseError::new(ParseErrorKind::InvalidDateTime, line, col);
    if !s.is_ascii() {
        return Err(invalid());
    }
    let (date_str, time_str) = s.split_once('T').ok_or_else(invalid)?;
    let date = parse_date(date_str, line, col)?;

    let (time_str, is_utc) = match time_str.strip_suffix('Z') {
        Some(stripped) => (stripped, true),
        None => (time_str, false),
    };
    let kind = ParseErrorKind::InvalidTime;
    let time_col = col + date_str.len() + 1;
    if time_str.len() != 6 {
        return Err(ParseError::new(kind, line, time_col));
    }
    let hour: u8 = digits(&time_str[0..2], kind, line, time_col)?;
    let minute: u8 = digits(&time_str[2..4], kind, line, time_col)?;
    let second: u8 = digits(&time_str[4..6], kind, line, time_col)?;
    if hour > 23 || minute > 59 || second > 60 {
        return Err(ParseError::new(kind, line, time_col));
    }

    let form = if is_utc {
        DateTimeForm::Utc
    } else if let Some(tz) = tzid {
        DateTimeForm::Zoned {
            tzid: tz.to_string(),
        }
    } else {
        DateTimeForm::Floating
    };

    Ok(DateTime {
        year: date.year,
        month: date.month,
        day: date.day,
        hour,
        minute,
        second,
        form,
    })
}

/// Parses a UTC-OFFSET value (RFC 5545 §3.3.14).
///
/// Format: (+|-)HHMM[SS] (e.g., "+0530", "-0800")
///
/// ## Errors
/// Returns an error if the string is not a valid UTC offset format.
pub fn parse_utc_offset(s: &str, line: usize, col: usize) -> ParseResult<UtcOffset> {
    let kind = ParseErrorKind::InvalidUtcOffset;
    if !s.is_ascii() || !(s.len() == 5 || s.len() == 7) {
        return Err(ParseError::new(kind, line, col));
    }

    let sign = match &s[..1] {
        "+" => 1,
        "-" => -1,
        _ => return Err(ParseError::new(kind, line, col)),
    };
    let hours: i32 = digits(&s[1..3], kind, line, col)?;
    let minutes: i32 = digits(&s[3..5], kind, line, col)?;
    let seconds: i32 = if s.len() == 7 {
        digits(&s[5..7], kind, line, col)?
    } else {
        0
    };
    if minutes > 59 || seconds > 59 {
        return Err(ParseError::new(kind, line, col));
    }

    Ok(UtcOffset::from_seconds(
        sign * (hours * 3600 + minutes * 60 + seconds),
    ))
}

/// Parses a DURATION value (RFC 5545 §3.3.6).
///
/// Format: `[+|-]P[nW]` or `[+|-]P[nD][T[nH][nM][nS]]`
///
/// ## Errors
/// Returns an error if the string is not a valid duration format.
pub fn parse_duration(s: &str, line: usize, col: usize) -> ParseResult<Duration> {
    let invalid = || ParseError::new(ParseErrorKind::InvalidDuration, line, col);

    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let body = rest.strip_prefix('P').ok_or_else(invalid)?;
    if body.is_empty() {
        return Err(invalid());
    }

    let mut dur = Duration {
        negative,
        ..Duration::zero()
    };

    if let Some(weeks) = body.strip_suffix('W') {
        dur.weeks = digits(weeks, ParseErrorKind::InvalidDuration, line, col)?;
        return Ok(dur);
    }

    let (date_part, time_part) = match body.split_once('T') {
        Some((d, t)) if !t.is_empty() => (d, Some(t)),
        Some(_) => return Err(invalid()),
        None => (body, None),
    };

    if !date_part.is_empty() {
        let days = date_part.strip_suffix('D').ok_or_else(invalid)?;
        dur.days = digits(days, ParseErrorKind::InvalidDuration, line, col)?;
    }

    if let Some(time) = time_part {
        let mut number = String::new();
        let mut last_designator = 0;
        for c in time.chars() {
            if c.is_ascii_digit() {
                number.push(c);
                continue;
            }
            let rank = match c {
                'H' => 1,
                'M' => 2,
                'S' => 3,
                _ => return Err(invalid()),
            };
            // Designators must appear in H, M, S order, each at most once.
            if rank <= last_designator || number.is_empty() {
                return Err(invalid());
            }
            let value: u32 = digits(&number, ParseErrorKind::InvalidDuration, line, col)?;
            match c {
                'H' => dur.hours = value,
                'M' => dur.minutes = value,
                _ => dur.seconds = value,
            }
            last_designator = rank;
            number.clear();
        }
        if !number.is_empty() || last_designator == 0 {
            return Err(invalid());
        }
    }

    Ok(dur)
}

/// Parses a PERIOD value (RFC 5545 §3.3.9).
///
/// Format: start"/"end or start"/"duration
///
/// ## Errors
/// Returns an error if the string is not a valid period format.
pub fn parse_period(s: &str, tzid: Option<&str>, line: usize, col: usize) -> ParseResult<Period> {
    let (start_str, end_str) = s
        .split_once('/')
        .ok_or_else(|| ParseError::new(ParseErrorKind::InvalidPeriod, line, col))?;

    let start = parse_datetime(start_str, tzid, line, col)?;
    let end_col = col + start_str.len() + 1;

    if end_str.starts_with(['P', '+', '-']) {
        let duration = parse_duration(end_str, line, end_col)?;
        Ok(Period::Duration { start, duration })
    } else {
        let end = parse_datetime(end_str, tzid, line, end_col)?;
        Ok(Period::Explicit { start, end })
    }
}

/// Parses an INTEGER value (RFC 5545 §3.3.8).
///
/// ## Errors
/// Returns an error if the string is not an optionally signed integer.
pub fn parse_integer(s: &str, line: usize, col: usize) -> ParseResult<i64> {
    s.trim()
        .parse::<i64>()
        .map_err(|_| ParseError::new(ParseErrorKind::InvalidInteger, line, col))
}

/// Unescapes a TEXT value (RFC 5545 §3.3.11).
///
/// `\\`, `\;`, `\,` and `\n`/`\N` are decoded; any other backslash is kept.
#[must_use]
pub fn unescape_text(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.peek() {
            Some('n' | 'N') => {
                result.push('\n');
                chars.next();
            }
            Some(&escaped @ ('\\' | ';' | ',')) => {
                result.push(escaped);
                chars.next();
            }
            _ => result.push('\\'),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dates_and_datetimes() {
        assert_eq!(parse_date("20240229", 1, 1).unwrap(), Date::new(2024, 2, 29));
        assert!(parse_date("2024022", 1, 1).is_err());
        assert!(parse_date("20241301", 1, 1).is_err());
        assert!(parse_date("2024é229", 1, 1).is_err());

        let dt = parse_datetime("20240101T120000Z", None, 1, 1).unwrap();
        assert!(dt.is_utc());
        let dt = parse_datetime("20240101T120000", Some("Europe/Paris"), 1, 1).unwrap();
        assert_eq!(dt.tzid(), Some("Europe/Paris"));
        let dt = parse_datetime("20240101T120000", None, 1, 1).unwrap();
        assert!(dt.is_floating());

        assert!(parse_datetime("20240101T250000Z", None, 1, 1).is_err());
        assert!(parse_datetime("20240101", None, 1, 1).is_err());
    }

    #[test]
    fn durations() {
        assert_eq!(parse_duration("P1W", 1, 1).unwrap().as_seconds(), 7 * 86_400);
        assert_eq!(parse_duration("PT15M", 1, 1).unwrap().as_seconds(), 900);
        assert_eq!(
            parse_duration("-P1DT2H3M4S", 1, 1).unwrap().as_seconds(),
            -(86_400 + 2 * 3600 + 3 * 60 + 4)
        );
        assert_eq!(parse_duration("+PT0S", 1, 1).unwrap().as_seconds(), 0);
        assert!(parse_duration("P", 1, 1).is_err());
        assert!(parse_duration("PT", 1, 1).is_err());
        assert!(parse_duration("P1H", 1, 1).is_err());
        assert!(parse_duration("PT1M1H", 1, 1).is_err());
        assert!(parse_duration("1D", 1, 1).is_err());
    }

    #[test]
    fn periods() {
        let explicit = parse_period("20240101T100000Z/20240101T110000Z", None, 1, 1).unwrap();
        assert!(matches!(explicit, Period::Explicit { .. }));
        let relative = parse_period("20240101T100000Z/PT1H", None, 1, 1).unwrap();
        assert!(matches!(relative, Period::Duration { .. }));
        assert!(parse_period("20240101T100000Z", None, 1, 1).is_err());
    }

    #[test]
    fn offsets() {
        assert_eq!(parse_utc_offset("+0530", 1, 1).unwrap().as_seconds(), 19_800);
        assert_eq!(parse_utc_offset("-0800", 1, 1).unwrap().as_seconds(), -28_800);
        assert_eq!(parse_utc_offset("+013015", 1, 1).unwrap().as_seconds(), 5415);
        assert!(parse_utc_offset("0530", 1, 1).is_err());
        assert!(parse_utc_offset("+05", 1, 1).is_err());
    }

    #[test]
    fn text_unescaping() {
        assert_eq!(unescape_text(r"a\, b\; c\\d\ne\Nf"), "a, b; c\\d\ne\nf");
        assert_eq!(unescape_text(r"keep\x"), r"keep\x");
    }
}
