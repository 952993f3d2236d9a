//! Streaming iCalendar parser (RFC 5545).
//!
//! [`CalendarReader`] pulls bytes from any [`Read`] source, unfolds them into
//! logical lines and yields every VCALENDAR as soon as it closes. Size and line
//! length bounds are enforced while reading, so an oversized resource is
//! rejected without being buffered.

mod builder;
mod error;
mod lexer;
mod stream;
mod values;

use std::io::Read;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

pub use builder::ComponentBuilder;
pub use error::{ParseError, ParseErrorClass, ParseErrorKind, ParseResult};
pub use lexer::parse_content_line;
pub use stream::{LineReader, LogicalLine, ParserLimits};
pub use values::{
    parse_date, parse_datetime, parse_duration, parse_period, parse_utc_offset, unescape_text,
};

use crate::rfc::ical::core::{ICalendar, merge_calendars};

/// Iterator over the calendars in one byte stream.
///
/// Stops after the first error.
pub struct CalendarReader<R> {
    lines: LineReader<R>,
    builder: ComponentBuilder,
    last_line: usize,
    done: bool,
}

impl<R: Read> CalendarReader<R> {
    #[must_use]
    pub fn new(reader: R, limits: ParserLimits) -> Self {
        Self {
            lines: LineReader::new(reader, limits),
            builder: ComponentBuilder::new(limits.max_depth),
            last_line: 0,
            done: false,
        }
    }

    /// Attaches a cancellation flag checked before every chunk read.
    #[must_use]
    pub fn with_abort(mut self, abort: Arc<AtomicBool>) -> Self {
        self.lines = self.lines.with_abort(abort);
        self
    }

    fn next_calendar(&mut self) -> ParseResult<Option<ICalendar>> {
        while let Some(line) = self.lines.next_line()? {
            self.last_line = line.number;
            if let Some(cal) = self.builder.feed(&line)? {
                return Ok(Some(cal));
            }
        }
        self.builder.finish(self.last_line)?;
        Ok(None)
    }
}

impl<R: Read> Iterator for CalendarReader<R> {
    type Item = ParseResult<ICalendar>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_calendar() {
            Ok(Some(cal)) => Some(Ok(cal)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Parses every VCALENDAR in a resource stream.
///
/// ## Errors
/// Returns the first parse error, or `MissingBegin` when the stream holds no
/// calendar at all.
#[tracing::instrument(skip(reader), fields(max_size = limits.max_resource_size))]
pub fn parse_resource<R: Read>(reader: R, limits: &ParserLimits) -> ParseResult<Vec<ICalendar>> {
    parse_resource_with_abort(reader, limits, None)
}

/// Same as [`parse_resource`], stopping early once `abort` is set.
///
/// ## Errors
/// As [`parse_resource`], plus `Aborted` after cancellation.
pub fn parse_resource_with_abort<R: Read>(
    reader: R,
    limits: &ParserLimits,
    abort: Option<Arc<AtomicBool>>,
) -> ParseResult<Vec<ICalendar>> {
    let mut calendars = CalendarReader::new(reader, *limits);
    if let Some(abort) = abort {
        calendars = calendars.with_abort(abort);
    }
    let calendars = calendars.collect::<ParseResult<Vec<_>>>()?;

    if calendars.is_empty() {
        tracing::warn!("No VCALENDAR in resource");
        return Err(ParseError::new(ParseErrorKind::MissingBegin, 1, 1)
            .with_context("expected BEGIN:VCALENDAR"));
    }
    tracing::debug!(count = calendars.len(), "Parsed resource");
    Ok(calendars)
}

/// Parses an in-memory iCalendar document.
///
/// Several concatenated VCALENDARs are merged into the first.
///
/// ## Errors
/// Returns an error if the input is not valid iCalendar.
#[tracing::instrument(skip(input), fields(input_len = input.len()))]
pub fn parse_str(input: &str) -> ParseResult<ICalendar> {
    let calendars = parse_resource(input.as_bytes(), &ParserLimits::unbounded())?;
    merge_calendars(&calendars)
        .ok_or_else(|| ParseError::new(ParseErrorKind::MissingBegin, 1, 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_CALENDARS: &str = "\
BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
BEGIN:VEVENT\r\n\
UID:one\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n\
BEGIN:VCALENDAR\r\n\
BEGIN:VTODO\r\n\
UID:two\r\n\
END:VTODO\r\n\
END:VCALENDAR\r\n";

    #[test]
    fn concatenated_calendars_are_yielded_in_order() {
        let cals = parse_resource(TWO_CALENDARS.as_bytes(), &ParserLimits::default()).unwrap();
        assert_eq!(cals.len(), 2);
        let first = &cals[0];
        assert_eq!(
            first.get(first.root_component().children()[0]).uid(),
            Some("one")
        );
    }

    #[test]
    fn first_calendar_is_available_before_stream_errors() {
        let input = format!("{TWO_CALENDARS}BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\n");
        let mut reader = CalendarReader::new(input.as_bytes(), ParserLimits::default());
        assert!(reader.next().unwrap().is_ok());
        assert!(reader.next().unwrap().is_ok());
        let err = reader.next().unwrap().unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::MissingEnd);
        assert_eq!(err.class(), ParseErrorClass::MalformedCalendarData);
        assert!(reader.next().is_none());
    }

    #[test]
    fn parse_str_merges_roots() {
        let cal = parse_str(TWO_CALENDARS).unwrap();
        assert_eq!(cal.root_component().children().len(), 2);
    }

    #[test]
    fn empty_input_is_malformed() {
        let err = parse_resource(&b"\r\n\r\n"[..], &ParserLimits::default()).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::MissingBegin);
    }

    #[test_log::test]
    fn oversized_resource_fails_before_end() {
        let mut body = String::from("BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\n");
        while body.len() < 64 * 1024 {
            body.push_str("DESCRIPTION:filler filler filler filler\r\n");
        }
        let limits = ParserLimits::new(4096, 8192);
        let err = parse_resource(body.as_bytes(), &limits).unwrap_err();
        assert_eq!(err.class(), ParseErrorClass::ResourceTooLarge);
    }
}
