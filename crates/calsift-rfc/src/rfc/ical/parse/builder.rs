//! Incremental component tree builder.
//!
//! Consumes logical lines one at a time and hands back each VCALENDAR as soon
//! as its END line is seen.

use calsift_core::constants::DEFAULT_MAX_COMPONENT_DEPTH;

use super::error::{ParseError, ParseErrorKind, ParseResult};
use super::lexer::parse_content_line;
use super::stream::LogicalLine;
use super::values::{
    parse_date, parse_datetime, parse_duration, parse_integer, parse_period, parse_utc_offset,
    unescape_text,
};
use crate::rfc::ical::core::{ComponentId, ComponentKind, ContentLine, ICalendar, Property, Value};

/// Builds component trees from logical lines.
#[derive(Debug)]
pub struct ComponentBuilder {
    current: Option<ICalendar>,
    /// Open components, innermost last, with the name from their BEGIN line.
    stack: Vec<(ComponentId, String)>,
    max_depth: usize,
}

impl Default for ComponentBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_COMPONENT_DEPTH)
    }
}

impl ComponentBuilder {
    #[must_use]
    pub fn new(max_depth: usize) -> Self {
        Self {
            current: None,
            stack: Vec::new(),
            max_depth,
        }
    }

    /// Returns whether a component is currently open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.stack.is_empty()
    }

    /// Feeds one logical line. Returns a calendar when its root closes.
    ///
    /// ## Errors
    /// Returns an error for malformed content lines or values and for
    /// BEGIN/END nesting violations.
    pub fn feed(&mut self, line: &LogicalLine) -> ParseResult<Option<ICalendar>> {
        let cl = parse_content_line(&line.text, line.number)
            .map_err(|e| e.or_context(&line.text))?;

        match cl.name.as_str() {
            "BEGIN" => {
                self.begin(&cl, line)?;
                Ok(None)
            }
            "END" => self.end(&cl, line),
            _ => {
                let Some(&(id, _)) = self.stack.last() else {
                    return Err(ParseError::new(ParseErrorKind::MissingBegin, line.number, 1)
                        .with_context(&line.text));
                };
                let column = line.text.len() - cl.raw_value.len() + 1;
                let property = build_property(cl, line.number, column)
                    .map_err(|e| e.or_context(&line.text))?;
                if let Some(cal) = self.current.as_mut() {
                    cal.get_mut(id).add_property(property);
                }
                Ok(None)
            }
        }
    }

    /// Checks that no component is left open at end of stream.
    ///
    /// ## Errors
    /// Returns `MissingEnd` naming the innermost open component.
    pub fn finish(&self, last_line: usize) -> ParseResult<()> {
        match self.stack.last() {
            Some((_, name)) => Err(ParseError::new(ParseErrorKind::MissingEnd, last_line, 1)
                .with_context(format!("missing END:{name}"))),
            None => Ok(()),
        }
    }

    fn begin(&mut self, cl: &ContentLine, line: &LogicalLine) -> ParseResult<()> {
        let name = cl.raw_value.trim().to_ascii_uppercase();
        if name.is_empty() {
            return Err(
                ParseError::new(ParseErrorKind::InvalidContentLine, line.number, 7)
                    .with_context(&line.text),
            );
        }

        if self.stack.len() >= self.max_depth {
            return Err(
                ParseError::new(ParseErrorKind::NestingTooDeep, line.number, 7).with_context(
                    format!("BEGIN:{name} exceeds depth {}", self.max_depth),
                ),
            );
        }

        let kind = ComponentKind::parse(&name);
        let id = match (self.stack.last(), self.current.as_mut()) {
            (Some(&(parent, _)), Some(cal)) => cal.add_child(parent, kind),
            _ => {
                if kind != ComponentKind::Calendar {
                    return Err(ParseError::new(ParseErrorKind::InvalidRoot, line.number, 7)
                        .with_context(&line.text));
                }
                let cal = ICalendar::with_root(kind);
                let root = cal.root();
                self.current = Some(cal);
                root
            }
        };
        self.stack.push((id, name));
        Ok(())
    }

    fn end(&mut self, cl: &ContentLine, line: &LogicalLine) -> ParseResult<Option<ICalendar>> {
        let name = cl.raw_value.trim().to_ascii_uppercase();
        let Some((_, open)) = self.stack.pop() else {
            return Err(ParseError::new(ParseErrorKind::MissingBegin, line.number, 1)
                .with_context(&line.text));
        };
        if open != name {
            return Err(
                ParseError::new(ParseErrorKind::MismatchedComponent, line.number, 5)
                    .with_context(format!("expected END:{open}, got END:{name}")),
            );
        }

        if self.stack.is_empty() {
            let cal = self.current.take();
            if let Some(cal) = &cal {
                tracing::debug!(
                    line = line.number,
                    components = cal.len(),
                    "Completed VCALENDAR"
                );
            }
            return Ok(cal);
        }
        Ok(None)
    }
}

/// Value type resolved for a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueType {
    Date,
    DateTime,
    Duration,
    Integer,
    Period,
    Recur,
    Text,
    UtcOffset,
    /// Types kept as raw text: BINARY, BOOLEAN, CAL-ADDRESS, FLOAT, TIME, URI
    /// and anything unregistered.
    Raw,
}

impl ValueType {
    fn from_param(s: &str) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "DATE" => Self::Date,
            "DATE-TIME" => Self::DateTime,
            "DURATION" => Self::Duration,
            "INTEGER" => Self::Integer,
            "PERIOD" => Self::Period,
            "RECUR" => Self::Recur,
            "TEXT" => Self::Text,
            "UTC-OFFSET" => Self::UtcOffset,
            _ => Self::Raw,
        }
    }
}

fn looks_like_date(raw: &str) -> bool {
    raw.len() == 8 && !raw.contains('T')
}

/// Determines the value type from the VALUE parameter or the property name.
fn determine_value_type(cl: &ContentLine) -> ValueType {
    if let Some(value_type) = cl.value_type() {
        return ValueType::from_param(value_type);
    }

    let raw = cl.raw_value.as_str();
    match cl.name.as_str() {
        "DTSTART" | "DTEND" | "DTSTAMP" | "CREATED" | "LAST-MODIFIED" | "COMPLETED" | "DUE"
        | "RECURRENCE-ID" => {
            if looks_like_date(raw) {
                ValueType::Date
            } else {
                ValueType::DateTime
            }
        }

        "EXDATE" | "RDATE" => {
            let first = raw.split(',').next().unwrap_or_default();
            if looks_like_date(first) {
                ValueType::Date
            } else if raw.contains('/') {
                ValueType::Period
            } else {
                ValueType::DateTime
            }
        }

        "DURATION" | "TRIGGER" => {
            if raw.starts_with(['P', '+', '-']) {
                ValueType::Duration
            } else {
                ValueType::DateTime
            }
        }

        "PERCENT-COMPLETE" | "PRIORITY" | "REPEAT" | "SEQUENCE" => ValueType::Integer,
        "RRULE" | "EXRULE" => ValueType::Recur,
        "TZOFFSETFROM" | "TZOFFSETTO" => ValueType::UtcOffset,
        "FREEBUSY" => ValueType::Period,
        "ATTENDEE" | "ORGANIZER" | "URL" | "TZURL" | "SOURCE" | "ATTACH" => ValueType::Raw,
        _ => ValueType::Text,
    }
}

fn is_list_property(name: &str) -> bool {
    matches!(name, "EXDATE" | "RDATE" | "FREEBUSY")
}

/// Parses a property from a content line, resolving the value type.
fn build_property(cl: ContentLine, line: usize, col: usize) -> ParseResult<Property> {
    let value_type = determine_value_type(&cl);
    let list = is_list_property(&cl.name);
    let value = parse_value(&cl.raw_value, value_type, cl.tzid(), list, line, col)?;

    Ok(Property {
        name: cl.name,
        params: cl.params,
        value,
    })
}

fn parse_list<T>(
    raw: &str,
    mut item: impl FnMut(&str) -> ParseResult<T>,
) -> ParseResult<Vec<T>> {
    raw.split(',').map(|s| item(s.trim())).collect()
}

fn parse_value(
    raw: &str,
    value_type: ValueType,
    tzid: Option<&str>,
    list: bool,
    line: usize,
    col: usize,
) -> ParseResult<Value> {
    let value = match (value_type, list) {
        (ValueType::Text, _) => Value::Text(unescape_text(raw)),
        (ValueType::Date, false) => Value::Date(parse_date(raw, line, col)?),
        (ValueType::Date, true) => Value::DateList(parse_list(raw, |s| parse_date(s, line, col))?),
        (ValueType::DateTime, false) => Value::DateTime(parse_datetime(raw, tzid, line, col)?),
        (ValueType::DateTime, true) => {
            Value::DateTimeList(parse_list(raw, |s| parse_datetime(s, tzid, line, col))?)
        }
        (ValueType::Period, false) => Value::Period(parse_period(raw, tzid, line, col)?),
        (ValueType::Period, true) => {
            Value::PeriodList(parse_list(raw, |s| parse_period(s, tzid, line, col))?)
        }
        (ValueType::Duration, _) => Value::Duration(parse_duration(raw, line, col)?),
        (ValueType::Integer, _) => Value::Integer(parse_integer(raw, line, col)?),
        (ValueType::Recur, _) => Value::Recur(raw.to_string()),
        (ValueType::UtcOffset, _) => Value::UtcOffset(parse_utc_offset(raw, line, col)?),
        (ValueType::Raw, _) => Value::Unknown(raw.to_string()),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rfc::ical::core::{Date, Period};
    use crate::rfc::ical::parse::ParseErrorClass;

    fn feed_all(builder: &mut ComponentBuilder, text: &str) -> ParseResult<Vec<ICalendar>> {
        let mut out = Vec::new();
        for (i, line) in text.lines().enumerate() {
            let line = LogicalLine {
                number: i + 1,
                text: line.to_string(),
            };
            if let Some(cal) = builder.feed(&line)? {
                out.push(cal);
            }
        }
        Ok(out)
    }

    #[test]
    fn emits_each_root_as_it_closes() {
        let mut builder = ComponentBuilder::default();
        let text = "BEGIN:VCALENDAR\nBEGIN:VEVENT\nUID:a\nEND:VEVENT\nEND:VCALENDAR\n\
                    BEGIN:VCALENDAR\nBEGIN:X-THING\nEND:X-THING\nEND:VCALENDAR";
        let cals = feed_all(&mut builder, text).unwrap();
        assert_eq!(cals.len(), 2);
        assert!(!builder.is_open());
        let second = &cals[1];
        let child = second.root_component().children()[0];
        assert!(second.get(child).kind.is_named("x-thing"));
    }

    #[test]
    fn nesting_violations() {
        let err = feed_all(&mut ComponentBuilder::default(), "BEGIN:VEVENT").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::InvalidRoot);

        let err = feed_all(
            &mut ComponentBuilder::default(),
            "BEGIN:VCALENDAR\nBEGIN:VEVENT\nEND:VTODO",
        )
        .unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::MismatchedComponent);
        assert_eq!(err.line, 3);

        let err = feed_all(&mut ComponentBuilder::default(), "SUMMARY:x").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::MissingBegin);

        let mut builder = ComponentBuilder::default();
        feed_all(&mut builder, "BEGIN:VCALENDAR\nBEGIN:VTODO").unwrap();
        assert_eq!(builder.finish(2).unwrap_err().kind, ParseErrorKind::MissingEnd);
    }

    #[test]
    fn nesting_beyond_bound_is_rejected() {
        let mut builder = ComponentBuilder::new(3);
        let ok = "BEGIN:VCALENDAR\nBEGIN:VEVENT\nBEGIN:VALARM\nEND:VALARM\nEND:VEVENT\nEND:VCALENDAR";
        assert_eq!(feed_all(&mut builder, ok).unwrap().len(), 1);

        let err = feed_all(
            &mut ComponentBuilder::new(3),
            "BEGIN:VCALENDAR\nBEGIN:VEVENT\nBEGIN:VALARM\nBEGIN:X-DEEP",
        )
        .unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::NestingTooDeep);
        assert_eq!(err.line, 4);
        assert_eq!(err.class(), ParseErrorClass::MalformedCalendarData);
    }

    #[test]
    fn value_typing_follows_name_and_value_param() {
        let mut builder = ComponentBuilder::default();
        let text = "BEGIN:VCALENDAR\nBEGIN:VEVENT\n\
                    DTSTART;VALUE=DATE:20240105\n\
                    DTEND:20240106\n\
                    EXDATE:20240110T100000Z,20240111T100000Z\n\
                    RDATE;VALUE=PERIOD:20240201T100000Z/PT1H\n\
                    SEQUENCE:3\n\
                    SUMMARY:a\\, b\n\
                    X-NUM;VALUE=INTEGER:42\n\
                    ATTENDEE:mailto:a@example.com\n\
                    END:VEVENT\nEND:VCALENDAR";
        let cals = feed_all(&mut builder, text).unwrap();
        let cal = &cals[0];
        let event = cal.get(cal.root_component().children()[0]);

        assert_eq!(event.get_property("DTSTART").unwrap().as_date(), Some(&Date::new(2024, 1, 5)));
        assert!(event.get_property("DTEND").unwrap().as_date().is_some());
        assert!(matches!(
            &event.get_property("EXDATE").unwrap().value,
            Value::DateTimeList(list) if list.len() == 2
        ));
        assert!(matches!(
            event.get_property("RDATE").unwrap().as_periods(),
            [Period::Duration { .. }]
        ));
        assert_eq!(event.get_property("SEQUENCE").unwrap().as_integer(), Some(3));
        assert_eq!(event.text_of("SUMMARY"), Some("a, b"));
        assert_eq!(event.get_property("X-NUM").unwrap().as_integer(), Some(42));
        assert_eq!(
            event.get_property("ATTENDEE").unwrap().value,
            Value::Unknown("mailto:a@example.com".into())
        );
    }

    #[test]
    fn malformed_value_carries_offending_line() {
        let err = feed_all(
            &mut ComponentBuilder::default(),
            "BEGIN:VCALENDAR\nBEGIN:VEVENT\nDTSTART:2024XX01T000000Z",
        )
        .unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::InvalidDate);
        assert_eq!(err.line, 3);
        assert_eq!(err.context.as_deref(), Some("DTSTART:2024XX01T000000Z"));
        assert_eq!(err.column, 9);
    }
}
