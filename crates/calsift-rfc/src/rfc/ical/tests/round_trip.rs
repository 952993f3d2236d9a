//! Round-trip parsing and serialization tests for iCalendar.
//!
//! Parsing, serializing and parsing again must give the same tree: every
//! property keeps its name, parameters and typed value.

use crate::rfc::ical::build::serialize;
use crate::rfc::ical::core::{ComponentKind, ICalendar};
use crate::rfc::ical::parse::parse_str;

const RECURRING_MEETING: &str = "\
BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:-//Example Corp//Calendar 1.0//EN\r\n\
BEGIN:VTIMEZONE\r\n\
TZID:Europe/Berlin\r\n\
BEGIN:STANDARD\r\n\
DTSTART:19701025T030000\r\n\
RRULE:FREQ=YEARLY;BYMONTH=10;BYDAY=-1SU\r\n\
TZOFFSETFROM:+0200\r\n\
TZOFFSETTO:+0100\r\n\
END:STANDARD\r\n\
BEGIN:DAYLIGHT\r\n\
DTSTART:19700329T020000\r\n\
RRULE:FREQ=YEARLY;BYMONTH=3;BYDAY=-1SU\r\n\
TZOFFSETFROM:+0100\r\n\
TZOFFSETTO:+0200\r\n\
END:DAYLIGHT\r\n\
END:VTIMEZONE\r\n\
BEGIN:VEVENT\r\n\
UID:weekly-sync@example.com\r\n\
DTSTAMP:20240101T090000Z\r\n\
DTSTART;TZID=Europe/Berlin:20240108T100000\r\n\
DURATION:PT45M\r\n\
RRULE:FREQ=WEEKLY;BYDAY=MO;COUNT=10\r\n\
EXDATE;TZID=Europe/Berlin:20240115T100000,20240122T100000\r\n\
SUMMARY:Weekly sync\\, planning\\; retro\r\n\
DESCRIPTION:Agenda:\\n1. Status\\n2. Risks\r\n\
ATTENDEE;CN=\"Doe, Jane\";PARTSTAT=ACCEPTED:mailto:jane@example.com\r\n\
X-CUSTOM;X-FLAG=on:free text\r\n\
SEQUENCE:2\r\n\
BEGIN:VALARM\r\n\
ACTION:DISPLAY\r\n\
TRIGGER:-PT15M\r\n\
REPEAT:2\r\n\
DURATION:PT5M\r\n\
END:VALARM\r\n\
END:VEVENT\r\n\
BEGIN:VFREEBUSY\r\n\
UID:fb@example.com\r\n\
FREEBUSY;FBTYPE=BUSY-TENTATIVE:20240110T100000Z/PT1H,20240111T100000Z/20240111T120000Z\r\n\
END:VFREEBUSY\r\n\
BEGIN:X-VENDOR-WIDGET\r\n\
X-SETTING:1\r\n\
END:X-VENDOR-WIDGET\r\n\
END:VCALENDAR\r\n";

fn round_trip(input: &str) -> (ICalendar, ICalendar, String) {
    let first = parse_str(input).unwrap();
    let serialized = serialize(&first);
    let second = parse_str(&serialized).unwrap();
    (first, second, serialized)
}

#[test]
fn round_trip_preserves_tree() {
    let (first, second, serialized) = round_trip(RECURRING_MEETING);
    assert_eq!(first, second, "{serialized}");
    assert_eq!(first.len(), 8);
}

#[test]
fn round_trip_keeps_unknown_component_tokens() {
    let (_, second, _) = round_trip(RECURRING_MEETING);
    let widget = second
        .children_of_kind(second.root(), &ComponentKind::Other("X-VENDOR-WIDGET".into()))
        .next();
    assert!(widget.is_some());
}

#[test]
fn round_trip_of_folded_long_lines() {
    let long = "word ".repeat(60);
    let input = format!(
        "BEGIN:VCALENDAR\r\nBEGIN:VJOURNAL\r\nDESCRIPTION:{long}\r\nEND:VJOURNAL\r\nEND:VCALENDAR\r\n"
    );
    let (first, second, serialized) = round_trip(&input);
    assert_eq!(first, second);
    assert!(
        serialized
            .lines()
            .all(|line| line.trim_end_matches('\r').len() <= 75)
    );
}

#[test]
fn serialized_output_is_a_fixed_point() {
    let (_, second, serialized) = round_trip(RECURRING_MEETING);
    assert_eq!(serialize(&second), serialized);
}
