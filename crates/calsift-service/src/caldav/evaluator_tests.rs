use super::*;
use calsift_rfc::rfc::dav::core::{Precondition, TextMatch, TimeRange};
use calsift_rfc::rfc::ical::parse::parse_str;

use crate::error::FilterError;

const MEETING: &str = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
BEGIN:VEVENT\r\n\
UID:meeting-1\r\n\
DTSTAMP:20240101T080000Z\r\n\
DTSTART:20240110T100000Z\r\n\
DTEND:20240110T110000Z\r\n\
SUMMARY:Weekly meeting notes\r\n\
ATTENDEE;PARTSTAT=ACCEPTED;X-TEAM=platform:mailto:a@example.com\r\n\
BEGIN:VALARM\r\n\
ACTION:DISPLAY\r\n\
TRIGGER:-PT10M\r\n\
END:VALARM\r\n\
END:VEVENT\r\n\
BEGIN:X-WIDGET\r\n\
X-SIZE:3\r\n\
END:X-WIDGET\r\n\
END:VCALENDAR\r\n";

fn meeting() -> ICalendar {
    parse_str(MEETING).unwrap()
}

fn event_filter(inner: CompFilter) -> CalendarFilter {
    CalendarFilter::new(CompFilter::new("VCALENDAR").with_comp_filter(inner))
}

fn eval(filter: &CalendarFilter) -> bool {
    evaluate_filter(filter, &meeting(), &EvalOptions::default()).unwrap()
}

fn range(start: &str, end: &str) -> TimeRange {
    TimeRange::new(start.parse().unwrap(), end.parse().unwrap())
}

#[test]
fn bare_vcalendar_matches() {
    assert!(eval(&CalendarFilter::vcalendar()));
}

#[test]
fn component_kind_must_exist() {
    assert!(eval(&event_filter(CompFilter::new("VEVENT"))));
    assert!(!eval(&event_filter(CompFilter::new("VTODO"))));
    assert!(eval(&event_filter(CompFilter::new("VTODO").not_defined())));
    assert!(!eval(&event_filter(CompFilter::new("VEVENT").not_defined())));
}

#[test]
fn experimental_components_match_by_name() {
    let filter = event_filter(
        CompFilter::new("x-widget").with_prop_filter(PropFilter::new("X-SIZE")),
    );
    assert!(eval(&filter));
}

#[test]
fn is_not_defined_property() {
    let absent = event_filter(
        CompFilter::new("VEVENT").with_prop_filter(PropFilter::new("X-ABSENT").not_defined()),
    );
    assert!(eval(&absent));

    let present = event_filter(
        CompFilter::new("VEVENT").with_prop_filter(PropFilter::new("SUMMARY").not_defined()),
    );
    assert!(!eval(&present));
}

#[test]
fn summary_text_match_by_collation() {
    let with = |tm: TextMatch| {
        event_filter(
            CompFilter::new("VEVENT")
                .with_prop_filter(PropFilter::new("SUMMARY").with_text_match(tm)),
        )
    };
    assert!(eval(&with(TextMatch::new("MEETING"))));
    assert!(!eval(&with(TextMatch::new("MEETING").negated())));
    assert!(!eval(&with(TextMatch::new("MEETING").with_collation("i;octet"))));
    assert!(eval(&with(
        TextMatch::new("MEETING").with_collation("i;octet").negated()
    )));
}

#[test]
fn unknown_collation_is_an_error() {
    let filter = event_filter(CompFilter::new("VEVENT").with_prop_filter(
        PropFilter::new("SUMMARY").with_text_match(TextMatch::new("x").with_collation("i;nope")),
    ));
    let err = evaluate_filter(&filter, &meeting(), &EvalOptions::default()).unwrap_err();
    assert_eq!(err, FilterError::UnsupportedCollation("i;nope".into()));
}

#[test]
fn malformed_trees_are_invalid_filters() {
    let wrong_root = CalendarFilter::new(CompFilter::new("VEVENT"));
    let err = evaluate_filter(&wrong_root, &meeting(), &EvalOptions::default()).unwrap_err();
    assert_eq!(
        err,
        FilterError::InvalidFilter("root comp-filter must name VCALENDAR, got VEVENT".into())
    );
    assert_eq!(err.precondition(), Precondition::ValidFilter);

    let contradiction = event_filter(
        CompFilter::new("VEVENT").with_prop_filter(
            PropFilter::new("SUMMARY")
                .not_defined()
                .with_text_match(TextMatch::new("x")),
        ),
    );
    assert!(matches!(
        validate_filter(&contradiction),
        Err(FilterError::InvalidFilter(_))
    ));

    let backwards = event_filter(
        CompFilter::new("VEVENT")
            .with_time_range(range("2024-01-10T12:00:00Z", "2024-01-10T10:00:00Z")),
    );
    assert!(matches!(
        evaluate_filter(&backwards, &meeting(), &EvalOptions::default()),
        Err(FilterError::InvalidFilter(_))
    ));
    assert!(validate_filter(&event_filter(CompFilter::new("VEVENT"))).is_ok());
}

#[test]
fn sibling_prop_filters_combine_as_or() {
    let filter = event_filter(
        CompFilter::new("VEVENT")
            .with_prop_filter(PropFilter::new("LOCATION"))
            .with_prop_filter(PropFilter::new("SUMMARY")),
    );
    assert!(eval(&filter));
}

#[test]
fn first_match_skips_later_siblings() {
    let filter = event_filter(
        CompFilter::new("VEVENT")
            .with_prop_filter(PropFilter::new("SUMMARY"))
            .with_prop_filter(PropFilter::new("SUMMARY").with_text_match(
                TextMatch::new("x").with_collation("i;nope"),
            )),
    );
    assert!(eval(&filter));
}

#[test]
fn comp_time_range_and_prop_group_must_both_hold() {
    let filter = event_filter(
        CompFilter::new("VEVENT")
            .with_time_range(range("2024-01-10T10:30:00Z", "2024-01-10T12:00:00Z"))
            .with_prop_filter(PropFilter::new("X-ABSENT")),
    );
    assert!(!eval(&filter));
}

#[test]
fn event_time_range() {
    let hit = event_filter(
        CompFilter::new("VEVENT").with_time_range(range("2024-01-10T10:30:00Z", "2024-01-10T12:00:00Z")),
    );
    assert!(eval(&hit));
    let miss = event_filter(
        CompFilter::new("VEVENT").with_time_range(range("2024-01-10T11:00:00Z", "2024-01-10T12:00:00Z")),
    );
    assert!(!eval(&miss));
}

#[test]
fn alarm_time_range() {
    let filter = event_filter(CompFilter::new("VEVENT").with_comp_filter(
        CompFilter::new("VALARM").with_time_range(range("2024-01-10T09:50:00Z", "2024-01-10T09:51:00Z")),
    ));
    assert!(eval(&filter));
}

#[test]
fn property_time_range() {
    let filter = event_filter(CompFilter::new("VEVENT").with_prop_filter(
        PropFilter::new("DTSTAMP").with_time_range(range("2024-01-01T00:00:00Z", "2024-01-02T00:00:00Z")),
    ));
    assert!(eval(&filter));

    let on_text = event_filter(CompFilter::new("VEVENT").with_prop_filter(
        PropFilter::new("SUMMARY").with_time_range(range("2000-01-01T00:00:00Z", "2030-01-01T00:00:00Z")),
    ));
    assert!(!eval(&on_text));
}

#[test]
fn extension_parameters_are_filterable() {
    let filter = event_filter(CompFilter::new("VEVENT").with_prop_filter(
        PropFilter::new("ATTENDEE").with_param_filter(
            ParamFilter::new("X-TEAM").with_text_match(TextMatch::new("PLATFORM")),
        ),
    ));
    assert!(eval(&filter));
}

#[test]
fn standard_parameters_need_the_option() {
    let filter = event_filter(CompFilter::new("VEVENT").with_prop_filter(
        PropFilter::new("ATTENDEE").with_param_filter(
            ParamFilter::new("PARTSTAT").with_text_match(TextMatch::new("ACCEPTED")),
        ),
    ));
    assert!(!eval(&filter));

    let options = EvalOptions {
        match_standard_parameters: true,
        ..EvalOptions::default()
    };
    assert!(evaluate_filter(&filter, &meeting(), &options).unwrap());

    let not_defined = event_filter(CompFilter::new("VEVENT").with_prop_filter(
        PropFilter::new("ATTENDEE").with_param_filter(ParamFilter::new("PARTSTAT").not_defined()),
    ));
    assert!(eval(&not_defined));
}

#[test]
fn settings_seed_options() {
    let mut settings = Settings::default();
    settings.calendar.default_timezone = "Europe/Paris".into();
    settings.filter.match_standard_parameters = true;
    let options = EvalOptions::from_settings(&settings);
    assert!(options.match_standard_parameters);
    assert_eq!(options.floating, Zone::named("Europe/Paris").unwrap());

    settings.calendar.default_timezone = "Nowhere/Special".into();
    assert_eq!(EvalOptions::from_settings(&settings).floating, Zone::Utc);
}
