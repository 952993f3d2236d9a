use chrono::TimeZone;

use super::*;
use crate::rfc::dav::core::{CompChildren, Precondition, PropSelection};
use crate::rfc::dav::parse::ReportParseErrorKind;

fn utc(y: i32, m: u32, d: u32) -> chrono::DateTime<chrono::Utc> {
    chrono::Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

fn query(xml: &str) -> CalendarQuery {
    match parse_report(xml.as_bytes()).unwrap() {
        ReportRequest::CalendarQuery(query) => query,
        other => panic!("wrong report type: {other:?}"),
    }
}

fn filter_error(xml: &str) -> ReportParseError {
    let err = parse_report(xml.as_bytes()).unwrap_err();
    assert_eq!(err.kind, ReportParseErrorKind::InvalidFilter, "{err}");
    assert_eq!(err.precondition(), Some(Precondition::ValidFilter));
    err
}

#[test]
fn parse_calendar_query_with_nested_filters() {
    let q = query(
        r#"<?xml version="1.0" encoding="utf-8" ?>
<C:calendar-query xmlns:D="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav">
  <D:prop>
    <D:getetag/>
    <C:calendar-data/>
  </D:prop>
  <C:filter>
    <C:comp-filter name="VCALENDAR">
      <C:comp-filter name="VEVENT">
        <C:time-range start="20060104T000000Z" end="20060105T000000Z"/>
        <C:prop-filter name="SUMMARY">
          <C:text-match collation="i;octet" negate-condition="yes">Meeting &amp; Lunch</C:text-match>
        </C:prop-filter>
        <C:prop-filter name="ATTENDEE">
          <C:param-filter name="X-ROLE">
            <C:is-not-defined/>
          </C:param-filter>
        </C:prop-filter>
      </C:comp-filter>
    </C:comp-filter>
  </C:filter>
</C:calendar-query>"#,
    );

    assert_eq!(q.filter.root.name, "VCALENDAR");
    let event = &q.filter.root.comp_filters[0];
    assert_eq!(event.name, "VEVENT");
    assert_eq!(
        event.time_range,
        Some(TimeRange::new(utc(2006, 1, 4), utc(2006, 1, 5)))
    );

    let summary = event.prop_filters[0].text_match.as_ref().unwrap();
    assert_eq!(summary.value, "Meeting & Lunch");
    assert_eq!(summary.collation, "i;octet");
    assert!(summary.negate);

    let param = &event.prop_filters[1].param_filters[0];
    assert_eq!(param.name, "X-ROLE");
    assert!(param.is_not_defined);

    assert_eq!(
        q.props,
        PropRequest::Prop(vec![
            RequestedProp::ETag,
            RequestedProp::CalendarData(CalendarDataRequest::full()),
        ])
    );
    assert!(q.timezone.is_none());
}

#[test]
fn prefixes_are_irrelevant() {
    let q = query(
        r#"<query:calendar-query xmlns:query="urn:ietf:params:xml:ns:caldav" xmlns:dav="DAV:">
  <dav:allprop/>
  <query:filter><query:comp-filter name="vcalendar"/></query:filter>
</query:calendar-query>"#,
    );
    assert_eq!(q.props, PropRequest::AllProp);
    assert_eq!(q.filter, CalendarFilter::vcalendar());

    let q = query(
        r#"<calendar-query xmlns="urn:ietf:params:xml:ns:caldav">
  <filter><comp-filter name="VCALENDAR"/></filter>
</calendar-query>"#,
    );
    assert_eq!(q.props, PropRequest::AllProp);
}

#[test]
fn text_match_defaults() {
    let q = query(
        r#"<C:calendar-query xmlns:C="urn:ietf:params:xml:ns:caldav">
  <C:filter><C:comp-filter name="VCALENDAR"><C:comp-filter name="VTODO">
    <C:prop-filter name="summary"><C:text-match>  report  </C:text-match></C:prop-filter>
  </C:comp-filter></C:comp-filter></C:filter>
</C:calendar-query>"#,
    );
    let prop = &q.filter.root.comp_filters[0].prop_filters[0];
    assert_eq!(prop.name, "SUMMARY");
    assert_eq!(prop.text_match, Some(TextMatch::new("report")));
}

#[test]
fn calendar_data_selection() {
    let q = query(
        r#"<C:calendar-query xmlns:D="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav">
  <D:prop>
    <C:calendar-data content-type="text/calendar" version="2.0">
      <C:comp name="VCALENDAR">
        <C:prop name="VERSION"/>
        <C:comp name="VEVENT">
          <C:prop name="SUMMARY"/>
          <C:prop name="DESCRIPTION" novalue="YES"/>
          <C:prop name="LOCATION" novalue="no"/>
        </C:comp>
        <C:comp name="VTIMEZONE"/>
      </C:comp>
      <C:expand start="20060103T000000Z" end="20060105T000000Z"/>
    </C:calendar-data>
    <D:displayname/>
  </D:prop>
  <C:filter><C:comp-filter name="VCALENDAR"/></C:filter>
</C:calendar-query>"#,
    );

    let PropRequest::Prop(props) = &q.props else {
        panic!("expected prop list");
    };
    assert_eq!(
        props[1],
        RequestedProp::Other(QualifiedName::new("DAV:", "displayname"))
    );

    let data = q.props.calendar_data().unwrap();
    assert_eq!(data.content_type.as_deref(), Some("text/calendar"));
    assert_eq!(data.version.as_deref(), Some("2.0"));

    let root = data.selection.as_ref().unwrap();
    assert!(root.find_prop("VERSION").is_some());
    let event = root.find_comp("VEVENT").unwrap();
    assert!(!event.find_prop("SUMMARY").unwrap().novalue);
    assert!(event.find_prop("DESCRIPTION").unwrap().novalue);
    assert!(!event.find_prop("LOCATION").unwrap().novalue);
    assert_eq!(event.comps, CompChildren::Unspecified);

    let timezone = root.find_comp("VTIMEZONE").unwrap();
    assert_eq!(timezone.props, PropSelection::Unspecified);
}

#[test]
fn calendar_data_must_select_vcalendar() {
    filter_error(
        r#"<C:calendar-query xmlns:D="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav">
  <D:prop><C:calendar-data><C:comp name="VEVENT"/></C:calendar-data></D:prop>
  <C:filter><C:comp-filter name="VCALENDAR"/></C:filter>
</C:calendar-query>"#,
    );
}

#[test]
fn query_timezone_is_parsed() {
    let q = query(
        "<C:calendar-query xmlns:C=\"urn:ietf:params:xml:ns:caldav\">
  <C:filter><C:comp-filter name=\"VCALENDAR\"/></C:filter>
  <C:timezone><![CDATA[BEGIN:VCALENDAR
BEGIN:VTIMEZONE
TZID:Fixed/Plus2
BEGIN:STANDARD
DTSTART:19700101T000000
TZOFFSETFROM:+0200
TZOFFSETTO:+0200
END:STANDARD
END:VTIMEZONE
END:VCALENDAR
]]></C:timezone>
</C:calendar-query>",
    );
    let zone = q.timezone.unwrap();
    let local = chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap();
    assert_eq!(
        zone.to_utc(local),
        chrono::Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap()
    );
}

#[test]
fn broken_timezone_is_an_invalid_filter() {
    filter_error(
        r#"<C:calendar-query xmlns:C="urn:ietf:params:xml:ns:caldav">
  <C:filter><C:comp-filter name="VCALENDAR"/></C:filter>
  <C:timezone>BEGIN:VCALENDAR</C:timezone>
</C:calendar-query>"#,
    );
}

#[test]
fn parse_calendar_multiget_report() {
    let xml = br#"<?xml version="1.0" encoding="utf-8"?>
<C:calendar-multiget xmlns:D="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav">
  <D:prop>
    <D:getetag/>
    <C:calendar-data/>
  </D:prop>
  <D:href>/calendars/user/cal/event1.ics</D:href>
  <D:href>
    /calendars/user/cal/event2.ics
  </D:href>
</C:calendar-multiget>"#;

    let ReportRequest::CalendarMultiget(multiget) = parse_report(xml).unwrap() else {
        panic!("wrong report type");
    };
    assert_eq!(
        multiget.hrefs,
        ["/calendars/user/cal/event1.ics", "/calendars/user/cal/event2.ics"]
    );
    assert!(multiget.props.calendar_data().is_some());
}

#[test]
fn multiget_requires_hrefs_and_props() {
    let no_href = br#"<C:calendar-multiget xmlns:D="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav">
  <D:prop><D:getetag/></D:prop>
</C:calendar-multiget>"#;
    let err = parse_report(no_href).unwrap_err();
    assert_eq!(err.kind, ReportParseErrorKind::MissingElement);
    assert_eq!(err.precondition(), None);

    let no_prop = br#"<C:calendar-multiget xmlns:D="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav">
  <D:href>/a.ics</D:href>
</C:calendar-multiget>"#;
    assert_eq!(
        parse_report(no_prop).unwrap_err().kind,
        ReportParseErrorKind::MissingElement
    );
}

#[test]
fn parse_free_busy_query() {
    let xml = br#"<C:free-busy-query xmlns:C="urn:ietf:params:xml:ns:caldav">
  <C:time-range start="20060104T140000Z"/>
</C:free-busy-query>"#;
    let ReportRequest::FreeBusyQuery(fb) = parse_report(xml).unwrap() else {
        panic!("wrong report type");
    };
    assert_eq!(
        fb.time_range.start,
        Some(chrono::Utc.with_ymd_and_hms(2006, 1, 4, 14, 0, 0).unwrap())
    );
    assert_eq!(fb.time_range.end, None);
}

#[test]
fn time_range_validation() {
    let wrap = |attrs: &str| {
        format!(
            r#"<C:free-busy-query xmlns:C="urn:ietf:params:xml:ns:caldav"><C:time-range {attrs}/></C:free-busy-query>"#
        )
    };
    filter_error(&wrap(""));
    filter_error(&wrap(r#"start="20060104T140000""#));
    filter_error(&wrap(r#"start="2006-01-04T14:00:00Z""#));
    filter_error(&wrap(r#"start="20060105T000000Z" end="20060104T000000Z""#));
    filter_error(r#"<C:free-busy-query xmlns:C="urn:ietf:params:xml:ns:caldav"/>"#);
}

#[test]
fn negate_condition_must_be_yes_or_no() {
    let err = filter_error(
        r#"<C:calendar-query xmlns:C="urn:ietf:params:xml:ns:caldav">
  <C:filter><C:comp-filter name="VCALENDAR"><C:comp-filter name="VEVENT">
    <C:prop-filter name="SUMMARY"><C:text-match negate-condition="maybe">x</C:text-match></C:prop-filter>
  </C:comp-filter></C:comp-filter></C:filter>
</C:calendar-query>"#,
    );
    assert!(err.message.contains("maybe"));
}

#[test]
fn filter_structure_violations() {
    // No filter at all.
    filter_error(r#"<C:calendar-query xmlns:C="urn:ietf:params:xml:ns:caldav"/>"#);
    // Root comp-filter must be VCALENDAR.
    filter_error(
        r#"<C:calendar-query xmlns:C="urn:ietf:params:xml:ns:caldav">
  <C:filter><C:comp-filter name="VEVENT"/></C:filter></C:calendar-query>"#,
    );
    // Missing name attribute.
    filter_error(
        r#"<C:calendar-query xmlns:C="urn:ietf:params:xml:ns:caldav">
  <C:filter><C:comp-filter name="VCALENDAR"><C:prop-filter/></C:comp-filter></C:filter></C:calendar-query>"#,
    );
    // is-not-defined together with a content test.
    filter_error(
        r#"<C:calendar-query xmlns:C="urn:ietf:params:xml:ns:caldav">
  <C:filter><C:comp-filter name="VCALENDAR"><C:comp-filter name="VEVENT">
    <C:is-not-defined/><C:time-range start="20060104T000000Z"/>
  </C:comp-filter></C:comp-filter></C:filter></C:calendar-query>"#,
    );
    // time-range is not allowed on parameters.
    filter_error(
        r#"<C:calendar-query xmlns:C="urn:ietf:params:xml:ns:caldav">
  <C:filter><C:comp-filter name="VCALENDAR"><C:comp-filter name="VEVENT">
    <C:prop-filter name="DTSTART"><C:param-filter name="TZID"><C:time-range start="20060104T000000Z"/></C:param-filter></C:prop-filter>
  </C:comp-filter></C:comp-filter></C:filter></C:calendar-query>"#,
    );
}

#[test]
fn root_element_validation() {
    let err = parse_report(br#"<D:propfind xmlns:D="DAV:"/>"#).unwrap_err();
    assert_eq!(err.kind, ReportParseErrorKind::UnsupportedNamespace);

    let err = parse_report(br"<calendar-query/>").unwrap_err();
    assert_eq!(err.kind, ReportParseErrorKind::UnsupportedNamespace);

    let err =
        parse_report(br#"<C:sync-collection xmlns:C="urn:ietf:params:xml:ns:caldav"/>"#).unwrap_err();
    assert_eq!(err.kind, ReportParseErrorKind::UnexpectedElement);

    let err = parse_report(b"").unwrap_err();
    assert_eq!(err.kind, ReportParseErrorKind::MissingElement);
}

#[test]
fn malformed_xml_is_rejected() {
    let err = parse_report(br#"<C:calendar-query xmlns:C="urn:ietf:params:xml:ns:caldav"><C:filter>"#)
        .unwrap_err();
    assert_eq!(err.kind, ReportParseErrorKind::XmlError);

    let err = parse_report(br"<X:calendar-query/>").unwrap_err();
    assert_eq!(err.kind, ReportParseErrorKind::XmlError);
}
