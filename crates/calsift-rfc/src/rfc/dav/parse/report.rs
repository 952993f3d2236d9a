//! REPORT request XML parsing.
//!
//! The body is first read into a small namespace-resolved element tree, then
//! interpreted per report kind. Element names are matched on namespace URI and
//! local name, never on the prefix chosen by the client.

use calsift_core::constants::{CALDAV_NAMESPACE, DAV_NAMESPACE};
use quick_xml::NsReader;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};

use super::error::{ReportParseError, ReportParseResult};
use crate::rfc::dav::core::{
    CalendarDataRequest, CalendarFilter, CalendarMultiget, CalendarQuery, CompFilter,
    CompSelection, FreeBusyQuery, ParamFilter, PropFilter, PropRequest, PropSelector,
    QualifiedName, ReportRequest, RequestedProp, TextMatch, TimeRange, parse_utc_literal,
};
use crate::rfc::ical::expand::Zone;
use crate::rfc::ical::parse::parse_str;

/// An element of the request document with its namespace resolved.
#[derive(Debug, Default)]
struct Element {
    namespace: Option<String>,
    local: String,
    attributes: Vec<(String, String)>,
    children: Vec<Element>,
    text: String,
}

impl Element {
    fn open(namespace: Option<String>, start: &BytesStart<'_>) -> ReportParseResult<Self> {
        let local = std::str::from_utf8(start.local_name().as_ref())?.to_owned();
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr?;
            let key = std::str::from_utf8(attr.key.as_ref())?;
            if key == "xmlns" || key.starts_with("xmlns:") {
                continue;
            }
            let name = std::str::from_utf8(attr.key.local_name().as_ref())?.to_owned();
            let raw = std::str::from_utf8(&attr.value)?;
            let value = quick_xml::escape::unescape(raw)?.into_owned();
            attributes.push((name, value));
        }
        Ok(Self {
            namespace,
            local,
            attributes,
            ..Self::default()
        })
    }

    fn is(&self, namespace: &str, local: &str) -> bool {
        self.namespace.as_deref() == Some(namespace) && self.local == local
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    fn child(&self, namespace: &str, local: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.is(namespace, local))
    }

    fn children_named<'a>(
        &'a self,
        namespace: &'a str,
        local: &'a str,
    ) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.is(namespace, local))
    }

    fn caldav_children(&self) -> impl Iterator<Item = &Element> {
        self.children
            .iter()
            .filter(|c| c.namespace.as_deref() == Some(CALDAV_NAMESPACE))
    }

    fn name_attribute(&self) -> ReportParseResult<&str> {
        self.attribute("name").ok_or_else(|| {
            ReportParseError::invalid_filter(format!("name attribute must exist in {}", self.local))
        })
    }

    fn qualified_name(&self) -> QualifiedName {
        QualifiedName::new(self.namespace.clone().unwrap_or_default(), self.local.clone())
    }
}

fn owned_namespace(resolved: ResolveResult<'_>) -> ReportParseResult<Option<String>> {
    match resolved {
        ResolveResult::Bound(Namespace(ns)) => Ok(Some(std::str::from_utf8(ns)?.to_owned())),
        ResolveResult::Unbound => Ok(None),
        ResolveResult::Unknown(prefix) => Err(ReportParseError::xml(format!(
            "undeclared namespace prefix: {}",
            String::from_utf8_lossy(&prefix)
        ))),
    }
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> ReportParseResult<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => return Err(ReportParseError::xml("multiple root elements")),
    }
    Ok(())
}

/// Reads the whole document into an element tree.
fn read_document(xml: &[u8]) -> ReportParseResult<Element> {
    let mut reader = NsReader::from_reader(xml);
    let mut buf = Vec::new();
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let (resolved, event) = reader.read_resolved_event_into(&mut buf)?;
        let namespace = owned_namespace(resolved)?;
        match event {
            Event::Start(e) => stack.push(Element::open(namespace, &e)?),
            Event::Empty(e) => {
                let element = Element::open(namespace, &e)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| ReportParseError::xml("unbalanced end tag"))?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(e) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&reader.decoder().decode(&e)?);
                }
            }
            Event::CData(e) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&reader.decoder().decode(&e)?);
                }
            }
            Event::GeneralRef(e) => {
                if let Some(top) = stack.last_mut() {
                    if let Some(ch) = e.resolve_char_ref()? {
                        top.text.push(ch);
                    } else {
                        let name = reader.decoder().decode(&e)?;
                        let replacement = quick_xml::escape::resolve_predefined_entity(&name)
                            .ok_or_else(|| {
                                ReportParseError::xml(format!("unknown entity: &{name};"))
                            })?;
                        top.text.push_str(replacement);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(ReportParseError::xml("unexpected end of document"));
    }
    root.ok_or_else(|| ReportParseError::missing_element("report root element"))
}

/// Parses a REPORT request body.
///
/// ## Summary
/// Accepts `calendar-query`, `calendar-multiget` and `free-busy-query` in the
/// `CalDAV` namespace and returns the typed request.
///
/// ## Errors
/// Returns an error if the XML is malformed, the root element is not one of
/// the supported reports, or the filter violates RFC 4791 (tagged
/// `CALDAV:valid-filter`).
#[tracing::instrument(skip(xml), fields(body_len = xml.len()))]
pub fn parse_report(xml: &[u8]) -> ReportParseResult<ReportRequest> {
    let root = read_document(xml)?;

    let Some(namespace) = root.namespace.as_deref() else {
        return Err(ReportParseError::unsupported_namespace("(none)"));
    };
    if namespace != CALDAV_NAMESPACE {
        return Err(ReportParseError::unsupported_namespace(namespace));
    }

    let request = match root.local.as_str() {
        "calendar-query" => ReportRequest::CalendarQuery(parse_calendar_query(&root)?),
        "calendar-multiget" => ReportRequest::CalendarMultiget(parse_calendar_multiget(&root)?),
        "free-busy-query" => ReportRequest::FreeBusyQuery(parse_free_busy_query(&root)?),
        other => return Err(ReportParseError::unexpected_element(other)),
    };
    tracing::debug!(report = request.name(), "Parsed REPORT body");
    Ok(request)
}

fn parse_calendar_query(root: &Element) -> ReportParseResult<CalendarQuery> {
    let props = parse_prop_request(root)?.unwrap_or_default();

    let filter = root.child(CALDAV_NAMESPACE, "filter").ok_or_else(|| {
        ReportParseError::invalid_filter("filter element must exist beneath calendar-query")
    })?;
    let filter = parse_calendar_filter(filter)?;

    let timezone = root
        .child(CALDAV_NAMESPACE, "timezone")
        .map(|tz| parse_timezone(&tz.text))
        .transpose()?;

    Ok(CalendarQuery {
        props,
        filter,
        timezone,
    })
}

fn parse_calendar_multiget(root: &Element) -> ReportParseResult<CalendarMultiget> {
    let props = parse_prop_request(root)?.ok_or_else(|| {
        ReportParseError::missing_element("DAV:prop, DAV:allprop or DAV:propname")
    })?;

    let hrefs: Vec<String> = root
        .children_named(DAV_NAMESPACE, "href")
        .map(|href| href.text.trim().to_owned())
        .filter(|href| !href.is_empty())
        .collect();
    if hrefs.is_empty() {
        return Err(ReportParseError::missing_element("DAV:href"));
    }

    Ok(CalendarMultiget { props, hrefs })
}

fn parse_free_busy_query(root: &Element) -> ReportParseResult<FreeBusyQuery> {
    let time_range = root.child(CALDAV_NAMESPACE, "time-range").ok_or_else(|| {
        ReportParseError::invalid_filter("time-range element must exist beneath free-busy-query")
    })?;
    Ok(FreeBusyQuery {
        time_range: parse_time_range(time_range)?,
    })
}

/// Reads `DAV:allprop`, `DAV:propname` or `DAV:prop`, whichever comes first.
fn parse_prop_request(root: &Element) -> ReportParseResult<Option<PropRequest>> {
    for child in &root.children {
        if child.is(DAV_NAMESPACE, "allprop") {
            return Ok(Some(PropRequest::AllProp));
        }
        if child.is(DAV_NAMESPACE, "propname") {
            return Ok(Some(PropRequest::PropName));
        }
        if child.is(DAV_NAMESPACE, "prop") {
            let props = child
                .children
                .iter()
                .map(|prop| {
                    if prop.is(DAV_NAMESPACE, "getetag") {
                        Ok(RequestedProp::ETag)
                    } else if prop.is(CALDAV_NAMESPACE, "calendar-data") {
                        parse_calendar_data(prop).map(RequestedProp::CalendarData)
                    } else {
                        Ok(RequestedProp::Other(prop.qualified_name()))
                    }
                })
                .collect::<ReportParseResult<Vec<_>>>()?;
            return Ok(Some(PropRequest::Prop(props)));
        }
    }
    Ok(None)
}

fn parse_calendar_data(element: &Element) -> ReportParseResult<CalendarDataRequest> {
    let mut request = CalendarDataRequest {
        content_type: element.attribute("content-type").map(str::to_owned),
        version: element.attribute("version").map(str::to_owned),
        selection: None,
    };

    for child in element.caldav_children() {
        match child.local.as_str() {
            "comp" => {
                let selection = parse_comp_selection(child)?;
                if selection.name != "VCALENDAR" {
                    return Err(ReportParseError::invalid_filter(format!(
                        "calendar-data must select VCALENDAR, got {}",
                        selection.name
                    )));
                }
                request.selection = Some(selection);
            }
            other => tracing::debug!(element = other, "Ignoring calendar-data child"),
        }
    }
    Ok(request)
}

fn parse_comp_selection(element: &Element) -> ReportParseResult<CompSelection> {
    let mut selection = CompSelection::new(element.name_attribute()?);

    if element.child(CALDAV_NAMESPACE, "allprop").is_some() {
        selection = selection.all_props();
    } else {
        for prop in element.children_named(CALDAV_NAMESPACE, "prop") {
            let mut selector = PropSelector::new(prop.name_attribute()?);
            if prop
                .attribute("novalue")
                .is_some_and(|v| v.eq_ignore_ascii_case("yes"))
            {
                selector = selector.without_value();
            }
            selection = selection.with_prop(selector);
        }
    }

    if element.child(CALDAV_NAMESPACE, "allcomp").is_some() {
        selection = selection.all_comps();
    } else {
        for comp in element.children_named(CALDAV_NAMESPACE, "comp") {
            selection = selection.with_comp(parse_comp_selection(comp)?);
        }
    }

    Ok(selection)
}

fn parse_timezone(text: &str) -> ReportParseResult<Zone> {
    let calendar = parse_str(text.trim())
        .map_err(|e| ReportParseError::invalid_filter(format!("invalid timezone: {e}")))?;
    Zone::from_calendar(&calendar)
        .map_err(|e| ReportParseError::invalid_filter(format!("invalid timezone: {e}")))
}

fn parse_calendar_filter(filter: &Element) -> ReportParseResult<CalendarFilter> {
    let mut comp_filters = filter.children_named(CALDAV_NAMESPACE, "comp-filter");
    let root = comp_filters.next().ok_or_else(|| {
        ReportParseError::invalid_filter("comp-filter element must exist beneath filter")
    })?;
    if comp_filters.next().is_some() {
        return Err(ReportParseError::invalid_filter(
            "filter must contain exactly one comp-filter",
        ));
    }

    let root = parse_comp_filter(root)?;
    if root.name != "VCALENDAR" {
        return Err(ReportParseError::invalid_filter(format!(
            "root comp-filter must name VCALENDAR, got {}",
            root.name
        )));
    }

    let filter = CalendarFilter::new(root);
    if let Some(node) = filter.find_contradiction() {
        return Err(ReportParseError::invalid_filter(format!(
            "{} combines is-not-defined with other tests",
            node.name()
        )));
    }
    Ok(filter)
}

fn parse_comp_filter(element: &Element) -> ReportParseResult<CompFilter> {
    let mut filter = CompFilter::new(element.name_attribute()?);
    for child in element.caldav_children() {
        match child.local.as_str() {
            "is-not-defined" => filter.is_not_defined = true,
            "time-range" => filter.time_range = Some(parse_time_range(child)?),
            "prop-filter" => filter.prop_filters.push(parse_prop_filter(child)?),
            "comp-filter" => filter.comp_filters.push(parse_comp_filter(child)?),
            other => return Err(unexpected_in("comp-filter", other)),
        }
    }
    Ok(filter)
}

fn parse_prop_filter(element: &Element) -> ReportParseResult<PropFilter> {
    let mut filter = PropFilter::new(element.name_attribute()?);
    for child in element.caldav_children() {
        match child.local.as_str() {
            "is-not-defined" => filter.is_not_defined = true,
            "time-range" => filter.time_range = Some(parse_time_range(child)?),
            "text-match" => filter.text_match = Some(parse_text_match(child)?),
            "param-filter" => filter.param_filters.push(parse_param_filter(child)?),
            other => return Err(unexpected_in("prop-filter", other)),
        }
    }
    Ok(filter)
}

fn parse_param_filter(element: &Element) -> ReportParseResult<ParamFilter> {
    let mut filter = ParamFilter::new(element.name_attribute()?);
    for child in element.caldav_children() {
        match child.local.as_str() {
            "is-not-defined" => filter.is_not_defined = true,
            "text-match" => filter.text_match = Some(parse_text_match(child)?),
            other => return Err(unexpected_in("param-filter", other)),
        }
    }
    Ok(filter)
}

fn unexpected_in(parent: &str, child: &str) -> ReportParseError {
    ReportParseError::invalid_filter(format!("{child} is not allowed in {parent}"))
}

/// Parses a text-match element.
///
/// Collation defaults to `i;ascii-casemap`; whether it is supported is checked
/// at evaluation time.
fn parse_text_match(element: &Element) -> ReportParseResult<TextMatch> {
    let mut text_match = TextMatch::new(element.text.trim());
    if let Some(collation) = element.attribute("collation") {
        text_match = text_match.with_collation(collation);
    }
    match element.attribute("negate-condition") {
        None | Some("no") => {}
        Some("yes") => text_match = text_match.negated(),
        Some(other) => {
            return Err(ReportParseError::invalid_filter(format!(
                "negate-condition must be yes or no, got {other}"
            )));
        }
    }
    Ok(text_match)
}

/// Parses a time-range element.
///
/// RFC 4791 §9.9 requires UTC DATE-TIME literals: `YYYYMMDDTHHMMSSZ`.
fn parse_time_range(element: &Element) -> ReportParseResult<TimeRange> {
    let bound = |name: &str| {
        element
            .attribute(name)
            .map(|value| {
                parse_utc_literal(value).ok_or_else(|| {
                    ReportParseError::invalid_filter(format!("invalid time-range {name}: {value}"))
                })
            })
            .transpose()
    };
    let start = bound("start")?;
    let end = bound("end")?;

    if start.is_none() && end.is_none() {
        return Err(ReportParseError::invalid_filter(
            "time-range must include start or end",
        ));
    }
    if let (Some(range_start), Some(range_end)) = (start, end)
        && range_end <= range_start
    {
        return Err(ReportParseError::invalid_filter(
            "time-range end must be greater than start",
        ));
    }

    Ok(TimeRange { start, end })
}

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;
