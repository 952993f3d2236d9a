//! REPORT request types for `CalDAV` queries.

use super::{CalendarDataRequest, CalendarFilter, TimeRange};
use crate::rfc::ical::expand::Zone;

/// A namespace-qualified XML element name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedName {
    pub namespace: String,
    pub local: String,
}

impl QualifiedName {
    #[must_use]
    pub fn new(namespace: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            local: local.into(),
        }
    }
}

impl std::fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{{}}}{}", self.namespace, self.local)
    }
}

/// A property requested inside `DAV:prop`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestedProp {
    /// `DAV:getetag`
    ETag,
    /// `CALDAV:calendar-data`
    CalendarData(CalendarDataRequest),
    /// Any other property; reported as not found.
    Other(QualifiedName),
}

/// Which properties each response entry carries.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PropRequest {
    /// `DAV:allprop`, also used when the body names nothing.
    #[default]
    AllProp,
    /// `DAV:propname`
    PropName,
    /// `DAV:prop` with the listed properties.
    Prop(Vec<RequestedProp>),
}

impl PropRequest {
    /// Returns the `calendar-data` request, if one was made.
    #[must_use]
    pub fn calendar_data(&self) -> Option<&CalendarDataRequest> {
        match self {
            Self::Prop(props) => props.iter().find_map(|p| match p {
                RequestedProp::CalendarData(request) => Some(request),
                RequestedProp::ETag | RequestedProp::Other(_) => None,
            }),
            Self::AllProp | Self::PropName => None,
        }
    }
}

/// `CALDAV:calendar-query` (RFC 4791 §7.8).
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarQuery {
    pub props: PropRequest,
    pub filter: CalendarFilter,
    /// Zone from the `timezone` element, applied to floating times.
    pub timezone: Option<Zone>,
}

/// `CALDAV:calendar-multiget` (RFC 4791 §7.9).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarMultiget {
    pub props: PropRequest,
    /// Requested hrefs in document order.
    pub hrefs: Vec<String>,
}

/// `CALDAV:free-busy-query` (RFC 4791 §7.10).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeBusyQuery {
    pub time_range: TimeRange,
}

/// A parsed REPORT request body.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportRequest {
    CalendarQuery(CalendarQuery),
    CalendarMultiget(CalendarMultiget),
    FreeBusyQuery(FreeBusyQuery),
}

impl ReportRequest {
    /// Returns the root element name of the report.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::CalendarQuery(_) => "calendar-query",
            Self::CalendarMultiget(_) => "calendar-multiget",
            Self::FreeBusyQuery(_) => "free-busy-query",
        }
    }

    /// Returns the property request, absent for free-busy.
    #[must_use]
    pub fn props(&self) -> Option<&PropRequest> {
        match self {
            Self::CalendarQuery(query) => Some(&query.props),
            Self::CalendarMultiget(multiget) => Some(&multiget.props),
            Self::FreeBusyQuery(_) => None,
        }
    }
}
