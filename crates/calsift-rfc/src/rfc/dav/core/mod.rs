//! `CalDAV` REPORT request models.

mod filter;
mod precondition;
mod report;
mod selection;

pub use filter::{
    CalendarFilter, CompFilter, FilterNode, ParamFilter, PropFilter, TextMatch, TimeRange,
    parse_utc_literal,
};
pub use precondition::Precondition;
pub use report::{
    CalendarMultiget, CalendarQuery, FreeBusyQuery, PropRequest, QualifiedName, ReportRequest,
    RequestedProp,
};
pub use selection::{CalendarDataRequest, CompChildren, CompSelection, PropSelection, PropSelector};
