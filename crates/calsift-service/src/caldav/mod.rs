//! `CalDAV` query and free-busy core.
//!
//! ## Module Organization
//!
//! - `evaluator`: `CALDAV:filter` evaluation against parsed calendars
//! - `freebusy`: Busy-time aggregation into a VFREEBUSY
//! - `overlap`: Time-range overlap rules per component kind
//! - `projector`: `calendar-data` partial retrieval
//! - `recurrence`: Instance expansion from RRULE, RDATE and EXDATE
//! - `service`: REPORT orchestration over a resource walk
//! - `text_match`: Collation-aware substring matching

pub mod evaluator;
pub mod freebusy;
pub mod overlap;
pub mod projector;
pub mod recurrence;
pub mod service;
pub mod text_match;

// Re-export commonly used types at module level
pub use evaluator::{EvalOptions, Match, evaluate_filter, validate_filter};
pub use freebusy::{FreeBusyAggregator, aggregate_free_busy};
pub use projector::project;
pub use service::report::{ReportOptions, ReportRunner, ReportSummary, run_report};
pub use service::response::{ResponseEntry, ResponseProp, ResponseWriter};
pub use service::walk::{Resource, ResourceWalk, collection_etag, generate_etag};
