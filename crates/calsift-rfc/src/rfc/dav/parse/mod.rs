//! REPORT request body parsing.

mod error;
mod report;

pub use error::{ReportParseError, ReportParseErrorKind, ReportParseResult};
pub use report::parse_report;
