use thiserror::Error;

use calsift_rfc::rfc::dav::core::Precondition;
use calsift_rfc::rfc::dav::parse::ReportParseError;
use calsift_rfc::rfc::ical::parse::{ParseError, ParseErrorClass};

/// Errors raised while evaluating a filter against one calendar.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    /// Per RFC 4791 §7.5.1 this is reported as `CALDAV:supported-collation`.
    #[error("Unsupported collation: {0}")]
    UnsupportedCollation(String),
}

impl FilterError {
    #[must_use]
    pub const fn precondition(&self) -> Precondition {
        match self {
            Self::InvalidFilter(_) => Precondition::ValidFilter,
            Self::UnsupportedCollation(_) => Precondition::SupportedCollation,
        }
    }
}

pub type FilterResult<T> = std::result::Result<T, FilterError>;

/// Service layer errors - combines all error types
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    FilterError(#[from] FilterError),

    #[error(transparent)]
    ParseError(#[from] ParseError),

    #[error(transparent)]
    ReportError(#[from] ReportParseError),

    #[error(transparent)]
    CoreError(#[from] calsift_core::error::CoreError),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Response writer failed: {0}")]
    WriterError(String),
}

impl ServiceError {
    /// Returns the precondition a client should see for this error, if any.
    #[must_use]
    pub fn precondition(&self) -> Option<Precondition> {
        match self {
            Self::FilterError(e) => Some(e.precondition()),
            Self::ParseError(e) => match e.class() {
                ParseErrorClass::ResourceTooLarge => Some(Precondition::MaxResourceSize),
                ParseErrorClass::LineTooLong
                | ParseErrorClass::MalformedCalendarData
                | ParseErrorClass::Unreadable => Some(Precondition::ValidCalendarData),
                ParseErrorClass::Aborted => None,
            },
            Self::ReportError(e) => e.precondition(),
            Self::CoreError(_) | Self::IoError(_) | Self::WriterError(_) => None,
        }
    }

    /// Returns whether processing must stop rather than continue with the
    /// next resource.
    #[must_use]
    pub fn is_abort(&self) -> bool {
        matches!(self, Self::ParseError(e) if e.class() == ParseErrorClass::Aborted)
    }
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;
    use calsift_rfc::rfc::ical::parse::ParseErrorKind;

    #[test]
    fn filter_errors_carry_their_precondition() {
        let err = FilterError::UnsupportedCollation("i;klingon".into());
        assert_eq!(err.precondition(), Precondition::SupportedCollation);
        let err = ServiceError::from(FilterError::InvalidFilter("bad".into()));
        assert_eq!(err.precondition(), Some(Precondition::ValidFilter));
    }

    #[test]
    fn malformed_data_maps_to_valid_calendar_data() {
        let err = ServiceError::from(ParseError::new(ParseErrorKind::MissingEnd, 3, 1));
        assert_eq!(err.precondition(), Some(Precondition::ValidCalendarData));
        assert!(!err.is_abort());
    }

    #[test]
    fn aborted_read_stops_the_walk() {
        let err = ServiceError::from(ParseError::new(ParseErrorKind::Aborted, 1, 1));
        assert!(err.is_abort());
        assert_eq!(err.precondition(), None);
    }
}
