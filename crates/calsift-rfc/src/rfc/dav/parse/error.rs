//! REPORT body parse error types.

use crate::rfc::dav::core::Precondition;

/// Result type for REPORT body parsing.
pub type ReportParseResult<T> = Result<T, ReportParseError>;

/// An error found while reading a REPORT request body.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ReportParseError {
    pub kind: ReportParseErrorKind,
    pub message: String,
}

impl ReportParseError {
    #[must_use]
    pub fn new(kind: ReportParseErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn xml(message: impl Into<String>) -> Self {
        Self::new(ReportParseErrorKind::XmlError, message)
    }

    #[must_use]
    pub fn missing_element(name: &str) -> Self {
        Self::new(
            ReportParseErrorKind::MissingElement,
            format!("missing required element: {name}"),
        )
    }

    #[must_use]
    pub fn unexpected_element(name: &str) -> Self {
        Self::new(
            ReportParseErrorKind::UnexpectedElement,
            format!("unexpected element: {name}"),
        )
    }

    #[must_use]
    pub fn missing_attribute(element: &str, name: &str) -> Self {
        Self::new(
            ReportParseErrorKind::MissingAttribute,
            format!("missing required attribute {name} on {element}"),
        )
    }

    #[must_use]
    pub fn unsupported_namespace(ns: &str) -> Self {
        Self::new(
            ReportParseErrorKind::UnsupportedNamespace,
            format!("unsupported namespace: {ns}"),
        )
    }

    /// A structurally valid document whose filter breaks RFC 4791 rules.
    #[must_use]
    pub fn invalid_filter(message: impl Into<String>) -> Self {
        Self::new(ReportParseErrorKind::InvalidFilter, message)
    }

    /// Returns the precondition to report, if the error maps to one.
    ///
    /// Errors without a precondition are plain malformed requests.
    #[must_use]
    pub const fn precondition(&self) -> Option<Precondition> {
        match self.kind {
            ReportParseErrorKind::InvalidFilter => Some(Precondition::ValidFilter),
            ReportParseErrorKind::XmlError
            | ReportParseErrorKind::EncodingError
            | ReportParseErrorKind::MissingElement
            | ReportParseErrorKind::UnexpectedElement
            | ReportParseErrorKind::MissingAttribute
            | ReportParseErrorKind::UnsupportedNamespace => None,
        }
    }
}

impl From<quick_xml::Error> for ReportParseError {
    fn from(err: quick_xml::Error) -> Self {
        Self::xml(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for ReportParseError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Self::xml(err.to_string())
    }
}

impl From<quick_xml::escape::EscapeError> for ReportParseError {
    fn from(err: quick_xml::escape::EscapeError) -> Self {
        Self::xml(err.to_string())
    }
}

impl From<std::str::Utf8Error> for ReportParseError {
    fn from(err: std::str::Utf8Error) -> Self {
        Self::new(ReportParseErrorKind::EncodingError, err.to_string())
    }
}

impl From<quick_xml::encoding::EncodingError> for ReportParseError {
    fn from(err: quick_xml::encoding::EncodingError) -> Self {
        Self::new(ReportParseErrorKind::EncodingError, err.to_string())
    }
}

/// Report parse error kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportParseErrorKind {
    XmlError,
    EncodingError,
    MissingElement,
    UnexpectedElement,
    MissingAttribute,
    UnsupportedNamespace,
    /// Rejected with `CALDAV:valid-filter`.
    InvalidFilter,
}

impl std::fmt::Display for ReportParseErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::XmlError => write!(f, "XML error"),
            Self::EncodingError => write!(f, "encoding error"),
            Self::MissingElement => write!(f, "missing element"),
            Self::UnexpectedElement => write!(f, "unexpected element"),
            Self::MissingAttribute => write!(f, "missing attribute"),
            Self::UnsupportedNamespace => write!(f, "unsupported namespace"),
            Self::InvalidFilter => write!(f, "invalid filter"),
        }
    }
}
