//! iCalendar parsing error types.

use std::fmt;

/// Result type for iCalendar parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Error type for iCalendar parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    /// Logical line number where the error occurred (1-based).
    pub line: usize,
    /// Column number where the error occurred (1-based).
    pub column: usize,
    /// Additional context, usually the offending content line.
    pub context: Option<String>,
}

impl ParseError {
    #[must_use]
    pub fn new(kind: ParseErrorKind, line: usize, column: usize) -> Self {
        Self {
            kind,
            line,
            column,
            context: None,
        }
    }

    /// Adds context to this error.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Attaches the offending line unless a more specific context is set.
    #[must_use]
    pub fn or_context(self, line: &str) -> Self {
        if self.context.is_some() {
            self
        } else {
            self.with_context(line)
        }
    }

    /// Returns the coarse class used for client-facing reporting.
    #[must_use]
    pub const fn class(&self) -> ParseErrorClass {
        self.kind.class()
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at line {}, column {}", self.kind, self.line, self.column)?;
        if let Some(ref ctx) = self.context {
            write!(f, ": {ctx}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {}

/// Coarse classification of parse failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorClass {
    /// An unfolded content line exceeded the configured maximum.
    LineTooLong,
    /// The stream exceeded the configured maximum resource size.
    ResourceTooLarge,
    /// The data is not well-formed iCalendar.
    MalformedCalendarData,
    /// The byte source failed.
    Unreadable,
    /// Reading was cancelled by the caller.
    Aborted,
}

/// Kinds of parse errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    LineTooLong,
    ResourceTooLarge,
    /// Reading from the underlying stream failed.
    Io,
    Aborted,
    /// A logical line is not valid UTF-8.
    InvalidUtf8,
    InvalidContentLine,
    MissingPropertyName,
    InvalidPropertyName,
    MissingColon,
    InvalidParameter,
    UnclosedQuote,
    InvalidDate,
    InvalidTime,
    InvalidDateTime,
    InvalidDuration,
    InvalidUtcOffset,
    InvalidInteger,
    InvalidPeriod,
    /// A property or END line appeared outside any component.
    MissingBegin,
    MissingEnd,
    MismatchedComponent,
    /// A top-level component other than VCALENDAR.
    InvalidRoot,
    /// Components nested deeper than the configured maximum.
    NestingTooDeep,
}

impl ParseErrorKind {
    #[must_use]
    pub const fn class(self) -> ParseErrorClass {
        match self {
            Self::LineTooLong => ParseErrorClass::LineTooLong,
            Self::ResourceTooLarge => ParseErrorClass::ResourceTooLarge,
            Self::Io => ParseErrorClass::Unreadable,
            Self::Aborted => ParseErrorClass::Aborted,
            _ => ParseErrorClass::MalformedCalendarData,
        }
    }
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LineTooLong => write!(f, "content line too long"),
            Self::ResourceTooLarge => write!(f, "resource exceeds maximum size"),
            Self::Io => write!(f, "read failure"),
            Self::Aborted => write!(f, "read aborted"),
            Self::InvalidUtf8 => write!(f, "invalid UTF-8"),
            Self::InvalidContentLine => write!(f, "invalid content line format"),
            Self::MissingPropertyName => write!(f, "missing property name"),
            Self::InvalidPropertyName => write!(f, "invalid property name"),
            Self::MissingColon => write!(f, "missing colon separator"),
            Self::InvalidParameter => write!(f, "invalid parameter format"),
            Self::UnclosedQuote => write!(f, "unclosed quoted string"),
            Self::InvalidDate => write!(f, "invalid date format"),
            Self::InvalidTime => write!(f, "invalid time format"),
            Self::InvalidDateTime => write!(f, "invalid date-time format"),
            Self::InvalidDuration => write!(f, "invalid duration format"),
            Self::InvalidUtcOffset => write!(f, "invalid UTC offset format"),
            Self::InvalidInteger => write!(f, "invalid integer value"),
            Self::InvalidPeriod => write!(f, "invalid period format"),
            Self::MissingBegin => write!(f, "missing BEGIN line"),
            Self::MissingEnd => write!(f, "missing END line"),
            Self::MismatchedComponent => write!(f, "mismatched BEGIN/END"),
            Self::InvalidRoot => write!(f, "top-level component is not VCALENDAR"),
            Self::NestingTooDeep => write!(f, "components nested too deeply"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_position_and_context() {
        let err = ParseError::new(ParseErrorKind::MismatchedComponent, 7, 1)
            .with_context("END:VTODO");
        assert_eq!(
            err.to_string(),
            "mismatched BEGIN/END at line 7, column 1: END:VTODO"
        );
    }

    #[test]
    fn classes() {
        assert_eq!(
            ParseError::new(ParseErrorKind::InvalidDate, 1, 1).class(),
            ParseErrorClass::MalformedCalendarData
        );
        assert_eq!(
            ParseErrorKind::ResourceTooLarge.class(),
            ParseErrorClass::ResourceTooLarge
        );
        assert_eq!(ParseErrorKind::LineTooLong.class(), ParseErrorClass::LineTooLong);
    }

    #[test]
    fn or_context_keeps_specific_context() {
        let err = ParseError::new(ParseErrorKind::InvalidDate, 1, 1).with_context("bad month");
        assert_eq!(err.or_context("DTSTART:2024").context.as_deref(), Some("bad month"));
        let err = ParseError::new(ParseErrorKind::InvalidDate, 1, 1);
        assert_eq!(err.or_context("DTSTART:2024").context.as_deref(), Some("DTSTART:2024"));
    }
}
