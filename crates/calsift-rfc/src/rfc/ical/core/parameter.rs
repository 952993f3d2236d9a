//! iCalendar parameter types (RFC 5545 §3.2).

use std::fmt;

use crate::rfc::ical::build::escape_param_value;

/// Parameter names defined by RFC 5545 §3.2.
const STANDARD_PARAMETERS: &[&str] = &[
    "ALTREP",
    "CN",
    "CUTYPE",
    "DELEGATED-FROM",
    "DELEGATED-TO",
    "DIR",
    "ENCODING",
    "FMTTYPE",
    "FBTYPE",
    "LANGUAGE",
    "MEMBER",
    "PARTSTAT",
    "RANGE",
    "RELATED",
    "RELTYPE",
    "ROLE",
    "RSVP",
    "SENT-BY",
    "TZID",
    "VALUE",
];

/// A single iCalendar property parameter.
///
/// For example: `DTSTART;TZID=America/New_York:20260123T120000` carries a
/// parameter named `TZID` with value `America/New_York`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    /// Parameter name (normalized to uppercase).
    pub name: String,
    /// Parameter values. Most parameters have one value, but some
    /// (like MEMBER) can have multiple comma-separated values.
    pub values: Vec<String>,
}

impl Parameter {
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into().to_ascii_uppercase(),
            values: vec![value.into()],
        }
    }

    #[must_use]
    pub fn with_values(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into().to_ascii_uppercase(),
            values,
        }
    }

    /// Returns the first (and usually only) value.
    #[must_use]
    pub fn value(&self) -> Option<&str> {
        self.values.first().map(String::as_str)
    }

    /// Returns whether the parameter has the specified value (case-insensitive).
    #[must_use]
    pub fn has_value(&self, value: &str) -> bool {
        self.values.iter().any(|v| v.eq_ignore_ascii_case(value))
    }

    /// Returns whether this is an `X-` or IANA-registered extension parameter,
    /// i.e. anything outside the RFC 5545 set.
    #[must_use]
    pub fn is_extension(&self) -> bool {
        !STANDARD_PARAMETERS.contains(&self.name.as_str())
    }

    #[must_use]
    pub fn tzid(tzid: impl Into<String>) -> Self {
        Self::new("TZID", tzid)
    }

    #[must_use]
    pub fn fbtype(fbtype: impl Into<String>) -> Self {
        Self::new("FBTYPE", fbtype)
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.values.is_empty() {
            write!(f, "=")?;
            for (i, value) in self.values.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                write!(f, "{}", escape_param_value(value))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_detection() {
        assert!(Parameter::new("X-CUSTOM", "1").is_extension());
        assert!(Parameter::new("EMAIL", "a@example.com").is_extension());
        assert!(!Parameter::new("partstat", "ACCEPTED").is_extension());
    }

    #[test]
    fn display_quotes_when_needed() {
        assert_eq!(Parameter::new("CN", "Doe, Jane").to_string(), "CN=\"Doe, Jane\"");
        let member = Parameter::with_values(
            "MEMBER",
            vec!["mailto:a@example.com".into(), "mailto:b@example.com".into()],
        );
        assert_eq!(
            member.to_string(),
            "MEMBER=\"mailto:a@example.com\",\"mailto:b@example.com\""
        );
    }
}
