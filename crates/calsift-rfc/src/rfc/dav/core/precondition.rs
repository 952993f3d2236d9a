//! `CalDAV` precondition codes reported for failed filters and resources.
//!
//! RFC 4791 §7.7 and §7.8 name the XML elements a server returns inside a
//! `DAV:error` body when a REPORT cannot be honored.

use calsift_core::constants::{
    PRECONDITION_MAX_RESOURCE_SIZE, PRECONDITION_SUPPORTED_COLLATION,
    PRECONDITION_VALID_CALENDAR_DATA, PRECONDITION_VALID_FILTER,
};

/// A `CalDAV` precondition violated by a request or a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Precondition {
    /// `CALDAV:valid-filter` (403 Forbidden)
    ValidFilter,
    /// `CALDAV:supported-collation` (403 Forbidden)
    SupportedCollation,
    /// `CALDAV:valid-calendar-data` (500 Internal Server Error)
    ///
    /// A stored resource could not be parsed.
    ValidCalendarData,
    /// `CALDAV:max-resource-size` (507 Insufficient Storage)
    MaxResourceSize,
}

impl Precondition {
    /// Returns the prefixed element name, e.g. `CALDAV:valid-filter`.
    #[must_use]
    pub const fn as_tag(self) -> &'static str {
        match self {
            Self::ValidFilter => PRECONDITION_VALID_FILTER,
            Self::SupportedCollation => PRECONDITION_SUPPORTED_COLLATION,
            Self::ValidCalendarData => PRECONDITION_VALID_CALENDAR_DATA,
            Self::MaxResourceSize => PRECONDITION_MAX_RESOURCE_SIZE,
        }
    }

    /// Returns the element name without its prefix.
    #[must_use]
    pub fn local_name(self) -> &'static str {
        let tag = self.as_tag();
        tag.split_once(':').map_or(tag, |(_, local)| local)
    }

    /// Returns the HTTP status code that accompanies this precondition.
    #[must_use]
    pub const fn status(self) -> u16 {
        match self {
            Self::ValidFilter | Self::SupportedCollation => 403,
            Self::ValidCalendarData => 500,
            Self::MaxResourceSize => 507,
        }
    }
}

impl std::fmt::Display for Precondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_tag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_and_statuses() {
        assert_eq!(Precondition::ValidFilter.as_tag(), "CALDAV:valid-filter");
        assert_eq!(Precondition::SupportedCollation.local_name(), "supported-collation");
        assert_eq!(Precondition::SupportedCollation.status(), 403);
        assert_eq!(Precondition::ValidCalendarData.status(), 500);
        assert_eq!(Precondition::MaxResourceSize.to_string(), "CALDAV:max-resource-size");
    }
}
