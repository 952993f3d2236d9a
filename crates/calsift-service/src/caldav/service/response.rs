//! Per-resource results handed to the multistatus writer.

use calsift_rfc::rfc::dav::core::{Precondition, QualifiedName};

use crate::error::ServiceResult;

/// A property value in a success entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseProp {
    ETag(String),
    /// Serialized `text/calendar` body.
    CalendarData(String),
    /// Name only, answering `DAV:propname`.
    Name(QualifiedName),
}

/// One `DAV:response` of a multistatus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseEntry {
    /// Matched resource with its requested properties. `missing` lists the
    /// requested properties that are not available.
    Found {
        href: String,
        props: Vec<ResponseProp>,
        missing: Vec<QualifiedName>,
    },
    /// A multiget href the walk did not yield.
    NotFound { href: String },
    /// The resource could not be read or evaluated.
    Failed {
        href: String,
        precondition: Option<Precondition>,
        message: String,
    },
}

impl ResponseEntry {
    #[must_use]
    pub fn href(&self) -> &str {
        match self {
            Self::Found { href, .. } | Self::NotFound { href } | Self::Failed { href, .. } => href,
        }
    }

    /// HTTP status of the entry as a whole.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            Self::Found { .. } => 200,
            Self::NotFound { .. } => 404,
            Self::Failed { precondition, .. } => precondition.map_or(500, Precondition::status),
        }
    }
}

/// Serializes report output for the transport.
pub trait ResponseWriter {
    /// Writes one multistatus entry.
    ///
    /// ## Errors
    /// Returns an error if the output cannot be written.
    fn write_entry(&mut self, entry: &ResponseEntry) -> ServiceResult<()>;

    /// Writes the single `text/calendar` body of a free-busy report.
    ///
    /// ## Errors
    /// Returns an error if the output cannot be written.
    fn write_calendar(&mut self, body: &str) -> ServiceResult<()>;
}

/// Collects output in memory.
#[derive(Debug, Default)]
pub struct CollectingWriter {
    pub entries: Vec<ResponseEntry>,
    pub calendar: Option<String>,
}

impl ResponseWriter for CollectingWriter {
    fn write_entry(&mut self, entry: &ResponseEntry) -> ServiceResult<()> {
        self.entries.push(entry.clone());
        Ok(())
    }

    fn write_calendar(&mut self, body: &str) -> ServiceResult<()> {
        self.calendar = Some(body.to_string());
        Ok(())
    }
}
