//! Multistatus XML serialization.

use std::io::Write;

use calsift_core::constants::{CALDAV_NAMESPACE, DAV_NAMESPACE};
use calsift_rfc::rfc::dav::core::{Precondition, QualifiedName};
use calsift_service::caldav::{ResponseEntry, ResponseProp, ResponseWriter};
use calsift_service::error::{ServiceError, ServiceResult};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

/// Streams REPORT output as a `DAV:multistatus` document, or as a bare
/// `text/calendar` body for free-busy reports.
///
/// The document is opened on the first entry and closed by
/// [`finish`](Self::finish).
pub struct MultistatusWriter<W: Write> {
    writer: Writer<W>,
    opened: bool,
    calendar: bool,
}

impl<W: Write> MultistatusWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: Writer::new(inner),
            opened: false,
            calendar: false,
        }
    }

    /// ## Summary
    /// Closes the multistatus element and returns the sink.
    ///
    /// A report that produced no entries still yields an empty multistatus.
    ///
    /// ## Errors
    /// Returns an error if writing fails.
    pub fn finish(mut self) -> ServiceResult<W> {
        if !self.calendar {
            self.close().map_err(writer_error)?;
        }
        Ok(self.writer.into_inner())
    }

    fn close(&mut self) -> Result<(), quick_xml::Error> {
        self.open()?;
        self.writer
            .write_event(Event::End(BytesEnd::new("D:multistatus")))?;
        Ok(())
    }

    fn open(&mut self) -> Result<(), quick_xml::Error> {
        if self.opened {
            return Ok(());
        }
        self.writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

        let mut elem = BytesStart::new("D:multistatus");
        elem.push_attribute(("xmlns:D", DAV_NAMESPACE));
        elem.push_attribute(("xmlns:C", CALDAV_NAMESPACE));
        self.writer.write_event(Event::Start(elem))?;
        self.opened = true;
        Ok(())
    }
}

impl<W: Write> ResponseWriter for MultistatusWriter<W> {
    fn write_entry(&mut self, entry: &ResponseEntry) -> ServiceResult<()> {
        self.open().map_err(writer_error)?;
        write_response(&mut self.writer, entry).map_err(writer_error)
    }

    fn write_calendar(&mut self, body: &str) -> ServiceResult<()> {
        self.calendar = true;
        self.writer.get_mut().write_all(body.as_bytes())?;
        Ok(())
    }
}

fn writer_error(err: quick_xml::Error) -> ServiceError {
    ServiceError::WriterError(err.to_string())
}

/// Returns the HTTP status line for a response status code.
#[must_use]
pub fn status_line(code: u16) -> String {
    let reason = match code {
        200 => "OK",
        403 => "Forbidden",
        404 => "Not Found",
        507 => "Insufficient Storage",
        _ => "Internal Server Error",
    };
    format!("HTTP/1.1 {code} {reason}")
}

/// Writes a single response element.
fn write_response<W: Write>(
    writer: &mut Writer<W>,
    entry: &ResponseEntry,
) -> Result<(), quick_xml::Error> {
    writer.write_event(Event::Start(BytesStart::new("D:response")))?;
    write_text_element(writer, "D:href", entry.href())?;

    match entry {
        ResponseEntry::Found { props, missing, .. } => {
            if !props.is_empty() || missing.is_empty() {
                writer.write_event(Event::Start(BytesStart::new("D:propstat")))?;
                writer.write_event(Event::Start(BytesStart::new("D:prop")))?;
                for prop in props {
                    write_property(writer, prop)?;
                }
                writer.write_event(Event::End(BytesEnd::new("D:prop")))?;
                write_text_element(writer, "D:status", &status_line(200))?;
                writer.write_event(Event::End(BytesEnd::new("D:propstat")))?;
            }
            if !missing.is_empty() {
                writer.write_event(Event::Start(BytesStart::new("D:propstat")))?;
                writer.write_event(Event::Start(BytesStart::new("D:prop")))?;
                for name in missing {
                    write_empty(writer, name)?;
                }
                writer.write_event(Event::End(BytesEnd::new("D:prop")))?;
                write_text_element(writer, "D:status", &status_line(404))?;
                writer.write_event(Event::End(BytesEnd::new("D:propstat")))?;
            }
        }
        ResponseEntry::NotFound { .. } => {
            write_text_element(writer, "D:status", &status_line(entry.status()))?;
        }
        ResponseEntry::Failed {
            precondition,
            message,
            ..
        } => {
            write_text_element(writer, "D:status", &status_line(entry.status()))?;
            if let Some(precondition) = precondition {
                write_precondition(writer, *precondition)?;
            }
            write_text_element(writer, "D:responsedescription", message)?;
        }
    }

    writer.write_event(Event::End(BytesEnd::new("D:response")))?;
    Ok(())
}

fn write_property<W: Write>(
    writer: &mut Writer<W>,
    prop: &ResponseProp,
) -> Result<(), quick_xml::Error> {
    match prop {
        ResponseProp::ETag(etag) => write_text_element(writer, "D:getetag", etag),
        ResponseProp::CalendarData(data) => write_text_element(writer, "C:calendar-data", data),
        ResponseProp::Name(name) => write_empty(writer, name),
    }
}

fn write_precondition<W: Write>(
    writer: &mut Writer<W>,
    precondition: Precondition,
) -> Result<(), quick_xml::Error> {
    writer.write_event(Event::Start(BytesStart::new("D:error")))?;
    let name = format!("C:{}", precondition.local_name());
    writer.write_event(Event::Empty(BytesStart::new(name.as_str())))?;
    writer.write_event(Event::End(BytesEnd::new("D:error")))?;
    Ok(())
}

/// Writes an empty element, declaring its namespace when it has no prefix.
fn write_empty<W: Write>(
    writer: &mut Writer<W>,
    name: &QualifiedName,
) -> Result<(), quick_xml::Error> {
    let elem = match namespace_prefix(&name.namespace) {
        Some(prefix) => BytesStart::new(format!("{prefix}:{}", name.local)),
        None => {
            let mut elem = BytesStart::new(name.local.as_str());
            elem.push_attribute(("xmlns", name.namespace.as_str()));
            elem
        }
    };
    writer.write_event(Event::Empty(elem))?;
    Ok(())
}

fn namespace_prefix(namespace: &str) -> Option<&'static str> {
    match namespace {
        DAV_NAMESPACE => Some("D"),
        CALDAV_NAMESPACE => Some("C"),
        _ => None,
    }
}

/// Writes a simple text element.
fn write_text_element<W: Write>(
    writer: &mut Writer<W>,
    name: &str,
    text: &str,
) -> Result<(), quick_xml::Error> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}
