//! iCalendar serializer (RFC 5545).
//!
//! Components and properties are written in document order so that a parsed
//! calendar re-serializes to the same property set.

use super::escape::escape_text;
use super::fold::fold_line;
use crate::rfc::ical::core::{ComponentId, ICalendar, Property, Value};

/// Serializes a calendar to a string, starting at its root.
#[must_use]
pub fn serialize(ical: &ICalendar) -> String {
    serialize_component(ical, ical.root())
}

/// Serializes the subtree rooted at `id`.
#[must_use]
pub fn serialize_component(ical: &ICalendar, id: ComponentId) -> String {
    let mut out = String::new();
    write_component(&mut out, ical, id);
    out
}

fn write_component(out: &mut String, ical: &ICalendar, id: ComponentId) {
    let component = ical.get(id);
    out.push_str(&fold_line(&format!("BEGIN:{}", component.kind)));
    for prop in &component.properties {
        out.push_str(&serialize_property(prop));
    }
    for child in component.children() {
        write_component(out, ical, *child);
    }
    out.push_str(&fold_line(&format!("END:{}", component.kind)));
}

/// Serializes a property to a folded content line.
#[must_use]
pub fn serialize_property(prop: &Property) -> String {
    let mut line = prop.name.clone();
    for param in &prop.params {
        line.push(';');
        line.push_str(&param.to_string());
    }
    line.push(':');
    match &prop.value {
        Value::Text(s) => line.push_str(&escape_text(s)),
        other => line.push_str(&other.to_string()),
    }
    fold_line(&line)
}
