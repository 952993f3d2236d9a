//! iCalendar RFC 5545 implementation.
//!
//! - `core`: arena-backed component tree and typed values
//! - `parse`: streaming, size-bounded reader and component builder
//! - `build`: serializer with folding and escaping
//! - `expand`: timezone resolution for zoned and floating values
//!
//! ## Example
//!
//! ```rust
//! use calsift_rfc::rfc::ical::{build, parse};
//!
//! let input = "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nBEGIN:VEVENT\r\nUID:a\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";
//! let calendar = parse::parse_str(input).unwrap();
//! let output = build::serialize(&calendar);
//! assert!(output.contains("UID:a"));
//! ```

pub mod build;
pub mod core;
pub mod expand;
pub mod parse;

#[cfg(test)]
mod tests;

pub use build::serialize;
pub use core::{Component, ComponentId, ComponentKind, ICalendar, Parameter, Property, Value};
pub use parse::{ParseError, ParseErrorKind, ParseResult, parse_resource};
