//! `CalDAV` REPORT requests (RFC 4791 §7).

pub mod core;
pub mod parse;
