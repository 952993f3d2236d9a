//! Command-line front end: a directory-backed collection and a multistatus
//! writer around the REPORT service.

pub mod cli;
pub mod command;
pub mod error;
pub mod multistatus;
pub mod walk;
