//! REPORT processing over the external resource walk and response writer.

pub mod report;
pub mod response;
pub mod walk;
