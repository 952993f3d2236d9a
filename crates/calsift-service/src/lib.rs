//! Filter evaluation, projection, free-busy aggregation and REPORT
//! orchestration over parsed calendar resources.

pub mod caldav;
pub mod error;
