//! iCalendar core models (RFC 5545).
//!
//! Components are stored in an arena owned by [`ICalendar`]; children and
//! parent links are [`ComponentId`] indices into it.

mod component;
mod datetime;
mod duration;
mod parameter;
mod property;
mod value;

pub use component::{Component, ComponentId, ComponentKind, ICalendar, merge_calendars};
pub use datetime::{DateTime, DateTimeForm, UtcOffset};
pub use duration::Duration;
pub use parameter::Parameter;
pub use property::{ContentLine, Property};
pub use value::{Date, Period, Value};
