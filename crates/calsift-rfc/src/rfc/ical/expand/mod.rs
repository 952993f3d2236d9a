//! Timezone resolution for zoned and floating date-times.

mod timezone;
mod vtimezone;

pub use timezone::{ConversionError, TimeZoneResolver, Zone, normalize_tzid};
pub use vtimezone::{Observance, ObservanceKind, VTimezone, VTimezoneError};
