//! Timezone resolution and UTC conversion for iCalendar date-times.
//!
//! A TZID is looked up in this order: VTIMEZONE components visible from the
//! referencing component, then the IANA database (after mapping Windows and
//! legacy aliases with ICU4X). Anything still unknown is read in the floating
//! zone.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{LocalResult, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use icu::time::zone::WindowsParser;
use icu::time::zone::iana::IanaParserExtended;

use super::vtimezone::VTimezone;
use crate::rfc::ical::core::{ComponentId, ComponentKind, Date, DateTime, DateTimeForm, ICalendar};

/// Error during timezone resolution.
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),

    #[error("Invalid VTIMEZONE: {0}")]
    InvalidVTimezone(#[from] super::vtimezone::VTimezoneError),
}

/// A zone wall-clock times can be converted from.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Zone {
    #[default]
    Utc,
    /// IANA zone from the builtin database.
    Named(Tz),
    /// Zone defined by a VTIMEZONE component.
    Defined(Arc<VTimezone>),
}

impl Zone {
    /// Looks up an IANA zone, accepting Windows names and legacy aliases.
    ///
    /// ## Errors
    /// Returns `UnknownTimezone` if no builtin zone matches.
    pub fn named(tzid: &str) -> Result<Self, ConversionError> {
        let normalized = normalize_tzid(tzid);
        Tz::from_str(&normalized)
            .map(Self::Named)
            .map_err(|_e| ConversionError::UnknownTimezone(tzid.to_string()))
    }

    /// Uses the first VTIMEZONE under the root of `cal`.
    ///
    /// This is how a query-level `<timezone>` element is applied.
    ///
    /// ## Errors
    /// Returns an error if there is no VTIMEZONE or it is incomplete.
    pub fn from_calendar(cal: &ICalendar) -> Result<Self, ConversionError> {
        let id = cal
            .children_of_kind(cal.root(), &ComponentKind::Timezone)
            .next()
            .ok_or_else(|| ConversionError::UnknownTimezone("no VTIMEZONE".to_string()))?;
        let vtimezone = VTimezone::parse(cal, id)?;
        Ok(Self::Defined(Arc::new(vtimezone)))
    }

    /// Converts a wall-clock time in this zone to UTC.
    ///
    /// Times inside a DST gap are shifted forward by one hour; times inside a
    /// fold resolve to the earlier instant.
    #[must_use]
    pub fn to_utc(&self, local: NaiveDateTime) -> chrono::DateTime<Utc> {
        match self {
            Self::Utc => Utc.from_utc_datetime(&local),
            Self::Defined(vtimezone) => Utc.from_utc_datetime(&vtimezone.to_utc(local)),
            Self::Named(tz) => match tz.from_local_datetime(&local) {
                LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
                LocalResult::None => {
                    let shifted = local + TimeDelta::hours(1);
                    tz.from_local_datetime(&shifted)
                        .earliest()
                        .map_or_else(|| Utc.from_utc_datetime(&local), |dt| dt.with_timezone(&Utc))
                }
            },
        }
    }
}

/// Resolves the zones of date-time values within one calendar.
///
/// VTIMEZONE lookups are cached by component id, so a resolver must only be
/// used with the calendar it first saw.
#[derive(Debug, Default)]
pub struct TimeZoneResolver {
    named: HashMap<String, Option<Tz>>,
    defined: HashMap<ComponentId, Arc<VTimezone>>,
    floating: Zone,
}

impl TimeZoneResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the zone used for floating values and unresolvable TZIDs.
    #[must_use]
    pub fn with_floating(mut self, floating: Zone) -> Self {
        self.floating = floating;
        self
    }

    #[must_use]
    pub fn floating(&self) -> &Zone {
        &self.floating
    }

    /// Resolves a TZID against the builtin database only.
    ///
    /// ## Errors
    /// Returns `UnknownTimezone` if the TZID cannot be resolved.
    pub fn resolve(&mut self, tzid: &str) -> Result<Tz, ConversionError> {
        let cached = match self.named.get(tzid) {
            Some(cached) => *cached,
            None => {
                let tz = match Zone::named(tzid) {
                    Ok(Zone::Named(tz)) => Some(tz),
                    _ => None,
                };
                self.named.insert(tzid.to_string(), tz);
                tz
            }
        };
        cached.ok_or_else(|| ConversionError::UnknownTimezone(tzid.to_string()))
    }

    /// Returns the zone a TZID referenced from component `at` denotes.
    pub fn zone_for_tzid(&mut self, cal: &ICalendar, at: ComponentId, tzid: &str) -> Zone {
        if let Some(id) = cal.find_timezone(at, tzid) {
            if let Some(defined) = self.defined.get(&id) {
                return Zone::Defined(Arc::clone(defined));
            }
            match VTimezone::parse(cal, id) {
                Ok(vtimezone) => {
                    let defined = Arc::new(vtimezone);
                    self.defined.insert(id, Arc::clone(&defined));
                    return Zone::Defined(defined);
                }
                Err(e) => tracing::warn!(%tzid, error = %e, "Ignoring invalid VTIMEZONE"),
            }
        }

        match self.resolve(tzid) {
            Ok(tz) => Zone::Named(tz),
            Err(_) => {
                tracing::warn!(%tzid, "Unresolved TZID, reading as floating time");
                self.floating.clone()
            }
        }
    }

    /// Returns the zone of a date-time value found in component `at`.
    pub fn zone_for(&mut self, cal: &ICalendar, at: ComponentId, dt: &DateTime) -> Zone {
        match &dt.form {
            DateTimeForm::Utc => Zone::Utc,
            DateTimeForm::Floating => self.floating.clone(),
            DateTimeForm::Zoned { tzid } => self.zone_for_tzid(cal, at, tzid),
        }
    }

    /// Converts a date-time value to UTC.
    ///
    /// Returns `None` if the value names a calendar date that does not exist.
    pub fn to_utc(
        &mut self,
        cal: &ICalendar,
        at: ComponentId,
        dt: &DateTime,
    ) -> Option<chrono::DateTime<Utc>> {
        let local = dt.naive()?;
        Some(self.zone_for(cal, at, dt).to_utc(local))
    }

    /// Converts a DATE value to the UTC instant of its floating midnight.
    pub fn date_to_utc(&self, date: &Date) -> Option<chrono::DateTime<Utc>> {
        let local = date.naive()?.and_time(NaiveTime::MIN);
        Some(self.floating.to_utc(local))
    }
}

/// Normalizes common CalDAV/iCalendar timezone identifiers to IANA names.
///
/// Strips vendor prefixes, maps Windows zone names and canonicalizes IANA
/// aliases. Unknown identifiers are returned unchanged.
#[must_use]
pub fn normalize_tzid(tzid: &str) -> String {
    let stripped = tzid
        .strip_prefix("/mozilla.org/")
        .or_else(|| tzid.strip_prefix("/softwarestudio.org/"))
        .unwrap_or(tzid);

    let iana_parser = IanaParserExtended::new();

    if let Some(tz) = WindowsParser::new().parse(stripped, None)
        && let Some(entry) = iana_parser.iter().find(|entry| entry.time_zone == tz)
    {
        return entry.canonical.to_string();
    }

    let parsed = iana_parser.parse(stripped);
    if parsed.time_zone != icu::time::TimeZone::UNKNOWN {
        return parsed.canonical.to_string();
    }

    stripped.to_string()
}
