//! Recurrence expansion into UTC instances.
//!
//! RRULE text is handed to the `rrule` crate. Rules anchored in an IANA zone
//! are expanded in that zone; every other anchor (VTIMEZONE-defined or
//! floating) is expanded on its wall clock and converted per instance.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Utc};
use rrule::{RRule, Tz, Unvalidated};

use calsift_rfc::rfc::ical::core::{ComponentId, Date, ICalendar, Property, Value};
use calsift_rfc::rfc::ical::expand::{TimeZoneResolver, Zone};

/// A DATE or DATE-TIME value resolved to an absolute instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimePoint {
    pub at: DateTime<Utc>,
    /// The value was a DATE; `at` is its floating midnight.
    pub is_date: bool,
}

/// Resolves every DATE or DATE-TIME carried by `value`.
///
/// Periods contribute their start. Values of other types yield nothing.
pub fn resolve_value(
    cal: &ICalendar,
    at: ComponentId,
    value: &Value,
    resolver: &mut TimeZoneResolver,
) -> Vec<TimePoint> {
    match value {
        Value::Date(d) => date_point(d, resolver).into_iter().collect(),
        Value::DateList(list) => list.iter().filter_map(|d| date_point(d, resolver)).collect(),
        Value::DateTime(dt) => resolver
            .to_utc(cal, at, dt)
            .map(|at| TimePoint { at, is_date: false })
            .into_iter()
            .collect(),
        Value::DateTimeList(list) => list
            .iter()
            .filter_map(|dt| resolver.to_utc(cal, at, dt))
            .map(|at| TimePoint { at, is_date: false })
            .collect(),
        Value::Period(p) => resolver
            .to_utc(cal, at, p.start())
            .map(|at| TimePoint { at, is_date: false })
            .into_iter()
            .collect(),
        Value::PeriodList(list) => list
            .iter()
            .filter_map(|p| resolver.to_utc(cal, at, p.start()))
            .map(|at| TimePoint { at, is_date: false })
            .collect(),
        Value::Duration(_)
        | Value::Integer(_)
        | Value::Recur(_)
        | Value::Text(_)
        | Value::UtcOffset(_)
        | Value::Unknown(_) => Vec::new(),
    }
}

fn date_point(date: &Date, resolver: &TimeZoneResolver) -> Option<TimePoint> {
    resolver
        .date_to_utc(date)
        .map(|at| TimePoint { at, is_date: true })
}

/// Resolves the first instant of a property found on component `at`.
pub fn resolve_property(
    cal: &ICalendar,
    at: ComponentId,
    prop: &Property,
    resolver: &mut TimeZoneResolver,
) -> Option<TimePoint> {
    resolve_value(cal, at, &prop.value, resolver).into_iter().next()
}

/// Resolves the named property of component `id`.
pub fn property_time(
    cal: &ICalendar,
    id: ComponentId,
    name: &str,
    resolver: &mut TimeZoneResolver,
) -> Option<TimePoint> {
    let prop = cal.get(id).get_property(name)?;
    resolve_property(cal, id, prop, resolver)
}

/// Bounds for one expansion.
#[derive(Debug, Clone, Copy)]
pub struct ExpansionWindow {
    pub from: DateTime<Utc>,
    pub until: DateTime<Utc>,
    pub max_instances: u16,
}

/// ## Summary
/// Returns the start instants of component `id` that fall in the window.
///
/// DTSTART always counts as the first instance. RRULE instances and RDATEs
/// are added, then EXDATEs and instances overridden by a sibling component
/// with the same UID and a RECURRENCE-ID are removed. A component without
/// DTSTART has no instances.
#[tracing::instrument(skip(cal, resolver), fields(component = %cal.get(id).kind))]
pub fn expand_starts(
    cal: &ICalendar,
    id: ComponentId,
    resolver: &mut TimeZoneResolver,
    window: &ExpansionWindow,
) -> Vec<TimePoint> {
    let component = cal.get(id);
    let Some(dtstart) = component.get_property("DTSTART") else {
        return Vec::new();
    };
    let Some(first) = resolve_property(cal, id, dtstart, resolver) else {
        tracing::debug!("DTSTART does not resolve to an instant");
        return Vec::new();
    };

    let mut starts = BTreeSet::from([first.at]);

    for rule in component.get_properties("RRULE") {
        let Value::Recur(text) = &rule.value else {
            continue;
        };
        starts.extend(expand_rule(cal, id, dtstart, text, resolver, window));
    }
    for rdate in component.get_properties("RDATE") {
        starts.extend(
            resolve_value(cal, id, &rdate.value, resolver)
                .into_iter()
                .map(|p| p.at),
        );
    }
    for exdate in component.get_properties("EXDATE") {
        for excluded in resolve_value(cal, id, &exdate.value, resolver) {
            starts.remove(&excluded.at);
        }
    }
    if !component.has_property("RECURRENCE-ID") {
        for overridden in overridden_instances(cal, id, resolver) {
            starts.remove(&overridden);
        }
    }

    let limit = usize::from(window.max_instances);
    let instances: Vec<TimePoint> = starts
        .into_iter()
        .filter(|at| *at >= window.from && *at <= window.until)
        .take(limit)
        .map(|at| TimePoint {
            at,
            is_date: first.is_date,
        })
        .collect();
    tracing::trace!(count = instances.len(), "Expanded instances");
    instances
}

/// RECURRENCE-ID instants of the overrides of a master component.
fn overridden_instances(
    cal: &ICalendar,
    id: ComponentId,
    resolver: &mut TimeZoneResolver,
) -> Vec<DateTime<Utc>> {
    let component = cal.get(id);
    let (Some(uid), Some(parent)) = (component.uid(), component.parent()) else {
        return Vec::new();
    };
    let mut overridden = Vec::new();
    for sibling in cal.children_of_kind(parent, &component.kind) {
        if sibling == id || cal.get(sibling).uid() != Some(uid) {
            continue;
        }
        if let Some(point) = property_time(cal, sibling, "RECURRENCE-ID", resolver) {
            overridden.push(point.at);
        }
    }
    overridden
}

/// Zone and wall-clock time the rule is anchored at.
fn anchor(
    cal: &ICalendar,
    id: ComponentId,
    dtstart: &Property,
    resolver: &mut TimeZoneResolver,
) -> Option<(Zone, NaiveDateTime)> {
    match &dtstart.value {
        Value::DateTime(dt) => Some((resolver.zone_for(cal, id, dt), dt.naive()?)),
        Value::Date(d) => Some((
            resolver.floating().clone(),
            d.naive()?.and_time(NaiveTime::MIN),
        )),
        _ => None,
    }
}

fn expand_rule(
    cal: &ICalendar,
    id: ComponentId,
    dtstart: &Property,
    rule_text: &str,
    resolver: &mut TimeZoneResolver,
    window: &ExpansionWindow,
) -> Vec<DateTime<Utc>> {
    let Some((zone, local)) = anchor(cal, id, dtstart, resolver) else {
        return Vec::new();
    };

    // Wall-clock expansion runs in UTC; pad the window by a day so the
    // zone offset cannot push edge instances out.
    let (dt_start, lower, upper) = match &zone {
        Zone::Named(named) => {
            let tz = Tz::Tz(*named);
            let Some(dt_start) = tz.from_local_datetime(&local).earliest() else {
                return Vec::new();
            };
            (
                dt_start,
                window.from.with_timezone(&tz),
                window.until.with_timezone(&tz),
            )
        }
        Zone::Utc | Zone::Defined(_) => {
            let pad = TimeDelta::days(1);
            (
                Tz::UTC.from_utc_datetime(&local),
                Tz::UTC.from_utc_datetime(&window.from.naive_utc()) - pad,
                Tz::UTC.from_utc_datetime(&window.until.naive_utc()) + pad,
            )
        }
    };

    let rule = match rule_text.parse::<RRule<Unvalidated>>() {
        Ok(rule) => rule,
        Err(e) => {
            tracing::warn!(rrule = %rule_text, error = %e, "Ignoring unparseable RRULE");
            return Vec::new();
        }
    };
    let set = match rule.build(dt_start) {
        Ok(set) => set,
        Err(e) => {
            tracing::warn!(rrule = %rule_text, error = %e, "Ignoring invalid RRULE");
            return Vec::new();
        }
    };

    let result = set
        .after(lower - TimeDelta::seconds(1))
        .before(upper)
        .all(window.max_instances);
    if result.limited {
        tracing::debug!(
            rrule = %rule_text,
            max_instances = window.max_instances,
            "Recurrence expansion hit the instance limit"
        );
    }
    if result.dates.is_empty() && is_unbounded(rule_text) && dt_start < lower {
        // An endless rule rarely runs dry; more likely rrule hit its own
        // iteration cap before reaching the window.
        tracing::warn!(
            rrule = %rule_text,
            dtstart = %dt_start.with_timezone(&Utc),
            from = %window.from,
            "Unbounded RRULE produced no instances in window"
        );
    }
    tracing::trace!(rrule = %rule_text, count = result.dates.len(), "Expanded RRULE");

    result
        .dates
        .iter()
        .map(|occurrence| zone.to_utc(occurrence.naive_local()))
        .collect()
}

/// Whether a rule has neither COUNT nor UNTIL.
fn is_unbounded(rule_text: &str) -> bool {
    !rule_text.split(';').any(|part| {
        part.split_once('=').is_some_and(|(name, _)| {
            let name = name.trim();
            name.eq_ignore_ascii_case("COUNT") || name.eq_ignore_ascii_case("UNTIL")
        })
    })
}
