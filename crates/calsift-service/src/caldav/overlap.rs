//! Time-range overlap tests (RFC 4791 §9.9 and Appendix B).

use chrono::{DateTime, TimeDelta, Utc};

use calsift_rfc::rfc::dav::core::TimeRange;
use calsift_rfc::rfc::ical::core::{
    ComponentId, ComponentKind, Duration, ICalendar, Period, Property, Value,
};
use calsift_rfc::rfc::ical::expand::{TimeZoneResolver, Zone};

use super::recurrence::{
    ExpansionWindow, TimePoint, expand_starts, property_time, resolve_value,
};

/// How long each instance of a VEVENT lasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventSpan {
    /// DTEND given; the offset from DTSTART.
    Until(TimeDelta),
    /// DURATION given.
    Lasting(TimeDelta),
    /// DATE-valued DTSTART alone: one day.
    AllDay,
    /// DATE-TIME DTSTART alone: a single instant.
    Instant,
}

impl EventSpan {
    /// Length of one instance.
    #[must_use]
    pub fn length(self) -> TimeDelta {
        match self {
            Self::Until(d) | Self::Lasting(d) => d.max(TimeDelta::zero()),
            Self::AllDay => TimeDelta::days(1),
            Self::Instant => TimeDelta::zero(),
        }
    }

    fn overlaps(self, range: &TimeRange, start: DateTime<Utc>) -> bool {
        match self {
            Self::Until(delta) => range.overlaps(start, shift(start, delta)),
            Self::Lasting(d) if d > TimeDelta::zero() => range.overlaps(start, shift(start, d)),
            Self::Lasting(_) | Self::Instant => range.contains(start),
            Self::AllDay => range.overlaps(start, shift(start, TimeDelta::days(1))),
        }
    }
}

/// Adds `delta` without overflowing the representable range.
fn shift(at: DateTime<Utc>, delta: TimeDelta) -> DateTime<Utc> {
    at.checked_add_signed(delta).unwrap_or(if delta < TimeDelta::zero() {
        DateTime::<Utc>::MIN_UTC
    } else {
        DateTime::<Utc>::MAX_UTC
    })
}

/// Per-calendar state for time-based tests.
///
/// Owns the timezone resolver, so one context serves exactly one calendar.
#[derive(Debug)]
pub struct TimeContext<'a> {
    pub cal: &'a ICalendar,
    resolver: TimeZoneResolver,
    max_instances: u16,
}

impl<'a> TimeContext<'a> {
    #[must_use]
    pub fn new(cal: &'a ICalendar, floating: Zone, max_instances: u16) -> Self {
        Self {
            cal,
            resolver: TimeZoneResolver::new().with_floating(floating),
            max_instances,
        }
    }

    fn time_of(&mut self, id: ComponentId, name: &str) -> Option<TimePoint> {
        property_time(self.cal, id, name, &mut self.resolver)
    }

    fn duration_of(&self, id: ComponentId) -> Option<TimeDelta> {
        self.cal
            .get(id)
            .get_property("DURATION")
            .and_then(Property::as_duration)
            .map(Duration::as_time_delta)
    }

    fn starts(
        &mut self,
        id: ComponentId,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Vec<TimePoint> {
        let window = ExpansionWindow {
            from,
            until,
            max_instances: self.max_instances,
        };
        expand_starts(self.cal, id, &mut self.resolver, &window)
    }

    /// Starts of the instances that may touch `range`, given their length.
    fn starts_near(&mut self, id: ComponentId, range: &TimeRange, length: TimeDelta) -> Vec<TimePoint> {
        let from = shift(range.start_or_min(), -length);
        let until = range.end_or_max();
        self.starts(id, from, until)
    }

    /// ## Summary
    /// Tests a component against a time-range using the rule for its kind.
    ///
    /// VCALENDAR matches when any child does. Kinds without a rule never
    /// match.
    pub fn component_overlaps(&mut self, id: ComponentId, range: &TimeRange) -> bool {
        let kind = self.cal.get(id).kind.clone();
        let overlaps = match &kind {
            ComponentKind::Calendar => {
                let children = self.cal.get(id).children().to_vec();
                children
                    .into_iter()
                    .any(|child| self.component_overlaps(child, range))
            }
            ComponentKind::Event => self.event_overlaps(id, range),
            ComponentKind::Todo => self.todo_overlaps(id, range),
            ComponentKind::Journal => self.journal_overlaps(id, range),
            ComponentKind::FreeBusy => self.freebusy_overlaps(id, range),
            ComponentKind::Alarm => self.alarm_overlaps(id, range),
            _ => false,
        };
        tracing::trace!(component = %kind, overlaps, "Time-range test");
        overlaps
    }

    /// Tests a DATE or DATE-TIME property: `start <= value < end`.
    ///
    /// Any value of a list counts. Non-temporal properties never match.
    pub fn property_overlaps(&mut self, id: ComponentId, prop: &Property, range: &TimeRange) -> bool {
        if !prop.value.is_temporal() {
            return false;
        }
        resolve_value(self.cal, id, &prop.value, &mut self.resolver)
            .iter()
            .any(|point| range.contains(point.at))
    }

    /// Returns the span kind of a VEVENT, or `None` without DTSTART.
    pub fn event_span(&mut self, id: ComponentId) -> Option<(TimePoint, EventSpan)> {
        let start = self.time_of(id, "DTSTART")?;
        let span = if let Some(end) = self.time_of(id, "DTEND") {
            EventSpan::Until(end.at - start.at)
        } else if let Some(duration) = self.duration_of(id) {
            EventSpan::Lasting(duration)
        } else if start.is_date {
            EventSpan::AllDay
        } else {
            EventSpan::Instant
        };
        Some((start, span))
    }

    /// Returns `[start, end)` of every VEVENT instance that overlaps `range`.
    ///
    /// Zero-length instances are left out.
    pub fn event_intervals(
        &mut self,
        id: ComponentId,
        range: &TimeRange,
    ) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
        let Some((_, span)) = self.event_span(id) else {
            return Vec::new();
        };
        let length = span.length();
        if length <= TimeDelta::zero() {
            return Vec::new();
        }
        self.starts_near(id, range, length)
            .into_iter()
            .map(|point| (point.at, shift(point.at, length)))
            .filter(|(start, end)| range.overlaps(*start, *end))
            .collect()
    }

    fn event_overlaps(&mut self, id: ComponentId, range: &TimeRange) -> bool {
        let Some((_, span)) = self.event_span(id) else {
            return false;
        };
        self.starts_near(id, range, span.length())
            .iter()
            .any(|point| span.overlaps(range, point.at))
    }

    fn todo_overlaps(&mut self, id: ComponentId, range: &TimeRange) -> bool {
        let (qs, qe) = (range.start_or_min(), range.end_or_max());
        let start = self.time_of(id, "DTSTART");
        let due = self.time_of(id, "DUE");
        let duration = self.duration_of(id);

        match (start, duration, due) {
            (Some(_), Some(duration), _) => self
                .starts_near(id, range, duration)
                .iter()
                .any(|s| {
                    let end = shift(s.at, duration);
                    qs <= end && (qe > s.at || qe >= end)
                }),
            (Some(start), None, Some(due)) => {
                let delta = due.at - start.at;
                self.starts_near(id, range, delta.max(TimeDelta::zero()))
                    .iter()
                    .any(|s| {
                        let due = shift(s.at, delta);
                        (qs < due || qs <= s.at) && (qe > s.at || qe >= due)
                    })
            }
            (Some(_), None, None) => self
                .starts_near(id, range, TimeDelta::zero())
                .iter()
                .any(|s| qs <= s.at && qe > s.at),
            (None, _, Some(due)) => qs < due.at && qe >= due.at,
            (None, _, None) => {
                let completed = self.time_of(id, "COMPLETED").map(|p| p.at);
                let created = self.time_of(id, "CREATED").map(|p| p.at);
                match (completed, created) {
                    (Some(completed), Some(created)) => {
                        (qs <= created || qs <= completed) && (qe >= created || qe >= completed)
                    }
                    (Some(completed), None) => qs <= completed && qe >= completed,
                    (None, Some(created)) => qe > created,
                    (None, None) => true,
                }
            }
        }
    }

    fn journal_overlaps(&mut self, id: ComponentId, range: &TimeRange) -> bool {
        let Some(start) = self.time_of(id, "DTSTART") else {
            return false;
        };
        let effective = if start.is_date {
            TimeDelta::days(1)
        } else {
            TimeDelta::zero()
        };
        let (qs, qe) = (range.start_or_min(), range.end_or_max());
        self.starts_near(id, range, effective)
            .iter()
            .any(|s| qs <= shift(s.at, effective) && qe > s.at)
    }

    fn freebusy_overlaps(&mut self, id: ComponentId, range: &TimeRange) -> bool {
        let (qs, qe) = (range.start_or_min(), range.end_or_max());
        if let (Some(start), Some(end)) = (self.time_of(id, "DTSTART"), self.time_of(id, "DTEND")) {
            return qs <= end.at && qe > start.at;
        }
        self.freebusy_periods(id)
            .iter()
            .any(|(_, start, end)| range.overlaps(*start, *end))
    }

    /// Resolves the FREEBUSY periods of a component with their property.
    pub fn freebusy_periods(
        &mut self,
        id: ComponentId,
    ) -> Vec<(&'a Property, DateTime<Utc>, DateTime<Utc>)> {
        let cal = self.cal;
        let mut periods = Vec::new();
        for prop in cal.get(id).get_properties("FREEBUSY") {
            for period in prop.as_periods() {
                if let Some((start, end)) = self.period_span(id, period) {
                    periods.push((prop, start, end));
                }
            }
        }
        periods
    }

    fn period_span(
        &mut self,
        id: ComponentId,
        period: &Period,
    ) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let start = self.resolver.to_utc(self.cal, id, period.start())?;
        let end = match period {
            Period::Explicit { end, .. } => self.resolver.to_utc(self.cal, id, end)?,
            Period::Duration { duration, .. } => shift(start, duration.as_time_delta()),
        };
        Some((start, end))
    }

    fn alarm_overlaps(&mut self, id: ComponentId, range: &TimeRange) -> bool {
        let cal = self.cal;
        let alarm = cal.get(id);
        let Some(trigger) = alarm.get_property("TRIGGER") else {
            return false;
        };

        let repeat = alarm
            .get_property("REPEAT")
            .and_then(Property::as_integer)
            .and_then(|n| u16::try_from(n).ok())
            .unwrap_or(0);
        let interval = self.duration_of(id).unwrap_or_else(TimeDelta::zero);
        let repeats = if interval > TimeDelta::zero() { repeat } else { 0 };
        let fires = |base: DateTime<Utc>| {
            (0..=i32::from(repeats)).map(move |k| shift(base, interval * k))
        };

        let bases: Vec<DateTime<Utc>> = match &trigger.value {
            Value::Duration(offset) => {
                let Some(parent) = alarm.parent() else {
                    return false;
                };
                let related_end = trigger
                    .get_param_value("RELATED")
                    .is_some_and(|r| r.eq_ignore_ascii_case("END"));
                let offset = offset.as_time_delta();
                if related_end
                    && cal.get(parent).kind == ComponentKind::Todo
                    && self.time_of(parent, "DTSTART").is_none()
                {
                    // No DTSTART to expand from: the end is DUE itself.
                    return self
                        .time_of(parent, "DUE")
                        .into_iter()
                        .flat_map(|due| fires(shift(due.at, offset)))
                        .any(|at| range.contains(at));
                }
                let reach = offset.abs() + interval * i32::from(repeats);
                let to_end = self.parent_length(parent);
                let from = shift(range.start_or_min(), -(reach + to_end));
                let until = shift(range.end_or_max(), reach);
                self.starts(parent, from, until)
                    .into_iter()
                    .map(|s| {
                        let anchor = if related_end { shift(s.at, to_end) } else { s.at };
                        shift(anchor, offset)
                    })
                    .collect()
            }
            value => resolve_value(cal, id, value, &mut self.resolver)
                .into_iter()
                .map(|p| p.at)
                .collect(),
        };

        bases
            .into_iter()
            .flat_map(fires)
            .any(|at| range.contains(at))
    }

    /// Offset from an instance start to its end, for `RELATED=END`.
    fn parent_length(&mut self, parent: ComponentId) -> TimeDelta {
        match self.cal.get(parent).kind {
            ComponentKind::Event => self
                .event_span(parent)
                .map_or_else(TimeDelta::zero, |(_, span)| span.length()),
            ComponentKind::Todo => {
                if let Some(duration) = self.duration_of(parent) {
                    return duration;
                }
                match (self.time_of(parent, "DTSTART"), self.time_of(parent, "DUE")) {
                    (Some(start), Some(due)) => due.at - start.at,
                    _ => TimeDelta::zero(),
                }
            }
            _ => TimeDelta::zero(),
        }
    }
}

#[cfg(test)]
#[path = "overlap_tests.rs"]
mod tests;
