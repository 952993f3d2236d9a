//! Free-busy aggregation for `free-busy-query` (RFC 4791 §7.10).

use chrono::{DateTime, Utc};

use calsift_rfc::rfc::dav::core::TimeRange;
use calsift_rfc::rfc::ical::core::{
    Component, ComponentKind, DateTime as ICalDateTime, ICalendar, Parameter, Period, Property,
    Value,
};

use super::evaluator::EvalOptions;
use super::overlap::TimeContext;

const FBTYPE_BUSY: &str = "BUSY";
const FBTYPE_BUSY_TENTATIVE: &str = "BUSY-TENTATIVE";
const FBTYPE_FREE: &str = "FREE";

#[derive(Debug, Clone, PartialEq, Eq)]
struct BusyPeriod {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    fbtype: String,
}

/// Returns the FBTYPE a VEVENT contributes, or `None` if it leaves the time
/// free.
///
/// Transparent and cancelled events contribute nothing. Unknown STATUS
/// values count as `BUSY`.
#[must_use]
pub fn event_fbtype(event: &Component) -> Option<&'static str> {
    let transparent = event
        .text_of("TRANSP")
        .is_some_and(|t| t.trim().eq_ignore_ascii_case("TRANSPARENT"));
    if transparent {
        return None;
    }
    match event.text_of("STATUS").map(str::trim) {
        Some(s) if s.eq_ignore_ascii_case("CANCELLED") => None,
        Some(s) if s.eq_ignore_ascii_case("TENTATIVE") => Some(FBTYPE_BUSY_TENTATIVE),
        _ => Some(FBTYPE_BUSY),
    }
}

/// Accumulates busy time from many calendars into one VFREEBUSY.
#[derive(Debug)]
pub struct FreeBusyAggregator {
    range: TimeRange,
    options: EvalOptions,
    periods: Vec<BusyPeriod>,
}

impl FreeBusyAggregator {
    #[must_use]
    pub fn new(range: TimeRange, options: EvalOptions) -> Self {
        Self {
            range,
            options,
            periods: Vec::new(),
        }
    }

    /// ## Summary
    /// Adds the busy time of one calendar.
    ///
    /// VEVENTs contribute every expanded instance overlapping the range.
    /// Stored VFREEBUSY components contribute their non-`FREE` periods.
    /// Spans are clipped to the range. Returns how many periods were added.
    #[tracing::instrument(skip_all)]
    pub fn add_calendar(&mut self, cal: &ICalendar) -> usize {
        let before = self.periods.len();
        let mut time = TimeContext::new(cal, self.options.floating.clone(), self.options.max_instances);

        for &id in cal.root_component().children() {
            let component = cal.get(id);
            match component.kind {
                ComponentKind::Event => {
                    let Some(fbtype) = event_fbtype(component) else {
                        tracing::trace!(uid = ?component.uid(), "Event leaves time free");
                        continue;
                    };
                    for (start, end) in time.event_intervals(id, &self.range) {
                        self.push(start, end, fbtype);
                    }
                }
                ComponentKind::FreeBusy => {
                    for (prop, start, end) in time.freebusy_periods(id) {
                        let fbtype = prop.get_param_value("FBTYPE").unwrap_or(FBTYPE_BUSY);
                        if fbtype.eq_ignore_ascii_case(FBTYPE_FREE) || !self.range.overlaps(start, end) {
                            continue;
                        }
                        self.push(start, end, &fbtype.to_ascii_uppercase());
                    }
                }
                _ => {}
            }
        }

        let added = self.periods.len() - before;
        tracing::debug!(added, "Collected busy periods");
        added
    }

    fn push(&mut self, start: DateTime<Utc>, end: DateTime<Utc>, fbtype: &str) {
        let start = start.max(self.range.start_or_min());
        let end = end.min(self.range.end_or_max());
        if start < end {
            self.periods.push(BusyPeriod {
                start,
                end,
                fbtype: fbtype.to_string(),
            });
        }
    }

    /// Merges overlapping periods of the same type and orders by start.
    fn coalesced(&self) -> Vec<BusyPeriod> {
        let mut sorted = self.periods.clone();
        sorted.sort_by(|a, b| {
            (a.fbtype.as_str(), a.start, a.end).cmp(&(b.fbtype.as_str(), b.start, b.end))
        });

        let mut merged: Vec<BusyPeriod> = Vec::with_capacity(sorted.len());
        for period in sorted {
            match merged.last_mut() {
                Some(last) if last.fbtype == period.fbtype && period.start <= last.end => {
                    last.end = last.end.max(period.end);
                }
                _ => merged.push(period),
            }
        }
        merged.sort_by(|a, b| (a.start, a.end).cmp(&(b.start, b.end)));
        merged
    }

    /// ## Summary
    /// Builds the VFREEBUSY for everything added so far.
    ///
    /// The result carries the queried DTSTART and DTEND even when no period
    /// was collected. FREEBUSY values are explicit UTC periods.
    #[must_use]
    pub fn finish(&self, dtstamp: Option<DateTime<Utc>>) -> ICalendar {
        let mut out = ICalendar::with_root(ComponentKind::FreeBusy);
        let root = out.root_mut();
        if let Some(dtstamp) = dtstamp {
            root.add_property(Property::datetime("DTSTAMP", ICalDateTime::from_utc(dtstamp)));
        }
        root.add_property(Property::datetime(
            "DTSTART",
            ICalDateTime::from_utc(self.range.start_or_min()),
        ));
        root.add_property(Property::datetime(
            "DTEND",
            ICalDateTime::from_utc(self.range.end_or_max()),
        ));

        for period in self.coalesced() {
            let value = Value::Period(Period::explicit(
                ICalDateTime::from_utc(period.start),
                ICalDateTime::from_utc(period.end),
            ));
            root.add_property(
                Property::new("FREEBUSY", value).with_param(Parameter::fbtype(period.fbtype)),
            );
        }
        out
    }

    /// Wraps [`finish`](Self::finish) in a VCALENDAR with VERSION and PRODID.
    #[must_use]
    pub fn into_calendar(self, product_id: &str, dtstamp: Option<DateTime<Utc>>) -> ICalendar {
        let freebusy = self.finish(dtstamp);
        let mut cal = ICalendar::new(product_id);
        let root = cal.root();
        cal.graft(root, &freebusy, freebusy.root());
        cal
    }
}

/// ## Summary
/// Rolls the busy time of many calendars into one VFREEBUSY.
#[must_use]
pub fn aggregate_free_busy<'a>(
    calendars: impl IntoIterator<Item = &'a ICalendar>,
    range: TimeRange,
    options: &EvalOptions,
) -> ICalendar {
    let mut aggregator = FreeBusyAggregator::new(range, options.clone());
    for cal in calendars {
        aggregator.add_calendar(cal);
    }
    aggregator.finish(None)
}
