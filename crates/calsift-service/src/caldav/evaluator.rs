//! `CALDAV:filter` evaluation (RFC 4791 §9.7).
//!
//! Each filter element returns an explicit [`Match`]. Among sibling elements
//! of the same kind the first match wins and later siblings are not
//! evaluated, so same-kind siblings combine as OR.

use calsift_core::config::Settings;
use calsift_core::constants::DEFAULT_MAX_INSTANCES;
use calsift_rfc::rfc::dav::core::{
    CalendarFilter, CompFilter, ParamFilter, PropFilter, TimeRange,
};
use calsift_rfc::rfc::ical::core::{ComponentId, ICalendar, Property};
use calsift_rfc::rfc::ical::expand::Zone;

use super::overlap::TimeContext;
use super::text_match::text_matches;
use crate::error::{FilterError, FilterResult};

/// Outcome of evaluating one filter element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Match {
    Matched,
    NotMatched,
}

impl Match {
    #[must_use]
    pub const fn is_match(self) -> bool {
        matches!(self, Self::Matched)
    }
}

impl From<bool> for Match {
    fn from(matched: bool) -> Self {
        if matched {
            Self::Matched
        } else {
            Self::NotMatched
        }
    }
}

/// Options that shape evaluation without being part of the filter.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalOptions {
    /// Let `param-filter` address RFC 5545 parameters such as `PARTSTAT`.
    pub match_standard_parameters: bool,
    /// Zone floating times are read in.
    pub floating: Zone,
    /// Bound on recurrence instances examined per component.
    pub max_instances: u16,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            match_standard_parameters: false,
            floating: Zone::Utc,
            max_instances: DEFAULT_MAX_INSTANCES,
        }
    }
}

impl EvalOptions {
    /// Builds options from loaded settings.
    ///
    /// An unknown default timezone falls back to UTC.
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        let floating = Zone::named(&settings.calendar.default_timezone).unwrap_or_else(|e| {
            tracing::warn!(
                timezone = %settings.calendar.default_timezone,
                error = %e,
                "Unknown default timezone, using UTC"
            );
            Zone::Utc
        });
        Self {
            match_standard_parameters: settings.filter.match_standard_parameters,
            floating,
            max_instances: settings.expansion.max_instances,
        }
    }

    /// Replaces the floating zone, as a query `timezone` element does.
    #[must_use]
    pub fn with_floating(mut self, floating: Zone) -> Self {
        self.floating = floating;
        self
    }
}

/// First-match-wins over sibling filter elements.
fn first_match<T>(
    items: &[T],
    mut test: impl FnMut(&T) -> FilterResult<Match>,
) -> FilterResult<Match> {
    for item in items {
        if test(item)?.is_match() {
            return Ok(Match::Matched);
        }
    }
    Ok(Match::NotMatched)
}

/// Evaluates a filter tree against one calendar.
struct Evaluator<'a> {
    time: TimeContext<'a>,
    options: &'a EvalOptions,
}

impl<'a> Evaluator<'a> {
    fn new(cal: &'a ICalendar, options: &'a EvalOptions) -> Self {
        Self {
            time: TimeContext::new(cal, options.floating.clone(), options.max_instances),
            options,
        }
    }

    fn comp_filter(&mut self, filter: &CompFilter, candidates: &[ComponentId]) -> FilterResult<Match> {
        let cal = self.time.cal;
        let named: Vec<ComponentId> = candidates
            .iter()
            .copied()
            .filter(|id| cal.get(*id).kind.is_named(&filter.name))
            .collect();

        if named.is_empty() {
            tracing::trace!(name = %filter.name, is_not_defined = filter.is_not_defined, "No component of this kind");
            return Ok(Match::from(filter.is_not_defined));
        }
        if filter.is_not_defined {
            return Ok(Match::NotMatched);
        }
        first_match(&named, |id| self.component_matches(filter, *id))
    }

    fn component_matches(&mut self, filter: &CompFilter, id: ComponentId) -> FilterResult<Match> {
        if let Some(range) = &filter.time_range
            && !self.time.component_overlaps(id, range)
        {
            return Ok(Match::NotMatched);
        }
        if !filter.prop_filters.is_empty()
            && !first_match(&filter.prop_filters, |pf| self.prop_filter(pf, id))?.is_match()
        {
            return Ok(Match::NotMatched);
        }
        if !filter.comp_filters.is_empty() {
            let cal = self.time.cal;
            let children = cal.get(id).children();
            return first_match(&filter.comp_filters, |cf| self.comp_filter(cf, children));
        }
        Ok(Match::Matched)
    }

    fn prop_filter(&mut self, filter: &PropFilter, id: ComponentId) -> FilterResult<Match> {
        let cal = self.time.cal;
        let props: Vec<&Property> = cal.get(id).get_properties(&filter.name).collect();

        if props.is_empty() {
            return Ok(Match::from(filter.is_not_defined));
        }
        if filter.is_not_defined {
            return Ok(Match::NotMatched);
        }
        first_match(&props, |prop| self.property_matches(filter, id, prop))
    }

    fn property_matches(
        &mut self,
        filter: &PropFilter,
        id: ComponentId,
        prop: &Property,
    ) -> FilterResult<Match> {
        if let Some(range) = &filter.time_range
            && !self.time.property_overlaps(id, prop, range)
        {
            return Ok(Match::NotMatched);
        }
        if let Some(text_match) = &filter.text_match
            && !text_matches(text_match, &prop.value_text())?
        {
            return Ok(Match::NotMatched);
        }
        if filter.param_filters.is_empty() {
            return Ok(Match::Matched);
        }
        first_match(&filter.param_filters, |pf| self.param_filter(pf, prop))
    }

    fn param_filter(&self, filter: &ParamFilter, prop: &Property) -> FilterResult<Match> {
        let params: Vec<_> = prop
            .params
            .iter()
            .filter(|p| p.name.eq_ignore_ascii_case(&filter.name))
            .filter(|p| self.options.match_standard_parameters || p.is_extension())
            .collect();

        if params.is_empty() {
            return Ok(Match::from(filter.is_not_defined));
        }
        if filter.is_not_defined {
            return Ok(Match::NotMatched);
        }
        let Some(text_match) = &filter.text_match else {
            return Ok(Match::Matched);
        };
        for param in params {
            for value in &param.values {
                if text_matches(text_match, value)? {
                    return Ok(Match::Matched);
                }
            }
        }
        Ok(Match::NotMatched)
    }
}

/// ## Summary
/// Checks the structural rules of a filter tree: a VCALENDAR root, no
/// `is-not-defined` next to content tests, and non-empty time-ranges.
///
/// Trees from the REPORT parser already satisfy these. Trees assembled in
/// code may not.
///
/// ## Errors
/// Returns [`FilterError::InvalidFilter`] naming the first offending element.
pub fn validate_filter(filter: &CalendarFilter) -> FilterResult<()> {
    if filter.root.name != "VCALENDAR" {
        return Err(FilterError::InvalidFilter(format!(
            "root comp-filter must name VCALENDAR, got {}",
            filter.root.name
        )));
    }
    if let Some(node) = filter.find_contradiction() {
        return Err(FilterError::InvalidFilter(format!(
            "{} combines is-not-defined with other tests",
            node.name()
        )));
    }

    let mut stack = vec![&filter.root];
    while let Some(comp) = stack.pop() {
        check_range(&comp.name, comp.time_range.as_ref())?;
        for prop in &comp.prop_filters {
            check_range(&prop.name, prop.time_range.as_ref())?;
        }
        stack.extend(&comp.comp_filters);
    }
    Ok(())
}

fn check_range(name: &str, range: Option<&TimeRange>) -> FilterResult<()> {
    let Some(range) = range else {
        return Ok(());
    };
    if range.start.is_none() && range.end.is_none() {
        return Err(FilterError::InvalidFilter(format!(
            "time-range on {name} must include start or end"
        )));
    }
    if range.end_or_max() <= range.start_or_min() {
        return Err(FilterError::InvalidFilter(format!(
            "time-range on {name} ends before it starts"
        )));
    }
    Ok(())
}

/// ## Summary
/// Decides whether a calendar satisfies a `CALDAV:filter`.
///
/// The root comp-filter is tested against the VCALENDAR root. Evaluation
/// reads the calendar only and does not depend on the current time.
///
/// ## Errors
/// Returns [`FilterError::InvalidFilter`] for a malformed tree (see
/// [`validate_filter`]) and [`FilterError::UnsupportedCollation`] when a
/// text-match that has to be evaluated names an unknown collation.
#[tracing::instrument(skip_all, fields(filter = %filter.root.name))]
pub fn evaluate_filter(
    filter: &CalendarFilter,
    cal: &ICalendar,
    options: &EvalOptions,
) -> FilterResult<bool> {
    validate_filter(filter)?;
    let mut evaluator = Evaluator::new(cal, options);
    let matched = evaluator.comp_filter(&filter.root, &[cal.root()])?;
    tracing::debug!(matched = matched.is_match(), "Evaluated filter");
    Ok(matched.is_match())
}

#[cfg(test)]
#[path = "evaluator_tests.rs"]
mod tests;
