//! Calendar query filter tree (RFC 4791 §9.7).

use calsift_core::constants::{COLLATION_ASCII_CASEMAP, TIME_RANGE_MAX, TIME_RANGE_MIN};
use chrono::Utc;

use crate::rfc::ical::parse::parse_datetime;

/// Root of a `calendar-query` filter.
///
/// The root comp-filter always targets VCALENDAR.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarFilter {
    pub root: CompFilter,
}

impl CalendarFilter {
    #[must_use]
    pub fn new(root: CompFilter) -> Self {
        Self { root }
    }

    /// A filter matching every calendar object.
    #[must_use]
    pub fn vcalendar() -> Self {
        Self::new(CompFilter::new("VCALENDAR"))
    }

    /// Returns the first node that carries `is-not-defined` together with a
    /// content test, if any.
    #[must_use]
    pub fn find_contradiction(&self) -> Option<FilterNode<'_>> {
        let mut stack = vec![FilterNode::Comp(&self.root)];
        while let Some(node) = stack.pop() {
            if node.is_not_defined() && node.has_content_tests() {
                return Some(node);
            }
            stack.extend(node.children());
        }
        None
    }
}

/// Component filter (comp-filter element).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompFilter {
    /// Component name, upper-cased.
    pub name: String,
    pub is_not_defined: bool,
    pub time_range: Option<TimeRange>,
    pub prop_filters: Vec<PropFilter>,
    pub comp_filters: Vec<CompFilter>,
}

impl CompFilter {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().to_ascii_uppercase(),
            is_not_defined: false,
            time_range: None,
            prop_filters: Vec::new(),
            comp_filters: Vec::new(),
        }
    }

    #[must_use]
    pub fn not_defined(mut self) -> Self {
        self.is_not_defined = true;
        self
    }

    #[must_use]
    pub fn with_time_range(mut self, range: TimeRange) -> Self {
        self.time_range = Some(range);
        self
    }

    #[must_use]
    pub fn with_prop_filter(mut self, filter: PropFilter) -> Self {
        self.prop_filters.push(filter);
        self
    }

    #[must_use]
    pub fn with_comp_filter(mut self, filter: CompFilter) -> Self {
        self.comp_filters.push(filter);
        self
    }
}

/// Property filter (prop-filter element).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropFilter {
    /// Property name, upper-cased.
    pub name: String,
    pub is_not_defined: bool,
    pub time_range: Option<TimeRange>,
    pub text_match: Option<TextMatch>,
    pub param_filters: Vec<ParamFilter>,
}

impl PropFilter {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().to_ascii_uppercase(),
            is_not_defined: false,
            time_range: None,
            text_match: None,
            param_filters: Vec::new(),
        }
    }

    #[must_use]
    pub fn not_defined(mut self) -> Self {
        self.is_not_defined = true;
        self
    }

    #[must_use]
    pub fn with_time_range(mut self, range: TimeRange) -> Self {
        self.time_range = Some(range);
        self
    }

    #[must_use]
    pub fn with_text_match(mut self, text_match: TextMatch) -> Self {
        self.text_match = Some(text_match);
        self
    }

    #[must_use]
    pub fn with_param_filter(mut self, filter: ParamFilter) -> Self {
        self.param_filters.push(filter);
        self
    }
}

/// Parameter filter (param-filter element).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamFilter {
    /// Parameter name, upper-cased.
    pub name: String,
    pub is_not_defined: bool,
    pub text_match: Option<TextMatch>,
}

impl ParamFilter {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().to_ascii_uppercase(),
            is_not_defined: false,
            text_match: None,
        }
    }

    #[must_use]
    pub fn not_defined(mut self) -> Self {
        self.is_not_defined = true;
        self
    }

    #[must_use]
    pub fn with_text_match(mut self, text_match: TextMatch) -> Self {
        self.text_match = Some(text_match);
        self
    }
}

/// Substring test (text-match element).
///
/// The collation is kept as written; whether it is supported is decided when
/// the filter is evaluated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextMatch {
    pub value: String,
    pub collation: String,
    pub negate: bool,
}

impl TextMatch {
    /// Creates a non-negated `i;ascii-casemap` match.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            collation: COLLATION_ASCII_CASEMAP.to_string(),
            negate: false,
        }
    }

    #[must_use]
    pub fn with_collation(mut self, collation: impl Into<String>) -> Self {
        self.collation = collation.into();
        self
    }

    #[must_use]
    pub fn negated(mut self) -> Self {
        self.negate = true;
        self
    }
}

/// Half-open UTC interval `[start, end)` (RFC 4791 §9.9).
///
/// A missing bound stands for the earliest or latest representable instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: Option<chrono::DateTime<Utc>>,
    pub end: Option<chrono::DateTime<Utc>>,
}

impl TimeRange {
    #[must_use]
    pub fn new(start: chrono::DateTime<Utc>, end: chrono::DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    /// Open-ended range starting at `start`.
    #[must_use]
    pub fn from(start: chrono::DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: None,
        }
    }

    /// Range ending at `end`, with no lower bound.
    #[must_use]
    pub fn until(end: chrono::DateTime<Utc>) -> Self {
        Self {
            start: None,
            end: Some(end),
        }
    }

    #[must_use]
    pub fn start_or_min(&self) -> chrono::DateTime<Utc> {
        self.start
            .unwrap_or_else(|| bound(TIME_RANGE_MIN, chrono::DateTime::<Utc>::MIN_UTC))
    }

    #[must_use]
    pub fn end_or_max(&self) -> chrono::DateTime<Utc> {
        self.end
            .unwrap_or_else(|| bound(TIME_RANGE_MAX, chrono::DateTime::<Utc>::MAX_UTC))
    }

    /// Tests `[start, end)` against this range.
    ///
    /// The comparison is `query.start < end && query.end > start`, the form
    /// shared by every Appendix B row with a positive duration.
    #[must_use]
    pub fn overlaps(&self, start: chrono::DateTime<Utc>, end: chrono::DateTime<Utc>) -> bool {
        self.start_or_min() < end && self.end_or_max() > start
    }

    /// Tests a single instant: `query.start <= at && query.end > at`.
    #[must_use]
    pub fn contains(&self, at: chrono::DateTime<Utc>) -> bool {
        self.start_or_min() <= at && self.end_or_max() > at
    }
}

fn bound(literal: &str, fallback: chrono::DateTime<Utc>) -> chrono::DateTime<Utc> {
    parse_utc_literal(literal).unwrap_or(fallback)
}

/// Parses an iCalendar UTC DATE-TIME such as `20060104T000000Z`.
///
/// Returns `None` for floating or malformed values.
#[must_use]
pub fn parse_utc_literal(s: &str) -> Option<chrono::DateTime<Utc>> {
    let dt = parse_datetime(s.trim(), None, 1, 1).ok()?;
    if !dt.is_utc() {
        return None;
    }
    dt.naive().map(|naive| naive.and_utc())
}

/// Borrowed view over any node of a filter tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterNode<'a> {
    Comp(&'a CompFilter),
    Prop(&'a PropFilter),
    Param(&'a ParamFilter),
}

impl<'a> FilterNode<'a> {
    #[must_use]
    pub fn name(&self) -> &'a str {
        match self {
            Self::Comp(f) => &f.name,
            Self::Prop(f) => &f.name,
            Self::Param(f) => &f.name,
        }
    }

    #[must_use]
    pub fn is_not_defined(&self) -> bool {
        match self {
            Self::Comp(f) => f.is_not_defined,
            Self::Prop(f) => f.is_not_defined,
            Self::Param(f) => f.is_not_defined,
        }
    }

    /// Returns whether the node tests content beyond mere existence.
    #[must_use]
    pub fn has_content_tests(&self) -> bool {
        match self {
            Self::Comp(f) => {
                f.time_range.is_some() || !f.prop_filters.is_empty() || !f.comp_filters.is_empty()
            }
            Self::Prop(f) => {
                f.time_range.is_some() || f.text_match.is_some() || !f.param_filters.is_empty()
            }
            Self::Param(f) => f.text_match.is_some(),
        }
    }

    /// Child filters one level down, in document order.
    #[must_use]
    pub fn children(&self) -> Vec<FilterNode<'a>> {
        match self {
            Self::Comp(f) => f
                .prop_filters
                .iter()
                .map(FilterNode::Prop)
                .chain(f.comp_filters.iter().map(FilterNode::Comp))
                .collect(),
            Self::Prop(f) => f.param_filters.iter().map(FilterNode::Param).collect(),
            Self::Param(_) => Vec::new(),
        }
    }
}
