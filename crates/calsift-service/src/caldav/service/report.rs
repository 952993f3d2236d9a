//! `CalDAV` REPORT service layer.
//!
//! Drives one sequential walk over member resources for calendar-query,
//! calendar-multiget and free-busy-query reports.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use calsift_core::config::Settings;
use calsift_core::constants::{CALDAV_NAMESPACE, DAV_NAMESPACE};
use calsift_rfc::rfc::dav::core::{
    CalendarDataRequest, CalendarFilter, CalendarMultiget, CalendarQuery, CompSelection,
    FreeBusyQuery, PropRequest, QualifiedName, ReportRequest, RequestedProp,
};
use calsift_rfc::rfc::ical::build::serialize;
use calsift_rfc::rfc::ical::core::{ICalendar, merge_calendars};
use calsift_rfc::rfc::ical::parse::{ParserLimits, parse_resource_with_abort};
use chrono::{DateTime, Utc};

use super::response::{ResponseEntry, ResponseProp, ResponseWriter};
use super::walk::{Resource, ResourceWalk};
use crate::caldav::evaluator::{EvalOptions, evaluate_filter, validate_filter};
use crate::caldav::freebusy::FreeBusyAggregator;
use crate::caldav::projector::project;
use crate::error::{FilterResult, ServiceError, ServiceResult};

const MEDIA_TYPE: &str = "text/calendar";
const MEDIA_VERSION: &str = "2.0";

fn getetag_name() -> QualifiedName {
    QualifiedName::new(DAV_NAMESPACE, "getetag")
}

fn calendar_data_name() -> QualifiedName {
    QualifiedName::new(CALDAV_NAMESPACE, "calendar-data")
}

/// Settings for one REPORT run.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub limits: ParserLimits,
    pub eval: EvalOptions,
    /// PRODID of a generated free-busy calendar.
    pub product_id: String,
    /// DTSTAMP of a generated free-busy calendar.
    pub dtstamp: Option<DateTime<Utc>>,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl ReportOptions {
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            limits: ParserLimits::from(&settings.limits),
            eval: EvalOptions::from_settings(settings),
            product_id: settings.calendar.product_id.clone(),
            dtstamp: None,
        }
    }

    #[must_use]
    pub fn with_dtstamp(mut self, dtstamp: DateTime<Utc>) -> Self {
        self.dtstamp = Some(dtstamp);
        self
    }
}

/// Counters describing a finished (or aborted) run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportSummary {
    /// Resources opened and parsed.
    pub examined: usize,
    /// Resources written as success entries, or contributing busy time.
    pub matched: usize,
    /// Resources that failed to parse or evaluate.
    pub failed: usize,
    /// Multiget hrefs the walk did not yield.
    pub not_found: usize,
    pub aborted: bool,
}

/// Runs REPORT requests with shared options and an optional abort flag.
#[derive(Debug, Clone, Default)]
pub struct ReportRunner {
    options: ReportOptions,
    abort: Option<Arc<AtomicBool>>,
}

impl ReportRunner {
    #[must_use]
    pub fn new(options: ReportOptions) -> Self {
        Self {
            options,
            abort: None,
        }
    }

    /// Stops the walk, and any in-flight parse, once `abort` is set.
    #[must_use]
    pub fn with_abort(mut self, abort: Arc<AtomicBool>) -> Self {
        self.abort = Some(abort);
        self
    }

    #[must_use]
    pub fn options(&self) -> &ReportOptions {
        &self.options
    }

    /// ## Summary
    /// Executes `request` over `walk`, handing every outcome to `writer`.
    ///
    /// Per-resource parse and filter failures become error entries and do not
    /// stop the walk. Once the abort flag is set nothing more is written.
    ///
    /// ## Errors
    /// Returns an error if the query filter is malformed, the walk cannot be
    /// listed or the writer fails.
    #[tracing::instrument(skip_all, fields(report = request.name()))]
    pub fn run<W, O>(
        &self,
        request: &ReportRequest,
        walk: &W,
        writer: &mut O,
    ) -> ServiceResult<ReportSummary>
    where
        W: ResourceWalk,
        O: ResponseWriter,
    {
        let mut summary = ReportSummary::default();
        match request {
            ReportRequest::CalendarQuery(query) => {
                self.calendar_query(query, walk, writer, &mut summary)?;
            }
            ReportRequest::CalendarMultiget(multiget) => {
                self.calendar_multiget(multiget, walk, writer, &mut summary)?;
            }
            ReportRequest::FreeBusyQuery(query) => {
                self.free_busy_query(query, walk, writer, &mut summary)?;
            }
        }
        tracing::debug!(?summary, "Report finished");
        Ok(summary)
    }

    fn calendar_query<W: ResourceWalk, O: ResponseWriter>(
        &self,
        query: &CalendarQuery,
        walk: &W,
        writer: &mut O,
        summary: &mut ReportSummary,
    ) -> ServiceResult<()> {
        validate_filter(&query.filter)?;
        let eval = match &query.timezone {
            Some(zone) => self.options.eval.clone().with_floating(zone.clone()),
            None => self.options.eval.clone(),
        };

        for resource in walk.resources()? {
            if self.is_aborted() {
                summary.aborted = true;
                break;
            }
            summary.examined += 1;

            let outcome = self.parse(&resource).and_then(|roots| {
                let matched = any_root_matches(&query.filter, &roots, &eval)?;
                Ok(matched.then_some(roots))
            });
            match outcome {
                Ok(Some(roots)) => {
                    tracing::debug!(href = resource.href(), "Resource matched");
                    summary.matched += 1;
                    writer.write_entry(&found_entry(&resource, &roots, &query.props))?;
                }
                Ok(None) => {
                    tracing::trace!(href = resource.href(), "Resource did not match");
                }
                Err(e) if e.is_abort() => {
                    summary.aborted = true;
                    break;
                }
                Err(e) => {
                    summary.failed += 1;
                    writer.write_entry(&failed_entry(&resource, &e))?;
                }
            }
        }
        Ok(())
    }

    fn calendar_multiget<W: ResourceWalk, O: ResponseWriter>(
        &self,
        multiget: &CalendarMultiget,
        walk: &W,
        writer: &mut O,
        summary: &mut ReportSummary,
    ) -> ServiceResult<()> {
        let resources = walk.resources()?;

        for href in &multiget.hrefs {
            if self.is_aborted() {
                summary.aborted = true;
                break;
            }
            let Some(resource) = resources.iter().find(|r| r.href() == href) else {
                tracing::debug!(%href, "Requested href not in collection");
                summary.not_found += 1;
                writer.write_entry(&ResponseEntry::NotFound { href: href.clone() })?;
                continue;
            };
            summary.examined += 1;

            match self.parse(resource) {
                Ok(roots) => {
                    summary.matched += 1;
                    writer.write_entry(&found_entry(resource, &roots, &multiget.props))?;
                }
                Err(e) if e.is_abort() => {
                    summary.aborted = true;
                    break;
                }
                Err(e) => {
                    summary.failed += 1;
                    writer.write_entry(&failed_entry(resource, &e))?;
                }
            }
        }
        Ok(())
    }

    fn free_busy_query<W: ResourceWalk, O: ResponseWriter>(
        &self,
        query: &FreeBusyQuery,
        walk: &W,
        writer: &mut O,
        summary: &mut ReportSummary,
    ) -> ServiceResult<()> {
        let mut aggregator = FreeBusyAggregator::new(query.time_range, self.options.eval.clone());

        for resource in walk.resources()? {
            if self.is_aborted() {
                summary.aborted = true;
                return Ok(());
            }
            summary.examined += 1;

            match self.parse(&resource) {
                Ok(roots) => {
                    let added: usize = roots.iter().map(|cal| aggregator.add_calendar(cal)).sum();
                    if added > 0 {
                        summary.matched += 1;
                    }
                }
                Err(e) if e.is_abort() => {
                    summary.aborted = true;
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(href = resource.href(), error = %e, "Skipping unreadable resource");
                    summary.failed += 1;
                }
            }
        }

        let cal = aggregator.into_calendar(&self.options.product_id, self.options.dtstamp);
        writer.write_calendar(&serialize(&cal))
    }

    fn parse<R: Resource>(&self, resource: &R) -> ServiceResult<Vec<ICalendar>> {
        let reader = resource.open()?;
        Ok(parse_resource_with_abort(
            reader,
            &self.options.limits,
            self.abort.clone(),
        )?)
    }

    fn is_aborted(&self) -> bool {
        self.abort
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

/// ## Summary
/// Executes a REPORT with the given options and no abort flag.
///
/// ## Errors
/// Returns an error if the walk cannot be listed or the writer fails.
pub fn run_report<W: ResourceWalk, O: ResponseWriter>(
    request: &ReportRequest,
    walk: &W,
    writer: &mut O,
    options: &ReportOptions,
) -> ServiceResult<ReportSummary> {
    ReportRunner::new(options.clone()).run(request, walk, writer)
}

/// A resource matches when any of its calendars does.
fn any_root_matches(
    filter: &CalendarFilter,
    roots: &[ICalendar],
    options: &EvalOptions,
) -> FilterResult<bool> {
    for root in roots {
        if evaluate_filter(filter, root, options)? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn is_supported_media(request: &CalendarDataRequest) -> bool {
    request
        .content_type
        .as_deref()
        .is_none_or(|ct| ct.eq_ignore_ascii_case(MEDIA_TYPE))
        && request
            .version
            .as_deref()
            .is_none_or(|v| v == MEDIA_VERSION)
}

fn render(roots: &[ICalendar], selection: Option<&CompSelection>) -> String {
    let Some(merged) = merge_calendars(roots) else {
        return String::new();
    };
    match selection {
        Some(selection) => serialize(&project(&merged, selection)),
        None => serialize(&merged),
    }
}

fn found_entry<R: Resource>(resource: &R, roots: &[ICalendar], props: &PropRequest) -> ResponseEntry {
    let mut found = Vec::new();
    let mut missing = Vec::new();

    match props {
        PropRequest::AllProp => {
            found.push(ResponseProp::ETag(resource.etag().to_string()));
            found.push(ResponseProp::CalendarData(render(roots, None)));
        }
        PropRequest::PropName => {
            found.push(ResponseProp::Name(getetag_name()));
            found.push(ResponseProp::Name(calendar_data_name()));
        }
        PropRequest::Prop(requested) => {
            for prop in requested {
                match prop {
                    RequestedProp::ETag => {
                        found.push(ResponseProp::ETag(resource.etag().to_string()));
                    }
                    RequestedProp::CalendarData(request) if is_supported_media(request) => {
                        found.push(ResponseProp::CalendarData(render(
                            roots,
                            request.selection.as_ref(),
                        )));
                    }
                    RequestedProp::CalendarData(request) => {
                        tracing::debug!(
                            content_type = ?request.content_type,
                            version = ?request.version,
                            "Unsupported calendar-data media type"
                        );
                        missing.push(calendar_data_name());
                    }
                    RequestedProp::Other(name) => missing.push(name.clone()),
                }
            }
        }
    }

    ResponseEntry::Found {
        href: resource.href().to_string(),
        props: found,
        missing,
    }
}

fn failed_entry<R: Resource>(resource: &R, error: &ServiceError) -> ResponseEntry {
    let precondition = error.precondition();
    tracing::warn!(
        href = resource.href(),
        precondition = ?precondition,
        error = %error,
        "Resource failed"
    );
    ResponseEntry::Failed {
        href: resource.href().to_string(),
        precondition,
        message: error.to_string(),
    }
}
