//! Subcommand implementations.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use calsift_core::config::Settings;
use calsift_rfc::rfc::dav::parse::parse_report;
use calsift_rfc::rfc::ical::build::serialize;
use calsift_rfc::rfc::ical::parse::{ParserLimits, parse_resource};
use calsift_service::caldav::{ReportOptions, ReportRunner, ReportSummary, collection_etag};
use calsift_service::error::ServiceError;
use chrono::Utc;

use crate::cli::CollectionArgs;
use crate::error::{AppError, AppResult};
use crate::multistatus::MultistatusWriter;
use crate::walk::DirectoryWalk;

fn walk_for(collection: &CollectionArgs) -> DirectoryWalk {
    DirectoryWalk::new(
        &collection.directory,
        &collection.href_base,
        collection.depth,
    )
}

/// ## Summary
/// Runs the REPORT body in `request` over a collection directory.
///
/// Calendar-query and calendar-multiget write a multistatus document to
/// `out`; free-busy-query writes a `text/calendar` body.
///
/// ## Errors
/// Returns an error if the request cannot be read or parsed, the collection
/// cannot be listed, or output fails.
#[tracing::instrument(skip(settings, out), fields(request = %request.display()))]
pub fn report<W: Write>(
    settings: &Settings,
    request: &Path,
    collection: &CollectionArgs,
    out: W,
) -> AppResult<ReportSummary> {
    let body = std::fs::read(request).map_err(|e| AppError::io(request, e))?;
    let request = parse_report(&body)?;

    let options = ReportOptions::from_settings(settings).with_dtstamp(Utc::now());
    let mut writer = MultistatusWriter::new(out);
    let summary = ReportRunner::new(options).run(&request, &walk_for(collection), &mut writer)?;
    writer
        .finish()?
        .flush()
        .map_err(ServiceError::from)?;

    tracing::info!(
        report = request.name(),
        examined = summary.examined,
        matched = summary.matched,
        failed = summary.failed,
        not_found = summary.not_found,
        "Report complete"
    );
    Ok(summary)
}

/// ## Errors
/// Returns an error if the collection cannot be listed or output fails.
pub fn etag<W: Write>(collection: &CollectionArgs, mut out: W) -> AppResult<()> {
    let etag = collection_etag(&walk_for(collection))?;
    writeln!(out, "{etag}").map_err(ServiceError::from)?;
    Ok(())
}

/// ## Summary
/// Parses one iCalendar file under the configured limits and writes every
/// calendar in it re-serialized. Returns the number of calendars.
///
/// ## Errors
/// Returns an error if the file cannot be read or is not valid iCalendar.
pub fn check<W: Write>(settings: &Settings, file: &Path, mut out: W) -> AppResult<usize> {
    let reader = File::open(file).map_err(|e| AppError::io(file, e))?;
    let calendars = parse_resource(reader, &ParserLimits::from(&settings.limits))?;
    for cal in &calendars {
        out.write_all(serialize(cal).as_bytes())
            .map_err(ServiceError::from)?;
    }
    Ok(calendars.len())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::walk::Depth;

    const EVENT: &str = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:-//test//EN\r\n\
BEGIN:VEVENT\r\n\
UID:standup\r\n\
DTSTART:20240105T090000Z\r\n\
DTEND:20240105T091500Z\r\n\
SUMMARY:Standup\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

    fn collection(name: &str) -> (PathBuf, CollectionArgs) {
        let dir = std::env::temp_dir().join(format!("calsift-cmd-{name}-{}", std::process::id()));
        std::fs::remove_dir_all(&dir).ok();
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("standup.ics"), EVENT).unwrap();
        std::fs::write(dir.join("broken.ics"), "BEGIN:VCALENDAR\r\n").unwrap();
        let args = CollectionArgs {
            directory: dir.clone(),
            depth: Depth::One,
            href_base: "/cal/".to_string(),
        };
        (dir, args)
    }

    #[test_log::test]
    fn calendar_query_writes_multistatus() {
        let (dir, args) = collection("query");
        let request = dir.join("query.xml");
        std::fs::write(
            &request,
            r#"<C:calendar-query xmlns:D="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav">
  <D:prop><D:getetag/><C:calendar-data/></D:prop>
  <C:filter><C:comp-filter name="VCALENDAR"/></C:filter>
</C:calendar-query>"#,
        )
        .unwrap();

        let mut out = Vec::new();
        let summary = report(&Settings::default(), &request, &args, &mut out).unwrap();
        let xml = String::from_utf8(out).unwrap();

        assert_eq!(summary.matched, 1);
        assert_eq!(summary.failed, 1);
        assert!(xml.contains("<D:href>/cal/standup.ics</D:href>"));
        assert!(xml.contains("SUMMARY:Standup"));
        assert!(xml.contains("<D:href>/cal/broken.ics</D:href>"));
        assert!(xml.contains("<C:valid-calendar-data/>"));
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn free_busy_writes_calendar() {
        let (dir, args) = collection("freebusy");
        let request = dir.join("fb.xml");
        std::fs::write(
            &request,
            r#"<C:free-busy-query xmlns:C="urn:ietf:params:xml:ns:caldav">
  <C:time-range start="20240105T000000Z" end="20240106T000000Z"/>
</C:free-busy-query>"#,
        )
        .unwrap();

        let mut out = Vec::new();
        report(&Settings::default(), &request, &args, &mut out).unwrap();
        let body = String::from_utf8(out).unwrap();

        assert!(body.starts_with("BEGIN:VCALENDAR\r\n"));
        assert!(body.contains("DTSTAMP:"));
        assert!(body.contains("FREEBUSY;FBTYPE=BUSY:20240105T090000Z/20240105T091500Z"));
        assert!(!body.contains("multistatus"));
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn malformed_request_is_rejected() {
        let (dir, args) = collection("malformed");
        let request = dir.join("bad.xml");
        std::fs::write(
            &request,
            r#"<C:calendar-query xmlns:C="urn:ietf:params:xml:ns:caldav"><C:filter/></C:calendar-query>"#,
        )
        .unwrap();

        let err = report(&Settings::default(), &request, &args, Vec::new()).unwrap_err();
        assert!(matches!(err, AppError::ReportError(_)));
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn etag_is_stable() {
        let (dir, args) = collection("etag");
        let mut first = Vec::new();
        etag(&args, &mut first).unwrap();
        let mut second = Vec::new();
        etag(&args, &mut second).unwrap();
        assert_eq!(first, second);
        assert!(first.starts_with(b"\""));
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn check_reserializes() {
        let (dir, _) = collection("check");
        let mut out = Vec::new();
        let count = check(&Settings::default(), &dir.join("standup.ics"), &mut out).unwrap();
        assert_eq!(count, 1);
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("UID:standup"));

        let err = check(&Settings::default(), &dir.join("broken.ics"), Vec::new()).unwrap_err();
        assert!(matches!(err, AppError::ParseError(_)));
        std::fs::remove_dir_all(dir).unwrap();
    }
}
