// Ingestion - XML dump reader and batch pipeline.
//
// The classifier only needs a sequence of raw message strings; this
// module is the boundary that produces them from an SMS backup XML dump
// and drives classify -> sink per message. One malformed message never
// aborts the batch; only sink-level storage errors propagate.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::Connection;

use crate::classify::classify;
use crate::db;
use crate::model::FailureRecord;

static SMS_BODY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)<sms\b[^>]*?\bbody="([^"]*)""#).unwrap());

/// Counters for one ingestion run. Returned by value so the pipeline
/// itself stays stateless and safe to run from parallel workers over a
/// partitioned stream.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    pub processed: usize,
    pub failed: usize,
}

impl IngestReport {
    pub fn total(&self) -> usize {
        self.processed + self.failed
    }
}

/// Pull the `body` attribute out of every `<sms>` element in the dump.
///
/// Attribute-level scan rather than a full XML parse: the backup format
/// is flat (one self-closing element per message) and bodies only need
/// entity decoding. Elements without a body are skipped.
pub fn parse_sms_bodies(xml: &str) -> Vec<String> {
    SMS_BODY
        .captures_iter(xml)
        .map(|caps| decode_entities(&caps[1]))
        .collect()
}

/// Read an SMS dump file and return the message bodies.
pub fn read_sms_bodies(path: &Path) -> Result<Vec<String>> {
    let xml = fs::read_to_string(path)
        .with_context(|| format!("Failed to read SMS dump: {}", path.display()))?;

    Ok(parse_sms_bodies(&xml))
}

// The entities that occur in SMS backup attribute values. &amp; must be
// decoded last so "&amp;lt;" comes out as the literal "&lt;".
fn decode_entities(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&#10;", "\n")
        .replace("&#13;", "\r")
        .replace("&amp;", "&")
}

/// Classify each message and hand the result to the sink.
///
/// Classification failures and per-record sink rejections are persisted
/// as failure records and counted; a failure of the failure log itself
/// escalates (the store is unavailable, not the data).
pub fn process_messages<I>(conn: &Connection, messages: I) -> Result<IngestReport>
where
    I: IntoIterator<Item = String>,
{
    let mut report = IngestReport::default();

    for body in messages {
        match classify(&body) {
            Ok(record) => match db::store(conn, &record) {
                Ok(()) => {
                    report.processed += 1;
                    debug!("stored {} record", record.transaction_type.label());
                }
                Err(err) => {
                    report.failed += 1;
                    warn!("sink rejected record: {err}");
                    db::log_failure(conn, &FailureRecord::new(body.as_str(), "sink rejected record"))
                        .context("Failed to persist failure record")?;
                }
            },
            Err(err) => {
                report.failed += 1;
                warn!("could not classify: {}", preview(&body));
                db::log_failure(conn, &FailureRecord::new(body.as_str(), err.to_string()))
                    .context("Failed to persist failure record")?;
            }
        }
    }

    Ok(report)
}

/// Ingest a whole dump file: read, classify, persist, report.
pub fn process_xml_file(conn: &Connection, path: &Path) -> Result<IngestReport> {
    let bodies = read_sms_bodies(path)?;
    process_messages(conn, bodies)
}

// First 50 chars, with a marker so a truncated preview is
// distinguishable from a genuinely short message.
fn preview(text: &str) -> String {
    match text.char_indices().nth(50) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}
