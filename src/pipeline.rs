//! The run loop: enumerate sent emails, resolve each reply, extract text,
//! enrich, hand rows to the sink.
//!
//! Per-sent-email failures are logged with the reason, counted in
//! `RunStats` and do not stop the run; a fatal mailbox condition aborts it.
//! Progress already handed to the sink is preserved either way.

use chrono::{DateTime, Duration, Utc};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::enrich::Enricher;
use crate::error::Error;
use crate::mail::extract;
use crate::mail::resolver::ReplyResolver;
use crate::mail::sent::SentEnumerator;
use crate::mail::session::Mailbox;
use crate::report::RowSink;
use crate::stats::RunStats;

/// The subset of configuration the run loop needs.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub sent_folders: Vec<String>,
    pub inbox_folders: Vec<String>,
    pub window_start: DateTime<Utc>,
    pub target_fields: Vec<String>,
    pub catch_all_field: String,
}

impl RunOptions {
    pub fn from_config(config: &Config, now: DateTime<Utc>) -> Self {
        Self {
            sent_folders: config.imap.sent_folders.clone(),
            inbox_folders: config.imap.inbox_folders.clone(),
            window_start: now - Duration::days(config.window_days),
            target_fields: config.enrich.target_fields.clone(),
            catch_all_field: config.enrich.catch_all_field.clone(),
        }
    }
}

/// Process every sent email in the window once.
pub fn run<M: Mailbox, E: Enricher, S: RowSink>(
    mailbox: &mut M,
    options: &RunOptions,
    enricher: &E,
    sink: &mut S,
    stats: &mut RunStats,
) -> Result<(), Error> {
    info!(since = %options.window_start.format("%Y-%m-%d"), "Starting reply resolution run");

    let resolver = ReplyResolver::new(options.inbox_folders.clone());
    let mut enumerator = SentEnumerator::new(options.sent_folders.clone(), options.window_start);

    while let Some(item) = enumerator.next_item(mailbox) {
        let sent = match item {
            Ok(sent) => sent,
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => {
                warn!(error = %e, "Skipping unreadable sent message");
                stats.errors += 1;
                continue;
            }
        };
        stats.processed += 1;

        let matched = match resolver.find_reply(mailbox, &sent) {
            Ok(Some(matched)) => matched,
            Ok(None) => {
                stats.no_match += 1;
                continue;
            }
            // The resolver only errors on fatal conditions.
            Err(e) => return Err(e.into()),
        };
        stats.record_match(matched.strategy.label(), matched.strategy.is_low_confidence());

        let text = extract::strip_quoted_text(&matched.candidate.body_text());
        let fields = match enricher.extract_fields(&text, &options.target_fields) {
            Ok(extraction) => extraction.into_fields(&options.catch_all_field),
            Err(e) => {
                error!(
                    to = %sent.to,
                    strategy = matched.strategy.label(),
                    error = %e,
                    "Enrichment failed; reply dropped"
                );
                stats.errors += 1;
                continue;
            }
        };

        let email = sent.to.to_lowercase();
        match sink.update_row(&email, &fields) {
            Ok(()) => stats.rows_written += 1,
            Err(e) => {
                error!(email = %email, error = %e, "Failed to write row");
                stats.errors += 1;
            }
        }
    }

    Ok(())
}
