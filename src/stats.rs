//! Run statistics: what got processed, matched, skipped and failed.

use std::collections::BTreeMap;

use tracing::info;

/// Counters for one run. Per-sent-email failures land in `errors` and do not
/// stop the run; the summary is the caller's record of partial progress.
#[derive(Debug, Default)]
pub struct RunStats {
    /// Sent emails examined.
    pub processed: u64,
    /// Sent emails with a resolved reply.
    pub matched: u64,
    /// Matches found only by the date-only strategy.
    pub low_confidence: u64,
    /// Sent emails with no reply found (expected outcome, not an error).
    pub no_match: u64,
    /// Per-item failures (fetch, enrichment, sink).
    pub errors: u64,
    /// Rows handed to the report sink.
    pub rows_written: u64,
    /// Matches per strategy label.
    pub by_strategy: BTreeMap<&'static str, u64>,
}

impl RunStats {
    pub fn record_match(&mut self, strategy_label: &'static str, low_confidence: bool) {
        self.matched += 1;
        if low_confidence {
            self.low_confidence += 1;
        }
        *self.by_strategy.entry(strategy_label).or_insert(0) += 1;
    }

    /// Log the end-of-run summary.
    pub fn log_summary(&self) {
        info!(
            processed = self.processed,
            matched = self.matched,
            low_confidence = self.low_confidence,
            no_match = self.no_match,
            errors = self.errors,
            rows_written = self.rows_written,
            "Run summary"
        );
        for (strategy, count) in &self.by_strategy {
            info!(strategy, count, "Matches by strategy");
        }
    }
}
