//! Reply Search Strategy Chain — resolves the reply to one sent email.
//!
//! Strategies run in fixed priority order; the chain stops at the first one
//! that yields a candidate and records which strategy matched. Finding
//! nothing is an expected outcome, not an error.

use tracing::{debug, info, warn};

use crate::error::MailError;
use crate::mail::query;
use crate::mail::session::Mailbox;
use crate::mail::subject;
use crate::mail::types::{ReplyCandidate, ReplyMatch, SentEmail, Strategy};

/// How strategy 3/4 compare subjects.
#[derive(Clone, Copy)]
enum SubjectMatch {
    /// Normalized subjects equal.
    Exact,
    /// Substring containment in either direction (tolerates client-side
    /// subject truncation).
    Partial,
}

/// Resolves replies against the inbox via the five-strategy chain.
pub struct ReplyResolver {
    inbox_folders: Vec<String>,
}

impl ReplyResolver {
    pub fn new(inbox_folders: Vec<String>) -> Self {
        Self { inbox_folders }
    }

    /// Find the reply to `sent`, if any, with strategy provenance.
    ///
    /// Non-fatal conditions (failed searches, unfetchable candidates) make
    /// the current strategy yield nothing and the chain advance; fatal
    /// connection loss propagates and halts the run.
    pub fn find_reply<M: Mailbox>(
        &self,
        mailbox: &mut M,
        sent: &SentEmail,
    ) -> Result<Option<ReplyMatch>, MailError> {
        mailbox.select_folder(&self.inbox_folders)?;

        // 1 + 2: correlation-token strategies, skipped without a message id.
        if let Some(message_id) = &sent.message_id {
            let direct = query::header("In-Reply-To", message_id);
            if let Some(candidate) = self.token_match(mailbox, sent, &direct)? {
                return Ok(Some(found(candidate, Strategy::Direct, sent)));
            }

            let chained = query::header("References", message_id);
            if let Some(candidate) = self.token_match(mailbox, sent, &chained)? {
                return Ok(Some(found(candidate, Strategy::References, sent)));
            }
        } else {
            debug!(to = %sent.to, "Sent email has no message id; skipping correlation strategies");
        }

        // 3 + 4: sender + subject inside the date window, earliest first.
        let window = query::from_since(&sent.to, sent.date);
        if let Some(candidate) =
            self.earliest_subject_match(mailbox, sent, &window, SubjectMatch::Exact)?
        {
            return Ok(Some(found(candidate, Strategy::SubjectExact, sent)));
        }
        if let Some(candidate) =
            self.earliest_subject_match(mailbox, sent, &window, SubjectMatch::Partial)?
        {
            return Ok(Some(found(candidate, Strategy::SubjectPartial, sent)));
        }

        // 5: the most recent message from the sender, subject ignored.
        // Marked low-confidence via its strategy tag.
        if let Some(candidate) = self.latest_from_sender(mailbox, sent, &window)? {
            return Ok(Some(found(candidate, Strategy::SenderDate, sent)));
        }

        debug!(to = %sent.to, subject = %sent.subject, "No reply found");
        Ok(None)
    }

    /// First fetchable candidate of a correlation-token search.
    ///
    /// A candidate carrying a date strictly before the sent date is
    /// rejected; one with no parsable date passes, as the token match is
    /// authoritative.
    fn token_match<M: Mailbox>(
        &self,
        mailbox: &mut M,
        sent: &SentEmail,
        criteria: &str,
    ) -> Result<Option<ReplyCandidate>, MailError> {
        for candidate in self.candidates(mailbox, criteria)? {
            if candidate.date.is_some_and(|d| d < sent.date) {
                debug!(id = candidate.id, "Token match predates sent email; rejected");
                continue;
            }
            return Ok(Some(candidate));
        }
        Ok(None)
    }

    /// Earliest in-window candidate whose subject matches. Equal dates are
    /// broken toward the lowest server-assigned identifier: ids are scanned
    /// in ascending order and only a strictly earlier date displaces the
    /// current best.
    fn earliest_subject_match<M: Mailbox>(
        &self,
        mailbox: &mut M,
        sent: &SentEmail,
        criteria: &str,
        mode: SubjectMatch,
    ) -> Result<Option<ReplyCandidate>, MailError> {
        let mut best: Option<(chrono::DateTime<chrono::Utc>, ReplyCandidate)> = None;
        for candidate in self.candidates(mailbox, criteria)? {
            let Some(date) = candidate.date else {
                continue;
            };
            if date < sent.date {
                continue;
            }
            if !subjects_match(&sent.normalized_subject, &candidate.subject, mode) {
                continue;
            }
            if best.as_ref().is_none_or(|(b, _)| date < *b) {
                best = Some((date, candidate));
            }
        }
        Ok(best.map(|(_, candidate)| candidate))
    }

    /// Latest in-window candidate regardless of subject. Among equal dates
    /// the highest identifier wins (a not-earlier date displaces the
    /// current best while scanning ascending ids).
    fn latest_from_sender<M: Mailbox>(
        &self,
        mailbox: &mut M,
        sent: &SentEmail,
        criteria: &str,
    ) -> Result<Option<ReplyCandidate>, MailError> {
        let mut best: Option<(chrono::DateTime<chrono::Utc>, ReplyCandidate)> = None;
        for candidate in self.candidates(mailbox, criteria)? {
            let Some(date) = candidate.date else {
                continue;
            };
            if date < sent.date {
                continue;
            }
            if best.as_ref().is_none_or(|(b, _)| date >= *b) {
                best = Some((date, candidate));
            }
        }
        Ok(best.map(|(_, candidate)| candidate))
    }

    /// Search and fetch candidates in server order. Unfetchable candidates
    /// are skipped with a warning; fatal conditions propagate.
    fn candidates<M: Mailbox>(
        &self,
        mailbox: &mut M,
        criteria: &str,
    ) -> Result<Vec<ReplyCandidate>, MailError> {
        let ids = mailbox.search(criteria);
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            match mailbox.fetch(id) {
                Ok(candidate) => out.push(candidate),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => warn!(id, error = %e, "Skipping unfetchable candidate"),
            }
        }
        Ok(out)
    }
}

fn subjects_match(sent_normalized: &str, candidate_subject: &str, mode: SubjectMatch) -> bool {
    let candidate = subject::normalize(candidate_subject);
    match mode {
        SubjectMatch::Exact => candidate == sent_normalized,
        // Empty subjects only match exactly; "" is a substring of anything.
        SubjectMatch::Partial => {
            !sent_normalized.is_empty()
                && !candidate.is_empty()
                && (candidate.contains(sent_normalized) || sent_normalized.contains(&candidate))
        }
    }
}

fn found(candidate: ReplyCandidate, strategy: Strategy, sent: &SentEmail) -> ReplyMatch {
    info!(
        to = %sent.to,
        candidate_id = candidate.id,
        strategy = strategy.label(),
        low_confidence = strategy.is_low_confidence(),
        "Reply resolved"
    );
    ReplyMatch {
        candidate,
        strategy,
    }
}
