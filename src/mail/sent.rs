//! Sent-Item Enumerator: lists sent messages in a trailing time window and
//! builds one `SentEmail` at a time.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::MailError;
use crate::mail::query;
use crate::mail::session::Mailbox;
use crate::mail::types::SentEmail;

/// Lazily yields `SentEmail`s from the sent folder. Identifiers are listed
/// once up front (cheap); bodies are fetched one item per call, bounding
/// peak memory when the window is large. Restartable only by constructing a
/// new enumerator with the same window.
pub struct SentEnumerator {
    folders: Vec<String>,
    window_start: DateTime<Utc>,
    ids: Option<VecDeque<u32>>,
}

impl SentEnumerator {
    pub fn new(folders: Vec<String>, window_start: DateTime<Utc>) -> Self {
        Self {
            folders,
            window_start,
            ids: None,
        }
    }

    /// Fetch and build the next sent email, or `None` when exhausted.
    ///
    /// A per-item fetch failure is returned as `Some(Err(..))` and does not
    /// end the sequence; the caller decides whether to continue.
    pub fn next_item<M: Mailbox>(
        &mut self,
        mailbox: &mut M,
    ) -> Option<Result<SentEmail, MailError>> {
        if self.ids.is_none() {
            if let Err(e) = self.start(mailbox) {
                // A missing sent folder ends the enumeration immediately.
                self.ids = Some(VecDeque::new());
                return Some(Err(e));
            }
        }

        let id = self.ids.as_mut()?.pop_front()?;

        // The resolver selects the inbox between items; switch back.
        if let Err(e) = mailbox.select_folder(&self.folders) {
            return Some(Err(e));
        }

        debug!(id, "Fetching sent message");
        Some(
            mailbox
                .fetch(id)
                .map(|mail| SentEmail::from_fetched(&mail, self.window_start)),
        )
    }

    fn start<M: Mailbox>(&mut self, mailbox: &mut M) -> Result<(), MailError> {
        mailbox.select_folder(&self.folders)?;
        let ids = mailbox.search(&query::since(self.window_start));
        info!(
            count = ids.len(),
            since = %self.window_start.format("%Y-%m-%d"),
            "Sent messages in window"
        );
        self.ids = Some(ids.into());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::testkit::FakeMailbox;
    use crate::mail::types::FetchedMail;
    use chrono::TimeZone;

    fn day(n: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, n, 12, 0, 0).unwrap()
    }

    fn sent_mail(to: &str, subject: &str, n: u32) -> FetchedMail {
        FetchedMail {
            to: to.into(),
            subject: subject.into(),
            date: Some(day(n)),
            ..Default::default()
        }
    }

    fn folders() -> Vec<String> {
        vec!["Sent".into(), "[Gmail]/Sent Mail".into()]
    }

    #[test]
    fn enumerates_in_server_order() {
        let mut mb = FakeMailbox::new();
        mb.add("Sent", sent_mail("a@x.com", "One", 2));
        mb.add("Sent", sent_mail("b@y.com", "Two", 3));

        let mut en = SentEnumerator::new(folders(), day(1));
        let first = en.next_item(&mut mb).unwrap().unwrap();
        let second = en.next_item(&mut mb).unwrap().unwrap();
        assert_eq!(first.to, "a@x.com");
        assert_eq!(second.to, "b@y.com");
        assert!(en.next_item(&mut mb).is_none());
    }

    #[test]
    fn window_excludes_older_messages() {
        let mut mb = FakeMailbox::new();
        mb.add("Sent", sent_mail("old@x.com", "Old", 1));
        mb.add("Sent", sent_mail("new@x.com", "New", 20));

        let mut en = SentEnumerator::new(folders(), day(10));
        let only = en.next_item(&mut mb).unwrap().unwrap();
        assert_eq!(only.to, "new@x.com");
        assert!(en.next_item(&mut mb).is_none());
    }

    #[test]
    fn falls_back_to_second_folder_candidate() {
        let mut mb = FakeMailbox::new();
        mb.add("[Gmail]/Sent Mail", sent_mail("a@x.com", "One", 2));

        let mut en = SentEnumerator::new(folders(), day(1));
        assert!(en.next_item(&mut mb).unwrap().is_ok());
    }

    #[test]
    fn missing_folder_is_reported_then_sequence_ends() {
        let mut mb = FakeMailbox::new();
        let mut en = SentEnumerator::new(folders(), day(1));

        let err = en.next_item(&mut mb).unwrap().unwrap_err();
        assert!(matches!(err, MailError::FolderNotFound { .. }));
        assert!(en.next_item(&mut mb).is_none());
    }

    #[test]
    fn fetch_failure_does_not_end_enumeration() {
        let mut mb = FakeMailbox::new();
        let broken = mb.add("Sent", sent_mail("a@x.com", "One", 2));
        mb.add("Sent", sent_mail("b@y.com", "Two", 3));
        mb.broken_ids.push(broken);

        let mut en = SentEnumerator::new(folders(), day(1));
        assert!(en.next_item(&mut mb).unwrap().is_err());
        let next = en.next_item(&mut mb).unwrap().unwrap();
        assert_eq!(next.to, "b@y.com");
    }

    #[test]
    fn reselects_sent_folder_between_items() {
        let mut mb = FakeMailbox::new();
        mb.add("Sent", sent_mail("a@x.com", "One", 2));
        mb.add("Sent", sent_mail("b@y.com", "Two", 3));
        mb.add("INBOX", sent_mail("seed@x.com", "seed", 2));

        let mut en = SentEnumerator::new(folders(), day(1));
        en.next_item(&mut mb).unwrap().unwrap();
        // A resolver run switches folders in between.
        mb.select_folder(&["INBOX".to_string()]).unwrap();
        let second = en.next_item(&mut mb).unwrap().unwrap();
        assert_eq!(second.to, "b@y.com");
    }
}
