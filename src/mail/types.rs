//! Mail data model: fetched messages, sent items, reply candidates and
//! resolved matches.

use chrono::{DateTime, Utc};
use mail_parser::MessageParser;

use crate::mail::{extract, subject};

/// One message as fetched from the server: decoded headers plus the raw
/// body bytes. Header values are decoded from their transfer encoding by
/// the session; callers never see raw encoded header bytes.
#[derive(Debug, Clone, Default)]
pub struct FetchedMail {
    /// Server-assigned message identifier within the selected folder.
    pub id: u32,
    pub from: String,
    pub to: String,
    pub subject: String,
    pub date: Option<DateTime<Utc>>,
    /// Opaque correlation token; compared by exact equality, never parsed.
    pub message_id: Option<String>,
    pub in_reply_to: Option<String>,
    /// References chain, oldest first.
    pub references: Vec<String>,
    /// Raw RFC 822 bytes, kept for text extraction.
    pub raw: Vec<u8>,
}

impl FetchedMail {
    /// Decode the body into plain text (see [`extract::message_text`]).
    pub fn body_text(&self) -> String {
        MessageParser::default()
            .parse(&self.raw)
            .map(|m| extract::message_text(&m))
            .unwrap_or_default()
    }
}

/// A previously sent email, the unit of one resolution attempt.
/// Constructed once per enumerated sent message, immutable, discarded after
/// the attempt.
#[derive(Debug, Clone)]
pub struct SentEmail {
    pub to: String,
    pub message_id: Option<String>,
    pub subject: String,
    /// Derived once via [`subject::normalize`] and cached.
    pub normalized_subject: String,
    pub date: DateTime<Utc>,
    pub body: String,
    pub references: Vec<String>,
}

impl SentEmail {
    /// Build from a fetched message. `fallback_date` (the window start)
    /// stands in when the message carries no parsable Date header.
    pub fn from_fetched(mail: &FetchedMail, fallback_date: DateTime<Utc>) -> Self {
        Self {
            to: mail.to.clone(),
            message_id: mail.message_id.clone(),
            subject: mail.subject.clone(),
            normalized_subject: subject::normalize(&mail.subject),
            date: mail.date.unwrap_or(fallback_date),
            body: mail.body_text(),
            references: mail.references.clone(),
        }
    }
}

/// A candidate reply, constructed transiently per search result.
pub type ReplyCandidate = FetchedMail;

/// Which strategy of the chain produced a match, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// In-Reply-To equals the sent message id.
    Direct,
    /// References chain contains the sent message id.
    References,
    /// Sender + equal normalized subject + date window.
    SubjectExact,
    /// Sender + substring subject match + date window.
    SubjectPartial,
    /// Most recent message from the sender in the date window.
    SenderDate,
}

impl Strategy {
    pub fn label(&self) -> &'static str {
        match self {
            Strategy::Direct => "direct",
            Strategy::References => "references",
            Strategy::SubjectExact => "subject-exact",
            Strategy::SubjectPartial => "subject-partial",
            Strategy::SenderDate => "sender-date",
        }
    }

    /// A date-only match lacks subject or correlation-token corroboration.
    pub fn is_low_confidence(&self) -> bool {
        matches!(self, Strategy::SenderDate)
    }
}

/// A resolved reply plus the strategy that produced it. A candidate is
/// never picked without recording provenance; "no reply" is represented by
/// `Option::None` at the call site, not by a sentinel.
#[derive(Debug, Clone)]
pub struct ReplyMatch {
    pub candidate: ReplyCandidate,
    pub strategy: Strategy,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn sent_email_caches_normalized_subject() {
        let mail = FetchedMail {
            id: 1,
            to: "a@x.com".into(),
            subject: "RE: Offer".into(),
            ..Default::default()
        };
        let fallback = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let sent = SentEmail::from_fetched(&mail, fallback);
        assert_eq!(sent.subject, "RE: Offer");
        assert_eq!(sent.normalized_subject, "offer");
        assert_eq!(sent.date, fallback);
    }

    #[test]
    fn sent_email_prefers_header_date() {
        let date = Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap();
        let mail = FetchedMail {
            id: 1,
            date: Some(date),
            ..Default::default()
        };
        let fallback = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(SentEmail::from_fetched(&mail, fallback).date, date);
    }

    #[test]
    fn strategy_labels_and_confidence() {
        assert_eq!(Strategy::Direct.label(), "direct");
        assert!(!Strategy::Direct.is_low_confidence());
        assert!(!Strategy::SubjectPartial.is_low_confidence());
        assert!(Strategy::SenderDate.is_low_confidence());
    }

    #[test]
    fn body_text_on_unparsable_raw_is_empty() {
        let mail = FetchedMail {
            raw: Vec::new(),
            ..Default::default()
        };
        assert_eq!(mail.body_text(), "");
    }
}
