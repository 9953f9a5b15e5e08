//! In-memory fake mailbox for resolver/enumerator/pipeline tests.
//!
//! The fake parses the same criteria strings the real session sends,
//! tokenizing them quote-aware — so a value that was not escaped properly
//! falls apart into multiple tokens here exactly as it would on a real
//! server.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::error::MailError;
use crate::mail::session::Mailbox;
use crate::mail::types::FetchedMail;

#[derive(Default)]
pub(crate) struct FakeMailbox {
    folders: BTreeMap<String, Vec<FetchedMail>>,
    selected: Option<String>,
    /// Every criteria string received, for assertions.
    pub(crate) queries: Vec<String>,
    /// When set, `fetch` fails for these ids.
    pub(crate) broken_ids: Vec<u32>,
}

impl FakeMailbox {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Append a message to a folder, assigning the next ascending id.
    pub(crate) fn add(&mut self, folder: &str, mut mail: FetchedMail) -> u32 {
        let messages = self.folders.entry(folder.to_string()).or_default();
        let id = messages.len() as u32 + 1;
        mail.id = id;
        messages.push(mail);
        id
    }
}

impl Mailbox for FakeMailbox {
    fn select_folder(&mut self, candidates: &[String]) -> Result<(), MailError> {
        for name in candidates {
            if self.folders.contains_key(name) {
                self.selected = Some(name.clone());
                return Ok(());
            }
        }
        Err(MailError::FolderNotFound {
            tried: candidates.join(", "),
        })
    }

    fn search(&mut self, criteria: &str) -> Vec<u32> {
        self.queries.push(criteria.to_string());
        let Some(folder) = self.selected.as_ref() else {
            return Vec::new();
        };
        let Some(query) = Query::parse(criteria) else {
            return Vec::new();
        };
        self.folders[folder]
            .iter()
            .filter(|m| query.matches(m))
            .map(|m| m.id)
            .collect()
    }

    fn fetch(&mut self, id: u32) -> Result<FetchedMail, MailError> {
        if self.broken_ids.contains(&id) {
            return Err(MailError::Fetch {
                id,
                reason: "simulated fetch failure".into(),
            });
        }
        let folder = self.selected.as_ref().expect("no folder selected");
        self.folders[folder]
            .iter()
            .find(|m| m.id == id)
            .cloned()
            .ok_or(MailError::Fetch {
                id,
                reason: "no such message".into(),
            })
    }
}

/// The subset of SEARCH criteria the crate emits.
enum Query {
    Header { name: String, value: String },
    FromSince { from: String, since: DateTime<Utc> },
    Since(DateTime<Utc>),
}

impl Query {
    fn parse(criteria: &str) -> Option<Self> {
        let tokens = tokenize(criteria)?;
        let keywords: Vec<&str> = tokens.iter().map(|t| t.0.as_str()).collect();
        match keywords.as_slice() {
            ["HEADER", name, value] => Some(Query::Header {
                name: name.to_string(),
                value: value.to_string(),
            }),
            ["FROM", from, "SINCE", date] => Some(Query::FromSince {
                from: from.to_string(),
                since: parse_imap_date(date)?,
            }),
            ["SINCE", date] => Some(Query::Since(parse_imap_date(date)?)),
            _ => None,
        }
    }

    fn matches(&self, mail: &FetchedMail) -> bool {
        match self {
            Query::Header { name, value } => match name.as_str() {
                "In-Reply-To" => mail.in_reply_to.as_deref() == Some(value.as_str()),
                "References" => mail.references.iter().any(|r| r == value),
                _ => false,
            },
            Query::FromSince { from, since } => {
                mail.from.eq_ignore_ascii_case(from)
                    && mail.date.is_some_and(|d| d >= day_floor(*since))
            }
            Query::Since(since) => mail.date.is_some_and(|d| d >= day_floor(*since)),
        }
    }
}

/// SINCE has day granularity on a real server.
fn day_floor(date: DateTime<Utc>) -> DateTime<Utc> {
    date.date_naive().and_hms_opt(0, 0, 0).unwrap().and_utc()
}

fn parse_imap_date(token: &str) -> Option<DateTime<Utc>> {
    let naive = chrono::NaiveDate::parse_from_str(token, "%d-%b-%Y").ok()?;
    Some(naive.and_hms_opt(0, 0, 0)?.and_utc())
}

/// Split a criteria string into (token, was_quoted) pairs, honoring quoting
/// and backslash escapes the way an IMAP parser does. Returns None on
/// malformed input (unterminated quote).
fn tokenize(criteria: &str) -> Option<Vec<(String, bool)>> {
    let mut tokens = Vec::new();
    let mut chars = criteria.chars().peekable();

    while let Some(&ch) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
        } else if ch == '"' {
            chars.next();
            let mut value = String::new();
            loop {
                match chars.next()? {
                    '"' => break,
                    '\\' => value.push(chars.next()?),
                    c => value.push(c),
                }
            }
            tokens.push((value, true));
        } else {
            let mut value = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                value.push(c);
                chars.next();
            }
            tokens.push((value, false));
        }
    }

    Some(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_respects_quotes() {
        let tokens = tokenize(r#"FROM "john doe@example.com" SINCE 01-Jan-2026"#).unwrap();
        let words: Vec<&str> = tokens.iter().map(|t| t.0.as_str()).collect();
        assert_eq!(words, vec!["FROM", "john doe@example.com", "SINCE", "01-Jan-2026"]);
    }

    #[test]
    fn tokenize_unquoted_space_splits() {
        // What a real server sees when a value is injected unescaped.
        let tokens = tokenize("FROM john doe@example.com").unwrap();
        assert_eq!(tokens.len(), 3);
    }

    #[test]
    fn tokenize_unterminated_quote_is_malformed() {
        assert!(tokenize(r#"FROM "broken"#).is_none());
    }

    #[test]
    fn escaped_quote_round_trips() {
        let criteria = format!("HEADER Subject {}", crate::mail::query::quote(r#"say "hi""#));
        let tokens = tokenize(&criteria).unwrap();
        assert_eq!(tokens[2].0, r#"say "hi""#);
    }
}
