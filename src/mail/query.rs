//! IMAP SEARCH criteria builders.
//!
//! Every value injected into a query goes through [`quote`]: an unescaped
//! space-containing address silently truncates the criterion and is the
//! dominant source of wrong matches.

use chrono::{DateTime, Utc};

/// Quote a value so the server parses it as a single criterion token.
/// Backslashes and double quotes are escaped, the whole value is wrapped in
/// double quotes.
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        if ch == '\\' || ch == '"' {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('"');
    out
}

/// `HEADER <name> <value>` criterion with the value quoted.
pub fn header(name: &str, value: &str) -> String {
    format!("HEADER {name} {}", quote(value))
}

/// `FROM <addr> SINCE <date>` criterion. `SINCE` has day granularity, so
/// callers must still compare full timestamps on fetched candidates.
pub fn from_since(addr: &str, since: DateTime<Utc>) -> String {
    format!("FROM {} SINCE {}", quote(addr), imap_date(since))
}

/// `SINCE <date>` criterion.
pub fn since(when: DateTime<Utc>) -> String {
    format!("SINCE {}", imap_date(when))
}

/// IMAP date format: `01-Jan-2026`. `%b` is locale-independent in chrono.
fn imap_date(when: DateTime<Utc>) -> String {
    when.format("%d-%b-%Y").to_string()
}
