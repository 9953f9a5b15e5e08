//! Mailbox session: raw IMAP over TLS (blocking).
//!
//! Owns the authenticated connection and exposes the search/fetch
//! primitives the resolver and enumerator are built on. Raw protocol and IO
//! failures are converted to typed [`MailError`] conditions here; callers
//! never see protocol strings.

use std::io::{Read as IoRead, Write as IoWrite};
use std::net::TcpStream;
use std::sync::Arc;

use mail_parser::{HeaderValue, MessageParser};
use secrecy::ExposeSecret;
use tracing::{debug, info, warn};

use crate::config::ImapConfig;
use crate::error::MailError;
use crate::mail::query;
use crate::mail::types::FetchedMail;

/// The seam the resolver and enumerator work against. One implementation
/// talks IMAP; tests use an in-memory fake.
pub trait Mailbox {
    /// Try each candidate folder name in order until one selects.
    fn select_folder(&mut self, candidates: &[String]) -> Result<(), MailError>;

    /// Execute a search against the selected folder. Returns message
    /// identifiers in server order (ascending); a query failure returns an
    /// empty sequence, logged at warning level.
    fn search(&mut self, criteria: &str) -> Vec<u32>;

    /// Retrieve headers and raw body for one message.
    fn fetch(&mut self, id: u32) -> Result<FetchedMail, MailError>;
}

type TlsStream = rustls::StreamOwned<rustls::ClientConnection, TcpStream>;

/// An authenticated IMAP session. Dropping the session sends a best-effort
/// LOGOUT, so the connection is released on every exit path.
pub struct ImapSession {
    stream: TlsStream,
    host: String,
    tag: u32,
    selected: Option<String>,
}

impl ImapSession {
    /// Connect, establish TLS and authenticate. One attempt; callers wrap
    /// this in a `RetryPolicy` when bounded retries are wanted.
    pub fn connect(config: &ImapConfig) -> Result<Self, MailError> {
        let host = config.host.clone();
        let connection_err = |reason: String| MailError::Connection {
            host: host.clone(),
            reason,
        };

        let tcp = TcpStream::connect((&*config.host, config.port))
            .map_err(|e| connection_err(e.to_string()))?;
        tcp.set_read_timeout(Some(config.io_timeout))
            .map_err(|e| connection_err(e.to_string()))?;
        tcp.set_write_timeout(Some(config.io_timeout))
            .map_err(|e| connection_err(e.to_string()))?;

        let mut root_store = rustls::RootCertStore::empty();
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        let tls_config = Arc::new(
            rustls::ClientConfig::builder()
                .with_root_certificates(root_store)
                .with_no_client_auth(),
        );
        let server_name: rustls::pki_types::ServerName<'_> =
            rustls::pki_types::ServerName::try_from(config.host.clone())
                .map_err(|e| connection_err(e.to_string()))?;
        let conn = rustls::ClientConnection::new(tls_config, server_name)
            .map_err(|e| connection_err(e.to_string()))?;
        let stream = rustls::StreamOwned::new(conn, tcp);

        let mut session = Self {
            stream,
            host: config.host.clone(),
            tag: 0,
            selected: None,
        };

        // Server greeting comes before any command.
        session.read_line()?;

        let login = format!(
            "LOGIN {} {}",
            query::quote(&config.username),
            query::quote(config.password.expose_secret()),
        );
        let response = session.send_cmd(&login)?;
        if !ok_tagged(&response) {
            return Err(MailError::AuthFailed {
                username: config.username.clone(),
                reason: last_line(&response),
            });
        }

        info!(host = %config.host, "Connected to IMAP server");
        Ok(session)
    }

    /// Send LOGOUT and consume the session.
    pub fn logout(mut self) {
        self.logout_inner();
    }

    fn logout_inner(&mut self) {
        if self.send_cmd("LOGOUT").is_ok() {
            debug!(host = %self.host, "Logged out from IMAP server");
        }
        // Sentinel: tells Drop the logout already happened.
        self.tag = u32::MAX;
    }

    fn read_line(&mut self) -> Result<String, MailError> {
        let mut buf = Vec::new();
        loop {
            let mut byte = [0u8; 1];
            match self.stream.read(&mut byte) {
                Ok(0) => {
                    return Err(MailError::Connection {
                        host: self.host.clone(),
                        reason: "connection closed by server".into(),
                    });
                }
                Ok(_) => {
                    buf.push(byte[0]);
                    if buf.ends_with(b"\r\n") {
                        return Ok(String::from_utf8_lossy(&buf).to_string());
                    }
                }
                Err(e) => {
                    return Err(MailError::Connection {
                        host: self.host.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }
    }

    /// Send one tagged command and collect every response line up to and
    /// including the tagged completion line.
    fn send_cmd(&mut self, cmd: &str) -> Result<Vec<String>, MailError> {
        self.tag = self.tag.wrapping_add(1);
        let tag = format!("A{}", self.tag);
        let full = format!("{tag} {cmd}\r\n");
        self.stream
            .write_all(full.as_bytes())
            .and_then(|_| self.stream.flush())
            .map_err(|e| MailError::Connection {
                host: self.host.clone(),
                reason: e.to_string(),
            })?;

        let mut lines = Vec::new();
        loop {
            let line = self.read_line()?;
            let done = line.starts_with(&tag);
            lines.push(line);
            if done {
                return Ok(lines);
            }
        }
    }
}

impl Mailbox for ImapSession {
    fn select_folder(&mut self, candidates: &[String]) -> Result<(), MailError> {
        for name in candidates {
            if self.selected.as_deref() == Some(name.as_str()) {
                return Ok(());
            }
            let response = self.send_cmd(&format!("SELECT {}", query::quote(name)))?;
            if ok_tagged(&response) {
                debug!(folder = %name, "Selected folder");
                self.selected = Some(name.clone());
                return Ok(());
            }
        }
        Err(MailError::FolderNotFound {
            tried: candidates.join(", "),
        })
    }

    fn search(&mut self, criteria: &str) -> Vec<u32> {
        let response = match self.send_cmd(&format!("SEARCH {criteria}")) {
            Ok(lines) => lines,
            Err(e) => {
                warn!(criteria, error = %e, "Search failed; treating as empty");
                return Vec::new();
            }
        };
        if !ok_tagged(&response) {
            warn!(criteria, response = %last_line(&response), "Search rejected; treating as empty");
            return Vec::new();
        }
        parse_search_ids(&response)
    }

    fn fetch(&mut self, id: u32) -> Result<FetchedMail, MailError> {
        let response = self.send_cmd(&format!("FETCH {id} RFC822"))?;
        if !ok_tagged(&response) {
            return Err(MailError::Fetch {
                id,
                reason: last_line(&response),
            });
        }
        let raw = fetch_raw_body(&response);
        parse_fetched(id, raw.into_bytes()).ok_or(MailError::Fetch {
            id,
            reason: "unparsable message".into(),
        })
    }
}

impl Drop for ImapSession {
    fn drop(&mut self) {
        if self.tag != u32::MAX {
            self.logout_inner();
        }
    }
}

// ── Response parsing (pure, unit-tested) ────────────────────────────

/// Whether the tagged completion line reports OK.
fn ok_tagged(lines: &[String]) -> bool {
    lines
        .last()
        .is_some_and(|l| l.split_whitespace().nth(1) == Some("OK"))
}

fn last_line(lines: &[String]) -> String {
    lines.last().map(|l| l.trim().to_string()).unwrap_or_default()
}

/// Collect identifiers from `* SEARCH ...` response lines.
fn parse_search_ids(lines: &[String]) -> Vec<u32> {
    let mut ids = Vec::new();
    for line in lines {
        if line.starts_with("* SEARCH") {
            ids.extend(
                line.split_whitespace()
                    .skip(2)
                    .filter_map(|t| t.parse::<u32>().ok()),
            );
        }
    }
    ids
}

/// Reassemble the raw message from a FETCH response: everything between the
/// untagged `* n FETCH` line and the closing lines.
fn fetch_raw_body(lines: &[String]) -> String {
    let mut body: Vec<&str> = lines
        .iter()
        .skip(1)
        .take(lines.len().saturating_sub(2))
        .map(|s| s.as_str())
        .collect();
    // Closing paren of the FETCH data item sits on its own line.
    if body.last().is_some_and(|l| l.trim() == ")") {
        body.pop();
    }
    body.concat()
}

/// Parse raw RFC 822 bytes into a `FetchedMail` with decoded headers.
/// Header values (RFC 2047 encoded words) are decoded by the parser.
fn parse_fetched(id: u32, raw: Vec<u8>) -> Option<FetchedMail> {
    let mut mail = {
        let parsed = MessageParser::default().parse(&raw)?;
        FetchedMail {
            id,
            from: first_address(parsed.from()),
            to: first_address(parsed.to()),
            subject: parsed.subject().unwrap_or_default().to_string(),
            date: parsed
                .date()
                .and_then(|d| chrono::DateTime::from_timestamp(d.to_timestamp(), 0)),
            message_id: parsed.message_id().map(|s| s.to_string()),
            in_reply_to: id_list(parsed.in_reply_to()).into_iter().next(),
            references: id_list(parsed.references()),
            raw: Vec::new(),
        }
    };
    mail.raw = raw;
    Some(mail)
}

fn first_address(addr: Option<&mail_parser::Address>) -> String {
    addr.and_then(|a| a.first())
        .and_then(|a| a.address())
        .map(|s| s.to_string())
        .unwrap_or_default()
}

/// Correlation tokens from an In-Reply-To or References header, in header
/// order (oldest first for References).
fn id_list(value: &HeaderValue) -> Vec<String> {
    match value {
        HeaderValue::Text(text) => vec![text.to_string()],
        HeaderValue::TextList(list) => list.iter().map(|t| t.to_string()).collect(),
        _ => Vec::new(),
    }
}
