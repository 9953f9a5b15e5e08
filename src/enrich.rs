//! Enrichment collaborator: sends reply text plus a field list to the
//! analysis endpoint and gets structured fields back.

use std::collections::BTreeMap;

use secrecy::ExposeSecret;
use serde_json::Value;
use tracing::{info, warn};

use crate::config::EnrichConfig;
use crate::error::EnrichError;

/// The seam the pipeline works against; tests use a canned implementation.
pub trait Enricher {
    /// Extract the named fields from plain text.
    fn extract_fields(&self, text: &str, fields: &[String]) -> Result<Extraction, EnrichError>;
}

/// Tagged enrichment result: either a parsed field mapping or the raw
/// response text when it cannot be parsed as one. Never an untyped blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Fields(BTreeMap<String, String>),
    Raw(String),
}

impl Extraction {
    /// Flatten into a field map; a raw fallback lands whole in
    /// `catch_all_field` rather than being discarded.
    pub fn into_fields(self, catch_all_field: &str) -> BTreeMap<String, String> {
        match self {
            Extraction::Fields(fields) => fields,
            Extraction::Raw(text) => {
                let mut fields = BTreeMap::new();
                fields.insert(catch_all_field.to_string(), text);
                fields
            }
        }
    }
}

/// HTTP client for the analysis endpoint (`POST {base_url}/analyze`,
/// bearer auth, per-request timeout).
pub struct EnrichmentClient {
    http: reqwest::blocking::Client,
    config: EnrichConfig,
}

impl EnrichmentClient {
    pub fn new(config: EnrichConfig) -> Result<Self, EnrichError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| EnrichError::RequestFailed(e.to_string()))?;
        Ok(Self { http, config })
    }

    /// `GET {base_url}/health` — a failing endpoint is reported, not fatal.
    pub fn health_check(&self) -> bool {
        let url = format!("{}/health", self.config.base_url);
        match self.http.get(&url).bearer_auth(self.config.api_key.expose_secret()).send() {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                warn!(status = %response.status(), "Enrichment health check failed");
                false
            }
            Err(e) => {
                warn!(error = %e, "Enrichment health check failed");
                false
            }
        }
    }
}

impl Enricher for EnrichmentClient {
    fn extract_fields(&self, text: &str, fields: &[String]) -> Result<Extraction, EnrichError> {
        let url = format!("{}/analyze", self.config.base_url);
        let payload = serde_json::json!({
            "model": self.config.model,
            "text": text,
            "fields": fields,
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&payload)
            .send()
            .map_err(|e| EnrichError::RequestFailed(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| EnrichError::RequestFailed(e.to_string()))?;

        if !status.is_success() {
            return Err(EnrichError::BadStatus {
                status: status.as_u16(),
                body,
            });
        }

        let extraction = parse_response(&body, fields);
        info!(
            parsed = matches!(extraction, Extraction::Fields(_)),
            "Enrichment response received"
        );
        Ok(extraction)
    }
}

/// Parse the response body as a field mapping limited to the requested
/// fields; anything unparsable becomes a raw fallback.
fn parse_response(body: &str, fields: &[String]) -> Extraction {
    let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) else {
        return Extraction::Raw(body.to_string());
    };

    let mut extracted = BTreeMap::new();
    for field in fields {
        match map.get(field) {
            Some(Value::String(s)) => {
                extracted.insert(field.clone(), s.clone());
            }
            Some(Value::Number(n)) => {
                extracted.insert(field.clone(), n.to_string());
            }
            Some(Value::Bool(b)) => {
                extracted.insert(field.clone(), b.to_string());
            }
            _ => {}
        }
    }

    if extracted.is_empty() {
        // A JSON object carrying none of the requested fields is as useless
        // as unparsable text; keep the raw response instead.
        Extraction::Raw(body.to_string())
    } else {
        Extraction::Fields(extracted)
    }
}
