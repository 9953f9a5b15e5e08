//! Report sink: where resolved and enriched replies end up.
//!
//! The spreadsheet side owns persistence, backup and highlighting; this
//! crate only produces the mapping it consumes, one row per resolved reply,
//! keyed by the normalized recipient address.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::error::ReportError;

/// Consumer of resolved rows. The production implementation writes JSONL;
/// tests collect rows in memory.
pub trait RowSink {
    fn update_row(
        &mut self,
        email: &str,
        fields: &BTreeMap<String, String>,
    ) -> Result<(), ReportError>;
}

#[derive(Serialize)]
struct ReportRow<'a> {
    email: &'a str,
    fields: &'a BTreeMap<String, String>,
}

/// Appends one JSON object per resolved reply to a file.
pub struct JsonlSink {
    writer: BufWriter<File>,
}

impl JsonlSink {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, ReportError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }
}

impl RowSink for JsonlSink {
    fn update_row(
        &mut self,
        email: &str,
        fields: &BTreeMap<String, String>,
    ) -> Result<(), ReportError> {
        let row = ReportRow { email, fields };
        let line = serde_json::to_string(&row).map_err(|e| ReportError::Write(e.to_string()))?;
        writeln!(self.writer, "{line}")?;
        // Flushed per row so partial progress survives an aborted run.
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) struct VecSink {
    pub(crate) rows: Vec<(String, BTreeMap<String, String>)>,
}

#[cfg(test)]
impl VecSink {
    pub(crate) fn new() -> Self {
        Self { rows: Vec::new() }
    }
}

#[cfg(test)]
impl RowSink for VecSink {
    fn update_row(
        &mut self,
        email: &str,
        fields: &BTreeMap<String, String>,
    ) -> Result<(), ReportError> {
        self.rows.push((email.to_string(), fields.clone()));
        Ok(())
    }
}
