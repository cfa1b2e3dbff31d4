// 📄 Sheet Store - spreadsheet web app (Apps Script) over HTTP
//
// POST <base>                 appends one row (JSON body)
// GET  <base>?action=getData  returns every row as a JSON array, oldest first
//
// Rows come back with numbers as strings; Record decoding copes with that.

use super::RecordStore;
use crate::error::StoreError;
use crate::record::{newest_first, Record};
use reqwest::blocking::Client;
use serde_json::Value;
use tracing::{error, info, warn};

pub struct SheetStore {
    client: Client,
    base_url: String,
}

impl SheetStore {
    /// `base_url` is the deployed web app URL without any `?action=` query.
    ///
    /// Builds a blocking client, so call this outside an async runtime.
    pub fn new(base_url: impl Into<String>) -> Result<Self, StoreError> {
        let client = Client::builder().build()?;
        Ok(SheetStore {
            client,
            base_url: base_url.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Forward an arbitrary JSON body and return the upstream JSON answer.
    pub fn forward_raw(&self, body: &Value) -> Result<Value, StoreError> {
        let response = self.client.post(&self.base_url).json(body).send()?;
        let status = response.status();
        let text = response.text()?;

        if !status.is_success() {
            error!(status = status.as_u16(), body = %text, "Sheet backend rejected the row");
            return Err(StoreError::Upstream {
                status: status.as_u16(),
                body: text,
            });
        }

        parse_json(text)
    }

    /// Fetch the raw upstream payload.
    pub fn fetch_raw(&self) -> Result<Value, StoreError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("action", "getData")])
            .send()?;
        let status = response.status();
        let text = response.text()?;

        if !status.is_success() {
            return Err(StoreError::Upstream {
                status: status.as_u16(),
                body: text,
            });
        }

        parse_json(text)
    }
}

fn parse_json(text: String) -> Result<Value, StoreError> {
    match serde_json::from_str(&text) {
        Ok(value) => Ok(value),
        Err(_) => {
            error!(raw = %text, "Sheet response is not JSON");
            Err(StoreError::NotJson { raw: text })
        }
    }
}

/// Decode the sheet's row array into records, skipping rows that don't
/// decode (blank or hand-edited lines).
pub fn decode_rows(payload: Value) -> Result<Vec<Record>, StoreError> {
    let rows: Vec<Value> = serde_json::from_value(payload)?;
    let total = rows.len();

    let records: Vec<Record> = rows
        .into_iter()
        .filter_map(|row| match serde_json::from_value::<Record>(row) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(error = %e, "Skipping sheet row that is not a record");
                None
            }
        })
        .collect();

    if records.len() < total {
        info!(kept = records.len(), skipped = total - records.len(), "Decoded sheet rows");
    }

    Ok(records)
}

impl RecordStore for SheetStore {
    fn name(&self) -> &'static str {
        "sheet"
    }

    fn submit(&self, record: &Record) -> Result<Option<usize>, StoreError> {
        self.forward_raw(&serde_json::to_value(record)?)?;
        // The web app answers with its own status payload, not a row count
        Ok(None)
    }

    fn fetch_all(&self, limit: usize) -> Result<Vec<Record>, StoreError> {
        let records = decode_rows(self.fetch_raw()?)?;
        Ok(newest_first(records, limit))
    }
}
