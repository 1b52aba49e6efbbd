use async_trait::async_trait;
use reqwest::header::{HeaderValue, CACHE_CONTROL, PRAGMA};
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::columns::quote_sheet_name;
use crate::config::SheetConfig;
use crate::error::{ConfigError, Result, StoreError};

/// Cells of one sheet row, in column order. Trailing empty cells are omitted
/// by the sheet, so rows have no fixed arity.
pub type RawRow = Vec<String>;

/// Error bodies are often whole HTML pages; keep only this many chars.
const ERROR_BODY_LIMIT: usize = 512;

#[async_trait]
pub trait RangeSource: Send + Sync {
    /// Reads an A1 range (`A:B`, `5:5`, ...) of the configured sheet.
    async fn fetch_range(&self, range: &str) -> Result<Vec<RawRow>>;
}

#[derive(Clone)]
pub struct SheetsClient {
    http: Client,
    base_url: String,
    spreadsheet_id: String,
    sheet_name: String,
    api_key: String,
}

impl SheetsClient {
    pub fn new(config: &SheetConfig) -> std::result::Result<Self, ConfigError> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self::with_client(http, config))
    }

    pub fn with_client(http: Client, config: &SheetConfig) -> Self {
        Self {
            http,
            base_url: config.base_url.clone(),
            spreadsheet_id: config.spreadsheet_id.clone(),
            sheet_name: config.sheet_name.clone(),
            api_key: config.api_key.clone(),
        }
    }

    pub fn range_url(&self, range: &str) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|err| StoreError::transport(format!("invalid base url {}: {err}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|_| StoreError::transport(format!("base url {} cannot take a path", self.base_url)))?
            .pop_if_empty()
            .push(&self.spreadsheet_id)
            .push("values")
            .push(&format!("{}!{}", quote_sheet_name(&self.sheet_name), range));
        url.query_pairs_mut().append_pair("key", &self.api_key);
        Ok(url)
    }
}

#[async_trait]
impl RangeSource for SheetsClient {
    async fn fetch_range(&self, range: &str) -> Result<Vec<RawRow>> {
        let url = self.range_url(range)?;
        // The sheet is edited by hand at any time; never serve a stored copy.
        let response = self
            .http
            .get(url)
            .header(CACHE_CONTROL, HeaderValue::from_static("no-cache"))
            .header(PRAGMA, HeaderValue::from_static("no-cache"))
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(StoreError::Transport {
                status: Some(status),
                message: clamp_error_body(&body),
            });
        }
        let parsed: ValueRange = serde_json::from_str(&body).map_err(|err| {
            StoreError::transport(format!("failed to decode sheets response: {err}"))
        })?;
        let rows = parsed.into_rows();
        if rows.is_empty() {
            return Err(StoreError::EmptyResult {
                range: range.to_string(),
            });
        }
        debug!(range, rows = rows.len(), "fetched sheet range");
        Ok(rows)
    }
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Option<Vec<Vec<Value>>>,
}

impl ValueRange {
    fn into_rows(self) -> Vec<RawRow> {
        self.values
            .unwrap_or_default()
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect()
    }
}

fn clamp_error_body(body: &str) -> String {
    let body = body.trim();
    if body.chars().count() <= ERROR_BODY_LIMIT {
        return body.to_string();
    }
    let mut clamped: String = body.chars().take(ERROR_BODY_LIMIT).collect();
    clamped.push_str("...");
    clamped
}

fn cell_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
