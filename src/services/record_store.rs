// Record Store Client
// Bearer-authenticated REST access to the tabular record store: single-record
// get/patch/create and filtered listing with offset pagination.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::{Client, Response, StatusCode};
use serde_json::{json, Map, Value};
use std::time::Duration;
use thiserror::Error;

use crate::config::RecordStoreConfig;
use crate::models::record::{Record, RecordPage};
use crate::services::error::{ConnectionTarget, SyncError};

// Table names contain spaces and accents; keep only unreserved characters.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

// Listing stops here even if the store keeps returning offsets.
const MAX_PAGES: usize = 500;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Error, Debug)]
pub enum AirtableError {
    #[error("Record store API error ({0}): {1}")]
    ApiError(StatusCode, String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}

pub type Result<T> = std::result::Result<T, AirtableError>;

impl From<AirtableError> for SyncError {
    fn from(err: AirtableError) -> Self {
        match err {
            AirtableError::ApiError(StatusCode::NOT_FOUND, body) => {
                SyncError::NotFound(format!("record store: {}", body))
            }
            AirtableError::ConfigError(message) => SyncError::Configuration(message),
            other => SyncError::connection(ConnectionTarget::RecordStore, other.to_string()),
        }
    }
}

// ============================================================================
// Client
// ============================================================================

#[derive(Clone)]
pub struct AirtableClient {
    base_url: String,
    base_id: String,
    api_key: String,
    http_client: Client,
}

impl AirtableClient {
    pub fn new(config: &RecordStoreConfig, timeout: Duration) -> Result<Self> {
        config
            .validate()
            .map_err(|e| AirtableError::ConfigError(e.to_string()))?;

        let http_client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            base_id: config.base_id.clone(),
            api_key: config.api_key.clone(),
            http_client,
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url,
            self.base_id,
            utf8_percent_encode(table, PATH_SEGMENT)
        )
    }

    fn record_url(&self, table: &str, record_id: &str) -> String {
        format!(
            "{}/{}",
            self.table_url(table),
            utf8_percent_encode(record_id, PATH_SEGMENT)
        )
    }

    pub async fn get_record(&self, table: &str, record_id: &str) -> Result<Record> {
        let response = self
            .http_client
            .get(self.record_url(table, record_id))
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        parse_response(response).await
    }

    /// Partial update: only `fields` are touched.
    pub async fn update_record(
        &self,
        table: &str,
        record_id: &str,
        fields: Map<String, Value>,
    ) -> Result<Record> {
        let response = self
            .http_client
            .patch(self.record_url(table, record_id))
            .bearer_auth(&self.api_key)
            .json(&json!({ "fields": fields }))
            .send()
            .await?;

        parse_response(response).await
    }

    pub async fn create_record(&self, table: &str, fields: Map<String, Value>) -> Result<Record> {
        let response = self
            .http_client
            .post(self.table_url(table))
            .bearer_auth(&self.api_key)
            .json(&json!({ "fields": fields }))
            .send()
            .await?;

        parse_response(response).await
    }

    /// All records matching `filter_formula`, following `offset` until the
    /// last page.
    pub async fn search_records(&self, table: &str, filter_formula: Option<&str>) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        let mut offset: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let mut query: Vec<(&str, &str)> = Vec::new();
            if let Some(formula) = filter_formula.filter(|f| !f.is_empty()) {
                query.push(("filterByFormula", formula));
            }
            if let Some(ref offset) = offset {
                query.push(("offset", offset.as_str()));
            }

            let response = self
                .http_client
                .get(self.table_url(table))
                .bearer_auth(&self.api_key)
                .query(&query)
                .send()
                .await?;

            let page: RecordPage = parse_response(response).await?;
            records.extend(page.records);

            match page.offset {
                Some(next) if !next.is_empty() => offset = Some(next),
                _ => return Ok(records),
            }
        }

        tracing::warn!(table, pages = MAX_PAGES, "Record listing truncated at page limit");
        Ok(records)
    }
}

async fn parse_response<T: serde::de::DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
        return Err(AirtableError::ApiError(status, body));
    }
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}
