//! Map the report onto the datastore's row shape and write it.
//!
//! The write is the run's only visible output, so it happens exactly once and
//! any failure is returned to the caller to end the run.

use crate::config::StoreSettings;
use crate::error::SinkError;
use crate::models::{AnalysisReply, PersistedRecord};
use crate::utils::truncate_for_log;
use chrono::{DateTime, Local};
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use std::time::Duration;
use tracing::{info, instrument};

/// Longest title kept before falling back to a synthesized one.
pub const MAX_TITLE_CHARS: usize = 100;

/// Title from the first non-empty body line, without heading markers.
///
/// Falls back to `Intel: <topic>` when that line is empty or too long.
pub fn derive_title(body: &str, topic: &str) -> String {
    let candidate = body
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| line.trim_start_matches('#').trim())
        .unwrap_or("");

    if candidate.is_empty() || candidate.chars().count() > MAX_TITLE_CHARS {
        format!("Intel: {}", topic.trim())
    } else {
        candidate.to_string()
    }
}

/// Build the row for `reply`, timestamped at `now`.
pub fn build_record(
    topic: &str,
    reply: &AnalysisReply,
    store: &StoreSettings,
    now: DateTime<Local>,
) -> PersistedRecord {
    let content = reply.body_markdown();
    let (heat_index, confidence_index) = match reply {
        AnalysisReply::Embedded(r) if store.store_metrics => (Some(r.heat_index), None),
        AnalysisReply::Strict(r) if store.store_metrics => (None, Some(r.confidence_index)),
        _ => (None, None),
    };

    PersistedRecord {
        title: derive_title(&content, topic),
        sentiment_score: reply.sentiment_score(),
        source: store.source_label.clone(),
        created_at: now.to_rfc3339(),
        heat_index,
        confidence_index,
        content,
    }
}

/// Destination for the finished record.
pub trait RecordSink {
    async fn submit(&self, record: &PersistedRecord) -> Result<(), SinkError>;
}

/// Supabase (PostgREST) table insert.
#[derive(Debug, Clone)]
pub struct SupabaseSink {
    http: Client,
    endpoint: String,
    api_key: String,
}

impl SupabaseSink {
    pub fn new(store: &StoreSettings) -> Result<Self, SinkError> {
        let http = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self::with_http(http, store))
    }

    pub fn with_http(http: Client, store: &StoreSettings) -> Self {
        Self {
            http,
            endpoint: format!("{}/rest/v1/{}", store.url, store.table),
            api_key: store.api_key.clone(),
        }
    }

    fn headers(&self) -> Result<HeaderMap, SinkError> {
        let mut headers = HeaderMap::new();
        headers.insert("apikey", HeaderValue::from_str(&self.api_key)?);
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", self.api_key))?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("prefer", HeaderValue::from_static("return=minimal"));
        Ok(headers)
    }
}

impl RecordSink for SupabaseSink {
    #[instrument(
        level = "info",
        skip_all,
        fields(endpoint = %self.endpoint, title = %record.title)
    )]
    async fn submit(&self, record: &PersistedRecord) -> Result<(), SinkError> {
        let response = self
            .http
            .post(&self.endpoint)
            .headers(self.headers()?)
            .json(record)
            .send()
            .await?;

        let status = response.status().as_u16();
        if !matches!(status, 200 | 201) {
            let body = response.text().await.unwrap_or_default();
            return Err(SinkError::Status {
                status,
                body: truncate_for_log(&body, 300),
            });
        }
        info!(status, "Report saved");
        Ok(())
    }
}
