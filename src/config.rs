//! Run configuration resolved once from the CLI and passed to every stage.
//!
//! No stage reads the process environment on its own; tests build a
//! [`Settings`] directly.

use crate::cli::Cli;
use crate::error::ConfigError;
use rand::seq::IndexedRandom;
use std::time::Duration;
use tracing::info;

/// Built-in topics used when no `--query` is given.
pub const TOPICS: [&str; 4] = [
    "Tesla Supply Chain Rumors",
    "NVIDIA AI Chip Demand",
    "Bitcoin Regulation Leaks",
    "Apple VR Headset Sales",
];

#[derive(Debug, Clone)]
pub struct RetrievalSettings {
    /// Results requested per source class.
    pub max_results: usize,
    /// Size of the scrape worker pool.
    pub workers: usize,
    pub doc_chars: usize,
    pub context_chars: usize,
    pub fetch_timeout: Duration,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            max_results: 5,
            workers: 5,
            doc_chars: 3000,
            context_chars: 15000,
            fetch_timeout: Duration::from_secs(20),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompletionSettings {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub url: String,
    pub api_key: String,
    pub table: String,
    pub source_label: String,
    /// Whether the target table has heat_index / confidence_index columns.
    pub store_metrics: bool,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub retrieval: RetrievalSettings,
    pub completion: CompletionSettings,
    pub store: StoreSettings,
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn positive(name: &'static str, value: usize) -> Result<usize, ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid {
            name,
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(value)
}

/// Credentials travel in HTTP headers, so they must be valid header bytes.
fn header_safe(name: &'static str, value: String) -> Result<String, ConfigError> {
    match reqwest::header::HeaderValue::from_str(&value) {
        Ok(_) => Ok(value),
        Err(_) => Err(ConfigError::Invalid {
            name,
            reason: "contains characters not allowed in an HTTP header".to_string(),
        }),
    }
}

impl Settings {
    /// Resolve settings, failing on missing credentials before any network call.
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let api_key = non_empty(cli.llm_api_key.as_deref())
            .or_else(|| non_empty(cli.gemini_api_key.as_deref()))
            .ok_or(ConfigError::Missing("DEEPSEEK_API_KEY or GEMINI_API_KEY"))?;
        let store_url = non_empty(cli.supabase_url.as_deref())
            .ok_or(ConfigError::Missing("NEXT_PUBLIC_SUPABASE_URL"))?;
        let store_key = non_empty(cli.supabase_key.as_deref())
            .ok_or(ConfigError::Missing("NEXT_PUBLIC_SUPABASE_ANON_KEY"))?;
        let api_key = header_safe("llm-api-key", api_key)?;
        let store_key = header_safe("supabase-key", store_key)?;

        let table = cli.table.trim();
        if table.is_empty() {
            return Err(ConfigError::Missing("REPORT_TABLE"));
        }

        Ok(Self {
            retrieval: RetrievalSettings {
                max_results: positive("max-results", cli.max_results)?,
                workers: positive("scrape-workers", cli.scrape_workers)?,
                doc_chars: positive("doc-chars", cli.doc_chars)?,
                context_chars: positive("context-chars", cli.context_chars)?,
                fetch_timeout: Duration::from_secs(cli.fetch_timeout_secs.max(1)),
            },
            completion: CompletionSettings {
                api_key,
                base_url: cli.llm_base_url.trim().trim_end_matches('/').to_string(),
                model: cli.llm_model.clone(),
                temperature: cli.temperature,
                timeout: Duration::from_secs(cli.llm_timeout_secs.clamp(60, 120)),
            },
            store: StoreSettings {
                url: store_url.trim_end_matches('/').to_string(),
                api_key: store_key,
                table: table.to_string(),
                source_label: cli.source_label.clone(),
                store_metrics: cli.store_metrics,
            },
        })
    }
}

/// Pick the run's topic: explicit query, else random or first built-in topic.
pub fn select_topic(query: Option<&str>, random: bool) -> String {
    if let Some(topic) = non_empty(query) {
        return topic;
    }
    let topic = if random {
        TOPICS.choose(&mut rand::rng()).copied().unwrap_or(TOPICS[0])
    } else {
        TOPICS[0]
    };
    info!(topic, random, "No query given; using built-in topic");
    topic.to_string()
}
