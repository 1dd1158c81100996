//! Command-line interface definitions for NexusPulse.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Credentials and endpoints can be provided via command-line flags or
//! environment variables (a `.env` file is loaded before parsing).

use crate::prompts::ReportContract;
use clap::Parser;

/// Command-line arguments for a single report run.
///
/// # Examples
///
/// ```sh
/// # Report on the default topic
/// nexus_pulse
///
/// # Report on a chosen topic, strict JSON contract
/// nexus_pulse --query "NVIDIA AI Chip Demand" --mode strict
///
/// # Random topic from the built-in list, store heat index too
/// nexus_pulse --random --store-metrics
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Target topic (overrides the built-in topic list)
    #[arg(short, long)]
    pub query: Option<String>,

    /// Pick a random topic from the built-in list instead of the first one
    #[arg(long, conflicts_with = "query")]
    pub random: bool,

    /// Output contract requested from the model
    #[arg(
        long,
        value_enum,
        env = "REPORT_MODE",
        default_value_t = ReportContract::EmbeddedMetadata
    )]
    pub mode: ReportContract,

    /// Completion API key
    #[arg(long, env = "DEEPSEEK_API_KEY", hide_env_values = true)]
    pub llm_api_key: Option<String>,

    /// Fallback completion API key, used when no DeepSeek key is set
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,

    /// Base URL of the OpenAI-compatible completion API
    #[arg(long, env = "LLM_BASE_URL", default_value = "https://api.deepseek.com/v1")]
    pub llm_base_url: String,

    /// Completion model name
    #[arg(long, env = "LLM_MODEL", default_value = "deepseek-chat")]
    pub llm_model: String,

    /// Sampling temperature
    #[arg(long, default_value_t = 0.3)]
    pub temperature: f32,

    /// Completion request timeout in seconds (60-120)
    #[arg(long, default_value_t = 60)]
    pub llm_timeout_secs: u64,

    /// Supabase project URL
    #[arg(long, env = "NEXT_PUBLIC_SUPABASE_URL")]
    pub supabase_url: Option<String>,

    /// Supabase API key
    #[arg(long, env = "NEXT_PUBLIC_SUPABASE_ANON_KEY", hide_env_values = true)]
    pub supabase_key: Option<String>,

    /// Table the report is written to
    #[arg(long, env = "REPORT_TABLE", default_value = "market_news")]
    pub table: String,

    /// Value stored in the record's `source` column
    #[arg(long, default_value = "NexusPulse HQ")]
    pub source_label: String,

    /// Also store heat_index / confidence_index columns
    #[arg(long)]
    pub store_metrics: bool,

    /// Search results per source class
    #[arg(long, default_value_t = 5)]
    pub max_results: usize,

    /// Concurrent page scrapes
    #[arg(long, default_value_t = 5)]
    pub scrape_workers: usize,

    /// Character cap per scraped document
    #[arg(long, default_value_t = 3000)]
    pub doc_chars: usize,

    /// Character cap for the combined context sent to the model
    #[arg(long, default_value_t = 15000)]
    pub context_chars: usize,

    /// Per-URL fetch timeout in seconds
    #[arg(long, default_value_t = 20)]
    pub fetch_timeout_secs: u64,
}
