//! # NexusPulse
//!
//! Produces one market-intelligence report per run: it searches the web for a
//! topic, scrapes the linked pages, asks an OpenAI-compatible model to write a
//! Markdown report with a sentiment score, and inserts the result into a
//! Supabase table.
//!
//! ## Usage
//!
//! ```sh
//! nexus_pulse --query "Bitcoin Regulation Leaks"
//! ```
//!
//! ## Architecture
//!
//! The run is a strict pipeline:
//! 1. **Collect**: build one query per source class, search, scrape the links
//!    concurrently (5 at a time) and assemble a bounded context
//! 2. **Analyze**: one completion request with the selected output contract
//! 3. **Parse**: recover the report body and scores from the reply
//! 4. **Persist**: write exactly one row to the datastore

use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod context;
mod error;
mod extract;
mod models;
mod pipeline;
mod prompts;
mod query;
mod retriever;
mod scrapers;
mod sink;
mod utils;

#[cfg(test)]
mod test_support;

use api::ChatClient;
use cli::Cli;
use config::{Settings, select_topic};
use pipeline::Pipeline;
use scrapers::readable::ReadablePage;
use scrapers::search::WebSearch;
use sink::SupabaseSink;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenvy::dotenv().ok();

    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("nexus_pulse starting up");

    let args = Cli::parse();
    debug!(?args.query, random = args.random, mode = ?args.mode, "Parsed CLI arguments");

    let settings = Settings::from_cli(&args).inspect_err(|e| {
        error!(error = %e, "Configuration is incomplete");
    })?;
    let topic = select_topic(args.query.as_deref(), args.random);

    // ---- Production collaborators ----
    let search = WebSearch::new(settings.retrieval.fetch_timeout)?;
    let fetch = ReadablePage::new(settings.retrieval.fetch_timeout, settings.retrieval.doc_chars)?;
    let ask = ChatClient::new(&settings.completion)?;
    let sink = SupabaseSink::new(&settings.store)?;

    let pipeline = Pipeline {
        search: &search,
        fetch: &fetch,
        ask: &ask,
        sink: &sink,
    };

    let summary = match pipeline.run(&topic, args.mode, &settings).await {
        Ok(summary) => summary,
        Err(e) => {
            error!(%topic, error = %e, "Run failed");
            return Err(e.into());
        }
    };

    let elapsed = start_time.elapsed();
    info!(
        topic = %summary.topic,
        title = %summary.title,
        documents = summary.documents,
        sentiment_score = summary.sentiment_score,
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
