//! The collect → analyze → parse → persist run.
//!
//! Stages run in sequence on one task; only the scrape step fans out. Every
//! error that reaches this level is fatal for the run and nothing is retried.

use crate::api::{AskAsync, analyze};
use crate::config::Settings;
use crate::context::assemble_context;
use crate::error::PipelineError;
use crate::extract::{SentimentLabel, extract_reply};
use crate::prompts::{ReportContract, build_prompt};
use crate::retriever;
use crate::scrapers::{PageFetcher, SearchBackend};
use crate::sink::{RecordSink, build_record};
use chrono::Local;
use tracing::{error, info, instrument};

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub topic: String,
    /// Documents that made it into the context.
    pub documents: usize,
    pub title: String,
    pub sentiment_score: u8,
}

/// The external collaborators a run talks to.
pub struct Pipeline<'a, S, F, A, K> {
    pub search: &'a S,
    pub fetch: &'a F,
    pub ask: &'a A,
    pub sink: &'a K,
}

impl<S, F, A, K> Pipeline<'_, S, F, A, K>
where
    S: SearchBackend,
    F: PageFetcher,
    A: AskAsync<Response = String>,
    K: RecordSink,
{
    #[instrument(level = "info", skip(self, settings))]
    pub async fn run(
        &self,
        topic: &str,
        contract: ReportContract,
        settings: &Settings,
    ) -> Result<RunSummary, PipelineError> {
        let retrieval =
            retriever::collect(topic, &settings.retrieval, self.search, self.fetch).await;
        if retrieval.dispatched == 0 {
            error!("Aborting: search returned no links");
            return Err(PipelineError::NoSearchResults {
                topic: topic.to_string(),
            });
        }

        let context = assemble_context(&retrieval.documents, settings.retrieval.context_chars);
        if context.trim().is_empty() {
            error!(dispatched = retrieval.dispatched, "Aborting: every scrape failed");
            return Err(PipelineError::EmptyContext {
                topic: topic.to_string(),
            });
        }
        info!(
            documents = retrieval.documents.len(),
            context_chars = context.chars().count(),
            "Context assembled"
        );

        let prompt = build_prompt(topic, &context, contract);
        let raw = analyze(self.ask, &prompt).await?;

        let reply = extract_reply(prompt.contract, &raw).inspect_err(|e| {
            error!(error = %e, "Reply does not follow the requested contract");
        })?;
        let score = reply.sentiment_score();
        info!(
            sentiment_score = score,
            label = ?SentimentLabel::from_score(score),
            "Report extracted"
        );

        let record = build_record(topic, &reply, &settings.store, Local::now());
        self.sink.submit(&record).await.inspect_err(|e| {
            error!(error = %e, "Could not save report");
        })?;

        Ok(RunSummary {
            topic: topic.to_string(),
            documents: retrieval.documents.len(),
            title: record.title,
            sentiment_score: record.sentiment_score,
        })
    }
}
