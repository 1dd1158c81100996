//! Error types for each stage boundary and for the run as a whole.
//!
//! Failures that are dropped (one URL, one source class) or defaulted
//! (embedded metadata) never reach [`PipelineError`]; everything that does is
//! fatal for the run and ends the process with a non-zero status.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting: {0}")]
    Missing(&'static str),
    #[error("invalid setting {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Search or fetch failure for a single source class or URL.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("feed parse failed: {0}")]
    Feed(#[from] quick_xml::Error),
    #[error("invalid url {url}: {reason}")]
    Url { url: String, reason: String },
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("completion request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("completion API key is not a valid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
    #[error("completion endpoint returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("completion response had no message content")]
    EmptyReply,
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("reply is not valid report JSON ({reason}); reply starts with: {prefix:?}")]
    MalformedJson { reason: String, prefix: String },
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("persistence request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("persistence API key is not a valid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
    #[error("persistence endpoint returned {status}: {body}")]
    Status { status: u16, body: String },
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no search results for {topic:?}")]
    NoSearchResults { topic: String },
    #[error("no readable content could be extracted for {topic:?}")]
    EmptyContext { topic: String },
    #[error("analysis failed: {0}")]
    Analysis(#[from] AnalysisError),
    #[error("extraction failed: {0}")]
    Extraction(#[from] ExtractError),
    #[error("persistence failed: {0}")]
    Persistence(#[from] SinkError),
}
