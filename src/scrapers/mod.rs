//! Web collaborators used by the retriever.
//!
//! The retriever only sees two seams:
//!
//! 1. [`SearchBackend`]: query string + backend selector -> list of links
//! 2. [`PageFetcher`]: URL -> readable plain text (or nothing)
//!
//! # Production implementations
//!
//! | Seam | Type | Source |
//! |------|------|--------|
//! | search, [`BackendKind::News`] | [`search::WebSearch`] | Bing News RSS search |
//! | search, [`BackendKind::Text`] | [`search::WebSearch`] | DuckDuckGo HTML results |
//! | fetch | [`readable::ReadablePage`] | direct GET + `scraper` text extraction |
//!
//! Tests substitute in-memory fakes for both traits.

use crate::error::ScrapeError;

pub mod readable;
pub mod search;

/// Which search index a query is sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// News/discussion index, used for official sources.
    News,
    /// General web text index, used for community sources.
    Text,
}

/// A raw link returned by a search backend.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
}

/// Search a backend for links.
pub trait SearchBackend {
    /// Run `query` against the `kind` index, returning at most `limit` hits.
    async fn search(
        &self,
        query: &str,
        kind: BackendKind,
        limit: usize,
    ) -> Result<Vec<SearchHit>, ScrapeError>;
}

/// Download a page and extract its readable text.
pub trait PageFetcher {
    /// `Ok(None)` means the page was reachable but held nothing readable.
    async fn fetch_text(&self, url: &str) -> Result<Option<String>, ScrapeError>;
}

/// Shared user agent for outgoing scrape requests.
pub(crate) const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";
