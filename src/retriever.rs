//! Dual-source search followed by a bounded, concurrent scrape.
//!
//! Searches run one source class at a time. Every link found is then handed
//! to a pool of `workers` concurrent scrapes; documents are collected in the
//! order the scrapes finish, not the order they were dispatched.
//!
//! A link is de-duplicated only within its own source class; the same URL found
//! by both classes is scraped once per class so each keeps its attribution.
//!
//! Failures stay local: a failed search yields no links for that class, and a
//! failed scrape drops that URL. Neither is retried.

use crate::config::RetrievalSettings;
use crate::models::{ExtractedDocument, SearchResult, SourceClass};
use crate::query::{SourceQuery, default_queries};
use crate::scrapers::{BackendKind, PageFetcher, SearchBackend};
use crate::utils::truncate_chars;
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use tracing::{debug, error, info, instrument, warn};

/// Backend each source class is searched on.
pub fn backend_for(class: SourceClass) -> BackendKind {
    match class {
        SourceClass::Official => BackendKind::News,
        SourceClass::Community => BackendKind::Text,
    }
}

/// What the retriever gathered for one topic.
#[derive(Debug, Default)]
pub struct Retrieval {
    /// Number of distinct links dispatched to the scrape pool.
    pub dispatched: usize,
    /// Successfully extracted documents, in completion order.
    pub documents: Vec<ExtractedDocument>,
}

/// Run every query on its class backend, one after another.
#[instrument(level = "info", skip(queries, search), fields(queries = queries.len()))]
pub async fn search_all<S: SearchBackend>(
    queries: &[SourceQuery],
    max_results: usize,
    search: &S,
) -> Vec<SearchResult> {
    let mut results = Vec::new();
    for q in queries {
        let kind = backend_for(q.source_class);
        info!(class = %q.source_class, query = %q.query, "Searching");
        match search.search(&q.query, kind, max_results).await {
            Ok(hits) => {
                info!(class = %q.source_class, count = hits.len(), "Found links");
                results.extend(hits.into_iter().take(max_results).map(|hit| SearchResult {
                    title: hit.title,
                    url: hit.url,
                    source_class: q.source_class,
                }));
            }
            Err(e) => {
                error!(
                    class = %q.source_class,
                    error = %e,
                    "Search failed; continuing without this source"
                );
            }
        }
    }
    results
        .into_iter()
        .filter(|r| !r.url.trim().is_empty())
        .unique_by(|r| (r.source_class, r.url.clone()))
        .collect()
}

async fn scrape_one<F: PageFetcher>(
    fetch: &F,
    link: SearchResult,
    doc_chars: usize,
) -> Option<ExtractedDocument> {
    match fetch.fetch_text(&link.url).await {
        Ok(Some(text)) if !text.trim().is_empty() => {
            debug!(url = %link.url, title = %link.title, "Scraped page");
            Some(ExtractedDocument {
                source_class: link.source_class,
                text: truncate_chars(text.trim(), doc_chars).to_string(),
                url: link.url,
            })
        }
        Ok(_) => {
            debug!(url = %link.url, "Page held no readable text; dropped");
            None
        }
        Err(e) => {
            warn!(url = %link.url, error = %e, "Scrape failed; dropped");
            None
        }
    }
}

/// Scrape every link with at most `workers` fetches in flight.
#[instrument(level = "info", skip_all, fields(links = links.len(), workers = workers))]
pub async fn scrape_all<F: PageFetcher>(
    links: Vec<SearchResult>,
    workers: usize,
    doc_chars: usize,
    fetch: &F,
) -> Vec<ExtractedDocument> {
    let total = links.len();
    let documents: Vec<ExtractedDocument> = stream::iter(links)
        .map(|link| scrape_one(fetch, link, doc_chars))
        .buffer_unordered(workers.max(1))
        .filter_map(std::future::ready)
        .collect()
        .await;

    info!(
        total,
        scraped = documents.len(),
        failed = total - documents.len(),
        "Scrape pool finished"
    );
    documents
}

/// Search both source classes for `topic`, then scrape every link found.
#[instrument(level = "info", skip(settings, search, fetch))]
pub async fn collect<S: SearchBackend, F: PageFetcher>(
    topic: &str,
    settings: &RetrievalSettings,
    search: &S,
    fetch: &F,
) -> Retrieval {
    let links = search_all(&default_queries(topic), settings.max_results, search).await;
    if links.is_empty() {
        warn!("No search results found");
        return Retrieval::default();
    }

    info!(count = links.len(), "Scraping links");
    let dispatched = links.len();
    let documents = scrape_all(links, settings.workers, settings.doc_chars, fetch).await;
    Retrieval {
        dispatched,
        documents,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScrapeError;
    use crate::scrapers::SearchHit;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FakeSearch {
        news: Result<Vec<&'static str>, u16>,
        text: Result<Vec<&'static str>, u16>,
        calls: Mutex<Vec<(String, BackendKind)>>,
    }

    impl SearchBackend for FakeSearch {
        async fn search(
            &self,
            query: &str,
            kind: BackendKind,
            _limit: usize,
        ) -> Result<Vec<SearchHit>, ScrapeError> {
            self.calls.lock().unwrap().push((query.to_string(), kind));
            let urls = match kind {
                BackendKind::News => &self.news,
                BackendKind::Text => &self.text,
            };
            match urls {
                Ok(urls) => Ok(urls
                    .iter()
                    .map(|u| SearchHit {
                        title: format!("title of {u}"),
                        url: u.to_string(),
                    })
                    .collect()),
                Err(status) => Err(ScrapeError::Status(*status)),
            }
        }
    }

    /// Fails every URL containing "bad"; later URLs finish first.
    struct FakeFetch {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl FakeFetch {
        fn new() -> Self {
            Self {
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    impl PageFetcher for FakeFetch {
        async fn fetch_text(&self, url: &str) -> Result<Option<String>, ScrapeError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            let delay = 50u64.saturating_sub(url.len() as u64 % 50);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if url.contains("bad") {
                Err(ScrapeError::Status(500))
            } else if url.contains("empty") {
                Ok(None)
            } else {
                Ok(Some(format!("  body of {url}  ")))
            }
        }
    }

    fn link(url: &str, class: SourceClass) -> SearchResult {
        SearchResult {
            title: String::new(),
            url: url.to_string(),
            source_class: class,
        }
    }

    #[test]
    fn test_backend_selection() {
        assert_eq!(backend_for(SourceClass::Official), BackendKind::News);
        assert_eq!(backend_for(SourceClass::Community), BackendKind::Text);
    }

    #[tokio::test]
    async fn test_search_failure_isolated_per_class() {
        let search = FakeSearch {
            news: Err(503),
            text: Ok(vec!["https://reddit.com/r/a", "https://reddit.com/r/b"]),
            calls: Mutex::new(Vec::new()),
        };
        let results = search_all(&default_queries("Tesla"), 5, &search).await;

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.source_class == SourceClass::Community));
        let calls = search.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].1, BackendKind::News);
        assert!(calls[1].0.contains("site:reddit.com"));
    }

    #[tokio::test]
    async fn test_search_caps_and_dedupes() {
        let search = FakeSearch {
            news: Ok(vec!["https://a.com/1", "https://a.com/2", "https://a.com/3"]),
            text: Ok(vec!["https://a.com/1", "https://b.com/1"]),
            calls: Mutex::new(Vec::new()),
        };
        let results = search_all(&default_queries("Tesla"), 2, &search).await;
        let urls: Vec<_> = results
            .iter()
            .map(|r| (r.source_class, r.url.as_str()))
            .collect();
        assert_eq!(
            urls,
            vec![
                (SourceClass::Official, "https://a.com/1"),
                (SourceClass::Official, "https://a.com/2"),
                (SourceClass::Community, "https://a.com/1"),
                (SourceClass::Community, "https://b.com/1"),
            ]
        );
    }

    #[tokio::test]
    async fn test_shared_url_keeps_both_attributions() {
        let search = FakeSearch {
            news: Ok(vec!["https://x.com/story", "https://x.com/story"]),
            text: Ok(vec!["https://x.com/story"]),
            calls: Mutex::new(Vec::new()),
        };
        let settings = RetrievalSettings::default();
        let retrieval = collect("Tesla", &settings, &search, &FakeFetch::new()).await;

        assert_eq!(retrieval.dispatched, 2);
        let classes: HashSet<SourceClass> =
            retrieval.documents.iter().map(|d| d.source_class).collect();
        assert_eq!(
            classes,
            HashSet::from([SourceClass::Official, SourceClass::Community])
        );
    }

    #[tokio::test]
    async fn test_scrape_returns_n_minus_failures() {
        let links = vec![
            link("https://a.com/1", SourceClass::Official),
            link("https://a.com/bad", SourceClass::Official),
            link("https://a.com/longer-path-3", SourceClass::Official),
            link("https://b.com/empty", SourceClass::Community),
            link("https://b.com/5", SourceClass::Community),
            link("https://b.com/bad-too", SourceClass::Community),
            link("https://b.com/7777777", SourceClass::Community),
        ];
        let expected: HashSet<String> = links
            .iter()
            .filter(|l| !l.url.contains("bad") && !l.url.contains("empty"))
            .map(|l| l.url.clone())
            .collect();

        let fetch = FakeFetch::new();
        let docs = scrape_all(links, 3, 3000, &fetch).await;

        assert_eq!(docs.len(), 4);
        let got: HashSet<String> = docs.iter().map(|d| d.url.clone()).collect();
        assert_eq!(got, expected);
        assert!(docs.iter().all(|d| d.text == format!("body of {}", d.url)));
        assert!(fetch.peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_scrape_caps_document_text() {
        struct Long;
        impl PageFetcher for Long {
            async fn fetch_text(&self, _url: &str) -> Result<Option<String>, ScrapeError> {
                Ok(Some("x".repeat(10_000)))
            }
        }
        let links = vec![link("https://a.com", SourceClass::Official)];
        let docs = scrape_all(links, 5, 3000, &Long).await;
        assert_eq!(docs[0].text.len(), 3000);
    }

    #[tokio::test]
    async fn test_collect_with_no_links() {
        let search = FakeSearch {
            news: Ok(vec![]),
            text: Err(429),
            calls: Mutex::new(Vec::new()),
        };
        let settings = RetrievalSettings::default();
        let retrieval = collect("Tesla", &settings, &search, &FakeFetch::new()).await;
        assert_eq!(retrieval.dispatched, 0);
        assert!(retrieval.documents.is_empty());
    }
}
