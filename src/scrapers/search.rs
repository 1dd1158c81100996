//! Search backends over plain HTTP.
//!
//! - [`BackendKind::News`] reads the Bing News RSS search feed. Item links are
//!   `apiclick.aspx?url=` click-through wrappers that get decoded back to the
//!   publisher's article URL.
//! - [`BackendKind::Text`] reads DuckDuckGo's HTML results page, whose links
//!   are wrapped in `/l/?uddg=` redirects that get decoded back to the target.
//!
//! Links that still point at a search engine after decoding are dropped, so
//! the scrape pool only ever fetches publisher pages.

use super::{BackendKind, SearchBackend, SearchHit, USER_AGENT};
use crate::error::ScrapeError;
use crate::utils::compact_ws;
use quick_xml::Reader;
use quick_xml::events::Event;
use reqwest::Client;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, instrument};
use url::Url;

const NEWS_RSS_URL: &str = "https://www.bing.com/news/search";
const TEXT_SEARCH_URL: &str = "https://html.duckduckgo.com/html/";

/// HTTP search client covering both backend kinds.
#[derive(Debug, Clone)]
pub struct WebSearch {
    client: Client,
    news_url: String,
    text_url: String,
}

impl WebSearch {
    pub fn new(timeout: Duration) -> Result<Self, ScrapeError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            news_url: NEWS_RSS_URL.to_string(),
            text_url: TEXT_SEARCH_URL.to_string(),
        })
    }

    pub fn news_search_url(&self, query: &str) -> String {
        format!(
            "{}?q={}&format=rss&setlang=en-US",
            self.news_url,
            urlencoding::encode(query.trim())
        )
    }

    pub fn text_search_url(&self, query: &str) -> Result<String, ScrapeError> {
        let mut url = Url::parse(&self.text_url).map_err(|e| ScrapeError::Url {
            url: self.text_url.clone(),
            reason: e.to_string(),
        })?;
        url.query_pairs_mut().append_pair("q", query.trim());
        Ok(url.to_string())
    }

    async fn get_text(&self, url: &str) -> Result<String, ScrapeError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Status(status.as_u16()));
        }
        Ok(response.text().await?)
    }
}

impl SearchBackend for WebSearch {
    #[instrument(level = "info", skip(self))]
    async fn search(
        &self,
        query: &str,
        kind: BackendKind,
        limit: usize,
    ) -> Result<Vec<SearchHit>, ScrapeError> {
        let hits = match kind {
            BackendKind::News => {
                let body = self.get_text(&self.news_search_url(query)).await?;
                parse_news_feed(&body, limit)?
            }
            BackendKind::Text => {
                let body = self.get_text(&self.text_search_url(query)?).await?;
                parse_text_results(&body, limit)
            }
        };
        info!(count = hits.len(), ?kind, "Search returned links");
        debug!(urls = ?hits.iter().map(|h| &h.url).collect::<Vec<_>>(), "Search links");
        Ok(hits)
    }
}

/// Resolve one raw XML text fragment, keeping it verbatim if it does not unescape.
fn decode_piece(raw: &str) -> String {
    quick_xml::escape::unescape(raw)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

/// Parse `<item>` entries (title + link) out of an RSS feed.
pub fn parse_news_feed(xml: &str, limit: usize) -> Result<Vec<SearchHit>, ScrapeError> {
    let mut reader = Reader::from_str(xml);

    let mut hits = Vec::new();
    let mut seen = HashSet::new();
    let mut in_item = false;
    let mut current_tag = String::new();
    let mut title = String::new();
    let mut link = String::new();

    loop {
        if hits.len() >= limit {
            break;
        }
        let piece = match reader.read_event()? {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if name == "item" {
                    in_item = true;
                    title.clear();
                    link.clear();
                }
                current_tag = name;
                continue;
            }
            Event::End(e) => {
                if e.name().as_ref() == b"item" && in_item {
                    in_item = false;
                    match normalize_news_link(&link) {
                        Some(url) if seen.insert(url.clone()) => hits.push(SearchHit {
                            title: compact_ws(&title),
                            url,
                        }),
                        Some(_) => {}
                        None => {
                            debug!(link = %link.trim(), "Feed item has no publisher link; skipped")
                        }
                    }
                }
                current_tag.clear();
                continue;
            }
            Event::Text(e) => decode_piece(&String::from_utf8_lossy(e.as_ref())),
            Event::GeneralRef(e) => {
                decode_piece(&format!("&{};", String::from_utf8_lossy(e.as_ref())))
            }
            Event::CData(e) => String::from_utf8_lossy(e.as_ref()).into_owned(),
            Event::Eof => break,
            _ => continue,
        };

        if in_item {
            match current_tag.as_str() {
                "title" => title.push_str(&piece),
                "link" => link.push_str(&piece),
                _ => {}
            }
        }
    }

    Ok(hits)
}

fn absolutize_href(href: &str) -> String {
    let trimmed = href.trim();
    if let Some(rest) = trimmed.strip_prefix("//") {
        return format!("https://{rest}");
    }
    if trimmed.starts_with("/l/") {
        return format!("https://duckduckgo.com{trimmed}");
    }
    trimmed.to_string()
}

/// Query parameter carrying the target of a search engine click-through link.
fn redirect_param(host: &str, path: &str) -> Option<&'static str> {
    if host.ends_with("duckduckgo.com") && path.starts_with("/l/") {
        Some("uddg")
    } else if host.ends_with("bing.com") && path.to_ascii_lowercase().ends_with("/apiclick.aspx") {
        Some("url")
    } else {
        None
    }
}

/// Unwrap a DuckDuckGo `/l/?uddg=` or Bing News `apiclick.aspx?url=` redirect.
fn decode_redirect(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    let param = redirect_param(&host, parsed.path())?;
    let target = parsed
        .query_pairs()
        .find(|(k, _)| k == param)
        .map(|(_, v)| v.trim().to_string())?;
    let mut dest = Url::parse(&target).ok()?;
    dest.set_fragment(None);
    Some(dest.to_string())
}

fn is_search_engine_host(url: &Url) -> bool {
    url.host_str()
        .map(|h| h.to_ascii_lowercase())
        .is_some_and(|h| {
            h.ends_with("duckduckgo.com") || h.ends_with("google.com") || h.ends_with("bing.com")
        })
}

/// Turn a result anchor's href into an absolute http(s) URL of the target page.
///
/// Returns `None` for non-web schemes and for links that still point at a
/// search engine once redirects are unwrapped.
pub fn normalize_result_href(href: &str) -> Option<String> {
    let abs = absolutize_href(href);
    let resolved = decode_redirect(&abs).unwrap_or(abs);
    let parsed = Url::parse(&resolved).ok()?;
    match parsed.scheme() {
        "http" | "https" if !is_search_engine_host(&parsed) => Some(resolved),
        _ => None,
    }
}

/// Publisher URL behind a news feed item's `<link>`.
pub fn normalize_news_link(link: &str) -> Option<String> {
    let link = link.trim();
    if link.is_empty() {
        return None;
    }
    normalize_result_href(link)
}

/// Parse organic results out of a DuckDuckGo HTML results page.
pub fn parse_text_results(html: &str, limit: usize) -> Vec<SearchHit> {
    let document = Html::parse_document(html);
    let mut hits = Vec::new();
    let mut seen = HashSet::new();

    let (Ok(container_sel), Ok(anchor_sel)) = (
        Selector::parse("div.result:not(.result--ad)"),
        Selector::parse("a.result__a"),
    ) else {
        return hits;
    };

    for container in document.select(&container_sel) {
        if hits.len() >= limit {
            break;
        }
        let Some(anchor) = container.select(&anchor_sel).next() else {
            continue;
        };
        let Some(url) = anchor.value().attr("href").and_then(normalize_result_href) else {
            continue;
        };
        if !seen.insert(url.clone()) {
            continue;
        }
        hits.push(SearchHit {
            title: compact_ws(&anchor.text().collect::<Vec<_>>().join(" ")),
            url,
        });
    }

    hits
}
