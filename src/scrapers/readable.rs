//! Fetch a page and pull out its main readable text.
//!
//! The text root is the first `<article>`, else `<main>`, else `<body>`.
//! Within it, headings, paragraphs, list items, quotes, preformatted blocks
//! and table rows are kept; blocks inside navigation chrome are skipped.
//! Comment threads anywhere on the page are appended after the main text.

use super::{PageFetcher, USER_AGENT};
use crate::error::ScrapeError;
use crate::utils::{compact_ws, truncate_chars};
use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, instrument};

const BLOCK_TAGS: [&str; 8] = ["h1", "h2", "h3", "p", "li", "blockquote", "pre", "tr"];
const CHROME_TAGS: [&str; 4] = ["nav", "footer", "aside", "header"];

static CELL_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("th, td").expect("static selector parses"));

/// Direct-GET page fetcher with a per-request timeout.
#[derive(Debug, Clone)]
pub struct ReadablePage {
    client: Client,
    max_chars: usize,
}

impl ReadablePage {
    pub fn new(timeout: Duration, max_chars: usize) -> Result<Self, ScrapeError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client, max_chars })
    }
}

impl PageFetcher for ReadablePage {
    #[instrument(level = "debug", skip(self))]
    async fn fetch_text(&self, url: &str) -> Result<Option<String>, ScrapeError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Status(status.as_u16()));
        }
        let body = response.text().await?;
        let text = extract_readable_text(&body, self.max_chars);
        debug!(bytes = body.len(), extracted = text.as_ref().map(|t| t.len()), "Parsed page");
        Ok(text)
    }
}

/// True when `el` sits inside another block (already collected through it)
/// or inside page chrome, looking no further up than `root`.
fn is_nested_or_chrome(el: &ElementRef<'_>, root: &ElementRef<'_>) -> bool {
    el.ancestors()
        .take_while(|n| n.id() != root.id())
        .filter_map(|n| n.value().as_element().map(|e| e.name()))
        .any(|name| CHROME_TAGS.contains(&name) || BLOCK_TAGS.contains(&name))
}

fn block_text(el: &ElementRef<'_>) -> String {
    if el.value().name() == "tr" {
        let cells = el
            .select(&CELL_SELECTOR)
            .map(|c| compact_ws(&c.text().collect::<Vec<_>>().join(" ")))
            .filter(|c| !c.is_empty())
            .collect::<Vec<_>>();
        return cells.join(" | ");
    }
    compact_ws(&el.text().collect::<Vec<_>>().join(" "))
}

/// Extract readable text from an HTML document, capped at `max_chars`.
///
/// Returns `None` when no text block survives.
pub fn extract_readable_text(html: &str, max_chars: usize) -> Option<String> {
    let document = Html::parse_document(html);

    let root = ["article", "main", "body"]
        .iter()
        .filter_map(|tag| Selector::parse(tag).ok())
        .find_map(|sel| document.select(&sel).next())?;

    let block_sel = Selector::parse(&BLOCK_TAGS.join(", ")).ok()?;
    let mut seen = HashSet::new();
    let mut blocks = Vec::new();

    for el in root.select(&block_sel) {
        if is_nested_or_chrome(&el, &root) {
            continue;
        }
        let text = block_text(&el);
        if !text.is_empty() && seen.insert(text.clone()) {
            blocks.push(text);
        }
    }

    if let Ok(comment_sel) = Selector::parse(
        "[id*='comment'] p, [class*='comment'] p, [id*='comment'] li, [class*='comment'] li",
    ) {
        for el in document.select(&comment_sel) {
            let text = block_text(&el);
            if !text.is_empty() && seen.insert(text.clone()) {
                blocks.push(text);
            }
        }
    }

    if blocks.is_empty() {
        return None;
    }
    let joined = blocks.join("\n\n");
    Some(truncate_chars(&joined, max_chars).to_string())
}
