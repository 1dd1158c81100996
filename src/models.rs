//! Data models passed between pipeline stages.
//!
//! Each stage owns its output exclusively until it hands it to the next one:
//! - [`SearchResult`]: a link found by a search backend for one source class
//! - [`ExtractedDocument`]: readable text scraped from one of those links
//! - [`AnalysisReply`]: the model's report, recovered by the extractor
//! - [`PersistedRecord`]: the flat row written to the datastore

use serde::{Deserialize, Serialize};
use std::fmt;

/// Score used whenever the model does not provide a usable value.
pub const DEFAULT_SCORE: u8 = 50;

/// Category of search origin. Each class has its own query template and backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceClass {
    /// News-oriented sources.
    Official,
    /// Forum and social-media sources.
    Community,
}

impl SourceClass {
    /// Every known class, in the order searches are issued.
    pub const ALL: [SourceClass; 2] = [SourceClass::Official, SourceClass::Community];

    /// Parse a class name. Unknown names yield `None`.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "official" => Some(SourceClass::Official),
            "community" => Some(SourceClass::Community),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceClass::Official => "official",
            SourceClass::Community => "community",
        }
    }
}

impl fmt::Display for SourceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single search hit, consumed once by the retriever.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub source_class: SourceClass,
}

/// Readable text scraped from one URL. Only successful scrapes produce one.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedDocument {
    pub source_class: SourceClass,
    pub url: String,
    /// Already capped at the per-document character budget.
    pub text: String,
}

/// Report recovered from a reply written under the embedded-metadata contract.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedReport {
    /// Markdown body with the metadata block removed (or the raw reply when
    /// the block could not be parsed).
    pub body: String,
    pub sentiment_score: u8,
    pub heat_index: u8,
}

/// Report recovered from a reply written under the strict-JSON contract.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StrictReport {
    pub title: String,
    pub summary: String,
    #[serde(deserialize_with = "crate::extract::de_percent")]
    pub sentiment_score: u8,
    /// 0-10 in this contract.
    #[serde(deserialize_with = "crate::extract::de_decile")]
    pub confidence_index: u8,
    pub key_entities: Vec<String>,
    pub actionable_insight: String,
    pub risk_alert: String,
}

impl StrictReport {
    /// Render the structured fields as the markdown body that gets stored.
    pub fn to_markdown(&self) -> String {
        let mut md = format!("# {}\n\n{}\n", self.title.trim(), self.summary.trim());
        if !self.key_entities.is_empty() {
            md.push_str("\n**Key Entities:** ");
            md.push_str(&self.key_entities.join(", "));
            md.push('\n');
        }
        if !self.actionable_insight.trim().is_empty() {
            md.push_str(&format!(
                "\n**Actionable Insight:** {}\n",
                self.actionable_insight.trim()
            ));
        }
        if !self.risk_alert.trim().is_empty() {
            md.push_str(&format!("\n**Risk Alert:** {}\n", self.risk_alert.trim()));
        }
        md
    }
}

/// What the structured extractor produced, tagged by the contract it was read under.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisReply {
    Embedded(EmbeddedReport),
    Strict(StrictReport),
}

impl AnalysisReply {
    pub fn body_markdown(&self) -> String {
        match self {
            AnalysisReply::Embedded(r) => r.body.clone(),
            AnalysisReply::Strict(r) => r.to_markdown(),
        }
    }

    pub fn sentiment_score(&self) -> u8 {
        match self {
            AnalysisReply::Embedded(r) => r.sentiment_score,
            AnalysisReply::Strict(r) => r.sentiment_score,
        }
    }
}

/// Row written to the datastore. Built once per run and submitted once.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersistedRecord {
    pub title: String,
    pub content: String,
    pub sentiment_score: u8,
    pub source: String,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heat_index: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence_index: Option<u8>,
}
