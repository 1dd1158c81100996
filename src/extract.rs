//! Recover a typed report from the model's reply.
//!
//! Two variants, selected by the [`ReportContract`] the prompt was built with:
//!
//! - **Embedded metadata**: prose with a ```json block holding
//!   `sentiment_score` and `heat_index`. Never fails. A missing or broken
//!   block leaves the reply untouched and both scores at 50.
//! - **Strict JSON**: the whole reply is one object with a fixed schema,
//!   optionally wrapped in code fences. Anything unparsable is an error that
//!   ends the run.

use crate::error::ExtractError;
use crate::models::{AnalysisReply, DEFAULT_SCORE, EmbeddedReport, StrictReport};
use crate::prompts::ReportContract;
use crate::utils::{looks_truncated, truncate_chars};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, instrument, warn};

/// Characters of the offending reply quoted in a strict-mode diagnostic.
const DIAGNOSTIC_PREFIX_CHARS: usize = 200;

static METADATA_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```json\s*(\{.*?\})\s*```").expect("metadata pattern compiles")
});

/// Categorical sentiment some replies give instead of a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentimentLabel {
    Bearish,
    Neutral,
    Bullish,
}

impl SentimentLabel {
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "bearish" | "negative" => Some(SentimentLabel::Bearish),
            "neutral" | "mixed" => Some(SentimentLabel::Neutral),
            "bullish" | "positive" => Some(SentimentLabel::Bullish),
            _ => None,
        }
    }

    pub fn score(self) -> u8 {
        match self {
            SentimentLabel::Bearish => 25,
            SentimentLabel::Neutral => 50,
            SentimentLabel::Bullish => 75,
        }
    }

    pub fn from_score(score: u8) -> Self {
        match score {
            0..40 => SentimentLabel::Bearish,
            40..=60 => SentimentLabel::Neutral,
            _ => SentimentLabel::Bullish,
        }
    }
}

/// Read a number (or numeric string), rounded and clamped to `0..=max`.
fn bounded_score(value: &Value, max: u8) -> Option<u8> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !n.is_finite() {
        return None;
    }
    Some(n.round().clamp(0.0, max as f64) as u8)
}

fn de_bounded<'de, D>(deserializer: D, max: u8) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    bounded_score(&value, max).ok_or_else(|| {
        serde::de::Error::custom(format!("expected a number between 0 and {max}, got {value}"))
    })
}

pub(crate) fn de_percent<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    de_bounded(deserializer, 100)
}

pub(crate) fn de_decile<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    de_bounded(deserializer, 10)
}

/// Embedded-metadata variant. Always yields a report.
pub fn extract_embedded(raw: &str) -> EmbeddedReport {
    let untouched = || EmbeddedReport {
        body: raw.to_string(),
        sentiment_score: DEFAULT_SCORE,
        heat_index: DEFAULT_SCORE,
    };

    let Some(caps) = METADATA_BLOCK.captures(raw) else {
        debug!("No metadata block in reply; using default scores");
        return untouched();
    };
    let (Some(block), Some(object)) = (caps.get(0), caps.get(1)) else {
        return untouched();
    };

    let metadata = match serde_json::from_str::<Value>(object.as_str()) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            warn!(kind = ?other, "Metadata block is not an object; using default scores");
            return untouched();
        }
        Err(e) => {
            warn!(error = %e, "Metadata block is not valid JSON; using default scores");
            return untouched();
        }
    };

    let sentiment_score = metadata
        .get("sentiment_score")
        .and_then(|v| bounded_score(v, 100))
        .or_else(|| {
            metadata
                .get("sentiment_label")
                .and_then(Value::as_str)
                .and_then(SentimentLabel::parse)
                .map(SentimentLabel::score)
        })
        .unwrap_or(DEFAULT_SCORE);
    let heat_index = metadata
        .get("heat_index")
        .and_then(|v| bounded_score(v, 100))
        .unwrap_or(DEFAULT_SCORE);

    let mut body = String::with_capacity(raw.len());
    body.push_str(&raw[..block.start()]);
    body.push_str(&raw[block.end()..]);

    EmbeddedReport {
        body: body.trim().to_string(),
        sentiment_score,
        heat_index,
    }
}

/// Remove a leading ```json / ``` fence and a trailing ``` fence.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```JSON"))
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open
        .trim()
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
}

/// Strict-JSON variant. Fails on anything that does not match the schema.
pub fn extract_strict(raw: &str) -> Result<StrictReport, ExtractError> {
    serde_json::from_str::<StrictReport>(strip_code_fences(raw)).map_err(|e| {
        let reason = if looks_truncated(&e) {
            format!("{e}; reply looks truncated")
        } else {
            e.to_string()
        };
        ExtractError::MalformedJson {
            reason,
            prefix: truncate_chars(raw.trim(), DIAGNOSTIC_PREFIX_CHARS).to_string(),
        }
    })
}

/// Parse `raw` under the contract the prompt asked for.
#[instrument(level = "info", skip(raw), fields(reply_chars = raw.chars().count()))]
pub fn extract_reply(contract: ReportContract, raw: &str) -> Result<AnalysisReply, ExtractError> {
    match contract {
        ReportContract::EmbeddedMetadata => Ok(AnalysisReply::Embedded(extract_embedded(raw))),
        ReportContract::StrictJson => extract_strict(raw).map(AnalysisReply::Strict),
    }
}
