//! Prompt construction, tagged with the output contract it asks for.
//!
//! The contract chosen here is carried on the [`Prompt`] and later selects the
//! extraction variant, so the reply parser never guesses from reply shape.

use clap::ValueEnum;

/// Output format the model is instructed to follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportContract {
    /// Markdown report with a trailing ```json block of scores.
    #[value(name = "embedded")]
    EmbeddedMetadata,
    /// A single JSON object with a fixed set of fields.
    #[value(name = "strict")]
    StrictJson,
}

/// A system + user prompt pair and the contract it requests.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
    pub contract: ReportContract,
}

impl Prompt {
    /// `response_format` hint sent alongside the request, if the contract has one.
    pub fn response_format(&self) -> Option<serde_json::Value> {
        match self.contract {
            ReportContract::EmbeddedMetadata => None,
            ReportContract::StrictJson => Some(serde_json::json!({ "type": "json_object" })),
        }
    }
}

const SYSTEM_PROMPT: &str = "You are a Wall Street Hedge Fund Intelligence Officer. \
Your job is to analyze raw data and community rumors to provide actionable intelligence.";

const EMBEDDED_INSTRUCTIONS: &str = r#"MISSION:
Generate a specialized intelligence report in Markdown format.

STRICT OUTPUT FORMAT REQUIREMENTS:

1. **Hard Data Panel**
   - Extract ALL concrete numbers (stock price, revenue, dates, percentages).
   - Format as a Markdown Table: | Metric | Value | Source |
   - If no hard data exists, state "No confirmed data available."

2. **Street Whispers (Community & Insider Sentiment)**
   - Summarize sentiment from Reddit/Twitter/Forums.
   - Highlight "Counter-Intuitive" views (e.g., Official news says X, but employees say Y).
   - MUST cite sources (e.g., "Source: Reddit r/WallStreetBets").

3. **Synthesis (Verdict)**
   - A concise, punchy conclusion.
   - Plain English, no jargon.

4. **JSON METADATA (Hidden)**
   - At the very end of your response, output a valid JSON block enclosed in ```json tags with:
     - "sentiment_score": (0-100, where 0=Bearish, 100=Bullish)
     - "heat_index": (0-100, based on discussion volume/controversy)"#;

const STRICT_INSTRUCTIONS: &str = r#"MISSION:
Analyze the raw intelligence and respond with ONE JSON object and nothing else.
No Markdown fences, no commentary before or after the object.

The object MUST have exactly these fields:
{
  "title": string, a headline of at most 100 characters,
  "summary": string, the full report in Markdown (hard data table, street whispers with cited sources, verdict),
  "sentiment_score": integer 0-100 (0 = Bearish, 100 = Bullish),
  "confidence_index": integer 0-10 (how well the sources agree),
  "key_entities": array of strings (companies, people, tickers),
  "actionable_insight": string, one sentence,
  "risk_alert": string, one sentence
}"#;

/// Build the prompt pair for `topic` over the assembled `context`.
pub fn build_prompt(topic: &str, context: &str, contract: ReportContract) -> Prompt {
    let instructions = match contract {
        ReportContract::EmbeddedMetadata => EMBEDDED_INSTRUCTIONS,
        ReportContract::StrictJson => STRICT_INSTRUCTIONS,
    };
    let user = format!("TOPIC: {topic}\n\nRAW INTELLIGENCE DATA:\n{context}\n\n{instructions}\n");
    Prompt {
        system: SYSTEM_PROMPT.to_string(),
        user,
        contract,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_prompt() {
        let prompt = build_prompt(
            "Tesla",
            "--- SOURCE (official): u ---\ntext",
            ReportContract::EmbeddedMetadata,
        );
        assert_eq!(prompt.contract, ReportContract::EmbeddedMetadata);
        assert!(prompt.system.contains("Intelligence Officer"));
        assert!(prompt.user.starts_with("TOPIC: Tesla\n"));
        assert!(prompt.user.contains("--- SOURCE (official): u ---"));
        assert!(prompt.user.contains("\"heat_index\""));
        assert_eq!(prompt.response_format(), None);
    }

    #[test]
    fn test_strict_prompt_requests_json_object() {
        let prompt = build_prompt("Tesla", "ctx", ReportContract::StrictJson);
        assert!(prompt.user.contains("\"confidence_index\""));
        assert!(prompt.user.contains("\"risk_alert\""));
        assert_eq!(
            prompt.response_format(),
            Some(serde_json::json!({ "type": "json_object" }))
        );
    }
}
