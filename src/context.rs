//! Assemble scraped documents into the context block sent to the model.

use crate::models::ExtractedDocument;
use crate::utils::truncate_chars;
use tracing::{debug, instrument};

/// Header line written before each document.
pub fn document_header(doc: &ExtractedDocument) -> String {
    format!("--- SOURCE ({}): {} ---", doc.source_class, doc.url)
}

/// Concatenate documents in the order given, then hard-cut at `max_chars`.
///
/// The cut may land mid-document. Documents are never reordered.
#[instrument(level = "debug", skip(docs), fields(docs = docs.len()))]
pub fn assemble_context(docs: &[ExtractedDocument], max_chars: usize) -> String {
    let mut context = String::new();
    for doc in docs {
        context.push('\n');
        context.push_str(&document_header(doc));
        context.push('\n');
        context.push_str(&doc.text);
        context.push('\n');
    }

    let total = context.chars().count();
    if total > max_chars {
        debug!(total, max_chars, "Context truncated");
        context = truncate_chars(&context, max_chars).to_string();
    }
    context
}
