//! Turn a topic into one search query per source class.

use crate::models::SourceClass;
use tracing::debug;

/// A query string bound to the source class it was built for.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceQuery {
    pub source_class: SourceClass,
    pub query: String,
}

/// Fixed query template for one source class.
pub fn build_query(topic: &str, class: SourceClass) -> String {
    let topic = topic.trim();
    match class {
        SourceClass::Official => format!("{topic} latest news finance data"),
        SourceClass::Community => format!(
            "{topic} site:reddit.com OR site:twitter.com intitle:rumor OR intitle:leak"
        ),
    }
}

/// Build queries for the named source classes.
///
/// Unknown class names are skipped, so asking only for unknown classes
/// yields an empty list rather than an error.
pub fn build_queries(topic: &str, classes: &[&str]) -> Vec<SourceQuery> {
    classes
        .iter()
        .filter_map(|name| match SourceClass::parse(name) {
            Some(class) => Some(class),
            None => {
                debug!(class = %name, "Unknown source class; no query built");
                None
            }
        })
        .map(|class| SourceQuery {
            source_class: class,
            query: build_query(topic, class),
        })
        .collect()
}

/// One query for every known source class.
pub fn default_queries(topic: &str) -> Vec<SourceQuery> {
    build_queries(topic, &SourceClass::ALL.map(|class| class.as_str()))
}
