use async_trait::async_trait;
use nz_core::{AnalysisModel, EnrichmentResult, Error, NewsCategory, Result};
use std::collections::HashMap;
use std::fmt;

/// Offline model for local runs without credentials. Never reports quota.
pub struct DummyModel;

impl fmt::Debug for DummyModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DummyModel").finish()
    }
}

impl DummyModel {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DummyModel {
    fn default() -> Self {
        Self::new()
    }
}

fn leading_sentences(text: &str, count: usize) -> String {
    let mut sentences = Vec::new();
    let mut current = String::new();
    for c in text.chars() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') {
            let sentence = current.trim();
            if !sentence.is_empty() {
                sentences.push(sentence.to_string());
            }
            current.clear();
            if sentences.len() == count {
                break;
            }
        }
    }
    if sentences.len() < count && !current.trim().is_empty() {
        sentences.push(current.trim().to_string());
    }
    sentences.join(" ")
}

fn frequent_words(text: &str, count: usize) -> Vec<String> {
    let mut order: Vec<String> = Vec::new();
    let mut freq: HashMap<String, usize> = HashMap::new();
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= 2)
    {
        let entry = freq.entry(word.to_string()).or_insert_with(|| {
            order.push(word.to_string());
            0
        });
        *entry += 1;
    }
    // stable sort keeps first-seen order among ties
    order.sort_by(|a, b| freq[b].cmp(&freq[a]));
    order.truncate(count);
    order
}

#[async_trait]
impl AnalysisModel for DummyModel {
    fn name(&self) -> &str {
        "Dummy"
    }

    async fn analyze(&self, text: &str) -> Result<EnrichmentResult> {
        let summary = leading_sentences(text, 3);
        let keywords = frequent_words(text, 5);
        if summary.is_empty() || keywords.is_empty() {
            return Err(Error::MalformedResponse("nothing to summarize".to_string()));
        }
        Ok(EnrichmentResult {
            summary,
            keywords: keywords.join(","),
            category: NewsCategory::Society,
        })
    }
}
