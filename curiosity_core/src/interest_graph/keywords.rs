//! Topic normalization, keyword extraction and keyword similarity.

use std::collections::BTreeSet;

/// Tokens shorter than this are never keywords.
const MIN_KEYWORD_LEN: usize = 3;

const STOP_WORDS: &[&str] = &[
    "a", "about", "after", "all", "also", "an", "and", "any", "are", "as", "at", "be", "been",
    "but", "by", "can", "could", "did", "do", "does", "for", "from", "had", "has", "have", "her",
    "his", "how", "if", "in", "into", "is", "it", "its", "just", "more", "most", "not", "of",
    "on", "only", "or", "other", "our", "out", "over", "she", "so", "some", "such", "than",
    "that", "the", "their", "them", "then", "there", "these", "they", "this", "those", "through",
    "to", "too", "under", "very", "was", "we", "were", "what", "when", "where", "which", "while",
    "who", "why", "will", "with", "would", "you", "your",
];

/// Canonical key for a topic: trimmed, lower-cased, inner whitespace collapsed.
pub fn normalize_topic(topic: &str) -> String {
    topic
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Keyword set of a topic: alphanumeric tokens minus stop words and short tokens.
pub fn extract_keywords(topic: &str) -> BTreeSet<String> {
    topic
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.chars().count() >= MIN_KEYWORD_LEN)
        .filter(|token| !is_stop_word(token))
        .map(String::from)
        .collect()
}

pub fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.binary_search(&token).is_ok()
}

/// Jaccard index of two keyword sets; 0 when either set is empty.
pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    intersection as f64 / union as f64
}
