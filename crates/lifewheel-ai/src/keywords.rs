//! Static keyword tables used when the remote model is unavailable.

use lifewheel_core::Category;

/// Lowercase substrings that mark a category as relevant.
pub const KEYWORDS: &[(Category, &[&str])] = &[
    (Category::Career, &["career", "job", "work"]),
    (
        Category::Relationships,
        &["relationship", "family", "friend", "marriage"],
    ),
    (Category::PersonalGrowth, &["personal", "growth", "learn"]),
    (Category::PhysicalHealth, &["health", "exercise", "fitness"]),
    (Category::Finance, &["money", "finance", "investment"]),
    (Category::MentalHealth, &["mental", "stress", "anxiety"]),
];

/// Returned when no keyword matches at all.
pub const DEFAULT_CATEGORIES: [Category; 2] = [Category::PersonalGrowth, Category::MentalHealth];

pub const POSITIVE_WORDS: &[&str] = &[
    "good",
    "great",
    "excellent",
    "amazing",
    "wonderful",
    "positive",
    "better",
    "improve",
];

pub const NEGATIVE_WORDS: &[&str] = &[
    "bad", "poor", "terrible", "awful", "negative", "worse", "decline", "struggle",
];

/// Categories whose keywords occur in `text`, in canonical order.
///
/// Matching is a case-insensitive substring test, so "workout" counts
/// towards Career as well as "work".
pub fn match_keywords(text: &str) -> Vec<Category> {
    let lower = text.to_lowercase();
    KEYWORDS
        .iter()
        .filter(|(_, words)| words.iter().any(|w| lower.contains(w)))
        .map(|(c, _)| *c)
        .collect()
}

/// Keyword matches, or [`DEFAULT_CATEGORIES`] when nothing matches.
pub fn classify_offline(text: &str) -> Vec<Category> {
    let found = match_keywords(text);
    if found.is_empty() {
        DEFAULT_CATEGORIES.to_vec()
    } else {
        found
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

/// Coarse sentiment of `text`; negative words win over positive ones.
pub fn sentiment(text: &str) -> Sentiment {
    let lower = text.to_lowercase();
    if NEGATIVE_WORDS.iter().any(|w| lower.contains(w)) {
        Sentiment::Negative
    } else if POSITIVE_WORDS.iter().any(|w| lower.contains(w)) {
        Sentiment::Positive
    } else {
        Sentiment::Neutral
    }
}
