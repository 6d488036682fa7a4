//! The fixed, ordered set of Wheel of Life categories.
//!
//! The enumeration is closed: labels coming from untrusted sources (LLM output,
//! stored JSON written by older clients) are resolved through
//! [`Category::from_label`] and anything outside the six labels is dropped.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One of the six life categories scored on the wheel.
///
/// Variant order is the canonical display order, so `Ord` on this type and
/// iteration over [`Category::ALL`] agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    Career,
    Relationships,
    #[serde(rename = "Personal Growth")]
    PersonalGrowth,
    #[serde(rename = "Physical Health")]
    PhysicalHealth,
    Finance,
    #[serde(rename = "Mental Health")]
    MentalHealth,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown wheel category: {0:?}")]
pub struct UnknownCategory(pub String);

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Career,
        Category::Relationships,
        Category::PersonalGrowth,
        Category::PhysicalHealth,
        Category::Finance,
        Category::MentalHealth,
    ];

    /// Wire label, exactly as exchanged with the store and the remote functions.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Career => "Career",
            Self::Relationships => "Relationships",
            Self::PersonalGrowth => "Personal Growth",
            Self::PhysicalHealth => "Physical Health",
            Self::Finance => "Finance",
            Self::MentalHealth => "Mental Health",
        }
    }

    /// Resolve a label to a category.
    ///
    /// Matching ignores surrounding whitespace and ASCII case, so `" career "`
    /// resolves to [`Category::Career`]. Returns `None` for anything else.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(label))
    }

    /// All labels in canonical order.
    pub fn labels() -> [&'static str; 6] {
        Self::ALL.map(|c| c.label())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_label(s).ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// Keep only labels that name a known category, deduplicated and in canonical order.
pub fn retain_known<I, S>(labels: I) -> Vec<Category>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut found: Vec<Category> = labels
        .into_iter()
        .filter_map(|l| Category::from_label(l.as_ref()))
        .collect();
    found.sort();
    found.dedup();
    found
}
