//! Category → score mappings and the clamping rules every score obeys.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::category::Category;

pub const MIN_SCORE: f64 = 1.0;
pub const MAX_SCORE: f64 = 10.0;
/// Score assigned to every category when a user has no history at all.
pub const NEUTRAL_SCORE: f64 = 5.0;

/// Clamp a score into `[MIN_SCORE, MAX_SCORE]`.
pub fn clamp_score(value: f64) -> f64 {
    value.clamp(MIN_SCORE, MAX_SCORE)
}

/// Render a score with at most one decimal place: `5`, `5.3`, `7.5`.
pub fn format_score(value: f64) -> String {
    let rounded = (value * 10.0).round() / 10.0;
    format!("{rounded}")
}

/// Scores for one user on one day.
///
/// Missing categories are undefined, not zero: [`get`](Self::get) returns
/// `None` and averages skip them. Serialises as a JSON object keyed by
/// category label. Deserialising drops unknown labels and non-finite values
/// rather than failing, since stored rows may predate the current enumeration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, f64>", into = "BTreeMap<String, f64>")]
pub struct WheelScores(BTreeMap<Category, f64>);

impl WheelScores {
    /// Every category at [`NEUTRAL_SCORE`].
    pub fn neutral() -> Self {
        Self(Category::ALL.iter().map(|&c| (c, NEUTRAL_SCORE)).collect())
    }

    pub fn get(&self, category: Category) -> Option<f64> {
        self.0.get(&category).copied()
    }

    /// Set a category, clamping into range. Non-finite values leave the
    /// category as it was.
    pub fn set(&mut self, category: Category, value: f64) {
        if !value.is_finite() {
            debug!(category = %category, value, "ignoring non-finite score");
            return;
        }
        self.0.insert(category, clamp_score(value));
    }

    pub fn contains(&self, category: Category) -> bool {
        self.0.contains_key(&category)
    }

    /// Iterate in canonical category order.
    pub fn iter(&self) -> impl Iterator<Item = (Category, f64)> + '_ {
        self.0.iter().map(|(&c, &v)| (c, v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when all six categories carry a value.
    pub fn is_complete(&self) -> bool {
        Category::ALL.iter().all(|c| self.0.contains_key(c))
    }

    /// Mean of the defined categories, `None` when nothing is defined.
    pub fn average(&self) -> Option<f64> {
        if self.0.is_empty() {
            return None;
        }
        Some(self.0.values().sum::<f64>() / self.0.len() as f64)
    }

    /// Highest-scoring category; ties resolve to the earliest in canonical order.
    pub fn highest(&self) -> Option<(Category, f64)> {
        self.iter()
            .fold(None, |best, (c, v)| match best {
                Some((_, bv)) if bv >= v => best,
                _ => Some((c, v)),
            })
    }

    /// Lowest-scoring category; ties resolve to the earliest in canonical order.
    pub fn lowest(&self) -> Option<(Category, f64)> {
        self.iter()
            .fold(None, |best, (c, v)| match best {
                Some((_, bv)) if bv <= v => best,
                _ => Some((c, v)),
            })
    }

    /// Difference between the highest and lowest score.
    pub fn spread(&self) -> Option<f64> {
        Some(self.highest()?.1 - self.lowest()?.1)
    }

    /// Label-keyed copy for wire payloads and prompts.
    pub fn to_label_map(&self) -> BTreeMap<String, f64> {
        self.0
            .iter()
            .map(|(c, v)| (c.label().to_string(), *v))
            .collect()
    }
}

impl From<BTreeMap<String, f64>> for WheelScores {
    fn from(raw: BTreeMap<String, f64>) -> Self {
        let mut scores = BTreeMap::new();
        for (label, value) in raw {
            match Category::from_label(&label) {
                Some(c) if value.is_finite() => {
                    scores.insert(c, clamp_score(value));
                }
                _ => debug!(label = %label, value, "dropping unusable score entry"),
            }
        }
        Self(scores)
    }
}

impl From<WheelScores> for BTreeMap<String, f64> {
    fn from(scores: WheelScores) -> Self {
        scores.to_label_map()
    }
}

impl FromIterator<(Category, f64)> for WheelScores {
    fn from_iter<T: IntoIterator<Item = (Category, f64)>>(iter: T) -> Self {
        let mut scores = Self::default();
        for (c, v) in iter {
            scores.set(c, v);
        }
        scores
    }
}
