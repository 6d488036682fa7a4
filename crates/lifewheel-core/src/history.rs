//! Per-user, per-date score history and baseline resolution.
//!
//! A user has at most one [`WheelScores`] per calendar date. Dates without a
//! snapshot inherit the most recent earlier one ("carry-forward"); a user with
//! no history at all starts from [`WheelScores::neutral`].

use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::scores::WheelScores;

/// Longest window [`WheelHistory::series`] will produce, roughly ten years.
pub const MAX_SERIES_DAYS: u32 = 3660;

/// A stored snapshot: one user's scores for one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreSnapshot {
    pub user_id: String,
    pub date: NaiveDate,
    pub scores: WheelScores,
}

impl ScoreSnapshot {
    pub fn new(user_id: impl Into<String>, date: NaiveDate, scores: WheelScores) -> Self {
        Self {
            user_id: user_id.into(),
            date,
            scores,
        }
    }

    /// Storage identifier; writes upsert on this key.
    pub fn id(&self) -> String {
        snapshot_id(&self.user_id, self.date)
    }
}

/// `"{user_id}_{YYYY-MM-DD}"`.
pub fn snapshot_id(user_id: &str, date: NaiveDate) -> String {
    format!("{user_id}_{}", date.format("%Y-%m-%d"))
}

/// Where a resolved baseline came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaselineOrigin {
    /// A snapshot exists for the requested date.
    Exact(NaiveDate),
    /// Carried forward from the most recent earlier snapshot.
    CarriedForward(NaiveDate),
    /// No snapshot at or before the date.
    Neutral,
}

/// Scores to start a mutation from, plus their provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct Baseline {
    pub scores: WheelScores,
    pub origin: BaselineOrigin,
}

/// Date-ordered snapshots for a single user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WheelHistory(BTreeMap<NaiveDate, WheelScores>);

impl WheelHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the snapshot for `date`.
    pub fn insert(&mut self, date: NaiveDate, scores: WheelScores) {
        self.0.insert(date, scores);
    }

    /// Snapshot stored for exactly `date`.
    pub fn on(&self, date: NaiveDate) -> Option<&WheelScores> {
        self.0.get(&date)
    }

    /// Most recent snapshot at or before `date`.
    pub fn at_or_before(&self, date: NaiveDate) -> Option<(NaiveDate, &WheelScores)> {
        self.0.range(..=date).next_back().map(|(d, s)| (*d, s))
    }

    /// Latest snapshot overall.
    pub fn latest(&self) -> Option<(NaiveDate, &WheelScores)> {
        self.0.iter().next_back().map(|(d, s)| (*d, s))
    }

    /// Resolve the baseline for a mutation on `date`: exact, else carried
    /// forward, else neutral.
    pub fn resolve(&self, date: NaiveDate) -> Baseline {
        match self.at_or_before(date) {
            Some((d, scores)) if d == date => Baseline {
                scores: scores.clone(),
                origin: BaselineOrigin::Exact(d),
            },
            Some((d, scores)) => Baseline {
                scores: scores.clone(),
                origin: BaselineOrigin::CarriedForward(d),
            },
            None => Baseline {
                scores: WheelScores::neutral(),
                origin: BaselineOrigin::Neutral,
            },
        }
    }

    /// Scores to seed `today` with at login, or `None` if today already has a
    /// snapshot.
    ///
    /// Seeds from the most recent snapshot at or before today; snapshots dated
    /// in the future are ignored.
    pub fn seed_for(&self, today: NaiveDate) -> Option<WheelScores> {
        if self.0.contains_key(&today) {
            return None;
        }
        Some(self.resolve(today).scores)
    }

    /// One entry per day for the `days` days ending at `end` (inclusive),
    /// oldest first. Each day carries the snapshot in effect on that day.
    /// Windows longer than [`MAX_SERIES_DAYS`] are shortened to it.
    pub fn series(&self, end: NaiveDate, days: u32) -> Vec<(NaiveDate, Option<WheelScores>)> {
        let days = days.min(MAX_SERIES_DAYS);
        if days == 0 {
            return Vec::new();
        }
        let start = end
            .checked_sub_days(Days::new(u64::from(days - 1)))
            .unwrap_or(NaiveDate::MIN);
        start
            .iter_days()
            .take_while(|d| *d <= end)
            .map(|d| (d, self.at_or_before(d).map(|(_, s)| s.clone())))
            .collect()
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.0.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(NaiveDate, WheelScores)> for WheelHistory {
    fn from_iter<T: IntoIterator<Item = (NaiveDate, WheelScores)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
