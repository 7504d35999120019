//! Keyword polarity scoring of member messages, averaged per month.

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

use crate::{JourneyEntry, MonthKey};

pub const POSITIVE_WORDS: &[&str] = &["good", "excellent", "better", "powerful", "great", "successful"];
pub const NEGATIVE_WORDS: &[&str] = &[
    "issue",
    "problem",
    "anxious",
    "frustration",
    "setback",
    "wrong",
    "not heard",
];

/// +1 if the text mentions a positive word, otherwise -1 if it mentions a
/// negative one, otherwise 0. Matching is case-insensitive substring search
/// and positive words win when both kinds appear.
pub fn score_content(content: &str) -> i32 {
    let lower = content.to_lowercase();
    if POSITIVE_WORDS.iter().any(|w| lower.contains(w)) {
        1
    } else if NEGATIVE_WORDS.iter().any(|w| lower.contains(w)) {
        -1
    } else {
        0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentPoint {
    /// "Jan 2025"
    pub month: String,
    pub score: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Tally {
    sum: i64,
    count: u32,
}

/// Per-month sentiment totals. Iterating yields one point per month in
/// ascending order and may be repeated freely.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SentimentTrend {
    months: BTreeMap<MonthKey, Tally>,
}

impl SentimentTrend {
    /// Score the entries authored by `role`.
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a JourneyEntry>, role: &str) -> Self {
        let mut months: BTreeMap<MonthKey, Tally> = BTreeMap::new();
        for entry in entries.into_iter().filter(|e| e.role == role) {
            let tally = months.entry(entry.month()).or_default();
            tally.sum += i64::from(score_content(&entry.content));
            tally.count += 1;
        }
        Self { months }
    }

    pub fn iter(&self) -> impl Iterator<Item = SentimentPoint> + '_ {
        self.months.iter().map(|(key, tally)| SentimentPoint {
            month: key.short_label(),
            score: round2(tally.sum as f64 / f64::from(tally.count)),
        })
    }

    pub fn len(&self) -> usize {
        self.months.len()
    }

    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }

    pub fn to_vec(&self) -> Vec<SentimentPoint> {
        self.iter().collect()
    }
}

impl Serialize for SentimentTrend {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

/// Round half to even at two decimals.
fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}
