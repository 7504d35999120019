//! Read-only derivations over the journey store.
//!
//! Every query reports [`QueryError::DataUnavailable`] when the store is empty
//! so callers can tell "nothing loaded" apart from "nothing matched".

use serde::{Serialize, Serializer};
use std::collections::BTreeSet;

use crate::{
    JourneyEntry, JourneyStore, MonthKey, QueryError, SentimentTrend, ASSISTANT_ROLE, DECISION,
    MEMBER_ROLE, MILESTONE, REASON,
};

/// A decision together with the entries that explain it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionWithReasons<'a> {
    pub decision: &'a JourneyEntry,
    pub reasons: Vec<&'a JourneyEntry>,
}

/// Interaction counts per role, in order of each role's first appearance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleCounts {
    #[serde(rename = "total_elyx_team_interactions")]
    pub total: usize,
    #[serde(rename = "interactions_by_role", serialize_with = "serialize_ordered")]
    pub by_role: Vec<(String, usize)>,
}

impl RoleCounts {
    pub fn get(&self, role: &str) -> Option<usize> {
        self.by_role
            .iter()
            .find(|(r, _)| r == role)
            .map(|(_, count)| *count)
    }
}

fn serialize_ordered<S: Serializer>(pairs: &[(String, usize)], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_map(pairs.iter().map(|(role, count)| (role, count)))
}

impl JourneyStore {
    fn require_data(&self) -> Result<&[JourneyEntry], QueryError> {
        if self.is_empty() {
            Err(QueryError::DataUnavailable)
        } else {
            Ok(self.entries())
        }
    }

    pub fn all_entries(&self) -> Result<&[JourneyEntry], QueryError> {
        self.require_data()
    }

    /// Entries whose tag kind equals `kind`, in source order. May be empty.
    pub fn filter_by_tag_kind(&self, kind: &str) -> Result<Vec<&JourneyEntry>, QueryError> {
        Ok(self
            .require_data()?
            .iter()
            .filter(|e| e.is_tagged(kind))
            .collect())
    }

    pub fn timeline(&self) -> Result<Vec<&JourneyEntry>, QueryError> {
        self.filter_by_tag_kind(MILESTONE)
    }

    pub fn find_decision_with_reasons(&self, id: i64) -> Result<DecisionWithReasons<'_>, QueryError> {
        let entries = self.require_data()?;
        let decision = entries
            .iter()
            .find(|e| e.id == id && e.is_tagged(DECISION))
            .ok_or_else(|| QueryError::NotFound(format!("Decision with ID {id} not found.")))?;
        let reasons = entries
            .iter()
            .filter(|e| e.is_tagged(REASON) && e.tag.linked_id == Some(id))
            .collect();
        Ok(DecisionWithReasons { decision, reasons })
    }

    /// Count entries per role, skipping any role listed in `exclude`.
    pub fn count_by_role(&self, exclude: &[&str]) -> Result<RoleCounts, QueryError> {
        let mut by_role: Vec<(String, usize)> = Vec::new();
        for entry in self.require_data()? {
            if exclude.contains(&entry.role.as_str()) {
                continue;
            }
            match by_role.iter_mut().find(|(role, _)| *role == entry.role) {
                Some((_, count)) => *count += 1,
                None => by_role.push((entry.role.clone(), 1)),
            }
        }
        let total = by_role.iter().map(|(_, count)| count).sum();
        Ok(RoleCounts { total, by_role })
    }

    /// Staff interaction volume: everyone except the member and their assistant.
    pub fn count_team_interactions(&self) -> Result<RoleCounts, QueryError> {
        self.count_by_role(&[MEMBER_ROLE, ASSISTANT_ROLE])
    }

    /// Entries dated within the month named by `label` ("February 2025").
    pub fn entries_for_month(&self, label: &str) -> Result<Vec<&JourneyEntry>, QueryError> {
        let month = MonthKey::parse_label(label)?;
        let matched: Vec<&JourneyEntry> = self
            .require_data()?
            .iter()
            .filter(|e| e.month() == month)
            .collect();
        if matched.is_empty() {
            return Err(QueryError::NotFound(format!(
                "No journey entries found for {label}."
            )));
        }
        Ok(matched)
    }

    /// Distinct months present, oldest first.
    pub fn months(&self) -> Result<Vec<MonthKey>, QueryError> {
        let months: BTreeSet<MonthKey> = self.require_data()?.iter().map(|e| e.month()).collect();
        Ok(months.into_iter().collect())
    }

    /// Member sentiment per month. Recomputed on every call.
    pub fn sentiment_trend(&self) -> Result<SentimentTrend, QueryError> {
        Ok(SentimentTrend::from_entries(self.require_data()?, MEMBER_ROLE))
    }
}
