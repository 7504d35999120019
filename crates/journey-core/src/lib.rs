pub mod month;
pub mod query;
pub mod sentiment;
pub mod store;
pub mod timestamp;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::PathBuf;

pub use month::MonthKey;
pub use query::{DecisionWithReasons, RoleCounts};
pub use sentiment::{SentimentPoint, SentimentTrend};
pub use store::{JourneyStore, LoadOutcome, StoreError};
pub use timestamp::Timestamp;

/// Role of the member whose journey is recorded.
pub const MEMBER_ROLE: &str = "Member";
/// Role of the member's personal assistant. Excluded from team metrics together with the member.
pub const ASSISTANT_ROLE: &str = "Personal Assistant";

pub const MILESTONE: &str = "milestone";
pub const DECISION: &str = "decision";
pub const REASON: &str = "reason";

// --- Types ---

/// Structured annotation on an entry. `linked_id` is only set on reasons and
/// points at the decision they explain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub linked_id: Option<i64>,
}

/// One record of the communication log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JourneyEntry {
    pub id: i64,
    pub timestamp: Timestamp,
    pub sender: String,
    pub role: String,
    pub content: String,
    #[serde(rename = "tags")]
    pub tag: Tag,
}

impl JourneyEntry {
    pub fn tag_kind(&self) -> Option<&str> {
        self.tag.kind.as_deref()
    }

    pub fn is_tagged(&self, kind: &str) -> bool {
        self.tag_kind() == Some(kind)
    }

    pub fn month(&self) -> MonthKey {
        MonthKey::of(&self.timestamp)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonaState {
    pub before: String,
    pub after: String,
}

/// Narrative summary of one month of the journey.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeAnalysis {
    pub month_name: String,
    pub primary_goal_trigger: String,
    pub friction_points: Vec<String>,
    pub final_outcome: String,
    pub persona_analysis: PersonaState,
}

// --- Errors ---

/// Conditions a query can report instead of a result. None of them are fatal;
/// transports translate them into their own "absent" or "rejected" signals.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("Journey data not loaded.")]
    DataUnavailable,
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    InvalidInput(String),
}

// --- AI Settings ---

/// Connection settings for the text-generation provider.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct AiSettings {
    pub provider: String,
    pub api_key: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            provider: "google".to_string(),
            api_key: String::new(),
            model: "gemini-1.5-pro".to_string(),
            timeout_secs: 30,
        }
    }
}

impl fmt::Debug for AiSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AiSettings")
            .field("provider", &self.provider)
            .field("api_key", &if self.api_key.is_empty() { "" } else { "<redacted>" })
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl AiSettings {
    /// Overlay `JOURNEY_AI_*` variables (and `GOOGLE_API_KEY` as a key fallback)
    /// looked up through `var`.
    pub fn with_env_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| var(name).filter(|v| !v.trim().is_empty());
        if let Some(provider) = non_empty("JOURNEY_AI_PROVIDER") {
            self.provider = provider;
        }
        if let Some(model) = non_empty("JOURNEY_AI_MODEL") {
            self.model = model;
        }
        if let Some(key) = non_empty("JOURNEY_AI_API_KEY").or_else(|| non_empty("GOOGLE_API_KEY")) {
            self.api_key = key;
        }
        if let Some(secs) = non_empty("JOURNEY_AI_TIMEOUT_SECS").and_then(|s| s.parse().ok()) {
            self.timeout_secs = secs;
        }
        self
    }
}

/// Resolve the settings directory (~/.journey/).
pub fn settings_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".journey")
}

fn settings_path() -> PathBuf {
    settings_dir().join("settings.json")
}

/// Read settings from disk, then apply environment overrides. A missing or
/// unreadable file yields the defaults.
pub fn read_settings() -> AiSettings {
    let path = settings_path();
    let from_file = if path.exists() {
        match fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|s| serde_json::from_str(&s).map_err(|e| e.to_string()))
        {
            Ok(settings) => settings,
            Err(err) => {
                tracing::warn!(event = "settings_unreadable", path = %path.display(), error = %err);
                AiSettings::default()
            }
        }
    } else {
        AiSettings::default()
    };
    from_file.with_env_overrides(|name| std::env::var(name).ok())
}

pub fn ai_configured(settings: &AiSettings) -> bool {
    !settings.provider.is_empty()
        && !settings.model.is_empty()
        && (settings.provider == "ollama" || !settings.api_key.is_empty())
}
