pub mod engine;
mod parse;
mod prompt;

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use journey_core::{EpisodeAnalysis, JourneyStore, PersonaState, QueryError};

pub use engine::{GenerateError, LlmGenerator, TextGenerator};

/// Returned in place of generated text whenever generation fails.
pub const UNAVAILABLE: &str = "AI service is currently unavailable.";

/// Bound on a single generation call unless [`Narrator::with_timeout`] sets one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// The week the weekly report covers.
pub const WEEK_OF: &str = "August 11, 2025";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyReport {
    pub week_of: String,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub query: String,
    pub answer: String,
}

/// Generic analysis used when the model cannot produce one.
pub fn fallback_analysis(month_name: &str) -> EpisodeAnalysis {
    EpisodeAnalysis {
        month_name: month_name.to_string(),
        primary_goal_trigger: "Ongoing health optimization.".to_string(),
        friction_points: vec!["Coordination challenges.".to_string()],
        final_outcome: "Steady progress made.".to_string(),
        persona_analysis: PersonaState {
            before: "Following the plan.".to_string(),
            after: "More consistent.".to_string(),
        },
    }
}

/// Turns journey entries into prompts, hands them to a [`TextGenerator`] and
/// shapes the answers. Generation failures never escape: each operation has a
/// fixed fallback. Every call is bounded by the narrator's timeout, whatever
/// the generator does internally.
pub struct Narrator {
    store: Arc<JourneyStore>,
    generator: Arc<dyn TextGenerator>,
    timeout: Duration,
}

impl Narrator {
    pub fn new(store: Arc<JourneyStore>, generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            store,
            generator,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// One generation attempt; `None` on failure, expiry or blank output.
    async fn attempt(&self, task: &'static str, prompt: &str) -> Option<String> {
        let system = prompt::system_prompt(&prompt::member_name(&self.store));
        info!(event = "generate", task, prompt_chars = prompt.len());
        let outcome = tokio::time::timeout(self.timeout, self.generator.generate(&system, prompt))
            .await
            .unwrap_or(Err(GenerateError::Timeout(self.timeout)));
        match outcome {
            Ok(raw) if !raw.trim().is_empty() => {
                debug!(event = "generate_output", task, raw = %raw);
                Some(raw)
            }
            Ok(_) => {
                warn!(event = "generate_failed", task, error = "empty output");
                None
            }
            Err(err) => {
                warn!(event = "generate_failed", task, error = %err);
                None
            }
        }
    }

    /// Narrative analysis of one month. Label and data problems are reported;
    /// generation problems produce [`fallback_analysis`].
    pub async fn analyze_month(&self, month_name: &str) -> Result<EpisodeAnalysis, QueryError> {
        let entries = self.store.entries_for_month(month_name)?;
        let prompt = prompt::analysis_prompt(month_name, &entries);

        let Some(raw) = self.attempt("analysis", &prompt).await else {
            return Ok(fallback_analysis(month_name));
        };
        match parse::parse_episode(&raw, month_name) {
            Some(episode) => Ok(episode),
            None => {
                warn!(event = "analysis_unparseable", month = month_name);
                Ok(fallback_analysis(month_name))
            }
        }
    }

    pub async fn weekly_report(&self) -> WeeklyReport {
        let prompt = prompt::weekly_report_prompt(&prompt::member_name(&self.store));
        let summary = self
            .attempt("weekly_report", &prompt)
            .await
            .map(|raw| prompt_output(&raw))
            .unwrap_or_else(|| UNAVAILABLE.to_string());
        WeeklyReport {
            week_of: WEEK_OF.to_string(),
            summary,
        }
    }

    /// Answer a free-form question against the whole transcript.
    pub async fn chat(&self, question: &str) -> Result<ChatReply, QueryError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(QueryError::InvalidInput("Query must not be empty.".to_string()));
        }
        let entries = self.store.all_entries()?;
        let prompt = prompt::chat_prompt(&prompt::transcript(entries), question);
        let answer = self
            .attempt("chat", &prompt)
            .await
            .map(|raw| prompt_output(&raw))
            .unwrap_or_else(|| UNAVAILABLE.to_string());
        Ok(ChatReply {
            query: question.to_string(),
            answer,
        })
    }
}

/// Free-text output with any wrapping code fence removed.
fn prompt_output(raw: &str) -> String {
    parse::strip_code_fences(raw).to_string()
}
