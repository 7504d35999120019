use journey_core::{EpisodeAnalysis, PersonaState};

#[derive(serde::Deserialize)]
struct LlmEpisode {
    primary_goal_trigger: String,
    #[serde(default)]
    friction_points: Vec<String>,
    final_outcome: String,
    persona_analysis: PersonaState,
}

/// Remove a surrounding Markdown code fence (```` ```json ... ``` ````), if any.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening fence line.
    let body = match rest.find('\n') {
        Some(nl) => &rest[nl + 1..],
        None => rest,
    };
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

/// Extract the outermost JSON object substring from raw model output.
fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&raw[start..=end])
}

/// Parse model output into an analysis for `month_name`. Returns `None` when
/// the output is not the expected JSON shape.
pub fn parse_episode(raw: &str, month_name: &str) -> Option<EpisodeAnalysis> {
    let json = extract_json_object(strip_code_fences(raw))?;
    let episode: LlmEpisode = serde_json::from_str(json).ok()?;
    if episode.primary_goal_trigger.trim().is_empty() {
        return None;
    }
    Some(EpisodeAnalysis {
        month_name: month_name.to_string(),
        primary_goal_trigger: episode.primary_goal_trigger,
        friction_points: episode.friction_points,
        final_outcome: episode.final_outcome,
        persona_analysis: episode.persona_analysis,
    })
}
