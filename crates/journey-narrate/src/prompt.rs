use journey_core::{JourneyEntry, JourneyStore, MEMBER_ROLE};

/// Display name of the member, taken from the first member-authored entry.
pub fn member_name(store: &JourneyStore) -> String {
    store
        .entries()
        .iter()
        .find(|e| e.role == MEMBER_ROLE)
        .map(|e| e.sender.clone())
        .unwrap_or_else(|| "the member".to_string())
}

pub fn system_prompt(member: &str) -> String {
    format!(
        "You are Elyx AI, analyzing {member}'s health journey. \
The journey is a log of messages between {member} and the Elyx care team \
(concierge, doctors, coaches, nutritionists and a personal assistant). \
Ground every statement in the messages you are given; do not invent events."
    )
}

/// Month-scoped analysis request. Asks for a JSON object matching the
/// episode analysis fields.
pub fn analysis_prompt(month_name: &str, entries: &[&JourneyEntry]) -> String {
    let messages = serde_json::to_string_pretty(entries).unwrap_or_else(|_| "[]".to_string());
    format!(
        "Focus on month: {month_name}.\n\n\
Based on these messages:\n{messages}\n\n\
Provide:\n\
- Primary goal/trigger\n\
- Friction points (list)\n\
- Final outcome\n\
- Persona analysis: before and after states (short sentences).\n\n\
Output ONLY a JSON object, nothing else: \
{{\"primary_goal_trigger\":\"...\",\"friction_points\":[\"...\"],\
\"final_outcome\":\"...\",\"persona_analysis\":{{\"before\":\"...\",\"after\":\"...\"}}}}"
    )
}

pub fn weekly_report_prompt(member: &str) -> String {
    format!(
        "Summarize the key events in {member}'s health journey for the past week.\n\
Focus on structural health, recovery, cognitive health, and diagnostics.\n\
Format as HTML with bullet points."
    )
}

/// Chronological transcript, one line per entry:
/// `[2025-01-03 09:00] Rohan Patel (Member): ...`
pub fn transcript(entries: &[JourneyEntry]) -> String {
    let mut ordered: Vec<&JourneyEntry> = entries.iter().collect();
    ordered.sort_by_key(|e| e.timestamp.local());

    let mut out = String::with_capacity(ordered.len() * 96);
    for entry in ordered {
        out.push('[');
        out.push_str(&entry.timestamp.local().format("%Y-%m-%d %H:%M").to_string());
        out.push_str("] ");
        out.push_str(&entry.sender);
        out.push_str(" (");
        out.push_str(&entry.role);
        out.push_str("): ");
        out.push_str(entry.content.trim());
        out.push('\n');
    }
    out
}

pub fn chat_prompt(transcript: &str, question: &str) -> String {
    format!(
        "Conversation transcript:\n{transcript}\n\
Question: {question}\n\n\
Answer using only the transcript above. If it does not contain the answer, say so."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> JourneyStore {
        JourneyStore::parse(
            r#"[
            {"id": 2, "timestamp": "2025-01-05T10:00:00", "sender": "Dr. Warren", "role": "Medical Strategist",
             "content": "Labs look fine.", "tags": {}},
            {"id": 1, "timestamp": "2025-01-04T09:00:00", "sender": "Rohan Patel", "role": "Member",
             "content": "  Any news?  ", "tags": {}}
        ]"#,
        )
        .expect("fixture")
    }

    #[test]
    fn member_name_comes_from_data() {
        assert_eq!(member_name(&store()), "Rohan Patel");
        assert_eq!(member_name(&JourneyStore::empty()), "the member");
    }

    #[test]
    fn transcript_is_chronological() {
        let text = transcript(store().entries());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "[2025-01-04 09:00] Rohan Patel (Member): Any news?");
        assert_eq!(lines[1], "[2025-01-05 10:00] Dr. Warren (Medical Strategist): Labs look fine.");
    }

    #[test]
    fn analysis_prompt_embeds_entries_as_json() {
        let store = store();
        let entries: Vec<&JourneyEntry> = store.entries().iter().collect();
        let prompt = analysis_prompt("January 2025", &entries);
        assert!(prompt.contains("Focus on month: January 2025."));
        assert!(prompt.contains("\"sender\": \"Dr. Warren\""));
        assert!(prompt.contains("\"persona_analysis\""));
    }
}
