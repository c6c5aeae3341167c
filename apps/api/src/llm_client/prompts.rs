// Intake agent instruction and request assembly.
// The wire tags here must stay in sync with crate::protocol.

use crate::llm_client::{ChatMessage, ChatRole, CompletionRequest};
use crate::protocol::{
    CLEAR_SENTINEL, COMPLETE_MARKER, REPLY_CLOSE, REPLY_OPEN, UPDATE_CLOSE, UPDATE_OPEN,
};
use crate::record::{Field, FieldGroup, Record};
use crate::session::transcript::{Role, Turn};

pub const INTAKE_SYSTEM_TEMPLATE: &str = r#"You are an assistant gathering preliminary information for a potential EB1-A visa petition. Your only job is to collect information, one topic at a time, until every field below has been addressed.

CRITICAL: You are NOT a legal advisor. Do NOT offer legal advice, interpretations of law, or opinions on eligibility. State this clearly in your first reply and repeat it whenever the user asks for an assessment.

FIELDS TO COLLECT:
{field_list}

CURRENT RECORD (what has been collected so far):
{record_json}

FORMAT: every reply MUST use exactly these tags:
{reply_open}
Your friendly reply and the single next question.
{reply_close}
{update_open}
{"field_name": "new value", ...}
{update_close}

RULES:
1. The update block is a flat JSON object. Use only the field names listed above.
2. Include only fields that changed this turn. Omit the update block if nothing changed.
3. An empty string means "still unknown" and never erases a value.
4. To erase a value the user retracts, send "{clear_sentinel}" as its value.
5. If a criterion does not apply, record a short note such as "Not applicable" and move on.
6. Acknowledge system notes about uploaded resumes or profile links, and use their content.
7. When every field has been addressed, thank the user and put {complete_marker} at the end of your reply.

CONVERSATION FLOW: greeting and disclaimer, basic information, visa interest and role, each EB1-A criterion in turn, supporting documents, polite conclusion.
Tone: professional, polite, systematic, encouraging detail."#;

/// Renders the instruction with the field list and the current record.
pub fn build_system_instruction(record: &Record) -> String {
    INTAKE_SYSTEM_TEMPLATE
        .replace("{field_list}", &render_field_list())
        .replace("{record_json}", &record.to_context_json())
        .replace("{reply_open}", REPLY_OPEN)
        .replace("{reply_close}", REPLY_CLOSE)
        .replace("{update_open}", UPDATE_OPEN)
        .replace("{update_close}", UPDATE_CLOSE)
        .replace("{clear_sentinel}", CLEAR_SENTINEL)
        .replace("{complete_marker}", COMPLETE_MARKER)
}

fn render_field_list() -> String {
    let mut out = String::new();
    for group in FieldGroup::ALL {
        out.push_str(&format!("- {}:\n", group.as_str()));
        for field in Field::ALL.iter().filter(|f| f.group() == group) {
            out.push_str(&format!("    - {}: {}\n", field.as_str(), field.description()));
        }
    }
    out
}

/// Builds the request for one turn: committed history plus the staged
/// user message that has not been appended to the transcript yet.
pub fn build_completion_request(
    record: &Record,
    history: &[Turn],
    user_text: &str,
) -> CompletionRequest {
    let mut messages: Vec<ChatMessage> = history
        .iter()
        .map(|turn| ChatMessage {
            role: match turn.role {
                Role::User => ChatRole::User,
                Role::Agent => ChatRole::Assistant,
            },
            content: turn.text.clone(),
        })
        .collect();
    messages.push(ChatMessage {
        role: ChatRole::User,
        content: user_text.to_string(),
    });

    CompletionRequest {
        system: build_system_instruction(record),
        messages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::transcript::Transcript;

    #[test]
    fn test_instruction_lists_every_field_and_the_tags() {
        let text = build_system_instruction(&Record::new());
        for field in Field::ALL {
            assert!(text.contains(field.as_str()), "missing {field}");
        }
        assert!(text.contains("<conversation_response>"));
        assert!(text.contains("</updated_data>"));
        assert!(text.contains("__clear__"));
        assert!(text.contains("<conversation_complete/>"));
        assert!(!text.contains("{record_json}"));
    }

    #[test]
    fn test_request_appends_staged_user_turn() {
        let mut transcript = Transcript::new();
        transcript.push_exchange("hello".to_string(), "Hi! What is your name?".to_string());
        let request =
            build_completion_request(&Record::new(), transcript.turns(), "Ana Li, ana@x.com");
        assert_eq!(request.messages.len(), 3);
        assert_eq!(request.messages[1].role, ChatRole::Assistant);
        assert_eq!(request.messages[2].role, ChatRole::User);
        assert_eq!(request.messages[2].content, "Ana Li, ana@x.com");
    }
}
