// Conversation sessions: per-session state, the turn controller, the
// in-memory store and the HTTP handlers.

pub mod cancel;
pub mod controller;
pub mod handlers;
pub mod store;
pub mod transcript;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::ingest::DocumentContext;
use crate::record::merge::{merge_payload, MergeOutcome};
use crate::record::progress::{compute_progress, CollectionProgress};
use crate::record::validation::{annotate_record, FieldAnnotation};
use crate::record::Record;
use crate::session::transcript::Transcript;

/// AwaitingUserInput -> ProcessingTurn -> AwaitingUserInput, until the agent
/// declares the conversation complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    AwaitingUserInput,
    ProcessingTurn,
    Concluded,
}

#[derive(Debug)]
pub struct Session {
    pub id: Uuid,
    pub state: SessionState,
    pub record: Record,
    pub transcript: Transcript,
    /// Document notes waiting to be prefixed to the next user turn.
    pub pending_context: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Everything the display layer renders.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub state: SessionState,
    pub created_at: DateTime<Utc>,
    pub record: Record,
    pub annotations: Vec<FieldAnnotation>,
    pub progress: CollectionProgress,
    pub pending_documents: usize,
    pub transcript: Transcript,
}

impl Session {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            state: SessionState::AwaitingUserInput,
            record: Record::new(),
            transcript: Transcript::new(),
            pending_context: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id,
            state: self.state,
            created_at: self.created_at,
            record: self.record.clone(),
            annotations: annotate_record(&self.record),
            progress: compute_progress(&self.record),
            pending_documents: self.pending_context.len(),
            transcript: self.transcript.clone(),
        }
    }

    /// Queues a document's text for the next turn and records its
    /// provenance through the merge engine.
    pub fn apply_document(&mut self, document: &DocumentContext) -> MergeOutcome {
        let outcome = merge_payload(&self.record, &document.payload);
        self.record = outcome.record.clone();
        self.pending_context.push(document.context.clone());
        info!(
            "Queued document context for session {} ({} pending, changed: {:?})",
            self.id,
            self.pending_context.len(),
            outcome.changed
        );
        outcome
    }

    /// Text of the next user turn: pending document notes, then the message.
    pub fn compose_user_text(&self, message: &str) -> String {
        if self.pending_context.is_empty() {
            return message.to_string();
        }
        format!(
            "{}\n\nUser's message: {}",
            self.pending_context.join("\n\n"),
            message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::merge::UpdatePayload;
    use crate::record::Field;

    fn resume_doc() -> DocumentContext {
        DocumentContext {
            notice: "ok".to_string(),
            context: "(System note: resume text)".to_string(),
            payload: UpdatePayload::new().with(Field::ResumeFile, "cv.pdf"),
        }
    }

    #[test]
    fn test_new_session_is_awaiting_with_empty_state() {
        let session = Session::new(Uuid::new_v4());
        assert_eq!(session.state, SessionState::AwaitingUserInput);
        assert!(session.transcript.is_empty());
        assert_eq!(session.record, Record::new());
    }

    #[test]
    fn test_document_sets_provenance_and_queues_context() {
        let mut session = Session::new(Uuid::new_v4());
        let outcome = session.apply_document(&resume_doc());
        assert_eq!(outcome.changed, vec![Field::ResumeFile]);
        assert_eq!(session.record.get(Field::ResumeFile), "cv.pdf");
        assert_eq!(
            session.compose_user_text("hi"),
            "(System note: resume text)\n\nUser's message: hi"
        );
    }

    #[test]
    fn test_snapshot_exposes_all_record_keys() {
        let session = Session::new(Uuid::new_v4());
        let json = serde_json::to_value(session.snapshot()).unwrap();
        assert_eq!(json["record"].as_object().unwrap().len(), 19);
        assert_eq!(json["state"], "awaiting_user_input");
        assert_eq!(json["progress"]["filled"], 0);
    }
}
