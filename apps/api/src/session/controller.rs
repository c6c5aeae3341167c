//! Runs one interaction cycle of an intake conversation.
//!
//! Flow: compose user text → completion call → parse → merge → append the
//! exchange to the transcript → report.
//!
//! The user turn is staged while the completion call is in flight and only
//! committed together with the agent reply. A failed or cancelled turn leaves
//! the record, the transcript and the pending document notes untouched, so
//! the user can resubmit the same input.

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::llm_client::prompts::build_completion_request;
use crate::llm_client::{CompletionError, CompletionService};
use crate::protocol::{parse_response, ProtocolIssue};
use crate::record::merge::merge_payload;
use crate::record::progress::{compute_progress, CollectionProgress};
use crate::record::validation::{annotate_record, FieldAnnotation};
use crate::record::{Field, Record};
use crate::session::cancel::CancelFlag;
use crate::session::{Session, SessionState};

#[derive(Debug, Error)]
pub enum TurnError {
    #[error("Message cannot be empty")]
    EmptyInput,

    #[error("The conversation has concluded")]
    Concluded,

    #[error("Completion service unavailable: {0}")]
    ServiceUnavailable(#[from] CompletionError),

    #[error("The turn was cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    pub reply: String,
    pub state: SessionState,
    pub record: Record,
    pub annotations: Vec<FieldAnnotation>,
    pub progress: CollectionProgress,
    pub changed_fields: Vec<Field>,
    pub warnings: Vec<ProtocolIssue>,
    pub transcript_len: usize,
}

/// Holds the session in `ProcessingTurn`. Any exit that does not commit,
/// including the turn future being dropped mid-call, puts it back to
/// `AwaitingUserInput`.
struct ProcessingGuard<'a> {
    session: &'a mut Session,
}

impl<'a> ProcessingGuard<'a> {
    fn enter(session: &'a mut Session) -> Self {
        session.state = SessionState::ProcessingTurn;
        Self { session }
    }
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        if self.session.state == SessionState::ProcessingTurn {
            self.session.state = SessionState::AwaitingUserInput;
        }
    }
}

pub async fn run_turn(
    session: &mut Session,
    message: &str,
    completion: &dyn CompletionService,
    cancel: &CancelFlag,
) -> Result<TurnOutcome, TurnError> {
    if session.state == SessionState::Concluded {
        return Err(TurnError::Concluded);
    }
    let message = message.trim();
    if message.is_empty() {
        return Err(TurnError::EmptyInput);
    }

    let user_text = session.compose_user_text(message);
    let request =
        build_completion_request(&session.record, session.transcript.turns(), &user_text);

    let mut processing = ProcessingGuard::enter(session);
    let session = &mut *processing.session;
    info!(
        "Session {}: processing turn {} ({} pending documents)",
        session.id,
        session.transcript.len() / 2 + 1,
        session.pending_context.len()
    );

    let raw = tokio::select! {
        result = completion.complete(&request) => result,
        _ = cancel.cancelled() => {
            info!("Session {}: turn cancelled while awaiting completion", session.id);
            return Err(TurnError::Cancelled);
        }
    };

    let raw = match raw {
        Ok(raw) => raw,
        Err(e) => {
            warn!("Session {}: completion failed: {e}", session.id);
            return Err(TurnError::ServiceUnavailable(e));
        }
    };

    let parsed = parse_response(&raw);
    for issue in &parsed.issues {
        warn!("Session {}: protocol issue recovered: {issue}", session.id);
    }

    // A response that arrives after cancellation is discarded unmerged.
    if cancel.is_cancelled() {
        info!("Session {}: discarding response of cancelled turn", session.id);
        return Err(TurnError::Cancelled);
    }

    let merged = merge_payload(&session.record, &parsed.payload);
    session.record = merged.record;
    session
        .transcript
        .push_exchange(user_text, parsed.reply.clone());
    session.pending_context.clear();
    session.state = if parsed.concluded {
        info!("Session {}: agent declared the conversation complete", session.id);
        SessionState::Concluded
    } else {
        SessionState::AwaitingUserInput
    };

    info!(
        "Session {}: turn committed, {} field(s) changed, {} warning(s)",
        session.id,
        merged.changed.len(),
        parsed.issues.len()
    );

    let mut annotations = merged.annotations;
    for note in annotate_record(&session.record) {
        if !annotations.contains(&note) {
            annotations.push(note);
        }
    }

    Ok(TurnOutcome {
        reply: parsed.reply,
        state: session.state,
        record: session.record.clone(),
        annotations,
        progress: compute_progress(&session.record),
        changed_fields: merged.changed,
        warnings: parsed.issues,
        transcript_len: session.transcript.len(),
    })
}
