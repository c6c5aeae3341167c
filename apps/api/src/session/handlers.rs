use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::ingest::pdf::ingest_resume;
use crate::ingest::profile::ProfileInput;
use crate::ingest::IngestError;
use crate::record::progress::CollectionProgress;
use crate::record::validation::FieldAnnotation;
use crate::record::Record;
use crate::session::controller::{run_turn, TurnOutcome};
use crate::session::store::SessionHandle;
use crate::session::{SessionSnapshot, SessionState};
use crate::state::AppState;

const RESUME_FIELD: &str = "file";

#[derive(Debug, Deserialize)]
pub struct TurnRequest {
    pub message: String,
}

/// Result of a document upload. Extraction failures are reported inline
/// (`accepted: false`) and do not affect the conversation.
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub accepted: bool,
    pub notice: String,
    pub record: Record,
    pub annotations: Vec<FieldAnnotation>,
    pub progress: CollectionProgress,
}

fn find_session(state: &AppState, id: Uuid) -> Result<std::sync::Arc<SessionHandle>, AppError> {
    state
        .sessions
        .get(id)
        .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))
}

fn upload_error(err: MultipartError, limit: usize) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(limit)
    } else {
        AppError::Validation(format!("Invalid multipart body: {}", err.body_text()))
    }
}

/// POST /api/v1/sessions
pub async fn handle_create_session(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<SessionSnapshot>), AppError> {
    let handle = state.sessions.create();
    let snapshot = handle.session.lock().await.snapshot();
    Ok((StatusCode::CREATED, Json(snapshot)))
}

/// GET /api/v1/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let handle = find_session(&state, id)?;
    let snapshot = handle.session.lock().await.snapshot();
    Ok(Json(snapshot))
}

/// DELETE /api/v1/sessions/:id
pub async fn handle_delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.sessions.remove(id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Session {id} not found")))
    }
}

/// POST /api/v1/sessions/:id/turns
///
/// Runs one interaction cycle. Only one turn per session may be in flight.
pub async fn handle_turn(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<TurnRequest>,
) -> Result<Json<TurnOutcome>, AppError> {
    let handle = find_session(&state, id)?;
    let mut session = handle
        .session
        .try_lock()
        .map_err(|_| AppError::TurnInProgress)?;

    let turn = handle.begin_turn();
    let outcome = run_turn(
        &mut session,
        &request.message,
        state.completion.as_ref(),
        turn.flag(),
    )
    .await?;

    Ok(Json(outcome))
}

/// POST /api/v1/sessions/:id/cancel
pub async fn handle_cancel_turn(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let handle = find_session(&state, id)?;
    if handle.cancel_in_flight() {
        info!("Cancellation requested for session {id}");
        Ok(StatusCode::ACCEPTED)
    } else {
        Err(AppError::NotFound(format!("No turn in flight for session {id}")))
    }
}

/// POST /api/v1/sessions/:id/resume (multipart, field `file`)
pub async fn handle_upload_resume(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<IngestResponse>, AppError> {
    let handle = find_session(&state, id)?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| upload_error(e, state.max_upload_bytes))?
    {
        if field.name() != Some(RESUME_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or("resume.pdf").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| upload_error(e, state.max_upload_bytes))?;
        upload = Some((file_name, bytes));
        break;
    }
    let (file_name, bytes) = upload.ok_or_else(|| {
        AppError::Validation(format!("Multipart field '{RESUME_FIELD}' is required"))
    })?;

    let mut session = handle
        .session
        .try_lock()
        .map_err(|_| AppError::TurnInProgress)?;
    if session.state == SessionState::Concluded {
        return Err(AppError::SessionConcluded);
    }

    let (accepted, notice) =
        match ingest_resume(&file_name, bytes, state.max_document_chars).await {
            Ok(document) => {
                session.apply_document(&document);
                (true, document.notice)
            }
            Err(e @ (IngestError::NoExtractableText | IngestError::ExtractionFailure(_))) => {
                warn!("Resume '{file_name}' for session {id} not ingested: {e}");
                (
                    false,
                    format!("Could not extract text from '{file_name}'. You can continue without it."),
                )
            }
            Err(e) => return Err(e.into()),
        };

    let snapshot = session.snapshot();
    Ok(Json(IngestResponse {
        accepted,
        notice,
        record: snapshot.record,
        annotations: snapshot.annotations,
        progress: snapshot.progress,
    }))
}

/// POST /api/v1/sessions/:id/profile, body `{"url": ...}` or `{"text": ...}`
pub async fn handle_submit_profile(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<ProfileInput>,
) -> Result<Json<IngestResponse>, AppError> {
    let handle = find_session(&state, id)?;
    let mut session = handle
        .session
        .try_lock()
        .map_err(|_| AppError::TurnInProgress)?;
    if session.state == SessionState::Concluded {
        return Err(AppError::SessionConcluded);
    }

    let document = state.profiles.ingest(input).await?;
    session.apply_document(&document);

    let snapshot = session.snapshot();
    Ok(Json(IngestResponse {
        accepted: true,
        notice: document.notice,
        record: snapshot.record,
        annotations: snapshot.annotations,
        progress: snapshot.progress,
    }))
}
