use std::sync::Arc;

use crate::config::Config;
use crate::ingest::profile::ProfileFetcher;
use crate::llm_client::CompletionService;
use crate::session::store::SessionStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionStore,
    /// Completion backend. `OpenAiCompletionClient` in production.
    pub completion: Arc<dyn CompletionService>,
    pub profiles: ProfileFetcher,
    pub max_document_chars: usize,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(
        config: &Config,
        completion: Arc<dyn CompletionService>,
        profiles: ProfileFetcher,
    ) -> Self {
        Self {
            sessions: SessionStore::new(),
            completion,
            profiles,
            max_document_chars: config.max_document_chars,
            max_upload_bytes: config.max_upload_bytes,
        }
    }
}
