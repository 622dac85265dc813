//! AI payload types and the asynchronous request boundary.
//!
//! The AI service is an external collaborator: the engine only ever sees
//! "response received" or "request failed/cancelled". A cancelled or
//! failed request never reaches [`crate::reconcile::Reconciler::ingest`],
//! so no suggestion records are created and the store is never partially
//! corrupted by a bad exchange.

use crate::error::{EngineError, Result};
use crate::model::DocumentId;
use serde::Deserialize;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Position of a proposed change as stated by the AI service, in the
/// coordinate space of the document at request time. Never trusted
/// blindly; `ingest` re-validates it against the current document.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct AiSpan {
    pub start: usize,
    pub end: usize,
}

/// One proposed change from an AI batch response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiSuggestionItem {
    pub original_text: String,
    pub suggested_text: String,
    pub position: AiSpan,
    /// Wire tag such as "grammar" or "clarity"; unknown tags are kept as
    /// `Other`.
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub explanation: Option<String>,
}

/// A full batch response from the AI service.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AiResponse {
    pub items: Vec<AiSuggestionItem>,
    /// Model identifier reported by the service, if any.
    #[serde(default)]
    pub model: Option<String>,
}

impl AiResponse {
    /// Parse a raw JSON payload. Malformed payloads surface as
    /// `ExternalService`; nothing is created in the store.
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw)
            .map_err(|e| EngineError::ExternalService(format!("malformed suggestion payload: {e}")))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// The external AI collaborator. Implementations typically wrap an HTTP
/// client; errors come back as plain strings and are converted to
/// `ExternalService` at the boundary.
pub trait SuggestionProvider {
    fn request(
        &self,
        document_id: &DocumentId,
        text: &str,
    ) -> impl Future<Output = std::result::Result<AiResponse, String>> + Send;
}

/// Cooperative cancellation for one in-flight AI request.
///
/// Clone the handle into whatever owns the "cancel" button; the first
/// `cancel()` wins and is permanent. One fetch per handle.
#[derive(Clone, Default)]
pub struct CancelHandle {
    inner: Arc<CancelState>,
}

#[derive(Default)]
struct CancelState {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        // notify_one stores a permit, so a fetch that starts waiting after
        // this call still returns immediately.
        self.inner.notify.notify_one();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    async fn cancelled(&self) {
        if self.is_cancelled() {
            return;
        }
        self.inner.notify.notified().await;
    }
}

/// Run one AI request to completion, racing it against cancellation.
///
/// While the request is outstanding the user keeps editing; the caller
/// feeds the response to `ingest`, which re-validates every item against
/// the document's current state.
pub async fn fetch_suggestions<P: SuggestionProvider>(
    provider: &P,
    document_id: &DocumentId,
    text: &str,
    cancel: &CancelHandle,
) -> Result<AiResponse> {
    if cancel.is_cancelled() {
        return Err(EngineError::RequestCancelled);
    }
    tokio::select! {
        _ = cancel.cancelled() => Err(EngineError::RequestCancelled),
        response = provider.request(document_id, text) => {
            response.map_err(EngineError::ExternalService)
        }
    }
}
