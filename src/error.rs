//! Error taxonomy for the reconciliation engine.
//!
//! Store/controller misuse (`DuplicateId`, `NotFound`, `InvalidTransition`)
//! surfaces immediately and is never swallowed. External failures
//! (`ExternalService`, `DocumentMutation`, `RequestCancelled`) are the only
//! errors the controller converts or recovers from.

use crate::model::{DocumentId, SuggestionStatus};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("suggestion {0} already exists in the store")]
    DuplicateId(Uuid),

    #[error("suggestion {0} not found")]
    NotFound(Uuid),

    #[error("suggestion {id}: illegal transition {from:?} -> {to:?}")]
    InvalidTransition {
        id: Uuid,
        from: SuggestionStatus,
        to: SuggestionStatus,
    },

    #[error("unknown document {0}")]
    UnknownDocument(DocumentId),

    #[error("range {from}..{to} is out of bounds for document of length {len}")]
    OutOfBounds { from: usize, to: usize, len: usize },

    #[error("edit script does not match source text at byte {at}")]
    ScriptMismatch { at: usize },

    #[error("document mutation rejected: {0}")]
    DocumentMutation(String),

    #[error("AI request failed: {0}")]
    ExternalService(String),

    #[error("AI request was cancelled before completion")]
    RequestCancelled,
}

pub type Result<T> = std::result::Result<T, EngineError>;
