//! Change notifications for the rendering surface.
//!
//! The engine pushes an event after every observable state change so the
//! UI knows to re-project decorations. Delivery is an `mpsc` channel per
//! subscriber; a dropped receiver silently unsubscribes.

use crate::model::{DocumentId, SuggestionStatus};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// An AI batch was reconciled into the store.
    SuggestionsIngested {
        document_id: DocumentId,
        group_id: Uuid,
        created: Vec<Uuid>,
        stale_on_arrival: Vec<Uuid>,
    },
    /// One suggestion moved to a terminal status through a decision.
    StatusChanged {
        document_id: DocumentId,
        id: Uuid,
        status: SuggestionStatus,
    },
    /// A document edit shifted pending positions.
    PositionsRemapped {
        document_id: DocumentId,
        moved: usize,
    },
    /// A document edit overlapped pending suggestions; they are now stale.
    SuggestionsInvalidated {
        document_id: DocumentId,
        ids: Vec<Uuid>,
    },
}
