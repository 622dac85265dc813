//! Owned collection of suggestion records, indexed by id and by document.
//!
//! The store enforces the lifecycle state machine: `pending` may move to
//! `accepted`, `rejected` or `stale`, and terminal states are never left.
//! Resolved suggestions are retained with their terminal status (and the
//! position frozen at resolution time) so hosts can audit or undo;
//! `list_by_status` is stable across the whole session.

use crate::error::{EngineError, Result};
use crate::model::{DocumentId, Span, Suggestion, SuggestionGroup, SuggestionStatus};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct SuggestionStore {
    by_id: HashMap<Uuid, Suggestion>,
    by_document: HashMap<DocumentId, Vec<Uuid>>,
    groups: HashMap<Uuid, SuggestionGroup>,
}

impl SuggestionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new suggestion. Fails if the id is already present.
    pub fn add(&mut self, suggestion: Suggestion) -> Result<()> {
        if self.by_id.contains_key(&suggestion.id) {
            return Err(EngineError::DuplicateId(suggestion.id));
        }
        self.by_document
            .entry(suggestion.document_id.clone())
            .or_default()
            .push(suggestion.id);
        self.by_id.insert(suggestion.id, suggestion);
        Ok(())
    }

    pub fn get(&self, id: Uuid) -> Option<&Suggestion> {
        self.by_id.get(&id)
    }

    /// Like `get` but with the standard not-found error for call sites
    /// that require the record to exist.
    pub fn require(&self, id: Uuid) -> Result<&Suggestion> {
        self.by_id.get(&id).ok_or(EngineError::NotFound(id))
    }

    /// All suggestions for a document, ascending by current position.
    pub fn list_document(&self, document_id: &DocumentId) -> Vec<&Suggestion> {
        let mut list: Vec<&Suggestion> = self
            .by_document
            .get(document_id)
            .map(|ids| ids.iter().filter_map(|id| self.by_id.get(id)).collect())
            .unwrap_or_default();
        list.sort_by_key(|s| (s.position.from, s.id));
        list
    }

    /// Pending suggestions for a document, ascending by current position.
    /// Bulk decisions depend on this ordering.
    pub fn list_pending(&self, document_id: &DocumentId) -> Vec<&Suggestion> {
        self.list_by_status(document_id, SuggestionStatus::Pending)
    }

    /// Suggestions in one state, ascending by position (`list_document`
    /// already sorts; filtering preserves the order).
    pub fn list_by_status(
        &self,
        document_id: &DocumentId,
        status: SuggestionStatus,
    ) -> Vec<&Suggestion> {
        self.list_document(document_id)
            .into_iter()
            .filter(|s| s.status == status)
            .collect()
    }

    /// Move a suggestion through the state machine.
    pub fn update_status(&mut self, id: Uuid, status: SuggestionStatus) -> Result<()> {
        let suggestion = self.by_id.get_mut(&id).ok_or(EngineError::NotFound(id))?;
        if !suggestion.status.can_transition(status) {
            return Err(EngineError::InvalidTransition {
                id,
                from: suggestion.status,
                to: status,
            });
        }
        suggestion.status = status;
        Ok(())
    }

    /// Auto-reject a pending suggestion whose span was edited over. The
    /// position stays frozen at its last valid value so the UI can still
    /// point at where the suggestion used to apply.
    pub fn invalidate(&mut self, id: Uuid) -> Result<()> {
        self.update_status(id, SuggestionStatus::Stale)
    }

    /// Update a pending suggestion's position after a remap shift.
    pub(crate) fn set_position(&mut self, id: Uuid, span: Span) -> Result<()> {
        let suggestion = self.by_id.get_mut(&id).ok_or(EngineError::NotFound(id))?;
        debug_assert!(
            suggestion.is_pending(),
            "remap touched a resolved suggestion"
        );
        suggestion.position = span;
        Ok(())
    }

    pub fn add_group(&mut self, group: SuggestionGroup) {
        self.groups.insert(group.id, group);
    }

    pub fn group(&self, id: Uuid) -> Option<&SuggestionGroup> {
        self.groups.get(&id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
