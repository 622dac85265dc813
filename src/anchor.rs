//! Keeps pending-suggestion spans valid while the document is edited.
//!
//! Each pending suggestion owns one half-open interval `[from, to)`.
//! Every document mutation is folded into the map through [`AnchorMap::remap`]:
//! edits entirely before an interval shift it, edits entirely after leave it
//! alone, and any edit that touches the interval invalidates it because the
//! AI's original-text assumption no longer holds.
//!
//! Boundary convention (locked in by tests): an edit starting exactly at
//! `to` does not invalidate, and a pure insertion exactly at `from` shifts
//! the interval right rather than invalidating it.

use crate::model::Span;
use std::collections::HashMap;
use uuid::Uuid;

/// A document mutation described as "replace `[start, end)` with content of
/// `inserted_len` bytes". User typing and controller-issued edits use the
/// same shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentEdit {
    pub start: usize,
    pub end: usize,
    pub inserted_len: usize,
}

impl DocumentEdit {
    pub fn new(start: usize, end: usize, inserted_len: usize) -> Self {
        debug_assert!(start <= end, "edit {start}..{end} is inverted");
        Self {
            start,
            end,
            inserted_len,
        }
    }

    /// Signed length change (positive for growth, negative for shrink).
    pub fn delta(&self) -> i64 {
        self.inserted_len as i64 - (self.end - self.start) as i64
    }

    /// A zero-length edit that only inserts content.
    pub fn is_insertion_only(&self) -> bool {
        self.start == self.end
    }
}

/// What `remap` decided for one tracked interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemapAction {
    /// Edit was entirely after the interval.
    Unchanged,
    /// Edit was entirely before; both endpoints moved by the edit's delta.
    Shifted,
    /// Edit touched the interval; tracking was dropped and the suggestion
    /// must go stale.
    Invalidated,
}

/// Per-interval result of a remap pass, in ascending `from` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemapOutcome {
    pub id: Uuid,
    pub action: RemapAction,
    /// Interval after the pass. For `Invalidated` this is the last valid
    /// position, frozen for display.
    pub span: Span,
}

/// Tracked intervals for one document.
#[derive(Debug, Default)]
pub struct AnchorMap {
    spans: HashMap<Uuid, Span>,
}

/// Apply a signed delta to a byte position, saturating at zero.
fn apply_delta(position: usize, delta: i64) -> usize {
    (position as i64).saturating_add(delta).max(0) as usize
}

impl AnchorMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a suggestion's interval. Re-registering an id
    /// replaces the previous interval.
    pub fn register(&mut self, id: Uuid, span: Span) {
        self.spans.insert(id, span);
    }

    /// Stop tracking a resolved suggestion. Unknown ids are a no-op.
    pub fn unregister(&mut self, id: Uuid) {
        self.spans.remove(&id);
    }

    pub fn get(&self, id: Uuid) -> Option<Span> {
        self.spans.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Tracked ids sorted by ascending `from` (ties broken by id so the
    /// order is stable). Bulk decisions walk suggestions in exactly this
    /// order.
    pub fn ids_in_document_order(&self) -> Vec<Uuid> {
        let mut entries: Vec<(Span, Uuid)> =
            self.spans.iter().map(|(id, span)| (*span, *id)).collect();
        entries.sort_by_key(|(span, id)| (span.from, *id));
        entries.into_iter().map(|(_, id)| id).collect()
    }

    /// Fold one document edit into every tracked interval.
    ///
    /// Invalidated intervals are removed from the map; the caller is
    /// responsible for marking the owning suggestions stale. Outcomes come
    /// back in ascending `from` order.
    pub fn remap(&mut self, edit: &DocumentEdit) -> Vec<RemapOutcome> {
        let delta = edit.delta();
        let mut outcomes = Vec::with_capacity(self.spans.len());

        for id in self.ids_in_document_order() {
            let span = self.spans[&id];
            let outcome = if edit.end <= span.from {
                // Entirely before (including a pure insertion at `from`):
                // shift both endpoints.
                let shifted = Span::new(
                    apply_delta(span.from, delta),
                    apply_delta(span.to, delta),
                );
                self.spans.insert(id, shifted);
                RemapOutcome {
                    id,
                    action: if delta == 0 {
                        RemapAction::Unchanged
                    } else {
                        RemapAction::Shifted
                    },
                    span: shifted,
                }
            } else if edit.start >= span.to {
                // Entirely after, including an edit starting exactly at `to`.
                RemapOutcome {
                    id,
                    action: RemapAction::Unchanged,
                    span,
                }
            } else {
                // Overlap, or an insertion strictly inside the interval.
                self.spans.remove(&id);
                RemapOutcome {
                    id,
                    action: RemapAction::Invalidated,
                    span,
                }
            };
            outcomes.push(outcome);
        }

        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome_for(outcomes: &[RemapOutcome], id: Uuid) -> RemapOutcome {
        *outcomes.iter().find(|o| o.id == id).unwrap()
    }

    #[test]
    fn test_edit_before_shifts_interval() {
        let mut map = AnchorMap::new();
        let id = Uuid::new_v4();
        map.register(id, Span::new(10, 20));

        // Replace [0, 5) with 3 bytes: delta -2
        let outcomes = map.remap(&DocumentEdit::new(0, 5, 3));
        let o = outcome_for(&outcomes, id);
        assert_eq!(o.action, RemapAction::Shifted);
        assert_eq!(o.span, Span::new(8, 18));
        assert_eq!(map.get(id), Some(Span::new(8, 18)));
    }

    #[test]
    fn test_edit_after_leaves_interval_alone() {
        let mut map = AnchorMap::new();
        let id = Uuid::new_v4();
        map.register(id, Span::new(10, 20));

        let outcomes = map.remap(&DocumentEdit::new(25, 30, 12));
        assert_eq!(outcome_for(&outcomes, id).action, RemapAction::Unchanged);
        assert_eq!(map.get(id), Some(Span::new(10, 20)));
    }

    #[test]
    fn test_overlapping_edit_invalidates() {
        let mut map = AnchorMap::new();
        let id = Uuid::new_v4();
        map.register(id, Span::new(10, 20));

        let outcomes = map.remap(&DocumentEdit::new(15, 25, 4));
        let o = outcome_for(&outcomes, id);
        assert_eq!(o.action, RemapAction::Invalidated);
        assert_eq!(o.span, Span::new(10, 20));
        assert_eq!(map.get(id), None);
    }

    #[test]
    fn test_edit_inside_interval_invalidates() {
        let mut map = AnchorMap::new();
        let id = Uuid::new_v4();
        map.register(id, Span::new(10, 20));

        // User types inside the pending span
        let outcomes = map.remap(&DocumentEdit::new(12, 12, 3));
        assert_eq!(outcome_for(&outcomes, id).action, RemapAction::Invalidated);
    }

    #[test]
    fn test_boundary_at_to_does_not_invalidate() {
        let mut map = AnchorMap::new();
        let id = Uuid::new_v4();
        map.register(id, Span::new(10, 20));

        let outcomes = map.remap(&DocumentEdit::new(20, 24, 1));
        assert_eq!(outcome_for(&outcomes, id).action, RemapAction::Unchanged);
        assert_eq!(map.get(id), Some(Span::new(10, 20)));
    }

    #[test]
    fn test_insertion_at_from_shifts_right() {
        let mut map = AnchorMap::new();
        let id = Uuid::new_v4();
        map.register(id, Span::new(10, 20));

        let outcomes = map.remap(&DocumentEdit::new(10, 10, 5));
        let o = outcome_for(&outcomes, id);
        assert_eq!(o.action, RemapAction::Shifted);
        assert_eq!(o.span, Span::new(15, 25));
    }

    #[test]
    fn test_edit_ending_at_from_shifts_without_invalidating() {
        let mut map = AnchorMap::new();
        let id = Uuid::new_v4();
        map.register(id, Span::new(10, 20));

        let outcomes = map.remap(&DocumentEdit::new(6, 10, 1));
        let o = outcome_for(&outcomes, id);
        assert_eq!(o.action, RemapAction::Shifted);
        assert_eq!(o.span, Span::new(7, 17));
    }

    #[test]
    fn test_shift_by_full_preceding_deletion() {
        let mut map = AnchorMap::new();
        let id = Uuid::new_v4();
        // Deleting everything up to `from` pulls the interval to zero
        map.register(id, Span::new(5, 8));
        let outcomes = map.remap(&DocumentEdit::new(0, 5, 0));
        let o = outcome_for(&outcomes, id);
        assert_eq!(o.span, Span::new(0, 3));
    }

    #[test]
    fn test_outcomes_in_document_order() {
        let mut map = AnchorMap::new();
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        map.register(a, Span::new(40, 50));
        map.register(b, Span::new(5, 8));
        map.register(c, Span::new(20, 25));

        let outcomes = map.remap(&DocumentEdit::new(0, 0, 2));
        let order: Vec<Uuid> = outcomes.iter().map(|o| o.id).collect();
        assert_eq!(order, vec![b, c, a]);
    }

    #[test]
    fn test_unregister_stops_tracking() {
        let mut map = AnchorMap::new();
        let id = Uuid::new_v4();
        map.register(id, Span::new(0, 4));
        map.unregister(id);
        assert!(map.is_empty());
        assert!(map.remap(&DocumentEdit::new(0, 1, 0)).is_empty());
    }
}
