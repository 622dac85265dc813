//! Read-side projection of store state into visual overlay spans.
//!
//! Pure function over the current store: no mutation, positions are
//! already remapped, so the host may call it on every keystroke. The
//! output is framework-agnostic; tree editors, plain-text buffers and
//! test harnesses all consume the same records through an adapter.

use crate::config::EngineConfig;
use crate::differ::{self, DiffOp};
use crate::model::{ChangeType, DocumentId, Span, Suggestion, SuggestionStatus};
use crate::store::SuggestionStore;
use serde::Serialize;
use uuid::Uuid;

/// How the rendering surface should mark a span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VisualKind {
    /// Text the suggestion would remove.
    DeletionMarker,
    /// Text the suggestion would add.
    AdditionMarker,
    /// A strikethrough/insertion pair over the same span.
    ReplacementPair,
    /// The suggestion is stale; show "no longer valid".
    StaleMarker,
}

/// One overlay descriptor for the rendering surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Decoration {
    pub suggestion_id: Uuid,
    pub span: Span,
    pub visual: VisualKind,
}

fn visual_for(change_type: ChangeType) -> VisualKind {
    match change_type {
        ChangeType::Addition => VisualKind::AdditionMarker,
        ChangeType::Deletion => VisualKind::DeletionMarker,
        ChangeType::Replacement | ChangeType::Formatting => VisualKind::ReplacementPair,
    }
}

/// Project one pending suggestion. A replacement pair additionally breaks
/// its edit script into per-op sub-spans (strike over deleted words,
/// zero-width insert points) so the surface can mark exactly the words
/// that change instead of the whole span.
fn project_pending(suggestion: &Suggestion, out: &mut Vec<Decoration>) {
    let visual = visual_for(suggestion.change_type);
    out.push(Decoration {
        suggestion_id: suggestion.id,
        span: suggestion.position,
        visual,
    });

    if visual == VisualKind::ReplacementPair {
        for (span, op) in differ::op_spans(suggestion.position.from, &suggestion.ops) {
            let sub = match op {
                DiffOp::Delete { .. } => VisualKind::DeletionMarker,
                DiffOp::Insert { .. } => VisualKind::AdditionMarker,
                DiffOp::Retain { .. } => continue,
            };
            out.push(Decoration {
                suggestion_id: suggestion.id,
                span,
                visual: sub,
            });
        }
    }
}

/// Decorations for every pending suggestion in a document (plus stale
/// markers unless configured off), ascending by position. Replacement
/// pairs are followed by their per-op sub-spans.
pub fn project(
    store: &SuggestionStore,
    config: &EngineConfig,
    document_id: &DocumentId,
) -> Vec<Decoration> {
    let mut out = Vec::new();
    for s in store.list_document(document_id) {
        match s.status {
            SuggestionStatus::Pending => project_pending(s, &mut out),
            SuggestionStatus::Stale if config.decorate_stale => out.push(Decoration {
                suggestion_id: s.id,
                span: s.position,
                visual: VisualKind::StaleMarker,
            }),
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Category, Suggestion};

    fn add(store: &mut SuggestionStore, from: usize, to: usize, original: &str, suggested: &str) -> Uuid {
        let s = Suggestion::new(
            DocumentId::from("doc"),
            Category::Clarity,
            Span::new(from, to),
            original,
            suggested,
            Vec::new(),
        );
        let id = s.id;
        store.add(s).unwrap();
        id
    }

    #[test]
    fn test_visual_kinds_follow_change_type() {
        let mut store = SuggestionStore::new();
        let doc = DocumentId::from("doc");
        add(&mut store, 0, 0, "", "inserted");
        add(&mut store, 5, 9, "gone", "");
        add(&mut store, 12, 15, "old", "new");

        let config = EngineConfig::default();
        let decorations = project(&store, &config, &doc);
        let visuals: Vec<VisualKind> = decorations.iter().map(|d| d.visual).collect();
        assert_eq!(
            visuals,
            vec![
                VisualKind::AdditionMarker,
                VisualKind::DeletionMarker,
                VisualKind::ReplacementPair,
            ]
        );
    }

    #[test]
    fn test_sorted_by_position() {
        let mut store = SuggestionStore::new();
        let doc = DocumentId::from("doc");
        let late = add(&mut store, 30, 33, "old", "new");
        let early = add(&mut store, 2, 5, "old", "new");

        let decorations = project(&store, &EngineConfig::default(), &doc);
        let ids: Vec<Uuid> = decorations.iter().map(|d| d.suggestion_id).collect();
        assert_eq!(ids, vec![early, late]);
    }

    #[test]
    fn test_replacement_pair_breaks_into_subspans() {
        let mut store = SuggestionStore::new();
        let doc = DocumentId::from("doc");
        // Suggestion over "cat" at bytes 4..7 of "The cat sat."
        let ops = differ::diff("cat", "feline creature");
        let s = Suggestion::new(
            doc.clone(),
            Category::Clarity,
            Span::new(4, 7),
            "cat",
            "feline creature",
            ops,
        );
        let id = s.id;
        store.add(s).unwrap();

        let decorations = project(&store, &EngineConfig::default(), &doc);
        assert!(decorations.iter().all(|d| d.suggestion_id == id));

        let visuals: Vec<VisualKind> = decorations.iter().map(|d| d.visual).collect();
        assert_eq!(visuals[0], VisualKind::ReplacementPair);
        assert!(visuals.contains(&VisualKind::DeletionMarker));
        assert!(visuals.contains(&VisualKind::AdditionMarker));

        // Sub-spans stay inside the suggestion's document span
        let outer = decorations[0].span;
        for d in &decorations[1..] {
            assert!(d.span.from >= outer.from && d.span.to <= outer.to);
        }
    }

    #[test]
    fn test_resolved_suggestions_not_projected() {
        let mut store = SuggestionStore::new();
        let doc = DocumentId::from("doc");
        let id = add(&mut store, 0, 3, "old", "new");
        store
            .update_status(id, SuggestionStatus::Accepted)
            .unwrap();

        assert!(project(&store, &EngineConfig::default(), &doc).is_empty());
    }

    #[test]
    fn test_stale_marker_configurable() {
        let mut store = SuggestionStore::new();
        let doc = DocumentId::from("doc");
        let id = add(&mut store, 0, 3, "old", "new");
        store.invalidate(id).unwrap();

        let on = EngineConfig::default();
        let decorations = project(&store, &on, &doc);
        assert_eq!(decorations.len(), 1);
        assert_eq!(decorations[0].visual, VisualKind::StaleMarker);

        let off = EngineConfig {
            decorate_stale: false,
            ..EngineConfig::default()
        };
        assert!(project(&store, &off, &doc).is_empty());
    }
}
