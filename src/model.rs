//! Suggestion records and the track-changes data model.
//!
//! A `Suggestion` is one proposed change: the text being replaced, its
//! replacement, and a position in the live document. Positions are byte
//! offsets into the document's UTF-8 text and are kept current by the
//! anchor map; `original_text`, `suggested_text` and `explanation` are
//! immutable once the record is created.

use crate::differ::DiffOp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque identifier for a document owned by the host editor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Half-open interval `[from, to)` in a document's byte coordinate space.
///
/// Half-open everywhere: an edit landing exactly at `to` is outside the
/// span, an edit landing exactly at `from` is inside only if it consumes
/// bytes (a pure insertion at `from` pushes the span right instead).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub from: usize,
    pub to: usize,
}

impl Span {
    pub fn new(from: usize, to: usize) -> Self {
        debug_assert!(from <= to, "span {from}..{to} is inverted");
        Self { from, to }
    }

    pub fn len(&self) -> usize {
        self.to - self.from
    }

    pub fn is_empty(&self) -> bool {
        self.from == self.to
    }

    /// True if the two half-open intervals share at least one byte.
    pub fn overlaps(&self, other: Span) -> bool {
        self.from < other.to && other.from < self.to
    }

    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.from && offset < self.to
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.from, self.to)
    }
}

/// What shape of change a suggestion proposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Addition,
    Deletion,
    Replacement,
    Formatting,
}

impl ChangeType {
    pub fn label(&self) -> &'static str {
        match self {
            ChangeType::Addition => "Add",
            ChangeType::Deletion => "Delete",
            ChangeType::Replacement => "Replace",
            ChangeType::Formatting => "Format",
        }
    }

    /// Classify a change from its before/after texts.
    pub fn classify(original: &str, suggested: &str) -> Self {
        if original.is_empty() {
            ChangeType::Addition
        } else if suggested.is_empty() {
            ChangeType::Deletion
        } else {
            ChangeType::Replacement
        }
    }
}

/// Why the AI proposed the change. Informational only; reconciliation
/// never branches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Grammar,
    Clarity,
    Tone,
    Conciseness,
    Correctness,
    Other,
}

impl Category {
    /// Map a wire tag from the AI service. Unknown tags become `Other`
    /// rather than failing the batch.
    pub fn parse(tag: &str) -> Self {
        match tag.to_ascii_lowercase().as_str() {
            "grammar" | "spelling" => Category::Grammar,
            "clarity" => Category::Clarity,
            "tone" | "style" => Category::Tone,
            "conciseness" | "concise" => Category::Conciseness,
            "correctness" | "accuracy" => Category::Correctness,
            _ => Category::Other,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::Grammar => "Grammar",
            Category::Clarity => "Clarity",
            Category::Tone => "Tone",
            Category::Conciseness => "Conciseness",
            Category::Correctness => "Correctness",
            Category::Other => "Other",
        }
    }
}

/// Lifecycle status. `Pending` is the only live state; the three terminal
/// states are never left again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionStatus {
    Pending,
    Accepted,
    Rejected,
    /// The document changed underneath the suggestion; auto-rejected.
    Stale,
}

impl SuggestionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SuggestionStatus::Pending)
    }

    /// Legal transitions: `Pending` to any terminal state, nothing else.
    pub fn can_transition(&self, to: SuggestionStatus) -> bool {
        matches!(self, SuggestionStatus::Pending) && to.is_terminal()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestionStatus::Pending => "pending",
            SuggestionStatus::Accepted => "accepted",
            SuggestionStatus::Rejected => "rejected",
            SuggestionStatus::Stale => "stale",
        }
    }
}

/// One proposed change, anchored to a live document position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: Uuid,
    pub document_id: DocumentId,
    pub change_type: ChangeType,
    pub status: SuggestionStatus,
    pub category: Category,
    /// Current span of `original_text` in the document. Remapped on every
    /// edit while pending; frozen once the status is terminal.
    pub position: Span,
    pub original_text: String,
    pub suggested_text: String,
    /// Minimal edit script from `original_text` to `suggested_text`,
    /// computed at ingest time.
    pub ops: Vec<DiffOp>,
    pub explanation: Option<String>,
    /// AI response batch this suggestion arrived in.
    pub group_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Suggestion {
    pub fn new(
        document_id: DocumentId,
        category: Category,
        position: Span,
        original_text: impl Into<String>,
        suggested_text: impl Into<String>,
        ops: Vec<DiffOp>,
    ) -> Self {
        let original_text = original_text.into();
        let suggested_text = suggested_text.into();
        Self {
            id: Uuid::new_v4(),
            document_id,
            change_type: ChangeType::classify(&original_text, &suggested_text),
            status: SuggestionStatus::Pending,
            category,
            position,
            original_text,
            suggested_text,
            ops,
            explanation: None,
            group_id: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }

    pub fn with_group(mut self, group_id: Uuid) -> Self {
        self.group_id = Some(group_id);
        self
    }

    pub fn with_status(mut self, status: SuggestionStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_pending(&self) -> bool {
        self.status == SuggestionStatus::Pending
    }

    /// Signed length change the document would see if this suggestion
    /// were accepted.
    pub fn length_delta(&self) -> i64 {
        self.suggested_text.len() as i64 - self.original_text.len() as i64
    }
}

/// The set of suggestions produced by one AI response. Carries no mutation
/// semantics of its own; batch decisions fan out to the member ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestionGroup {
    pub id: Uuid,
    pub document_id: DocumentId,
    pub suggestion_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl SuggestionGroup {
    pub fn new(document_id: DocumentId) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id,
            suggestion_ids: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.suggestion_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.suggestion_ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_overlap_half_open() {
        let a = Span::new(10, 20);
        assert!(a.overlaps(Span::new(15, 25)));
        assert!(a.overlaps(Span::new(19, 20)));
        // Touching at the boundary is not overlap
        assert!(!a.overlaps(Span::new(20, 30)));
        assert!(!a.overlaps(Span::new(0, 10)));
    }

    #[test]
    fn test_classify_change_type() {
        assert_eq!(ChangeType::classify("", "new"), ChangeType::Addition);
        assert_eq!(ChangeType::classify("old", ""), ChangeType::Deletion);
        assert_eq!(ChangeType::classify("old", "new"), ChangeType::Replacement);
    }

    #[test]
    fn test_status_transitions() {
        use SuggestionStatus::*;
        assert!(Pending.can_transition(Accepted));
        assert!(Pending.can_transition(Rejected));
        assert!(Pending.can_transition(Stale));
        assert!(!Pending.can_transition(Pending));
        assert!(!Accepted.can_transition(Rejected));
        assert!(!Stale.can_transition(Accepted));
        assert!(!Rejected.can_transition(Pending));
    }

    #[test]
    fn test_category_parse() {
        assert_eq!(Category::parse("grammar"), Category::Grammar);
        assert_eq!(Category::parse("Clarity"), Category::Clarity);
        assert_eq!(Category::parse("style"), Category::Tone);
        assert_eq!(Category::parse("something-new"), Category::Other);
    }

    #[test]
    fn test_suggestion_defaults() {
        let s = Suggestion::new(
            DocumentId::from("doc"),
            Category::Grammar,
            Span::new(0, 3),
            "teh",
            "the",
            Vec::new(),
        );
        assert!(s.is_pending());
        assert_eq!(s.change_type, ChangeType::Replacement);
        assert_eq!(s.length_delta(), 0);
        assert!(s.explanation.is_none());
    }
}
