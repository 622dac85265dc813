//! Seam to the host editing surface.
//!
//! The engine never owns the document; it reads text through this trait and
//! issues mutations through [`DocumentSurface::apply_edit`], the single
//! mutating call it is allowed to make. `InMemorySurface` is a plain-text
//! implementation for tests and for hosts without a tree-based editor; a
//! real host adapts its own buffer or document tree behind the same trait.

use crate::anchor::DocumentEdit;
use crate::error::{EngineError, Result};
use crate::model::{DocumentId, Span};
use std::collections::HashMap;

pub trait DocumentSurface {
    /// Full text of a document.
    fn text(&self, document_id: &DocumentId) -> Result<String>;

    /// Text inside `[span.from, span.to)`.
    fn text_in_range(&self, document_id: &DocumentId, span: Span) -> Result<String>;

    /// Replace `[span.from, span.to)` with `replacement`. Returns the edit
    /// actually performed so the caller can remap anchors. A rejected
    /// mutation (bad range, non-boundary offset, host-side conflict)
    /// surfaces as `DocumentMutation` and must leave the document
    /// untouched.
    fn apply_edit(
        &mut self,
        document_id: &DocumentId,
        span: Span,
        replacement: &str,
    ) -> Result<DocumentEdit>;
}

/// Plain UTF-8 string buffers keyed by document id.
#[derive(Debug, Default)]
pub struct InMemorySurface {
    docs: HashMap<DocumentId, String>,
}

impl InMemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_document(&mut self, document_id: DocumentId, text: impl Into<String>) {
        self.docs.insert(document_id, text.into());
    }

    pub fn remove_document(&mut self, document_id: &DocumentId) {
        self.docs.remove(document_id);
    }

    fn doc(&self, document_id: &DocumentId) -> Result<&String> {
        self.docs
            .get(document_id)
            .ok_or_else(|| EngineError::UnknownDocument(document_id.clone()))
    }

    fn check_span(text: &str, span: Span) -> Result<()> {
        if span.to > text.len() {
            return Err(EngineError::OutOfBounds {
                from: span.from,
                to: span.to,
                len: text.len(),
            });
        }
        if !text.is_char_boundary(span.from) || !text.is_char_boundary(span.to) {
            return Err(EngineError::DocumentMutation(format!(
                "span {span} does not fall on character boundaries"
            )));
        }
        Ok(())
    }
}

impl DocumentSurface for InMemorySurface {
    fn text(&self, document_id: &DocumentId) -> Result<String> {
        Ok(self.doc(document_id)?.clone())
    }

    fn text_in_range(&self, document_id: &DocumentId, span: Span) -> Result<String> {
        let text = self.doc(document_id)?;
        Self::check_span(text, span)?;
        Ok(text[span.from..span.to].to_string())
    }

    fn apply_edit(
        &mut self,
        document_id: &DocumentId,
        span: Span,
        replacement: &str,
    ) -> Result<DocumentEdit> {
        let text = self
            .docs
            .get_mut(document_id)
            .ok_or_else(|| EngineError::UnknownDocument(document_id.clone()))?;
        Self::check_span(text, span)?;
        text.replace_range(span.from..span.to, replacement);
        Ok(DocumentEdit::new(span.from, span.to, replacement.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surface_with(text: &str) -> (InMemorySurface, DocumentId) {
        let doc = DocumentId::from("doc");
        let mut surface = InMemorySurface::new();
        surface.insert_document(doc.clone(), text);
        (surface, doc)
    }

    #[test]
    fn test_read_range() {
        let (surface, doc) = surface_with("The cat sat.");
        assert_eq!(surface.text_in_range(&doc, Span::new(4, 7)).unwrap(), "cat");
    }

    #[test]
    fn test_apply_edit_reports_shape() {
        let (mut surface, doc) = surface_with("The cat sat.");
        let edit = surface
            .apply_edit(&doc, Span::new(4, 7), "feline creature")
            .unwrap();
        assert_eq!(surface.text(&doc).unwrap(), "The feline creature sat.");
        assert_eq!(edit, DocumentEdit::new(4, 7, 15));
    }

    #[test]
    fn test_out_of_bounds_edit_rejected() {
        let (mut surface, doc) = surface_with("short");
        let err = surface.apply_edit(&doc, Span::new(2, 99), "x").unwrap_err();
        assert!(matches!(err, EngineError::OutOfBounds { .. }));
        // Document untouched
        assert_eq!(surface.text(&doc).unwrap(), "short");
    }

    #[test]
    fn test_non_boundary_edit_rejected() {
        let (mut surface, doc) = surface_with("héllo");
        // Byte 2 is inside the two-byte 'é'
        let err = surface.apply_edit(&doc, Span::new(1, 2), "x").unwrap_err();
        assert!(matches!(err, EngineError::DocumentMutation(_)));
        assert_eq!(surface.text(&doc).unwrap(), "héllo");
    }

    #[test]
    fn test_unknown_document() {
        let surface = InMemorySurface::new();
        let err = surface.text(&DocumentId::from("missing")).unwrap_err();
        assert!(matches!(err, EngineError::UnknownDocument(_)));
    }
}
