//! Redpen: the suggestion reconciliation engine behind an AI-assisted
//! document editor.
//!
//! Converts AI rewrites into position-anchored suggestion records, keeps
//! those anchors valid while the user keeps typing, and applies
//! accept/reject decisions as deterministic document mutations. The
//! rendering surface, the AI backend and document persistence all live
//! outside this crate, behind [`surface::DocumentSurface`] and
//! [`ingest::SuggestionProvider`].

pub mod anchor;
pub mod config;
pub mod decorations;
pub mod differ;
pub mod error;
pub mod events;
pub mod ingest;
pub mod model;
pub mod reconcile;
pub mod store;
pub mod surface;

pub use config::EngineConfig;
pub use error::{EngineError, Result};
pub use model::{DocumentId, Span, Suggestion, SuggestionStatus};
pub use reconcile::Reconciler;
