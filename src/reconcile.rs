//! Reconciliation controller: turns AI rewrites into document-anchored,
//! user-decidable change records and applies decisions as deterministic
//! document mutations.
//!
//! The controller is the single internal writer to the editing surface.
//! User typing also mutates the document, but only through the host, which
//! reports every mutation it observes via [`Reconciler::on_edit`] so
//! anchors stay valid. Edits the controller issues itself (accepts) are
//! remapped internally; hosts that report those back anyway are fine,
//! since the controller remembers its own edits and skips the echo
//! instead of remapping twice.
//!
//! All decision processing for a document is serialized through `&mut
//! self`, so no two decisions can interleave.

use crate::anchor::{AnchorMap, DocumentEdit, RemapAction};
use crate::config::EngineConfig;
use crate::decorations::{self, Decoration};
use crate::differ;
use crate::error::{EngineError, Result};
use crate::events::EngineEvent;
use crate::ingest::{AiResponse, AiSuggestionItem};
use crate::model::{Category, DocumentId, Span, Suggestion, SuggestionGroup, SuggestionStatus};
use crate::store::SuggestionStore;
use crate::surface::DocumentSurface;
use std::collections::{HashMap, VecDeque};
use std::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Per-item outcome of reconciling one AI batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// A pending suggestion was created and anchored.
    Created(Uuid),
    /// The document changed since the AI request was issued; the record
    /// was created directly as stale.
    StaleOnArrival(Uuid),
    /// Original and suggested text are identical; no record created.
    SkippedIdentical,
}

/// What happened to each item of an AI batch. Soft failures (stale on
/// arrival) never fail the batch; they show up here as warnings.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub group_id: Uuid,
    pub outcomes: Vec<IngestOutcome>,
    pub warnings: Vec<String>,
}

impl IngestReport {
    pub fn created(&self) -> Vec<Uuid> {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                IngestOutcome::Created(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    pub fn stale_on_arrival(&self) -> Vec<Uuid> {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                IngestOutcome::StaleOnArrival(id) => Some(*id),
                _ => None,
            })
            .collect()
    }
}

/// Outcome of a bulk decision. Every pending id from the snapshot shows
/// up exactly once: succeeded, skipped because an earlier mutation in the
/// same batch made it stale, failed with the error text, or left
/// unprocessed because an earlier item failed. The first failure stops
/// the batch, so `failed` holds at most one entry and everything after it
/// lands in `unprocessed`, still pending and safe to retry.
#[derive(Debug, Clone, Default)]
pub struct BulkReport {
    pub succeeded: Vec<Uuid>,
    pub skipped_stale: Vec<Uuid>,
    pub failed: Vec<(Uuid, String)>,
    pub unprocessed: Vec<Uuid>,
}

impl BulkReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total(&self) -> usize {
        self.succeeded.len() + self.skipped_stale.len() + self.failed.len() + self.unprocessed.len()
    }
}

/// Orchestrates differ, anchor map and store behind the decision API the
/// rendering surface consumes.
pub struct Reconciler<S: DocumentSurface> {
    surface: S,
    store: SuggestionStore,
    anchors: HashMap<DocumentId, AnchorMap>,
    config: EngineConfig,
    listeners: Vec<mpsc::Sender<EngineEvent>>,
    /// Controller-issued edits not yet echoed back by the host, oldest
    /// first. `on_edit` matches against the front so indiscriminate
    /// mutation reporting never remaps an accept twice.
    issued: HashMap<DocumentId, VecDeque<DocumentEdit>>,
}

impl<S: DocumentSurface> Reconciler<S> {
    pub fn new(surface: S) -> Self {
        Self::with_config(surface, EngineConfig::default())
    }

    pub fn with_config(surface: S, config: EngineConfig) -> Self {
        Self {
            surface,
            store: SuggestionStore::new(),
            anchors: HashMap::new(),
            config,
            listeners: Vec::new(),
            issued: HashMap::new(),
        }
    }

    pub fn store(&self) -> &SuggestionStore {
        &self.store
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Direct access to the surface for host-side edits (user typing in
    /// tests and embedded setups). Every mutation made through this
    /// reference must be reported back via [`Reconciler::on_edit`].
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Register a change-notification channel. Events fire after every
    /// state transition, including auto-stale.
    pub fn subscribe(&mut self) -> mpsc::Receiver<EngineEvent> {
        let (tx, rx) = mpsc::channel();
        self.listeners.push(tx);
        rx
    }

    fn emit(&mut self, event: EngineEvent) {
        self.listeners.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Reconcile one AI batch response against the document's *current*
    /// text. Items whose original-text assumption no longer holds are
    /// recorded as stale with a soft warning; the batch itself never
    /// fails wholesale.
    pub fn ingest(&mut self, document_id: &DocumentId, response: AiResponse) -> Result<IngestReport> {
        let text = self.surface.text(document_id)?;
        let mut group = SuggestionGroup::new(document_id.clone());
        let mut report = IngestReport {
            group_id: group.id,
            outcomes: Vec::new(),
            warnings: Vec::new(),
        };

        for item in response.items {
            let outcome = self.ingest_item(document_id, &text, group.id, item, &mut report.warnings)?;
            match outcome {
                IngestOutcome::Created(id) | IngestOutcome::StaleOnArrival(id) => {
                    group.suggestion_ids.push(id);
                }
                IngestOutcome::SkippedIdentical => {}
            }
            report.outcomes.push(outcome);
        }

        self.store.add_group(group);

        let created = report.created();
        let stale = report.stale_on_arrival();
        debug!(
            document = %document_id,
            created = created.len(),
            stale = stale.len(),
            "ingested AI batch"
        );
        self.emit(EngineEvent::SuggestionsIngested {
            document_id: document_id.clone(),
            group_id: report.group_id,
            created,
            stale_on_arrival: stale,
        });
        Ok(report)
    }

    fn ingest_item(
        &mut self,
        document_id: &DocumentId,
        text: &str,
        group_id: Uuid,
        item: AiSuggestionItem,
        warnings: &mut Vec<String>,
    ) -> Result<IngestOutcome> {
        if item.original_text == item.suggested_text {
            debug!(document = %document_id, "skipping identical suggestion");
            return Ok(IngestOutcome::SkippedIdentical);
        }

        let category = Category::parse(&item.category);
        let stated = Span::new(
            item.position.start.min(item.position.end),
            item.position.start.max(item.position.end),
        );

        let still_matches = span_is_valid(text, stated)
            && &text[stated.from..stated.to] == item.original_text.as_str();

        if !still_matches {
            // Document moved on since the AI request; keep the record for
            // display but never let it mutate anything.
            let suggestion = Suggestion::new(
                document_id.clone(),
                category,
                clamp_span(text, stated),
                item.original_text,
                item.suggested_text,
                Vec::new(),
            )
            .with_group(group_id)
            .with_status(SuggestionStatus::Stale);
            let id = suggestion.id;
            warn!(
                document = %document_id,
                suggestion = %id,
                span = %stated,
                "original text no longer matches document; suggestion arrives stale"
            );
            warnings.push(format!(
                "suggestion {id} at {stated}: original text no longer matches the document"
            ));
            self.store.add(suggestion)?;
            return Ok(IngestOutcome::StaleOnArrival(id));
        }

        let ops = differ::diff_with(
            &item.original_text,
            &item.suggested_text,
            self.config.granularity,
        );
        let (inserted, deleted) = differ::stats(&ops);
        let mut suggestion = Suggestion::new(
            document_id.clone(),
            category,
            stated,
            item.original_text,
            item.suggested_text,
            ops,
        )
        .with_group(group_id);
        if let Some(explanation) = item.explanation {
            suggestion = suggestion.with_explanation(explanation);
        }

        let id = suggestion.id;
        self.store.add(suggestion)?;
        self.anchors
            .entry(document_id.clone())
            .or_default()
            .register(id, stated);
        debug!(
            document = %document_id,
            suggestion = %id,
            span = %stated,
            inserted,
            deleted,
            "anchored new suggestion"
        );
        Ok(IngestOutcome::Created(id))
    }

    /// Accept one pending suggestion: mutate the document, remap every
    /// other pending suggestion, and freeze the record as accepted.
    ///
    /// If the surface rejects the mutation the suggestion stays pending
    /// and the error is surfaced for retry.
    pub fn accept_one(&mut self, id: Uuid) -> Result<()> {
        let suggestion = self.store.require(id)?;
        if suggestion.status != SuggestionStatus::Pending {
            return Err(EngineError::InvalidTransition {
                id,
                from: suggestion.status,
                to: SuggestionStatus::Accepted,
            });
        }
        let document_id = suggestion.document_id.clone();
        let span = suggestion.position;
        let replacement = suggestion.suggested_text.clone();

        // The mutation lands before any state change so a rejected edit
        // leaves the record pending.
        let edit = self.surface.apply_edit(&document_id, span, &replacement)?;

        self.store.update_status(id, SuggestionStatus::Accepted)?;
        if let Some(anchors) = self.anchors.get_mut(&document_id) {
            anchors.unregister(id);
        }
        self.issued
            .entry(document_id.clone())
            .or_default()
            .push_back(edit);
        self.apply_remap(&document_id, &edit);

        debug!(document = %document_id, suggestion = %id, span = %span, "accepted suggestion");
        self.emit(EngineEvent::StatusChanged {
            document_id,
            id,
            status: SuggestionStatus::Accepted,
        });
        Ok(())
    }

    /// Reject one pending suggestion. The document is never touched.
    pub fn reject_one(&mut self, id: Uuid) -> Result<()> {
        let suggestion = self.store.require(id)?;
        if suggestion.status != SuggestionStatus::Pending {
            return Err(EngineError::InvalidTransition {
                id,
                from: suggestion.status,
                to: SuggestionStatus::Rejected,
            });
        }
        let document_id = suggestion.document_id.clone();

        self.store.update_status(id, SuggestionStatus::Rejected)?;
        if let Some(anchors) = self.anchors.get_mut(&document_id) {
            anchors.unregister(id);
        }

        debug!(document = %document_id, suggestion = %id, "rejected suggestion");
        self.emit(EngineEvent::StatusChanged {
            document_id,
            id,
            status: SuggestionStatus::Rejected,
        });
        Ok(())
    }

    /// Accept every currently pending suggestion for a document in
    /// ascending-position order, so each mutation's remap shifts the
    /// suggestions that follow before they are processed. A surface
    /// failure stops the batch; the report lists the ids that never ran.
    pub fn accept_all(&mut self, document_id: &DocumentId) -> BulkReport {
        let snapshot = self.pending_ids(document_id);
        self.decide_all(snapshot, true)
    }

    /// Reject every currently pending suggestion for a document. No
    /// document mutations occur.
    pub fn reject_all(&mut self, document_id: &DocumentId) -> BulkReport {
        let snapshot = self.pending_ids(document_id);
        self.decide_all(snapshot, false)
    }

    /// Accept the pending members of one AI batch, ascending by position.
    pub fn accept_group(&mut self, group_id: Uuid) -> Result<BulkReport> {
        let members = self.pending_group_members(group_id)?;
        Ok(self.decide_all(members, true))
    }

    /// Reject the pending members of one AI batch.
    pub fn reject_group(&mut self, group_id: Uuid) -> Result<BulkReport> {
        let members = self.pending_group_members(group_id)?;
        Ok(self.decide_all(members, false))
    }

    /// Fold a document edit into every pending suggestion for the
    /// document. The host calls this for each mutation it observes, in
    /// the order the mutations occurred. Controller-issued edits were
    /// already remapped when the accept ran, so their echoes are
    /// recognized and skipped; everything else (user typing) remaps.
    pub fn on_edit(&mut self, document_id: &DocumentId, edit: DocumentEdit) {
        if let Some(queue) = self.issued.get_mut(document_id) {
            if queue.front() == Some(&edit) {
                queue.pop_front();
                debug!(document = %document_id, "skipping echo of controller-issued edit");
                return;
            }
            // A genuine edit arrived; anything still queued was never
            // going to be echoed.
            queue.clear();
        }
        self.apply_remap(document_id, &edit);
    }

    /// Decorations for the rendering surface. Pure read over
    /// already-remapped positions; safe at keystroke frequency.
    pub fn project(&self, document_id: &DocumentId) -> Vec<Decoration> {
        decorations::project(&self.store, &self.config, document_id)
    }

    /// Pending suggestions in ascending-position order.
    pub fn list_pending(&self, document_id: &DocumentId) -> Vec<&Suggestion> {
        self.store.list_pending(document_id)
    }

    fn pending_ids(&self, document_id: &DocumentId) -> Vec<Uuid> {
        self.store
            .list_pending(document_id)
            .iter()
            .map(|s| s.id)
            .collect()
    }

    fn pending_group_members(&self, group_id: Uuid) -> Result<Vec<Uuid>> {
        let group = self
            .store
            .group(group_id)
            .ok_or(EngineError::NotFound(group_id))?;
        let mut members: Vec<(Span, Uuid)> = group
            .suggestion_ids
            .iter()
            .filter_map(|id| self.store.get(*id))
            .filter(|s| s.is_pending())
            .map(|s| (s.position, s.id))
            .collect();
        members.sort_by_key(|(span, id)| (span.from, *id));
        Ok(members.into_iter().map(|(_, id)| id).collect())
    }

    /// Walk a snapshot of ids in order, stopping at the first hard
    /// failure so the report says exactly which ids were processed and
    /// which never ran. Stale-by-earlier-mutation is a soft skip, not a
    /// failure.
    fn decide_all(&mut self, ids: Vec<Uuid>, accept: bool) -> BulkReport {
        let mut report = BulkReport::default();
        let mut remaining = ids.into_iter();
        while let Some(id) = remaining.next() {
            // An earlier mutation in this batch may have invalidated the
            // suggestion; re-check before deciding.
            match self.store.get(id).map(|s| s.status) {
                Some(SuggestionStatus::Pending) => {
                    let result = if accept {
                        self.accept_one(id)
                    } else {
                        self.reject_one(id)
                    };
                    match result {
                        Ok(()) => report.succeeded.push(id),
                        Err(e) => {
                            warn!(suggestion = %id, error = %e, "bulk decision failed; stopping batch");
                            report.failed.push((id, e.to_string()));
                            report.unprocessed = remaining.collect();
                            break;
                        }
                    }
                }
                Some(SuggestionStatus::Stale) => report.skipped_stale.push(id),
                Some(_) | None => {
                    report.failed.push((id, "no longer pending".to_string()));
                    report.unprocessed = remaining.collect();
                    break;
                }
            }
        }
        report
    }

    fn apply_remap(&mut self, document_id: &DocumentId, edit: &DocumentEdit) {
        let outcomes = match self.anchors.get_mut(document_id) {
            Some(anchors) => anchors.remap(edit),
            None => return,
        };

        let mut moved = 0usize;
        let mut invalidated = Vec::new();
        for outcome in outcomes {
            match outcome.action {
                RemapAction::Shifted => {
                    moved += 1;
                    if let Err(e) = self.store.set_position(outcome.id, outcome.span) {
                        warn!(suggestion = %outcome.id, error = %e, "remap lost its record");
                    }
                }
                RemapAction::Unchanged => {}
                RemapAction::Invalidated => invalidated.push(outcome.id),
            }
        }

        if moved > 0 {
            self.emit(EngineEvent::PositionsRemapped {
                document_id: document_id.clone(),
                moved,
            });
        }
        if !invalidated.is_empty() {
            warn!(
                document = %document_id,
                count = invalidated.len(),
                "edit overlapped pending suggestions; marking stale"
            );
            for id in &invalidated {
                if let Err(e) = self.store.invalidate(*id) {
                    warn!(suggestion = %id, error = %e, "failed to invalidate");
                }
            }
            self.emit(EngineEvent::SuggestionsInvalidated {
                document_id: document_id.clone(),
                ids: invalidated,
            });
        }
    }
}

fn span_is_valid(text: &str, span: Span) -> bool {
    span.to <= text.len() && text.is_char_boundary(span.from) && text.is_char_boundary(span.to)
}

/// Pull an untrusted span back inside the document so stale records still
/// point somewhere displayable.
fn clamp_span(text: &str, span: Span) -> Span {
    let mut from = span.from.min(text.len());
    while from > 0 && !text.is_char_boundary(from) {
        from -= 1;
    }
    let mut to = span.to.min(text.len());
    while to > 0 && !text.is_char_boundary(to) {
        to -= 1;
    }
    Span::new(from.min(to), to.max(from))
}
