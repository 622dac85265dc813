//! Minimal edit scripts between an original text span and its AI rewrite.
//!
//! Diffing is word-level by default (words and whitespace runs are the
//! tokens), which keeps scripts readable and avoids mid-word splits;
//! character-level is available for hosts that want finer markers. Both
//! are LCS-based via the `similar` crate and fully deterministic: the
//! same inputs always produce the same script.
//!
//! All lengths are byte lengths into the UTF-8 inputs, matching the
//! document coordinate space used everywhere else in the engine.

use crate::error::{EngineError, Result};
use crate::model::Span;
use serde::{Deserialize, Serialize};
use similar::{ChangeTag, TextDiff};

/// Token granularity for the differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffGranularity {
    #[default]
    Word,
    Char,
}

/// One step of an edit script. Applied in order to the original text,
/// the steps yield the suggested text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiffOp {
    /// Copy `len` bytes of the original through unchanged.
    Retain { len: usize },
    /// Emit new text not present in the original.
    Insert { text: String },
    /// Skip `len` bytes of the original.
    Delete { len: usize },
}

/// Compute a word-level edit script from `original` to `suggested`.
///
/// Identical inputs produce an empty script; the controller refuses to
/// create a suggestion from one.
pub fn diff(original: &str, suggested: &str) -> Vec<DiffOp> {
    diff_with(original, suggested, DiffGranularity::Word)
}

/// Compute an edit script at an explicit granularity.
pub fn diff_with(original: &str, suggested: &str, granularity: DiffGranularity) -> Vec<DiffOp> {
    if original == suggested {
        return Vec::new();
    }

    let text_diff = match granularity {
        DiffGranularity::Word => TextDiff::from_words(original, suggested),
        DiffGranularity::Char => TextDiff::from_chars(original, suggested),
    };

    let mut ops: Vec<DiffOp> = Vec::new();
    for change in text_diff.iter_all_changes() {
        match change.tag() {
            ChangeTag::Equal => push_retain(&mut ops, change.value().len()),
            ChangeTag::Delete => push_delete(&mut ops, change.value().len()),
            ChangeTag::Insert => push_insert(&mut ops, change.value()),
        }
    }
    ops
}

/// Apply an edit script to `original`, yielding the rewritten text.
///
/// Fails with `ScriptMismatch` if the script consumes more or fewer bytes
/// than the original contains. An empty script returns the original
/// unchanged.
pub fn apply(original: &str, ops: &[DiffOp]) -> Result<String> {
    if ops.is_empty() {
        return Ok(original.to_string());
    }

    let mut out = String::with_capacity(original.len());
    let mut cursor = 0usize;
    for op in ops {
        match op {
            DiffOp::Retain { len } => {
                let end = cursor + len;
                if end > original.len() || !original.is_char_boundary(end) {
                    return Err(EngineError::ScriptMismatch { at: cursor });
                }
                out.push_str(&original[cursor..end]);
                cursor = end;
            }
            DiffOp::Delete { len } => {
                let end = cursor + len;
                if end > original.len() || !original.is_char_boundary(end) {
                    return Err(EngineError::ScriptMismatch { at: cursor });
                }
                cursor = end;
            }
            DiffOp::Insert { text } => out.push_str(text),
        }
    }

    if cursor != original.len() {
        return Err(EngineError::ScriptMismatch { at: cursor });
    }
    Ok(out)
}

/// Document sub-spans touched by a script whose original text starts at
/// byte `base` of the document. Retains are skipped; each delete covers
/// the original bytes it removes, each insert is a zero-width span at the
/// point where the new text lands. The decoration projector uses these to
/// break a replacement pair into its strike/insert parts.
///
/// Spans are only meaningful while the owning suggestion is pending,
/// since that is when the document still contains the original text.
pub fn op_spans<'a>(base: usize, ops: &'a [DiffOp]) -> Vec<(Span, &'a DiffOp)> {
    let mut cursor = base;
    let mut spans = Vec::new();
    for op in ops {
        match op {
            DiffOp::Retain { len } => cursor += len,
            DiffOp::Delete { len } => {
                spans.push((Span::new(cursor, cursor + len), op));
                cursor += len;
            }
            DiffOp::Insert { .. } => spans.push((Span::new(cursor, cursor), op)),
        }
    }
    spans
}

/// Summary of a script: (inserted bytes, deleted bytes).
pub fn stats(ops: &[DiffOp]) -> (usize, usize) {
    ops.iter().fold((0, 0), |(ins, del), op| match op {
        DiffOp::Insert { text } => (ins + text.len(), del),
        DiffOp::Delete { len } => (ins, del + len),
        DiffOp::Retain { .. } => (ins, del),
    })
}

// Adjacent same-kind ops merge so scripts stay minimal in length as
// well as in edit distance.

fn push_retain(ops: &mut Vec<DiffOp>, add: usize) {
    if add == 0 {
        return;
    }
    if let Some(DiffOp::Retain { len }) = ops.last_mut() {
        *len += add;
    } else {
        ops.push(DiffOp::Retain { len: add });
    }
}

fn push_delete(ops: &mut Vec<DiffOp>, add: usize) {
    if add == 0 {
        return;
    }
    if let Some(DiffOp::Delete { len }) = ops.last_mut() {
        *len += add;
    } else {
        ops.push(DiffOp::Delete { len: add });
    }
}

fn push_insert(ops: &mut Vec<DiffOp>, add: &str) {
    if add.is_empty() {
        return;
    }
    if let Some(DiffOp::Insert { text }) = ops.last_mut() {
        text.push_str(add);
    } else {
        ops.push(DiffOp::Insert {
            text: add.to_string(),
        });
    }
}
