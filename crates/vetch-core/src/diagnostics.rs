//! Diagnostics and suggested fixes.
//!
//! A diagnostic is a positioned message with zero or more suggested fixes;
//! a fix is a set of byte-range text edits. Edits within one fix must be
//! non-overlapping and are applied in increasing position order; the
//! framework validates this at report time and drops fixes that violate
//! it rather than producing an unappliable patch.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use vetch_syntax::fileset::Pos;

// ============================================================================
// Types
// ============================================================================

/// Replace the half-open byte range `[pos, end)` with `new_text`.
/// The range must lie within a single file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextEdit {
    pub pos: Pos,
    pub end: Pos,
    pub new_text: String,
}

/// One alternative fix for a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedFix {
    pub message: String,
    pub edits: Vec<TextEdit>,
}

/// A single finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub pos: Pos,
    pub end: Pos,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub fixes: Vec<SuggestedFix>,
}

// ============================================================================
// Validation
// ============================================================================

/// Why a suggested fix was rejected.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FixError {
    #[error("edit has end before start")]
    InvertedEdit,
    #[error("edits overlap")]
    OverlappingEdits,
    #[error("fix has no edits")]
    Empty,
}

impl SuggestedFix {
    /// Check the fix invariant: at least one edit, each well-formed, and
    /// no two edits overlapping once sorted by position.
    pub fn validate(&self) -> Result<(), FixError> {
        if self.edits.is_empty() {
            return Err(FixError::Empty);
        }
        let mut sorted: Vec<&TextEdit> = self.edits.iter().collect();
        sorted.sort_by_key(|e| (e.pos, e.end));
        for e in &sorted {
            if e.end < e.pos {
                return Err(FixError::InvertedEdit);
            }
        }
        for pair in sorted.windows(2) {
            if pair[1].pos < pair[0].end {
                return Err(FixError::OverlappingEdits);
            }
        }
        Ok(())
    }
}

impl Diagnostic {
    pub fn new(pos: Pos, end: Pos, message: impl Into<String>) -> Self {
        Diagnostic {
            pos,
            end,
            category: None,
            message: message.into(),
            fixes: Vec::new(),
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_fix(mut self, fix: SuggestedFix) -> Self {
        self.fixes.push(fix);
        self
    }

    /// Drop fixes that fail validation, reporting each through `on_drop`.
    pub fn retain_valid_fixes(&mut self, mut on_drop: impl FnMut(&SuggestedFix, FixError)) {
        self.fixes.retain(|fix| match fix.validate() {
            Ok(()) => true,
            Err(err) => {
                on_drop(fix, err);
                false
            }
        });
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn edit(pos: u32, end: u32, text: &str) -> TextEdit {
        TextEdit {
            pos: Pos(pos),
            end: Pos(end),
            new_text: text.to_string(),
        }
    }

    #[test]
    fn valid_fix_passes() {
        let fix = SuggestedFix {
            message: "swap".into(),
            edits: vec![edit(10, 12, "a"), edit(20, 25, "b")],
        };
        assert_eq!(fix.validate(), Ok(()));
    }

    #[test]
    fn out_of_order_edits_are_sorted_before_checking() {
        let fix = SuggestedFix {
            message: "swap".into(),
            edits: vec![edit(20, 25, "b"), edit(10, 12, "a")],
        };
        assert_eq!(fix.validate(), Ok(()));
    }

    #[test]
    fn overlapping_edits_rejected() {
        let fix = SuggestedFix {
            message: "bad".into(),
            edits: vec![edit(10, 15, "a"), edit(12, 20, "b")],
        };
        assert_eq!(fix.validate(), Err(FixError::OverlappingEdits));
    }

    #[test]
    fn touching_edits_are_allowed() {
        let fix = SuggestedFix {
            message: "ok".into(),
            edits: vec![edit(10, 15, "a"), edit(15, 20, "b")],
        };
        assert_eq!(fix.validate(), Ok(()));
    }

    #[test]
    fn inverted_edit_rejected() {
        let fix = SuggestedFix {
            message: "bad".into(),
            edits: vec![TextEdit {
                pos: Pos(15),
                end: Pos(10),
                new_text: String::new(),
            }],
        };
        assert_eq!(fix.validate(), Err(FixError::InvertedEdit));
    }

    #[test]
    fn retain_valid_fixes_drops_bad_ones() {
        let mut d = Diagnostic::new(Pos(1), Pos(2), "m")
            .with_fix(SuggestedFix {
                message: "good".into(),
                edits: vec![edit(1, 2, "x")],
            })
            .with_fix(SuggestedFix {
                message: "empty".into(),
                edits: vec![],
            });
        let mut dropped = Vec::new();
        d.retain_valid_fixes(|fix, err| dropped.push((fix.message.clone(), err)));
        assert_eq!(d.fixes.len(), 1);
        assert_eq!(dropped, vec![("empty".to_string(), FixError::Empty)]);
    }
}
