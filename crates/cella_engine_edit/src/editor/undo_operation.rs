use std::path::PathBuf;
use std::sync::Arc;

use cella_engine::{Algorithm, BigInt, EngineResult, Rect, Rule, Viewport};

use super::{CellDiff, EditState, SnapshotFile, StartingPoint};

/// Everything needed to put a view back at one point of a generating run:
/// the generation counter plus the universe snapshot and the view state
/// that went with it. `file` is `None` when the cells are recoverable some
/// other way (the starting point) or could not be saved at all.
#[derive(Clone, Debug)]
pub struct GenBookmark {
    pub generation: BigInt,
    pub file: Option<Arc<SnapshotFile>>,
    pub viewport: Viewport,
    pub selection: Option<Rect>,
}

/// One reversible operation. Most variants carry exactly the data needed
/// to replay the change in either direction; the two `Script*` sentinels
/// carry nothing and exist only to bracket a span of records.
#[derive(Clone)]
pub enum GridUndoOp {
    CellEdit {
        diffs: Vec<CellDiff>,
    },
    Flip {
        top_bottom: bool,
    },
    /// Whole-pattern rotation, replayed by rotating again rather than by
    /// storing per-cell diffs.
    RotatePattern {
        clockwise: bool,
    },
    /// Rotation of a selection that doesn't cover the whole pattern.
    Rotate {
        diffs: Vec<CellDiff>,
        old_selection: Option<Rect>,
        new_selection: Option<Rect>,
    },
    SelectionChange {
        old: Option<Rect>,
        new: Option<Rect>,
    },
    GenerationChange {
        old: GenBookmark,
        new: GenBookmark,
        /// View whose starting point the `start` entry belongs to.
        /// Cleared when that view is deleted, leaving the entry inert.
        view: Option<usize>,
        /// Present when the run left the starting generation, so that undo
        /// can put the starting point back exactly.
        start: Option<StartingPoint>,
        /// Recorded inside a script span. A reset walking the history keeps
        /// unwinding to the span's begin sentinel when it hits one of these.
        scripted: bool,
    },
    /// The generation counter was edited directly, without touching cells.
    SetGenCount {
        old_generation: BigInt,
        new_generation: BigInt,
        /// View owning the starting-point entries below; cleared when that
        /// view is deleted.
        view: Option<usize>,
        old_start: StartingPoint,
        /// Present when the edit moved the counter below the starting
        /// generation and the current state became the new starting point.
        new_start: Option<StartingPoint>,
    },
    Rename {
        /// Cleared when the named view is deleted, leaving the record inert.
        view: Option<usize>,
        old_name: String,
        new_name: String,
        old_path: Option<PathBuf>,
        new_path: Option<PathBuf>,
        old_save_needed: bool,
        new_save_needed: bool,
    },
    RuleChange {
        old_rule: Rule,
        new_rule: Rule,
        /// Cells whose state was clipped because the new rule has fewer states.
        diffs: Vec<CellDiff>,
    },
    AlgoChange {
        old_algorithm: Algorithm,
        new_algorithm: Algorithm,
        diffs: Vec<CellDiff>,
    },
    ScriptBegin,
    ScriptEnd,
}

/// A change on the undo or redo stack: the operation plus its label and the
/// dirty flags on either side of it.
#[derive(Clone)]
pub struct ChangeRecord {
    pub op: GridUndoOp,
    pub label: String,
    pub old_dirty: bool,
    pub new_dirty: bool,
}

impl ChangeRecord {
    /// Whether undoing or redoing this record restores the dirty flag.
    /// Selection moves and generating don't modify the pattern, and the
    /// sentinels delegate to the span's outermost records.
    pub fn changes_dirty(&self) -> bool {
        !matches!(
            self.op,
            GridUndoOp::SelectionChange { .. } | GridUndoOp::GenerationChange { .. } | GridUndoOp::ScriptBegin | GridUndoOp::ScriptEnd
        )
    }

    pub fn undo_label(&self) -> String {
        match &self.op {
            GridUndoOp::GenerationChange { old, .. } => format!("to Gen {}", old.generation),
            _ => self.label.clone(),
        }
    }

    pub fn redo_label(&self) -> String {
        match &self.op {
            GridUndoOp::GenerationChange { new, .. } => format!("to Gen {}", new.generation),
            _ => self.label.clone(),
        }
    }
}

impl GridUndoOp {
    pub(super) fn undo(&self, state: &mut EditState) -> EngineResult<()> {
        match self {
            GridUndoOp::CellEdit { diffs } => state.apply_diffs_backward(diffs),
            GridUndoOp::Flip { top_bottom } => state.flip_raw(*top_bottom).map(|_| ()),
            GridUndoOp::RotatePattern { clockwise } => state.rotate_pattern_raw(!clockwise).map(|_| ()),
            GridUndoOp::Rotate { diffs, old_selection, .. } => {
                state.apply_diffs_backward(diffs)?;
                state.set_selection_raw(*old_selection);
                Ok(())
            }
            GridUndoOp::SelectionChange { old, .. } => {
                state.set_selection_raw(*old);
                Ok(())
            }
            GridUndoOp::GenerationChange { old, view, start, .. } => {
                state.restore_bookmark(old)?;
                if let (Some(view), Some(start)) = (view, start) {
                    state.set_starting_point(*view, start.clone());
                }
                Ok(())
            }
            GridUndoOp::SetGenCount {
                old_generation,
                view,
                old_start,
                ..
            } => {
                state.set_generation_raw(old_generation.clone());
                if let Some(view) = view {
                    state.set_starting_point(*view, old_start.clone());
                }
                Ok(())
            }
            GridUndoOp::Rename {
                view,
                old_name,
                old_path,
                old_save_needed,
                ..
            } => {
                if let Some(view) = view {
                    state.set_view_identity(*view, old_name.clone(), old_path.clone(), *old_save_needed);
                }
                Ok(())
            }
            GridUndoOp::RuleChange { old_rule, diffs, .. } => {
                state.apply_diffs_backward(diffs)?;
                state.set_rule_raw(old_rule.clone());
                Ok(())
            }
            GridUndoOp::AlgoChange { old_algorithm, diffs, .. } => {
                // backend first, or the old states get clipped again
                state.set_algorithm_raw(*old_algorithm);
                state.apply_diffs_backward(diffs)
            }
            // spans are unwound by the stack driver, not here
            GridUndoOp::ScriptBegin | GridUndoOp::ScriptEnd => Ok(()),
        }
    }

    pub(super) fn redo(&self, state: &mut EditState) -> EngineResult<()> {
        match self {
            GridUndoOp::CellEdit { diffs } => state.apply_diffs_forward(diffs),
            GridUndoOp::Flip { top_bottom } => state.flip_raw(*top_bottom).map(|_| ()),
            GridUndoOp::RotatePattern { clockwise } => state.rotate_pattern_raw(*clockwise).map(|_| ()),
            GridUndoOp::Rotate { diffs, new_selection, .. } => {
                state.apply_diffs_forward(diffs)?;
                state.set_selection_raw(*new_selection);
                Ok(())
            }
            GridUndoOp::SelectionChange { new, .. } => {
                state.set_selection_raw(*new);
                Ok(())
            }
            GridUndoOp::GenerationChange { new, view, start, .. } => {
                state.restore_bookmark(new)?;
                if let (Some(view), Some(start)) = (view, start) {
                    state.set_starting_point(*view, start.clone());
                }
                Ok(())
            }
            GridUndoOp::SetGenCount {
                new_generation,
                view,
                new_start,
                ..
            } => {
                state.set_generation_raw(new_generation.clone());
                if let (Some(view), Some(new_start)) = (view, new_start) {
                    state.set_starting_point(*view, new_start.clone());
                }
                Ok(())
            }
            GridUndoOp::Rename {
                view,
                new_name,
                new_path,
                new_save_needed,
                ..
            } => {
                if let Some(view) = view {
                    state.set_view_identity(*view, new_name.clone(), new_path.clone(), *new_save_needed);
                }
                Ok(())
            }
            GridUndoOp::RuleChange { new_rule, diffs, .. } => {
                state.apply_diffs_forward(diffs)?;
                state.set_rule_raw(new_rule.clone());
                Ok(())
            }
            GridUndoOp::AlgoChange {
                new_algorithm, diffs, ..
            } => {
                state.apply_diffs_forward(diffs)?;
                state.set_algorithm_raw(*new_algorithm);
                Ok(())
            }
            GridUndoOp::ScriptBegin | GridUndoOp::ScriptEnd => Ok(()),
        }
    }
}
