use cella_engine::EngineResult;

use super::{ChangeRecord, GridUndoOp};

/// Shared undo/redo surface of an editing session.
pub trait UndoState {
    fn undo_description(&self) -> Option<String>;
    fn can_undo(&self) -> bool;

    /// # Errors
    ///
    /// Returns an error if undoing fails.
    fn undo(&mut self) -> EngineResult<()>;

    fn redo_description(&self) -> Option<String>;
    fn can_redo(&self) -> bool;

    /// # Errors
    ///
    /// Returns an error if redoing fails.
    fn redo(&mut self) -> EngineResult<()>;
}

/// The two history stacks plus the flags guarding them. Pushing a new
/// change clears the redo stack; the `push_undo`/`push_redo` primitives
/// used while replaying do not.
#[derive(Default)]
pub struct ChangeLog {
    undo_stack: Vec<ChangeRecord>,
    redo_stack: Vec<ChangeRecord>,
    applying: bool,
    script_nesting: usize,
}

impl ChangeLog {
    /// Record a fresh change. Anything that was redoable is gone now.
    pub fn push(&mut self, record: ChangeRecord) {
        self.redo_stack.clear();
        self.undo_stack.push(record);
    }

    pub fn push_undo(&mut self, record: ChangeRecord) {
        self.undo_stack.push(record);
    }

    pub fn pop_undo(&mut self) -> Option<ChangeRecord> {
        self.undo_stack.pop()
    }

    pub fn push_redo(&mut self, record: ChangeRecord) {
        self.redo_stack.push(record);
    }

    pub fn pop_redo(&mut self) -> Option<ChangeRecord> {
        self.redo_stack.pop()
    }

    pub fn head_undo(&self) -> Option<&ChangeRecord> {
        self.undo_stack.last()
    }

    pub fn head_redo(&self) -> Option<&ChangeRecord> {
        self.redo_stack.last()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn can_undo(&self) -> bool {
        !self.applying && !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.applying && !self.redo_stack.is_empty()
    }

    pub fn undo_label(&self) -> Option<String> {
        self.undo_stack.last().map(ChangeRecord::undo_label)
    }

    pub fn redo_label(&self) -> Option<String> {
        self.redo_stack.last().map(ChangeRecord::redo_label)
    }

    pub fn is_applying(&self) -> bool {
        self.applying
    }

    pub fn set_applying(&mut self, applying: bool) {
        self.applying = applying;
    }

    /// Enter a script transaction. Returns true for the outermost level,
    /// the only one that gets a begin sentinel.
    pub fn enter_script(&mut self) -> bool {
        self.script_nesting += 1;
        self.script_nesting == 1
    }

    /// Leave a script transaction. Returns true when that closed the
    /// outermost level.
    pub fn exit_script(&mut self) -> bool {
        if self.script_nesting == 0 {
            log::warn!("script end without matching begin");
            return false;
        }
        self.script_nesting -= 1;
        self.script_nesting == 0
    }

    pub fn in_script(&self) -> bool {
        self.script_nesting > 0
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    /// Detach every record that names `view`, leaving it inert. Called
    /// when a view is deleted so stale indexes can't resurface.
    pub fn forget_view(&mut self, view: usize) {
        for record in self.undo_stack.iter_mut().chain(self.redo_stack.iter_mut()) {
            let target = match &mut record.op {
                GridUndoOp::Rename { view: target, .. }
                | GridUndoOp::GenerationChange { view: target, .. }
                | GridUndoOp::SetGenCount { view: target, .. } => target,
                _ => continue,
            };
            if *target == Some(view) {
                *target = None;
            }
        }
    }

    /// Copy for a duplicated session. The replay guard never carries over.
    pub fn duplicate(&self) -> ChangeLog {
        ChangeLog {
            undo_stack: self.undo_stack.clone(),
            redo_stack: self.redo_stack.clone(),
            applying: false,
            script_nesting: self.script_nesting,
        }
    }
}
