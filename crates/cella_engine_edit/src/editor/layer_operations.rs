use std::path::PathBuf;

use anyhow::anyhow;
use cella_engine::{EngineError, EngineResult};

use super::{EditState, GridUndoOp};

impl EditState {
    /// Add a clone of the current view. Clones share the universe and the
    /// history; only the per-view bookkeeping is copied.
    pub fn add_clone(&mut self, name: impl Into<String>) -> usize {
        let mut view = self.view().clone();
        view.name = name.into();
        self.views.push(Some(view));
        self.views.len() - 1
    }

    pub fn set_current_view(&mut self, view: usize) -> EngineResult<()> {
        if self.view_meta(view).is_none() {
            return Err(EngineError::InvalidView(view).into());
        }
        self.current_view = view;
        Ok(())
    }

    /// Delete a clone. Records naming it stay on the stacks but go inert,
    /// so undoing past them never touches a dead view.
    pub fn delete_clone(&mut self, view: usize) -> EngineResult<()> {
        if view == self.current_view {
            return Err(anyhow!("cannot delete the current view"));
        }
        match self.views.get_mut(view) {
            Some(slot) if slot.is_some() => *slot = None,
            _ => return Err(EngineError::InvalidView(view).into()),
        }
        self.log()?.forget_view(view);
        Ok(())
    }

    /// Rename the current view. The new identity needs saving, so the
    /// save flag is raised and its old value travels with the record.
    pub fn rename(&mut self, name: impl Into<String>, path: Option<PathBuf>) -> EngineResult<()> {
        let view = self.current_view;
        let name = name.into();
        let meta = self.view();
        let old_name = meta.name.clone();
        let old_path = meta.file_path.clone();
        let old_save_needed = meta.save_needed;
        if old_name == name && old_path == path {
            return Ok(());
        }
        self.set_view_identity(view, name.clone(), path.clone(), true);
        self.push_record(
            GridUndoOp::Rename {
                view: Some(view),
                old_name,
                new_name: name,
                old_path,
                new_path: path,
                old_save_needed,
                new_save_needed: true,
            },
            "Rename",
        );
        Ok(())
    }
}
