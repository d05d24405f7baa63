use cella_engine::Rect;

use super::{EditState, GridUndoOp};

impl EditState {
    /// Change the selection and record it. Equal old and new selections
    /// leave no record.
    pub fn set_selection(&mut self, selection: Option<Rect>) {
        let old = self.view().selection;
        if old == selection {
            return;
        }
        self.set_selection_raw(selection);
        if !self.is_applying() {
            self.push_record(GridUndoOp::SelectionChange { old, new: selection }, "Selection");
        }
    }

    pub fn clear_selection(&mut self) {
        self.set_selection(None);
    }

    /// Select the whole pattern, or clear the selection when the universe
    /// is empty.
    pub fn select_all(&mut self) {
        let bounds = self.sim.find_bounds();
        self.set_selection(bounds);
    }
}
