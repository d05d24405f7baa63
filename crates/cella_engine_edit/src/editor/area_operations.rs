use std::collections::HashMap;

use cella_engine::{EngineError, EngineResult, Rect};

use super::{CellDiff, EditState, GridUndoOp};

const PUMP_INTERVAL: usize = 4096;

impl EditState {
    /// Mirror the selection, or the whole pattern when nothing is
    /// selected. Cancelling leaves the universe untouched.
    pub fn flip(&mut self, top_bottom: bool) -> EngineResult<()> {
        if self.flip_raw(top_bottom)? {
            let label = if top_bottom { "Flip Top-Bottom" } else { "Flip Left-Right" };
            self.push_record(GridUndoOp::Flip { top_bottom }, label);
        }
        Ok(())
    }

    /// Rotate by a quarter turn. With a selection the turn happens in
    /// place inside it and is recorded as cell diffs; without one the
    /// whole pattern turns and is replayed by turning again.
    pub fn rotate(&mut self, clockwise: bool) -> EngineResult<()> {
        let label = if clockwise { "Rotate Clockwise" } else { "Rotate Anticlockwise" };
        let selection = self.view().selection;
        match selection {
            None => {
                if self.rotate_pattern_raw(clockwise)? {
                    self.push_record(GridUndoOp::RotatePattern { clockwise }, label);
                }
                Ok(())
            }
            Some(rect) => {
                let new_rect = rect.rotated();
                let diffs = self.rotate_area(rect, new_rect, clockwise)?;
                let old_selection = Some(rect);
                let new_selection = Some(new_rect);
                self.set_selection_raw(new_selection);
                self.push_record(
                    GridUndoOp::Rotate {
                        diffs,
                        old_selection,
                        new_selection,
                    },
                    label,
                );
                Ok(())
            }
        }
    }

    /// Mirror cells inside the active rect. True if anything moved.
    pub(super) fn flip_raw(&mut self, top_bottom: bool) -> EngineResult<bool> {
        let selection = self.view().selection;
        let rect = match selection {
            Some(rect) => rect,
            None => match self.sim.find_bounds() {
                Some(bounds) => bounds,
                None => return Ok(false),
            },
        };
        let cells: Vec<(i64, i64, u8)> = self.sim.cells().filter(|&(x, y, _)| rect.contains(x, y)).collect();
        if cells.is_empty() {
            return Ok(false);
        }
        let total = cells.len();
        let mut moved = Vec::with_capacity(total);
        for (i, &(x, y, state)) in cells.iter().enumerate() {
            let target = if top_bottom {
                (x, rect.top + rect.bottom - y)
            } else {
                (rect.left + rect.right - x, y)
            };
            moved.push((target, state));
            if i % PUMP_INTERVAL == 0 && !self.pump_poll(i, total) {
                return Err(EngineError::Aborted.into());
            }
        }
        for &(x, y, _) in &cells {
            self.sim.set_cell(x, y, 0);
        }
        for ((x, y), state) in moved {
            self.sim.set_cell(x, y, state);
        }
        Ok(true)
    }

    /// Quarter-turn of the whole pattern about its bounding box center.
    /// True if anything moved.
    pub(super) fn rotate_pattern_raw(&mut self, clockwise: bool) -> EngineResult<bool> {
        let bounds = match self.sim.find_bounds() {
            Some(bounds) => bounds,
            None => return Ok(false),
        };
        let target = bounds.rotated();
        let cells: Vec<(i64, i64, u8)> = self.sim.cells().collect();
        let total = cells.len();
        let mut moved = Vec::with_capacity(total);
        for (i, &(x, y, state)) in cells.iter().enumerate() {
            moved.push((rotate_point(x, y, bounds, target, clockwise), state));
            if i % PUMP_INTERVAL == 0 && !self.pump_poll(i, total) {
                return Err(EngineError::Aborted.into());
            }
        }
        self.sim.clear();
        for ((x, y), state) in moved {
            self.sim.set_cell(x, y, state);
        }
        Ok(true)
    }

    /// Rotate the cells of `rect` into `new_rect`, clearing what either
    /// rect covered before. Returns the applied diffs; on cancellation
    /// nothing is applied.
    fn rotate_area(&mut self, rect: Rect, new_rect: Rect, clockwise: bool) -> EngineResult<Vec<CellDiff>> {
        let mut wanted: HashMap<(i64, i64), u8> = HashMap::new();
        let affected: Vec<(i64, i64, u8)> = self
            .sim
            .cells()
            .filter(|&(x, y, _)| rect.contains(x, y) || new_rect.contains(x, y))
            .collect();
        for &(x, y, _) in &affected {
            wanted.insert((x, y), 0);
        }
        let sources: Vec<(i64, i64, u8)> = affected.iter().copied().filter(|&(x, y, _)| rect.contains(x, y)).collect();
        let total = sources.len();
        for (i, &(x, y, state)) in sources.iter().enumerate() {
            wanted.insert(rotate_point(x, y, rect, new_rect, clockwise), state);
            if i % PUMP_INTERVAL == 0 && !self.pump_poll(i, total) {
                return Err(EngineError::Aborted.into());
            }
        }
        let mut diffs = Vec::new();
        for (&(x, y), &new_state) in &wanted {
            let old_state = self.sim.get_cell(x, y);
            if old_state != new_state {
                diffs.push(CellDiff {
                    x,
                    y,
                    old_state,
                    new_state,
                });
            }
        }
        for diff in &diffs {
            self.sim.set_cell(diff.x, diff.y, diff.new_state);
        }
        Ok(diffs)
    }
}

/// Map a point of `from` onto `to` under a quarter turn.
fn rotate_point(x: i64, y: i64, from: Rect, to: Rect, clockwise: bool) -> (i64, i64) {
    if clockwise {
        (to.left + (from.bottom - y), to.top + (x - from.left))
    } else {
        (to.left + (y - from.top), to.top + (from.right - x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::UndoState;
    use cella_engine::{Algorithm, Rule};
    use pretty_assertions::assert_eq;

    fn state() -> EditState {
        EditState::new("test", Algorithm::Quick, Rule::default()).unwrap()
    }

    #[test]
    fn flip_is_self_inverse() {
        let mut s = state();
        s.set_cell(0, 0, 1);
        s.set_cell(2, 1, 1);
        s.commit_cell_changes("Draw");
        s.flip(true).unwrap();
        assert_eq!(s.grid().get_cell(0, 1), 1);
        assert_eq!(s.grid().get_cell(2, 0), 1);
        s.undo().unwrap();
        assert_eq!(s.grid().get_cell(0, 0), 1);
        assert_eq!(s.grid().get_cell(2, 1), 1);
    }

    #[test]
    fn whole_pattern_rotation_undoes_by_counter_rotation() {
        let mut s = state();
        for x in 0..3 {
            s.set_cell(x, 0, 1);
        }
        s.commit_cell_changes("Draw");
        s.rotate(true).unwrap();
        assert_eq!(s.grid().get_cell(1, -1), 1);
        assert_eq!(s.grid().get_cell(1, 1), 1);
        s.undo().unwrap();
        for x in 0..3 {
            assert_eq!(s.grid().get_cell(x, 0), 1);
        }
        assert_eq!(s.grid().population(), 3);
    }

    #[test]
    fn selection_rotation_restores_cells_and_selection() {
        let mut s = state();
        s.set_cell(0, 0, 1);
        s.set_cell(1, 0, 1);
        s.commit_cell_changes("Draw");
        s.set_selection(Some(Rect::new(0, 0, 3, 1)));
        s.rotate(true).unwrap();
        assert_eq!(s.selection().unwrap().width(), 2);
        assert_eq!(s.selection().unwrap().height(), 4);
        s.undo().unwrap();
        assert_eq!(s.selection(), Some(Rect::new(0, 0, 3, 1)));
        assert_eq!(s.grid().get_cell(0, 0), 1);
        assert_eq!(s.grid().get_cell(1, 0), 1);
        assert_eq!(s.grid().population(), 2);
    }

    struct CancelPump;
    impl super::super::ProgressPump for CancelPump {
        fn poll(&mut self, _fraction: f64) -> bool {
            false
        }
    }

    #[test]
    fn cancelled_flip_changes_nothing() {
        let mut s = state();
        s.set_cell(0, 0, 1);
        s.set_cell(5, 7, 2);
        s.commit_cell_changes("Draw");
        s.set_progress_pump(Box::new(CancelPump));
        let err = s.flip(true).unwrap_err();
        assert!(cella_engine::EngineError::is_abort(&err));
        assert_eq!(s.grid().get_cell(0, 0), 1);
        assert_eq!(s.grid().get_cell(5, 7), 2);
        // nothing was recorded either
        assert_eq!(s.undo_description().as_deref(), Some("Draw"));
    }
}
