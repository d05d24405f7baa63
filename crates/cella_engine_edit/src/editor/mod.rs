use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::anyhow;
use cella_engine::{Algorithm, BigInt, CellGrid, EngineResult, Rect, Rule, Viewport};

mod cell_buffer;
pub use cell_buffer::*;
mod snapshot;
pub use snapshot::*;
mod undo_operation;
pub use undo_operation::*;
mod undo_stack;
pub use undo_stack::*;

mod area_operations;
mod generation_operations;
use generation_operations::GenCapture;
mod layer_operations;
mod rule_operations;
mod selection_operations;

/// Callback pumped during long edits. Returning false cancels the edit;
/// a cancelled edit leaves the universe untouched.
pub trait ProgressPump {
    fn poll(&mut self, fraction: f64) -> bool;
}

/// Everything needed to recreate the state a run was started from.
#[derive(Clone, Debug)]
pub struct StartingPoint {
    pub generation: BigInt,
    pub file: Option<Arc<SnapshotFile>>,
    pub rule: Rule,
    pub algorithm: Algorithm,
    pub viewport: Viewport,
    pub selection: Option<Rect>,
    pub dirty: bool,
    pub save_needed: bool,
}

/// Per-view bookkeeping. Views are clones sharing one universe; deleting
/// one leaves a `None` slot so indexes held by history records stay valid.
#[derive(Clone, Debug)]
pub struct ViewMeta {
    pub name: String,
    pub file_path: Option<PathBuf>,
    pub dirty: bool,
    pub save_needed: bool,
    pub viewport: Viewport,
    pub selection: Option<Rect>,
    pub start: StartingPoint,
}

impl ViewMeta {
    fn new(name: String, grid: &CellGrid) -> Self {
        Self {
            name,
            file_path: None,
            dirty: false,
            save_needed: false,
            viewport: Viewport::default(),
            selection: None,
            start: StartingPoint {
                generation: grid.generation().clone(),
                file: None,
                rule: grid.rule().clone(),
                algorithm: grid.algorithm(),
                viewport: Viewport::default(),
                selection: None,
                dirty: false,
                save_needed: false,
            },
        }
    }
}

/// An editing session: the universe, its views, the pending-edit buffers
/// and the shared history.
pub struct EditState {
    sim: CellGrid,
    views: Vec<Option<ViewMeta>>,
    current_view: usize,
    history: Arc<Mutex<ChangeLog>>,
    diff_buffer: CellDiffBuffer,
    snapshots: SnapshotStore,
    pending_gen: Option<GenCapture>,
    gen_nesting: usize,
    pump: Option<Box<dyn ProgressPump>>,
    // true while replaying a script span, where cancellation is ignored
    suppress_cancel: bool,
}

impl EditState {
    pub fn new(name: impl Into<String>, algorithm: Algorithm, rule: Rule) -> EngineResult<Self> {
        let sim = CellGrid::new(algorithm, rule);
        let view = ViewMeta::new(name.into(), &sim);
        Ok(Self {
            sim,
            views: vec![Some(view)],
            current_view: 0,
            history: Arc::new(Mutex::new(ChangeLog::default())),
            diff_buffer: CellDiffBuffer::default(),
            snapshots: SnapshotStore::new()?,
            pending_gen: None,
            gen_nesting: 0,
            pump: None,
            suppress_cancel: false,
        })
    }

    pub fn from_grid(name: impl Into<String>, sim: CellGrid) -> EngineResult<Self> {
        let view = ViewMeta::new(name.into(), &sim);
        Ok(Self {
            sim,
            views: vec![Some(view)],
            current_view: 0,
            history: Arc::new(Mutex::new(ChangeLog::default())),
            diff_buffer: CellDiffBuffer::default(),
            snapshots: SnapshotStore::new()?,
            pending_gen: None,
            gen_nesting: 0,
            pump: None,
            suppress_cancel: false,
        })
    }

    pub fn grid(&self) -> &CellGrid {
        &self.sim
    }

    pub fn grid_mut(&mut self) -> &mut CellGrid {
        &mut self.sim
    }

    pub fn set_progress_pump(&mut self, pump: Box<dyn ProgressPump>) {
        self.pump = Some(pump);
    }

    pub fn history(&self) -> Arc<Mutex<ChangeLog>> {
        self.history.clone()
    }

    pub fn snapshots(&self) -> &SnapshotStore {
        &self.snapshots
    }

    fn log(&self) -> EngineResult<MutexGuard<'_, ChangeLog>> {
        self.history.lock().map_err(|err| anyhow!("history lock poisoned: {err}"))
    }

    pub fn is_applying(&self) -> bool {
        self.history.lock().map(|log| log.is_applying()).unwrap_or(false)
    }

    // --- views ---------------------------------------------------------

    pub fn current_view(&self) -> usize {
        self.current_view
    }

    pub(super) fn view(&self) -> &ViewMeta {
        match self.views[self.current_view].as_ref() {
            Some(view) => view,
            None => unreachable!("current view is never deleted"),
        }
    }

    pub(super) fn view_mut(&mut self) -> &mut ViewMeta {
        match self.views[self.current_view].as_mut() {
            Some(view) => view,
            None => unreachable!("current view is never deleted"),
        }
    }

    pub fn view_meta(&self, view: usize) -> Option<&ViewMeta> {
        self.views.get(view).and_then(Option::as_ref)
    }

    pub fn name(&self) -> &str {
        &self.view().name
    }

    pub fn dirty(&self) -> bool {
        self.view().dirty
    }

    pub fn viewport(&self) -> &Viewport {
        &self.view().viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.view_mut().viewport = viewport;
    }

    pub fn selection(&self) -> Option<Rect> {
        self.view().selection
    }

    pub(super) fn set_dirty_all(&mut self, dirty: bool) {
        for view in self.views.iter_mut().flatten() {
            view.dirty = dirty;
        }
    }

    // --- cell edits ----------------------------------------------------

    /// Change one cell, buffering the diff for the next commit. Diffs are
    /// not buffered while the history itself is being replayed.
    pub fn set_cell(&mut self, x: i64, y: i64, state: u8) {
        let old = self.sim.set_cell(x, y, state);
        let new = self.sim.get_cell(x, y);
        if old != new && !self.is_applying() {
            self.diff_buffer.record(CellDiff {
                x,
                y,
                old_state: old,
                new_state: new,
            });
        }
    }

    pub fn pending_cell_changes(&self) -> usize {
        self.diff_buffer.len()
    }

    /// Turn the buffered diffs into one undoable record. If allocation
    /// failure lost part of them the edit stays applied but unrecorded.
    pub fn commit_cell_changes(&mut self, label: &str) {
        match self.diff_buffer.commit() {
            Some(diffs) => {
                if !diffs.is_empty() {
                    self.push_record(GridUndoOp::CellEdit { diffs }, label);
                }
            }
            None => self.set_dirty_all(true),
        }
    }

    pub fn forget_cell_changes(&mut self) {
        self.diff_buffer.forget();
    }

    pub(super) fn apply_diffs_forward(&mut self, diffs: &[CellDiff]) -> EngineResult<()> {
        for diff in diffs {
            self.sim.set_cell(diff.x, diff.y, diff.new_state);
        }
        self.sim.end_of_pattern();
        Ok(())
    }

    /// Replay diffs newest-first so overlapping writes to one cell unwind
    /// to the oldest recorded state.
    pub(super) fn apply_diffs_backward(&mut self, diffs: &[CellDiff]) -> EngineResult<()> {
        for diff in diffs.iter().rev() {
            self.sim.set_cell(diff.x, diff.y, diff.old_state);
        }
        self.sim.end_of_pattern();
        Ok(())
    }

    // --- recording -----------------------------------------------------

    pub(super) fn push_record(&mut self, op: GridUndoOp, label: impl Into<String>) {
        let old_dirty = self.dirty();
        let mut record = ChangeRecord {
            op,
            label: label.into(),
            old_dirty,
            new_dirty: old_dirty,
        };
        if record.changes_dirty() {
            record.new_dirty = true;
            self.set_dirty_all(true);
        }
        if let Ok(mut log) = self.history.lock() {
            log.push(record);
        }
    }

    // --- undo / redo ---------------------------------------------------

    /// Undo the most recent change. A no-op while a replay is already in
    /// progress or when there is nothing to undo; on failure the stacks
    /// are left exactly as they were.
    pub fn undo(&mut self) -> EngineResult<()> {
        self.finish_pending_generation()?;
        let record = {
            let mut log = self.log()?;
            if log.is_applying() {
                return Ok(());
            }
            let Some(record) = log.pop_undo() else {
                return Ok(());
            };
            log.set_applying(true);
            record
        };
        let result = self.apply_undo(record);
        self.log()?.set_applying(false);
        result
    }

    /// Redo the most recently undone change.
    pub fn redo(&mut self) -> EngineResult<()> {
        let record = {
            let mut log = self.log()?;
            if log.is_applying() {
                return Ok(());
            }
            let Some(record) = log.pop_redo() else {
                return Ok(());
            };
            log.set_applying(true);
            record
        };
        let result = self.apply_redo(record);
        self.log()?.set_applying(false);
        result
    }

    fn apply_undo(&mut self, record: ChangeRecord) -> EngineResult<()> {
        if matches!(record.op, GridUndoOp::ScriptEnd) {
            return self.unwind_script_span(record);
        }
        match record.op.undo(self) {
            Ok(()) => {
                if record.changes_dirty() {
                    self.set_dirty_all(record.old_dirty);
                }
                self.log()?.push_redo(record);
                Ok(())
            }
            Err(err) => {
                self.log()?.push_undo(record);
                Err(err)
            }
        }
    }

    fn apply_redo(&mut self, record: ChangeRecord) -> EngineResult<()> {
        if matches!(record.op, GridUndoOp::ScriptBegin) {
            return self.replay_script_span(record);
        }
        match record.op.redo(self) {
            Ok(()) => {
                if record.changes_dirty() {
                    self.set_dirty_all(record.new_dirty);
                }
                self.log()?.push_undo(record);
                Ok(())
            }
            Err(err) => {
                self.log()?.push_redo(record);
                Err(err)
            }
        }
    }

    /// Undo an entire script span in one step, from its end sentinel back
    /// to its begin sentinel. Individual failures inside the span are
    /// logged and skipped; cancellation is ignored.
    fn unwind_script_span(&mut self, end: ChangeRecord) -> EngineResult<()> {
        self.log()?.push_redo(end);
        self.suppress_cancel = true;
        let result = loop {
            let popped = match self.log() {
                Ok(mut log) => log.pop_undo(),
                Err(err) => break Err(err),
            };
            let Some(record) = popped else {
                log::error!("script span has no begin sentinel");
                break Err(anyhow!("undo history is corrupted"));
            };
            let is_begin = matches!(record.op, GridUndoOp::ScriptBegin);
            let old_dirty = record.old_dirty;
            if !is_begin {
                if let Err(err) = record.op.undo(self) {
                    log::warn!("could not undo {} in script span: {err}", record.label);
                }
            }
            match self.log() {
                Ok(mut log) => log.push_redo(record),
                Err(err) => break Err(err),
            }
            if is_begin {
                self.set_dirty_all(old_dirty);
                break Ok(());
            }
        };
        self.suppress_cancel = false;
        result
    }

    fn replay_script_span(&mut self, begin: ChangeRecord) -> EngineResult<()> {
        self.log()?.push_undo(begin);
        self.suppress_cancel = true;
        let result = loop {
            let popped = match self.log() {
                Ok(mut log) => log.pop_redo(),
                Err(err) => break Err(err),
            };
            let Some(record) = popped else {
                log::error!("script span has no end sentinel");
                break Err(anyhow!("redo history is corrupted"));
            };
            let is_end = matches!(record.op, GridUndoOp::ScriptEnd);
            let new_dirty = record.new_dirty;
            if !is_end {
                if let Err(err) = record.op.redo(self) {
                    log::warn!("could not redo {} in script span: {err}", record.label);
                }
            }
            match self.log() {
                Ok(mut log) => log.push_undo(record),
                Err(err) => break Err(err),
            }
            if is_end {
                self.set_dirty_all(new_dirty);
                break Ok(());
            }
        };
        self.suppress_cancel = false;
        result
    }

    // --- history maintenance -------------------------------------------

    /// Drop the whole history. Inside a script the begin sentinel is put
    /// back so the rest of the script still forms one undoable span.
    pub fn clear_history(&mut self) -> EngineResult<()> {
        self.forget_cell_changes();
        self.pending_gen = None;
        self.gen_nesting = 0;
        let dirty = self.dirty();
        let mut log = self.log()?;
        log.clear();
        if log.in_script() {
            log.push_undo(ChangeRecord {
                op: GridUndoOp::ScriptBegin,
                label: "Script Changes".to_string(),
                old_dirty: dirty,
                new_dirty: dirty,
            });
        }
        Ok(())
    }

    /// Sweep the snapshot directory. Every file a live record, starting
    /// point, or pending run still holds is kept, even when the holder
    /// lives in a session duplicated from this one.
    pub fn reclaim_snapshots(&mut self) -> usize {
        self.snapshots.reclaim()
    }

    /// Deep copy of the session for a duplicated view: same universe and
    /// history, but only the current view travels. Records tied to the
    /// other views go inert; snapshot files are shared, not copied.
    pub fn duplicate(&self) -> EngineResult<EditState> {
        let mut log = self.log()?.duplicate();
        let mut views = self.views.clone();
        for (i, slot) in views.iter_mut().enumerate() {
            if i != self.current_view && slot.is_some() {
                *slot = None;
                log.forget_view(i);
            }
        }
        Ok(EditState {
            sim: self.sim.clone(),
            views,
            current_view: self.current_view,
            history: Arc::new(Mutex::new(log)),
            diff_buffer: CellDiffBuffer::default(),
            snapshots: SnapshotStore::new()?,
            pending_gen: None,
            gen_nesting: 0,
            pump: None,
            suppress_cancel: false,
        })
    }

    // --- raw state setters used while replaying ------------------------

    pub(super) fn set_selection_raw(&mut self, selection: Option<Rect>) {
        self.view_mut().selection = selection;
    }

    pub(super) fn set_generation_raw(&mut self, generation: BigInt) {
        self.sim.set_generation(generation);
    }

    pub(super) fn set_rule_raw(&mut self, rule: Rule) {
        self.sim.set_rule(rule);
    }

    pub(super) fn set_algorithm_raw(&mut self, algorithm: Algorithm) {
        self.sim.set_algorithm(algorithm);
    }

    pub(super) fn set_view_identity(&mut self, view: usize, name: String, path: Option<PathBuf>, save_needed: bool) {
        if let Some(Some(view)) = self.views.get_mut(view) {
            view.name = name;
            view.file_path = path;
            view.save_needed = save_needed;
        }
    }

    pub(super) fn set_starting_point(&mut self, view: usize, start: StartingPoint) {
        if let Some(Some(view)) = self.views.get_mut(view) {
            view.start = start;
        }
    }

    /// Put the universe back at a bookmarked generation. Cells come from
    /// the bookmark's snapshot, or from the starting point when the
    /// bookmark is the starting generation itself.
    pub(super) fn restore_bookmark(&mut self, bookmark: &GenBookmark) -> EngineResult<()> {
        if let Some(file) = &bookmark.file {
            self.sim = self.snapshots.load(file)?;
        } else if bookmark.generation == self.view().start.generation {
            self.restore_start_cells()?;
        } else {
            log::warn!("no snapshot for Gen {}; cells not restored", bookmark.generation);
        }
        self.sim.set_generation(bookmark.generation.clone());
        let view = self.view_mut();
        view.viewport = bookmark.viewport.clone();
        view.selection = bookmark.selection;
        Ok(())
    }

    fn restore_start_cells(&mut self) -> EngineResult<()> {
        let start = self.view().start.clone();
        match &start.file {
            Some(file) => {
                self.sim = self.snapshots.load(file)?;
            }
            None => log::warn!("starting pattern was never saved; cells not restored"),
        }
        self.sim.set_rule(start.rule);
        self.sim.set_algorithm(start.algorithm);
        Ok(())
    }

    pub(super) fn pump_poll(&mut self, done: usize, total: usize) -> bool {
        if self.suppress_cancel {
            return true;
        }
        match &mut self.pump {
            Some(pump) => pump.poll(done as f64 / total.max(1) as f64),
            None => true,
        }
    }
}

impl UndoState for EditState {
    fn undo_description(&self) -> Option<String> {
        self.history.lock().ok().and_then(|log| log.undo_label())
    }

    fn can_undo(&self) -> bool {
        self.history.lock().map(|log| log.can_undo()).unwrap_or(false)
    }

    fn undo(&mut self) -> EngineResult<()> {
        EditState::undo(self)
    }

    fn redo_description(&self) -> Option<String> {
        self.history.lock().ok().and_then(|log| log.redo_label())
    }

    fn can_redo(&self) -> bool {
        self.history.lock().map(|log| log.can_redo()).unwrap_or(false)
    }

    fn redo(&mut self) -> EngineResult<()> {
        EditState::redo(self)
    }
}
