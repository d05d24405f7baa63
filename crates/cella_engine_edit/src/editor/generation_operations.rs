use std::sync::Arc;

use anyhow::anyhow;
use cella_engine::{BigInt, EngineResult, Rect, Viewport};

use super::{ChangeRecord, EditState, GenBookmark, GridUndoOp, SnapshotFile, StartingPoint};

/// State captured when a generating run begins, held until the matching
/// finish turns it into a record. Consecutive runs inside one script
/// collapse into a single capture.
pub(super) struct GenCapture {
    pub generation: BigInt,
    pub file: Option<Arc<SnapshotFile>>,
    pub viewport: Viewport,
    pub selection: Option<Rect>,
    pub start: Option<StartingPoint>,
    pub scripted: bool,
}

impl EditState {
    /// Capture the pre-run state before generating. Brackets nest: inner
    /// calls are counted and only the outermost pair records anything.
    pub fn remember_generation_start(&mut self) -> EngineResult<()> {
        if self.is_applying() {
            return Ok(());
        }
        self.gen_nesting += 1;
        if self.gen_nesting > 1 || self.pending_gen.is_some() {
            return Ok(());
        }
        let generation = self.sim.generation().clone();
        let at_start = generation == self.view().start.generation;
        let start = at_start.then(|| self.view().start.clone());
        let file = if at_start {
            // cells come back from the starting point, no extra snapshot
            None
        } else if let Some(reused) = self.reusable_head_snapshot(&generation)? {
            Some(reused)
        } else {
            match self.snapshots.save(&mut self.sim) {
                Ok(file) => Some(file),
                Err(err) => {
                    log::warn!("could not save universe before generating: {err}; this run can't be undone");
                    None
                }
            }
        };
        let scripted = self.log()?.in_script();
        self.pending_gen = Some(GenCapture {
            generation,
            file,
            viewport: self.view().viewport.clone(),
            selection: self.view().selection,
            start,
            scripted,
        });
        Ok(())
    }

    /// Close a generating bracket. Outside a script the pending capture
    /// becomes a record right away; inside one it stays open so further
    /// runs collapse into it.
    pub fn remember_generation_finish(&mut self) -> EngineResult<()> {
        if self.is_applying() {
            return Ok(());
        }
        if self.gen_nesting > 0 {
            self.gen_nesting -= 1;
        }
        if self.gen_nesting > 0 || self.log()?.in_script() {
            return Ok(());
        }
        self.finish_pending_generation()
    }

    /// The newest record already restores `generation`; reuse its snapshot
    /// instead of serializing the same universe again.
    fn reusable_head_snapshot(&self, generation: &BigInt) -> EngineResult<Option<Arc<SnapshotFile>>> {
        let log = self.log()?;
        if let Some(record) = log.head_undo() {
            if let GridUndoOp::GenerationChange { new, .. } = &record.op {
                if new.generation == *generation {
                    return Ok(new.file.clone());
                }
            }
        }
        Ok(None)
    }

    pub(super) fn finish_pending_generation(&mut self) -> EngineResult<()> {
        let Some(capture) = self.pending_gen.take() else {
            return Ok(());
        };
        if *self.sim.generation() == capture.generation {
            return Ok(());
        }
        let new_generation = self.sim.generation().clone();
        let new_file = if new_generation == self.view().start.generation {
            None
        } else {
            match self.snapshots.save(&mut self.sim) {
                Ok(file) => Some(file),
                Err(err) => {
                    log::warn!("could not save universe after generating: {err}; this run can't be redone");
                    None
                }
            }
        };
        let old = GenBookmark {
            generation: capture.generation,
            file: capture.file,
            viewport: capture.viewport,
            selection: capture.selection,
        };
        let new = GenBookmark {
            generation: new_generation,
            file: new_file,
            viewport: self.view().viewport.clone(),
            selection: self.view().selection,
        };
        self.push_record(
            GridUndoOp::GenerationChange {
                old,
                new,
                view: Some(self.current_view),
                start: capture.start,
                scripted: capture.scripted,
            },
            "Gen Change",
        );
        Ok(())
    }

    /// Record a run that happened without brackets, from the starting
    /// point to the current generation. Meant for a freshly loaded session,
    /// so the counter must have moved past the start and no other change
    /// should be recorded yet.
    pub fn add_generation_change(&mut self) -> EngineResult<()> {
        let start = self.view().start.clone();
        if *self.sim.generation() <= start.generation {
            return Ok(());
        }
        if self.log()?.undo_len() > 0 {
            log::warn!("recording an unbracketed run over existing history");
        }
        self.pending_gen = Some(GenCapture {
            generation: start.generation.clone(),
            file: start.file.clone(),
            viewport: start.viewport.clone(),
            selection: start.selection,
            start: Some(start),
            scripted: false,
        });
        self.finish_pending_generation()
    }

    /// Capture the current state as the run's starting point.
    pub fn declare_start(&mut self) -> EngineResult<()> {
        let start = self.capture_starting_point()?;
        self.view_mut().start = start;
        Ok(())
    }

    fn capture_starting_point(&mut self) -> EngineResult<StartingPoint> {
        let file = Some(self.snapshots.save(&mut self.sim)?);
        let view = self.view();
        Ok(StartingPoint {
            generation: self.sim.generation().clone(),
            file,
            rule: self.sim.rule().clone(),
            algorithm: self.sim.algorithm(),
            viewport: view.viewport.clone(),
            selection: view.selection,
            dirty: view.dirty,
            save_needed: view.save_needed,
        })
    }

    /// Edit the generation counter without touching cells. Moving it back
    /// to or below the starting generation makes the current state the new
    /// starting point, since the old one is no longer in the past.
    pub fn set_generation_count(&mut self, new_generation: BigInt) -> EngineResult<()> {
        let old_generation = self.sim.generation().clone();
        if old_generation == new_generation {
            return Ok(());
        }
        let old_start = self.view().start.clone();
        self.sim.set_generation(new_generation.clone());
        let new_start = if old_generation > old_start.generation && new_generation <= old_start.generation {
            let start = self.capture_starting_point()?;
            self.view_mut().start = start.clone();
            Some(start)
        } else {
            None
        };
        self.push_record(
            GridUndoOp::SetGenCount {
                old_generation,
                new_generation,
                view: Some(self.current_view),
                old_start,
                new_start,
            },
            "Set Generation",
        );
        Ok(())
    }

    /// Unwind history until the universe sits at `target` again, as after
    /// a reset. A matching change recorded inside a script keeps unwinding
    /// to the span's begin sentinel so the script's edits go with it.
    pub fn sync_to_generation(&mut self, target: &BigInt) -> EngineResult<()> {
        self.finish_pending_generation()?;
        {
            let mut log = self.log()?;
            if log.is_applying() {
                return Ok(());
            }
            log.set_applying(true);
        }
        let result = self.sync_walk(target);
        self.log()?.set_applying(false);
        result
    }

    fn sync_walk(&mut self, target: &BigInt) -> EngineResult<()> {
        while *self.sim.generation() != *target {
            self.suppress_cancel = true;
            let Some(record) = self.log()?.pop_undo() else {
                self.suppress_cancel = false;
                log::error!("no recorded change reaches Gen {target}");
                return Err(anyhow!("history does not reach Gen {target}"));
            };
            let scripted = matches!(&record.op, GridUndoOp::GenerationChange { scripted: true, .. });
            if matches!(record.op, GridUndoOp::ScriptEnd) {
                self.unwind_script_span(record)?;
            } else {
                if let Err(err) = record.op.undo(self) {
                    log::warn!("could not undo {} while syncing: {err}", record.label);
                }
                if record.changes_dirty() {
                    self.set_dirty_all(record.old_dirty);
                }
                self.log()?.push_redo(record);
            }
            if scripted && *self.sim.generation() == *target {
                self.unwind_open_script()?;
            }
        }
        self.suppress_cancel = false;
        Ok(())
    }

    /// Continue unwinding a still-open script to its begin sentinel. The
    /// sentinel itself stays on the undo stack so the open script remains
    /// bracketed.
    fn unwind_open_script(&mut self) -> EngineResult<()> {
        loop {
            let Some(record) = self.log()?.pop_undo() else {
                log::error!("open script has no begin sentinel");
                return Err(anyhow!("undo history is corrupted"));
            };
            if matches!(record.op, GridUndoOp::ScriptBegin) {
                let old_dirty = record.old_dirty;
                self.log()?.push_undo(record);
                self.set_dirty_all(old_dirty);
                return Ok(());
            }
            if let Err(err) = record.op.undo(self) {
                log::warn!("could not undo {} while syncing: {err}", record.label);
            }
            self.log()?.push_redo(record);
        }
    }

    // --- script transactions -------------------------------------------

    /// Open a script transaction. Only the outermost call pushes the
    /// begin sentinel; nested calls are counted.
    pub fn script_begin(&mut self) -> EngineResult<()> {
        let dirty = self.dirty();
        let mut log = self.log()?;
        if log.enter_script() {
            log.push(ChangeRecord {
                op: GridUndoOp::ScriptBegin,
                label: "Script Changes".to_string(),
                old_dirty: dirty,
                new_dirty: dirty,
            });
        }
        Ok(())
    }

    /// Close a script transaction. A span that recorded nothing vanishes
    /// without trace; otherwise the end sentinel completes it.
    pub fn script_end(&mut self) -> EngineResult<()> {
        if !self.log()?.in_script() {
            log::warn!("script end without matching begin");
            return Ok(());
        }
        self.finish_pending_generation()?;
        let dirty = self.dirty();
        let mut log = self.log()?;
        if log.exit_script() {
            if matches!(log.head_undo().map(|record| &record.op), Some(GridUndoOp::ScriptBegin)) {
                log.pop_undo();
            } else {
                log.push_undo(ChangeRecord {
                    op: GridUndoOp::ScriptEnd,
                    label: "Script Changes".to_string(),
                    old_dirty: dirty,
                    new_dirty: dirty,
                });
            }
        }
        Ok(())
    }
}
