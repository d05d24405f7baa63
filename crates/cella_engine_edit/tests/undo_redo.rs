use cella_engine::{Algorithm, BigInt, Rect, Rule};
use cella_engine_edit::{EditState, UndoState};
use pretty_assertions::assert_eq;

fn session() -> EditState {
    EditState::new("test", Algorithm::Quick, Rule::default()).unwrap()
}

#[test]
fn cell_edit_round_trip() {
    let mut s = session();
    s.set_cell(0, 0, 1);
    s.set_cell(1, 2, 1);
    s.commit_cell_changes("Draw");
    assert_eq!(s.undo_description().as_deref(), Some("Draw"));

    s.undo().unwrap();
    assert_eq!(s.grid().population(), 0);
    assert!(!s.can_undo());
    assert_eq!(s.redo_description().as_deref(), Some("Draw"));

    s.redo().unwrap();
    assert_eq!(s.grid().get_cell(0, 0), 1);
    assert_eq!(s.grid().get_cell(1, 2), 1);
}

#[test]
fn new_change_clears_redo() {
    let mut s = session();
    s.set_cell(0, 0, 1);
    s.commit_cell_changes("Draw");
    s.undo().unwrap();
    assert!(s.can_redo());

    s.set_cell(5, 5, 1);
    s.commit_cell_changes("Draw");
    assert!(!s.can_redo());
}

#[test]
fn overlapping_diffs_unwind_to_the_oldest_state() {
    let mut s = session();
    s.set_cell(0, 0, 3);
    s.commit_cell_changes("Draw");
    // one edit writing the same cell repeatedly
    s.set_cell(0, 0, 1);
    s.set_cell(0, 0, 2);
    s.set_cell(0, 0, 0);
    s.commit_cell_changes("Scribble");
    assert_eq!(s.grid().get_cell(0, 0), 0);

    s.undo().unwrap();
    assert_eq!(s.grid().get_cell(0, 0), 3);
}

#[test]
fn script_span_undoes_as_one_unit() {
    let mut s = session();
    s.script_begin().unwrap();
    s.set_cell(0, 0, 1);
    s.commit_cell_changes("Draw");
    s.set_selection(Some(Rect::new(0, 0, 3, 3)));
    s.set_cell(1, 1, 1);
    s.commit_cell_changes("Draw");
    s.script_end().unwrap();

    s.undo().unwrap();
    assert_eq!(s.grid().population(), 0);
    assert_eq!(s.selection(), None);
    assert!(!s.dirty());

    s.redo().unwrap();
    assert_eq!(s.grid().population(), 2);
    assert_eq!(s.selection(), Some(Rect::new(0, 0, 3, 3)));
    assert!(s.dirty());
}

#[test]
fn empty_script_leaves_no_trace() {
    let mut s = session();
    s.script_begin().unwrap();
    s.script_end().unwrap();
    assert!(!s.can_undo());

    // nested empty scripts vanish too
    s.script_begin().unwrap();
    s.script_begin().unwrap();
    s.script_end().unwrap();
    s.script_end().unwrap();
    assert!(!s.can_undo());
}

#[test]
fn generation_run_restores_cells_and_counter() {
    let mut s = session();
    for x in 0..3 {
        s.set_cell(x, 0, 1);
    }
    s.commit_cell_changes("Draw");
    s.declare_start().unwrap();

    s.remember_generation_start().unwrap();
    s.grid_mut().step();
    s.grid_mut().step();
    s.remember_generation_finish().unwrap();
    assert_eq!(s.grid().generation(), &BigInt::from(2));
    assert_eq!(s.undo_description().as_deref(), Some("to Gen 0"));

    s.undo().unwrap();
    assert_eq!(s.grid().generation(), &BigInt::from(0));
    for x in 0..3 {
        assert_eq!(s.grid().get_cell(x, 0), 1);
    }

    assert_eq!(s.redo_description().as_deref(), Some("to Gen 2"));
    s.redo().unwrap();
    assert_eq!(s.grid().generation(), &BigInt::from(2));
    assert_eq!(s.grid().get_cell(1, 0), 1);
}

#[test]
fn consecutive_runs_share_the_boundary_snapshot() {
    let mut s = session();
    for x in 0..3 {
        s.set_cell(x, 0, 1);
    }
    s.commit_cell_changes("Draw");
    s.declare_start().unwrap(); // one save

    s.remember_generation_start().unwrap(); // at the start, no save
    s.grid_mut().step();
    s.remember_generation_finish().unwrap(); // saves Gen 1
    assert_eq!(s.snapshots().save_count(), 2);

    s.remember_generation_start().unwrap(); // reuses the Gen 1 file
    s.grid_mut().step();
    s.remember_generation_finish().unwrap(); // saves Gen 2
    assert_eq!(s.snapshots().save_count(), 3);
}

#[test]
fn generating_does_not_restore_dirty() {
    let mut s = session();
    s.set_cell(0, 0, 1);
    s.set_cell(1, 0, 1);
    s.set_cell(0, 1, 1);
    s.set_cell(1, 1, 1);
    s.commit_cell_changes("Draw");
    s.declare_start().unwrap();
    assert!(s.dirty());

    s.remember_generation_start().unwrap();
    s.grid_mut().step();
    s.remember_generation_finish().unwrap();
    s.undo().unwrap();
    // the pattern is still the edited one, so it stays dirty
    assert!(s.dirty());

    // undoing the drawing itself restores the clean flag
    s.undo().unwrap();
    assert!(!s.dirty());
}

#[test]
fn set_generation_count_redeclares_the_start_when_moving_below_it() {
    let mut s = session();
    s.set_cell(0, 0, 1);
    s.commit_cell_changes("Draw");
    s.grid_mut().set_generation(BigInt::from(5));
    s.declare_start().unwrap();
    s.grid_mut().set_generation(BigInt::from(10));

    s.set_generation_count(BigInt::from(2)).unwrap();
    assert_eq!(s.grid().generation(), &BigInt::from(2));

    s.undo().unwrap();
    assert_eq!(s.grid().generation(), &BigInt::from(10));

    s.redo().unwrap();
    assert_eq!(s.grid().generation(), &BigInt::from(2));
}

#[test]
fn set_generation_count_redeclares_the_start_at_the_boundary() {
    let mut s = session();
    s.set_cell(0, 0, 1);
    s.commit_cell_changes("Draw");
    s.grid_mut().set_generation(BigInt::from(5));
    s.declare_start().unwrap();
    s.grid_mut().set_generation(BigInt::from(10));
    let saves = s.snapshots().save_count();

    // landing exactly on the starting generation still redeclares it
    s.set_generation_count(BigInt::from(5)).unwrap();
    assert_eq!(s.snapshots().save_count(), saves + 1);

    // moving the counter while already at or below the start does not
    s.set_generation_count(BigInt::from(3)).unwrap();
    assert_eq!(s.snapshots().save_count(), saves + 1);
}

#[test]
fn unbracketed_run_records_only_past_the_start() {
    let mut s = session();
    for x in 0..3 {
        s.grid_mut().set_cell(x, 0, 1);
    }
    s.declare_start().unwrap();

    // the counter never moved, so there is no run to record
    s.add_generation_change().unwrap();
    assert!(!s.can_undo());

    s.grid_mut().step();
    s.grid_mut().step();
    s.add_generation_change().unwrap();
    assert!(s.can_undo());

    s.undo().unwrap();
    assert_eq!(s.grid().generation(), &BigInt::from(0));
    for x in 0..3 {
        assert_eq!(s.grid().get_cell(x, 0), 1);
    }
}

#[test]
fn sync_walks_back_through_several_runs() {
    let mut s = session();
    for x in 0..3 {
        s.set_cell(x, 0, 1);
    }
    s.commit_cell_changes("Draw");
    s.declare_start().unwrap();

    for _ in 0..2 {
        s.remember_generation_start().unwrap();
        s.grid_mut().step();
        s.remember_generation_finish().unwrap();
    }
    assert_eq!(s.grid().generation(), &BigInt::from(2));

    s.sync_to_generation(&BigInt::from(0)).unwrap();
    assert_eq!(s.grid().generation(), &BigInt::from(0));
    for x in 0..3 {
        assert_eq!(s.grid().get_cell(x, 0), 1);
    }
    // everything walked over is redoable again
    assert!(s.can_redo());

    assert!(s.sync_to_generation(&BigInt::from(100)).is_err());
}

#[test]
fn failed_sync_reports_unreachable_target() {
    let mut s = session();
    s.set_cell(0, 0, 1);
    s.commit_cell_changes("Draw");
    let err = s.sync_to_generation(&BigInt::from(3)).unwrap_err();
    assert!(err.to_string().contains("Gen 3"));
}

#[test]
fn clear_history_drops_both_stacks() {
    let mut s = session();
    s.set_cell(0, 0, 1);
    s.commit_cell_changes("Draw");
    s.undo().unwrap();
    s.clear_history().unwrap();
    assert!(!s.can_undo());
    assert!(!s.can_redo());
}

#[test]
fn clear_history_inside_a_script_keeps_it_bracketed() {
    let mut s = session();
    s.script_begin().unwrap();
    s.set_cell(0, 0, 1);
    s.commit_cell_changes("Draw");
    s.clear_history().unwrap();
    s.set_cell(1, 1, 1);
    s.commit_cell_changes("Draw");
    s.script_end().unwrap();

    // only the post-clear part of the script is one undoable span
    s.undo().unwrap();
    assert_eq!(s.grid().get_cell(1, 1), 0);
    assert_eq!(s.grid().get_cell(0, 0), 1);
    assert!(!s.can_undo());
}

#[test]
fn reclaim_keeps_referenced_snapshots_restorable() {
    let mut s = session();
    s.set_cell(0, 0, 1);
    s.set_cell(1, 0, 1);
    s.set_cell(2, 0, 1);
    s.commit_cell_changes("Draw");
    s.declare_start().unwrap();
    s.remember_generation_start().unwrap();
    s.grid_mut().step();
    s.remember_generation_finish().unwrap();

    assert_eq!(s.reclaim_snapshots(), 0);
    s.undo().unwrap();
    assert_eq!(s.grid().generation(), &BigInt::from(0));
}

#[test]
fn reclaim_spares_snapshots_held_by_a_duplicate() {
    let mut s = session();
    s.set_cell(0, 0, 1);
    s.set_cell(1, 0, 1);
    s.set_cell(2, 0, 1);
    s.commit_cell_changes("Draw");
    s.declare_start().unwrap();
    s.remember_generation_start().unwrap();
    s.grid_mut().step();
    s.remember_generation_finish().unwrap();

    let mut copy = s.duplicate().unwrap();
    s.clear_history().unwrap();
    s.reclaim_snapshots();

    // the copy's records still own their files
    copy.undo().unwrap();
    assert_eq!(copy.grid().generation(), &BigInt::from(0));
    copy.redo().unwrap();
    assert_eq!(copy.grid().generation(), &BigInt::from(1));
}
