use cella_engine::{Algorithm, BigInt, Rule};
use cella_engine_edit::{EditState, UndoState};
use proptest::prelude::*;

fn session() -> EditState {
    EditState::new("prop", Algorithm::Quick, Rule::default()).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn script_span_round_trips(ops in prop::collection::vec((-20i64..20, -20i64..20, 0u8..4), 1..40)) {
        let mut s = session();
        s.script_begin().unwrap();
        for chunk in ops.chunks(5) {
            for &(x, y, state) in chunk {
                s.set_cell(x, y, state);
            }
            s.commit_cell_changes("Draw");
        }
        s.script_end().unwrap();
        let population = s.grid().population();

        s.undo().unwrap();
        prop_assert_eq!(s.grid().population(), 0);

        if s.can_redo() {
            s.redo().unwrap();
            prop_assert_eq!(s.grid().population(), population);
        } else {
            // every write was a dead cell, so the script left no trace
            prop_assert_eq!(population, 0);
        }
    }

    #[test]
    fn scripted_reset_unwinds_the_whole_span(
        seed in prop::collection::vec((-10i64..10, -10i64..10), 3..20),
        steps in 1usize..6,
    ) {
        let mut s = session();
        for &(x, y) in &seed {
            s.set_cell(x, y, 1);
        }
        s.commit_cell_changes("Draw");
        s.declare_start().unwrap();
        let start_population = s.grid().population();

        s.script_begin().unwrap();
        // a script edit followed by a generating run
        s.set_cell(50, 50, 1);
        s.commit_cell_changes("Script Edit");
        s.remember_generation_start().unwrap();
        for _ in 0..steps {
            s.grid_mut().step();
        }
        s.remember_generation_finish().unwrap();
        s.script_end().unwrap();
        prop_assert_eq!(s.grid().generation(), &BigInt::from(steps));

        s.sync_to_generation(&BigInt::from(0)).unwrap();
        prop_assert_eq!(s.grid().generation(), &BigInt::from(0));
        // the script's own edit went with the run
        prop_assert_eq!(s.grid().get_cell(50, 50), 0);
        prop_assert_eq!(s.grid().population(), start_population);
    }

    #[test]
    fn reset_inside_an_open_script_keeps_it_bracketed(
        seed in prop::collection::vec((-10i64..10, -10i64..10), 3..20),
        steps in 1usize..6,
    ) {
        let mut s = session();
        for &(x, y) in &seed {
            s.set_cell(x, y, 1);
        }
        s.commit_cell_changes("Draw");
        s.declare_start().unwrap();
        let start_population = s.grid().population();

        s.script_begin().unwrap();
        s.set_cell(50, 50, 1);
        s.commit_cell_changes("Script Edit");
        s.remember_generation_start().unwrap();
        for _ in 0..steps {
            s.grid_mut().step();
        }
        s.remember_generation_finish().unwrap();

        // the script is still open when the reset comes in
        s.sync_to_generation(&BigInt::from(0)).unwrap();
        prop_assert_eq!(s.grid().generation(), &BigInt::from(0));
        prop_assert_eq!(s.grid().get_cell(50, 50), 0);
        prop_assert_eq!(s.grid().population(), start_population);

        // edits after the reset still land inside the same span
        s.set_cell(60, 60, 1);
        s.commit_cell_changes("Script Edit");
        s.script_end().unwrap();

        s.undo().unwrap();
        prop_assert_eq!(s.grid().get_cell(60, 60), 0);
        prop_assert_eq!(s.grid().population(), start_population);
    }

    #[test]
    fn undo_all_then_redo_all_is_stable(ops in prop::collection::vec((-15i64..15, -15i64..15, 0u8..3), 1..30)) {
        let mut s = session();
        for &(x, y, state) in &ops {
            s.set_cell(x, y, state);
            s.commit_cell_changes("Draw");
        }
        let population = s.grid().population();

        while s.can_undo() {
            s.undo().unwrap();
        }
        prop_assert_eq!(s.grid().population(), 0);

        while s.can_redo() {
            s.redo().unwrap();
        }
        prop_assert_eq!(s.grid().population(), population);
    }
}
