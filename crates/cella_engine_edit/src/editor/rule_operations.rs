use cella_engine::{Algorithm, EngineResult, Rule};

use super::{CellDiff, EditState, GridUndoOp};

impl EditState {
    /// Switch to another rule. Cells above the new rule's state range are
    /// clipped and the clipping travels with the record so undo restores
    /// them.
    pub fn set_rule(&mut self, rule: Rule) -> EngineResult<()> {
        let old_rule = self.sim.rule().clone();
        if old_rule == rule {
            return Ok(());
        }
        let diffs = self.clip_states(rule.states() - 1);
        self.sim.set_rule(rule.clone());
        self.push_record(
            GridUndoOp::RuleChange {
                old_rule,
                new_rule: rule,
                diffs,
            },
            "Rule Change",
        );
        Ok(())
    }

    /// Switch the simulation backend, clipping states it cannot hold.
    pub fn set_algorithm(&mut self, algorithm: Algorithm) -> EngineResult<()> {
        let old_algorithm = self.sim.algorithm();
        if old_algorithm == algorithm {
            return Ok(());
        }
        let diffs = self.clip_states(algorithm.max_state());
        self.sim.set_algorithm(algorithm);
        self.push_record(
            GridUndoOp::AlgoChange {
                old_algorithm,
                new_algorithm: algorithm,
                diffs,
            },
            "Algorithm Change",
        );
        Ok(())
    }

    fn clip_states(&mut self, max_state: u8) -> Vec<CellDiff> {
        let over: Vec<(i64, i64, u8)> = self.sim.cells().filter(|&(_, _, state)| state > max_state).collect();
        let mut diffs = Vec::with_capacity(over.len());
        for (x, y, old_state) in over {
            self.sim.set_cell(x, y, max_state);
            diffs.push(CellDiff {
                x,
                y,
                old_state,
                new_state: max_state,
            });
        }
        diffs
    }
}
