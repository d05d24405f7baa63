use std::collections::HashMap;

use num_bigint::BigInt;

use crate::{Algorithm, Rect, Rule};

/// A sparse, unbounded universe of cells plus the state needed to step it.
/// Cell state 0 is "dead" and is never stored.
#[derive(Clone, Debug, Default)]
pub struct CellGrid {
    cells: HashMap<(i64, i64), u8>,
    generation: BigInt,
    rule: Rule,
    algorithm: Algorithm,
    // None = unknown, recomputed on demand
    bounds: Option<Option<Rect>>,
}

impl CellGrid {
    pub fn new(algorithm: Algorithm, rule: Rule) -> Self {
        Self {
            algorithm,
            rule,
            ..Default::default()
        }
    }

    /// Set one cell and return its previous state. States above the
    /// backend's maximum are clipped.
    pub fn set_cell(&mut self, x: i64, y: i64, state: u8) -> u8 {
        let state = state.min(self.algorithm.max_state());
        let old = if state == 0 {
            self.cells.remove(&(x, y)).unwrap_or(0)
        } else {
            self.cells.insert((x, y), state).unwrap_or(0)
        };
        if old != state {
            self.bounds = None;
        }
        old
    }

    pub fn get_cell(&self, x: i64, y: i64) -> u8 {
        self.cells.get(&(x, y)).copied().unwrap_or(0)
    }

    pub fn population(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells(&self) -> impl Iterator<Item = (i64, i64, u8)> + '_ {
        self.cells.iter().map(|(&(x, y), &s)| (x, y, s))
    }

    pub fn clear(&mut self) {
        self.cells.clear();
        self.bounds = Some(None);
    }

    /// Mark a batch of cell changes complete and refresh the bounds cache.
    pub fn end_of_pattern(&mut self) {
        self.bounds = None;
        self.find_bounds();
    }

    /// Bounding box of all live cells, or `None` for an empty universe.
    /// Cached until the next cell change.
    pub fn find_bounds(&mut self) -> Option<Rect> {
        if let Some(cached) = self.bounds {
            return cached;
        }
        let mut iter = self.cells.keys();
        let bounds = iter.next().map(|&(x, y)| {
            let mut r = Rect::cell(x, y);
            for &(x, y) in iter {
                r.include(x, y);
            }
            r
        });
        self.bounds = Some(bounds);
        bounds
    }

    pub fn generation(&self) -> &BigInt {
        &self.generation
    }

    pub fn set_generation(&mut self, generation: BigInt) {
        self.generation = generation;
    }

    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    pub fn set_rule(&mut self, rule: Rule) {
        self.rule = rule;
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn set_algorithm(&mut self, algorithm: Algorithm) {
        self.algorithm = algorithm;
    }

    /// Advance the universe by one tick. Multi-state rules decay nonzero
    /// cells toward death Generations-style; two-state rules follow plain
    /// birth/survival counting.
    pub fn step(&mut self) {
        let mut neighbors: HashMap<(i64, i64), usize> = HashMap::new();
        for (&(x, y), &state) in &self.cells {
            if state != 1 {
                continue;
            }
            for dy in -1..=1 {
                for dx in -1..=1 {
                    if dx != 0 || dy != 0 {
                        *neighbors.entry((x + dx, y + dy)).or_insert(0) += 1;
                    }
                }
            }
        }

        let states = self.rule.states();
        let mut next: HashMap<(i64, i64), u8> = HashMap::new();
        for (&pos, &count) in &neighbors {
            let state = self.cells.get(&pos).copied().unwrap_or(0);
            if state == 0 && self.rule.is_birth(count) {
                next.insert(pos, 1);
            } else if state == 1 && self.rule.is_survival(count) {
                next.insert(pos, 1);
            }
        }
        // dying cells age out over the extra states
        if states > 2 {
            for (&pos, &state) in &self.cells {
                if next.contains_key(&pos) {
                    continue;
                }
                let aged = if state == 1 { 2 } else { state.saturating_add(1) };
                if aged < states {
                    next.insert(pos, aged);
                }
            }
        }

        self.cells = next;
        self.bounds = None;
        self.generation += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;
    use pretty_assertions::assert_eq;

    fn life() -> CellGrid {
        CellGrid::new(Algorithm::Quick, Rule::default())
    }

    #[test]
    fn set_cell_reports_old_state_and_drops_zeros() {
        let mut g = life();
        assert_eq!(g.set_cell(2, 3, 1), 0);
        assert_eq!(g.set_cell(2, 3, 0), 1);
        assert_eq!(g.population(), 0);
    }

    #[test]
    fn hash_backend_clips_states() {
        let mut g = CellGrid::new(Algorithm::Hash, Rule::default());
        g.set_cell(0, 0, 7);
        assert_eq!(g.get_cell(0, 0), 1);
    }

    #[test]
    fn bounds_track_changes() {
        let mut g = life();
        assert_eq!(g.find_bounds(), None);
        g.set_cell(-4, 2, 1);
        g.set_cell(9, -1, 1);
        assert_eq!(g.find_bounds(), Some(Rect::new(-4, -1, 9, 2)));
        g.set_cell(9, -1, 0);
        assert_eq!(g.find_bounds(), Some(Rect::cell(-4, 2)));
    }

    #[test]
    fn blinker_oscillates() {
        let mut g = life();
        for x in 0..3 {
            g.set_cell(x, 0, 1);
        }
        g.step();
        assert_eq!(g.generation(), &BigInt::from(1));
        assert_eq!(g.get_cell(1, -1), 1);
        assert_eq!(g.get_cell(1, 0), 1);
        assert_eq!(g.get_cell(1, 1), 1);
        assert_eq!(g.population(), 3);
        g.step();
        for x in 0..3 {
            assert_eq!(g.get_cell(x, 0), 1);
        }
    }
}
