/// One cell's before/after state inside a pending edit.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CellDiff {
    pub x: i64,
    pub y: i64,
    pub old_state: u8,
    pub new_state: u8,
}

const MIN_CAPACITY: usize = 4096;

/// Accumulates cell diffs between `begin`/`commit` brackets of an edit.
/// Growth is doubling via fallible allocation: if memory runs out the
/// buffer raises a sticky flag, drops further diffs and the whole pending
/// edit is forgotten at commit time rather than recorded half-complete.
#[derive(Default)]
pub struct CellDiffBuffer {
    diffs: Vec<CellDiff>,
    lost_changes: bool,
}

impl CellDiffBuffer {
    pub fn record(&mut self, diff: CellDiff) {
        if self.lost_changes {
            return;
        }
        if self.diffs.len() == self.diffs.capacity() {
            let grow = self.diffs.capacity().max(MIN_CAPACITY);
            if self.diffs.try_reserve_exact(grow).is_err() {
                log::warn!("out of memory; some changes can't be undone");
                self.lost_changes = true;
                self.diffs = Vec::new();
                return;
            }
        }
        self.diffs.push(diff);
    }

    pub fn has_changes(&self) -> bool {
        !self.diffs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diffs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diffs.is_empty()
    }

    /// Take the accumulated diffs, or `None` when allocation failure lost
    /// part of them. Either way the buffer is reset for the next edit.
    pub fn commit(&mut self) -> Option<Vec<CellDiff>> {
        let lost = self.lost_changes;
        self.lost_changes = false;
        let mut diffs = std::mem::take(&mut self.diffs);
        if lost {
            return None;
        }
        diffs.shrink_to_fit();
        Some(diffs)
    }

    pub fn forget(&mut self) {
        self.diffs = Vec::new();
        self.lost_changes = false;
    }
}
