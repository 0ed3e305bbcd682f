//! Bounded undo/redo snapshots

/// Generic snapshot stack: a bounded past and a redo side that clears on every
/// new edit. Callers pass the present value in and get the replacement out.
#[derive(Debug, Clone)]
pub struct History<T: Clone> {
    past: Vec<T>,
    future: Vec<T>,
}

impl<T: Clone> History<T> {
    /// Snapshots beyond this depth drop off the old end
    pub const DEPTH: usize = 20;

    pub fn new() -> Self {
        Self {
            past: Vec::new(),
            future: Vec::new(),
        }
    }

    /// Record the present value before an edit
    pub fn push(&mut self, present: T) {
        self.past.push(present);
        if self.past.len() > Self::DEPTH {
            self.past.remove(0);
        }
        self.future.clear();
    }

    /// Exchange the present value for the most recent snapshot
    pub fn undo(&mut self, present: T) -> Option<T> {
        let previous = self.past.pop()?;
        self.future.insert(0, present);
        Some(previous)
    }

    /// Exchange the present value for the next undone snapshot
    pub fn redo(&mut self, present: T) -> Option<T> {
        if self.future.is_empty() {
            return None;
        }
        let next = self.future.remove(0);
        self.past.push(present);
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
    }
}

impl<T: Clone> Default for History<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undo_redo_round_trip() {
        let mut history = History::new();
        history.push(1);
        history.push(2);

        assert_eq!(history.undo(3), Some(2));
        assert_eq!(history.undo(2), Some(1));
        assert_eq!(history.undo(1), None);

        assert_eq!(history.redo(1), Some(2));
        assert_eq!(history.redo(2), Some(3));
        assert_eq!(history.redo(3), None);
    }

    #[test]
    fn new_edit_clears_the_redo_side() {
        let mut history = History::new();
        history.push(1);
        assert_eq!(history.undo(2), Some(1));
        assert!(history.can_redo());

        history.push(1);
        assert!(!history.can_redo());
    }

    #[test]
    fn depth_is_bounded() {
        let mut history = History::new();
        for i in 0..History::<i32>::DEPTH + 5 {
            history.push(i as i32);
        }

        let mut undone = 0;
        let mut present = -1;
        while let Some(value) = history.undo(present) {
            present = value;
            undone += 1;
        }
        assert_eq!(undone, History::<i32>::DEPTH);
        // The oldest surviving snapshot is the 6th push
        assert_eq!(present, 5);
    }
}
