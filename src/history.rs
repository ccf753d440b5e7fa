use std::collections::VecDeque;

use crate::volume::LabelVolume;

/// Undo/redo depth. Older snapshots are dropped.
pub const HISTORY_DEPTH: usize = 5;

/// Bounded undo and redo stacks of full label-volume snapshots.
#[derive(Debug, Default, Clone)]
pub struct EditHistory {
    undo: VecDeque<LabelVolume>,
    redo: VecDeque<LabelVolume>,
}

fn push_bounded(stack: &mut VecDeque<LabelVolume>, snapshot: LabelVolume) {
    if stack.len() == HISTORY_DEPTH {
        stack.pop_front();
    }
    stack.push_back(snapshot);
}

impl EditHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the state before a new edit. Invalidates everything redoable.
    pub fn record(&mut self, before: LabelVolume) {
        push_bounded(&mut self.undo, before);
        self.redo.clear();
    }

    /// Trade `current` for the most recent undo snapshot.
    pub fn undo(&mut self, current: &mut LabelVolume) -> bool {
        let Some(previous) = self.undo.pop_back() else {
            return false;
        };
        push_bounded(&mut self.redo, std::mem::replace(current, previous));
        true
    }

    /// Drop redoable states without recording a snapshot, for edits that
    /// continue an already recorded step.
    pub fn clear_redo(&mut self) {
        self.redo.clear();
    }

    pub fn redo(&mut self, current: &mut LabelVolume) -> bool {
        let Some(next) = self.redo.pop_back() else {
            return false;
        };
        push_bounded(&mut self.undo, std::mem::replace(current, next));
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn filled(value: u8) -> LabelVolume {
        LabelVolume::from_array(Array3::from_elem((2, 2, 2), value))
    }

    #[test]
    fn undo_and_redo_swap_snapshots() {
        let mut history = EditHistory::new();
        let mut current = filled(0);
        history.record(current.clone());
        current = filled(1);

        assert!(history.undo(&mut current));
        assert_eq!(current, filled(0));
        assert!(!history.undo(&mut current));

        assert!(history.redo(&mut current));
        assert_eq!(current, filled(1));
        assert!(!history.redo(&mut current));
    }

    #[test]
    fn depth_is_bounded() {
        let mut history = EditHistory::new();
        let mut current = filled(0);
        for value in 1..=8 {
            history.record(current.clone());
            current = filled(value);
        }
        assert_eq!(history.undo_depth(), HISTORY_DEPTH);

        let mut undone = 0;
        while history.undo(&mut current) {
            undone += 1;
        }
        assert_eq!(undone, HISTORY_DEPTH);
        // snapshots before the fifth-newest are gone
        assert_eq!(current, filled(3));
    }

    #[test]
    fn new_edit_clears_redo() {
        let mut history = EditHistory::new();
        let mut current = filled(0);
        history.record(current.clone());
        current = filled(1);
        assert!(history.undo(&mut current));
        assert!(history.can_redo());

        history.record(current.clone());
        assert!(!history.can_redo());
        assert!(!history.redo(&mut current));
    }

    #[test]
    fn clearing_redo_keeps_undo() {
        let mut history = EditHistory::new();
        let mut current = filled(0);
        history.record(current.clone());
        current = filled(1);
        history.record(current.clone());
        current = filled(2);
        assert!(history.undo(&mut current));

        history.clear_redo();
        assert!(!history.can_redo());
        assert_eq!(history.undo_depth(), 1);
        assert!(history.undo(&mut current));
        assert_eq!(current, filled(0));
    }
}
