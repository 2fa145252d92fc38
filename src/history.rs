use std::collections::VecDeque;

use crate::models::Card;

/// Default number of undo steps kept
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

/// Whether the undo and redo commands are currently available
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistoryState {
    pub can_undo: bool,
    pub can_redo: bool,
}

/// Bounded undo/redo stacks of whole-collection snapshots.
///
/// Snapshots are owned `Vec<Card>` values, so later edits to the live
/// collection can never reach them.
#[derive(Debug, Clone)]
pub struct History {
    undo: VecDeque<Vec<Card>>,
    redo: Vec<Vec<Card>>,
    limit: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl History {
    pub fn new(limit: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Push the collection as it was before a change. Any new change
    /// invalidates the redo stack.
    pub fn record(&mut self, before: Vec<Card>) {
        self.undo.push_back(before);
        while self.undo.len() > self.limit {
            self.undo.pop_front();
        }
        self.redo.clear();
    }

    /// Step back: returns the snapshot to restore, stashing `current` for redo.
    pub fn undo(&mut self, current: Vec<Card>) -> Option<Vec<Card>> {
        let previous = self.undo.pop_back()?;
        self.redo.push(current);
        Some(previous)
    }

    /// Step forward again after an undo.
    pub fn redo(&mut self, current: Vec<Card>) -> Option<Vec<Card>> {
        let next = self.redo.pop()?;
        self.undo.push_back(current);
        while self.undo.len() > self.limit {
            self.undo.pop_front();
        }
        Some(next)
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    pub fn state(&self) -> HistoryState {
        HistoryState {
            can_undo: !self.undo.is_empty(),
            can_redo: !self.redo.is_empty(),
        }
    }
}
