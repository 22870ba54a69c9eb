//! Bounded snapshot undo/redo.

use crate::document::CanvasState;
use std::collections::VecDeque;

/// Default number of snapshots kept on each stack.
pub const MAX_UNDO_HISTORY: usize = 100;

/// Two bounded stacks of full document snapshots.
///
/// Snapshots are owned deep copies, so later edits to the live document can
/// never reach into history.
#[derive(Debug, Clone)]
pub struct History {
    undo_stack: VecDeque<CanvasState>,
    redo_stack: VecDeque<CanvasState>,
    capacity: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::with_capacity(MAX_UNDO_HISTORY)
    }
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Record the pre-mutation state. Invalidates redo history.
    pub fn push(&mut self, state: CanvasState) {
        push_bounded(&mut self.undo_stack, state, self.capacity);
        self.redo_stack.clear();
    }

    /// Step back. `current` moves onto the redo stack.
    pub fn undo(&mut self, current: CanvasState) -> Option<CanvasState> {
        let previous = self.undo_stack.pop_back()?;
        push_bounded(&mut self.redo_stack, current, self.capacity);
        Some(previous)
    }

    /// Step forward. `current` moves onto the undo stack.
    pub fn redo(&mut self, current: CanvasState) -> Option<CanvasState> {
        let next = self.redo_stack.pop_back()?;
        push_bounded(&mut self.undo_stack, current, self.capacity);
        Some(next)
    }

    /// Drop the most recent snapshot without touching redo, for aborted operations.
    pub fn discard_last(&mut self) -> Option<CanvasState> {
        self.undo_stack.pop_back()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

fn push_bounded(stack: &mut VecDeque<CanvasState>, state: CanvasState, capacity: usize) {
    stack.push_back(state);
    while stack.len() > capacity {
        stack.pop_front();
    }
}
