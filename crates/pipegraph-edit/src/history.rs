//! Snapshot-based undo/redo.
//!
//! Engines never mutate the snapshot they are given, so history is simply a
//! stack of owned snapshots. [`History`] keeps a bounded linear past, the
//! present value, and a redo future that is discarded on the next commit.

use std::collections::VecDeque;

/// One recorded state and the edit that produced it.
#[derive(Debug, Clone, PartialEq)]
struct Entry<T> {
    value: T,
    description: String,
}

/// Bounded linear undo/redo over snapshots of `T`.
#[derive(Debug, Clone)]
pub struct History<T> {
    past: VecDeque<Entry<T>>,
    present: Entry<T>,
    future: Vec<Entry<T>>,
    limit: usize,
}

impl<T: Clone> History<T> {
    /// Starts a history at `initial`. `limit` bounds the number of undo
    /// steps (at least one is always kept).
    pub fn new(initial: T, limit: usize) -> Self {
        History {
            past: VecDeque::new(),
            present: Entry {
                value: initial,
                description: String::from("open"),
            },
            future: Vec::new(),
            limit: limit.max(1),
        }
    }

    pub fn current(&self) -> &T {
        &self.present.value
    }

    /// Description of the edit that produced the current state.
    pub fn current_description(&self) -> &str {
        &self.present.description
    }

    /// Records `value` as the new present and clears the redo branch.
    pub fn commit(&mut self, value: T, description: impl Into<String>) {
        let previous = std::mem::replace(
            &mut self.present,
            Entry {
                value,
                description: description.into(),
            },
        );
        self.past.push_back(previous);
        while self.past.len() > self.limit {
            self.past.pop_front();
        }
        self.future.clear();
    }

    /// Steps back one edit. Returns the restored state, or `None` when
    /// there is nothing to undo.
    pub fn undo(&mut self) -> Option<&T> {
        let previous = self.past.pop_back()?;
        let undone = std::mem::replace(&mut self.present, previous);
        tracing::debug!(edit = %undone.description, "undo");
        self.future.push(undone);
        Some(&self.present.value)
    }

    /// Re-applies the last undone edit.
    pub fn redo(&mut self) -> Option<&T> {
        let next = self.future.pop()?;
        let previous = std::mem::replace(&mut self.present, next);
        tracing::debug!(edit = %self.present.description, "redo");
        self.past.push_back(previous);
        Some(&self.present.value)
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    /// Descriptions of undoable edits, most recent first.
    pub fn undo_descriptions(&self) -> Vec<&str> {
        if self.past.is_empty() {
            return Vec::new();
        }
        let mut out = vec![self.present.description.as_str()];
        out.extend(
            self.past
                .iter()
                .skip(1)
                .rev()
                .map(|entry| entry.description.as_str()),
        );
        out
    }

    /// Descriptions of redoable edits, next first.
    pub fn redo_descriptions(&self) -> Vec<&str> {
        self.future
            .iter()
            .rev()
            .map(|entry| entry.description.as_str())
            .collect()
    }
}
