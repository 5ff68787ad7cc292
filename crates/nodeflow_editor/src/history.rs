// SPDX-License-Identifier: MIT OR Apache-2.0
//! Undo/redo history of graph edits.
//!
//! Each entry keeps the graph document before and after one committed
//! edit, encoded with bincode.

use nodeflow_graph::GraphDocument;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Default undo history depth
pub const MAX_HISTORY: usize = 100;

/// History errors
#[derive(Debug, Error)]
pub enum HistoryError {
    /// Nothing to undo
    #[error("Nothing to undo")]
    NothingToUndo,

    /// Nothing to redo
    #[error("Nothing to redo")]
    NothingToRedo,

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),
}

/// Result type for history operations
pub type Result<T> = std::result::Result<T, HistoryError>;

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Encoded graph document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Encoded document
    pub data: Vec<u8>,
    /// Timestamp when snapshot was taken
    pub timestamp: u64,
}

impl StateSnapshot {
    /// Encode a document
    pub fn capture(document: &GraphDocument) -> Result<Self> {
        Ok(Self {
            data: bincode::serialize(document)?,
            timestamp: now_secs(),
        })
    }

    /// Decode the document
    pub fn restore(&self) -> Result<GraphDocument> {
        Ok(bincode::deserialize(&self.data)?)
    }

    /// Size in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// One committed edit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Sequence number
    pub id: u64,
    /// Human-readable description
    pub description: String,
    /// Graph before the edit
    pub before: StateSnapshot,
    /// Graph after the edit
    pub after: StateSnapshot,
}

impl HistoryEntry {
    /// Memory used by both snapshots
    pub fn memory_size(&self) -> usize {
        self.before.size() + self.after.size()
    }
}

/// History statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryStats {
    /// Entries in the undo stack
    pub undo_count: usize,
    /// Entries in the redo stack
    pub redo_count: usize,
    /// Bytes held by all snapshots in both stacks
    pub memory_used: usize,
    /// Maximum history depth
    pub max_depth: usize,
}

/// Undo/redo history manager
#[derive(Debug)]
pub struct History {
    undo_stack: VecDeque<HistoryEntry>,
    redo_stack: VecDeque<HistoryEntry>,
    next_id: u64,
    max_depth: usize,
}

impl History {
    /// Create a new history manager
    pub fn new() -> Self {
        Self::with_max_depth(MAX_HISTORY)
    }

    /// Create with custom maximum depth
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            next_id: 1,
            max_depth,
        }
    }

    /// Record a committed edit; clears the redo stack
    pub fn record(
        &mut self,
        description: impl Into<String>,
        before: &GraphDocument,
        after: &GraphDocument,
    ) -> Result<()> {
        let entry = HistoryEntry {
            id: self.next_id,
            description: description.into(),
            before: StateSnapshot::capture(before)?,
            after: StateSnapshot::capture(after)?,
        };
        self.next_id += 1;

        self.redo_stack.clear();
        tracing::debug!("Recorded edit #{}: {}", entry.id, entry.description);
        self.undo_stack.push_back(entry);

        while self.undo_stack.len() > self.max_depth {
            self.undo_stack.pop_front();
        }
        Ok(())
    }

    /// Undo the last edit, returning the document to restore
    pub fn undo(&mut self) -> Result<GraphDocument> {
        let entry = self
            .undo_stack
            .pop_back()
            .ok_or(HistoryError::NothingToUndo)?;
        let document = entry.before.restore()?;
        self.redo_stack.push_back(entry);
        Ok(document)
    }

    /// Redo the last undone edit, returning the document to restore
    pub fn redo(&mut self) -> Result<GraphDocument> {
        let entry = self
            .redo_stack
            .pop_back()
            .ok_or(HistoryError::NothingToRedo)?;
        let document = entry.after.restore()?;
        self.undo_stack.push_back(entry);
        Ok(document)
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Clear all history
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    /// Get history statistics
    pub fn stats(&self) -> HistoryStats {
        HistoryStats {
            undo_count: self.undo_stack.len(),
            redo_count: self.redo_stack.len(),
            memory_used: self
                .undo_stack
                .iter()
                .chain(&self.redo_stack)
                .map(HistoryEntry::memory_size)
                .sum(),
            max_depth: self.max_depth,
        }
    }

    /// Get description of next undo operation
    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.back().map(|e| e.description.as_str())
    }

    /// Get description of next redo operation
    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack.back().map(|e| e.description.as_str())
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodeflow_graph::Graph;

    fn document(name: &str) -> GraphDocument {
        Graph::new(name).to_document()
    }

    #[test]
    fn test_undo_redo() {
        let mut history = History::new();
        history.record("Rename", &document("a"), &document("b")).unwrap();
        assert!(history.can_undo());
        assert_eq!(history.undo_description(), Some("Rename"));

        assert_eq!(history.undo().unwrap().name, "a");
        assert!(history.can_redo());
        assert_eq!(history.redo().unwrap().name, "b");
        assert!(matches!(history.redo(), Err(HistoryError::NothingToRedo)));
    }

    #[test]
    fn test_record_clears_redo() {
        let mut history = History::new();
        history.record("One", &document("a"), &document("b")).unwrap();
        history.undo().unwrap();
        history.record("Two", &document("a"), &document("c")).unwrap();
        assert!(!history.can_redo());
        assert_eq!(history.stats().undo_count, 1);
    }

    #[test]
    fn test_depth_limit() {
        let mut history = History::with_max_depth(2);
        for name in ["a", "b", "c"] {
            history.record(name, &document("x"), &document(name)).unwrap();
        }
        let stats = history.stats();
        assert_eq!(stats.undo_count, 2);
        assert!(stats.memory_used > 0);
        history.undo().unwrap();
        history.undo().unwrap();
        assert!(matches!(history.undo(), Err(HistoryError::NothingToUndo)));
    }
}
