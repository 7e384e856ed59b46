//! Linear undo/redo history of annotation snapshots
//!
//! Every entry holds an independent copy of the full annotation list in image
//! space. Committing after an undo discards the abandoned redo branch.

use serde::{Deserialize, Serialize};

use crate::annotation::{Annotation, AnnotationRecord};
use crate::store::records_to_annotations;

/// Label of the entry every history starts from
pub const INITIAL_LABEL: &str = "Initial";

/// One committed state
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub sequence_id: usize,
    pub label: String,
    pub snapshot: Vec<Annotation>,
}

/// Display projection of an entry, for history panels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryItem {
    pub id: usize,
    pub name: String,
    pub active: bool,
}

/// Serializable form of one entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedEntry {
    pub id: usize,
    pub name: String,
    pub annotations: Vec<AnnotationRecord>,
}

/// Serializable form of the whole stack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryState {
    pub entries: Vec<SavedEntry>,
    pub cursor: usize,
}

#[derive(Debug, Clone)]
pub struct HistoryStack {
    entries: Vec<HistoryEntry>,
    cursor: usize,
}

impl Default for HistoryStack {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryStack {
    /// Create a history holding only the empty initial scene
    pub fn new() -> Self {
        Self {
            entries: vec![Self::initial_entry()],
            cursor: 0,
        }
    }

    fn initial_entry() -> HistoryEntry {
        HistoryEntry {
            sequence_id: 0,
            label: INITIAL_LABEL.to_string(),
            snapshot: Vec::new(),
        }
    }

    /// Commit a snapshot, truncating any redo branch
    pub fn push(&mut self, snapshot: Vec<Annotation>, label: impl Into<String>) {
        if self.cursor + 1 < self.entries.len() {
            self.entries.truncate(self.cursor + 1);
        }
        let label = label.into();
        tracing::debug!(label = %label, sequence_id = self.entries.len(), "history commit");
        self.entries.push(HistoryEntry {
            sequence_id: self.entries.len(),
            label,
            snapshot,
        });
        self.cursor = self.entries.len() - 1;
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    /// Step back one entry, returning its snapshot
    pub fn undo(&mut self) -> Option<Vec<Annotation>> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        Some(self.current().to_vec())
    }

    /// Step forward one entry, returning its snapshot
    pub fn redo(&mut self) -> Option<Vec<Annotation>> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        Some(self.current().to_vec())
    }

    /// Jump to an entry by index. Out-of-range indices are ignored.
    pub fn go_to(&mut self, index: usize) -> Option<Vec<Annotation>> {
        if index >= self.entries.len() {
            return None;
        }
        self.cursor = index;
        Some(self.current().to_vec())
    }

    /// Collapse to the single initial entry
    pub fn reset(&mut self) {
        self.entries.clear();
        self.entries.push(Self::initial_entry());
        self.cursor = 0;
    }

    /// Snapshot at the cursor
    pub fn current(&self) -> &[Annotation] {
        self.entries
            .get(self.cursor)
            .map(|entry| entry.snapshot.as_slice())
            .unwrap_or_default()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Display projection of every entry, marking the active one
    pub fn display(&self) -> Vec<HistoryItem> {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, entry)| HistoryItem {
                id: entry.sequence_id,
                name: entry.label.clone(),
                active: index == self.cursor,
            })
            .collect()
    }

    /// Export the stack for persistence
    pub fn state(&self) -> HistoryState {
        HistoryState {
            entries: self
                .entries
                .iter()
                .map(|entry| SavedEntry {
                    id: entry.sequence_id,
                    name: entry.label.clone(),
                    annotations: entry.snapshot.iter().map(AnnotationRecord::from).collect(),
                })
                .collect(),
            cursor: self.cursor,
        }
    }

    /// Reinstate a persisted stack and return the snapshot at its cursor.
    ///
    /// An empty entry list falls back to the initial scene, and an out-of-range
    /// cursor is clamped to the last entry.
    pub fn restore(&mut self, state: HistoryState) -> Vec<Annotation> {
        if state.entries.is_empty() {
            self.reset();
            return Vec::new();
        }

        self.entries = state
            .entries
            .into_iter()
            .map(|saved| HistoryEntry {
                sequence_id: saved.id,
                label: saved.name,
                snapshot: records_to_annotations(&saved.annotations),
            })
            .collect();
        self.cursor = state.cursor.min(self.entries.len() - 1);
        tracing::debug!(entries = self.entries.len(), cursor = self.cursor, "history restored");
        self.current().to_vec()
    }
}
