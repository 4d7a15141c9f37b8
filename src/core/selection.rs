//! Batch selection store.
//!
//! An ordered, mutable collection of pending files with their previews.
//! Positions are re-derived from current state at every call, so a
//! removal can never act on a stale index, and every entry additionally
//! carries a durable id for position-independent removal.
//!
//! The store is driven by a single thread of control; no locking.

use uuid::Uuid;

use crate::domain::PendingFile;

/// Ordered collection of files queued for one batch run.
#[derive(Debug, Default)]
pub struct BatchSelection {
    entries: Vec<PendingFile>,
}

impl BatchSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, returning its position.
    pub fn add(&mut self, file: PendingFile) -> usize {
        self.entries.push(file);
        self.entries.len() - 1
    }

    /// Remove the entry at `index`, evaluated against current state.
    /// Later entries shift down, so a subsequent `remove_at` acts on the
    /// positions visible after this call.
    pub fn remove_at(&mut self, index: usize) -> Option<PendingFile> {
        if index < self.entries.len() {
            Some(self.entries.remove(index))
        } else {
            None
        }
    }

    /// Remove an entry by its durable id, wherever it currently sits.
    pub fn remove(&mut self, id: Uuid) -> Option<PendingFile> {
        let index = self.entries.iter().position(|e| e.id == id)?;
        Some(self.entries.remove(index))
    }

    /// Drop every entry and its preview.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[PendingFile] {
        &self.entries
    }

    /// Drain all entries in order, leaving the selection empty.
    pub fn take_all(&mut self) -> Vec<PendingFile> {
        std::mem::take(&mut self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str) -> PendingFile {
        PendingFile::new(name, "image/jpeg", vec![0u8; 4], vec![1u8; 2])
    }

    #[test]
    fn test_add_returns_position() {
        let mut selection = BatchSelection::new();
        assert_eq!(selection.add(entry("a.jpg")), 0);
        assert_eq!(selection.add(entry("b.jpg")), 1);
        assert_eq!(selection.len(), 2);
    }

    #[test]
    fn test_remove_at_reindexes() {
        let mut selection = BatchSelection::new();
        selection.add(entry("a.jpg"));
        selection.add(entry("b.jpg"));
        selection.add(entry("c.jpg"));

        let removed = selection.remove_at(0).unwrap();
        assert_eq!(removed.name, "a.jpg");

        // Index 1 now denotes what is visually second: c.jpg.
        let removed = selection.remove_at(1).unwrap();
        assert_eq!(removed.name, "c.jpg");
        assert_eq!(selection.entries()[0].name, "b.jpg");
    }

    #[test]
    fn test_remove_at_out_of_range() {
        let mut selection = BatchSelection::new();
        selection.add(entry("a.jpg"));
        assert!(selection.remove_at(5).is_none());
        assert_eq!(selection.len(), 1);
    }

    #[test]
    fn test_remove_by_id_survives_reordering() {
        let mut selection = BatchSelection::new();
        selection.add(entry("a.jpg"));
        let id_b = {
            let index = selection.add(entry("b.jpg"));
            selection.entries()[index].id
        };
        selection.add(entry("c.jpg"));

        // Mutate before removing by id; the id still hits b.jpg.
        selection.remove_at(0);
        let removed = selection.remove(id_b).unwrap();
        assert_eq!(removed.name, "b.jpg");
        assert_eq!(selection.len(), 1);
    }

    #[test]
    fn test_clear_empties_everything() {
        let mut selection = BatchSelection::new();
        selection.add(entry("a.jpg"));
        selection.add(entry("b.jpg"));
        selection.clear();
        assert!(selection.is_empty());
    }
}
