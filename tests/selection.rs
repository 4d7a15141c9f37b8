//! Batch Selection Integration Tests
//!
//! Index-stability properties: removal always acts on the entry that is
//! visually indicated at the time of the call, never on a stale
//! position.

use inklet::core::BatchSelection;
use inklet::domain::PendingFile;

fn entry(name: &str) -> PendingFile {
    PendingFile::new(name, "image/jpeg", vec![0u8; 8], vec![0u8; 2])
}

fn names(selection: &BatchSelection) -> Vec<&str> {
    selection.entries().iter().map(|e| e.name.as_str()).collect()
}

#[test]
fn test_sequential_index_removals_hit_visible_entries() {
    let mut selection = BatchSelection::new();
    for name in ["a.jpg", "b.jpg", "c.jpg", "d.jpg"] {
        selection.add(entry(name));
    }

    // Remove index 1 (b); afterwards index 1 denotes c, index 2 denotes d.
    assert_eq!(selection.remove_at(1).unwrap().name, "b.jpg");
    assert_eq!(names(&selection), vec!["a.jpg", "c.jpg", "d.jpg"]);

    // A second removal by index is evaluated against post-removal state.
    assert_eq!(selection.remove_at(2).unwrap().name, "d.jpg");
    assert_eq!(names(&selection), vec!["a.jpg", "c.jpg"]);
}

#[test]
fn test_stale_index_cannot_delete_wrong_entry() {
    let mut selection = BatchSelection::new();
    selection.add(entry("a.jpg"));
    let stale_index = selection.add(entry("b.jpg"));

    // The entry at the captured index is removed by someone else first.
    selection.remove_at(0);

    // Replaying the stale index must not silently delete another entry:
    // position 1 no longer exists after the shift.
    assert!(selection.remove_at(stale_index).is_none());
    assert_eq!(names(&selection), vec!["b.jpg"]);
}

#[test]
fn test_durable_id_removal_is_position_independent() {
    let mut selection = BatchSelection::new();
    selection.add(entry("a.jpg"));
    let index = selection.add(entry("b.jpg"));
    let id = selection.entries()[index].id;
    selection.add(entry("c.jpg"));

    // Arbitrary mutation before the id-based removal fires.
    selection.remove_at(0);
    selection.add(entry("d.jpg"));

    let removed = selection.remove(id).unwrap();
    assert_eq!(removed.name, "b.jpg");
    assert_eq!(names(&selection), vec!["c.jpg", "d.jpg"]);
}

#[test]
fn test_previews_stay_one_to_one_with_entries() {
    let mut selection = BatchSelection::new();
    selection.add(entry("a.jpg"));
    selection.add(entry("b.jpg"));

    // Every held entry carries its preview; removal drops both together.
    assert!(selection.entries().iter().all(|e| !e.preview.is_empty()));
    selection.remove_at(0);
    assert_eq!(selection.len(), 1);
    assert!(selection.entries().iter().all(|e| !e.preview.is_empty()));

    selection.clear();
    assert!(selection.is_empty());
}
