//! Note list rendering for the terminal.
//!
//! Notes arrive already sorted newest-first by the store; they are
//! rendered in the order received, never re-sorted. Each card shows the
//! styled content, category/year badges, the linked image URL if one
//! exists, and the note id that the `delete` and `read` commands take.

use crossterm::style::Stylize;

use crate::domain::Note;

use super::markdown;

const RULE_WIDTH: usize = 64;

/// Render one note as a card.
pub fn render_note(note: &Note) -> String {
    let mut out = String::new();

    let when = note
        .created_at
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default();
    out.push_str(&"─".repeat(RULE_WIDTH));
    out.push('\n');
    out.push_str(&format!("{}  {}\n\n", note.id.as_str().dark_grey(), when));

    out.push_str(markdown::styled(&note.content).trim_end());
    out.push('\n');

    let mut badges = format!("[{}]", note.category);
    if let Some(year) = note.year {
        badges.push_str(&format!(" [{}]", year));
    }
    out.push('\n');
    out.push_str(&badges);
    out.push('\n');

    if let Some(url) = &note.image_url {
        out.push_str(&format!("image: {}\n", url));
    }

    out
}

/// Render the full list in store order (newest first).
pub fn render_notes(notes: &[Note]) -> String {
    let mut out = String::new();
    for note in notes {
        out.push_str(&render_note(note));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Category;

    fn note(id: &str, content: &str, year: Option<i32>) -> Note {
        Note {
            id: id.to_string(),
            content: content.to_string(),
            category: Category::Quote,
            year,
            image_url: None,
            created_at: None,
        }
    }

    #[test]
    fn test_card_contains_id_content_and_badges() {
        let out = render_note(&note("41", "Be still", Some(1999)));
        assert!(out.contains("41"));
        assert!(out.contains("Be still"));
        assert!(out.contains("[quote]"));
        assert!(out.contains("[1999]"));
    }

    #[test]
    fn test_year_badge_omitted_when_absent() {
        let out = render_note(&note("41", "x", None));
        assert!(!out.contains("[1999]"));
        assert!(out.contains("[quote]"));
    }

    #[test]
    fn test_image_url_line() {
        let mut n = note("7", "x", None);
        n.image_url = Some("https://example/img.jpg".to_string());
        let out = render_note(&n);
        assert!(out.contains("image: https://example/img.jpg"));
    }

    #[test]
    fn test_list_preserves_store_order() {
        let notes = vec![note("2", "newest", None), note("1", "older", None)];
        let out = render_notes(&notes);
        let newest = out.find("newest").unwrap();
        let older = out.find("older").unwrap();
        assert!(newest < older);
    }
}
