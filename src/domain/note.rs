//! Note records and the create payload.
//!
//! The remote store is the single source of truth for notes. The client
//! only ever holds transient, read-only copies for rendering; records are
//! created once and deleted by explicit user action, never mutated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Category assigned to a note by the vision model.
///
/// The vocabulary is open: anything outside the known set renders and
/// persists as "unknown".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Prayer,
    Quote,
    Lesson,
    #[default]
    Unknown,
}

impl Category {
    /// Map a keyword from the model or the store onto the vocabulary.
    pub fn from_keyword(keyword: &str) -> Self {
        match keyword.trim().to_ascii_lowercase().as_str() {
            "prayer" => Self::Prayer,
            "quote" => Self::Quote,
            "lesson" => Self::Lesson,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Prayer => "prayer",
            Self::Quote => "quote",
            Self::Lesson => "lesson",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted note record as returned by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    /// Store-assigned identifier, kept opaque so integer and uuid
    /// primary keys both work.
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,

    /// Markdown-bearing transcription text.
    pub content: String,

    /// Category, defaulting to unknown for anything outside the vocabulary.
    #[serde(rename = "type", default, deserialize_with = "deserialize_category")]
    pub category: Category,

    /// Year mentioned in the note, if any.
    #[serde(default, deserialize_with = "deserialize_year")]
    pub year: Option<i32>,

    /// Public URL of the uploaded source image, if one was stored.
    #[serde(default)]
    pub image_url: Option<String>,

    /// Store-assigned creation time; display only, the store's ordering
    /// is authoritative.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Payload for creating a note, with defaults already applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoteDraft {
    pub content: String,
    #[serde(rename = "type")]
    pub category: Category,
    pub year: Option<i32>,
    pub image_url: Option<String>,
}

impl NoteDraft {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            category: Category::Unknown,
            year: None,
            image_url: None,
        }
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    pub fn with_year(mut self, year: Option<i32>) -> Self {
        self.year = year;
        self
    }

    pub fn with_image_url(mut self, image_url: Option<String>) -> Self {
        self.image_url = image_url;
        self
    }
}

/// Accept integer or string identifiers from the wire.
fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "note id must be a string or number, got {}",
            other
        ))),
    }
}

/// Accept any of null / missing / non-string values for the category,
/// collapsing everything unknown to `Category::Unknown`.
pub(crate) fn deserialize_category<'de, D>(deserializer: D) -> Result<Category, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value
        .as_str()
        .map(Category::from_keyword)
        .unwrap_or_default())
}

/// Coerce the year to an integer or null: accepts integers, floats,
/// and numeric strings; everything else becomes null.
pub(crate) fn deserialize_year<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let year = match value {
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(|y| i32::try_from(y).ok()),
        serde_json::Value::String(s) => s.trim().parse::<i32>().ok(),
        _ => None,
    };
    Ok(year)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_keywords() {
        assert_eq!(Category::from_keyword("quote"), Category::Quote);
        assert_eq!(Category::from_keyword(" Prayer "), Category::Prayer);
        assert_eq!(Category::from_keyword("recipe"), Category::Unknown);
        assert_eq!(Category::from_keyword(""), Category::Unknown);
    }

    #[test]
    fn test_draft_serializes_with_explicit_nulls() {
        let draft = NoteDraft::new("Be still");
        let value = serde_json::to_value(&draft).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "content": "Be still",
                "type": "unknown",
                "year": null,
                "image_url": null,
            })
        );
    }

    #[test]
    fn test_note_from_store_row() {
        let raw = r##"{
            "id": 42,
            "content": "# Sunday\n\n> Be **still**",
            "type": "lesson",
            "year": "1999",
            "image_url": null,
            "created_at": "2024-01-15T10:30:00+00:00"
        }"##;
        let note: Note = serde_json::from_str(raw).unwrap();
        assert_eq!(note.id, "42");
        assert_eq!(note.category, Category::Lesson);
        assert_eq!(note.year, Some(1999));
        assert!(note.image_url.is_none());
        assert!(note.created_at.is_some());
    }

    #[test]
    fn test_note_with_uuid_id_and_null_fields() {
        let raw = r#"{
            "id": "b1946ac9-4c1a-4e68-9f6d-0f2d0f2d0f2d",
            "content": "plain",
            "type": null,
            "year": null
        }"#;
        let note: Note = serde_json::from_str(raw).unwrap();
        assert_eq!(note.id, "b1946ac9-4c1a-4e68-9f6d-0f2d0f2d0f2d");
        assert_eq!(note.category, Category::Unknown);
        assert_eq!(note.year, None);
    }

    #[test]
    fn test_year_coercion_rejects_garbage() {
        let raw = r#"{"id": 1, "content": "x", "type": "quote", "year": "about 1950"}"#;
        let note: Note = serde_json::from_str(raw).unwrap();
        assert_eq!(note.year, None);
    }
}
