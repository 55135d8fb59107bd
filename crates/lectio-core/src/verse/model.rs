//! Verse record domain model.
//!
//! A verse record holds a scripture reference (book, chapter, verse
//! number, optional page number), the original text, a translation, and
//! an optional personal reflection. Records are owned by the remote
//! store and scoped to the user that created them.

use crate::auth::UserId;
use crate::error::{LectioError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Store-assigned identifier for a verse record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VerseId(pub Uuid);

impl fmt::Display for VerseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A persisted verse record.
///
/// Invariant: `user_id` equals the identity of the session that created
/// the record; every read/update/delete is filtered by both `id` and
/// `user_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verse {
    pub id: VerseId,
    pub user_id: UserId,
    pub book: String,
    pub chapter: u32,
    pub verse_number: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
    pub original_text: String,
    #[serde(default)]
    pub translation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reflection: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Verse {
    /// Human-readable reference, e.g. "John 3:16".
    pub fn reference(&self) -> String {
        format!("{} {}:{}", self.book, self.chapter, self.verse_number)
    }

    /// Case-insensitive search over the derived reference and the text
    /// fields. Optional fields that are absent simply do not match.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        if query.is_empty() {
            return true;
        }
        self.reference().to_lowercase().contains(&query)
            || self.original_text.to_lowercase().contains(&query)
            || self.translation.to_lowercase().contains(&query)
            || self
                .reflection
                .as_ref()
                .is_some_and(|r| r.to_lowercase().contains(&query))
    }
}

/// Form payload for creating or editing a verse record.
///
/// `id` is `None` for a new record; the store assigns the identifier and
/// the creation timestamp on insert.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VerseDraft {
    pub id: Option<VerseId>,
    pub book: String,
    pub chapter: u32,
    pub verse_number: u32,
    pub page_number: Option<u32>,
    pub original_text: String,
    #[serde(default)]
    pub translation: String,
    pub reflection: Option<String>,
}

impl VerseDraft {
    /// Validates required fields before any remote call is issued.
    ///
    /// # Errors
    ///
    /// Returns `LectioError::Validation` naming the first offending
    /// field.
    pub fn validate(&self) -> Result<()> {
        if self.book.trim().is_empty() {
            return Err(LectioError::validation("book is required"));
        }
        if self.chapter < 1 {
            return Err(LectioError::validation("chapter must be at least 1"));
        }
        if self.verse_number < 1 {
            return Err(LectioError::validation("verse number must be at least 1"));
        }
        if let Some(page) = self.page_number {
            if page < 1 {
                return Err(LectioError::validation("page number must be at least 1"));
            }
        }
        if self.original_text.trim().is_empty() {
            return Err(LectioError::validation("original text is required"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn valid_draft() -> VerseDraft {
        VerseDraft {
            id: None,
            book: "John".to_string(),
            chapter: 3,
            verse_number: 16,
            page_number: None,
            original_text: "For God so loved the world...".to_string(),
            translation: String::new(),
            reflection: None,
        }
    }

    fn test_verse() -> Verse {
        Verse {
            id: VerseId(Uuid::new_v4()),
            user_id: UserId(Uuid::new_v4()),
            book: "John".to_string(),
            chapter: 3,
            verse_number: 16,
            page_number: Some(12),
            original_text: "For God so loved the world...".to_string(),
            translation: "Porque de tal manera amó Dios al mundo...".to_string(),
            reflection: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_valid_draft_passes() {
        assert!(valid_draft().validate().is_ok());
    }

    #[test]
    fn test_blank_book_rejected() {
        let mut draft = valid_draft();
        draft.book = "   ".to_string();
        let err = draft.validate().unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_zero_chapter_rejected() {
        let mut draft = valid_draft();
        draft.chapter = 0;
        assert!(draft.validate().unwrap_err().is_validation());
    }

    #[test]
    fn test_zero_verse_number_rejected() {
        let mut draft = valid_draft();
        draft.verse_number = 0;
        assert!(draft.validate().unwrap_err().is_validation());
    }

    #[test]
    fn test_blank_original_text_rejected() {
        let mut draft = valid_draft();
        draft.original_text = String::new();
        assert!(draft.validate().unwrap_err().is_validation());
    }

    #[test]
    fn test_reference_format() {
        assert_eq!(test_verse().reference(), "John 3:16");
    }

    #[test]
    fn test_matches_reference_and_text() {
        let verse = test_verse();
        assert!(verse.matches("john 3"));
        assert!(verse.matches("loved the world"));
        assert!(verse.matches("amó dios"));
        assert!(!verse.matches("psalm"));
    }

    #[test]
    fn test_matches_skips_absent_reflection() {
        let verse = test_verse();
        // reflection is None; the query must not match through it
        assert!(!verse.matches("grace"));

        let mut with_reflection = verse;
        with_reflection.reflection = Some("A note about grace".to_string());
        assert!(with_reflection.matches("grace"));
    }

    #[test]
    fn test_empty_query_matches_everything() {
        assert!(test_verse().matches(""));
    }
}
