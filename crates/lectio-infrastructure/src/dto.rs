//! Wire DTOs for the hosted-backend boundary.
//!
//! The remote store owns the row schema; these structs mirror it exactly
//! and convert to/from the domain models. Domain code never sees a raw
//! row.

use chrono::{DateTime, Utc};
use lectio_core::auth::{AuthUser, UserId};
use lectio_core::verse::{Verse, VerseDraft, VerseId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User object returned by the identity endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct UserPayload {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

impl UserPayload {
    /// Converts the wire payload to the domain identity.
    pub fn into_domain(self) -> AuthUser {
        AuthUser {
            id: UserId(self.id),
            email: self.email,
        }
    }
}

/// A row of the `verses` table as the store returns it.
#[derive(Debug, Clone, Deserialize)]
pub struct VerseRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub book: String,
    pub chapter: u32,
    pub verse_number: u32,
    #[serde(default)]
    pub page_number: Option<u32>,
    pub original_text: String,
    #[serde(default)]
    pub translation: Option<String>,
    #[serde(default)]
    pub reflection: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VerseRow {
    /// Converts the wire row to the domain model.
    pub fn into_domain(self) -> Verse {
        Verse {
            id: VerseId(self.id),
            user_id: UserId(self.user_id),
            book: self.book,
            chapter: self.chapter,
            verse_number: self.verse_number,
            page_number: self.page_number,
            original_text: self.original_text,
            translation: self.translation.unwrap_or_default(),
            reflection: self.reflection,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Insert payload. The store assigns `id`, `created_at` and
/// `updated_at`.
#[derive(Debug, Clone, Serialize)]
pub struct InsertVerseRow {
    pub user_id: Uuid,
    pub book: String,
    pub chapter: u32,
    pub verse_number: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
    pub original_text: String,
    pub translation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reflection: Option<String>,
}

impl InsertVerseRow {
    /// Builds an insert payload from a validated draft and its owner.
    pub fn from_draft(draft: &VerseDraft, owner: &UserId) -> Self {
        Self {
            user_id: owner.0,
            book: draft.book.clone(),
            chapter: draft.chapter,
            verse_number: draft.verse_number,
            page_number: draft.page_number,
            original_text: draft.original_text.clone(),
            translation: draft.translation.clone(),
            reflection: draft.reflection.clone(),
        }
    }
}

/// Update payload. Deliberately has no `user_id`: the owner field can
/// never change through an update, only the row filter names it.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateVerseRow {
    pub book: String,
    pub chapter: u32,
    pub verse_number: u32,
    pub page_number: Option<u32>,
    pub original_text: String,
    pub translation: String,
    pub reflection: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl UpdateVerseRow {
    /// Builds an update payload from a validated draft, refreshing the
    /// updated timestamp. `page_number`/`reflection` are serialized even
    /// when `None` so clearing a field sticks.
    pub fn from_draft(draft: &VerseDraft) -> Self {
        Self {
            book: draft.book.clone(),
            chapter: draft.chapter,
            verse_number: draft.verse_number,
            page_number: draft.page_number,
            original_text: draft.original_text.clone(),
            translation: draft.translation.clone(),
            reflection: draft.reflection.clone(),
            updated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_ROW: &str = r#"{
        "id": "6f2a7a6e-0a3e-4a8e-bb1f-0ef3a1c1a111",
        "user_id": "2b8c1d8e-9f00-4f6a-8a3e-5d4c3b2a1000",
        "book": "John",
        "chapter": 3,
        "verse_number": 16,
        "page_number": null,
        "original_text": "For God so loved the world...",
        "translation": "Porque de tal manera...",
        "reflection": null,
        "created_at": "2024-05-01T10:00:00Z",
        "updated_at": "2024-05-01T10:00:00Z"
    }"#;

    #[test]
    fn test_verse_row_into_domain() {
        let row: VerseRow = serde_json::from_str(SAMPLE_ROW).unwrap();
        let verse = row.into_domain();

        assert_eq!(verse.book, "John");
        assert_eq!(verse.chapter, 3);
        assert_eq!(verse.verse_number, 16);
        assert_eq!(verse.page_number, None);
        assert_eq!(verse.reference(), "John 3:16");
        assert_eq!(verse.created_at, verse.updated_at);
    }

    #[test]
    fn test_verse_row_tolerates_missing_optional_fields() {
        // Older rows may predate the translation/reflection columns.
        let row: VerseRow = serde_json::from_str(
            r#"{
                "id": "6f2a7a6e-0a3e-4a8e-bb1f-0ef3a1c1a111",
                "user_id": "2b8c1d8e-9f00-4f6a-8a3e-5d4c3b2a1000",
                "book": "Psalms",
                "chapter": 23,
                "verse_number": 1,
                "original_text": "The Lord is my shepherd",
                "created_at": "2024-05-01T10:00:00Z",
                "updated_at": "2024-05-01T10:00:00Z"
            }"#,
        )
        .unwrap();

        let verse = row.into_domain();
        assert_eq!(verse.translation, "");
        assert_eq!(verse.reflection, None);
    }

    #[test]
    fn test_insert_row_carries_owner_and_no_id() {
        let owner = UserId(Uuid::new_v4());
        let draft = VerseDraft {
            id: None,
            book: "John".to_string(),
            chapter: 3,
            verse_number: 16,
            page_number: None,
            original_text: "...".to_string(),
            translation: String::new(),
            reflection: None,
        };

        let row = InsertVerseRow::from_draft(&draft, &owner);
        let json = serde_json::to_value(&row).unwrap();

        assert_eq!(json["user_id"], serde_json::json!(owner.0));
        // Store-assigned fields are absent from the payload
        assert!(json.get("id").is_none());
        assert!(json.get("created_at").is_none());
        assert!(json.get("page_number").is_none());
    }

    #[test]
    fn test_update_row_has_no_owner_field() {
        let draft = VerseDraft {
            id: Some(VerseId(Uuid::new_v4())),
            book: "John".to_string(),
            chapter: 3,
            verse_number: 16,
            page_number: Some(2),
            original_text: "...".to_string(),
            translation: String::new(),
            reflection: Some("updated thought".to_string()),
        };

        let json = serde_json::to_value(UpdateVerseRow::from_draft(&draft)).unwrap();
        assert!(json.get("user_id").is_none());
        assert!(json.get("updated_at").is_some());
        assert_eq!(json["reflection"], "updated thought");
    }
}
