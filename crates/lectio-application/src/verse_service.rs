//! Verse use cases.
//!
//! `VerseService` resolves the owner from the session state, validates
//! drafts before any remote call, and delegates to the repository. Every
//! operation requires a signed-in session; calling without one yields
//! `LectioError::Unauthenticated` rather than reaching the store.

use crate::session_service::SessionService;
use lectio_core::auth::UserId;
use lectio_core::error::{LectioError, Result};
use lectio_core::verse::{Verse, VerseDraft, VerseId, VerseRepository};
use std::sync::Arc;

/// Use cases over the owner-scoped verse table.
pub struct VerseService {
    /// Remote record store boundary
    repository: Arc<dyn VerseRepository>,
    /// Session state, for owner resolution
    session: Arc<SessionService>,
}

impl VerseService {
    /// Creates a new `VerseService`.
    pub fn new(repository: Arc<dyn VerseRepository>, session: Arc<SessionService>) -> Self {
        Self {
            repository,
            session,
        }
    }

    /// The signed-in owner, or `Unauthenticated`.
    fn owner(&self) -> Result<UserId> {
        self.session
            .state()
            .user
            .map(|user| user.id)
            .ok_or(LectioError::Unauthenticated)
    }

    /// Lists the owner's records, newest first.
    pub async fn list(&self) -> Result<Vec<Verse>> {
        let owner = self.owner()?;
        self.repository.list(&owner).await
    }

    /// Lists the owner's records filtered by a search query.
    ///
    /// Matching is case-insensitive over the derived reference and the
    /// text fields; fields that are absent on a record simply do not
    /// match.
    pub async fn search(&self, query: &str) -> Result<Vec<Verse>> {
        let verses = self.list().await?;
        Ok(verses
            .into_iter()
            .filter(|verse| verse.matches(query))
            .collect())
    }

    /// Fetches a single record by id, scoped to the owner.
    pub async fn get(&self, id: &VerseId) -> Result<Verse> {
        let owner = self.owner()?;
        self.repository.get(id, &owner).await
    }

    /// Persists a draft: insert when it has no id, update otherwise.
    ///
    /// The draft is validated before any remote call is issued.
    pub async fn save(&self, draft: &VerseDraft) -> Result<Verse> {
        let owner = self.owner()?;
        draft.validate()?;
        let saved = self.repository.upsert(draft, &owner).await?;
        tracing::info!("saved verse {} ({})", saved.id, saved.reference());
        Ok(saved)
    }

    /// Deletes a record by id, scoped to the owner.
    ///
    /// The web layer gates this behind an explicit confirmation step;
    /// the operation itself is idempotent.
    pub async fn delete(&self, id: &VerseId) -> Result<()> {
        let owner = self.owner()?;
        self.repository.delete(id, &owner).await?;
        tracing::info!("deleted verse {id}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use lectio_core::auth::{AuthChange, AuthProvider, AuthSession, AuthUser};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tokio::sync::broadcast;
    use uuid::Uuid;

    /// In-memory store honoring the double filter on every operation.
    #[derive(Default)]
    struct InMemoryVerseRepository {
        rows: Mutex<HashMap<VerseId, Verse>>,
    }

    #[async_trait]
    impl VerseRepository for InMemoryVerseRepository {
        async fn list(&self, owner: &UserId) -> Result<Vec<Verse>> {
            let rows = self.rows.lock().unwrap();
            let mut verses: Vec<Verse> = rows
                .values()
                .filter(|verse| verse.user_id == *owner)
                .cloned()
                .collect();
            verses.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(verses)
        }

        async fn get(&self, id: &VerseId, owner: &UserId) -> Result<Verse> {
            let rows = self.rows.lock().unwrap();
            rows.get(id)
                .filter(|verse| verse.user_id == *owner)
                .cloned()
                .ok_or_else(|| LectioError::not_found("verse", id.to_string()))
        }

        async fn upsert(&self, draft: &VerseDraft, owner: &UserId) -> Result<Verse> {
            let mut rows = self.rows.lock().unwrap();
            match draft.id {
                None => {
                    let now = Utc::now();
                    let verse = Verse {
                        id: VerseId(Uuid::new_v4()),
                        user_id: *owner,
                        book: draft.book.clone(),
                        chapter: draft.chapter,
                        verse_number: draft.verse_number,
                        page_number: draft.page_number,
                        original_text: draft.original_text.clone(),
                        translation: draft.translation.clone(),
                        reflection: draft.reflection.clone(),
                        created_at: now,
                        updated_at: now,
                    };
                    rows.insert(verse.id, verse.clone());
                    Ok(verse)
                }
                Some(id) => {
                    let existing = rows
                        .get_mut(&id)
                        .filter(|verse| verse.user_id == *owner)
                        .ok_or_else(|| LectioError::not_found("verse", id.to_string()))?;
                    existing.book = draft.book.clone();
                    existing.chapter = draft.chapter;
                    existing.verse_number = draft.verse_number;
                    existing.page_number = draft.page_number;
                    existing.original_text = draft.original_text.clone();
                    existing.translation = draft.translation.clone();
                    existing.reflection = draft.reflection.clone();
                    existing.updated_at = Utc::now();
                    Ok(existing.clone())
                }
            }
        }

        async fn delete(&self, id: &VerseId, owner: &UserId) -> Result<()> {
            let mut rows = self.rows.lock().unwrap();
            if rows
                .get(id)
                .map(|verse| verse.user_id == *owner)
                .unwrap_or(false)
            {
                rows.remove(id);
            }
            Ok(())
        }
    }

    /// Provider stub that resolves any token to a fixed identity.
    struct FixedProvider {
        events: broadcast::Sender<AuthChange>,
        user_id: UserId,
    }

    impl FixedProvider {
        fn new(user_id: UserId) -> Self {
            let (events, _) = broadcast::channel(4);
            Self { events, user_id }
        }
    }

    #[async_trait]
    impl AuthProvider for FixedProvider {
        async fn current_session(&self, access_token: &str) -> Result<Option<AuthSession>> {
            Ok(Some(AuthSession {
                user: AuthUser {
                    id: self.user_id,
                    email: Some("reader@example.com".to_string()),
                },
                access_token: access_token.to_string(),
            }))
        }

        fn authorize_url(&self, _redirect_to: &str) -> String {
            String::new()
        }

        async fn sign_out(&self, _access_token: &str) -> Result<()> {
            Ok(())
        }

        fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
            self.events.subscribe()
        }

        fn notify(&self, change: AuthChange) {
            let _ = self.events.send(change);
        }
    }

    /// Builds a session that signed in through the callback path.
    async fn signed_in_session(user_id: UserId) -> Arc<SessionService> {
        let service = Arc::new(SessionService::new(
            Arc::new(FixedProvider::new(user_id)),
            "http://127.0.0.1:8080/auth/callback",
        ));
        service
            .handle_callback(&crate::CallbackParams {
                access_token: Some("jwt".to_string()),
                error_description: None,
            })
            .await;
        assert!(service.state().is_signed_in());
        service
    }

    fn fixture_draft(book: &str) -> VerseDraft {
        VerseDraft {
            id: None,
            book: book.to_string(),
            chapter: 3,
            verse_number: 16,
            page_number: None,
            original_text: "For God so loved the world...".to_string(),
            translation: String::new(),
            reflection: None,
        }
    }

    async fn build(user_id: UserId) -> (VerseService, Arc<InMemoryVerseRepository>) {
        let repository = Arc::new(InMemoryVerseRepository::default());
        let session = signed_in_session(user_id).await;
        (
            VerseService::new(repository.clone(), session),
            repository,
        )
    }

    #[tokio::test]
    async fn test_operations_require_identity() {
        let repository = Arc::new(InMemoryVerseRepository::default());
        let session = Arc::new(SessionService::new(
            Arc::new(FixedProvider::new(UserId(Uuid::new_v4()))),
            "http://127.0.0.1:8080/auth/callback",
        ));
        let service = VerseService::new(repository, session);

        let err = service.list().await.unwrap_err();
        assert!(err.is_unauthenticated());
    }

    #[tokio::test]
    async fn test_save_rejects_invalid_draft_before_store() {
        let (service, repository) = build(UserId(Uuid::new_v4())).await;
        let mut draft = fixture_draft("John");
        draft.original_text = String::new();

        let err = service.save(&draft).await.unwrap_err();

        assert!(err.is_validation());
        assert!(repository.rows.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_insert_assigns_fresh_id_and_equal_timestamps() {
        let (service, _) = build(UserId(Uuid::new_v4())).await;

        let first = service.save(&fixture_draft("John")).await.unwrap();
        let second = service.save(&fixture_draft("Psalms")).await.unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(first.created_at, first.updated_at);
    }

    #[tokio::test]
    async fn test_update_keeps_id_and_owner_and_bumps_updated_at() {
        let owner = UserId(Uuid::new_v4());
        let (service, _) = build(owner).await;
        let saved = service.save(&fixture_draft("John")).await.unwrap();

        let mut edit = fixture_draft("John");
        edit.id = Some(saved.id);
        edit.reflection = Some("A later thought".to_string());
        let updated = service.save(&edit).await.unwrap();

        assert_eq!(updated.id, saved.id);
        assert_eq!(updated.user_id, owner);
        assert_eq!(updated.created_at, saved.created_at);
        assert!(updated.updated_at > updated.created_at);
        assert_eq!(updated.reflection.as_deref(), Some("A later thought"));
    }

    #[tokio::test]
    async fn test_get_is_owner_scoped() {
        let owner = UserId(Uuid::new_v4());
        let (service, repository) = build(owner).await;
        let saved = service.save(&fixture_draft("John")).await.unwrap();

        // A different owner sees nothing, even with the right id
        let stranger = signed_in_session(UserId(Uuid::new_v4())).await;
        let stranger_service = VerseService::new(repository, stranger);
        let err = stranger_service.get(&saved.id).await.unwrap_err();

        assert!(err.is_not_found());
        assert!(service.get(&saved.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_then_get_is_not_found() {
        let (service, _) = build(UserId(Uuid::new_v4())).await;
        let saved = service.save(&fixture_draft("John")).await.unwrap();

        service.delete(&saved.id).await.unwrap();

        let err = service.get(&saved.id).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (service, _) = build(UserId(Uuid::new_v4())).await;
        let saved = service.save(&fixture_draft("John")).await.unwrap();

        service.delete(&saved.id).await.unwrap();
        service.delete(&saved.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_list_is_newest_first_and_owner_scoped() {
        let (service, repository) = build(UserId(Uuid::new_v4())).await;
        let first = service.save(&fixture_draft("John")).await.unwrap();
        let second = service.save(&fixture_draft("Psalms")).await.unwrap();

        // Another owner's record must not appear
        let stranger = signed_in_session(UserId(Uuid::new_v4())).await;
        let stranger_service = VerseService::new(repository, stranger);
        stranger_service
            .save(&fixture_draft("Ruth"))
            .await
            .unwrap();

        let listed = service.list().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);
    }

    #[tokio::test]
    async fn test_search_filters_and_empty_query_matches_all() {
        let (service, _) = build(UserId(Uuid::new_v4())).await;
        service.save(&fixture_draft("John")).await.unwrap();
        let mut psalm = fixture_draft("Psalms");
        psalm.original_text = "The Lord is my shepherd".to_string();
        service.save(&psalm).await.unwrap();

        let hits = service.search("shepherd").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].book, "Psalms");

        assert_eq!(service.search("").await.unwrap().len(), 2);
        assert!(service.search("nowhere").await.unwrap().is_empty());
    }
}
