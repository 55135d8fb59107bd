//! Hosted-table VerseRepository implementation.
//!
//! Talks to the backend's REST layer (`/rest/v1/verses`). Every request
//! carries both row filters (`id`, `user_id`) where applicable, so one
//! user can never observe or mutate another's records; the backend's
//! row-level security enforces the same boundary server-side via the
//! bearer token.

use crate::dto::{InsertVerseRow, UpdateVerseRow, VerseRow};
use crate::http::{normalize_base_url, provider_error};
use async_trait::async_trait;
use lectio_core::auth::{messages, TokenSource, UserId};
use lectio_core::error::{LectioError, Result};
use lectio_core::verse::{Verse, VerseDraft, VerseId, VerseRepository};
use reqwest::Client;
use std::sync::Arc;

const TABLE: &str = "verses";

/// A repository implementation for verse records stored in the hosted
/// backend.
pub struct SupabaseVerseRepository {
    client: Client,
    base_url: String,
    anon_key: String,
    tokens: Arc<dyn TokenSource>,
}

impl SupabaseVerseRepository {
    /// Creates a new repository for the given backend.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Backend origin, e.g. `https://xyz.supabase.co`
    /// * `anon_key` - Public API key sent with every request
    /// * `tokens` - Source of the signed-in user's access token
    pub fn new(
        base_url: impl Into<String>,
        anon_key: impl Into<String>,
        tokens: Arc<dyn TokenSource>,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: normalize_base_url(base_url),
            anon_key: anon_key.into(),
            tokens,
        }
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, TABLE)
    }

    /// Bearer token for the request: the session's token when signed
    /// in, the anon key otherwise.
    fn bearer(&self) -> String {
        self.tokens
            .access_token()
            .unwrap_or_else(|| self.anon_key.clone())
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header("apikey", &self.anon_key)
            .bearer_auth(self.bearer())
    }

    // Request construction is separated from dispatch so the row
    // filters can be inspected where they are attached. Every builder
    // that targets existing rows carries the `user_id` filter.

    fn list_request(&self, owner: &UserId) -> reqwest::RequestBuilder {
        self.request(self.client.get(self.table_url())).query(&[
            ("select", "*".to_string()),
            ("user_id", format!("eq.{}", owner)),
            ("order", "created_at.desc".to_string()),
        ])
    }

    fn get_request(&self, id: &VerseId, owner: &UserId) -> reqwest::RequestBuilder {
        self.request(self.client.get(self.table_url())).query(&[
            ("select", "*".to_string()),
            ("id", format!("eq.{}", id)),
            ("user_id", format!("eq.{}", owner)),
        ])
    }

    fn insert_request(&self, draft: &VerseDraft, owner: &UserId) -> reqwest::RequestBuilder {
        // The owner travels in the row payload; there is no existing row
        // to filter yet
        self.request(self.client.post(self.table_url()))
            .header("Prefer", "return=representation")
            .json(&vec![InsertVerseRow::from_draft(draft, owner)])
    }

    fn update_request(
        &self,
        id: &VerseId,
        draft: &VerseDraft,
        owner: &UserId,
    ) -> reqwest::RequestBuilder {
        self.request(self.client.patch(self.table_url()))
            .header("Prefer", "return=representation")
            .query(&[
                ("id", format!("eq.{}", id)),
                ("user_id", format!("eq.{}", owner)),
            ])
            .json(&UpdateVerseRow::from_draft(draft))
    }

    fn delete_request(&self, id: &VerseId, owner: &UserId) -> reqwest::RequestBuilder {
        self.request(self.client.delete(self.table_url())).query(&[
            ("id", format!("eq.{}", id)),
            ("user_id", format!("eq.{}", owner)),
        ])
    }

    async fn read_rows(&self, response: reqwest::Response) -> Result<Vec<VerseRow>> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("store request returned {status}: {body}");
            return Err(LectioError::provider(messages::STORE));
        }
        response.json().await.map_err(|err| {
            tracing::warn!("failed to parse store rows: {err}");
            LectioError::provider(messages::STORE)
        })
    }
}

#[async_trait]
impl VerseRepository for SupabaseVerseRepository {
    async fn list(&self, owner: &UserId) -> Result<Vec<Verse>> {
        let response = self
            .list_request(owner)
            .send()
            .await
            .map_err(|err| provider_error(err, messages::STORE))?;

        let rows = self.read_rows(response).await?;
        Ok(rows.into_iter().map(VerseRow::into_domain).collect())
    }

    async fn get(&self, id: &VerseId, owner: &UserId) -> Result<Verse> {
        let response = self
            .get_request(id, owner)
            .send()
            .await
            .map_err(|err| provider_error(err, messages::STORE))?;

        let rows = self.read_rows(response).await?;
        rows.into_iter()
            .next()
            .map(VerseRow::into_domain)
            .ok_or_else(|| LectioError::not_found("verse", id.to_string()))
    }

    async fn upsert(&self, draft: &VerseDraft, owner: &UserId) -> Result<Verse> {
        let request = match draft.id {
            None => self.insert_request(draft, owner),
            Some(id) => self.update_request(&id, draft, owner),
        };
        let response = request
            .send()
            .await
            .map_err(|err| provider_error(err, messages::STORE))?;
        let rows = self.read_rows(response).await?;

        rows.into_iter()
            .next()
            .map(VerseRow::into_domain)
            .ok_or_else(|| match draft.id {
                // Zero updated rows: the record is gone or isn't ours
                Some(id) => LectioError::not_found("verse", id.to_string()),
                None => LectioError::internal("store returned no row for insert"),
            })
    }

    async fn delete(&self, id: &VerseId, owner: &UserId) -> Result<()> {
        let response = self
            .delete_request(id, owner)
            .send()
            .await
            .map_err(|err| provider_error(err, messages::STORE))?;

        let status = response.status();
        if status.is_success() {
            // Zero deleted rows is still success: delete is idempotent
            Ok(())
        } else {
            tracing::warn!("delete returned {status}");
            Err(LectioError::provider(messages::STORE))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    struct NoToken;

    impl TokenSource for NoToken {
        fn access_token(&self) -> Option<String> {
            None
        }
    }

    struct FixedToken(&'static str);

    impl TokenSource for FixedToken {
        fn access_token(&self) -> Option<String> {
            Some(self.0.to_string())
        }
    }

    #[test]
    fn test_table_url() {
        let repo =
            SupabaseVerseRepository::new("https://demo.supabase.co/", "anon", Arc::new(NoToken));
        assert_eq!(repo.table_url(), "https://demo.supabase.co/rest/v1/verses");
    }

    #[test]
    fn test_bearer_falls_back_to_anon_key_when_signed_out() {
        let repo =
            SupabaseVerseRepository::new("https://demo.supabase.co", "anon", Arc::new(NoToken));
        assert_eq!(repo.bearer(), "anon");
    }

    #[test]
    fn test_bearer_uses_session_token_when_present() {
        let repo = SupabaseVerseRepository::new(
            "https://demo.supabase.co",
            "anon",
            Arc::new(FixedToken("user-jwt")),
        );
        assert_eq!(repo.bearer(), "user-jwt");
    }

    fn repo() -> SupabaseVerseRepository {
        SupabaseVerseRepository::new("https://demo.supabase.co", "anon", Arc::new(NoToken))
    }

    fn query_of(builder: reqwest::RequestBuilder) -> String {
        builder
            .build()
            .unwrap()
            .url()
            .query()
            .unwrap_or_default()
            .to_string()
    }

    fn sample_draft(id: Option<VerseId>) -> VerseDraft {
        VerseDraft {
            id,
            book: "John".to_string(),
            chapter: 3,
            verse_number: 16,
            page_number: None,
            original_text: "For God so loved the world...".to_string(),
            translation: String::new(),
            reflection: None,
        }
    }

    #[test]
    fn test_row_requests_filter_by_owner() {
        let repo = repo();
        let owner = UserId(Uuid::new_v4());
        let id = VerseId(Uuid::new_v4());
        let owner_filter = format!("user_id=eq.{owner}");
        let id_filter = format!("id=eq.{id}");

        let list = query_of(repo.list_request(&owner));
        assert!(list.contains(&owner_filter), "list query: {list}");

        let get = query_of(repo.get_request(&id, &owner));
        assert!(get.contains(&owner_filter), "get query: {get}");
        assert!(get.contains(&id_filter), "get query: {get}");

        let update = query_of(repo.update_request(&id, &sample_draft(Some(id)), &owner));
        assert!(update.contains(&owner_filter), "update query: {update}");
        assert!(update.contains(&id_filter), "update query: {update}");

        let delete = query_of(repo.delete_request(&id, &owner));
        assert!(delete.contains(&owner_filter), "delete query: {delete}");
        assert!(delete.contains(&id_filter), "delete query: {delete}");
    }

    #[test]
    fn test_insert_request_carries_owner_in_payload() {
        let repo = repo();
        let owner = UserId(Uuid::new_v4());

        let request = repo.insert_request(&sample_draft(None), &owner).build().unwrap();
        assert!(request.url().query().unwrap_or_default().is_empty());

        let body = request.body().unwrap().as_bytes().unwrap();
        let rows: serde_json::Value = serde_json::from_slice(body).unwrap();
        assert_eq!(rows[0]["user_id"], serde_json::json!(owner.0));
    }
}
