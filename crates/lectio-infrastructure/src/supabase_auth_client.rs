//! Identity provider adapter for a Supabase-style hosted backend.
//!
//! Covers the four provider interactions: session check, external
//! sign-in redirect, session termination, and session-change push
//! events. All failures are reduced to the fixed user-facing message
//! set before leaving this module.

use crate::dto::UserPayload;
use crate::http::{normalize_base_url, provider_error};
use async_trait::async_trait;
use lectio_core::auth::{messages, AuthChange, AuthProvider, AuthSession};
use lectio_core::error::{LectioError, Result};
use reqwest::{Client, StatusCode};
use tokio::sync::broadcast;

const OAUTH_PROVIDER: &str = "google";
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Adapter that talks to the hosted identity API.
#[derive(Clone)]
pub struct SupabaseAuthClient {
    client: Client,
    base_url: String,
    anon_key: String,
    events: broadcast::Sender<AuthChange>,
}

impl SupabaseAuthClient {
    /// Creates a new client for the given backend.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Backend origin, e.g. `https://xyz.supabase.co`
    /// * `anon_key` - Public API key sent with every request
    pub fn new(base_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            client: Client::new(),
            base_url: normalize_base_url(base_url),
            anon_key: anon_key.into(),
            events,
        }
    }

    fn auth_endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }
}

#[async_trait]
impl AuthProvider for SupabaseAuthClient {
    async fn current_session(&self, access_token: &str) -> Result<Option<AuthSession>> {
        let response = self
            .client
            .get(self.auth_endpoint("user"))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|err| provider_error(err, messages::SESSION_CHECK))?;

        match response.status() {
            StatusCode::OK => {
                let payload: UserPayload = response.json().await.map_err(|err| {
                    tracing::warn!("failed to parse user payload: {err}");
                    LectioError::provider(messages::SESSION_CHECK)
                })?;
                Ok(Some(AuthSession {
                    user: payload.into_domain(),
                    access_token: access_token.to_string(),
                }))
            }
            // An expired or unknown token is "no session", not a failure
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(None),
            status => {
                tracing::warn!("session check returned {status}");
                Err(LectioError::provider(messages::SESSION_CHECK))
            }
        }
    }

    fn authorize_url(&self, redirect_to: &str) -> String {
        match reqwest::Url::parse(&self.auth_endpoint("authorize")) {
            Ok(mut url) => {
                url.query_pairs_mut()
                    .append_pair("provider", OAUTH_PROVIDER)
                    .append_pair("redirect_to", redirect_to);
                url.to_string()
            }
            Err(_) => format!(
                "{}?provider={}&redirect_to={}",
                self.auth_endpoint("authorize"),
                OAUTH_PROVIDER,
                redirect_to
            ),
        }
    }

    async fn sign_out(&self, access_token: &str) -> Result<()> {
        let response = self
            .client
            .post(self.auth_endpoint("logout"))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|err| provider_error(err, messages::SIGN_OUT))?;

        let status = response.status();
        // A token the provider no longer knows is already signed out
        if status.is_success() || status == StatusCode::UNAUTHORIZED {
            Ok(())
        } else {
            tracing::warn!("logout returned {status}");
            Err(LectioError::provider(messages::SIGN_OUT))
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.events.subscribe()
    }

    fn notify(&self, change: AuthChange) {
        // No subscribers is fine; the send result only counts receivers.
        let _ = self.events.send(change);
    }
}
