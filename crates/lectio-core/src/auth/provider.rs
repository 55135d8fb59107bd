//! Identity provider trait.
//!
//! Defines the boundary to the hosted identity provider: one call to
//! check the current session, one to build the external sign-in
//! redirect, one to end the session, and a subscription for
//! session-change push events.

use super::model::{AuthChange, AuthSession};
use crate::error::Result;
use async_trait::async_trait;
use tokio::sync::broadcast;

/// An abstract identity provider.
///
/// Decouples the session lifecycle from the concrete hosted backend.
/// Implementations translate provider failures into the fixed
/// user-facing message set before returning them.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Resolves the session belonging to `access_token`.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(session))`: the token maps to an active session
    /// - `Ok(None)`: the token is expired or otherwise not a session
    /// - `Err(_)`: the provider could not be reached
    async fn current_session(&self, access_token: &str) -> Result<Option<AuthSession>>;

    /// Builds the URL that starts the external redirect-based sign-in
    /// flow, returning to `redirect_to` on completion.
    fn authorize_url(&self, redirect_to: &str) -> String;

    /// Requests provider-side session termination for `access_token`.
    async fn sign_out(&self, access_token: &str) -> Result<()>;

    /// Subscribes to session-change push events.
    ///
    /// The returned receiver observes every `notify` call made after the
    /// subscription; dropping it releases the registration.
    fn subscribe(&self) -> broadcast::Receiver<AuthChange>;

    /// Publishes a session-change event to all subscribers.
    fn notify(&self, change: AuthChange);
}

/// Source of the current session's access token.
///
/// Record-store adapters use this to attach the signed-in user's token
/// to remote calls, so the provider's row-level security sees the same
/// identity the owner filter names.
pub trait TokenSource: Send + Sync {
    /// Returns the current access token, or `None` when signed out.
    fn access_token(&self) -> Option<String>;
}
