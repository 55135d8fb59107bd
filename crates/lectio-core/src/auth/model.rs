//! Session state and identity models.
//!
//! One `SessionState` exists per process. It is owned by the session
//! service, which is its single writer; everything else observes it
//! through a watch channel.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque identifier for a provider-managed user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identity reported by the provider for the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: UserId,
    pub email: Option<String>,
}

/// An active provider session: the identity plus the token that scopes
/// record operations to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub user: AuthUser,
    pub access_token: String,
}

/// Process-wide authentication state.
///
/// Invariant: `user` is `Some` if and only if the most recent bootstrap
/// check or provider change event reported an active session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    /// Signed-in identity, or `None` when there is no active session.
    pub user: Option<AuthUser>,
    /// True while a provider call is outstanding.
    pub loading: bool,
    /// Last user-facing error message, if any.
    pub last_error: Option<String>,
}

impl SessionState {
    /// State at process start: no identity, bootstrap pending.
    pub fn initial() -> Self {
        Self {
            user: None,
            loading: true,
            last_error: None,
        }
    }

    /// Applies a provider change event, atomically replacing the identity
    /// and clearing the loading flag.
    pub fn apply(&mut self, change: &AuthChange) {
        match change {
            AuthChange::SignedIn(session) => self.user = Some(session.user.clone()),
            AuthChange::SignedOut => self.user = None,
        }
        self.loading = false;
    }

    /// Whether an identity is currently present.
    pub fn is_signed_in(&self) -> bool {
        self.user.is_some()
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::initial()
    }
}

/// Session change notification pushed by the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthChange {
    /// A session was established (or replaced).
    SignedIn(AuthSession),
    /// The session ended.
    SignedOut,
}

/// Fixed set of user-facing messages for provider failures.
///
/// Remote failures are always reduced to one of these before they reach
/// a view; raw provider errors never cross the service boundary.
pub mod messages {
    pub const NETWORK: &str = "Connection error. Check your internet connection.";
    pub const BLOCKED: &str = "Sign-in was cancelled or blocked by the browser.";
    pub const TIMEOUT: &str = "The request took too long. Try again.";
    pub const SIGN_IN: &str = "Could not sign in. Please try again.";
    pub const SIGN_OUT: &str = "Could not sign out. Please try again.";
    pub const SESSION_CHECK: &str = "Could not verify the session.";
    pub const CALLBACK: &str = "Could not complete authentication.";
    pub const STORE: &str = "Could not reach the journal store. Please try again.";
}

/// Maps a raw provider error description to one of the fixed sign-in
/// messages.
pub fn sign_in_message(raw: &str) -> &'static str {
    let lower = raw.to_lowercase();
    if lower.contains("network") || lower.contains("connect") {
        messages::NETWORK
    } else if lower.contains("popup") || lower.contains("blocked") {
        messages::BLOCKED
    } else if lower.contains("timeout") || lower.contains("timed out") {
        messages::TIMEOUT
    } else {
        messages::SIGN_IN
    }
}
