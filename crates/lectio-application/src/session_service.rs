//! Session lifecycle service.
//!
//! `SessionService` owns the one process-wide `SessionState` and is its
//! single writer. Everything else observes the state through a watch
//! channel. Provider push events are applied by the same writer, after
//! the initiating call's own local update, so ordering stays causal.

use lectio_core::auth::{
    messages, sign_in_message, AuthChange, AuthProvider, SessionState, TokenSource,
};
use lectio_core::error::Result;
use std::sync::{Arc, RwLock};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

/// Where a callback visit should land.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackDestination {
    /// Authenticated landing page.
    Dashboard,
    /// Sign-in page.
    Login,
}

/// Result of the one-shot callback resolution.
#[derive(Debug, Clone)]
pub struct CallbackOutcome {
    pub destination: CallbackDestination,
    pub error: Option<String>,
}

/// Parameters carried by the provider's redirect back into the app.
#[derive(Debug, Clone, Default)]
pub struct CallbackParams {
    pub access_token: Option<String>,
    pub error_description: Option<String>,
}

impl CallbackParams {
    /// Parses a URL fragment of the form `access_token=...&...`.
    ///
    /// Only the keys this flow cares about are extracted; everything
    /// else in the fragment is ignored.
    pub fn from_fragment(fragment: &str) -> Self {
        let mut params = Self::default();
        for pair in fragment.trim_start_matches('#').split('&') {
            let mut parts = pair.splitn(2, '=');
            let key = parts.next().unwrap_or_default();
            let value = parts.next().unwrap_or_default();
            if value.is_empty() {
                continue;
            }
            match key {
                "access_token" => params.access_token = Some(value.to_string()),
                "error_description" | "error" => {
                    params.error_description = Some(value.replace('+', " "))
                }
                _ => {}
            }
        }
        params
    }
}

/// Handle for the provider-event listener registration.
///
/// The registration is released exactly once: either explicitly via
/// [`SubscriptionGuard::release`] or implicitly on drop, whichever
/// happens first, on every exit path.
pub struct SubscriptionGuard {
    handle: Option<JoinHandle<()>>,
}

impl SubscriptionGuard {
    /// Releases the registration now.
    pub fn release(mut self) {
        self.abort();
    }

    fn abort(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.abort();
    }
}

/// Manages the process-wide authentication state.
///
/// `SessionService` is responsible for:
/// - Bootstrapping by querying the provider for an existing session
/// - Applying provider push notifications to the state cell
/// - Starting sign-in / sign-out and the callback resolution
/// - Exposing the state to readers through a watch channel
pub struct SessionService {
    /// Identity provider boundary
    provider: Arc<dyn AuthProvider>,
    /// The single state cell; this service is its only writer
    state: watch::Sender<SessionState>,
    /// Access token of the active session, if any
    token: RwLock<Option<String>>,
    /// Fixed return address for the external sign-in flow
    callback_url: String,
}

impl SessionService {
    /// Creates a new `SessionService`.
    ///
    /// # Arguments
    ///
    /// * `provider` - The identity provider boundary
    /// * `callback_url` - The fixed return address for sign-in redirects
    pub fn new(provider: Arc<dyn AuthProvider>, callback_url: impl Into<String>) -> Self {
        let (state, _) = watch::channel(SessionState::initial());
        Self {
            provider,
            state,
            token: RwLock::new(None),
            callback_url: callback_url.into(),
        }
    }

    /// Returns a snapshot of the current session state.
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Subscribes to session state changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Queries the provider for an existing session, once, at startup.
    ///
    /// Sets the identity from the returned session (or absent if none),
    /// records `last_error` on failure, and always clears the loading
    /// flag when finished.
    pub async fn bootstrap(&self) {
        let token = self.current_token();
        let outcome = match token {
            Some(token) => self.provider.current_session(&token).await,
            None => Ok(None),
        };

        match outcome {
            Ok(Some(session)) => {
                tracing::info!("[Bootstrap] Existing session for {}", session.user.id);
                self.store_token(Some(session.access_token.clone()));
                self.state.send_modify(|state| {
                    state.user = Some(session.user.clone());
                    state.last_error = None;
                    state.loading = false;
                });
            }
            Ok(None) => {
                tracing::info!("[Bootstrap] No existing session");
                self.store_token(None);
                self.state.send_modify(|state| {
                    state.user = None;
                    state.loading = false;
                });
            }
            Err(err) => {
                tracing::error!("[Bootstrap] Session check failed: {err}");
                self.state.send_modify(|state| {
                    state.last_error = Some(err.to_string());
                    state.loading = false;
                });
            }
        }
    }

    /// Registers for provider push notifications.
    ///
    /// The returned guard must live as long as the owning scope; its
    /// drop releases the registration.
    pub fn listen(self: Arc<Self>) -> SubscriptionGuard {
        let mut events = self.provider.subscribe();
        let service = self;
        let handle = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(change) => service.apply_change(&change),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        // Last-writer-wins on the single cell: only the
                        // latest event matters, so lag is survivable.
                        tracing::warn!("session listener lagged, skipped {skipped} event(s)");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        SubscriptionGuard {
            handle: Some(handle),
        }
    }

    /// Starts the external redirect-based sign-in flow.
    ///
    /// Returns the provider URL the caller should redirect to. Does not
    /// change the identity; only the subsequent callback resolution or
    /// push notification does.
    pub fn sign_in(&self) -> String {
        self.state.send_modify(|state| {
            state.loading = true;
            state.last_error = None;
        });
        let url = self.provider.authorize_url(&self.callback_url);
        self.state.send_modify(|state| state.loading = false);
        url
    }

    /// Requests provider-side session termination.
    ///
    /// On success the resulting push notification clears the identity.
    /// On failure records `last_error` and returns the error to the
    /// caller.
    pub async fn sign_out(&self) -> Result<()> {
        self.state.send_modify(|state| {
            state.loading = true;
            state.last_error = None;
        });

        let token = self.current_token();
        let result = match token {
            Some(token) => self.provider.sign_out(&token).await,
            // Nothing to terminate provider-side
            None => Ok(()),
        };

        match result {
            Ok(()) => {
                self.store_token(None);
                self.apply_change(&AuthChange::SignedOut);
                self.provider.notify(AuthChange::SignedOut);
                Ok(())
            }
            Err(err) => {
                self.state.send_modify(|state| {
                    state.last_error = Some(err.to_string());
                    state.loading = false;
                });
                Err(err)
            }
        }
    }

    /// One-shot resolution of a callback visit.
    ///
    /// Runs exactly once per visit: parse the redirect parameters for a
    /// success token; if present, resolve the now-established session
    /// with the provider; on absence of a token, fall back to the
    /// already-known identity; on any failure, land on the sign-in page
    /// with the error surfaced.
    pub async fn handle_callback(&self, params: &CallbackParams) -> CallbackOutcome {
        if let Some(raw) = &params.error_description {
            let message = sign_in_message(raw);
            tracing::warn!("sign-in callback reported an error: {raw}");
            self.state.send_modify(|state| {
                state.last_error = Some(message.to_string());
                state.loading = false;
            });
            return CallbackOutcome {
                destination: CallbackDestination::Login,
                error: Some(message.to_string()),
            };
        }

        if let Some(token) = &params.access_token {
            return match self.provider.current_session(token).await {
                Ok(Some(session)) => {
                    tracing::info!("authentication callback resolved for {}", session.user.id);
                    self.store_token(Some(session.access_token.clone()));
                    let change = AuthChange::SignedIn(session);
                    // Local update first, then the push notification;
                    // re-applying the same event is harmless.
                    self.apply_change(&change);
                    self.provider.notify(change);
                    CallbackOutcome {
                        destination: CallbackDestination::Dashboard,
                        error: None,
                    }
                }
                Ok(None) => self.callback_failure(messages::CALLBACK),
                Err(err) => {
                    tracing::error!("callback session resolution failed: {err}");
                    self.callback_failure(messages::CALLBACK)
                }
            };
        }

        // No token in the redirect: fall back to already-known identity
        let destination = if self.state().is_signed_in() {
            CallbackDestination::Dashboard
        } else {
            CallbackDestination::Login
        };
        self.state.send_modify(|state| state.loading = false);
        CallbackOutcome {
            destination,
            error: None,
        }
    }

    fn callback_failure(&self, message: &str) -> CallbackOutcome {
        self.state.send_modify(|state| {
            state.last_error = Some(message.to_string());
            state.loading = false;
        });
        CallbackOutcome {
            destination: CallbackDestination::Login,
            error: Some(message.to_string()),
        }
    }

    /// Applies a provider change event: replaces the identity, clears
    /// the loading flag, and tracks the token for record operations.
    fn apply_change(&self, change: &AuthChange) {
        match change {
            AuthChange::SignedIn(session) => {
                self.store_token(Some(session.access_token.clone()))
            }
            AuthChange::SignedOut => self.store_token(None),
        }
        self.state.send_modify(|state| state.apply(change));
    }

    fn current_token(&self) -> Option<String> {
        self.token.read().unwrap().clone()
    }

    fn store_token(&self, token: Option<String>) {
        *self.token.write().unwrap() = token;
    }
}

impl TokenSource for SessionService {
    fn access_token(&self) -> Option<String> {
        self.current_token()
    }
}
