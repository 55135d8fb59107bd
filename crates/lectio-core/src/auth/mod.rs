//! Authentication domain module.
//!
//! This module contains the session state model and the identity-provider
//! seam used by the session lifecycle.
//!
//! # Module Structure
//!
//! - `model`: session state, identity and change-event models
//! - `provider`: identity provider trait

mod model;
mod provider;

// Re-export public API
pub use model::{
    messages, sign_in_message, AuthChange, AuthSession, AuthUser, SessionState, UserId,
};
pub use provider::{AuthProvider, TokenSource};
