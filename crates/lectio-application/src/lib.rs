//! Application services for lectio.
//!
//! Coordinates the domain seams from `lectio-core`: the session
//! lifecycle over the identity provider, and the owner-scoped verse
//! use cases over the record store.

pub mod session_service;
pub mod verse_service;

pub use session_service::{
    CallbackDestination, CallbackOutcome, CallbackParams, SessionService, SubscriptionGuard,
};
pub use verse_service::VerseService;
