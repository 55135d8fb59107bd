//! Verse domain module.
//!
//! This module contains the verse record model, draft validation, and
//! the remote store seam.

mod model;
mod repository;

// Re-export public API
pub use model::{Verse, VerseDraft, VerseId};
pub use repository::VerseRepository;
