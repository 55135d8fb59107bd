//! Verse repository trait.
//!
//! Defines the interface to the remote verse table. Every operation is
//! scoped by the owner's identity; omitting the owner filter is a
//! data-leak defect, not an accepted shortcut.

use super::model::{Verse, VerseDraft, VerseId};
use crate::auth::UserId;
use crate::error::Result;
use async_trait::async_trait;

/// An abstract repository for verse records.
///
/// Decouples the application's use cases from the hosted record store.
/// All operations assume a signed-in owner; callers resolve the owner
/// identity from the session before reaching this seam.
#[async_trait]
pub trait VerseRepository: Send + Sync {
    /// Lists all records owned by `owner`, newest first.
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<Verse>)`: the owner's records, ordered by creation time
    ///   descending; an empty result is valid
    /// - `Err(_)`: the store could not be reached
    async fn list(&self, owner: &UserId) -> Result<Vec<Verse>>;

    /// Finds the single record matching both `id` and `owner`.
    ///
    /// A record that exists under a different owner is indistinguishable
    /// from an absent one, preserving the ownership invariant.
    ///
    /// # Returns
    ///
    /// - `Ok(Verse)`: the record
    /// - `Err(LectioError::NotFound { .. })`: zero rows matched both filters
    /// - `Err(_)`: the store could not be reached
    async fn get(&self, id: &VerseId, owner: &UserId) -> Result<Verse>;

    /// Inserts or updates a record.
    ///
    /// With `draft.id == None` a new row is inserted and the store
    /// assigns the identifier and creation timestamp. Otherwise the
    /// existing row is updated, filtered by id and owner; the owner
    /// field never changes and the updated timestamp is refreshed.
    ///
    /// # Returns
    ///
    /// The persisted record including store-assigned fields.
    async fn upsert(&self, draft: &VerseDraft, owner: &UserId) -> Result<Verse>;

    /// Removes the row matching both `id` and `owner`.
    ///
    /// Deleting an already-absent record is not an error; callers gate
    /// this behind an explicit confirmation step rather than relying on
    /// the idempotency.
    async fn delete(&self, id: &VerseId, owner: &UserId) -> Result<()>;
}
