use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::model::{Book, BookFilter, BookId, BookPatch, NewBook, Window};

/// Record store holding book documents.
///
/// Absence is not an error: lookups return `Ok(None)` and deletes
/// `Ok(false)` when no record carries the identifier. Writes are atomic per
/// record; a failed call leaves the store unchanged.
#[async_trait]
pub trait BookStore: Send + Sync {
    /// Short backend name for logs.
    fn backend(&self) -> &'static str;

    /// Verify the store is reachable.
    async fn ping(&self) -> StoreResult<()>;

    /// Number of records matching `filter`, ignoring any window.
    async fn count(&self, filter: &BookFilter) -> StoreResult<u64>;

    /// Records matching `filter` in identifier order, bounded by `window`.
    async fn find(&self, filter: &BookFilter, window: Window) -> StoreResult<Vec<Book>>;

    async fn find_by_id(&self, id: &BookId) -> StoreResult<Option<Book>>;

    /// Persist a new record; the store assigns the id and both timestamps.
    async fn create(&self, book: NewBook) -> StoreResult<Book>;

    /// Apply `patch` and refresh `updatedAt`; returns the updated record.
    async fn update(&self, id: &BookId, patch: BookPatch) -> StoreResult<Option<Book>>;

    /// Remove the record; `true` when something was deleted.
    async fn delete(&self, id: &BookId) -> StoreResult<bool>;
}

/// Store handle shared between handlers.
pub type SharedStore = Arc<dyn BookStore>;
