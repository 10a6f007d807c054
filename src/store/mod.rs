//! Storage abstraction for processed content.
//!
//! The [`ContentStore`] trait is the persistence collaborator of the
//! pipeline: it assigns identifiers and must accept concurrent inserts.
//! Implementations:
//!
//! - [`SqliteStore`]: the `processed_content` table in SQLite.
//! - [`InMemoryStore`]: a `Mutex<Vec<_>>`, for tests and embedding.

mod memory;
mod sqlite;

pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;

use crate::error::PersistenceError;
use crate::models::{NewContent, ProcessedContent};

/// Persistence backend for [`ProcessedContent`] records.
///
/// Records are immutable once inserted; there is no update or delete.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Save a new record and return it with its assigned identifier.
    async fn insert(&self, content: NewContent) -> Result<ProcessedContent, PersistenceError>;

    /// Fetch a record by identifier.
    async fn get(&self, id: i64) -> Result<Option<ProcessedContent>, PersistenceError>;
}
