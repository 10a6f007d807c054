//! In-memory [`ContentStore`] implementation for tests and embedding.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::PersistenceError;
use crate::models::{NewContent, ProcessedContent};

use super::ContentStore;

/// Keeps records in insertion order; identifiers start at 1.
#[derive(Default)]
pub struct InMemoryStore {
    records: Mutex<Vec<ProcessedContent>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> PersistenceError {
    PersistenceError::new("in-memory store lock poisoned")
}

#[async_trait]
impl ContentStore for InMemoryStore {
    async fn insert(&self, content: NewContent) -> Result<ProcessedContent, PersistenceError> {
        let mut records = self.records.lock().map_err(|_| poisoned())?;
        let record = ProcessedContent::from_new(records.len() as i64 + 1, content);
        records.push(record.clone());
        Ok(record)
    }

    async fn get(&self, id: i64) -> Result<Option<ProcessedContent>, PersistenceError> {
        let records = self.records.lock().map_err(|_| poisoned())?;
        Ok(records.iter().find(|r| r.id == id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceKind;
    use chrono::Utc;

    fn new_content(value: &str) -> NewContent {
        NewContent {
            source_kind: SourceKind::UploadedFile,
            source_value: value.to_string(),
            original_text: "text".to_string(),
            summary: Some("summary".to_string()),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn assigns_sequential_ids() {
        let store = InMemoryStore::new();
        let a = store.insert(new_content("a.txt")).await.unwrap();
        let b = store.insert(new_content("b.txt")).await.unwrap();
        assert_eq!((a.id, b.id), (1, 2));
        assert_eq!(store.get(2).await.unwrap().unwrap().source_value, "b.txt");
        assert!(store.get(3).await.unwrap().is_none());
        assert_eq!(store.len(), 2);
    }
}
