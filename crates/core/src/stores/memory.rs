use crate::error::StoreError;
use crate::models::{Chunk, NewChunk};
use crate::traits::ChunkStore;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug)]
struct Table {
    rows: Vec<Chunk>,
    next_id: i64,
}

impl Table {
    fn clear(&mut self) {
        self.rows.clear();
        self.next_id = 1;
    }

    fn insert(&mut self, chunks: &[NewChunk]) {
        let created_at = Utc::now();
        for chunk in chunks {
            self.rows.push(Chunk {
                id: self.next_id,
                text: chunk.text.clone(),
                embedding: chunk.embedding.clone(),
                source_name: chunk.source_name.clone(),
                strategy: chunk.strategy,
                created_at,
            });
            self.next_id += 1;
        }
    }
}

/// Process-local chunk table with the same id and replace semantics as the
/// Postgres store.
#[derive(Debug)]
pub struct InMemoryChunkStore {
    table: Mutex<Table>,
}

impl Default for InMemoryChunkStore {
    fn default() -> Self {
        Self {
            table: Mutex::new(Table {
                rows: Vec::new(),
                next_id: 1,
            }),
        }
    }
}

impl InMemoryChunkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().map(|table| table.rows.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, Table>, StoreError> {
        self.table
            .lock()
            .map_err(|_| StoreError::Unavailable("in-memory chunk table lock poisoned".to_string()))
    }
}

#[async_trait]
impl ChunkStore for InMemoryChunkStore {
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn clear_all(&self) -> Result<(), StoreError> {
        self.lock()?.clear();
        Ok(())
    }

    async fn bulk_insert(&self, chunks: &[NewChunk]) -> Result<(), StoreError> {
        self.lock()?.insert(chunks);
        Ok(())
    }

    async fn scan_all(&self) -> Result<Vec<Chunk>, StoreError> {
        Ok(self.lock()?.rows.clone())
    }

    async fn replace_all(&self, chunks: &[NewChunk]) -> Result<(), StoreError> {
        let mut table = self.lock()?;
        table.clear();
        table.insert(chunks);
        Ok(())
    }
}
