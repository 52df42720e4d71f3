use crate::error::StoreError;
use crate::models::{Chunk, NewChunk};
use async_trait::async_trait;

/// Durable table of chunks. Holds the chunk set of the most recently indexed
/// document; rows are never updated in place.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Creates the chunk table if it is missing. Safe to call repeatedly.
    async fn ensure_schema(&self) -> Result<(), StoreError>;

    /// Deletes every row and restarts ids at 1.
    async fn clear_all(&self) -> Result<(), StoreError>;

    /// Inserts all rows as one atomic write.
    async fn bulk_insert(&self, chunks: &[NewChunk]) -> Result<(), StoreError>;

    /// Every stored row, in id order.
    async fn scan_all(&self) -> Result<Vec<Chunk>, StoreError>;

    /// Swaps the stored chunk set for `chunks`.
    ///
    /// The default clears and then inserts; stores that can do both in one
    /// transaction override it so readers never see an empty table.
    async fn replace_all(&self, chunks: &[NewChunk]) -> Result<(), StoreError> {
        self.clear_all().await?;
        self.bulk_insert(chunks).await
    }
}
