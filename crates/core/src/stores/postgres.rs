use crate::config::validate_table_name;
use crate::error::{ConfigurationError, StoreError};
use crate::models::{Chunk, NewChunk, SplitStrategy};
use crate::traits::ChunkStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, GenericClient, NoTls, Row};
use tracing::{debug, warn};

/// Rows per INSERT statement; keeps the bind count under Postgres' 65535 limit.
const ROWS_PER_STATEMENT: usize = 1_000;

/// Chunk table in Postgres. Embeddings are stored as `REAL[]`.
pub struct PostgresChunkStore {
    client: Mutex<Client>,
    table: String,
}

impl PostgresChunkStore {
    pub async fn connect(database_url: &str, table: &str) -> Result<Self, StoreError> {
        validate_table_name(table).map_err(|error: ConfigurationError| {
            StoreError::Unavailable(error.to_string())
        })?;

        let (client, connection) = tokio_postgres::connect(database_url, NoTls).await?;
        tokio::spawn(async move {
            if let Err(error) = connection.await {
                warn!(%error, "postgres connection closed with error");
            }
        });

        Ok(Self {
            client: Mutex::new(client),
            table: table.to_string(),
        })
    }

    fn clear_sql(&self) -> String {
        format!("TRUNCATE TABLE {} RESTART IDENTITY", self.table)
    }

    // Tables created with a plain TIMESTAMP column are read through the session zone.
    fn scan_sql(&self) -> String {
        format!(
            "SELECT id, chunk_text, embedding, filename, split_strategy,
                    created_at::timestamptz AS created_at
             FROM {} ORDER BY id",
            self.table
        )
    }

    async fn insert_rows<C>(&self, client: &C, chunks: &[NewChunk]) -> Result<(), StoreError>
    where
        C: GenericClient + Sync,
    {
        for batch in chunks.chunks(ROWS_PER_STATEMENT) {
            let sql = insert_sql(&self.table, batch.len());
            let labels: Vec<&'static str> =
                batch.iter().map(|chunk| chunk.strategy.as_str()).collect();

            let mut params: Vec<&(dyn ToSql + Sync)> = Vec::with_capacity(batch.len() * 4);
            for (chunk, label) in batch.iter().zip(&labels) {
                params.push(&chunk.text);
                params.push(&chunk.embedding);
                params.push(&chunk.source_name);
                params.push(label);
            }

            let inserted = client.execute(sql.as_str(), &params).await?;
            debug!(table = %self.table, inserted, "inserted chunk batch");
        }
        Ok(())
    }
}

fn create_table_sql(table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {table} (
            id SERIAL PRIMARY KEY,
            chunk_text TEXT NOT NULL,
            embedding REAL[] NOT NULL,
            filename VARCHAR(255) NOT NULL,
            split_strategy VARCHAR(50) NOT NULL,
            created_at TIMESTAMPTZ DEFAULT now()
        )"
    )
}

fn insert_sql(table: &str, rows: usize) -> String {
    let values = (0..rows)
        .map(|row| {
            let base = row * 4;
            format!("(${}, ${}, ${}, ${})", base + 1, base + 2, base + 3, base + 4)
        })
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "INSERT INTO {table} (chunk_text, embedding, filename, split_strategy) VALUES {values}"
    )
}

fn chunk_from_row(row: &Row) -> Result<Chunk, StoreError> {
    let id = i64::from(row.try_get::<_, i32>("id")?);
    let strategy_name: String = row.try_get("split_strategy")?;
    let strategy = strategy_name
        .parse::<SplitStrategy>()
        .map_err(|error| StoreError::MalformedRow {
            id,
            details: error.to_string(),
        })?;
    let created_at: Option<DateTime<Utc>> = row.try_get("created_at")?;
    let created_at = created_at.ok_or_else(|| StoreError::MalformedRow {
        id,
        details: "created_at is null".to_string(),
    })?;

    Ok(Chunk {
        id,
        text: row.try_get("chunk_text")?,
        // A null array is kept as an empty embedding and ranked out later.
        embedding: row
            .try_get::<_, Option<Vec<f32>>>("embedding")?
            .unwrap_or_default(),
        source_name: row.try_get("filename")?,
        strategy,
        created_at,
    })
}

#[async_trait]
impl ChunkStore for PostgresChunkStore {
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        let client = self.client.lock().await;
        client.batch_execute(&create_table_sql(&self.table)).await?;
        Ok(())
    }

    async fn clear_all(&self) -> Result<(), StoreError> {
        let client = self.client.lock().await;
        client.batch_execute(&self.clear_sql()).await?;
        Ok(())
    }

    async fn bulk_insert(&self, chunks: &[NewChunk]) -> Result<(), StoreError> {
        if chunks.is_empty() {
            return Ok(());
        }

        let mut client = self.client.lock().await;
        let transaction = client.transaction().await?;
        self.insert_rows(&transaction, chunks).await?;
        transaction.commit().await?;
        Ok(())
    }

    async fn scan_all(&self) -> Result<Vec<Chunk>, StoreError> {
        let client = self.client.lock().await;
        let rows = client.query(self.scan_sql().as_str(), &[]).await?;
        rows.iter().map(chunk_from_row).collect()
    }

    async fn replace_all(&self, chunks: &[NewChunk]) -> Result<(), StoreError> {
        let mut client = self.client.lock().await;
        let transaction = client.transaction().await?;
        transaction.batch_execute(&self.clear_sql()).await?;
        self.insert_rows(&transaction, chunks).await?;
        transaction.commit().await?;
        Ok(())
    }
}
