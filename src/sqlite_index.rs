//! Durable [`VectorIndex`] on SQLite.
//!
//! Embeddings are stored as little-endian `f32` BLOBs in `chunk_vectors`,
//! scoped by collection name. Queries load the eligible rows in insertion
//! order and rank them with a brute-force cosine scan, which is plenty for
//! a single-user PDF corpus.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use std::path::Path;
use uuid::Uuid;

use docqa_core::index::{active_filter, ensure_aligned, rank, IndexHit, VectorIndex};
use docqa_core::models::{Chunk, ChunkMetadata};
use docqa_core::vector::{decode_f32, encode_f32};

use crate::db;
use crate::migrate;

pub struct SqliteIndex {
    pool: SqlitePool,
    collection: String,
}

impl SqliteIndex {
    /// Open the database at `path`, apply the schema and make sure
    /// `collection` exists.
    pub async fn open(path: &Path, collection: &str) -> Result<Self> {
        let pool = db::connect(path)
            .await
            .with_context(|| format!("Failed to open index database: {}", path.display()))?;
        Self::from_pool(pool, collection).await
    }

    pub async fn from_pool(pool: SqlitePool, collection: &str) -> Result<Self> {
        migrate::run_migrations(&pool).await?;
        let index = Self {
            pool,
            collection: collection.to_string(),
        };
        index.ensure_collection().await?;
        Ok(index)
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Number of chunks in this collection.
    pub async fn count(&self) -> Result<i64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunk_vectors WHERE collection = ?")
            .bind(&self.collection)
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn ensure_collection(&self) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO collections (name, created_at) VALUES (?, ?)")
            .bind(&self.collection)
            .bind(chrono::Utc::now().timestamp())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_collection(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM chunk_vectors WHERE collection = ?")
            .bind(&self.collection)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM collections WHERE name = ?")
            .bind(&self.collection)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl VectorIndex for SqliteIndex {
    async fn add(&self, doc_id: &str, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<()> {
        ensure_aligned(chunks, embeddings)?;
        if chunks.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for (chunk, embedding) in chunks.iter().zip(embeddings) {
            sqlx::query(
                r#"
                INSERT INTO chunk_vectors
                    (chunk_id, collection, doc_id, page_number, content, dims, embedding)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&self.collection)
            .bind(doc_id)
            .bind(chunk.page_number as i64)
            .bind(&chunk.content)
            .bind(embedding.len() as i64)
            .bind(encode_f32(embedding))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn query(
        &self,
        query_embedding: &[f32],
        doc_ids: Option<&[String]>,
        top_k: usize,
    ) -> Result<Vec<IndexHit>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT doc_id, page_number, content, embedding FROM chunk_vectors WHERE collection = ",
        );
        qb.push_bind(self.collection.clone());

        if let Some(ids) = active_filter(doc_ids) {
            qb.push(" AND doc_id IN (");
            let mut separated = qb.separated(", ");
            for id in ids {
                separated.push_bind(id.clone());
            }
            separated.push_unseparated(")");
        }
        qb.push(" ORDER BY seq");

        let rows = qb.build().fetch_all(&self.pool).await?;

        let mut candidates = Vec::with_capacity(rows.len());
        for row in &rows {
            let page: i64 = row.try_get("page_number")?;
            let blob: Vec<u8> = row.try_get("embedding")?;
            candidates.push((
                row.try_get::<String, _>("content")?,
                ChunkMetadata {
                    doc_id: row.try_get("doc_id")?,
                    page_number: u32::try_from(page).unwrap_or(0),
                },
                decode_f32(&blob),
            ));
        }

        Ok(rank(query_embedding, candidates, top_k))
    }

    async fn wipe_and_reset(&self) -> Result<()> {
        if let Err(e) = self.delete_collection().await {
            tracing::warn!(
                collection = %self.collection,
                error = %e,
                "delete during wipe failed; continuing"
            );
        }
        self.ensure_collection()
            .await
            .with_context(|| format!("Failed to recreate collection '{}'", self.collection))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(page: u32, content: &str) -> Chunk {
        Chunk {
            page_number: page,
            content: content.to_string(),
        }
    }

    async fn open_temp(dir: &tempfile::TempDir, collection: &str) -> SqliteIndex {
        SqliteIndex::open(&dir.path().join("index.sqlite"), collection)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_add_then_query_filtered() {
        let dir = tempfile::tempdir().unwrap();
        let index = open_temp(&dir, "c").await;

        index
            .add("a", &[chunk(1, "alpha"), chunk(4, "beta")], &[vec![1.0, 0.0], vec![0.0, 1.0]])
            .await
            .unwrap();
        index.add("b", &[chunk(2, "gamma")], &[vec![1.0, 0.1]]).await.unwrap();

        let hits = index.query(&[1.0, 0.0], None, 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].content, "alpha");
        assert_eq!(hits[1].content, "gamma");

        let only_a = index
            .query(&[0.0, 1.0], Some(&["a".to_string()]), 5)
            .await
            .unwrap();
        assert_eq!(only_a.len(), 2);
        assert_eq!(only_a[0].content, "beta");
        assert_eq!(only_a[0].metadata.page_number, 4);
        assert!(only_a.iter().all(|h| h.metadata.doc_id == "a"));
    }

    #[tokio::test]
    async fn test_rows_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let index = open_temp(&dir, "c").await;
            index.add("d", &[chunk(7, "kept")], &[vec![0.3, 0.3]]).await.unwrap();
            index.close().await;
        }
        let index = open_temp(&dir, "c").await;
        assert_eq!(index.count().await.unwrap(), 1);
        let hits = index.query(&[0.3, 0.3], None, 1).await.unwrap();
        assert_eq!(hits[0].metadata.page_number, 7);
    }

    #[tokio::test]
    async fn test_mismatch_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let index = open_temp(&dir, "c").await;
        assert!(index.add("d", &[chunk(1, "x")], &[]).await.is_err());
        assert_eq!(index.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_wipe_is_scoped_and_repeatable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.sqlite");
        let first = SqliteIndex::open(&path, "first").await.unwrap();
        let other = SqliteIndex::open(&path, "other").await.unwrap();

        first.add("d", &[chunk(1, "x")], &[vec![1.0]]).await.unwrap();
        other.add("d", &[chunk(1, "y")], &[vec![1.0]]).await.unwrap();

        first.wipe_and_reset().await.unwrap();
        first.wipe_and_reset().await.unwrap();

        assert!(first.query(&[1.0], None, 10).await.unwrap().is_empty());
        assert_eq!(other.count().await.unwrap(), 1);

        first.add("d", &[chunk(2, "z")], &[vec![1.0]]).await.unwrap();
        assert_eq!(first.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_wipe_ignores_failed_delete() {
        let dir = tempfile::tempdir().unwrap();
        let index = open_temp(&dir, "c").await;
        sqlx::query("DROP TABLE chunk_vectors")
            .execute(&index.pool)
            .await
            .unwrap();

        index.wipe_and_reset().await.unwrap();

        let collections: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM collections WHERE name = 'c'")
                .fetch_one(&index.pool)
                .await
                .unwrap();
        assert_eq!(collections, 1);
    }

    #[tokio::test]
    async fn test_wipe_reports_failed_recreate() {
        let dir = tempfile::tempdir().unwrap();
        let index = open_temp(&dir, "c").await;
        index.close().await;

        let err = index.wipe_and_reset().await.unwrap_err();
        assert!(err.to_string().contains("Failed to recreate collection 'c'"));
    }
}
