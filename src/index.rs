//! Persistent vector index over indexed documents.
//!
//! [`VectorIndex`] is the seam the question-answering side talks to: a
//! similarity query returning ranked chunks with their metadata.
//! [`SqliteIndex`] is the bundled backend: one SQLite file under the storage
//! directory holding every document's text, address and embedding, queried
//! by brute-force cosine similarity.
//!
//! # Model identity
//!
//! The index records the [`EmbeddingIdentity`] it was built with. Building
//! over, or loading, an index with a provider of a different identity is an
//! error: vectors from different models are not comparable and retrieval
//! would silently return noise.
//!
//! # Rebuilds
//!
//! Building over an existing index merges. A document whose
//! `(file_name, page_num, chunk_num)` already exists replaces the stored one;
//! when its text hash is unchanged the stored vector is kept and nothing is
//! re-embedded. Documents from earlier builds that are absent from the new
//! batch stay queryable.

use std::path::Path;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use sqlx::{Row, SqlitePool};

use crate::db;
use crate::embedding::{
    blob_to_vec, cosine_similarity, embed_query, vec_to_blob, EmbeddingIdentity,
    EmbeddingProvider,
};
use crate::migrate;
use crate::models::{Chunk, ChunkMetadata, IndexedDocument, RetrievedChunk};
use crate::progress::{BuildProgressEvent, BuildProgressReporter};

/// A queryable similarity index.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Embedding identity the stored vectors were produced with.
    fn identity(&self) -> &EmbeddingIdentity;

    /// Embed and store `documents`, replacing any with the same address.
    async fn add(
        &self,
        documents: &[IndexedDocument],
        batch_size: usize,
        progress: &dyn BuildProgressReporter,
    ) -> Result<BuildStats>;

    /// Return up to `top_k` documents most similar to `text`, best first.
    async fn query(&self, text: &str, top_k: usize) -> Result<Vec<RetrievedChunk>>;
}

/// Counters from one build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Documents handed to the builder after filtering.
    pub documents: usize,
    /// Documents embedded and written in this build.
    pub embedded: usize,
    /// Documents whose stored vector was reused.
    pub unchanged: usize,
    /// Total documents in the index afterwards.
    pub total: usize,
}

/// Summary of a persisted index, readable without an embedding provider.
#[derive(Debug, Clone)]
pub struct IndexInfo {
    pub identity: EmbeddingIdentity,
    pub documents: usize,
    pub updated_at: i64,
}

/// Whether `storage_dir` holds a built index.
pub fn index_exists(storage_dir: &Path) -> bool {
    db::index_db_path(storage_dir).is_file()
}

/// Map chunks to indexed documents and build the index at `storage_dir`.
///
/// Chunks with empty text are dropped before embedding.
pub async fn build_index<'e>(
    chunks: &[Chunk],
    embedder: &'e dyn EmbeddingProvider,
    storage_dir: &Path,
    batch_size: usize,
    progress: &dyn BuildProgressReporter,
) -> Result<(SqliteIndex<'e>, BuildStats)> {
    let documents: Vec<IndexedDocument> = chunks
        .iter()
        .filter(|c| !c.text.trim().is_empty())
        .map(IndexedDocument::from)
        .collect();

    SqliteIndex::build(&documents, embedder, storage_dir, batch_size, progress).await
}

/// SQLite-backed [`VectorIndex`].
pub struct SqliteIndex<'e> {
    pool: SqlitePool,
    embedder: &'e dyn EmbeddingProvider,
    identity: EmbeddingIdentity,
}

impl<'e> SqliteIndex<'e> {
    /// Embed `documents` and persist them under `storage_dir`, merging with
    /// any index already there.
    pub async fn build(
        documents: &[IndexedDocument],
        embedder: &'e dyn EmbeddingProvider,
        storage_dir: &Path,
        batch_size: usize,
        progress: &dyn BuildProgressReporter,
    ) -> Result<(Self, BuildStats)> {
        let pool = db::connect(storage_dir, true).await?;
        migrate::run_migrations(&pool).await?;

        let identity = embedder.identity();
        record_identity(&pool, &identity).await?;

        let index = Self {
            pool,
            embedder,
            identity,
        };
        let stats = index.add(documents, batch_size, progress).await?;
        tracing::info!(
            storage = %storage_dir.display(),
            model = %index.identity,
            documents = stats.documents,
            embedded = stats.embedded,
            unchanged = stats.unchanged,
            total = stats.total,
            "index built"
        );
        Ok((index, stats))
    }

    /// Reload a persisted index. The embedder must match the identity the
    /// index was built with.
    pub async fn load(storage_dir: &Path, embedder: &'e dyn EmbeddingProvider) -> Result<Self> {
        if !index_exists(storage_dir) {
            bail!(
                "No index found in {}. Run `ragchat build` first.",
                storage_dir.display()
            );
        }

        let pool = db::connect(storage_dir, false).await?;
        let stored = read_identity(&pool)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Index in {} is incomplete", storage_dir.display()))?;

        let identity = embedder.identity();
        if stored != identity {
            bail!(
                "Index in {} was built with {}, but the configured embedding model is {}. \
                 Rebuild the index or switch the embedding model back.",
                storage_dir.display(),
                stored,
                identity
            );
        }

        Ok(Self {
            pool,
            embedder,
            identity,
        })
    }

    /// Number of documents stored.
    pub async fn len(&self) -> Result<usize> {
        count_nodes(&self.pool).await
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl<'e> VectorIndex for SqliteIndex<'e> {
    fn identity(&self) -> &EmbeddingIdentity {
        &self.identity
    }

    async fn add(
        &self,
        documents: &[IndexedDocument],
        batch_size: usize,
        progress: &dyn BuildProgressReporter,
    ) -> Result<BuildStats> {
        let pool = &self.pool;
        let mut pending = Vec::new();
        let mut unchanged = 0usize;
        for doc in documents {
            let hash = text_hash(&doc.text);
            if stored_hash(pool, &doc.metadata).await?.as_deref() == Some(hash.as_str()) {
                unchanged += 1;
            } else {
                pending.push((doc, hash));
            }
        }

        let total_pending = pending.len() as u64;
        let mut embedded = 0usize;
        progress.report(BuildProgressEvent::Embedding {
            n: 0,
            total: total_pending,
        });

        for batch in pending.chunks(batch_size.max(1)) {
            let texts: Vec<String> = batch.iter().map(|(doc, _)| doc.text.clone()).collect();
            let vectors = self
                .embedder
                .embed(&texts)
                .await
                .context("Embedding failed during index build")?;
            if vectors.len() != batch.len() {
                bail!(
                    "Embedding provider returned {} vectors for {} documents",
                    vectors.len(),
                    batch.len()
                );
            }

            let mut tx = pool.begin().await?;
            for ((doc, hash), vector) in batch.iter().zip(vectors.iter()) {
                sqlx::query(
                    r#"
                    INSERT INTO nodes (file_name, page_num, chunk_num, text, hash, embedding)
                    VALUES (?, ?, ?, ?, ?, ?)
                    ON CONFLICT(file_name, page_num, chunk_num) DO UPDATE SET
                        text = excluded.text,
                        hash = excluded.hash,
                        embedding = excluded.embedding
                    "#,
                )
                .bind(&doc.metadata.file_name)
                .bind(doc.metadata.page_num.map(i64::from))
                .bind(doc.metadata.chunk_num.map(i64::from))
                .bind(&doc.text)
                .bind(hash)
                .bind(vec_to_blob(vector))
                .execute(&mut *tx)
                .await?;
            }
            tx.commit().await?;

            embedded += batch.len();
            progress.report(BuildProgressEvent::Embedding {
                n: embedded as u64,
                total: total_pending,
            });
        }

        let total = count_nodes(pool).await?;
        progress.report(BuildProgressEvent::Persisted {
            stored: embedded as u64,
            skipped: unchanged as u64,
        });

        Ok(BuildStats {
            documents: documents.len(),
            embedded,
            unchanged,
            total,
        })
    }

    async fn query(&self, text: &str, top_k: usize) -> Result<Vec<RetrievedChunk>> {
        let query_vec = embed_query(self.embedder, text).await?;

        let rows = sqlx::query(
            "SELECT file_name, page_num, chunk_num, text, embedding FROM nodes ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut scored: Vec<RetrievedChunk> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                RetrievedChunk {
                    text: row.get("text"),
                    metadata: ChunkMetadata {
                        file_name: row.get("file_name"),
                        page_num: to_u32(row.get("page_num")),
                        chunk_num: to_u32(row.get("chunk_num")),
                    },
                    score: cosine_similarity(&query_vec, &blob_to_vec(&blob)),
                }
            })
            .collect();

        // Stable sort keeps insertion order among equal scores.
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(top_k);

        tracing::debug!(hits = scored.len(), top_k, "index query");
        Ok(scored)
    }
}

/// Read the summary of the index under `storage_dir`, if one exists.
pub async fn read_info(storage_dir: &Path) -> Result<Option<IndexInfo>> {
    if !index_exists(storage_dir) {
        return Ok(None);
    }
    let pool = db::connect(storage_dir, false).await?;
    let meta = sqlx::query("SELECT model, dims, updated_at FROM index_meta WHERE id = 1")
        .fetch_optional(&pool)
        .await?;
    let info = match meta {
        Some(row) => Some(IndexInfo {
            identity: EmbeddingIdentity {
                model: row.get("model"),
                dims: row.get::<i64, _>("dims") as usize,
            },
            documents: count_nodes(&pool).await?,
            updated_at: row.get("updated_at"),
        }),
        None => None,
    };
    pool.close().await;
    Ok(info)
}

fn text_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn to_u32(value: Option<i64>) -> Option<u32> {
    value.and_then(|v| u32::try_from(v).ok())
}

async fn read_identity(pool: &SqlitePool) -> Result<Option<EmbeddingIdentity>> {
    let row = sqlx::query("SELECT model, dims FROM index_meta WHERE id = 1")
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|r| EmbeddingIdentity {
        model: r.get("model"),
        dims: r.get::<i64, _>("dims") as usize,
    }))
}

async fn record_identity(pool: &SqlitePool, identity: &EmbeddingIdentity) -> Result<()> {
    let now = chrono::Utc::now().timestamp();

    if let Some(stored) = read_identity(pool).await? {
        if &stored != identity {
            bail!(
                "Existing index was built with {}, refusing to add vectors from {}. \
                 Delete the storage directory to rebuild with the new model.",
                stored,
                identity
            );
        }
        sqlx::query("UPDATE index_meta SET updated_at = ? WHERE id = 1")
            .bind(now)
            .execute(pool)
            .await?;
        return Ok(());
    }

    sqlx::query(
        "INSERT INTO index_meta (id, model, dims, created_at, updated_at) VALUES (1, ?, ?, ?, ?)",
    )
    .bind(&identity.model)
    .bind(identity.dims as i64)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

async fn stored_hash(pool: &SqlitePool, metadata: &ChunkMetadata) -> Result<Option<String>> {
    let (Some(file_name), Some(page_num), Some(chunk_num)) =
        (&metadata.file_name, metadata.page_num, metadata.chunk_num)
    else {
        return Ok(None);
    };

    let hash = sqlx::query_scalar(
        "SELECT hash FROM nodes WHERE file_name = ? AND page_num = ? AND chunk_num = ?",
    )
    .bind(file_name)
    .bind(i64::from(page_num))
    .bind(i64::from(chunk_num))
    .fetch_optional(pool)
    .await?;
    Ok(hash)
}

async fn count_nodes(pool: &SqlitePool) -> Result<usize> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM nodes")
        .fetch_one(pool)
        .await?;
    Ok(count as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Deterministic bag-of-letters embedder.
    struct LetterEmbedder {
        model: String,
        calls: AtomicUsize,
        embedded: AtomicUsize,
    }

    impl LetterEmbedder {
        fn new(model: &str) -> Self {
            Self {
                model: model.to_string(),
                calls: AtomicUsize::new(0),
                embedded: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl EmbeddingProvider for LetterEmbedder {
        fn model_name(&self) -> &str {
            &self.model
        }
        fn dims(&self) -> usize {
            26
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.embedded.fetch_add(texts.len(), Ordering::SeqCst);
            Ok(texts
                .iter()
                .map(|t| {
                    let mut v = vec![0.0f32; 26];
                    for c in t.to_ascii_lowercase().bytes().filter(u8::is_ascii_lowercase) {
                        v[(c - b'a') as usize] += 1.0;
                    }
                    v
                })
                .collect())
        }
    }

    fn chunk(file: &str, page: u32, num: u32, text: &str) -> Chunk {
        Chunk {
            file_name: file.to_string(),
            page_num: page,
            chunk_num: num,
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn test_build_and_query_top_1() {
        let tmp = tempfile::TempDir::new().unwrap();
        let storage = tmp.path().join("storage");
        let embedder = LetterEmbedder::new("letters");
        let chunks = vec![
            chunk("a.pdf", 1, 1, "zzzz zzz"),
            chunk("a.pdf", 2, 5, "aaaa bbbb"),
            chunk("b.pdf", 1, 1, "   "),
        ];

        let (index, stats) = build_index(&chunks, &embedder, &storage, 2, &NoProgress)
            .await
            .unwrap();
        assert_eq!(stats.documents, 2, "blank chunk must be filtered");
        assert_eq!(stats.embedded, 2);
        assert_eq!(stats.total, 2);
        assert!(index_exists(&storage));

        let hits = index.query("ab ab", 1).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].text, "aaaa bbbb");
        assert_eq!(
            hits[0].metadata,
            ChunkMetadata {
                file_name: Some("a.pdf".to_string()),
                page_num: Some(2),
                chunk_num: Some(5),
            }
        );
    }

    #[tokio::test]
    async fn test_reload_from_storage_alone() {
        let tmp = tempfile::TempDir::new().unwrap();
        let storage = tmp.path().join("storage");
        let embedder = LetterEmbedder::new("letters");
        let (index, _) = build_index(
            &[chunk("a.pdf", 1, 1, "xyz"), chunk("a.pdf", 1, 2, "abc")],
            &embedder,
            &storage,
            8,
            &NoProgress,
        )
        .await
        .unwrap();
        index.close().await;

        let reloaded = SqliteIndex::load(&storage, &embedder).await.unwrap();
        assert_eq!(reloaded.len().await.unwrap(), 2);
        let hits = reloaded.query("cab", 2).await.unwrap();
        assert_eq!(hits[0].metadata.chunk_num, Some(2));
        assert!(hits[0].score >= hits[1].score);
    }

    #[tokio::test]
    async fn test_load_missing_index_fails() {
        let tmp = tempfile::TempDir::new().unwrap();
        let embedder = LetterEmbedder::new("letters");
        let err = SqliteIndex::load(&tmp.path().join("storage"), &embedder)
            .await
            .err()
            .unwrap();
        assert!(err.to_string().contains("ragchat build"));
    }

    #[tokio::test]
    async fn test_model_mismatch_is_refused() {
        let tmp = tempfile::TempDir::new().unwrap();
        let storage = tmp.path().join("storage");
        let built_with = LetterEmbedder::new("letters-v1");
        let (index, _) = build_index(
            &[chunk("a.pdf", 1, 1, "abc")],
            &built_with,
            &storage,
            8,
            &NoProgress,
        )
        .await
        .unwrap();
        index.close().await;

        let other = LetterEmbedder::new("letters-v2");
        let err = SqliteIndex::load(&storage, &other).await.err().unwrap();
        assert!(err.to_string().contains("letters-v1"));

        let err = build_index(&[chunk("a.pdf", 1, 1, "abc")], &other, &storage, 8, &NoProgress)
            .await
            .err()
            .unwrap();
        assert!(err.to_string().contains("refusing"));
    }

    #[tokio::test]
    async fn test_rebuild_merges_and_skips_unchanged() {
        let tmp = tempfile::TempDir::new().unwrap();
        let storage = tmp.path().join("storage");
        let embedder = LetterEmbedder::new("letters");

        let first = vec![chunk("a.pdf", 1, 1, "abc"), chunk("a.pdf", 1, 2, "def")];
        let (index, _) = build_index(&first, &embedder, &storage, 8, &NoProgress)
            .await
            .unwrap();
        index.close().await;
        assert_eq!(embedder.embedded.load(Ordering::SeqCst), 2);

        // Same address with new text replaces; unchanged text is not re-embedded;
        // a new file is added; old addresses not in the batch remain.
        let second = vec![chunk("a.pdf", 1, 1, "abc"), chunk("b.pdf", 1, 1, "ghi")];
        let (index, stats) = build_index(&second, &embedder, &storage, 8, &NoProgress)
            .await
            .unwrap();
        assert_eq!(stats.unchanged, 1);
        assert_eq!(stats.embedded, 1);
        assert_eq!(stats.total, 3);
        assert_eq!(embedder.embedded.load(Ordering::SeqCst), 3);

        let third = vec![chunk("a.pdf", 1, 2, "xyz")];
        index.close().await;
        let (index, stats) = build_index(&third, &embedder, &storage, 8, &NoProgress)
            .await
            .unwrap();
        assert_eq!(stats.total, 3);
        let hits = index.query("xyz", 1).await.unwrap();
        assert_eq!(hits[0].text, "xyz");
        assert_eq!(hits[0].metadata.chunk_num, Some(2));
    }

    #[tokio::test]
    async fn test_batches_respect_batch_size() {
        let tmp = tempfile::TempDir::new().unwrap();
        let embedder = LetterEmbedder::new("letters");
        let chunks: Vec<Chunk> = (1..=5).map(|i| chunk("a.pdf", 1, i, "abc")).collect();
        build_index(&chunks, &embedder, &tmp.path().join("s"), 2, &NoProgress)
            .await
            .unwrap();
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_read_info() {
        let tmp = tempfile::TempDir::new().unwrap();
        let storage = tmp.path().join("storage");
        assert!(read_info(&storage).await.unwrap().is_none());

        let embedder = LetterEmbedder::new("letters");
        let (index, _) = build_index(&[chunk("a.pdf", 1, 1, "abc")], &embedder, &storage, 8, &NoProgress)
            .await
            .unwrap();
        index.close().await;

        let info = read_info(&storage).await.unwrap().unwrap();
        assert_eq!(info.identity, embedder.identity());
        assert_eq!(info.documents, 1);
    }

    #[tokio::test]
    async fn test_add_to_loaded_index() {
        let tmp = tempfile::TempDir::new().unwrap();
        let storage = tmp.path().join("storage");
        let embedder = LetterEmbedder::new("letters");
        let (index, _) = build_index(&[chunk("a.pdf", 1, 1, "abc")], &embedder, &storage, 8, &NoProgress)
            .await
            .unwrap();
        index.close().await;

        let index = SqliteIndex::load(&storage, &embedder).await.unwrap();
        let doc = IndexedDocument::from(&chunk("c.pdf", 4, 2, "qqq rrr"));
        let stats = index.add(&[doc], 8, &NoProgress).await.unwrap();
        assert_eq!(stats.embedded, 1);
        assert_eq!(stats.total, 2);

        let hits = index.query("qr", 1).await.unwrap();
        assert_eq!(hits[0].metadata.file_name.as_deref(), Some("c.pdf"));
        assert_eq!(hits[0].metadata.page_num, Some(4));
    }
}
