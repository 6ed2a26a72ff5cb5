//! Persistent embedding cache
//!
//! SQLite table keyed by (text hash, model name). Avoids re-calling the
//! embedding service for catalog texts and repeated queries.

use crate::embedding::{Embedder, Embedding};
use crate::error::{FindabilityError, Result};
use rusqlite::{params, Connection};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;

/// Embedding cache backed by SQLite
pub struct EmbeddingCache {
    conn: Connection,
    model_name: String,
}

impl EmbeddingCache {
    /// Open (or create) a cache at the given path
    pub fn new(db_path: &Path, model_name: impl Into<String>) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        Self::with_connection(conn, model_name.into())
    }

    /// In-memory cache, dropped with the process
    pub fn in_memory(model_name: impl Into<String>) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn, model_name.into())
    }

    fn with_connection(conn: Connection, model_name: String) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS embeddings (
                id INTEGER PRIMARY KEY,
                text_hash TEXT NOT NULL,
                model_name TEXT NOT NULL,
                embedding BLOB NOT NULL,
                dimension INTEGER NOT NULL,
                created_at INTEGER NOT NULL,
                UNIQUE(text_hash, model_name)
            )",
            [],
        )?;

        Ok(Self { conn, model_name })
    }

    fn hash_text(text: &str) -> String {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        format!("{:x}", hasher.finish())
    }

    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|&f| f.to_le_bytes()).collect()
    }

    fn deserialize_embedding(bytes: &[u8]) -> Result<Embedding> {
        if bytes.len() % 4 != 0 {
            return Err(FindabilityError::corrupt(format!(
                "cached embedding blob has {} bytes, not a multiple of 4",
                bytes.len()
            )));
        }

        Ok(bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect())
    }

    /// Get an embedding from the cache
    pub fn get(&self, text: &str) -> Result<Option<Embedding>> {
        let text_hash = Self::hash_text(text);

        let mut stmt = self.conn.prepare(
            "SELECT embedding FROM embeddings
             WHERE text_hash = ?1 AND model_name = ?2",
        )?;

        let result = stmt.query_row(params![text_hash, self.model_name], |row| {
            row.get::<_, Vec<u8>>(0)
        });

        match result {
            Ok(bytes) => Ok(Some(Self::deserialize_embedding(&bytes)?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Store an embedding in the cache
    pub fn put(&self, text: &str, embedding: &[f32]) -> Result<()> {
        let created_at = chrono::Utc::now().timestamp();

        self.conn.execute(
            "INSERT OR REPLACE INTO embeddings
             (text_hash, model_name, embedding, dimension, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                Self::hash_text(text),
                self.model_name,
                Self::serialize_embedding(embedding),
                embedding.len() as i64,
                created_at
            ],
        )?;

        Ok(())
    }

    /// Get a cached embedding or compute it with `embedder` and store it
    pub fn get_or_embed(&self, text: &str, embedder: &dyn Embedder) -> Result<Embedding> {
        if let Some(embedding) = self.get(text)? {
            if embedding.len() == embedder.dimension() {
                tracing::debug!("Cache hit for text: {}", preview(text));
                return Ok(embedding);
            }
            tracing::warn!(
                "Cached embedding has dimension {}, embedder produces {}; recomputing",
                embedding.len(),
                embedder.dimension()
            );
        }

        tracing::debug!("Cache miss for text: {}", preview(text));
        let embedding = embedder.embed(text)?;
        self.put(text, &embedding)?;

        Ok(embedding)
    }

    /// Number of entries stored for this cache's model
    pub fn len(&self) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM embeddings WHERE model_name = ?1",
            params![self.model_name],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

fn preview(text: &str) -> String {
    text.chars().take(50).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{EmbeddingConfig, MockEmbedder};
    use tempfile::NamedTempFile;

    #[test]
    fn test_cache_put_get() {
        let temp_file = NamedTempFile::new().unwrap();
        let cache = EmbeddingCache::new(temp_file.path(), "test-model").unwrap();

        let embedding = vec![1.0, 2.0, 3.0];
        assert!(cache.get("Hello, world!").unwrap().is_none());

        cache.put("Hello, world!", &embedding).unwrap();

        let retrieved = cache.get("Hello, world!").unwrap().unwrap();
        assert_eq!(retrieved, embedding);
    }

    #[test]
    fn test_cache_is_per_model() {
        let temp_file = NamedTempFile::new().unwrap();
        let a = EmbeddingCache::new(temp_file.path(), "model-a").unwrap();
        a.put("text", &[1.0, 2.0]).unwrap();

        let b = EmbeddingCache::new(temp_file.path(), "model-b").unwrap();
        assert!(b.get("text").unwrap().is_none());
        assert!(b.is_empty().unwrap());
        assert_eq!(a.len().unwrap(), 1);
    }

    #[test]
    fn test_get_or_embed() {
        let cache = EmbeddingCache::in_memory("mock").unwrap();
        let embedder = MockEmbedder::new(EmbeddingConfig::default(), 8);

        let first = cache.get_or_embed("pump seal", &embedder).unwrap();
        assert_eq!(cache.len().unwrap(), 1);

        let second = cache.get_or_embed("pump seal", &embedder).unwrap();
        assert_eq!(first, second);
        assert_eq!(cache.len().unwrap(), 1);
    }

    #[test]
    fn test_get_or_embed_recomputes_on_dimension_change() {
        let cache = EmbeddingCache::in_memory("mock").unwrap();
        cache.put("pump seal", &[1.0, 2.0]).unwrap();

        let embedder = MockEmbedder::new(EmbeddingConfig::default(), 8);
        let embedding = cache.get_or_embed("pump seal", &embedder).unwrap();
        assert_eq!(embedding.len(), 8);
    }
}
