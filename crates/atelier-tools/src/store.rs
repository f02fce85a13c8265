use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::{params, Connection};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("chunk store database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("chunk store connection poisoned")]
    Poisoned,
}

/// One embedded passage of a product technical sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// Source document filename, e.g. "7021.pdf".
    pub doc_id: String,
    pub content: String,
}

/// SQLite-backed chunk store with brute-force cosine retrieval.
///
/// Embeddings are stored as little-endian f32 blobs. The corpus is a few
/// hundred technical sheets, so a full scan per query is fast enough and
/// avoids an index dependency.
pub struct SqliteChunkStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteChunkStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS chunks (
                id INTEGER PRIMARY KEY,
                doc_id TEXT NOT NULL,
                content TEXT NOT NULL,
                embedding BLOB NOT NULL
            );",
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn insert(&self, doc_id: &str, content: &str, embedding: &[f32]) -> Result<(), StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        conn.execute(
            "INSERT INTO chunks (doc_id, content, embedding) VALUES (?1, ?2, ?3)",
            params![doc_id, content, encode(embedding)],
        )?;
        Ok(())
    }

    /// Returns the `k` chunks most similar to the query vector, best
    /// first, with their cosine scores.
    pub fn top_k(&self, query: &[f32], k: usize) -> Result<Vec<(Chunk, f32)>, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let mut stmt = conn.prepare("SELECT doc_id, content, embedding FROM chunks")?;

        let mut scored: Vec<(Chunk, f32)> = stmt
            .query_map([], |row| {
                let doc_id: String = row.get(0)?;
                let content: String = row.get(1)?;
                let blob: Vec<u8> = row.get(2)?;
                Ok((Chunk { doc_id, content }, decode(&blob)))
            })?
            .filter_map(|r| r.ok())
            .map(|(chunk, embedding)| {
                let score = cosine(query, &embedding);
                (chunk, score)
            })
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);
        Ok(scored)
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}

fn encode(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn decode(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_round_trip() {
        let v = vec![0.25_f32, -1.5, 3.0];
        assert_eq!(decode(&encode(&v)), v);
    }

    #[test]
    fn test_cosine_bounds() {
        let a = vec![1.0_f32, 0.0];
        let b = vec![0.0_f32, 1.0];
        assert!((cosine(&a, &a) - 1.0).abs() < 1e-6);
        assert!(cosine(&a, &b).abs() < 1e-6);
        assert_eq!(cosine(&a, &[]), 0.0);
    }

    #[test]
    fn test_top_k_orders_by_similarity() {
        let store = SqliteChunkStore::open_in_memory().unwrap();
        store.insert("7021.pdf", "linen shirt care", &[1.0, 0.0]).unwrap();
        store.insert("7022.pdf", "denim jacket sizing", &[0.0, 1.0]).unwrap();
        store.insert("7023.pdf", "silk coat blend", &[0.9, 0.1]).unwrap();

        let hits = store.top_k(&[1.0, 0.0], 2).unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].0.doc_id, "7021.pdf");
        assert_eq!(hits[1].0.doc_id, "7023.pdf");
        assert!(hits[0].1 >= hits[1].1);
    }

    #[test]
    fn test_empty_store() {
        let store = SqliteChunkStore::open_in_memory().unwrap();
        assert!(store.is_empty().unwrap());
        assert!(store.top_k(&[1.0], 5).unwrap().is_empty());
    }
}
