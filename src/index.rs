//! Flat in-memory vector index with nearest-neighbor search.
//!
//! Vectors live in a slot-addressed table; a position table maps each slot
//! back to its record id and an id-keyed docstore holds the chunk payloads.
//! The index is append-only: changed documents are represented by inserting
//! new chunks, stale chunks are never removed.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::document::Chunk;
use crate::errors::ChatbotError;

/// Index handle shared between the ingestion pipeline (writer) and the
/// retrieval tool (reader).
pub type SharedIndex = Arc<tokio::sync::RwLock<VectorIndex>>;

/// Distance metric, fixed once at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    SquaredL2,
    Cosine,
}

pub struct VectorIndex {
    dimension: usize,
    metric: DistanceMetric,
    vectors: Vec<Vec<f32>>,
    slot_to_id: Vec<String>,
    docstore: HashMap<String, Chunk>,
}

impl VectorIndex {
    pub fn new(dimension: usize, metric: DistanceMetric) -> Result<Self, ChatbotError> {
        if dimension == 0 {
            return Err(ChatbotError::Configuration(
                "index dimension must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            dimension,
            metric,
            vectors: Vec::new(),
            slot_to_id: Vec::new(),
            docstore: HashMap::new(),
        })
    }

    pub fn into_shared(self) -> SharedIndex {
        Arc::new(tokio::sync::RwLock::new(self))
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Append records and return their assigned ids in input order.
    ///
    /// Existing records are never overwritten. All vectors are checked
    /// against the configured dimension before anything is appended, so a
    /// mismatch mid-batch cannot leave a partial insertion behind.
    pub fn insert(
        &mut self,
        records: Vec<(Chunk, Vec<f32>)>,
    ) -> Result<Vec<String>, ChatbotError> {
        for (_, vector) in &records {
            self.check_dimension(vector)?;
        }

        let mut ids = Vec::with_capacity(records.len());
        for (chunk, vector) in records {
            let id = Uuid::new_v4().to_string();
            self.vectors.push(vector);
            self.slot_to_id.push(id.clone());
            self.docstore.insert(id.clone(), chunk);
            ids.push(id);
        }
        Ok(ids)
    }

    /// Return up to `k` nearest records, ascending by distance.
    ///
    /// Ties are broken by insertion order (earlier insertion wins). When the
    /// index holds fewer than `k` records, all of them are returned.
    pub fn search(
        &self,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<(Chunk, f32)>, ChatbotError> {
        self.check_dimension(query)?;

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(slot, vector)| (slot, self.distance(query, vector)))
            .collect();
        // Stable sort keeps insertion order among equal distances.
        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
        scored.truncate(k);

        let mut results = Vec::with_capacity(scored.len());
        for (slot, distance) in scored {
            let id = &self.slot_to_id[slot];
            let chunk = self.docstore.get(id).ok_or_else(|| {
                ChatbotError::Retrieval(format!("docstore entry missing for id {id}"))
            })?;
            results.push((chunk.clone(), distance));
        }
        Ok(results)
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<(), ChatbotError> {
        if vector.len() != self.dimension {
            return Err(ChatbotError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        Ok(())
    }

    fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self.metric {
            DistanceMetric::SquaredL2 => a
                .iter()
                .zip(b.iter())
                .map(|(x, y)| (x - y) * (x - y))
                .sum(),
            DistanceMetric::Cosine => 1.0 - cosine_similarity(a, b),
        }
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    let denom = norm_a * norm_b;
    if denom <= f32::EPSILON {
        return 0.0;
    }
    dot / denom
}
