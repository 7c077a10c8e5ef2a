//! Index/registry reconciliation check.
//!
//! The two-phase ingestion write (chunks, then record) can leave the stores
//! disagreeing if the second phase fails. This check makes that drift
//! visible: it compares per-source chunk counts in the index against the
//! `chunk_count` each document record claims, in both directions. Repair is
//! a re-upload or delete of the affected filename; the check itself never
//! mutates anything.

use crate::error::IndexError;
use crate::index::EmbeddingIndex;
use crate::registry::DocumentRegistry;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum ConsistencyStatus {
    Healthy,
    Drifted,
}

/// One source whose index and registry views disagree.
#[derive(Debug, Clone, Serialize)]
pub struct SourceDrift {
    pub source: String,
    /// Chunks actually present in the index for this source.
    pub indexed_chunks: u64,
    /// `chunk_count` from the document record, or `None` when the chunks are
    /// orphaned (no record at all).
    pub recorded_chunks: Option<u64>,
}

/// Result of one reconciliation pass.
#[derive(Debug, Clone, Serialize)]
pub struct ConsistencyReport {
    pub status: ConsistencyStatus,
    pub checked_at: DateTime<Utc>,
    pub sources_checked: usize,
    pub drifts: Vec<SourceDrift>,
}

impl ConsistencyReport {
    pub fn is_healthy(&self) -> bool {
        self.status == ConsistencyStatus::Healthy
    }
}

/// Compares the index against the registry and reports every source where
/// the chunk counts disagree.
pub async fn check_consistency(
    index: &EmbeddingIndex,
    registry: &DocumentRegistry,
) -> Result<ConsistencyReport, IndexError> {
    let indexed: BTreeMap<String, u64> = index.chunk_counts_by_source().await?.into_iter().collect();
    let records = registry.list().await?;

    let mut drifts = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for record in &records {
        seen.insert(record.filename.clone());
        let indexed_chunks = indexed.get(&record.filename).copied().unwrap_or(0);
        if indexed_chunks != record.chunk_count as u64 {
            drifts.push(SourceDrift {
                source: record.filename.clone(),
                indexed_chunks,
                recorded_chunks: Some(record.chunk_count as u64),
            });
        }
    }

    // Chunks with no document record: the orphan case the two-phase write
    // can produce.
    for (source, count) in &indexed {
        if !seen.contains(source) {
            drifts.push(SourceDrift {
                source: source.clone(),
                indexed_chunks: *count,
                recorded_chunks: None,
            });
        }
    }

    let sources_checked = seen.len() + drifts.iter().filter(|d| d.recorded_chunks.is_none()).count();
    let status = if drifts.is_empty() {
        ConsistencyStatus::Healthy
    } else {
        tracing::warn!(drifts = drifts.len(), "index/registry drift detected");
        ConsistencyStatus::Drifted
    };

    Ok(ConsistencyReport {
        status,
        checked_at: Utc::now(),
        sources_checked,
        drifts,
    })
}
