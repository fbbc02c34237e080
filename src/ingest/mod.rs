//! Bulk ingestion of entities and relationships
//!
//! `BulkWriter` fans record writes out over a bounded number of concurrent
//! transactions and records every outcome in an `AuditLog`. A failed record never
//! stops the rest of its batch; the caller gets a `BatchSummary` instead of an error.

pub mod audit;
pub mod writer;

use serde::Serialize;
use std::time::Duration;

pub use audit::{AuditError, AuditLog, AuditResult};
pub use writer::{BulkWriter, WriterConfig};

/// A record that could not be written
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WriteFailure {
    /// Entity ID, or `source -> target` for relationships
    pub key: String,
    /// Diagnostic from the statement builder or the store
    pub message: String,
}

/// Outcome of one `write_batch` / `write_links` call
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    /// Records submitted
    pub attempted: usize,
    /// Records whose transaction committed
    pub succeeded: usize,
    /// Committed records that changed nothing (already present, or a
    /// relationship whose endpoints do not exist yet)
    pub unchanged: usize,
    pub failed: Vec<WriteFailure>,
    #[serde(with = "duration_ms")]
    pub elapsed: Duration,
}

impl BatchSummary {
    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    /// Every submitted record committed
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.succeeded == self.attempted
    }
}

mod duration_ms {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }
}
