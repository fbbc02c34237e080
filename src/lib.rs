//! smallworld: bulk graph ingestion and bounded shortest-path statistics
//!
//! Loads a people dataset into a Cypher property-graph store and measures how far
//! apart people are, to test the six-degrees-of-separation hypothesis.
//!
//! # Components
//!
//! - `loader`: reads the attribute directory and the link file
//! - `query`: builds every statement sent to the store
//! - `ingest`: bounded-concurrency bulk writer with audit logs
//! - `algo`: bounded BFS path finder, aggregate statistics, pair selection
//! - `report`: verdict over the collected statistics
//! - `config`: YAML configuration
//!
//! The store is reached through `smallworld_sdk::GraphGateway`, either remote or
//! embedded.
//!
//! ## Example Usage
//!
//! ```rust
//! use smallworld::algo::{PathConfig, PathFinder, PathOutcome};
//! use smallworld::ingest::{BulkWriter, WriterConfig};
//! use smallworld::model::{EntityRecord, RelationshipRecord};
//! use smallworld_sdk::EmbeddedGateway;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let logs = tempfile::tempdir().unwrap();
//! let gateway = Arc::new(EmbeddedGateway::new());
//!
//! let writer = BulkWriter::open(
//!     gateway.clone(),
//!     WriterConfig::default(),
//!     logs.path().join("person.txt"),
//!     logs.path().join("link.txt"),
//! ).unwrap();
//!
//! let people = ["A", "B", "C"]
//!     .iter()
//!     .map(|id| EntityRecord::new(*id).with("name", *id))
//!     .collect();
//! writer.write_batch("Person", people).await;
//! writer.write_links(vec![
//!     RelationshipRecord::new("A", "B"),
//!     RelationshipRecord::new("B", "C"),
//! ]).await;
//!
//! let finder = PathFinder::new(gateway, PathConfig::default());
//! assert_eq!(finder.shortest_path("A", "C").await.unwrap(), PathOutcome::Found(2));
//! # }
//! ```

#![warn(clippy::all)]

pub mod algo;
pub mod config;
pub mod ingest;
pub mod loader;
pub mod model;
pub mod query;
pub mod report;

pub use algo::{
    AggregateStats, ExclusionPolicy, PathConfig, PathError, PathFinder, PathOutcome,
    PathStatistics, StatsConfig,
};
pub use config::{Config, ConfigError};
pub use ingest::{AuditLog, BatchSummary, BulkWriter, WriteFailure, WriterConfig};
pub use loader::{load_entities, load_identifiers, load_relationships, LoadError};
pub use model::{EntityRecord, RelationshipRecord};
pub use query::QueryError;
pub use report::PathReport;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
