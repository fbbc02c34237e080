//! Bounded breadth-first shortest path over remote adjacency queries
//!
//! Each expansion asks the store for the outbound neighbors of one node, passing
//! the visited set along so the store filters them out. Nodes at the depth cap
//! are never expanded; when the frontier runs dry the answer is `BoundExceeded`.

use serde::Serialize;
use smallworld_sdk::{AccessMode, GatewayError, GraphGateway, GraphSession};
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::ingest::AuditLog;
use crate::query::{self, QueryError};

/// Deepest hop count explored (six degrees)
pub const DEFAULT_DEPTH_CAP: u32 = 6;

/// Column the neighbor query returns
const NEIGHBOR_COLUMN: &str = "neighborID";

/// Path finding errors. A missing path is not an error, see [`PathOutcome`].
#[derive(Error, Debug)]
pub enum PathError {
    #[error("Cannot open read session: {0}")]
    Session(#[source] GatewayError),

    #[error("Adjacency query failed at {node}: {source}")]
    Read {
        node: String,
        #[source]
        source: GatewayError,
    },

    #[error(transparent)]
    Query(#[from] QueryError),
}

pub type PathResult<T> = Result<T, PathError>;

/// Result of a bounded search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PathOutcome {
    /// Target reached after this many hops
    Found(u32),
    /// Target not reached within the depth cap
    BoundExceeded,
}

impl PathOutcome {
    /// Hop count, with `cap` standing in for `BoundExceeded`
    pub fn hops(self, cap: u32) -> u32 {
        match self {
            PathOutcome::Found(h) => h,
            PathOutcome::BoundExceeded => cap,
        }
    }

    pub fn is_found(self) -> bool {
        matches!(self, PathOutcome::Found(_))
    }
}

#[derive(Debug, Clone)]
pub struct PathConfig {
    pub label: String,
    pub relationship_type: String,
    pub depth_cap: u32,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            label: "Person".to_string(),
            relationship_type: "KNOWS".to_string(),
            depth_cap: DEFAULT_DEPTH_CAP,
        }
    }
}

/// Shortest-path finder bound to one gateway.
///
/// Holds no per-search state, so concurrent calls are safe; they are not
/// coordinated with each other.
pub struct PathFinder {
    gateway: Arc<dyn GraphGateway>,
    config: PathConfig,
    audit: Option<Arc<AuditLog>>,
    queries: AtomicU64,
}

impl PathFinder {
    pub fn new(gateway: Arc<dyn GraphGateway>, config: PathConfig) -> Self {
        Self {
            gateway,
            config,
            audit: None,
            queries: AtomicU64::new(0),
        }
    }

    /// Also record "path not found" events in `audit`
    pub fn with_audit(mut self, audit: Arc<AuditLog>) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn depth_cap(&self) -> u32 {
        self.config.depth_cap
    }

    pub(crate) fn audit(&self) -> Option<&AuditLog> {
        self.audit.as_deref()
    }

    /// Adjacency queries issued so far by this finder
    pub fn queries_issued(&self) -> u64 {
        self.queries.load(Ordering::Relaxed)
    }

    /// Hop distance from `source` to `target` along outbound edges, up to the depth cap.
    ///
    /// A read failure aborts the search; the distance is then unknown, which is not
    /// the same thing as `BoundExceeded`.
    pub async fn shortest_path(&self, source: &str, target: &str) -> PathResult<PathOutcome> {
        if source == target {
            return Ok(PathOutcome::Found(0));
        }

        let session = self
            .gateway
            .session(AccessMode::Read)
            .await
            .map_err(PathError::Session)?;
        let outcome = self.search(session.as_ref(), source, target).await;
        if let Err(e) = session.close().await {
            warn!("Closing read session failed: {}", e);
        }

        let outcome = outcome?;
        if outcome == PathOutcome::BoundExceeded {
            debug!(
                "No path from {} to {} within {} hops",
                source, target, self.config.depth_cap
            );
            if let Some(audit) = &self.audit {
                audit.record(format!("path not found: {} -> {}", source, target));
            }
        }
        Ok(outcome)
    }

    async fn search(&self, session: &dyn GraphSession, source: &str, target: &str) -> PathResult<PathOutcome> {
        let cap = self.config.depth_cap;
        let mut frontier: VecDeque<(String, u32)> = VecDeque::from([(source.to_string(), 0)]);
        let mut visited: HashSet<String> = HashSet::from([source.to_string()]);

        while let Some((node, depth)) = frontier.pop_front() {
            if node == target {
                return Ok(PathOutcome::Found(depth));
            }
            if depth >= cap {
                continue;
            }

            let statement = query::outbound_neighbors(
                &self.config.label,
                &self.config.relationship_type,
                &node,
                &visited,
            )?;
            self.queries.fetch_add(1, Ordering::Relaxed);
            let cursor = session
                .run_read(&statement)
                .await
                .map_err(|source| PathError::Read {
                    node: node.clone(),
                    source,
                })?;

            for record in cursor {
                match record.get_str(NEIGHBOR_COLUMN) {
                    Some(neighbor) => {
                        if visited.insert(neighbor.to_string()) {
                            frontier.push_back((neighbor.to_string(), depth + 1));
                        }
                    }
                    None => warn!(
                        "Skipping neighbor of {} without a string ID: {:?}",
                        node,
                        record.get(NEIGHBOR_COLUMN)
                    ),
                }
            }
        }

        Ok(PathOutcome::BoundExceeded)
    }
}
