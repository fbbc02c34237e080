//! GraphGateway and GraphSession traits: the unified interface for remote and embedded stores

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::GatewayResult;
use crate::models::{AccessMode, Cursor, Statement, WriteSummary};

/// Owner of the connection factory for one graph store.
///
/// Implemented by:
/// - `RemoteGateway`: HTTP transactional endpoint of a running Cypher store
/// - `EmbeddedGateway`: in-process store for tests and dry runs
///
/// A gateway is constructed once and shared by reference (`Arc<dyn GraphGateway>`)
/// with every component that talks to the store.
#[async_trait]
pub trait GraphGateway: Send + Sync {
    /// Open a session in the given access mode
    async fn session(&self, mode: AccessMode) -> GatewayResult<Arc<dyn GraphSession>>;

    /// Check that the store is reachable and accepts our credentials
    async fn verify_connectivity(&self) -> GatewayResult<()>;
}

/// A logical session on the store. Safe to share between tasks.
#[async_trait]
pub trait GraphSession: Send + Sync {
    /// Run a statement inside a managed write transaction.
    ///
    /// Commits on success. Transient failures are retried by the implementation;
    /// anything else rolls back and is returned.
    async fn run_write(&self, statement: &Statement) -> GatewayResult<WriteSummary>;

    /// Run a read-only statement and return its rows
    async fn run_read(&self, statement: &Statement) -> GatewayResult<Cursor>;

    /// Close the session. Further calls fail with `SessionClosed`.
    async fn close(&self) -> GatewayResult<()>;
}
