//! Shared fixtures: seeded embedded stores and an instrumented gateway
#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use smallworld::{BulkWriter, EntityRecord, RelationshipRecord, WriterConfig};
use smallworld_sdk::{
    AccessMode, Cursor, EmbeddedGateway, GatewayError, GatewayResult, GraphGateway, GraphSession,
    Statement, WriteSummary,
};
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub fn people(ids: &[&str]) -> Vec<EntityRecord> {
    ids.iter()
        .map(|id| EntityRecord::new(*id).with("name", format!("person {}", id)))
        .collect()
}

pub fn links(edges: &[(&str, &str)]) -> Vec<RelationshipRecord> {
    edges
        .iter()
        .map(|(a, b)| RelationshipRecord::new(*a, *b))
        .collect()
}

pub fn writer(gateway: Arc<dyn GraphGateway>, concurrency: usize, dir: &Path) -> BulkWriter {
    let config = WriterConfig {
        concurrency,
        ..WriterConfig::default()
    };
    BulkWriter::open(
        gateway,
        config,
        dir.join("create_person.txt"),
        dir.join("create_link.txt"),
    )
    .unwrap()
}

/// Embedded store holding `Person` nodes `ids` and `KNOWS` edges `edges`
pub async fn seeded(ids: &[&str], edges: &[(&str, &str)]) -> (EmbeddedGateway, TempDir) {
    let dir = TempDir::new().unwrap();
    let gateway = EmbeddedGateway::new();
    let w = writer(Arc::new(gateway.clone()), 4, dir.path());
    assert!(w.write_batch("Person", people(ids)).await.is_complete());
    assert!(w.write_links(links(edges)).await.is_complete());
    (gateway, dir)
}

/// Numbered chain `1 -> 2 -> ... -> n`
pub fn chain(n: usize) -> (Vec<String>, Vec<(String, String)>) {
    let ids: Vec<String> = (1..=n).map(|i| i.to_string()).collect();
    let edges = ids.windows(2).map(|w| (w[0].clone(), w[1].clone())).collect();
    (ids, edges)
}

/// Behavior and counters of a [`ProbeGateway`]
#[derive(Default)]
pub struct Probe {
    /// Time each write holds its slot
    pub write_delay: Duration,
    /// Writes whose `ID`/`aID` parameter is listed here fail
    pub fail_writes: HashSet<String>,
    /// Reads whose `currentID` parameter is listed here fail
    pub fail_reads: HashSet<String>,
    pub fail_session: bool,
    pub fail_close: bool,

    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub open_sessions: AtomicUsize,
    pub max_open_sessions: AtomicUsize,
    pub writes: AtomicUsize,
}

impl Probe {
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn max_open_sessions(&self) -> usize {
        self.max_open_sessions.load(Ordering::SeqCst)
    }
}

/// Gateway over an embedded store that counts concurrency and injects failures
pub struct ProbeGateway {
    pub inner: EmbeddedGateway,
    pub probe: Arc<Probe>,
}

impl ProbeGateway {
    pub fn new(inner: EmbeddedGateway, probe: Probe) -> Arc<Self> {
        Arc::new(Self {
            inner,
            probe: Arc::new(probe),
        })
    }
}

fn param_str(statement: &Statement, names: &[&str]) -> String {
    names
        .iter()
        .find_map(|n| statement.get(n).and_then(Value::as_str))
        .unwrap_or_default()
        .to_string()
}

#[async_trait]
impl GraphGateway for ProbeGateway {
    async fn session(&self, mode: AccessMode) -> GatewayResult<Arc<dyn GraphSession>> {
        if self.probe.fail_session {
            return Err(GatewayError::Connection("store unavailable".to_string()));
        }
        let open = self.probe.open_sessions.fetch_add(1, Ordering::SeqCst) + 1;
        self.probe.max_open_sessions.fetch_max(open, Ordering::SeqCst);
        Ok(Arc::new(ProbeSession {
            inner: self.inner.session(mode).await?,
            probe: Arc::clone(&self.probe),
        }))
    }

    async fn verify_connectivity(&self) -> GatewayResult<()> {
        Ok(())
    }
}

struct ProbeSession {
    inner: Arc<dyn GraphSession>,
    probe: Arc<Probe>,
}

#[async_trait]
impl GraphSession for ProbeSession {
    async fn run_write(&self, statement: &Statement) -> GatewayResult<WriteSummary> {
        let now = self.probe.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.probe.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.probe.writes.fetch_add(1, Ordering::SeqCst);

        if !self.probe.write_delay.is_zero() {
            tokio::time::sleep(self.probe.write_delay).await;
        }
        let key = param_str(statement, &["ID", "aID"]);
        let result = if self.probe.fail_writes.contains(&key) {
            Err(GatewayError::store(
                "Neo.ClientError.Schema.ConstraintValidationFailed",
                format!("rejected {}", key),
            ))
        } else {
            self.inner.run_write(statement).await
        };

        self.probe.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn run_read(&self, statement: &Statement) -> GatewayResult<Cursor> {
        let key = param_str(statement, &["currentID"]);
        if self.probe.fail_reads.contains(&key) {
            return Err(GatewayError::Connection(format!("connection reset while expanding {}", key)));
        }
        self.inner.run_read(statement).await
    }

    async fn close(&self) -> GatewayResult<()> {
        self.probe.open_sessions.fetch_sub(1, Ordering::SeqCst);
        let closed = self.inner.close().await;
        if self.probe.fail_close {
            return Err(GatewayError::Connection("close timed out".to_string()));
        }
        closed
    }
}
