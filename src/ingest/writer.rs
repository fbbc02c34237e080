//! Bounded-concurrency bulk writer

use smallworld_sdk::{AccessMode, GraphGateway, GraphSession, Statement};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::audit::{AuditLog, AuditResult};
use super::{BatchSummary, WriteFailure};
use crate::model::{EntityRecord, RelationshipRecord};
use crate::query::{self, QueryResult};

/// Default number of concurrent write transactions
pub const DEFAULT_CONCURRENCY: usize = 10;

#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Maximum write transactions in flight at once
    pub concurrency: usize,
    /// Label both endpoints of a relationship carry
    pub link_label: String,
    pub relationship_type: String,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            link_label: "Person".to_string(),
            relationship_type: "KNOWS".to_string(),
        }
    }
}

/// Writes batches of records through a gateway.
///
/// Batches are serialized: a second `write_batch`/`write_links` call waits until
/// the first one has joined all of its items. Within a batch, items run
/// concurrently on one shared session, at most `concurrency` at a time, in no
/// particular order.
pub struct BulkWriter {
    gateway: Arc<dyn GraphGateway>,
    config: WriterConfig,
    entity_log: Arc<AuditLog>,
    link_log: Arc<AuditLog>,
    batch_lock: Mutex<()>,
}

impl BulkWriter {
    pub fn new(
        gateway: Arc<dyn GraphGateway>,
        config: WriterConfig,
        entity_log: AuditLog,
        link_log: AuditLog,
    ) -> Self {
        Self {
            gateway,
            config,
            entity_log: Arc::new(entity_log),
            link_log: Arc::new(link_log),
            batch_lock: Mutex::new(()),
        }
    }

    /// Create a writer with its two audit logs opened at the given paths
    pub fn open(
        gateway: Arc<dyn GraphGateway>,
        config: WriterConfig,
        entity_log: impl AsRef<Path>,
        link_log: impl AsRef<Path>,
    ) -> AuditResult<Self> {
        Ok(Self::new(
            gateway,
            config,
            AuditLog::open(entity_log, "PERSON_LOG")?,
            AuditLog::open(link_log, "LINK_LOG")?,
        ))
    }

    /// Upsert every record as a node of `label`
    pub async fn write_batch(&self, label: &str, records: Vec<EntityRecord>) -> BatchSummary {
        self.run_batch(&self.entity_log, "node", records, |record| {
            (record.id.clone(), query::upsert_entity(label, record))
        })
        .await
    }

    /// Merge a relationship for every pair
    pub async fn write_links(&self, links: Vec<RelationshipRecord>) -> BatchSummary {
        let label = self.config.link_label.as_str();
        let rel_type = self.config.relationship_type.as_str();
        self.run_batch(&self.link_log, "link", links, |link| {
            (
                format!("{} -> {}", link.source, link.target),
                query::merge_relationship(label, rel_type, link),
            )
        })
        .await
    }

    async fn run_batch<T, F>(
        &self,
        log: &Arc<AuditLog>,
        kind: &'static str,
        items: Vec<T>,
        build: F,
    ) -> BatchSummary
    where
        F: Fn(&T) -> (String, QueryResult<Statement>),
    {
        let _batch = self.batch_lock.lock().await;
        let started = Instant::now();
        let mut summary = BatchSummary {
            attempted: items.len(),
            ..BatchSummary::default()
        };
        info!(
            "Writing batch of {} {} records with concurrency {}",
            items.len(),
            kind,
            self.config.concurrency
        );

        let session: Arc<dyn GraphSession> = match self.gateway.session(AccessMode::Write).await {
            Ok(session) => session,
            Err(e) => {
                error!("Cannot open write session: {}", e);
                log.record(format!("cannot open write session: {}", e));
                let message = e.to_string();
                for item in &items {
                    let key = build(item).0;
                    log.record(format!("write failed {} {}: {}", kind, key, message));
                    summary.failed.push(WriteFailure {
                        key,
                        message: message.clone(),
                    });
                }
                summary.elapsed = started.elapsed();
                return summary;
            }
        };

        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let mut join_set = JoinSet::new();

        for item in items {
            let (key, statement) = build(&item);
            drop(item);

            let statement = match statement {
                Ok(statement) => statement,
                Err(e) => {
                    log.record(format!("write failed {} {}: {}", kind, key, e));
                    summary.failed.push(WriteFailure {
                        key,
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            // Admission: wait for a free slot before the task exists at all
            let permit = match Arc::clone(&semaphore).acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    summary.failed.push(WriteFailure {
                        key,
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            let session = Arc::clone(&session);
            let log = Arc::clone(log);
            join_set.spawn(async move {
                let _permit = permit;
                match session.run_write(&statement).await {
                    Ok(stats) if stats.contains_updates() => {
                        log.record(format!("wrote {} {}", kind, key));
                        Ok(true)
                    }
                    Ok(_) => {
                        log.record(format!("{} {} unchanged", kind, key));
                        Ok(false)
                    }
                    Err(e) => {
                        log.record(format!("write failed {} {}: {}", kind, key, e));
                        Err(WriteFailure {
                            key,
                            message: e.to_string(),
                        })
                    }
                }
            });
        }

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(Ok(changed)) => {
                    summary.succeeded += 1;
                    if !changed {
                        summary.unchanged += 1;
                    }
                }
                Ok(Err(failure)) => {
                    debug!("Write of {} {} failed: {}", kind, failure.key, failure.message);
                    summary.failed.push(failure);
                }
                Err(e) => {
                    warn!("Write task aborted: {}", e);
                    summary.failed.push(WriteFailure {
                        key: "<task>".to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }

        if let Err(e) = session.close().await {
            warn!("Closing write session failed: {}", e);
            log.record(format!("closing session failed: {}", e));
        }

        summary.elapsed = started.elapsed();
        info!(
            "Batch of {} {} records done in {:?}: {} ok ({} unchanged), {} failed",
            summary.attempted,
            kind,
            summary.elapsed,
            summary.succeeded,
            summary.unchanged,
            summary.failed_count()
        );
        summary
    }
}
