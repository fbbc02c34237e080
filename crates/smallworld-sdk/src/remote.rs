//! RemoteGateway: network gateway for a running Cypher graph store
//!
//! Talks to the store's HTTP transactional endpoint
//! (`POST {uri}/db/{database}/tx/commit`). Every statement is sent as its own
//! auto-committed transaction; write statements are retried on transient failures
//! the way a managed transaction would be.

use async_trait::async_trait;
use rand::Rng;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::client::{GraphGateway, GraphSession};
use crate::error::{GatewayError, GatewayResult};
use crate::models::{AccessMode, Cursor, Statement, WriteSummary};

/// Backoff schedule for managed write transactions
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total time budget for retries, measured from the first attempt
    pub max_retry_time: Duration,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Factor applied to the delay after each retry
    pub multiplier: f64,
    /// Relative jitter applied to every delay (0.2 = ±20%)
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retry_time: Duration::from_secs(30),
            initial_delay: Duration::from_secs(1),
            multiplier: 2.0,
            jitter: 0.2,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries
    pub fn none() -> Self {
        Self {
            max_retry_time: Duration::ZERO,
            ..Self::default()
        }
    }

    fn jittered(&self, delay: Duration) -> Duration {
        if self.jitter <= 0.0 {
            return delay;
        }
        let factor = 1.0 + rand::thread_rng().gen_range(-self.jitter..=self.jitter);
        delay.mul_f64(factor.max(0.0))
    }
}

/// Connection settings for a [`RemoteGateway`]
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Base HTTP URL of the store, e.g. `http://localhost:7474`
    pub uri: String,
    /// Database name
    pub database: String,
    pub user: String,
    pub password: String,
    /// Per-request timeout
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            uri: "http://localhost:7474".to_string(),
            database: "neo4j".to_string(),
            user: "neo4j".to_string(),
            password: String::new(),
            request_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

/// Shared connection state: one pooled HTTP client per gateway
struct Connection {
    client: Client,
    endpoint: String,
    user: String,
    password: String,
    retry: RetryPolicy,
}

/// Network gateway to a running graph store.
///
/// Holds the single connection pool for the process; sessions are cheap handles on it.
pub struct RemoteGateway {
    conn: Arc<Connection>,
}

impl RemoteGateway {
    /// Create a gateway for the given settings.
    ///
    /// No request is made here; call [`GraphGateway::verify_connectivity`] to check
    /// the address and credentials.
    ///
    /// # Example
    /// ```no_run
    /// # use smallworld_sdk::{RemoteConfig, RemoteGateway};
    /// let gateway = RemoteGateway::new(RemoteConfig::default()).unwrap();
    /// ```
    pub fn new(config: RemoteConfig) -> GatewayResult<Self> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        let endpoint = format!(
            "{}/db/{}/tx/commit",
            config.uri.trim_end_matches('/'),
            config.database
        );
        Ok(Self {
            conn: Arc::new(Connection {
                client,
                endpoint,
                user: config.user,
                password: config.password,
                retry: config.retry,
            }),
        })
    }

    /// Transaction endpoint this gateway posts to
    pub fn endpoint(&self) -> &str {
        &self.conn.endpoint
    }
}

#[async_trait]
impl GraphGateway for RemoteGateway {
    async fn session(&self, mode: AccessMode) -> GatewayResult<Arc<dyn GraphSession>> {
        debug!("Opening {:?} session on {}", mode, self.conn.endpoint);
        Ok(Arc::new(RemoteSession {
            conn: Arc::clone(&self.conn),
            mode,
            closed: AtomicBool::new(false),
        }))
    }

    async fn verify_connectivity(&self) -> GatewayResult<()> {
        let result = self
            .conn
            .execute(&Statement::new("RETURN 1"), AccessMode::Read)
            .await?;
        if result.data.is_empty() {
            return Err(GatewayError::Protocol(
                "connectivity probe returned no rows".to_string(),
            ));
        }
        info!("Connected to graph store at {}", self.conn.endpoint);
        Ok(())
    }
}

/// Session handle on a [`RemoteGateway`]
pub struct RemoteSession {
    conn: Arc<Connection>,
    mode: AccessMode,
    closed: AtomicBool,
}

impl RemoteSession {
    fn ensure_open(&self) -> GatewayResult<()> {
        if self.closed.load(Ordering::Acquire) {
            Err(GatewayError::SessionClosed)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl GraphSession for RemoteSession {
    async fn run_write(&self, statement: &Statement) -> GatewayResult<WriteSummary> {
        self.ensure_open()?;
        if self.mode == AccessMode::Read {
            return Err(GatewayError::Protocol(
                "write attempted on a read session".to_string(),
            ));
        }

        let retry = &self.conn.retry;
        let started = Instant::now();
        let mut delay = retry.initial_delay;
        let mut attempt = 1u32;

        loop {
            match self.conn.execute(statement, AccessMode::Write).await {
                Ok(result) => return Ok(result.stats.unwrap_or_default()),
                Err(e) if e.is_transient() && started.elapsed() + delay <= retry.max_retry_time => {
                    warn!(
                        "Transient failure on attempt {}, retrying in {:?}: {}",
                        attempt, delay, e
                    );
                    tokio::time::sleep(retry.jittered(delay)).await;
                    delay = delay.mul_f64(retry.multiplier);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn run_read(&self, statement: &Statement) -> GatewayResult<Cursor> {
        self.ensure_open()?;
        let result = self.conn.execute(statement, AccessMode::Read).await?;
        let rows = result.data.into_iter().map(|d| d.row).collect();
        Ok(Cursor::new(result.columns, rows))
    }

    async fn close(&self) -> GatewayResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(GatewayError::SessionClosed);
        }
        debug!("Closed {:?} session on {}", self.mode, self.conn.endpoint);
        Ok(())
    }
}

// ============================================================
// Wire format
// ============================================================

#[derive(Debug, Deserialize)]
struct TxResponse {
    #[serde(default)]
    results: Vec<TxResult>,
    #[serde(default)]
    errors: Vec<TxError>,
}

#[derive(Debug, Deserialize)]
struct TxResult {
    #[serde(default)]
    columns: Vec<String>,
    #[serde(default)]
    data: Vec<TxRow>,
    #[serde(default)]
    stats: Option<WriteSummary>,
}

#[derive(Debug, Deserialize)]
struct TxRow {
    #[serde(default)]
    row: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct TxError {
    code: String,
    #[serde(default)]
    message: String,
}

impl Connection {
    /// Post one statement to the commit endpoint and decode the single result
    async fn execute(&self, statement: &Statement, mode: AccessMode) -> GatewayResult<TxResult> {
        let body = serde_json::json!({
            "statements": [{
                "statement": statement.text,
                "parameters": statement.parameters,
                "includeStats": true,
            }]
        });

        let mut request = self
            .client
            .post(&self.endpoint)
            .basic_auth(&self.user, Some(&self.password))
            .json(&body);
        if mode == AccessMode::Read {
            request = request.header("access-mode", "READ");
        }

        let response = request.send().await.map_err(|e| {
            if e.is_connect() {
                GatewayError::Connection(e.to_string())
            } else {
                GatewayError::Http(e)
            }
        })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(GatewayError::Authentication(format!(
                "store answered {}",
                status
            )));
        }

        let status_error = response.error_for_status_ref().err();
        let text = response.text().await?;
        match decode_response(&text) {
            Ok(result) => Ok(result),
            // A store-side diagnostic is more useful than the bare status line
            Err(e @ GatewayError::Store { .. }) => Err(e),
            Err(e) => Err(status_error.map(GatewayError::Http).unwrap_or(e)),
        }
    }
}

/// Decode a commit-endpoint response body into its first statement result
fn decode_response(body: &str) -> GatewayResult<TxResult> {
    let response: TxResponse = serde_json::from_str(body)?;
    if let Some(err) = response.errors.into_iter().next() {
        return Err(GatewayError::store(err.code, err.message));
    }
    response
        .results
        .into_iter()
        .next()
        .ok_or_else(|| GatewayError::Protocol("response carried no statement result".to_string()))
}
