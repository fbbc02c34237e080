//! smallworld SDK: gateway to the graph store
//!
//! Provides two gateway implementations:
//!
//! - **`RemoteGateway`**: connects to a running Cypher graph store over its HTTP
//!   transactional endpoint. For production ingestion and analysis runs.
//!
//! - **`EmbeddedGateway`**: in-process, no network. Answers the statements
//!   smallworld issues with the same merge/match semantics. Ideal for tests and
//!   dry runs.
//!
//! Both implement the `GraphGateway` trait; work happens on the `GraphSession`s it
//! hands out.
//!
//! # Quick Start
//!
//! ```rust
//! use smallworld_sdk::{AccessMode, EmbeddedGateway, GraphGateway, Statement};
//!
//! #[tokio::main]
//! async fn main() {
//!     let gateway = EmbeddedGateway::new();
//!     let session = gateway.session(AccessMode::Write).await.unwrap();
//!
//!     let stmt = Statement::new("MERGE (n:`Person` {ID: $ID}) SET n.`name` = $name RETURN n")
//!         .param("ID", "1")
//!         .param("name", "Ada");
//!     session.run_write(&stmt).await.unwrap();
//!     session.close().await.unwrap();
//!
//!     assert_eq!(gateway.node_count().await, 1);
//! }
//! ```

pub mod client;
pub mod embedded;
pub mod error;
pub mod models;
pub mod remote;

pub use client::{GraphGateway, GraphSession};
pub use embedded::EmbeddedGateway;
pub use error::{GatewayError, GatewayResult};
pub use models::{AccessMode, Cursor, Params, Record, Statement, WriteSummary};
pub use remote::{RemoteConfig, RemoteGateway, RetryPolicy};
