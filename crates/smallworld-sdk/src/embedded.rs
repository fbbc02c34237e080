//! EmbeddedGateway: in-process graph store, no network
//!
//! Answers the statement shapes smallworld emits (entity upsert, relationship merge,
//! outbound-neighbor lookup and the `RETURN 1` probe) with the same MERGE/MATCH
//! semantics a Cypher store applies. Anything else is rejected as a syntax error.

use async_trait::async_trait;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use tokio::sync::RwLock;
use tracing::debug;

use crate::client::{GraphGateway, GraphSession};
use crate::error::{GatewayError, GatewayResult};
use crate::models::{AccessMode, Cursor, Statement, WriteSummary};

/// `(label, ID)`
type NodeKey = (String, String);

#[derive(Debug, Default)]
struct MemoryGraph {
    nodes: HashMap<NodeKey, Map<String, Value>>,
    /// Outbound adjacency in insertion order: `(relationship type, target)`
    outgoing: HashMap<NodeKey, Vec<(String, NodeKey)>>,
    edge_count: usize,
}

/// A statement recognised by the embedded store
#[derive(Debug, PartialEq)]
enum Parsed {
    Probe,
    Upsert {
        label: String,
        /// `(property, parameter)`
        assignments: Vec<(String, String)>,
    },
    MergeEdge {
        source_label: String,
        target_label: String,
        rel_type: String,
    },
    Neighbors {
        label: String,
        rel_type: String,
    },
}

impl Parsed {
    fn is_write(&self) -> bool {
        matches!(self, Parsed::Upsert { .. } | Parsed::MergeEdge { .. })
    }
}

fn upsert_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^MERGE \(n:`([^`]+)` \{ID: \$ID\}\) SET (.+) RETURN n$").expect("valid pattern")
    })
}

fn assignment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^n\.`([^`]+)` = \$(\w+)$").expect("valid pattern"))
}

fn merge_edge_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^MATCH \(a:`([^`]+)` \{ID: \$aID\}\), \(b:`([^`]+)` \{ID: \$bID\}\) MERGE \(a\)-\[:`([^`]+)`\]->\(b\)$",
        )
        .expect("valid pattern")
    })
}

fn neighbors_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^MATCH \(a:`([^`]+)` \{ID: \$currentID\}\)-\[:`([^`]+)`\]->\(b\) WHERE NOT b\.ID IN \$visited RETURN b\.ID AS neighborID$",
        )
        .expect("valid pattern")
    })
}

fn syntax_error(text: &str) -> GatewayError {
    GatewayError::store(
        "Neo.ClientError.Statement.SyntaxError",
        format!("unsupported statement: {}", text),
    )
}

fn parse(text: &str) -> GatewayResult<Parsed> {
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");

    if normalized == "RETURN 1" {
        return Ok(Parsed::Probe);
    }
    if let Some(caps) = upsert_re().captures(&normalized) {
        let mut assignments = Vec::new();
        for part in caps[2].split(", ") {
            let a = assignment_re()
                .captures(part)
                .ok_or_else(|| syntax_error(text))?;
            assignments.push((a[1].to_string(), a[2].to_string()));
        }
        return Ok(Parsed::Upsert {
            label: caps[1].to_string(),
            assignments,
        });
    }
    if let Some(caps) = merge_edge_re().captures(&normalized) {
        return Ok(Parsed::MergeEdge {
            source_label: caps[1].to_string(),
            target_label: caps[2].to_string(),
            rel_type: caps[3].to_string(),
        });
    }
    if let Some(caps) = neighbors_re().captures(&normalized) {
        return Ok(Parsed::Neighbors {
            label: caps[1].to_string(),
            rel_type: caps[2].to_string(),
        });
    }
    Err(syntax_error(text))
}

fn param<'a>(statement: &'a Statement, name: &str) -> GatewayResult<&'a Value> {
    statement.get(name).ok_or_else(|| {
        GatewayError::store(
            "Neo.ClientError.Statement.ParameterMissing",
            format!("Expected parameter(s): {}", name),
        )
    })
}

/// Identifier text used as the node key
fn key_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl MemoryGraph {
    fn upsert(&mut self, label: &str, assignments: &[(String, String)], statement: &Statement) -> GatewayResult<WriteSummary> {
        let id = param(statement, "ID")?.clone();
        let mut values = Vec::with_capacity(assignments.len());
        for (property, name) in assignments {
            values.push((property.clone(), param(statement, name)?.clone()));
        }

        let mut summary = WriteSummary::default();
        let key = (label.to_string(), key_text(&id));
        let props = self.nodes.entry(key).or_insert_with(|| {
            summary.nodes_created = 1;
            summary.properties_set = 1;
            let mut props = Map::new();
            props.insert("ID".to_string(), id);
            props
        });
        for (property, value) in values {
            props.insert(property, value);
            summary.properties_set += 1;
        }
        Ok(summary)
    }

    fn merge_edge(&mut self, source_label: &str, target_label: &str, rel_type: &str, statement: &Statement) -> GatewayResult<WriteSummary> {
        let source = (source_label.to_string(), key_text(param(statement, "aID")?));
        let target = (target_label.to_string(), key_text(param(statement, "bID")?));

        // MATCH found nothing: MERGE has no row to act on
        if !self.nodes.contains_key(&source) || !self.nodes.contains_key(&target) {
            return Ok(WriteSummary::default());
        }

        let edges = self.outgoing.entry(source).or_default();
        if edges.iter().any(|(t, to)| t == rel_type && *to == target) {
            return Ok(WriteSummary::default());
        }
        edges.push((rel_type.to_string(), target));
        self.edge_count += 1;
        Ok(WriteSummary {
            relationships_created: 1,
            ..WriteSummary::default()
        })
    }

    fn neighbors(&self, label: &str, rel_type: &str, statement: &Statement) -> GatewayResult<Cursor> {
        let current = (label.to_string(), key_text(param(statement, "currentID")?));
        let visited: HashSet<String> = match param(statement, "visited")? {
            Value::Array(items) => items.iter().map(key_text).collect(),
            Value::Null => HashSet::new(),
            other => {
                return Err(GatewayError::store(
                    "Neo.ClientError.Statement.TypeError",
                    format!("expected a list for $visited, got {}", other),
                ))
            }
        };

        let rows = self
            .outgoing
            .get(&current)
            .map(|edges| {
                edges
                    .iter()
                    .filter(|(t, _)| t == rel_type)
                    .filter_map(|(_, target)| self.nodes.get(target))
                    .filter_map(|props| props.get("ID"))
                    .filter(|id| !visited.contains(&key_text(id)))
                    .map(|id| vec![id.clone()])
                    .collect()
            })
            .unwrap_or_default();

        Ok(Cursor::new(vec!["neighborID".to_string()], rows))
    }
}

/// In-process gateway wrapping a shared in-memory graph.
///
/// Cloning is cheap and every clone sees the same graph.
#[derive(Clone, Default)]
pub struct EmbeddedGateway {
    graph: Arc<RwLock<MemoryGraph>>,
}

impl EmbeddedGateway {
    /// Create a gateway over a fresh empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored nodes across all labels
    pub async fn node_count(&self) -> usize {
        self.graph.read().await.nodes.len()
    }

    /// Number of stored relationships
    pub async fn edge_count(&self) -> usize {
        self.graph.read().await.edge_count
    }

    /// Properties of the node with the given label and ID, `ID` included
    pub async fn node_properties(&self, label: &str, id: &str) -> Option<Map<String, Value>> {
        self.graph
            .read()
            .await
            .nodes
            .get(&(label.to_string(), id.to_string()))
            .cloned()
    }

    /// Whether a relationship of `rel_type` runs from `source` to `target` (both under `label`)
    pub async fn has_edge(&self, label: &str, source: &str, rel_type: &str, target: &str) -> bool {
        let graph = self.graph.read().await;
        let target = (label.to_string(), target.to_string());
        graph
            .outgoing
            .get(&(label.to_string(), source.to_string()))
            .map(|edges| edges.iter().any(|(t, to)| t == rel_type && *to == target))
            .unwrap_or(false)
    }
}

#[async_trait]
impl GraphGateway for EmbeddedGateway {
    async fn session(&self, mode: AccessMode) -> GatewayResult<Arc<dyn GraphSession>> {
        Ok(Arc::new(EmbeddedSession {
            graph: Arc::clone(&self.graph),
            mode,
            closed: AtomicBool::new(false),
        }))
    }

    async fn verify_connectivity(&self) -> GatewayResult<()> {
        Ok(())
    }
}

/// Session handle on an [`EmbeddedGateway`]
pub struct EmbeddedSession {
    graph: Arc<RwLock<MemoryGraph>>,
    mode: AccessMode,
    closed: AtomicBool,
}

impl EmbeddedSession {
    fn ensure_open(&self) -> GatewayResult<()> {
        if self.closed.load(Ordering::Acquire) {
            Err(GatewayError::SessionClosed)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl GraphSession for EmbeddedSession {
    async fn run_write(&self, statement: &Statement) -> GatewayResult<WriteSummary> {
        self.ensure_open()?;
        if self.mode == AccessMode::Read {
            return Err(GatewayError::Protocol(
                "write attempted on a read session".to_string(),
            ));
        }
        let parsed = parse(&statement.text)?;
        let mut graph = self.graph.write().await;
        match parsed {
            Parsed::Upsert { label, assignments } => graph.upsert(&label, &assignments, statement),
            Parsed::MergeEdge { source_label, target_label, rel_type } => {
                graph.merge_edge(&source_label, &target_label, &rel_type, statement)
            }
            Parsed::Probe | Parsed::Neighbors { .. } => Ok(WriteSummary::default()),
        }
    }

    async fn run_read(&self, statement: &Statement) -> GatewayResult<Cursor> {
        self.ensure_open()?;
        let parsed = parse(&statement.text)?;
        if parsed.is_write() {
            return Err(GatewayError::store(
                "Neo.ClientError.Statement.AccessMode",
                "Writing in read access mode not allowed",
            ));
        }
        let graph = self.graph.read().await;
        match parsed {
            Parsed::Neighbors { label, rel_type } => graph.neighbors(&label, &rel_type, statement),
            _ => Ok(Cursor::new(vec!["1".to_string()], vec![vec![Value::from(1)]])),
        }
    }

    async fn close(&self) -> GatewayResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(GatewayError::SessionClosed);
        }
        debug!("Closed embedded {:?} session", self.mode);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn upsert(id: &str, name: &str) -> Statement {
        Statement::new("MERGE (n:`Person` {ID: $ID}) SET n.`name` = $name RETURN n")
            .param("ID", id)
            .param("name", name)
    }

    fn link(a: &str, b: &str) -> Statement {
        Statement::new("MATCH (a:`Person` {ID: $aID}), (b:`Person` {ID: $bID}) MERGE (a)-[:`KNOWS`]->(b)")
            .param("aID", a)
            .param("bID", b)
    }

    fn neighbors(id: &str, visited: &[&str]) -> Statement {
        Statement::new(
            "MATCH (a:`Person` {ID: $currentID})-[:`KNOWS`]->(b)\n  WHERE NOT b.ID IN $visited\n  RETURN b.ID AS neighborID",
        )
        .param("currentID", id)
        .param("visited", json!(visited))
    }

    #[test]
    fn test_parse_recognises_statement_shapes() {
        assert_eq!(parse("RETURN 1").unwrap(), Parsed::Probe);
        assert!(matches!(parse(&upsert("1", "a").text).unwrap(), Parsed::Upsert { ref assignments, .. } if assignments.len() == 1));
        assert!(matches!(parse(&link("1", "2").text).unwrap(), Parsed::MergeEdge { .. }));
        assert!(matches!(parse(&neighbors("1", &[]).text).unwrap(), Parsed::Neighbors { .. }));
        assert!(parse("MATCH (n) DETACH DELETE n").is_err());
    }

    #[tokio::test]
    async fn test_upsert_merges_instead_of_duplicating() {
        let gateway = EmbeddedGateway::new();
        let session = gateway.session(AccessMode::Write).await.unwrap();

        let first = session.run_write(&upsert("1", "Ada")).await.unwrap();
        assert_eq!(first.nodes_created, 1);
        let second = session.run_write(&upsert("1", "Grace")).await.unwrap();
        assert_eq!(second.nodes_created, 0);

        assert_eq!(gateway.node_count().await, 1);
        let props = gateway.node_properties("Person", "1").await.unwrap();
        assert_eq!(props["name"], json!("Grace"));
        assert_eq!(props["ID"], json!("1"));
    }

    #[tokio::test]
    async fn test_edge_merge_needs_both_endpoints() {
        let gateway = EmbeddedGateway::new();
        let session = gateway.session(AccessMode::Write).await.unwrap();
        session.run_write(&upsert("1", "a")).await.unwrap();

        let summary = session.run_write(&link("1", "2")).await.unwrap();
        assert_eq!(summary.relationships_created, 0);
        assert_eq!(gateway.edge_count().await, 0);

        session.run_write(&upsert("2", "b")).await.unwrap();
        session.run_write(&link("1", "2")).await.unwrap();
        session.run_write(&link("1", "2")).await.unwrap();
        assert_eq!(gateway.edge_count().await, 1);
        assert!(gateway.has_edge("Person", "1", "KNOWS", "2").await);
        assert!(!gateway.has_edge("Person", "2", "KNOWS", "1").await);
    }

    #[tokio::test]
    async fn test_neighbors_exclude_visited() {
        let gateway = EmbeddedGateway::new();
        let writer = gateway.session(AccessMode::Write).await.unwrap();
        for id in ["1", "2", "3"] {
            writer.run_write(&upsert(id, id)).await.unwrap();
        }
        writer.run_write(&link("1", "2")).await.unwrap();
        writer.run_write(&link("1", "3")).await.unwrap();

        let reader = gateway.session(AccessMode::Read).await.unwrap();
        let all: Vec<String> = reader
            .run_read(&neighbors("1", &["1"]))
            .await
            .unwrap()
            .map(|r| r.get_str("neighborID").unwrap().to_string())
            .collect();
        assert_eq!(all, vec!["2", "3"]);

        let rest: Vec<String> = reader
            .run_read(&neighbors("1", &["1", "2"]))
            .await
            .unwrap()
            .map(|r| r.get_str("neighborID").unwrap().to_string())
            .collect();
        assert_eq!(rest, vec!["3"]);
    }

    #[tokio::test]
    async fn test_read_session_rejects_writes() {
        let gateway = EmbeddedGateway::new();
        let reader = gateway.session(AccessMode::Read).await.unwrap();
        assert!(reader.run_read(&upsert("1", "a")).await.is_err());
        assert!(reader.run_write(&upsert("1", "a")).await.is_err());
        assert_eq!(gateway.node_count().await, 0);
    }

    #[tokio::test]
    async fn test_missing_parameter_is_store_error() {
        let gateway = EmbeddedGateway::new();
        let session = gateway.session(AccessMode::Write).await.unwrap();
        let stmt = Statement::new("MERGE (n:`Person` {ID: $ID}) SET n.`name` = $name RETURN n").param("ID", "1");
        let err = session.run_write(&stmt).await.unwrap_err();
        assert!(matches!(err, GatewayError::Store { ref code, .. } if code.ends_with("ParameterMissing")));
        assert_eq!(gateway.node_count().await, 0);
    }
}
