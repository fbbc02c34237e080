//! Statement builder
//!
//! Every Cypher text smallworld sends lives here. Labels, relationship types and
//! property keys are interpolated into the text (Cypher cannot parameterize them), so
//! each one must be a plain identifier; values always travel as parameters.

use serde_json::Value;
use smallworld_sdk::Statement;
use thiserror::Error;

use crate::model::{EntityRecord, RelationshipRecord, ID_KEY};

/// Statement building errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    /// Record has nothing to set besides its identifier
    #[error("Record {0} has no attributes besides ID")]
    EmptyRecord(String),

    /// Label, type or key that cannot be interpolated safely
    #[error("Unsafe identifier: {0:?}")]
    UnsafeIdentifier(String),
}

pub type QueryResult<T> = Result<T, QueryError>;

/// Whether `name` can be used as a label, relationship type, property or parameter name
pub fn is_safe_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn check(name: &str) -> QueryResult<&str> {
    if is_safe_identifier(name) {
        Ok(name)
    } else {
        Err(QueryError::UnsafeIdentifier(name.to_string()))
    }
}

/// Upsert of one entity: merge the node keyed by `(label, ID)`, set every attribute, return it.
///
/// ```text
/// MERGE (n:`Person` {ID: $ID}) SET n.`attr1` = $attr1, n.`attr2` = $attr2 RETURN n
/// ```
pub fn upsert_entity(label: &str, record: &EntityRecord) -> QueryResult<Statement> {
    let label = check(label)?;

    let mut assignments = Vec::new();
    let mut statement = Statement::new(String::new()).param(ID_KEY, record.id.as_str());
    for (key, value) in record.properties() {
        let key = check(key)?;
        assignments.push(format!("n.`{key}` = ${key}"));
        statement = statement.param(key, value.clone());
    }
    if assignments.is_empty() {
        return Err(QueryError::EmptyRecord(record.id.clone()));
    }

    statement.text = format!(
        "MERGE (n:`{label}` {{ID: $ID}}) SET {} RETURN n",
        assignments.join(", ")
    );
    Ok(statement)
}

/// Idempotent relationship between two existing nodes of `label`.
///
/// When either endpoint is missing the MATCH yields no row and nothing is written.
pub fn merge_relationship(label: &str, rel_type: &str, record: &RelationshipRecord) -> QueryResult<Statement> {
    let label = check(label)?;
    let rel_type = check(rel_type)?;
    Ok(Statement::new(format!(
        "MATCH (a:`{label}` {{ID: $aID}}), (b:`{label}` {{ID: $bID}}) MERGE (a)-[:`{rel_type}`]->(b)"
    ))
    .param("aID", record.source.as_str())
    .param("bID", record.target.as_str()))
}

/// Identifiers one outbound `rel_type` hop away from `current`, minus `visited`.
///
/// The exclusion runs in the store so already-seen nodes never cross the wire.
pub fn outbound_neighbors<'a, I>(label: &str, rel_type: &str, current: &str, visited: I) -> QueryResult<Statement>
where
    I: IntoIterator<Item = &'a String>,
{
    let label = check(label)?;
    let rel_type = check(rel_type)?;
    let visited: Vec<Value> = visited.into_iter().map(|id| Value::from(id.as_str())).collect();
    Ok(Statement::new(format!(
        "MATCH (a:`{label}` {{ID: $currentID}})-[:`{rel_type}`]->(b) \
         WHERE NOT b.ID IN $visited \
         RETURN b.ID AS neighborID"
    ))
    .param("currentID", current)
    .param("visited", Value::Array(visited)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_upsert_sets_every_attribute() {
        let record = EntityRecord::new("42").with("attr1", "Alan").with("attr2", "Turing");
        let stmt = upsert_entity("Person", &record).unwrap();
        assert_eq!(
            stmt.text,
            "MERGE (n:`Person` {ID: $ID}) SET n.`attr1` = $attr1, n.`attr2` = $attr2 RETURN n"
        );
        assert_eq!(stmt.get("ID"), Some(&json!("42")));
        assert_eq!(stmt.get("attr2"), Some(&json!("Turing")));
        assert_eq!(stmt.parameters.len(), 3);
    }

    #[test]
    fn test_upsert_ignores_id_attribute() {
        let record = EntityRecord::new("7").with("ID", "ignored").with("attr1", "x");
        let stmt = upsert_entity("Person", &record).unwrap();
        assert_eq!(stmt.get("ID"), Some(&json!("7")));
        assert!(!stmt.text.contains("n.`ID`"));
    }

    #[test]
    fn test_upsert_rejects_bare_record() {
        let record = EntityRecord::new("9");
        assert_eq!(upsert_entity("Person", &record), Err(QueryError::EmptyRecord("9".to_string())));
    }

    #[test]
    fn test_upsert_rejects_injection() {
        let record = EntityRecord::new("1").with("name` = 1 DETACH DELETE n //", "x");
        assert!(matches!(upsert_entity("Person", &record), Err(QueryError::UnsafeIdentifier(_))));

        let record = EntityRecord::new("1").with("attr1", "x");
        assert!(matches!(upsert_entity("Person) DELETE (m", &record), Err(QueryError::UnsafeIdentifier(_))));
    }

    #[test]
    fn test_relationship_template() {
        let stmt = merge_relationship("Person", "KNOWS", &RelationshipRecord::new("1", "2")).unwrap();
        assert_eq!(
            stmt.text,
            "MATCH (a:`Person` {ID: $aID}), (b:`Person` {ID: $bID}) MERGE (a)-[:`KNOWS`]->(b)"
        );
        assert_eq!(stmt.get("aID"), Some(&json!("1")));
        assert_eq!(stmt.get("bID"), Some(&json!("2")));
    }

    #[test]
    fn test_neighbor_query_carries_visited_set() {
        let visited = vec!["1".to_string(), "3".to_string()];
        let stmt = outbound_neighbors("Person", "KNOWS", "1", &visited).unwrap();
        assert!(stmt.text.contains("WHERE NOT b.ID IN $visited"));
        assert_eq!(stmt.get("currentID"), Some(&json!("1")));
        assert_eq!(stmt.get("visited"), Some(&json!(["1", "3"])));
    }

    #[test]
    fn test_safe_identifier() {
        assert!(is_safe_identifier("attr12"));
        assert!(is_safe_identifier("_x"));
        assert!(!is_safe_identifier(""));
        assert!(!is_safe_identifier("1abc"));
        assert!(!is_safe_identifier("a-b"));
        assert!(!is_safe_identifier("a`b"));
    }
}
