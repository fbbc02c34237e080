//! Data models shared by the remote and embedded gateways
//!
//! `Statement` is what callers send, `Cursor` and `WriteSummary` are what they get back.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Statement parameters, keyed by name without the leading `$`
pub type Params = Map<String, Value>;

/// Session access mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessMode {
    Read,
    Write,
}

/// A parameterized Cypher statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    /// Statement text
    #[serde(rename = "statement")]
    pub text: String,
    /// Bound parameters
    pub parameters: Params,
}

impl Statement {
    /// Create a statement without parameters
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            parameters: Params::new(),
        }
    }

    /// Bind a parameter, replacing any earlier value under the same name
    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    /// Look up a bound parameter
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.parameters.get(name)
    }
}

/// Counters reported by the store for a committed write
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteSummary {
    #[serde(default)]
    pub nodes_created: u64,
    #[serde(default)]
    pub relationships_created: u64,
    #[serde(default)]
    pub properties_set: u64,
}

impl WriteSummary {
    /// Whether the write changed anything in the store
    pub fn contains_updates(&self) -> bool {
        self.nodes_created > 0 || self.relationships_created > 0 || self.properties_set > 0
    }
}

/// One result row, addressable by column name
#[derive(Debug, Clone)]
pub struct Record {
    columns: Arc<HashMap<String, usize>>,
    values: Vec<Value>,
}

impl Record {
    /// Value of the named column
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns.get(column).and_then(|&i| self.values.get(i))
    }

    /// Value of the named column as a string
    pub fn get_str(&self, column: &str) -> Option<&str> {
        self.get(column).and_then(Value::as_str)
    }
}

/// Rows returned by a read, handed out one `Record` at a time
#[derive(Debug)]
pub struct Cursor {
    index: Arc<HashMap<String, usize>>,
    rows: std::vec::IntoIter<Vec<Value>>,
}

impl Cursor {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let index = columns
            .into_iter()
            .enumerate()
            .map(|(i, c)| (c, i))
            .collect();
        Self {
            index: Arc::new(index),
            rows: rows.into_iter(),
        }
    }
}

impl Iterator for Cursor {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        self.rows.next().map(|values| Record {
            columns: Arc::clone(&self.index),
            values,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}
