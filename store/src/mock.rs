//! In-memory graph for tests.
//!
//! Understands exactly the queries built in [`crate::query`] and records every
//! write it is asked to perform.

#![allow(clippy::unwrap_used)] // Mock code: panicking on poisoned lock is acceptable in tests

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use crate::client::GraphStore;
use crate::errors::{Result, StoreError};

#[derive(Debug, Clone)]
struct MockBlock {
    uid: String,
    string: String,
    order: i64,
}

/// A write the mock was asked to perform.
#[derive(Debug, Clone)]
pub struct RecordedWrite {
    pub action: String,
    pub payload: Map<String, Value>,
    pub succeeded: bool,
}

impl RecordedWrite {
    /// Items of a `batch-actions` payload.
    pub fn ops(&self) -> Vec<Value> {
        self.payload
            .get("actions")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
    }

    /// `action` field of each batch item, e.g. `["update-block"]`.
    pub fn op_names(&self) -> Vec<String> {
        self.ops()
            .iter()
            .filter_map(|op| op.get("action").and_then(Value::as_str))
            .map(str::to_string)
            .collect()
    }
}

/// Mock implementation of [`GraphStore`].
#[derive(Debug, Default)]
pub struct MockGraphStore {
    pages: RwLock<HashMap<String, String>>,
    children: RwLock<HashMap<String, Vec<MockBlock>>>,
    fail_queries: RwLock<bool>,
    failing_ops: RwLock<Vec<String>>,
    queries: RwLock<Vec<String>>,
    writes: RwLock<Vec<RecordedWrite>>,
}

impl MockGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a daily page.
    pub fn with_page(self, title: &str, uid: &str) -> Self {
        self.pages
            .write()
            .unwrap()
            .insert(title.to_string(), uid.to_string());
        self
    }

    /// Add a direct child block under `parent_uid`.
    pub fn with_block(self, parent_uid: &str, uid: &str, string: &str, order: i64) -> Self {
        self.children
            .write()
            .unwrap()
            .entry(parent_uid.to_string())
            .or_default()
            .push(MockBlock {
                uid: uid.to_string(),
                string: string.to_string(),
                order,
            });
        self
    }

    /// Make every query fail with a remote error.
    pub fn failing_queries(self) -> Self {
        *self.fail_queries.write().unwrap() = true;
        self
    }

    /// Make any batch containing an `op_name` item (e.g. `update-block`) fail.
    pub fn failing_batches_with(self, op_name: &str) -> Self {
        self.failing_ops.write().unwrap().push(op_name.to_string());
        self
    }

    /// Queries received so far.
    pub fn queries(&self) -> Vec<String> {
        self.queries.read().unwrap().clone()
    }

    /// Writes received so far, including failed ones.
    pub fn writes(&self) -> Vec<RecordedWrite> {
        self.writes.read().unwrap().clone()
    }

    fn answer(&self, query: &str) -> Value {
        if query.contains(":node/title") {
            let title = quoted_after(query, "(= ?title \"").unwrap_or_default();
            let rows: Vec<Value> = self
                .pages
                .read()
                .unwrap()
                .get(&title)
                .map(|uid| vec![json!([uid])])
                .unwrap_or_default();
            return json!({ "result": rows });
        }

        let parent = quoted_after(query, ":block/uid \"").unwrap_or_default();
        let children = self
            .children
            .read()
            .unwrap()
            .get(&parent)
            .cloned()
            .unwrap_or_default();

        if query.contains("clojure.string/includes?") {
            let needle = quoted_after(query, "includes? ?str \"").unwrap_or_default();
            let rows: Vec<Value> = children
                .iter()
                .filter(|block| block.string.contains(&needle))
                .map(|block| json!([block.uid, block.string]))
                .collect();
            return json!({ "result": rows });
        }

        let rows: Vec<Value> = children
            .iter()
            .map(|block| {
                json!([{
                    ":block/uid": block.uid,
                    ":block/string": block.string,
                    ":block/order": block.order,
                }])
            })
            .collect();
        json!({ "result": rows })
    }
}

/// Unescaped contents of the string literal that starts right after `marker`.
fn quoted_after(query: &str, marker: &str) -> Option<String> {
    let start = query.find(marker)? + marker.len();
    let mut out = String::new();
    let mut chars = query[start..].chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => out.push(chars.next()?),
            '"' => return Some(out),
            _ => out.push(ch),
        }
    }
    None
}

#[async_trait]
impl GraphStore for MockGraphStore {
    async fn query(&self, query: &str) -> Result<Value> {
        self.queries.write().unwrap().push(query.to_string());
        if *self.fail_queries.read().unwrap() {
            return Err(StoreError::remote("simulated query failure"));
        }
        Ok(self.answer(query))
    }

    async fn write(&self, action: &str, payload: Map<String, Value>) -> Result<Value> {
        let mut record = RecordedWrite {
            action: action.to_string(),
            payload,
            succeeded: true,
        };

        let failing = self.failing_ops.read().unwrap().clone();
        let fails = record
            .op_names()
            .iter()
            .any(|name| failing.contains(name));
        record.succeeded = !fails;
        self.writes.write().unwrap().push(record);

        if fails {
            return Err(StoreError::remote("simulated write failure"));
        }
        Ok(Value::Null)
    }
}
