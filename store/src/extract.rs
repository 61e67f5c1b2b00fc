//! Timeline entry extraction
//!
//! A day's timeline lives on its daily-notes page, under a direct child block
//! whose text contains "Timeline". The entries are that block's direct
//! children, ordered by `:block/order`.
//!
//! Lookups distinguish "not there" (`Ok(None)`) from "could not ask"
//! (`Err`). Listing entries is softer: any failure yields no entries.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::GraphStore;
use crate::dates::daily_page_title;
use crate::errors::Result;
use crate::query;

/// Text that marks a page's timeline container block.
pub const TIMELINE_MARKER: &str = "Timeline";

/// One child block of a timeline container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub uid: String,
    pub content: String,
    pub order: i64,
}

impl TimelineEntry {
    pub fn new(uid: impl Into<String>, content: impl Into<String>, order: i64) -> Self {
        Self {
            uid: uid.into(),
            content: content.into(),
            order,
        }
    }
}

/// Uid of the daily-notes page for `date`, if the page exists.
pub async fn resolve_day_container<S>(store: &S, date: NaiveDate) -> Result<Option<String>>
where
    S: GraphStore + ?Sized,
{
    let title = daily_page_title(date);
    let result = store.query(&query::page_uid_by_title(&title)).await?;
    let uid = first_row(&result)
        .and_then(|row| row.first())
        .and_then(Value::as_str)
        .map(str::to_string);

    if uid.is_none() {
        tracing::debug!(title = %title, "daily page not found");
    }
    Ok(uid)
}

/// Uid of the first direct child of `page_uid` whose text contains "Timeline".
pub async fn find_timeline_container<S>(store: &S, page_uid: &str) -> Result<Option<String>>
where
    S: GraphStore + ?Sized,
{
    let result = store
        .query(&query::children_containing(page_uid, TIMELINE_MARKER))
        .await?;
    Ok(first_row(&result)
        .and_then(|row| row.first())
        .and_then(Value::as_str)
        .map(str::to_string))
}

/// Direct children of `container_uid`, sorted by order.
///
/// A failed query is logged and reported as an empty timeline.
pub async fn list_entries<S>(store: &S, container_uid: &str) -> Vec<TimelineEntry>
where
    S: GraphStore + ?Sized,
{
    let result = match store.query(&query::children_of(container_uid)).await {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!(
                container = %container_uid,
                error = %e,
                "failed to list timeline entries"
            );
            return Vec::new();
        }
    };

    let mut entries: Vec<TimelineEntry> = rows(&result)
        .iter()
        .filter_map(|row| row.as_array().and_then(|cells| cells.first()))
        .filter_map(parse_pulled_block)
        .collect();
    entries.sort_by_key(|entry| entry.order);
    entries
}

fn rows(result: &Value) -> &[Value] {
    result
        .get("result")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn first_row(result: &Value) -> Option<&Vec<Value>> {
    rows(result).first().and_then(Value::as_array)
}

/// Pull results come back keyed `:block/uid`; some deployments drop the
/// namespace.
fn pulled_field<'a>(block: &'a Value, name: &str) -> Option<&'a Value> {
    block
        .get(format!(":block/{name}"))
        .or_else(|| block.get(name))
}

fn parse_pulled_block(block: &Value) -> Option<TimelineEntry> {
    let uid = pulled_field(block, "uid")?.as_str()?;
    let content = pulled_field(block, "string")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let order = pulled_field(block, "order")
        .and_then(Value::as_i64)
        .unwrap_or(0);
    Some(TimelineEntry::new(uid, content, order))
}
