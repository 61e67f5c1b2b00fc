//! Roam graph access for the daybook timeline reconciler
//!
//! - [`client`]: `GraphStore` trait and the HTTP client with host fallback
//! - [`extract`]: daily page → Timeline block → ordered entries
//! - [`ops`]: typed `batch-actions` items
//! - [`dates`]: daily-notes page titles

#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod client;
pub mod dates;
pub mod errors;
pub mod extract;
pub mod ops;
pub mod query;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use client::{GraphStore, HttpGraphStore, StoreSettings};
pub use dates::daily_page_title;
pub use errors::{Result, StoreError};
pub use extract::{
    TIMELINE_MARKER, TimelineEntry, find_timeline_container, list_entries, resolve_day_container,
};
pub use ops::BlockOp;
