//! Daybook timeline reconciliation
//!
//! Reads yesterday's and today's Timeline blocks, asks a completion model for
//! an edit plan that puts every entry into `HH:MM - HH:MM (**duration**)`
//! form, and writes the plan back.
//!
//! - [`timeline`]: time ranges, durations, formatted-entry detection
//! - [`prompt`]: instruction text, rules as data
//! - [`decode`]: edit plan recovery from model output
//! - [`apply`]: batched writes per day and verb
//! - [`engine`]: one end-to-end run

#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod actions;
pub mod apply;
pub mod config;
pub mod decode;
pub mod engine;
pub mod errors;
pub mod model;
pub mod prompt;
pub mod timeline;

pub use actions::{Action, ActionPlan, Day, PlannedAction, Verb};
pub use apply::{ApplyReport, BatchOutcome, BatchRecord, DayContainers, apply_plan};
pub use config::{ConfigError, EngineConfig};
pub use decode::{DecodeError, DecodeMethod, DecodedPlan, decode_plan};
pub use engine::{RunReport, TimelineEngine};
pub use errors::{EngineError, ErrorCategory, Result};
pub use model::{AnthropicClient, Completion, CompletionClient, CompletionRequest, ModelError};
pub use prompt::{PromptInput, SYSTEM_PROMPT, build_prompt};
pub use timeline::{
    ClockTime, DaySummary, TimeRange, format_duration, last_end_time, marked_duration,
    parse_duration,
};
