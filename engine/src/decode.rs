//! Edit plan decoding from model output
//!
//! The model is asked for bare JSON but does not always comply. Decoding runs a
//! short cascade:
//! 1. Strip markdown fence lines (```` ```json ````, ```` ``` ````)
//! 2. Cut from the first `{` to the last `}`
//! 3. Strict parse
//! 4. Salvage: longest line-prefix that parses once its open brackets are closed
//!
//! Records under `yesterday`/`today` are then validated one by one; a bad
//! record is dropped with a warning and never fails the whole plan.

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::actions::{Action, ActionPlan, Day};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("no JSON object found in response ({0} bytes analyzed)")]
    MalformedResponse(usize),

    #[error("JSON could not be parsed or salvaged: {0}")]
    Unsalvageable(String),
}

/// How the root object was recovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeMethod {
    Strict,
    /// Parsed from the first `kept_lines` of `total_lines` lines.
    Salvaged { kept_lines: usize, total_lines: usize },
}

/// A record that failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedRecord {
    pub day: Day,
    /// Position in the day's list; `None` when the whole list was unusable.
    pub index: Option<usize>,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPlan {
    pub plan: ActionPlan,
    pub method: DecodeMethod,
    pub dropped: Vec<DroppedRecord>,
}

/// Wire shape of one record, dispatched on `type`.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum RawAction {
    Update { uid: String, string: String },
    Create { string: String },
    Delete { uid: String },
}

impl RawAction {
    fn into_action(self) -> Result<Action, String> {
        let non_blank = |field: &str, value: String| {
            if value.trim().is_empty() {
                Err(format!("`{field}` is empty"))
            } else {
                Ok(value)
            }
        };
        Ok(match self {
            RawAction::Update { uid, string } => Action::Update {
                uid: non_blank("uid", uid)?,
                string: non_blank("string", string)?,
            },
            RawAction::Create { string } => Action::Create {
                string: non_blank("string", string)?,
            },
            RawAction::Delete { uid } => Action::Delete {
                uid: non_blank("uid", uid)?,
            },
        })
    }
}

/// Decode model output into an edit plan.
pub fn decode_plan(text: &str) -> Result<DecodedPlan, DecodeError> {
    let cleaned = strip_fences(text);
    let candidate = locate_object(&cleaned).ok_or(DecodeError::MalformedResponse(text.len()))?;

    let (root, method) = match serde_json::from_str::<Value>(candidate) {
        Ok(value) => (value, DecodeMethod::Strict),
        Err(strict_err) => {
            debug!(error = %strict_err, "strict parse failed, salvaging line prefix");
            let total_lines = candidate.lines().count();
            let (value, kept_lines) = salvage(candidate)
                .ok_or_else(|| DecodeError::Unsalvageable(strict_err.to_string()))?;
            warn!(kept_lines, total_lines, "response truncated, salvaged a prefix");
            (
                value,
                DecodeMethod::Salvaged {
                    kept_lines,
                    total_lines,
                },
            )
        }
    };

    let Value::Object(root) = root else {
        return Err(DecodeError::MalformedResponse(text.len()));
    };

    let (plan, dropped) = plan_from_object(&root);
    Ok(DecodedPlan {
        plan,
        method,
        dropped,
    })
}

/// Remove markdown fence markers at line boundaries.
pub fn strip_fences(text: &str) -> String {
    text.lines()
        .map(|line| {
            let trimmed = line.trim();
            if let Some(rest) = trimmed.strip_prefix("```") {
                rest.strip_prefix("json").unwrap_or(rest).trim_start()
            } else if let Some(rest) = trimmed.strip_suffix("```") {
                rest
            } else {
                line
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Slice from the first `{` through the last `}`.
fn locate_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

/// Longest line-prefix of `candidate` that parses to an object after closing
/// its open brackets. Returns the value and the number of lines kept.
fn salvage(candidate: &str) -> Option<(Value, usize)> {
    let lines: Vec<&str> = candidate.lines().collect();
    (1..=lines.len()).rev().find_map(|kept| {
        let prefix = lines[..kept].join("\n");
        let closed = close_open_brackets(&prefix)?;
        match serde_json::from_str::<Value>(&closed) {
            Ok(value @ Value::Object(_)) => Some((value, kept)),
            _ => None,
        }
    })
}

/// Append the closers `prefix` is missing. `None` when the prefix ends inside a
/// string or its brackets are already mismatched.
fn close_open_brackets(prefix: &str) -> Option<String> {
    let mut closers = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for ch in prefix.chars() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => closers.push('}'),
            '[' => closers.push(']'),
            '}' | ']' => {
                if closers.pop() != Some(ch) {
                    return None;
                }
            }
            _ => {}
        }
    }
    if in_string {
        return None;
    }

    let mut out = prefix.trim_end().trim_end_matches(',').to_string();
    while let Some(closer) = closers.pop() {
        out.push(closer);
    }
    Some(out)
}

fn plan_from_object(root: &Map<String, Value>) -> (ActionPlan, Vec<DroppedRecord>) {
    let mut plan = ActionPlan::new();
    let mut dropped = Vec::new();

    for key in root.keys() {
        if !Day::ALL.iter().any(|day| day.key() == key) {
            warn!(key = %key, "ignoring unknown top-level key in edit plan");
        }
    }

    for day in Day::ALL {
        let Some(value) = root.get(day.key()) else {
            continue;
        };
        let Some(records) = value.as_array() else {
            warn!(day = %day, kind = json_kind(value), "day value is not a list, dropping it");
            dropped.push(DroppedRecord {
                day,
                index: None,
                reason: format!("expected a list, found {}", json_kind(value)),
            });
            continue;
        };

        for (index, record) in records.iter().enumerate() {
            let parsed = serde_json::from_value::<RawAction>(record.clone())
                .map_err(|err| err.to_string())
                .and_then(RawAction::into_action);
            match parsed {
                Ok(action) => plan.push(day, action),
                Err(reason) => {
                    warn!(day = %day, index, reason = %reason, "dropping invalid action record");
                    dropped.push(DroppedRecord {
                        day,
                        index: Some(index),
                        reason,
                    });
                }
            }
        }
    }

    (plan, dropped)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
