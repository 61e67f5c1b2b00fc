//! Typed edit plan
//!
//! Every action belongs to exactly one day. Creates carry no target: they are
//! appended under the container of their day when applied.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Day {
    Yesterday,
    Today,
}

impl Day {
    /// Application order.
    pub const ALL: [Day; 2] = [Day::Yesterday, Day::Today];

    /// Key of this day's list in the edit plan JSON.
    pub fn key(self) -> &'static str {
        match self {
            Day::Yesterday => "yesterday",
            Day::Today => "today",
        }
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Update,
    Delete,
    Create,
}

impl Verb {
    /// Order in which one day's batches are written.
    pub const APPLY_ORDER: [Verb; 3] = [Verb::Update, Verb::Delete, Verb::Create];

    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Update => "update",
            Verb::Delete => "delete",
            Verb::Create => "create",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Replace the text of an existing block.
    Update { uid: String, string: String },
    /// Append a new block to the day's container.
    Create { string: String },
    /// Remove an existing block.
    Delete { uid: String },
}

impl Action {
    pub fn verb(&self) -> Verb {
        match self {
            Action::Update { .. } => Verb::Update,
            Action::Create { .. } => Verb::Create,
            Action::Delete { .. } => Verb::Delete,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedAction {
    pub day: Day,
    pub action: Action,
}

/// Decoded edit plan, in the order the model listed the actions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionPlan {
    actions: Vec<PlannedAction>,
}

impl ActionPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, day: Day, action: Action) {
        self.actions.push(PlannedAction { day, action });
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlannedAction> {
        self.actions.iter()
    }

    /// Actions of one day, keeping plan order.
    pub fn for_day(&self, day: Day) -> impl Iterator<Item = &Action> {
        self.actions
            .iter()
            .filter(move |planned| planned.day == day)
            .map(|planned| &planned.action)
    }

    pub fn count(&self, day: Day, verb: Verb) -> usize {
        self.for_day(day).filter(|a| a.verb() == verb).count()
    }
}
