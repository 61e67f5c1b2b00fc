//! Edit plan application
//!
//! One `batch-actions` write per (day, verb). Yesterday goes first, then
//! today; within a day updates run before deletes, deletes before creates. A
//! failed batch is logged and recorded, and the remaining batches still run.

use daybook_store::{BlockOp, GraphStore};
use tracing::{info, warn};

use crate::actions::{Action, ActionPlan, Day, Verb};

/// Timeline container uid of each day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayContainers {
    /// Absent when yesterday's page or Timeline block is missing.
    pub yesterday: Option<String>,
    pub today: String,
}

impl DayContainers {
    pub fn get(&self, day: Day) -> Option<&str> {
        match day {
            Day::Yesterday => self.yesterday.as_deref(),
            Day::Today => Some(&self.today),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    Applied,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRecord {
    pub day: Day,
    pub verb: Verb,
    pub count: usize,
    pub outcome: BatchOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub batches: Vec<BatchRecord>,
    /// Days whose actions were not attempted, with the number of actions lost.
    pub skipped_days: Vec<(Day, usize)>,
}

impl ApplyReport {
    pub fn attempted(&self, day: Day, verb: Verb) -> bool {
        self.batches.iter().any(|b| b.day == day && b.verb == verb)
    }

    pub fn applied(&self, day: Day, verb: Verb) -> bool {
        self.batches
            .iter()
            .any(|b| b.day == day && b.verb == verb && b.outcome == BatchOutcome::Applied)
    }

    pub fn failed(&self) -> impl Iterator<Item = &BatchRecord> {
        self.batches
            .iter()
            .filter(|b| matches!(b.outcome, BatchOutcome::Failed(_)))
    }

    pub fn applied_actions(&self) -> usize {
        self.batches
            .iter()
            .filter(|b| b.outcome == BatchOutcome::Applied)
            .map(|b| b.count)
            .sum()
    }

    pub fn is_clean(&self) -> bool {
        self.failed().next().is_none() && self.skipped_days.is_empty()
    }
}

/// Write `plan` to the store.
pub async fn apply_plan<S>(store: &S, plan: &ActionPlan, containers: &DayContainers) -> ApplyReport
where
    S: GraphStore + ?Sized,
{
    let mut report = ApplyReport::default();

    for day in Day::ALL {
        let actions: Vec<&Action> = plan.for_day(day).collect();
        if actions.is_empty() {
            continue;
        }
        let Some(container) = containers.get(day) else {
            warn!(day = %day, actions = actions.len(), "no Timeline container, skipping day");
            report.skipped_days.push((day, actions.len()));
            continue;
        };

        for verb in Verb::APPLY_ORDER {
            let ops = ops_for(verb, &actions, container);
            if ops.is_empty() {
                continue;
            }
            let count = ops.len();
            let outcome = match store.batch_actions(&ops).await {
                Ok(_) => {
                    info!(day = %day, verb = %verb, count, "batch applied");
                    BatchOutcome::Applied
                }
                Err(err) => {
                    warn!(day = %day, verb = %verb, count, error = %err, "batch failed");
                    BatchOutcome::Failed(err.to_string())
                }
            };
            report.batches.push(BatchRecord {
                day,
                verb,
                count,
                outcome,
            });
        }
    }

    report
}

/// Store operations for one verb of one day, in plan order.
fn ops_for(verb: Verb, actions: &[&Action], container: &str) -> Vec<BlockOp> {
    actions
        .iter()
        .filter(|action| action.verb() == verb)
        .map(|action| match action {
            Action::Update { uid, string } => BlockOp::update(uid.as_str(), string.as_str()),
            Action::Delete { uid } => BlockOp::delete(uid.as_str()),
            Action::Create { string } => BlockOp::append(container, string.as_str()),
        })
        .collect()
}
