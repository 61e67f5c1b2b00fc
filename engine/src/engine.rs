//! One reconciliation run
//!
//! Resolve both days, ask the model for an edit plan, decode it and write it
//! back. Today must resolve for the run to proceed; yesterday only widens what
//! the model can see and touch.

use chrono::{DateTime, NaiveDate, Utc};
use daybook_store::{
    GraphStore, TimelineEntry, daily_page_title, find_timeline_container, list_entries,
    resolve_day_container,
};
use tracing::{debug, error, info, warn};

use crate::actions::{ActionPlan, Day};
use crate::apply::{ApplyReport, DayContainers, apply_plan};
use crate::config::EngineConfig;
use crate::decode::{DecodeMethod, decode_plan};
use crate::errors::{EngineError, Result};
use crate::model::{CompletionClient, CompletionRequest};
use crate::prompt::{PromptInput, SYSTEM_PROMPT, build_prompt};
use crate::timeline::{DaySummary, last_end_time};

/// What a successful run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub today: NaiveDate,
    pub containers: DayContainers,
    pub plan: ActionPlan,
    pub decode_method: DecodeMethod,
    /// Records dropped during decoding.
    pub dropped: usize,
    pub apply: ApplyReport,
}

/// Yesterday as far as it could be resolved.
#[derive(Debug, Default)]
struct PriorDay {
    container: Option<String>,
    entries: Vec<TimelineEntry>,
}

pub struct TimelineEngine<S, M> {
    config: EngineConfig,
    store: S,
    model: M,
}

impl<S, M> TimelineEngine<S, M>
where
    S: GraphStore,
    M: CompletionClient,
{
    pub fn new(config: EngineConfig, store: S, model: M) -> Self {
        Self {
            config,
            store,
            model,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Reconcile the day containing `now` in the configured offset.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<RunReport> {
        self.run_for(self.config.local_date(now)).await
    }

    /// Reconcile `today` and the day before it.
    pub async fn run_for(&self, today: NaiveDate) -> Result<RunReport> {
        let today_title = daily_page_title(today);
        let yesterday = today.pred_opt();
        let yesterday_title = yesterday.map(daily_page_title).unwrap_or_default();
        info!(today = %today_title, yesterday = %yesterday_title, "starting timeline run");

        let page_uid = resolve_day_container(&self.store, today)
            .await?
            .ok_or_else(|| EngineError::PageNotFound {
                title: today_title.clone(),
            })?;
        let today_container = find_timeline_container(&self.store, &page_uid)
            .await?
            .ok_or_else(|| EngineError::TimelineNotFound {
                title: today_title.clone(),
            })?;
        let today_entries = list_entries(&self.store, &today_container).await;
        if today_entries.is_empty() {
            return Err(EngineError::NoEntries { title: today_title });
        }

        let prior = match yesterday {
            Some(date) => self.load_prior_day(date, &yesterday_title).await,
            None => PriorDay::default(),
        };
        let yesterday_last_end = last_end_time(&prior.entries);

        log_summary(Day::Yesterday, &prior.entries);
        log_summary(Day::Today, &today_entries);
        match yesterday_last_end {
            Some(end) => info!(end = %end, "yesterday's last end time"),
            None => info!("yesterday's last end time unknown"),
        }

        let prompt = build_prompt(&PromptInput {
            yesterday_title: &yesterday_title,
            today_title: &today_title,
            yesterday_container: prior.container.as_deref(),
            today_container: &today_container,
            yesterday_entries: &prior.entries,
            today_entries: &today_entries,
            yesterday_last_end,
        });
        debug!(chars = prompt.chars().count(), "prompt built");

        let completion = self
            .model
            .complete(&CompletionRequest {
                model: self.config.model.clone(),
                max_tokens: self.config.max_tokens,
                system: SYSTEM_PROMPT.to_string(),
                prompt,
            })
            .await?;
        if completion.truncated() {
            warn!("model stopped at the token limit, output may be truncated");
        }
        let text = completion.response_text().ok_or(EngineError::EmptyResponse)?;

        let decoded = match decode_plan(text) {
            Ok(decoded) => decoded,
            Err(source) => {
                error!(error = %source, raw = %text, "could not decode edit plan");
                return Err(EngineError::Decode {
                    source,
                    raw: text.to_string(),
                });
            }
        };
        info!(
            actions = decoded.plan.len(),
            dropped = decoded.dropped.len(),
            "edit plan decoded"
        );

        let containers = DayContainers {
            yesterday: prior.container,
            today: today_container,
        };
        let apply = apply_plan(&self.store, &decoded.plan, &containers).await;
        let failed = apply.failed().count();
        if failed > 0 {
            warn!(failed, "some batches failed");
        }
        info!(applied = apply.applied_actions(), "timeline run finished");

        Ok(RunReport {
            today,
            containers,
            plan: decoded.plan,
            decode_method: decoded.method,
            dropped: decoded.dropped.len(),
            apply,
        })
    }

    /// Any failure here degrades to "no yesterday" instead of aborting.
    async fn load_prior_day(&self, date: NaiveDate, title: &str) -> PriorDay {
        let page_uid = match resolve_day_container(&self.store, date).await {
            Ok(Some(uid)) => uid,
            Ok(None) => {
                info!(title = %title, "yesterday's page not found");
                return PriorDay::default();
            }
            Err(err) => {
                warn!(title = %title, error = %err, "could not resolve yesterday's page");
                return PriorDay::default();
            }
        };

        let container = match find_timeline_container(&self.store, &page_uid).await {
            Ok(Some(uid)) => uid,
            Ok(None) => {
                info!(title = %title, "yesterday has no Timeline block");
                return PriorDay::default();
            }
            Err(err) => {
                warn!(title = %title, error = %err, "could not find yesterday's Timeline block");
                return PriorDay::default();
            }
        };

        let entries = list_entries(&self.store, &container).await;
        PriorDay {
            container: Some(container),
            entries,
        }
    }
}

fn log_summary(day: Day, entries: &[TimelineEntry]) {
    let summary = DaySummary::of(entries);
    info!(
        day = %day,
        entries = summary.entries,
        formatted = summary.formatted,
        needs_formatting = summary.needs_formatting,
        stale_durations = summary.stale_durations,
        tracked_minutes = summary.tracked_minutes,
        "timeline loaded"
    );
}
