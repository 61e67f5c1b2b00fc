#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;
use daybook_engine::{
    Action, Completion, CompletionClient, CompletionRequest, Day, DecodeError, EngineConfig,
    EngineError, ModelError, SYSTEM_PROMPT, TimelineEngine, Verb,
};
use daybook_store::mock::MockGraphStore;
use pretty_assertions::assert_eq;

const TODAY_TITLE: &str = "January 17th, 2026";
const YESTERDAY_TITLE: &str = "January 16th, 2026";

/// Completion client that returns a fixed reply and remembers what it was asked.
struct ScriptedModel {
    reply: String,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedModel {
    fn replying(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn only_prompt(&self) -> String {
        let requests = self.requests();
        assert_eq!(requests.len(), 1, "model should be called exactly once");
        requests[0].prompt.clone()
    }
}

#[async_trait]
impl CompletionClient for ScriptedModel {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, ModelError> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(Completion {
            text: self.reply.clone(),
            stop_reason: Some("end_turn".to_string()),
            ..Completion::default()
        })
    }
}

fn config() -> EngineConfig {
    EngineConfig::from_lookup(|name| match name {
        "ANTHROPIC_API_KEY" => Some("sk-test".to_string()),
        "ROAM_API_TOKEN" => Some("roam-token".to_string()),
        "ROAM_GRAPH_NAME" => Some("journal".to_string()),
        _ => None,
    })
    .unwrap()
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 17).unwrap()
}

/// Today's page with a Timeline block holding one unformatted entry.
fn today_only() -> MockGraphStore {
    MockGraphStore::new()
        .with_page(TODAY_TITLE, "p-today")
        .with_block("p-today", "h-today", "Morning notes", 0)
        .with_block("p-today", "tcont", "Timeline", 1)
        .with_block("tcont", "a1", "09:00 起床", 0)
}

fn both_days() -> MockGraphStore {
    today_only()
        .with_block("tcont", "a2", "9.5 早餐", 1)
        .with_page(YESTERDAY_TITLE, "p-yesterday")
        .with_block("p-yesterday", "ycont", "Timeline", 0)
        .with_block("ycont", "y2", "23:30 - 02:00 看书", 1)
        .with_block("ycont", "y1", "21:00 - 22:30 (**1h30'**) - 跑步", 0)
}

#[tokio::test]
async fn today_only_skips_yesterday_actions() {
    let model = ScriptedModel::replying(
        r#"{
            "yesterday": [{"type": "create", "string": "23:00 - 00:00 (**1h00'**) - 睡觉"}],
            "today": [{"type": "update", "uid": "a1", "string": "09:00 - 09:30 (**30'**) - 起床"}]
        }"#,
    );
    let engine = TimelineEngine::new(config(), today_only(), model);

    let report = engine.run_for(today()).await.unwrap();

    let prompt = engine.model().only_prompt();
    assert!(prompt.contains("- [a1] 09:00 起床"));
    assert!(prompt.contains("Yesterday's last end time: (unknown)"));
    assert!(prompt.contains("Timeline uid: N/A"));
    assert!(prompt.contains("(No yesterday entries)"));

    assert_eq!(report.containers.yesterday, None);
    assert_eq!(report.apply.skipped_days, vec![(Day::Yesterday, 1)]);
    assert!(report.apply.applied(Day::Today, Verb::Update));

    let writes = engine.store().writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].op_names(), vec!["update-block".to_string()]);
}

#[tokio::test]
async fn fenced_single_create_is_applied() {
    let model = ScriptedModel::replying(
        "```json\n{\"yesterday\": [], \"today\": [{\"type\": \"create\", \"string\": \"10:00 - 10:30 (**30'**) - 读书\"}]}\n```",
    );
    let engine = TimelineEngine::new(config(), today_only(), model);

    let report = engine.run_for(today()).await.unwrap();

    let actions: Vec<&Action> = report.plan.for_day(Day::Today).collect();
    assert_eq!(
        actions,
        vec![&Action::Create {
            string: "10:00 - 10:30 (**30'**) - 读书".to_string()
        }]
    );
    assert_eq!(report.plan.len(), 1);

    let writes = engine.store().writes();
    assert_eq!(writes.len(), 1);
    let op = &writes[0].ops()[0];
    assert_eq!(op["location"]["parent-uid"], "tcont");
    assert_eq!(op["block"]["string"], "10:00 - 10:30 (**30'**) - 读书");
}

#[tokio::test]
async fn failed_update_batch_leaves_other_batches_applied() {
    let model = ScriptedModel::replying(
        r#"{
            "yesterday": [{"type": "delete", "uid": "y2"}],
            "today": [
                {"type": "update", "uid": "a1", "string": "09:00 - 09:30 (**30'**) - 起床"},
                {"type": "create", "string": "00:00 - 02:00 (**2h00'**) - 看书"}
            ]
        }"#,
    );
    let store = both_days().failing_batches_with("update-block");
    let engine = TimelineEngine::new(config(), store, model);

    let report = engine.run_for(today()).await.unwrap();

    assert!(report.apply.applied(Day::Yesterday, Verb::Delete));
    assert!(!report.apply.applied(Day::Today, Verb::Update));
    assert!(report.apply.applied(Day::Today, Verb::Create));
    assert_eq!(report.apply.failed().count(), 1);

    let order: Vec<Vec<String>> = engine
        .store()
        .writes()
        .iter()
        .map(|w| w.op_names())
        .collect();
    assert_eq!(
        order,
        vec![
            vec!["delete-block".to_string()],
            vec!["update-block".to_string()],
            vec!["create-block".to_string()],
        ]
    );
}

#[tokio::test]
async fn prompt_carries_both_days_and_boundary() {
    let model = ScriptedModel::replying(r#"{"yesterday": [], "today": []}"#);
    let engine = TimelineEngine::new(config(), both_days(), model);

    let report = engine.run_for(today()).await.unwrap();
    assert!(report.plan.is_empty());
    assert!(engine.store().writes().is_empty());

    let requests = engine.model().requests();
    assert_eq!(requests[0].system, SYSTEM_PROMPT);
    assert_eq!(requests[0].max_tokens, 16384);
    assert_eq!(requests[0].model, "claude-sonnet-4-20250514");

    let prompt = &requests[0].prompt;
    // Entries sorted by order, not insertion.
    let y1 = prompt.find("- [y1]").unwrap();
    let y2 = prompt.find("- [y2]").unwrap();
    assert!(y1 < y2);
    assert!(prompt.contains("Yesterday's last end time: 02:00"));
    assert!(prompt.contains("Timeline uid: ycont"));
    assert!(prompt.contains(YESTERDAY_TITLE));
    assert!(prompt.contains("- [a2] 9.5 早餐"));
}

#[tokio::test]
async fn missing_today_page_aborts_before_model_call() {
    let store = MockGraphStore::new().with_page(YESTERDAY_TITLE, "p-yesterday");
    let engine = TimelineEngine::new(config(), store, ScriptedModel::replying("{}"));

    let err = engine.run_for(today()).await.unwrap_err();
    assert!(matches!(err, EngineError::PageNotFound { ref title } if title == TODAY_TITLE));
    assert!(engine.model().requests().is_empty());
}

#[tokio::test]
async fn missing_timeline_block_aborts() {
    let store = MockGraphStore::new()
        .with_page(TODAY_TITLE, "p-today")
        .with_block("p-today", "h", "Morning notes", 0);
    let engine = TimelineEngine::new(config(), store, ScriptedModel::replying("{}"));

    let err = engine.run_for(today()).await.unwrap_err();
    assert!(matches!(err, EngineError::TimelineNotFound { .. }));
}

#[tokio::test]
async fn empty_timeline_aborts() {
    let store = MockGraphStore::new()
        .with_page(TODAY_TITLE, "p-today")
        .with_block("p-today", "tcont", "Timeline", 0);
    let engine = TimelineEngine::new(config(), store, ScriptedModel::replying("{}"));

    let err = engine.run_for(today()).await.unwrap_err();
    assert!(matches!(err, EngineError::NoEntries { .. }));
    assert!(engine.model().requests().is_empty());
}

#[tokio::test]
async fn store_outage_is_terminal() {
    let engine = TimelineEngine::new(
        config(),
        today_only().failing_queries(),
        ScriptedModel::replying("{}"),
    );

    let err = engine.run_for(today()).await.unwrap_err();
    assert!(matches!(err, EngineError::Store(_)));
    assert_eq!(err.category().as_str(), "STORE_ERROR");
}

#[tokio::test]
async fn undecodable_reply_keeps_raw_text() {
    let reply = "Sorry, I cannot help with that.";
    let engine = TimelineEngine::new(config(), today_only(), ScriptedModel::replying(reply));

    let err = engine.run_for(today()).await.unwrap_err();
    match err {
        EngineError::Decode { source, raw } => {
            assert!(matches!(source, DecodeError::MalformedResponse(_)));
            assert_eq!(raw, reply);
        }
        other => panic!("expected decode error, got {other:?}"),
    }
    assert!(engine.store().writes().is_empty());
}

#[tokio::test]
async fn blank_reply_is_an_empty_response() {
    let engine = TimelineEngine::new(config(), today_only(), ScriptedModel::replying("  "));

    let err = engine.run_for(today()).await.unwrap_err();
    assert!(matches!(err, EngineError::EmptyResponse));
}
