#![allow(clippy::unwrap_used, clippy::expect_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn daybook_format() -> Command {
    let mut cmd = Command::cargo_bin("daybook-format").unwrap();
    cmd.env_clear().env("RUST_LOG", "info");
    cmd
}

#[test]
fn missing_variable_is_named_and_fails() {
    daybook_format()
        .env("ANTHROPIC_API_KEY", "sk-test")
        .env("ROAM_API_TOKEN", "roam-token")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains(
            "Missing required environment variables: ROAM_GRAPH_NAME",
        ))
        .stderr(predicate::str::contains("ANTHROPIC_API_KEY").not());
}

#[test]
fn empty_variable_counts_as_missing() {
    daybook_format()
        .env("ANTHROPIC_API_KEY", "")
        .env("ROAM_API_TOKEN", "roam-token")
        .env("ROAM_GRAPH_NAME", "journal")
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "Missing required environment variables: ANTHROPIC_API_KEY",
        ));
}

#[test]
fn invalid_timezone_fails() {
    daybook_format()
        .env("ANTHROPIC_API_KEY", "sk-test")
        .env("ROAM_API_TOKEN", "roam-token")
        .env("ROAM_GRAPH_NAME", "journal")
        .env("TZ_HOURS", "noon")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("TZ_HOURS"));
}

/// Roam endpoint that serves the same page, Timeline block and entry for any
/// day, and expects `writes` batch writes.
async fn mount_graph(server: &MockServer, writes: u64) {
    let query = "/api/graph/journal/q";
    Mock::given(method("POST"))
        .and(path(query))
        .and(body_string_contains(":node/title"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": [["page"]]})))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path(query))
        .and(body_string_contains("clojure.string/includes?"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"result": [["tcont", "Timeline"]]})),
        )
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path(query))
        .and(body_string_contains("(pull ?child"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": [[{":block/uid": "a1", ":block/string": "09:00 起床", ":block/order": 0}]]
        })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/graph/journal/write"))
        .and(header("authorization", "Bearer roam-token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(writes)
        .mount(server)
        .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn full_run_applies_plan_and_succeeds() {
    let roam = MockServer::start().await;
    let anthropic = MockServer::start().await;
    mount_graph(&roam, 1).await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "msg_1",
            "content": [{
                "type": "text",
                "text": "{\"yesterday\": [], \"today\": [{\"type\": \"update\", \"uid\": \"a1\", \"string\": \"09:00 - 09:30 (**30'**) - 起床\"}]}"
            }],
            "stop_reason": "end_turn"
        })))
        .expect(1)
        .mount(&anthropic)
        .await;

    daybook_format()
        .env("ANTHROPIC_API_KEY", "sk-test")
        .env("ANTHROPIC_BASE_URL", anthropic.uri())
        .env("ROAM_API_TOKEN", "roam-token")
        .env("ROAM_GRAPH_NAME", "journal")
        .env("ROAM_API_BASE", format!("{}/api/graph", roam.uri()))
        .assert()
        .success();
}

#[tokio::test(flavor = "multi_thread")]
async fn undecodable_reply_fails_the_run() {
    let roam = MockServer::start().await;
    let anthropic = MockServer::start().await;
    mount_graph(&roam, 0).await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{"type": "text", "text": "I am unable to format this timeline."}],
            "stop_reason": "end_turn"
        })))
        .mount(&anthropic)
        .await;

    daybook_format()
        .env("ANTHROPIC_API_KEY", "sk-test")
        .env("ANTHROPIC_BASE_URL", anthropic.uri())
        .env("ROAM_API_TOKEN", "roam-token")
        .env("ROAM_GRAPH_NAME", "journal")
        .env("ROAM_API_BASE", format!("{}/api/graph", roam.uri()))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("could not parse actions"));
}
