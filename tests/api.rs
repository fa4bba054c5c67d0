// HTTP surface: status codes and JSON bodies for each resource.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use scorekeeper::api;
use scorekeeper::bot::Bot;
use scorekeeper::commands::CommandTable;
use scorekeeper::config::Settings;
use scorekeeper::db::Database;
use scorekeeper::transport::MemoryTransport;

async fn test_app() -> (Router, Arc<MemoryTransport>) {
    let db = Arc::new(Database::new("sqlite::memory:").await.unwrap());
    let transport = Arc::new(MemoryTransport::new());
    let settings = Settings::default();
    let commands = Arc::new(CommandTable::from_settings(&settings));
    let bot = Arc::new(Bot::new(db, transport.clone(), settings));
    (api::router(bot, commands), transport)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

#[tokio::test]
async fn test_health() {
    let (app, _) = test_app().await;
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["modules"], json!(["gangs", "wars", "scoreboard"]));
}

// ── Gangs ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_gang_lifecycle() {
    let (app, _) = test_app().await;

    let (status, gang) = send(&app, "POST", "/api/gangs", Some(json!({ "name": " Alpha " }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(gang["name"], "Alpha");
    let id = gang["id"].as_i64().unwrap();

    let (status, body) = send(&app, "POST", "/api/gangs", Some(json!({ "name": "Alpha" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "conflict");
    assert_eq!(body["field"], "name");

    let (status, body) = send(&app, "POST", "/api/gangs", Some(json!({ "name": "  " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_input");

    let uri = format!("/api/gangs/{id}");
    let (status, renamed) = send(&app, "PUT", &uri, Some(json!({ "name": "Alpha" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(renamed["name"], "Alpha");

    let (status, body) = send(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["wars_removed"], 0);

    let (status, body) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], format!("No gang found with ID {id}."));
}

// ── Wars ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_war_lifecycle() {
    let (app, _) = test_app().await;
    send(&app, "POST", "/api/gangs", Some(json!({ "name": "Alpha" }))).await;
    send(&app, "POST", "/api/gangs", Some(json!({ "name": "Beta" }))).await;

    let war_body = json!({
        "attacking_gang": "Alpha",
        "attacking_score": 3,
        "defending_gang": "Beta",
        "defending_score": 5
    });
    let (status, war) = send(&app, "POST", "/api/wars", Some(war_body)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(war["attacking_score"], 3);
    let id = war["id"].as_i64().unwrap();

    let self_duel = json!({
        "attacking_gang": "Alpha",
        "attacking_score": 1,
        "defending_gang": "Alpha",
        "defending_score": 1
    });
    let (status, _) = send(&app, "POST", "/api/wars", Some(self_duel)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let uri = format!("/api/wars/{id}");
    let scores = json!({ "attacking_score": 4, "defending_score": 5 });
    let (status, war) = send(&app, "PUT", &uri, Some(scores)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(war["attacking_score"], 4);

    let (_, fetched) = send(&app, "GET", &uri, None).await;
    assert_eq!(fetched["attacking_score"], 4);
    assert_eq!(fetched["defending_score"], 5);

    let (status, wars) = send(&app, "GET", "/api/wars?limit=1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(wars.as_array().unwrap().len(), 1);

    let gang_id = war["attacking_gang_id"].as_i64().unwrap();
    let (_, gang_wars) = send(&app, "GET", &format!("/api/gangs/{gang_id}/wars"), None).await;
    assert_eq!(gang_wars.as_array().unwrap().len(), 1);

    let (status, _) = send(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ── Scoreboard ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_scoreboard_endpoints() {
    let (app, transport) = test_app().await;
    let score = json!({
        "attacking_gang": "A",
        "attacking_score": 1,
        "defending_gang": "B",
        "defending_score": 2
    });

    let (status, body) = send(&app, "POST", "/api/scoreboard/scores", Some(score.clone())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["field"], "scoreboard");

    let (status, message) = send(&app, "POST", "/api/scoreboard", Some(json!({ "channel_id": 9 }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(message["channel_id"], 9);

    let (status, body) = send(&app, "POST", "/api/scoreboard/scores", Some(score.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["line"], "A: 1 - 2 :B");
    assert!(transport.channel_messages(9)[0].ends_with("A: 1 - 2 :B"));

    transport.forbid_channel(9);
    let (status, body) = send(&app, "POST", "/api/scoreboard/scores", Some(score)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["kind"], "forbidden");

    let (status, current) = send(&app, "GET", "/api/scoreboard", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(current, message);
}

// ── Interactions ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_interaction_endpoint() {
    let (app, _) = test_app().await;
    let invocation = json!({
        "module": "gangs",
        "command": "create",
        "options": { "name": "Alpha" }
    });
    let (status, reply) = send(&app, "POST", "/api/interactions", Some(invocation)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["content"], "Gang 'Alpha' created.");
    assert_eq!(reply["ephemeral"], true);
}
