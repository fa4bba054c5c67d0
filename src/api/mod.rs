// HTTP API routes: gangs, wars, scoreboard and the command interaction endpoint.

use axum::{
    extract::{Json, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::bot::Bot;
use crate::commands::{CommandTable, Invocation, Reply};
use crate::error::{ErrorKind, ScoreError};
use crate::metrics;

// ── Request types ─────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CreateGangRequest {
    pub name: String,
}

#[derive(Deserialize)]
pub struct RenameGangRequest {
    pub name: String,
}

#[derive(Deserialize)]
pub struct CreateWarRequest {
    pub attacking_gang: String,
    pub attacking_score: i64,
    pub defending_gang: String,
    pub defending_score: i64,
}

#[derive(Deserialize)]
pub struct UpdateScoresRequest {
    pub attacking_score: i64,
    pub defending_score: i64,
}

#[derive(Deserialize)]
pub struct SetupScoreboardRequest {
    pub channel_id: u64,
}

#[derive(Deserialize)]
pub struct AddScoreRequest {
    pub attacking_gang: String,
    pub attacking_score: i64,
    pub defending_gang: String,
    pub defending_score: i64,
}

#[derive(Deserialize)]
pub struct ListWarsParams {
    /// Only the most recent `limit` wars, newest first.
    pub limit: Option<u32>,
}

// ── Shared application state ─────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub bot: Arc<Bot>,
    pub commands: Arc<CommandTable>,
}

// ── Error helper ──────────────────────────────────────────────────────

fn json_error(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

impl IntoResponse for ScoreError {
    fn into_response(self) -> Response {
        let status = match self.kind() {
            ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::TransientTransport => {
                tracing::error!("Transport error: {}", self);
                StatusCode::SERVICE_UNAVAILABLE
            }
        };
        json_error(
            status,
            json!({
                "error": self.to_string(),
                "kind": self.kind(),
                "field": self.field(),
            }),
        )
    }
}

type ApiResult = Result<Response, ScoreError>;

// ── Router ────────────────────────────────────────────────────────────

pub fn router(bot: Arc<Bot>, commands: Arc<CommandTable>) -> Router {
    let state = AppState { bot, commands };

    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        // Gangs
        .route("/api/gangs", get(list_gangs).post(create_gang))
        .route(
            "/api/gangs/{id}",
            get(get_gang).put(rename_gang).delete(delete_gang),
        )
        .route("/api/gangs/{id}/wars", get(list_gang_wars))
        // Wars
        .route("/api/wars", get(list_wars).post(create_war))
        .route(
            "/api/wars/{id}",
            get(get_war).put(update_war_scores).delete(delete_war),
        )
        // Scoreboard
        .route("/api/scoreboard", get(get_scoreboard).post(setup_scoreboard))
        .route("/api/scoreboard/scores", post(add_score))
        // Slash command invocations
        .route("/api/interactions", post(interaction))
        .with_state(state)
}

async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "scorekeeper",
        "uptime_seconds": state.bot.uptime_seconds(),
        "modules": state.commands.names(),
    }))
}

async fn metrics_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::gather_metrics(),
    )
}

// ── Gang handlers ─────────────────────────────────────────────────────

async fn list_gangs(State(state): State<AppState>) -> ApiResult {
    let gangs = state.bot.gangs.get_all().await?;
    Ok((StatusCode::OK, Json(json!(gangs))).into_response())
}

async fn create_gang(
    State(state): State<AppState>,
    Json(req): Json<CreateGangRequest>,
) -> ApiResult {
    let gang = state.bot.gangs.create(&req.name).await?;
    Ok((StatusCode::CREATED, Json(json!(gang))).into_response())
}

async fn get_gang(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult {
    let gang = state.bot.gangs.get_by_id(id).await?;
    Ok((StatusCode::OK, Json(json!(gang))).into_response())
}

async fn rename_gang(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<RenameGangRequest>,
) -> ApiResult {
    let gang = state.bot.gangs.get_by_id(id).await?;
    let gang = state.bot.gangs.update_name(&gang, &req.name).await?;
    Ok((StatusCode::OK, Json(json!(gang))).into_response())
}

async fn delete_gang(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult {
    let gang = state.bot.gangs.get_by_id(id).await?;
    let wars_removed = state.bot.gangs.delete(&gang).await?;
    Ok((
        StatusCode::OK,
        Json(json!({ "deleted": gang.id, "wars_removed": wars_removed })),
    )
        .into_response())
}

async fn list_gang_wars(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult {
    let gang = state.bot.gangs.get_by_id(id).await?;
    let wars = state.bot.wars.get_by_gang(&gang).await?;
    Ok((StatusCode::OK, Json(json!(wars))).into_response())
}

// ── War handlers ──────────────────────────────────────────────────────

async fn list_wars(
    State(state): State<AppState>,
    Query(params): Query<ListWarsParams>,
) -> ApiResult {
    let wars = match params.limit {
        Some(limit) => state.bot.wars.get_recent(limit).await?,
        None => state.bot.wars.get_all().await?,
    };
    Ok((StatusCode::OK, Json(json!(wars))).into_response())
}

async fn create_war(
    State(state): State<AppState>,
    Json(req): Json<CreateWarRequest>,
) -> ApiResult {
    let attacker = state.bot.gangs.get_by_name(&req.attacking_gang).await?;
    let defender = state.bot.gangs.get_by_name(&req.defending_gang).await?;
    let war = state
        .bot
        .wars
        .create(&attacker, req.attacking_score, &defender, req.defending_score)
        .await?;
    Ok((StatusCode::CREATED, Json(json!(war))).into_response())
}

async fn get_war(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult {
    let war = state.bot.wars.get_by_id(id).await?;
    Ok((StatusCode::OK, Json(json!(war))).into_response())
}

async fn update_war_scores(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateScoresRequest>,
) -> ApiResult {
    let war = state.bot.wars.get_by_id(id).await?;
    let war = state
        .bot
        .wars
        .update_scores(&war, req.attacking_score, req.defending_score)
        .await?;
    Ok((StatusCode::OK, Json(json!(war))).into_response())
}

async fn delete_war(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult {
    let war = state.bot.wars.get_by_id(id).await?;
    state.bot.wars.delete(&war).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

// ── Scoreboard handlers ───────────────────────────────────────────────

async fn get_scoreboard(State(state): State<AppState>) -> ApiResult {
    match state.bot.scoreboard.current().await? {
        Some(message) => Ok((StatusCode::OK, Json(json!(message))).into_response()),
        None => Err(ScoreError::not_found(
            "scoreboard",
            "No scoreboard has been set up.",
        )),
    }
}

async fn setup_scoreboard(
    State(state): State<AppState>,
    Json(req): Json<SetupScoreboardRequest>,
) -> ApiResult {
    let message = state.bot.scoreboard.setup(req.channel_id).await?;
    Ok((StatusCode::CREATED, Json(json!(message))).into_response())
}

async fn add_score(
    State(state): State<AppState>,
    Json(req): Json<AddScoreRequest>,
) -> ApiResult {
    let line = state
        .bot
        .scoreboard
        .add_score(
            &req.attacking_gang,
            req.attacking_score,
            &req.defending_gang,
            req.defending_score,
        )
        .await?;
    Ok((StatusCode::OK, Json(json!({ "line": line }))).into_response())
}

// ── Interactions ──────────────────────────────────────────────────────

async fn interaction(
    State(state): State<AppState>,
    Json(inv): Json<Invocation>,
) -> Json<Reply> {
    Json(state.commands.dispatch(&state.bot, &inv).await)
}
