//! Game API endpoints
//!
//! Every mutating handler goes through `mutate`, which resolves the caller,
//! applies the idempotency guard and serializes the result.

use super::error::{caller, idempotency_token, ApiError, REPLAY_HEADER};
use crate::engine::{EndTurnOutcome, ExpansionPreview, GameView, UnitPreview};
use crate::idempotency::{IdempotencyGuard, Outcome};
use crate::state::ServerState;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use hexlands_core::{CityId, Command, GameId, GridPosition, ParticipantId, Scenario, TurnRecord, UnitId};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;

// ============================================================================
// SHARED
// ============================================================================

/// Run a mutation for the caller at most once per idempotency token
pub(crate) async fn mutate<F, Fut, T>(
    state: &ServerState,
    headers: &HeaderMap,
    route: String,
    op: F,
) -> Result<Response, ApiError>
where
    F: FnOnce(ParticipantId) -> Fut,
    Fut: Future<Output = hexlands_core::error::Result<T>>,
    T: Serialize,
{
    let caller = caller(headers)?;
    let key = idempotency_token(headers).map(|token| IdempotencyGuard::key(&route, &caller.to_string(), &token));

    let outcome = state
        .idempotency
        .execute(key.as_deref(), || async move {
            let result = op(caller).await?;
            serde_json::to_value(result).map_err(|e| ApiError::internal(e.to_string()))
        })
        .await?;
    Ok(respond(outcome))
}

fn respond(outcome: Outcome) -> Response {
    let mut response = Json(outcome.body).into_response();
    if outcome.replayed {
        response
            .headers_mut()
            .insert(REPLAY_HEADER, HeaderValue::from_static("true"));
    }
    response
}

// ============================================================================
// CREATION AND READS
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct GenerateRequest {
    pub rows: i32,
    pub cols: i32,
    #[serde(default)]
    pub seed: u64,
}

/// Scenario to seed from: explicit, generated, or the default duel
#[derive(Debug, Default, Deserialize)]
pub struct CreateGameRequest {
    pub scenario: Option<Scenario>,
    pub generate: Option<GenerateRequest>,
    /// Combat seed; derived from the clock when absent
    pub seed: Option<u64>,
}

pub async fn create_game(State(state): State<Arc<ServerState>>, body: Bytes) -> Result<Json<GameView>, ApiError> {
    let req: CreateGameRequest = if body.is_empty() {
        CreateGameRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::bad_request(format!("invalid body: {e}")))?
    };

    let scenario = match (req.scenario, req.generate) {
        (Some(scenario), _) => scenario,
        (None, Some(gen)) => Scenario::generate("Generated", gen.rows, gen.cols, gen.seed)
            .map_err(|e| ApiError::bad_request(e.to_string()))?,
        (None, None) => Scenario::default(),
    };

    let game = state.service.create_game(&scenario, req.seed).await?;
    Ok(Json(game))
}

pub async fn get_game(
    State(state): State<Arc<ServerState>>,
    Path(game_id): Path<GameId>,
) -> Result<Json<GameView>, ApiError> {
    Ok(Json(state.service.game(game_id).await?))
}

pub async fn get_turns(
    State(state): State<Arc<ServerState>>,
    Path(game_id): Path<GameId>,
) -> Result<Json<Vec<TurnRecord>>, ApiError> {
    Ok(Json(state.service.turns(game_id).await?))
}

pub async fn unit_preview(
    State(state): State<Arc<ServerState>>,
    Path((game_id, unit_id)): Path<(GameId, UnitId)>,
) -> Result<Json<UnitPreview>, ApiError> {
    Ok(Json(state.service.unit_preview(game_id, unit_id).await?))
}

pub async fn expansion_preview(
    State(state): State<Arc<ServerState>>,
    Path((game_id, city_id)): Path<(GameId, CityId)>,
) -> Result<Json<ExpansionPreview>, ApiError> {
    Ok(Json(state.service.expansion_preview(game_id, city_id).await?))
}

// ============================================================================
// COMMANDS
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct MoveRequest {
    pub unit_id: UnitId,
    pub target: GridPosition,
}

#[derive(Debug, Deserialize)]
pub struct AttackUnitRequest {
    pub attacker_unit_id: UnitId,
    pub target_unit_id: UnitId,
}

#[derive(Debug, Deserialize)]
pub struct AttackCityRequest {
    pub attacker_unit_id: UnitId,
    pub target_city_id: CityId,
}

#[derive(Debug, Deserialize)]
pub struct SpawnRequest {
    pub city_id: CityId,
    pub unit_code: String,
}

#[derive(Debug, Deserialize)]
pub struct ExpandRequest {
    pub city_id: CityId,
    pub target: GridPosition,
}

async fn run_command(
    state: &ServerState,
    headers: &HeaderMap,
    game_id: GameId,
    action: &str,
    command: Command,
) -> Result<Response, ApiError> {
    let route = format!("POST /api/games/{game_id}/{action}");
    mutate(state, headers, route, |caller| state.service.execute(game_id, caller, command)).await
}

pub async fn move_unit(
    State(state): State<Arc<ServerState>>,
    Path(game_id): Path<GameId>,
    headers: HeaderMap,
    Json(req): Json<MoveRequest>,
) -> Result<Response, ApiError> {
    let command = Command::MoveUnit {
        unit_id: req.unit_id,
        target: req.target,
    };
    run_command(&state, &headers, game_id, "move", command).await
}

pub async fn attack_unit(
    State(state): State<Arc<ServerState>>,
    Path(game_id): Path<GameId>,
    headers: HeaderMap,
    Json(req): Json<AttackUnitRequest>,
) -> Result<Response, ApiError> {
    let command = Command::AttackUnit {
        attacker_unit_id: req.attacker_unit_id,
        target_unit_id: req.target_unit_id,
    };
    run_command(&state, &headers, game_id, "attack-unit", command).await
}

pub async fn attack_city(
    State(state): State<Arc<ServerState>>,
    Path(game_id): Path<GameId>,
    headers: HeaderMap,
    Json(req): Json<AttackCityRequest>,
) -> Result<Response, ApiError> {
    let command = Command::AttackCity {
        attacker_unit_id: req.attacker_unit_id,
        target_city_id: req.target_city_id,
    };
    run_command(&state, &headers, game_id, "attack-city", command).await
}

pub async fn spawn_unit(
    State(state): State<Arc<ServerState>>,
    Path(game_id): Path<GameId>,
    headers: HeaderMap,
    Json(req): Json<SpawnRequest>,
) -> Result<Response, ApiError> {
    let command = Command::SpawnUnit {
        city_id: req.city_id,
        unit_code: req.unit_code,
    };
    run_command(&state, &headers, game_id, "spawn", command).await
}

pub async fn expand_territory(
    State(state): State<Arc<ServerState>>,
    Path(game_id): Path<GameId>,
    headers: HeaderMap,
    Json(req): Json<ExpandRequest>,
) -> Result<Response, ApiError> {
    let command = Command::ExpandTerritory {
        city_id: req.city_id,
        target: req.target,
    };
    run_command(&state, &headers, game_id, "expand", command).await
}

pub async fn end_turn(
    State(state): State<Arc<ServerState>>,
    Path(game_id): Path<GameId>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let route = format!("POST /api/games/{game_id}/end-turn");
    let service = &state.service;
    mutate(&state, &headers, route, move |caller| async move {
        let outcome: EndTurnOutcome = service.end_turn(game_id, caller).await?;
        Ok(outcome)
    })
    .await
}
