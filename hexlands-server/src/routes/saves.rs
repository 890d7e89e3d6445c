//! Save slot and autosave endpoints

use super::error::ApiError;
use super::games::mutate;
use crate::state::ServerState;
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::Response,
    Json,
};
use hexlands_core::{GameId, SaveListing};
use serde_json::json;
use std::sync::Arc;

/// Autosaves (oldest first) and occupied manual slots
pub async fn list_saves(
    State(state): State<Arc<ServerState>>,
    Path(game_id): Path<GameId>,
) -> Result<Json<SaveListing>, ApiError> {
    // Unknown games are a 404 rather than an empty listing
    state.service.game(game_id).await?;
    Ok(Json(state.service.list_saves(game_id)))
}

pub async fn put_slot(
    State(state): State<Arc<ServerState>>,
    Path((game_id, slot)): Path<(GameId, u8)>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let route = format!("PUT /api/games/{game_id}/saves/{slot}");
    mutate(&state, &headers, route, |caller| state.service.save_slot(game_id, caller, slot)).await
}

pub async fn delete_slot(
    State(state): State<Arc<ServerState>>,
    Path((game_id, slot)): Path<(GameId, u8)>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let route = format!("DELETE /api/games/{game_id}/saves/{slot}");
    let service = &state.service;
    mutate(&state, &headers, route, move |caller| async move {
        service.delete_slot(game_id, caller, slot).await?;
        Ok(json!({ "deleted": slot }))
    })
    .await
}

pub async fn load_slot(
    State(state): State<Arc<ServerState>>,
    Path((game_id, slot)): Path<(GameId, u8)>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let route = format!("POST /api/games/{game_id}/saves/{slot}/load");
    mutate(&state, &headers, route, |caller| state.service.load_slot(game_id, caller, slot)).await
}

pub async fn load_autosave(
    State(state): State<Arc<ServerState>>,
    Path((game_id, turn_no)): Path<(GameId, u32)>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let route = format!("POST /api/games/{game_id}/autosaves/{turn_no}/load");
    mutate(&state, &headers, route, |caller| state.service.load_autosave(game_id, caller, turn_no)).await
}
