//! services/api/src/web/favorites.rs

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use rental_core::{Favorite, Profile};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::rest::{port_error, HandlerError};
use crate::web::state::AppState;

#[derive(Serialize, ToSchema)]
pub struct FavoriteResponse {
    pub vehicle_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<Favorite> for FavoriteResponse {
    fn from(f: Favorite) -> Self {
        Self {
            vehicle_id: f.vehicle_id,
            created_at: f.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ToggleFavoriteResponse {
    pub vehicle_id: Uuid,
    pub is_favorite: bool,
}

#[utoipa::path(
    get,
    path = "/favorites",
    responses((status = 200, description = "The caller's favorites", body = [FavoriteResponse]))
)]
pub async fn list_favorites_handler(
    State(state): State<Arc<AppState>>,
    Extension(requester): Extension<Profile>,
) -> Result<Json<Vec<FavoriteResponse>>, HandlerError> {
    let favorites = state
        .service
        .list_favorites(&requester)
        .await
        .map_err(port_error)?;
    Ok(Json(favorites.into_iter().map(FavoriteResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/favorites/{vehicle_id}/toggle",
    params(("vehicle_id" = Uuid, Path, description = "Vehicle id")),
    responses(
        (status = 200, description = "Favorite added or removed", body = ToggleFavoriteResponse),
        (status = 404, description = "No such vehicle")
    )
)]
pub async fn toggle_favorite_handler(
    State(state): State<Arc<AppState>>,
    Extension(requester): Extension<Profile>,
    Path(vehicle_id): Path<Uuid>,
) -> Result<Json<ToggleFavoriteResponse>, HandlerError> {
    let is_favorite = state
        .service
        .toggle_favorite(&requester, vehicle_id)
        .await
        .map_err(port_error)?;
    Ok(Json(ToggleFavoriteResponse {
        vehicle_id,
        is_favorite,
    }))
}
