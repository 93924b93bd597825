//! services/api/src/web/profiles.rs
//!
//! Profile endpoints. Users edit their own display name and avatar; only admins
//! read other profiles or change the admin flag.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use rental_core::{Profile, ProfileUpdate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::rest::{explicit_null, port_error, HandlerError};
use crate::web::state::AppState;

#[derive(Serialize, ToSchema)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    /// The stored flag.
    pub is_admin: bool,
    /// Whether the profile has admin rights, by flag or by configured email.
    pub admin_capable: bool,
    pub created_at: DateTime<Utc>,
}

impl ProfileResponse {
    fn new(state: &AppState, p: Profile) -> Self {
        let admin_capable = state.service.policy().is_admin(&p);
        Self {
            id: p.id,
            email: p.email,
            display_name: p.display_name,
            avatar_url: p.avatar_url,
            is_admin: p.is_admin,
            admin_capable,
            created_at: p.created_at,
        }
    }
}

/// Unknown fields (such as `is_admin`) are rejected.
#[derive(Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub display_name: Option<String>,
    /// `null` removes the avatar.
    #[serde(default, deserialize_with = "explicit_null")]
    #[schema(value_type = Option<String>)]
    pub avatar_url: Option<Option<String>>,
}

#[derive(Deserialize, ToSchema)]
pub struct SetAdminRequest {
    pub is_admin: bool,
}

#[utoipa::path(
    get,
    path = "/profile",
    responses((status = 200, description = "The caller's profile", body = ProfileResponse))
)]
pub async fn get_own_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(requester): Extension<Profile>,
) -> Json<ProfileResponse> {
    Json(ProfileResponse::new(&state, requester))
}

#[utoipa::path(
    patch,
    path = "/profile",
    request_body = UpdateProfileRequest,
    responses((status = 200, description = "Profile updated", body = ProfileResponse))
)]
pub async fn update_own_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(requester): Extension<Profile>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, HandlerError> {
    let profile = state
        .service
        .update_profile(
            &requester,
            ProfileUpdate {
                display_name: req.display_name,
                avatar_url: req.avatar_url,
            },
        )
        .await
        .map_err(port_error)?;
    Ok(Json(ProfileResponse::new(&state, profile)))
}

#[utoipa::path(
    get,
    path = "/profiles/{id}",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "The profile", body = ProfileResponse),
        (status = 403, description = "Not the caller's profile and caller is not an admin")
    )
)]
pub async fn get_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(requester): Extension<Profile>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProfileResponse>, HandlerError> {
    let profile = state
        .service
        .get_profile(&requester, id)
        .await
        .map_err(port_error)?;
    Ok(Json(ProfileResponse::new(&state, profile)))
}

#[utoipa::path(
    put,
    path = "/profiles/{id}/admin",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = SetAdminRequest,
    responses(
        (status = 200, description = "Admin flag changed", body = ProfileResponse),
        (status = 403, description = "Caller is not an admin")
    )
)]
pub async fn set_admin_handler(
    State(state): State<Arc<AppState>>,
    Extension(requester): Extension<Profile>,
    Path(id): Path<Uuid>,
    Json(req): Json<SetAdminRequest>,
) -> Result<Json<ProfileResponse>, HandlerError> {
    let profile = state
        .service
        .set_admin(&requester, id, req.is_admin)
        .await
        .map_err(port_error)?;
    Ok(Json(ProfileResponse::new(&state, profile)))
}
