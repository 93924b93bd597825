//! services/api/src/web/reviews.rs
//!
//! Review endpoints. Every write recomputes the vehicle's rating in the same unit
//! of work; see `DatabaseService::create_review`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use rental_core::{Profile, Review};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::rest::{port_error, HandlerError};
use crate::web::state::AppState;

#[derive(Serialize, ToSchema)]
pub struct ReviewResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub vehicle_id: Uuid,
    pub booking_id: Uuid,
    pub rating: i16,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Review> for ReviewResponse {
    fn from(r: Review) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            vehicle_id: r.vehicle_id,
            booking_id: r.booking_id,
            rating: r.rating,
            comment: r.comment,
            created_at: r.created_at,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct SubmitReviewRequest {
    pub vehicle_id: Uuid,
    pub booking_id: Uuid,
    pub rating: i16,
    pub comment: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateReviewRequest {
    pub rating: i16,
    pub comment: Option<String>,
}

#[utoipa::path(
    get,
    path = "/vehicles/{id}/reviews",
    params(("id" = Uuid, Path, description = "Vehicle id")),
    responses((status = 200, description = "Reviews, newest first", body = [ReviewResponse]))
)]
pub async fn list_reviews_handler(
    State(state): State<Arc<AppState>>,
    Path(vehicle_id): Path<Uuid>,
) -> Result<Json<Vec<ReviewResponse>>, HandlerError> {
    let reviews = state
        .service
        .list_reviews(vehicle_id)
        .await
        .map_err(port_error)?;
    Ok(Json(reviews.into_iter().map(ReviewResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/reviews",
    request_body = SubmitReviewRequest,
    responses(
        (status = 201, description = "Review stored and rating recomputed", body = ReviewResponse),
        (status = 400, description = "Rating out of range"),
        (status = 409, description = "Booking already reviewed"),
        (status = 422, description = "Booking is not a completed booking of the caller")
    )
)]
pub async fn submit_review_handler(
    State(state): State<Arc<AppState>>,
    Extension(requester): Extension<Profile>,
    Json(req): Json<SubmitReviewRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let review = state
        .service
        .submit_review(&requester, req.vehicle_id, req.booking_id, req.rating, req.comment)
        .await
        .map_err(port_error)?;
    Ok((StatusCode::CREATED, Json(ReviewResponse::from(review))))
}

#[utoipa::path(
    patch,
    path = "/reviews/{id}",
    params(("id" = Uuid, Path, description = "Review id")),
    request_body = UpdateReviewRequest,
    responses(
        (status = 200, description = "Review updated", body = ReviewResponse),
        (status = 403, description = "Caller did not write the review")
    )
)]
pub async fn update_review_handler(
    State(state): State<Arc<AppState>>,
    Extension(requester): Extension<Profile>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateReviewRequest>,
) -> Result<Json<ReviewResponse>, HandlerError> {
    let review = state
        .service
        .update_review(&requester, id, req.rating, req.comment)
        .await
        .map_err(port_error)?;
    Ok(Json(review.into()))
}

#[utoipa::path(
    delete,
    path = "/reviews/{id}",
    params(("id" = Uuid, Path, description = "Review id")),
    responses(
        (status = 204, description = "Review deleted"),
        (status = 403, description = "Caller is neither the author nor an admin")
    )
)]
pub async fn delete_review_handler(
    State(state): State<Arc<AppState>>,
    Extension(requester): Extension<Profile>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, HandlerError> {
    state
        .service
        .delete_review(&requester, id)
        .await
        .map_err(port_error)?;
    Ok(StatusCode::NO_CONTENT)
}
