//! services/api/src/web/vehicles.rs
//!
//! Vehicle catalogue endpoints. Reads are open to any signed-in user; writes are
//! admin-only.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use rental_core::{NewVehicle, Profile, Vehicle, VehicleFilter, VehicleRating, VehicleUpdate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::web::rest::{explicit_null, port_error, HandlerError};
use crate::web::state::AppState;

//=========================================================================================
// Payloads
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct VehicleResponse {
    pub id: Uuid,
    pub name: String,
    pub vehicle_type: String,
    pub brand: String,
    pub model: String,
    pub year: i32,
    pub price_per_day: Decimal,
    pub seats: i32,
    pub fuel_type: String,
    pub transmission: String,
    pub image_url: Option<String>,
    pub features: Vec<String>,
    pub location: String,
    pub available: bool,
    pub rating: f64,
    pub total_reviews: i32,
    pub created_at: DateTime<Utc>,
}

impl From<Vehicle> for VehicleResponse {
    fn from(v: Vehicle) -> Self {
        Self {
            id: v.id,
            name: v.name,
            vehicle_type: v.vehicle_type,
            brand: v.brand,
            model: v.model,
            year: v.year,
            price_per_day: v.price_per_day,
            seats: v.seats,
            fuel_type: v.fuel_type,
            transmission: v.transmission,
            image_url: v.image_url,
            features: v.features,
            location: v.location,
            available: v.available,
            rating: v.rating,
            total_reviews: v.total_reviews,
            created_at: v.created_at,
        }
    }
}

/// Query parameters accepted by `GET /vehicles`.
#[derive(Deserialize, IntoParams, Default)]
pub struct VehicleQuery {
    pub search: Option<String>,
    pub vehicle_type: Option<String>,
    pub max_price: Option<Decimal>,
    pub min_seats: Option<i32>,
}

impl From<VehicleQuery> for VehicleFilter {
    fn from(q: VehicleQuery) -> Self {
        VehicleFilter {
            search: q.search,
            vehicle_type: q.vehicle_type,
            max_price_per_day: q.max_price,
            min_seats: q.min_seats,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct CreateVehicleRequest {
    pub name: String,
    pub vehicle_type: String,
    pub brand: String,
    pub model: String,
    pub year: i32,
    pub price_per_day: Decimal,
    pub seats: i32,
    pub fuel_type: String,
    pub transmission: String,
    pub image_url: Option<String>,
    #[serde(default)]
    pub features: Vec<String>,
    pub location: String,
    #[serde(default = "default_available")]
    pub available: bool,
}

fn default_available() -> bool {
    true
}

impl From<CreateVehicleRequest> for NewVehicle {
    fn from(r: CreateVehicleRequest) -> Self {
        NewVehicle {
            name: r.name,
            vehicle_type: r.vehicle_type,
            brand: r.brand,
            model: r.model,
            year: r.year,
            price_per_day: r.price_per_day,
            seats: r.seats,
            fuel_type: r.fuel_type,
            transmission: r.transmission,
            image_url: r.image_url,
            features: r.features,
            location: r.location,
            available: r.available,
        }
    }
}

/// A partial edit. Rating fields are derived and cannot be sent.
#[derive(Deserialize, ToSchema, Default)]
#[serde(deny_unknown_fields)]
pub struct UpdateVehicleRequest {
    pub name: Option<String>,
    pub vehicle_type: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub price_per_day: Option<Decimal>,
    pub seats: Option<i32>,
    pub fuel_type: Option<String>,
    pub transmission: Option<String>,
    /// `null` removes the image.
    #[serde(default, deserialize_with = "explicit_null")]
    #[schema(value_type = Option<String>)]
    pub image_url: Option<Option<String>>,
    pub features: Option<Vec<String>>,
    pub location: Option<String>,
    pub available: Option<bool>,
}

impl From<UpdateVehicleRequest> for VehicleUpdate {
    fn from(r: UpdateVehicleRequest) -> Self {
        VehicleUpdate {
            name: r.name,
            vehicle_type: r.vehicle_type,
            brand: r.brand,
            model: r.model,
            year: r.year,
            price_per_day: r.price_per_day,
            seats: r.seats,
            fuel_type: r.fuel_type,
            transmission: r.transmission,
            image_url: r.image_url,
            features: r.features,
            location: r.location,
            available: r.available,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct AvailabilityRequest {
    pub available: bool,
}

#[derive(Serialize, ToSchema)]
pub struct RatingResponse {
    pub vehicle_id: Uuid,
    pub rating: f64,
    pub total_reviews: i32,
}

impl RatingResponse {
    fn new(vehicle_id: Uuid, rating: VehicleRating) -> Self {
        Self {
            vehicle_id,
            rating: rating.rating,
            total_reviews: rating.total_reviews,
        }
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// List the vehicles visible to the caller, optionally filtered.
#[utoipa::path(
    get,
    path = "/vehicles",
    params(VehicleQuery),
    responses((status = 200, description = "Matching vehicles", body = [VehicleResponse]))
)]
pub async fn list_vehicles_handler(
    State(state): State<Arc<AppState>>,
    Extension(requester): Extension<Profile>,
    Query(query): Query<VehicleQuery>,
) -> Result<Json<Vec<VehicleResponse>>, HandlerError> {
    let filter = VehicleFilter::from(query);
    let vehicles = state
        .service
        .list_vehicles(&requester, &filter)
        .await
        .map_err(port_error)?;
    Ok(Json(vehicles.into_iter().map(VehicleResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/vehicles/{id}",
    params(("id" = Uuid, Path, description = "Vehicle id")),
    responses(
        (status = 200, description = "The vehicle", body = VehicleResponse),
        (status = 404, description = "No such vehicle visible to the caller")
    )
)]
pub async fn get_vehicle_handler(
    State(state): State<Arc<AppState>>,
    Extension(requester): Extension<Profile>,
    Path(id): Path<Uuid>,
) -> Result<Json<VehicleResponse>, HandlerError> {
    let vehicle = state
        .service
        .get_vehicle(&requester, id)
        .await
        .map_err(port_error)?;
    Ok(Json(vehicle.into()))
}

#[utoipa::path(
    post,
    path = "/vehicles",
    request_body = CreateVehicleRequest,
    responses(
        (status = 201, description = "Vehicle created", body = VehicleResponse),
        (status = 400, description = "Invalid vehicle"),
        (status = 403, description = "Caller is not an admin")
    )
)]
pub async fn create_vehicle_handler(
    State(state): State<Arc<AppState>>,
    Extension(requester): Extension<Profile>,
    Json(req): Json<CreateVehicleRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let vehicle = state
        .service
        .create_vehicle(&requester, req.into())
        .await
        .map_err(port_error)?;
    Ok((StatusCode::CREATED, Json(VehicleResponse::from(vehicle))))
}

#[utoipa::path(
    patch,
    path = "/vehicles/{id}",
    params(("id" = Uuid, Path, description = "Vehicle id")),
    request_body = UpdateVehicleRequest,
    responses(
        (status = 200, description = "Vehicle updated", body = VehicleResponse),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "No such vehicle")
    )
)]
pub async fn update_vehicle_handler(
    State(state): State<Arc<AppState>>,
    Extension(requester): Extension<Profile>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateVehicleRequest>,
) -> Result<Json<VehicleResponse>, HandlerError> {
    let vehicle = state
        .service
        .update_vehicle(&requester, id, req.into())
        .await
        .map_err(port_error)?;
    Ok(Json(vehicle.into()))
}

#[utoipa::path(
    put,
    path = "/vehicles/{id}/availability",
    params(("id" = Uuid, Path, description = "Vehicle id")),
    request_body = AvailabilityRequest,
    responses(
        (status = 200, description = "Availability changed", body = VehicleResponse),
        (status = 403, description = "Caller is not an admin")
    )
)]
pub async fn set_availability_handler(
    State(state): State<Arc<AppState>>,
    Extension(requester): Extension<Profile>,
    Path(id): Path<Uuid>,
    Json(req): Json<AvailabilityRequest>,
) -> Result<Json<VehicleResponse>, HandlerError> {
    let vehicle = state
        .service
        .set_availability(&requester, id, req.available)
        .await
        .map_err(port_error)?;
    Ok(Json(vehicle.into()))
}

/// Delete a vehicle along with its bookings, favorites and reviews.
#[utoipa::path(
    delete,
    path = "/vehicles/{id}",
    params(("id" = Uuid, Path, description = "Vehicle id")),
    responses(
        (status = 204, description = "Vehicle deleted"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "No such vehicle")
    )
)]
pub async fn delete_vehicle_handler(
    State(state): State<Arc<AppState>>,
    Extension(requester): Extension<Profile>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, HandlerError> {
    state
        .service
        .delete_vehicle(&requester, id)
        .await
        .map_err(port_error)?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/vehicles/{id}/rating",
    params(("id" = Uuid, Path, description = "Vehicle id")),
    responses(
        (status = 200, description = "Derived rating", body = RatingResponse),
        (status = 404, description = "No such vehicle")
    )
)]
pub async fn vehicle_rating_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<RatingResponse>, HandlerError> {
    let rating = state
        .service
        .get_vehicle_rating(id)
        .await
        .map_err(port_error)?;
    Ok(Json(RatingResponse::new(id, rating)))
}
