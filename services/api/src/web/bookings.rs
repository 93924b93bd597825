//! services/api/src/web/bookings.rs
//!
//! Booking endpoints. Listing returns the caller's bookings (every booking for an
//! admin) split into upcoming and past as of today's date.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use rental_core::rules::classify_booking;
use rental_core::{
    Booking, BookingRequest, BookingStatus, BookingTimeline, PaymentStatus, Profile, TripDetails,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::rest::{port_error, HandlerError};
use crate::web::state::AppState;

//=========================================================================================
// Payloads
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct BookingResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub vehicle_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub pickup_location: String,
    pub dropoff_location: String,
    pub total_price: Decimal,
    /// One of `pending`, `confirmed`, `active`, `completed`, `cancelled`.
    pub status: String,
    /// One of `pending`, `completed`, `failed`, `refunded`.
    pub payment_status: String,
    /// `upcoming` or `past`, derived on every read.
    pub timeline: String,
    pub fuel_level_pickup: Option<i32>,
    pub fuel_level_dropoff: Option<i32>,
    pub mileage_pickup: Option<i32>,
    pub mileage_dropoff: Option<i32>,
    pub actual_pickup_time: Option<DateTime<Utc>>,
    pub actual_dropoff_time: Option<DateTime<Utc>>,
    pub damage_report: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BookingResponse {
    fn new(b: Booking, today: NaiveDate) -> Self {
        let timeline = match classify_booking(&b, today) {
            BookingTimeline::Upcoming => "upcoming",
            BookingTimeline::Past => "past",
        };
        Self {
            id: b.id,
            user_id: b.user_id,
            vehicle_id: b.vehicle_id,
            start_date: b.start_date,
            end_date: b.end_date,
            pickup_location: b.pickup_location,
            dropoff_location: b.dropoff_location,
            total_price: b.total_price,
            status: b.status.to_string(),
            payment_status: b.payment_status.to_string(),
            timeline: timeline.to_string(),
            fuel_level_pickup: b.trip.fuel_level_pickup,
            fuel_level_dropoff: b.trip.fuel_level_dropoff,
            mileage_pickup: b.trip.mileage_pickup,
            mileage_dropoff: b.trip.mileage_dropoff,
            actual_pickup_time: b.trip.actual_pickup_time,
            actual_dropoff_time: b.trip.actual_dropoff_time,
            damage_report: b.trip.damage_report,
            created_at: b.created_at,
            updated_at: b.updated_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct BookingListResponse {
    pub upcoming: Vec<BookingResponse>,
    pub past: Vec<BookingResponse>,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateBookingRequest {
    pub vehicle_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub pickup_location: String,
    pub dropoff_location: Option<String>,
    pub total_price: Decimal,
}

#[derive(Deserialize, ToSchema)]
pub struct StatusRequest {
    pub status: String,
}

#[derive(Deserialize, ToSchema)]
pub struct PaymentRequest {
    pub payment_status: String,
}

#[derive(Deserialize, ToSchema, Default)]
pub struct TripDetailsRequest {
    pub fuel_level_pickup: Option<i32>,
    pub fuel_level_dropoff: Option<i32>,
    pub mileage_pickup: Option<i32>,
    pub mileage_dropoff: Option<i32>,
    pub actual_pickup_time: Option<DateTime<Utc>>,
    pub actual_dropoff_time: Option<DateTime<Utc>>,
    pub damage_report: Option<String>,
}

impl From<TripDetailsRequest> for TripDetails {
    fn from(r: TripDetailsRequest) -> Self {
        TripDetails {
            fuel_level_pickup: r.fuel_level_pickup,
            fuel_level_dropoff: r.fuel_level_dropoff,
            mileage_pickup: r.mileage_pickup,
            mileage_dropoff: r.mileage_dropoff,
            actual_pickup_time: r.actual_pickup_time,
            actual_dropoff_time: r.actual_dropoff_time,
            damage_report: r.damage_report,
        }
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

//=========================================================================================
// Handlers
//=========================================================================================

#[utoipa::path(
    get,
    path = "/bookings",
    responses((status = 200, description = "Bookings split into upcoming and past", body = BookingListResponse))
)]
pub async fn list_bookings_handler(
    State(state): State<Arc<AppState>>,
    Extension(requester): Extension<Profile>,
) -> Result<Json<BookingListResponse>, HandlerError> {
    let bookings = state
        .service
        .list_bookings(&requester)
        .await
        .map_err(port_error)?;

    let today = today();
    let (upcoming, past) = rental_core::rules::partition_bookings(bookings, today);
    Ok(Json(BookingListResponse {
        upcoming: upcoming.into_iter().map(|b| BookingResponse::new(b, today)).collect(),
        past: past.into_iter().map(|b| BookingResponse::new(b, today)).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/bookings",
    request_body = CreateBookingRequest,
    responses(
        (status = 201, description = "Booking created in pending state", body = BookingResponse),
        (status = 400, description = "Invalid date range or price"),
        (status = 404, description = "No such vehicle"),
        (status = 409, description = "Vehicle unavailable")
    )
)]
pub async fn create_booking_handler(
    State(state): State<Arc<AppState>>,
    Extension(requester): Extension<Profile>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let booking = state
        .service
        .create_booking(
            &requester,
            BookingRequest {
                vehicle_id: req.vehicle_id,
                start_date: req.start_date,
                end_date: req.end_date,
                pickup_location: req.pickup_location,
                dropoff_location: req.dropoff_location,
                total_price: req.total_price,
            },
        )
        .await
        .map_err(port_error)?;
    Ok((StatusCode::CREATED, Json(BookingResponse::new(booking, today()))))
}

#[utoipa::path(
    patch,
    path = "/bookings/{id}/status",
    params(("id" = Uuid, Path, description = "Booking id")),
    request_body = StatusRequest,
    responses(
        (status = 200, description = "Status changed", body = BookingResponse),
        (status = 400, description = "Unknown status"),
        (status = 403, description = "Caller neither owns the booking nor is an admin")
    )
)]
pub async fn update_status_handler(
    State(state): State<Arc<AppState>>,
    Extension(requester): Extension<Profile>,
    Path(id): Path<Uuid>,
    Json(req): Json<StatusRequest>,
) -> Result<Json<BookingResponse>, HandlerError> {
    let status = req.status.parse::<BookingStatus>().map_err(port_error)?;
    let booking = state
        .service
        .update_booking_status(&requester, id, status)
        .await
        .map_err(port_error)?;
    Ok(Json(BookingResponse::new(booking, today())))
}

#[utoipa::path(
    patch,
    path = "/bookings/{id}/payment",
    params(("id" = Uuid, Path, description = "Booking id")),
    request_body = PaymentRequest,
    responses(
        (status = 200, description = "Payment status changed", body = BookingResponse),
        (status = 400, description = "Unknown payment status"),
        (status = 403, description = "Caller neither owns the booking nor is an admin")
    )
)]
pub async fn update_payment_handler(
    State(state): State<Arc<AppState>>,
    Extension(requester): Extension<Profile>,
    Path(id): Path<Uuid>,
    Json(req): Json<PaymentRequest>,
) -> Result<Json<BookingResponse>, HandlerError> {
    let payment_status = req
        .payment_status
        .parse::<PaymentStatus>()
        .map_err(port_error)?;
    let booking = state
        .service
        .update_payment_status(&requester, id, payment_status)
        .await
        .map_err(port_error)?;
    Ok(Json(BookingResponse::new(booking, today())))
}

#[utoipa::path(
    patch,
    path = "/bookings/{id}/trip",
    params(("id" = Uuid, Path, description = "Booking id")),
    request_body = TripDetailsRequest,
    responses(
        (status = 200, description = "Trip details recorded", body = BookingResponse),
        (status = 400, description = "Fuel level or mileage out of range")
    )
)]
pub async fn record_trip_handler(
    State(state): State<Arc<AppState>>,
    Extension(requester): Extension<Profile>,
    Path(id): Path<Uuid>,
    Json(req): Json<TripDetailsRequest>,
) -> Result<Json<BookingResponse>, HandlerError> {
    let booking = state
        .service
        .record_trip_details(&requester, id, req.into())
        .await
        .map_err(port_error)?;
    Ok(Json(BookingResponse::new(booking, today())))
}
