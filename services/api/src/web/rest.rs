//! services/api/src/web/rest.rs
//!
//! The master definition for the OpenAPI specification and the mapping from
//! ledger errors to HTTP responses shared by every REST handler.

use axum::http::StatusCode;
use rental_core::PortError;
use serde::{Deserialize, Deserializer};
use tracing::{error, warn};
use utoipa::OpenApi;

use crate::web::{admin, auth, bookings, favorites, profiles, reviews, vehicles};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::signup_handler,
        auth::login_handler,
        auth::logout_handler,
        profiles::get_own_profile_handler,
        profiles::update_own_profile_handler,
        profiles::get_profile_handler,
        profiles::set_admin_handler,
        vehicles::list_vehicles_handler,
        vehicles::get_vehicle_handler,
        vehicles::create_vehicle_handler,
        vehicles::update_vehicle_handler,
        vehicles::delete_vehicle_handler,
        vehicles::set_availability_handler,
        vehicles::vehicle_rating_handler,
        bookings::list_bookings_handler,
        bookings::create_booking_handler,
        bookings::update_status_handler,
        bookings::update_payment_handler,
        bookings::record_trip_handler,
        reviews::list_reviews_handler,
        reviews::submit_review_handler,
        reviews::update_review_handler,
        reviews::delete_review_handler,
        favorites::list_favorites_handler,
        favorites::toggle_favorite_handler,
        admin::dashboard_handler,
    ),
    components(
        schemas(
            auth::SignupRequest,
            auth::LoginRequest,
            auth::AuthResponse,
            profiles::ProfileResponse,
            profiles::UpdateProfileRequest,
            profiles::SetAdminRequest,
            vehicles::VehicleResponse,
            vehicles::CreateVehicleRequest,
            vehicles::UpdateVehicleRequest,
            vehicles::AvailabilityRequest,
            vehicles::RatingResponse,
            bookings::BookingResponse,
            bookings::BookingListResponse,
            bookings::CreateBookingRequest,
            bookings::StatusRequest,
            bookings::PaymentRequest,
            bookings::TripDetailsRequest,
            reviews::ReviewResponse,
            reviews::SubmitReviewRequest,
            reviews::UpdateReviewRequest,
            favorites::FavoriteResponse,
            favorites::ToggleFavoriteResponse,
            admin::DashboardResponse,
        )
    ),
    tags(
        (name = "Vehicle Rental API", description = "Vehicles, bookings, reviews, favorites and the admin dashboard.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Error Mapping
//=========================================================================================

/// The error half of every REST handler's return type.
pub type HandlerError = (StatusCode, String);

/// Maps a ledger error onto a status code and a client-facing message.
pub fn port_error(e: PortError) -> HandlerError {
    let status = match &e {
        PortError::InvalidDateRange | PortError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        PortError::Unauthorized => StatusCode::FORBIDDEN,
        PortError::NotFound(_) => StatusCode::NOT_FOUND,
        PortError::VehicleUnavailable | PortError::DuplicateReview | PortError::Conflict(_) => {
            StatusCode::CONFLICT
        }
        PortError::ReviewNotAllowed => StatusCode::UNPROCESSABLE_ENTITY,
        PortError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!("Request failed: {:?}", e);
        return (status, "Internal server error".to_string());
    }
    warn!("Request rejected: {}", e);
    (status, e.to_string())
}

//=========================================================================================
// Payload Helpers
//=========================================================================================

/// For nullable PATCH fields: an absent field stays `None`, an explicit `null`
/// becomes `Some(None)`. Pair with `#[serde(default)]`.
pub fn explicit_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
