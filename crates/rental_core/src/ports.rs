//! crates/rental_core/src/ports.rs
//!
//! Defines the storage contract (trait) for the rental ledger.
//! The trait forms the boundary of the hexagonal architecture, allowing the core
//! to be independent of the concrete store (Postgres, in-memory, ...).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    Booking, BookingStatus, DashboardStats, Favorite, NewBooking, NewReview, NewVehicle, PaymentStatus, Profile,
    ProfileUpdate, Review, TripDetails, UserCredentials, Vehicle, VehicleUpdate,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// The error type shared by the ledger rules and every port operation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PortError {
    #[error("End date must be after start date")]
    InvalidDateRange,
    #[error("Vehicle is not available for booking")]
    VehicleUnavailable,
    #[error("Unauthorized")]
    Unauthorized,
    #[error("A review requires a completed booking owned by the reviewer")]
    ReviewNotAllowed,
    #[error("This booking has already been reviewed")]
    DuplicateReview,
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Persistence for profiles, vehicles, bookings, favorites and reviews.
///
/// Methods that combine a check with a write (`insert_booking`, the review
/// methods) must run as one atomic unit in the implementation: no reader may
/// observe a review change without the matching change to the vehicle's
/// `rating`/`total_reviews`.
#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Profiles & Auth ---
    async fn create_profile_with_email(
        &self,
        email: &str,
        display_name: Option<&str>,
        hashed_password: &str,
    ) -> PortResult<Profile>;

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn get_profile(&self, user_id: Uuid) -> PortResult<Profile>;

    async fn update_profile(&self, user_id: Uuid, update: ProfileUpdate) -> PortResult<Profile>;

    async fn set_admin_flag(&self, user_id: Uuid, is_admin: bool) -> PortResult<Profile>;

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    // --- Vehicles ---
    async fn insert_vehicle(&self, vehicle: NewVehicle) -> PortResult<Vehicle>;

    async fn update_vehicle(&self, vehicle_id: Uuid, update: VehicleUpdate) -> PortResult<Vehicle>;

    /// Deletes the vehicle together with its bookings, favorites and reviews.
    async fn delete_vehicle(&self, vehicle_id: Uuid) -> PortResult<()>;

    async fn get_vehicle(&self, vehicle_id: Uuid) -> PortResult<Vehicle>;

    async fn list_vehicles(&self, only_available: bool) -> PortResult<Vec<Vehicle>>;

    // --- Bookings ---
    /// Inserts a booking after checking, in the same atomic unit, that the
    /// vehicle exists (`NotFound`) and is available (`VehicleUnavailable`).
    async fn insert_booking(&self, booking: NewBooking) -> PortResult<Booking>;

    async fn get_booking(&self, booking_id: Uuid) -> PortResult<Booking>;

    async fn update_booking_status(
        &self,
        booking_id: Uuid,
        status: BookingStatus,
    ) -> PortResult<Booking>;

    async fn update_payment_status(
        &self,
        booking_id: Uuid,
        payment_status: PaymentStatus,
    ) -> PortResult<Booking>;

    async fn update_trip_details(&self, booking_id: Uuid, details: TripDetails)
        -> PortResult<Booking>;

    /// Lists bookings newest first; `None` lists every owner's bookings.
    async fn list_bookings(&self, owner: Option<Uuid>) -> PortResult<Vec<Booking>>;

    // --- Favorites ---
    /// Returns `false` when the pair already existed.
    async fn add_favorite(&self, user_id: Uuid, vehicle_id: Uuid) -> PortResult<bool>;

    /// Returns `false` when there was nothing to remove.
    async fn remove_favorite(&self, user_id: Uuid, vehicle_id: Uuid) -> PortResult<bool>;

    async fn list_favorites(&self, user_id: Uuid) -> PortResult<Vec<Favorite>>;

    // --- Admin ---
    /// Fleet and booking totals, aggregated by the store.
    async fn dashboard_stats(&self) -> PortResult<DashboardStats>;

    // --- Reviews ---
    /// Checks eligibility with `rules::check_review_eligibility`, inserts the
    /// review and recomputes the vehicle aggregate, all atomically.
    async fn create_review(&self, review: NewReview) -> PortResult<Review>;

    /// Rewrites rating/comment and recomputes the vehicle aggregate atomically.
    async fn update_review(
        &self,
        review_id: Uuid,
        rating: i16,
        comment: Option<String>,
    ) -> PortResult<Review>;

    /// Removes the review and recomputes the vehicle aggregate atomically.
    async fn delete_review(&self, review_id: Uuid) -> PortResult<()>;

    async fn get_review(&self, review_id: Uuid) -> PortResult<Review>;

    async fn list_reviews_for_vehicle(&self, vehicle_id: Uuid) -> PortResult<Vec<Review>>;
}
