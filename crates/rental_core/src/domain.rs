//! crates/rental_core/src/domain.rs
//!
//! Defines the pure, core data structures for the rental ledger.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::ports::PortError;

//=========================================================================================
// Profiles and Auth
//=========================================================================================

/// The identity record for an authenticated user.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

/// The fields a user may change on their own profile. The admin flag is not one of them.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    /// `Some(None)` clears the avatar.
    pub avatar_url: Option<Option<String>>,
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
}

// Represents a browser login session (auth cookie)
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

//=========================================================================================
// Vehicles
//=========================================================================================

/// A rentable vehicle. `rating` and `total_reviews` are derived from reviews.
#[derive(Debug, Clone, PartialEq)]
pub struct Vehicle {
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

impl Vehicle {
    pub fn rating(&self) -> VehicleRating {
        VehicleRating {
            rating: self.rating,
            total_reviews: self.total_reviews,
        }
    }
}

/// Input for a new vehicle. Carries no rating fields.
#[derive(Debug, Clone)]
pub struct NewVehicle {
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
}

/// A partial vehicle edit; `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct VehicleUpdate {
    pub name: Option<String>,
    pub vehicle_type: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub price_per_day: Option<Decimal>,
    pub seats: Option<i32>,
    pub fuel_type: Option<String>,
    pub transmission: Option<String>,
    /// `Some(None)` clears the image.
    pub image_url: Option<Option<String>>,
    pub features: Option<Vec<String>>,
    pub location: Option<String>,
    pub available: Option<bool>,
}

/// The aggregate rating of a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VehicleRating {
    pub rating: f64,
    pub total_reviews: i32,
}

//=========================================================================================
// Bookings
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Active,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 5] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::Active,
        BookingStatus::Completed,
        BookingStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Active => "active",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BookingStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| PortError::InvalidInput(format!("unknown booking status '{}'", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub const ALL: [PaymentStatus; 4] = [
        PaymentStatus::Pending,
        PaymentStatus::Completed,
        PaymentStatus::Failed,
        PaymentStatus::Refunded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PaymentStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| PortError::InvalidInput(format!("unknown payment status '{}'", s)))
    }
}

/// Operational fields recorded around pickup and dropoff.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TripDetails {
    pub fuel_level_pickup: Option<i32>,
    pub fuel_level_dropoff: Option<i32>,
    pub mileage_pickup: Option<i32>,
    pub mileage_dropoff: Option<i32>,
    pub actual_pickup_time: Option<DateTime<Utc>>,
    pub actual_dropoff_time: Option<DateTime<Utc>>,
    pub damage_report: Option<String>,
}

impl TripDetails {
    /// Overlays the fields set in `other` onto `self`.
    pub fn merge(&mut self, other: TripDetails) {
        if other.fuel_level_pickup.is_some() {
            self.fuel_level_pickup = other.fuel_level_pickup;
        }
        if other.fuel_level_dropoff.is_some() {
            self.fuel_level_dropoff = other.fuel_level_dropoff;
        }
        if other.mileage_pickup.is_some() {
            self.mileage_pickup = other.mileage_pickup;
        }
        if other.mileage_dropoff.is_some() {
            self.mileage_dropoff = other.mileage_dropoff;
        }
        if other.actual_pickup_time.is_some() {
            self.actual_pickup_time = other.actual_pickup_time;
        }
        if other.actual_dropoff_time.is_some() {
            self.actual_dropoff_time = other.actual_dropoff_time;
        }
        if other.damage_report.is_some() {
            self.damage_report = other.damage_report;
        }
    }
}

/// A reservation of one vehicle by one user over `[start_date, end_date)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Booking {
    pub id: Uuid,
    pub user_id: Uuid,
    pub vehicle_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub pickup_location: String,
    pub dropoff_location: String,
    pub total_price: Decimal,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub trip: TripDetails,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A booking request as accepted by the ledger, before the store assigns an id.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub user_id: Uuid,
    pub vehicle_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub pickup_location: String,
    pub dropoff_location: String,
    pub total_price: Decimal,
}

/// Derived classification of a booking, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingTimeline {
    Upcoming,
    Past,
}

//=========================================================================================
// Favorites and Reviews
//=========================================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Favorite {
    pub user_id: Uuid,
    pub vehicle_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Review {
    pub id: Uuid,
    pub user_id: Uuid,
    pub vehicle_id: Uuid,
    pub booking_id: Uuid,
    pub rating: i16,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewReview {
    pub user_id: Uuid,
    pub vehicle_id: Uuid,
    pub booking_id: Uuid,
    pub rating: i16,
    pub comment: Option<String>,
}

//=========================================================================================
// Admin Dashboard
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DashboardStats {
    pub total_vehicles: usize,
    pub available_vehicles: usize,
    pub total_bookings: usize,
    /// Booking counts in `BookingStatus::ALL` order.
    pub bookings_by_status: Vec<(BookingStatus, usize)>,
    pub revenue: Decimal,
}
