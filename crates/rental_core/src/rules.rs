//! crates/rental_core/src/rules.rs
//!
//! Pure ledger rules: booking admission, review eligibility, rating aggregation
//! and the upcoming/past classification. Store adapters call into these inside
//! their atomic sections so every adapter enforces the same rules.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::BTreeSet;

use crate::domain::{
    Booking, BookingStatus, BookingTimeline, NewBooking, NewReview, NewVehicle, TripDetails,
    Vehicle, VehicleRating, VehicleUpdate,
};
use crate::ports::{PortError, PortResult};

pub const MIN_RATING: i16 = 1;
pub const MAX_RATING: i16 = 5;
const MAX_FUEL_LEVEL: i32 = 100;
const FIRST_CAR_YEAR: i32 = 1886;
/// Money columns are `NUMERIC(10,2)`: two decimal places, eight integer digits.
const MONEY_SCALE: u32 = 2;
const MONEY_INTEGER_DIGITS: u32 = 8;

/// Rejects amounts the money columns cannot hold exactly.
pub fn validate_money(field: &str, amount: Decimal) -> PortResult<()> {
    if amount < Decimal::ZERO {
        return Err(PortError::InvalidInput(format!("{} must not be negative", field)));
    }
    if amount.normalize().scale() > MONEY_SCALE {
        return Err(PortError::InvalidInput(format!(
            "{} must have at most {} decimal places",
            field, MONEY_SCALE
        )));
    }
    if amount >= Decimal::from(10u64.pow(MONEY_INTEGER_DIGITS)) {
        return Err(PortError::InvalidInput(format!("{} is too large", field)));
    }
    Ok(())
}

//=========================================================================================
// Bookings
//=========================================================================================

/// Validates the parts of a booking request that do not depend on stored state.
pub fn validate_booking_request(booking: &NewBooking) -> PortResult<()> {
    if booking.end_date <= booking.start_date {
        return Err(PortError::InvalidDateRange);
    }
    validate_money("total price", booking.total_price)?;
    if booking.pickup_location.trim().is_empty() {
        return Err(PortError::InvalidInput(
            "pickup location is required".to_string(),
        ));
    }
    Ok(())
}

/// A vehicle can be booked only while it is marked available.
pub fn check_vehicle_bookable(vehicle: &Vehicle) -> PortResult<()> {
    if vehicle.available {
        Ok(())
    } else {
        Err(PortError::VehicleUnavailable)
    }
}

pub fn validate_trip_details(details: &TripDetails) -> PortResult<()> {
    for (name, level) in [
        ("fuel_level_pickup", details.fuel_level_pickup),
        ("fuel_level_dropoff", details.fuel_level_dropoff),
    ] {
        if let Some(level) = level {
            if !(0..=MAX_FUEL_LEVEL).contains(&level) {
                return Err(PortError::InvalidInput(format!(
                    "{} must be between 0 and {}",
                    name, MAX_FUEL_LEVEL
                )));
            }
        }
    }
    for (name, mileage) in [
        ("mileage_pickup", details.mileage_pickup),
        ("mileage_dropoff", details.mileage_dropoff),
    ] {
        if matches!(mileage, Some(m) if m < 0) {
            return Err(PortError::InvalidInput(format!("{} must not be negative", name)));
        }
    }
    Ok(())
}

/// Upcoming iff the booking starts strictly after `today` or is currently active.
pub fn classify_booking(booking: &Booking, today: NaiveDate) -> BookingTimeline {
    if booking.start_date > today || booking.status == BookingStatus::Active {
        BookingTimeline::Upcoming
    } else {
        BookingTimeline::Past
    }
}

/// Splits bookings into (upcoming, past), keeping their relative order.
pub fn partition_bookings(bookings: Vec<Booking>, today: NaiveDate) -> (Vec<Booking>, Vec<Booking>) {
    bookings
        .into_iter()
        .partition(|b| classify_booking(b, today) == BookingTimeline::Upcoming)
}

/// Sums per-status counts into one entry per status, in `BookingStatus::ALL` order.
pub fn status_breakdown<I>(counts: I) -> Vec<(BookingStatus, usize)>
where
    I: IntoIterator<Item = (BookingStatus, usize)>,
{
    let mut totals: Vec<(BookingStatus, usize)> =
        BookingStatus::ALL.into_iter().map(|s| (s, 0)).collect();
    for (status, n) in counts {
        if let Some(entry) = totals.iter_mut().find(|(s, _)| *s == status) {
            entry.1 += n;
        }
    }
    totals
}

//=========================================================================================
// Reviews
//=========================================================================================

pub fn validate_rating(rating: i16) -> PortResult<()> {
    if (MIN_RATING..=MAX_RATING).contains(&rating) {
        Ok(())
    } else {
        Err(PortError::InvalidInput(format!(
            "rating must be between {} and {}",
            MIN_RATING, MAX_RATING
        )))
    }
}

/// Decides whether `review` may be written against `booking`.
///
/// Must be evaluated in the same atomic unit as the insert.
pub fn check_review_eligibility(
    review: &NewReview,
    booking: &Booking,
    already_reviewed: bool,
) -> PortResult<()> {
    if booking.user_id != review.user_id
        || booking.vehicle_id != review.vehicle_id
        || booking.status != BookingStatus::Completed
    {
        return Err(PortError::ReviewNotAllowed);
    }
    if already_reviewed {
        return Err(PortError::DuplicateReview);
    }
    Ok(())
}

/// Mean and count of the given ratings; 0 when there are none.
pub fn aggregate_rating<I>(ratings: I) -> VehicleRating
where
    I: IntoIterator<Item = i16>,
{
    let (sum, count) = ratings
        .into_iter()
        .fold((0i64, 0i32), |(sum, count), r| (sum + i64::from(r), count + 1));
    if count == 0 {
        return VehicleRating::default();
    }
    VehicleRating {
        rating: sum as f64 / f64::from(count),
        total_reviews: count,
    }
}

//=========================================================================================
// Vehicles
//=========================================================================================

/// Trims, deduplicates and sorts a feature list; order carries no meaning.
pub fn normalize_features(features: Vec<String>) -> Vec<String> {
    features
        .into_iter()
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn validate_new_vehicle(vehicle: &NewVehicle) -> PortResult<()> {
    check_vehicle_fields(
        Some(&vehicle.name),
        Some(vehicle.year),
        Some(vehicle.price_per_day),
        Some(vehicle.seats),
    )
}

pub fn validate_vehicle_update(update: &VehicleUpdate) -> PortResult<()> {
    check_vehicle_fields(
        update.name.as_ref(),
        update.year,
        update.price_per_day,
        update.seats,
    )
}

fn check_vehicle_fields(
    name: Option<&String>,
    year: Option<i32>,
    price_per_day: Option<Decimal>,
    seats: Option<i32>,
) -> PortResult<()> {
    if matches!(name, Some(n) if n.trim().is_empty()) {
        return Err(PortError::InvalidInput("vehicle name is required".to_string()));
    }
    if matches!(year, Some(y) if y < FIRST_CAR_YEAR) {
        return Err(PortError::InvalidInput(format!(
            "year must be {} or later",
            FIRST_CAR_YEAR
        )));
    }
    if let Some(price) = price_per_day {
        validate_money("price per day", price)?;
    }
    if matches!(seats, Some(s) if s < 1) {
        return Err(PortError::InvalidInput("seats must be at least 1".to_string()));
    }
    Ok(())
}
