//! crates/rental_core/src/service.rs
//!
//! The rental ledger: the operations consumed by the UI, with authorization and
//! ledger rules applied in front of the storage port.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::access::AdminPolicy;
use crate::domain::{
    Booking, BookingStatus, DashboardStats, Favorite, NewBooking, NewReview, NewVehicle,
    PaymentStatus, Profile, ProfileUpdate, Review, TripDetails, Vehicle, VehicleRating,
    VehicleUpdate,
};
use crate::filter::VehicleFilter;
use crate::ports::{DatabaseService, PortError, PortResult};
use crate::rules;

/// A booking request as issued by a client.
#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub vehicle_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub pickup_location: String,
    /// Defaults to the pickup location.
    pub dropoff_location: Option<String>,
    pub total_price: Decimal,
}

#[derive(Clone)]
pub struct RentalService {
    db: Arc<dyn DatabaseService>,
    policy: AdminPolicy,
}

impl RentalService {
    pub fn new(db: Arc<dyn DatabaseService>, policy: AdminPolicy) -> Self {
        Self { db, policy }
    }

    pub fn policy(&self) -> &AdminPolicy {
        &self.policy
    }

    /// Loads the profile behind an authenticated user id.
    pub async fn identity(&self, user_id: Uuid) -> PortResult<Profile> {
        self.db.get_profile(user_id).await
    }

    //=====================================================================================
    // Bookings
    //=====================================================================================

    pub async fn create_booking(
        &self,
        requester: &Profile,
        request: BookingRequest,
    ) -> PortResult<Booking> {
        let dropoff_location = request
            .dropoff_location
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| request.pickup_location.clone());
        let new_booking = NewBooking {
            user_id: requester.id,
            vehicle_id: request.vehicle_id,
            start_date: request.start_date,
            end_date: request.end_date,
            pickup_location: request.pickup_location,
            dropoff_location,
            total_price: request.total_price,
        };
        rules::validate_booking_request(&new_booking)?;

        let booking = self.db.insert_booking(new_booking).await?;
        info!(
            booking_id = %booking.id,
            vehicle_id = %booking.vehicle_id,
            user_id = %booking.user_id,
            "Booking created"
        );
        Ok(booking)
    }

    /// Any status may follow any other; only ownership is checked.
    pub async fn update_booking_status(
        &self,
        requester: &Profile,
        booking_id: Uuid,
        status: BookingStatus,
    ) -> PortResult<Booking> {
        self.authorize_booking_update(requester, booking_id).await?;
        let booking = self.db.update_booking_status(booking_id, status).await?;
        info!(booking_id = %booking_id, status = %status, "Booking status updated");
        Ok(booking)
    }

    pub async fn update_payment_status(
        &self,
        requester: &Profile,
        booking_id: Uuid,
        payment_status: PaymentStatus,
    ) -> PortResult<Booking> {
        self.authorize_booking_update(requester, booking_id).await?;
        let booking = self
            .db
            .update_payment_status(booking_id, payment_status)
            .await?;
        info!(booking_id = %booking_id, payment_status = %payment_status, "Payment status updated");
        Ok(booking)
    }

    pub async fn record_trip_details(
        &self,
        requester: &Profile,
        booking_id: Uuid,
        details: TripDetails,
    ) -> PortResult<Booking> {
        rules::validate_trip_details(&details)?;
        self.authorize_booking_update(requester, booking_id).await?;
        self.db.update_trip_details(booking_id, details).await
    }

    pub async fn get_booking(&self, requester: &Profile, booking_id: Uuid) -> PortResult<Booking> {
        let booking = self.db.get_booking(booking_id).await?;
        if !self.policy.can_read_booking(requester, &booking) {
            // Hidden rows look the same as missing ones.
            return Err(PortError::NotFound(format!("Booking {} not found", booking_id)));
        }
        Ok(booking)
    }

    /// Admins see every booking; everyone else only their own.
    pub async fn list_bookings(&self, requester: &Profile) -> PortResult<Vec<Booking>> {
        let owner = if self.policy.is_admin(requester) {
            None
        } else {
            Some(requester.id)
        };
        self.db.list_bookings(owner).await
    }

    async fn authorize_booking_update(
        &self,
        requester: &Profile,
        booking_id: Uuid,
    ) -> PortResult<Booking> {
        let booking = self.db.get_booking(booking_id).await?;
        if !self.policy.can_update_booking(requester, &booking) {
            warn!(booking_id = %booking_id, user_id = %requester.id, "Booking update refused");
            return Err(PortError::Unauthorized);
        }
        Ok(booking)
    }

    //=====================================================================================
    // Reviews & Ratings
    //=====================================================================================

    pub async fn submit_review(
        &self,
        requester: &Profile,
        vehicle_id: Uuid,
        booking_id: Uuid,
        rating: i16,
        comment: Option<String>,
    ) -> PortResult<Review> {
        rules::validate_rating(rating)?;
        let review = self
            .db
            .create_review(NewReview {
                user_id: requester.id,
                vehicle_id,
                booking_id,
                rating,
                comment: normalize_comment(comment),
            })
            .await?;
        info!(review_id = %review.id, vehicle_id = %vehicle_id, rating, "Review submitted");
        Ok(review)
    }

    pub async fn update_review(
        &self,
        requester: &Profile,
        review_id: Uuid,
        rating: i16,
        comment: Option<String>,
    ) -> PortResult<Review> {
        rules::validate_rating(rating)?;
        let review = self.db.get_review(review_id).await?;
        if !self.policy.can_edit_review(requester, &review) {
            return Err(PortError::Unauthorized);
        }
        self.db
            .update_review(review_id, rating, normalize_comment(comment))
            .await
    }

    pub async fn delete_review(&self, requester: &Profile, review_id: Uuid) -> PortResult<()> {
        let review = self.db.get_review(review_id).await?;
        if !self.policy.can_delete_review(requester, &review) {
            return Err(PortError::Unauthorized);
        }
        self.db.delete_review(review_id).await?;
        info!(review_id = %review_id, vehicle_id = %review.vehicle_id, "Review deleted");
        Ok(())
    }

    pub async fn list_reviews(&self, vehicle_id: Uuid) -> PortResult<Vec<Review>> {
        self.db.list_reviews_for_vehicle(vehicle_id).await
    }

    pub async fn get_vehicle_rating(&self, vehicle_id: Uuid) -> PortResult<VehicleRating> {
        Ok(self.db.get_vehicle(vehicle_id).await?.rating())
    }

    //=====================================================================================
    // Favorites
    //=====================================================================================

    /// Returns whether the vehicle is a favorite after the toggle.
    pub async fn toggle_favorite(&self, requester: &Profile, vehicle_id: Uuid) -> PortResult<bool> {
        if self.db.remove_favorite(requester.id, vehicle_id).await? {
            return Ok(false);
        }
        self.get_vehicle(requester, vehicle_id).await?;
        self.db.add_favorite(requester.id, vehicle_id).await?;
        Ok(true)
    }

    /// Idempotent: adding an existing favorite changes nothing.
    pub async fn add_favorite(&self, requester: &Profile, vehicle_id: Uuid) -> PortResult<()> {
        self.get_vehicle(requester, vehicle_id).await?;
        self.db.add_favorite(requester.id, vehicle_id).await?;
        Ok(())
    }

    pub async fn list_favorites(&self, requester: &Profile) -> PortResult<Vec<Favorite>> {
        self.db.list_favorites(requester.id).await
    }

    //=====================================================================================
    // Vehicle Catalogue
    //=====================================================================================

    pub async fn list_vehicles(
        &self,
        requester: &Profile,
        filter: &VehicleFilter,
    ) -> PortResult<Vec<Vehicle>> {
        let only_available = !self.policy.is_admin(requester);
        let vehicles = self.db.list_vehicles(only_available).await?;
        Ok(filter.apply(vehicles))
    }

    pub async fn get_vehicle(&self, requester: &Profile, vehicle_id: Uuid) -> PortResult<Vehicle> {
        let vehicle = self.db.get_vehicle(vehicle_id).await?;
        if !self.policy.can_read_vehicle(requester, &vehicle) {
            return Err(PortError::NotFound(format!("Vehicle {} not found", vehicle_id)));
        }
        Ok(vehicle)
    }

    pub async fn create_vehicle(
        &self,
        requester: &Profile,
        mut vehicle: NewVehicle,
    ) -> PortResult<Vehicle> {
        self.policy.require_admin(requester)?;
        rules::validate_new_vehicle(&vehicle)?;
        vehicle.features = rules::normalize_features(vehicle.features);
        let vehicle = self.db.insert_vehicle(vehicle).await?;
        info!(vehicle_id = %vehicle.id, name = %vehicle.name, "Vehicle created");
        Ok(vehicle)
    }

    pub async fn update_vehicle(
        &self,
        requester: &Profile,
        vehicle_id: Uuid,
        mut update: VehicleUpdate,
    ) -> PortResult<Vehicle> {
        self.policy.require_admin(requester)?;
        rules::validate_vehicle_update(&update)?;
        update.features = update.features.map(rules::normalize_features);
        self.db.update_vehicle(vehicle_id, update).await
    }

    pub async fn set_availability(
        &self,
        requester: &Profile,
        vehicle_id: Uuid,
        available: bool,
    ) -> PortResult<Vehicle> {
        self.update_vehicle(
            requester,
            vehicle_id,
            VehicleUpdate {
                available: Some(available),
                ..Default::default()
            },
        )
        .await
    }

    /// Removes the vehicle and everything that references it.
    pub async fn delete_vehicle(&self, requester: &Profile, vehicle_id: Uuid) -> PortResult<()> {
        self.policy.require_admin(requester)?;
        self.db.delete_vehicle(vehicle_id).await?;
        info!(vehicle_id = %vehicle_id, "Vehicle deleted");
        Ok(())
    }

    //=====================================================================================
    // Profiles
    //=====================================================================================

    pub async fn get_profile(&self, requester: &Profile, user_id: Uuid) -> PortResult<Profile> {
        let target = self.db.get_profile(user_id).await?;
        if !self.policy.can_read_profile(requester, &target) {
            return Err(PortError::Unauthorized);
        }
        Ok(target)
    }

    pub async fn update_profile(
        &self,
        requester: &Profile,
        update: ProfileUpdate,
    ) -> PortResult<Profile> {
        self.db.update_profile(requester.id, update).await
    }

    pub async fn set_admin(
        &self,
        requester: &Profile,
        user_id: Uuid,
        is_admin: bool,
    ) -> PortResult<Profile> {
        self.policy.require_admin(requester)?;
        let profile = self.db.set_admin_flag(user_id, is_admin).await?;
        info!(user_id = %user_id, is_admin, granted_by = %requester.id, "Admin flag changed");
        Ok(profile)
    }

    //=====================================================================================
    // Admin Dashboard
    //=====================================================================================

    pub async fn dashboard(&self, requester: &Profile) -> PortResult<DashboardStats> {
        self.policy.require_admin(requester)?;
        self.db.dashboard_stats().await
    }
}

fn normalize_comment(comment: Option<String>) -> Option<String> {
    comment
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}
