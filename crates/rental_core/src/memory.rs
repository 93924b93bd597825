//! crates/rental_core/src/memory.rs
//!
//! An in-memory `DatabaseService`. All tables sit behind one async mutex, so every
//! port method is a single critical section and compound writes are atomic.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::{
    AuthSession, Booking, BookingStatus, DashboardStats, Favorite, NewBooking, NewReview,
    NewVehicle, PaymentStatus, Profile, ProfileUpdate, Review, TripDetails, UserCredentials,
    Vehicle, VehicleUpdate,
};
use crate::ports::{DatabaseService, PortError, PortResult};
use crate::rules;

#[derive(Default)]
struct Tables {
    profiles: HashMap<Uuid, Profile>,
    password_hashes: HashMap<Uuid, String>,
    auth_sessions: HashMap<String, AuthSession>,
    vehicles: HashMap<Uuid, Vehicle>,
    bookings: HashMap<Uuid, Booking>,
    favorites: Vec<Favorite>,
    reviews: HashMap<Uuid, Review>,
}

impl Tables {
    fn vehicle_mut(&mut self, vehicle_id: Uuid) -> PortResult<&mut Vehicle> {
        self.vehicles
            .get_mut(&vehicle_id)
            .ok_or_else(|| PortError::NotFound(format!("Vehicle {} not found", vehicle_id)))
    }

    fn booking_mut(&mut self, booking_id: Uuid) -> PortResult<&mut Booking> {
        self.bookings
            .get_mut(&booking_id)
            .ok_or_else(|| PortError::NotFound(format!("Booking {} not found", booking_id)))
    }

    fn profile_mut(&mut self, user_id: Uuid) -> PortResult<&mut Profile> {
        self.profiles
            .get_mut(&user_id)
            .ok_or_else(|| PortError::NotFound(format!("Profile {} not found", user_id)))
    }

    fn review(&self, review_id: Uuid) -> PortResult<&Review> {
        self.reviews
            .get(&review_id)
            .ok_or_else(|| PortError::NotFound(format!("Review {} not found", review_id)))
    }

    /// Recomputes the derived rating of one vehicle from its current reviews.
    fn refresh_rating(&mut self, vehicle_id: Uuid) {
        let aggregate = rules::aggregate_rating(
            self.reviews
                .values()
                .filter(|r| r.vehicle_id == vehicle_id)
                .map(|r| r.rating),
        );
        if let Some(vehicle) = self.vehicles.get_mut(&vehicle_id) {
            vehicle.rating = aggregate.rating;
            vehicle.total_reviews = aggregate.total_reviews;
        }
    }
}

/// A `DatabaseService` kept entirely in process memory.
#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DatabaseService for InMemoryStore {
    // --- Profiles & Auth ---

    async fn create_profile_with_email(
        &self,
        email: &str,
        display_name: Option<&str>,
        hashed_password: &str,
    ) -> PortResult<Profile> {
        let mut t = self.tables.lock().await;
        if t.profiles.values().any(|p| p.email.eq_ignore_ascii_case(email)) {
            return Err(PortError::Conflict(format!("Email {} is already registered", email)));
        }
        let profile = Profile {
            id: Uuid::new_v4(),
            email: email.to_string(),
            display_name: display_name.map(str::to_string),
            avatar_url: None,
            is_admin: false,
            created_at: Utc::now(),
        };
        t.password_hashes
            .insert(profile.id, hashed_password.to_string());
        t.profiles.insert(profile.id, profile.clone());
        Ok(profile)
    }

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let t = self.tables.lock().await;
        let profile = t
            .profiles
            .values()
            .find(|p| p.email.eq_ignore_ascii_case(email))
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", email)))?;
        let hashed_password = t
            .password_hashes
            .get(&profile.id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("User {} has no password", email)))?;
        Ok(UserCredentials {
            user_id: profile.id,
            email: profile.email.clone(),
            hashed_password,
        })
    }

    async fn get_profile(&self, user_id: Uuid) -> PortResult<Profile> {
        let mut t = self.tables.lock().await;
        t.profile_mut(user_id).map(|p| p.clone())
    }

    async fn update_profile(&self, user_id: Uuid, update: ProfileUpdate) -> PortResult<Profile> {
        let mut t = self.tables.lock().await;
        let profile = t.profile_mut(user_id)?;
        if let Some(name) = update.display_name {
            profile.display_name = Some(name);
        }
        if let Some(avatar) = update.avatar_url {
            profile.avatar_url = avatar;
        }
        Ok(profile.clone())
    }

    async fn set_admin_flag(&self, user_id: Uuid, is_admin: bool) -> PortResult<Profile> {
        let mut t = self.tables.lock().await;
        let profile = t.profile_mut(user_id)?;
        profile.is_admin = is_admin;
        Ok(profile.clone())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        let mut t = self.tables.lock().await;
        let now = Utc::now();
        t.auth_sessions.retain(|_, s| s.expires_at > now);
        t.auth_sessions.insert(
            session_id.to_string(),
            AuthSession {
                id: session_id.to_string(),
                user_id,
                expires_at,
            },
        );
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let mut t = self.tables.lock().await;
        let found = t
            .auth_sessions
            .get(session_id)
            .map(|s| (s.user_id, s.expires_at > Utc::now()));
        match found {
            Some((user_id, true)) => Ok(user_id),
            Some((_, false)) => {
                t.auth_sessions.remove(session_id);
                Err(PortError::Unauthorized)
            }
            None => Err(PortError::Unauthorized),
        }
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        let mut t = self.tables.lock().await;
        t.auth_sessions.remove(session_id);
        Ok(())
    }

    // --- Vehicles ---

    async fn insert_vehicle(&self, vehicle: NewVehicle) -> PortResult<Vehicle> {
        let mut t = self.tables.lock().await;
        let vehicle = Vehicle {
            id: Uuid::new_v4(),
            name: vehicle.name,
            vehicle_type: vehicle.vehicle_type,
            brand: vehicle.brand,
            model: vehicle.model,
            year: vehicle.year,
            price_per_day: vehicle.price_per_day,
            seats: vehicle.seats,
            fuel_type: vehicle.fuel_type,
            transmission: vehicle.transmission,
            image_url: vehicle.image_url,
            features: vehicle.features,
            location: vehicle.location,
            available: vehicle.available,
            rating: 0.0,
            total_reviews: 0,
            created_at: Utc::now(),
        };
        t.vehicles.insert(vehicle.id, vehicle.clone());
        Ok(vehicle)
    }

    async fn update_vehicle(&self, vehicle_id: Uuid, update: VehicleUpdate) -> PortResult<Vehicle> {
        let mut t = self.tables.lock().await;
        let v = t.vehicle_mut(vehicle_id)?;
        if let Some(x) = update.name {
            v.name = x;
        }
        if let Some(x) = update.vehicle_type {
            v.vehicle_type = x;
        }
        if let Some(x) = update.brand {
            v.brand = x;
        }
        if let Some(x) = update.model {
            v.model = x;
        }
        if let Some(x) = update.year {
            v.year = x;
        }
        if let Some(x) = update.price_per_day {
            v.price_per_day = x;
        }
        if let Some(x) = update.seats {
            v.seats = x;
        }
        if let Some(x) = update.fuel_type {
            v.fuel_type = x;
        }
        if let Some(x) = update.transmission {
            v.transmission = x;
        }
        if let Some(x) = update.image_url {
            v.image_url = x;
        }
        if let Some(x) = update.features {
            v.features = x;
        }
        if let Some(x) = update.location {
            v.location = x;
        }
        if let Some(x) = update.available {
            v.available = x;
        }
        Ok(v.clone())
    }

    async fn delete_vehicle(&self, vehicle_id: Uuid) -> PortResult<()> {
        let mut t = self.tables.lock().await;
        if t.vehicles.remove(&vehicle_id).is_none() {
            return Err(PortError::NotFound(format!("Vehicle {} not found", vehicle_id)));
        }
        t.bookings.retain(|_, b| b.vehicle_id != vehicle_id);
        t.favorites.retain(|f| f.vehicle_id != vehicle_id);
        t.reviews.retain(|_, r| r.vehicle_id != vehicle_id);
        Ok(())
    }

    async fn get_vehicle(&self, vehicle_id: Uuid) -> PortResult<Vehicle> {
        let mut t = self.tables.lock().await;
        t.vehicle_mut(vehicle_id).map(|v| v.clone())
    }

    async fn list_vehicles(&self, only_available: bool) -> PortResult<Vec<Vehicle>> {
        let t = self.tables.lock().await;
        let mut vehicles: Vec<Vehicle> = t
            .vehicles
            .values()
            .filter(|v| v.available || !only_available)
            .cloned()
            .collect();
        vehicles.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(vehicles)
    }

    // --- Bookings ---

    async fn insert_booking(&self, booking: NewBooking) -> PortResult<Booking> {
        let mut t = self.tables.lock().await;
        rules::check_vehicle_bookable(t.vehicle_mut(booking.vehicle_id)?)?;
        let now = Utc::now();
        let booking = Booking {
            id: Uuid::new_v4(),
            user_id: booking.user_id,
            vehicle_id: booking.vehicle_id,
            start_date: booking.start_date,
            end_date: booking.end_date,
            pickup_location: booking.pickup_location,
            dropoff_location: booking.dropoff_location,
            total_price: booking.total_price,
            status: BookingStatus::Pending,
            payment_status: PaymentStatus::Pending,
            trip: TripDetails::default(),
            created_at: now,
            updated_at: now,
        };
        t.bookings.insert(booking.id, booking.clone());
        Ok(booking)
    }

    async fn get_booking(&self, booking_id: Uuid) -> PortResult<Booking> {
        let mut t = self.tables.lock().await;
        t.booking_mut(booking_id).map(|b| b.clone())
    }

    async fn update_booking_status(
        &self,
        booking_id: Uuid,
        status: BookingStatus,
    ) -> PortResult<Booking> {
        let mut t = self.tables.lock().await;
        let b = t.booking_mut(booking_id)?;
        b.status = status;
        b.updated_at = Utc::now();
        Ok(b.clone())
    }

    async fn update_payment_status(
        &self,
        booking_id: Uuid,
        payment_status: PaymentStatus,
    ) -> PortResult<Booking> {
        let mut t = self.tables.lock().await;
        let b = t.booking_mut(booking_id)?;
        b.payment_status = payment_status;
        b.updated_at = Utc::now();
        Ok(b.clone())
    }

    async fn update_trip_details(
        &self,
        booking_id: Uuid,
        details: TripDetails,
    ) -> PortResult<Booking> {
        let mut t = self.tables.lock().await;
        let b = t.booking_mut(booking_id)?;
        b.trip.merge(details);
        b.updated_at = Utc::now();
        Ok(b.clone())
    }

    async fn list_bookings(&self, owner: Option<Uuid>) -> PortResult<Vec<Booking>> {
        let t = self.tables.lock().await;
        let mut bookings: Vec<Booking> = t
            .bookings
            .values()
            .filter(|b| owner.map_or(true, |o| b.user_id == o))
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }

    // --- Favorites ---

    async fn add_favorite(&self, user_id: Uuid, vehicle_id: Uuid) -> PortResult<bool> {
        let mut t = self.tables.lock().await;
        t.vehicle_mut(vehicle_id)?;
        if t
            .favorites
            .iter()
            .any(|f| f.user_id == user_id && f.vehicle_id == vehicle_id)
        {
            return Ok(false);
        }
        t.favorites.push(Favorite {
            user_id,
            vehicle_id,
            created_at: Utc::now(),
        });
        Ok(true)
    }

    async fn remove_favorite(&self, user_id: Uuid, vehicle_id: Uuid) -> PortResult<bool> {
        let mut t = self.tables.lock().await;
        let before = t.favorites.len();
        t.favorites
            .retain(|f| !(f.user_id == user_id && f.vehicle_id == vehicle_id));
        Ok(t.favorites.len() != before)
    }

    async fn list_favorites(&self, user_id: Uuid) -> PortResult<Vec<Favorite>> {
        let t = self.tables.lock().await;
        Ok(t.favorites
            .iter()
            .filter(|f| f.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn dashboard_stats(&self) -> PortResult<DashboardStats> {
        let t = self.tables.lock().await;
        Ok(DashboardStats {
            total_vehicles: t.vehicles.len(),
            available_vehicles: t.vehicles.values().filter(|v| v.available).count(),
            total_bookings: t.bookings.len(),
            bookings_by_status: rules::status_breakdown(
                t.bookings.values().map(|b| (b.status, 1)),
            ),
            revenue: t
                .bookings
                .values()
                .filter(|b| b.payment_status == PaymentStatus::Completed)
                .map(|b| b.total_price)
                .sum(),
        })
    }

    // --- Reviews ---

    async fn create_review(&self, review: NewReview) -> PortResult<Review> {
        let mut t = self.tables.lock().await;
        let booking = t.booking_mut(review.booking_id)?.clone();
        let already_reviewed = t
            .reviews
            .values()
            .any(|r| r.user_id == review.user_id && r.booking_id == review.booking_id);
        rules::check_review_eligibility(&review, &booking, already_reviewed)?;

        let review = Review {
            id: Uuid::new_v4(),
            user_id: review.user_id,
            vehicle_id: review.vehicle_id,
            booking_id: review.booking_id,
            rating: review.rating,
            comment: review.comment,
            created_at: Utc::now(),
        };
        t.reviews.insert(review.id, review.clone());
        t.refresh_rating(review.vehicle_id);
        Ok(review)
    }

    async fn update_review(
        &self,
        review_id: Uuid,
        rating: i16,
        comment: Option<String>,
    ) -> PortResult<Review> {
        let mut t = self.tables.lock().await;
        let vehicle_id = t.review(review_id)?.vehicle_id;
        let updated = t.reviews.get_mut(&review_id).map(|r| {
            r.rating = rating;
            r.comment = comment;
            r.clone()
        });
        t.refresh_rating(vehicle_id);
        updated.ok_or_else(|| PortError::NotFound(format!("Review {} not found", review_id)))
    }

    async fn delete_review(&self, review_id: Uuid) -> PortResult<()> {
        let mut t = self.tables.lock().await;
        let vehicle_id = t.review(review_id)?.vehicle_id;
        t.reviews.remove(&review_id);
        t.refresh_rating(vehicle_id);
        Ok(())
    }

    async fn get_review(&self, review_id: Uuid) -> PortResult<Review> {
        let t = self.tables.lock().await;
        t.review(review_id).cloned()
    }

    async fn list_reviews_for_vehicle(&self, vehicle_id: Uuid) -> PortResult<Vec<Review>> {
        let t = self.tables.lock().await;
        let mut reviews: Vec<Review> = t
            .reviews
            .values()
            .filter(|r| r.vehicle_id == vehicle_id)
            .cloned()
            .collect();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reviews)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn expired_sessions_are_dropped() {
        let store = InMemoryStore::new();
        let user_id = Uuid::new_v4();
        let past = Utc::now() - Duration::minutes(5);
        {
            let mut t = store.tables.lock().await;
            for id in ["stale", "other-stale"] {
                t.auth_sessions.insert(
                    id.to_string(),
                    AuthSession { id: id.to_string(), user_id, expires_at: past },
                );
            }
        }

        assert_eq!(
            store.validate_auth_session("stale").await,
            Err(PortError::Unauthorized)
        );
        {
            let t = store.tables.lock().await;
            assert!(!t.auth_sessions.contains_key("stale"));
            assert!(t.auth_sessions.contains_key("other-stale"));
        }

        // A new login sweeps whatever expired in the meantime.
        let future = Utc::now() + Duration::days(1);
        store.create_auth_session("fresh", user_id, future).await.unwrap();
        let t = store.tables.lock().await;
        assert_eq!(t.auth_sessions.len(), 1);
        assert!(t.auth_sessions.contains_key("fresh"));
    }
}
