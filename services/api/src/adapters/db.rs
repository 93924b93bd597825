//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.
//!
//! Vehicle `rating`/`total_reviews` are maintained by the `reviews_refresh_rating`
//! trigger, so every review write below recomputes the aggregate inside its own
//! transaction.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rental_core::domain::{
    Booking, BookingStatus, DashboardStats, Favorite, NewBooking, NewReview, NewVehicle, PaymentStatus, Profile,
    ProfileUpdate, Review, TripDetails, UserCredentials, Vehicle, VehicleUpdate,
};
use rental_core::ports::{DatabaseService, PortError, PortResult};
use rental_core::rules;
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use tracing::error;
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

const PROFILE_COLUMNS: &str = "id, email, display_name, avatar_url, is_admin, created_at";
const VEHICLE_COLUMNS: &str = "id, name, vehicle_type, brand, model, year, price_per_day, seats, \
     fuel_type, transmission, image_url, features, location, available, rating, total_reviews, \
     created_at";
const BOOKING_COLUMNS: &str = "id, user_id, vehicle_id, start_date, end_date, pickup_location, \
     dropoff_location, total_price, status, payment_status, fuel_level_pickup, \
     fuel_level_dropoff, mileage_pickup, mileage_dropoff, actual_pickup_time, \
     actual_dropoff_time, damage_report, created_at, updated_at";
const REVIEW_COLUMNS: &str = "id, user_id, vehicle_id, booking_id, rating, comment, created_at";

fn unexpected(e: sqlx::Error) -> PortError {
    error!("Database error: {}", e);
    PortError::Unexpected(e.to_string())
}

/// SQLSTATE `numeric_value_out_of_range`.
const NUMERIC_OUT_OF_RANGE: &str = "22003";
const BOOKING_DATE_RANGE_CONSTRAINT: &str = "bookings_date_range";

/// Maps constraint and range failures on a write to client errors.
fn rejected_write(e: sqlx::Error) -> PortError {
    if let sqlx::Error::Database(ref db) = e {
        if db.is_check_violation() {
            if db.constraint() == Some(BOOKING_DATE_RANGE_CONSTRAINT) {
                return PortError::InvalidDateRange;
            }
            return PortError::InvalidInput(format!(
                "violates {}",
                db.constraint().unwrap_or("a check constraint")
            ));
        }
        if db.code().as_deref() == Some(NUMERIC_OUT_OF_RANGE) {
            return PortError::InvalidInput("numeric value out of range".to_string());
        }
    }
    unexpected(e)
}

fn count(n: i64) -> usize {
    usize::try_from(n).unwrap_or_default()
}

fn not_found_or_unexpected(e: sqlx::Error, what: String) -> PortError {
    match e {
        sqlx::Error::RowNotFound => PortError::NotFound(what),
        _ => unexpected(e),
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct ProfileRecord {
    id: Uuid,
    email: String,
    display_name: Option<String>,
    avatar_url: Option<String>,
    is_admin: bool,
    created_at: DateTime<Utc>,
}
impl ProfileRecord {
    fn to_domain(self) -> Profile {
        Profile {
            id: self.id,
            email: self.email,
            display_name: self.display_name,
            avatar_url: self.avatar_url,
            is_admin: self.is_admin,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    id: Uuid,
    email: String,
    password_hash: String,
}

#[derive(FromRow)]
struct VehicleRecord {
    id: Uuid,
    name: String,
    vehicle_type: String,
    brand: String,
    model: String,
    year: i32,
    price_per_day: Decimal,
    seats: i32,
    fuel_type: String,
    transmission: String,
    image_url: Option<String>,
    features: Vec<String>,
    location: String,
    available: bool,
    rating: f64,
    total_reviews: i32,
    created_at: DateTime<Utc>,
}
impl VehicleRecord {
    fn to_domain(self) -> Vehicle {
        Vehicle {
            id: self.id,
            name: self.name,
            vehicle_type: self.vehicle_type,
            brand: self.brand,
            model: self.model,
            year: self.year,
            price_per_day: self.price_per_day,
            seats: self.seats,
            fuel_type: self.fuel_type,
            transmission: self.transmission,
            image_url: self.image_url,
            features: self.features,
            location: self.location,
            available: self.available,
            rating: self.rating,
            total_reviews: self.total_reviews,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct BookingRecord {
    id: Uuid,
    user_id: Uuid,
    vehicle_id: Uuid,
    start_date: NaiveDate,
    end_date: NaiveDate,
    pickup_location: String,
    dropoff_location: String,
    total_price: Decimal,
    status: String,
    payment_status: String,
    fuel_level_pickup: Option<i32>,
    fuel_level_dropoff: Option<i32>,
    mileage_pickup: Option<i32>,
    mileage_dropoff: Option<i32>,
    actual_pickup_time: Option<DateTime<Utc>>,
    actual_dropoff_time: Option<DateTime<Utc>>,
    damage_report: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl BookingRecord {
    fn to_domain(self) -> PortResult<Booking> {
        Ok(Booking {
            id: self.id,
            user_id: self.user_id,
            vehicle_id: self.vehicle_id,
            start_date: self.start_date,
            end_date: self.end_date,
            pickup_location: self.pickup_location,
            dropoff_location: self.dropoff_location,
            total_price: self.total_price,
            status: self.status.parse::<BookingStatus>()?,
            payment_status: self.payment_status.parse::<PaymentStatus>()?,
            trip: TripDetails {
                fuel_level_pickup: self.fuel_level_pickup,
                fuel_level_dropoff: self.fuel_level_dropoff,
                mileage_pickup: self.mileage_pickup,
                mileage_dropoff: self.mileage_dropoff,
                actual_pickup_time: self.actual_pickup_time,
                actual_dropoff_time: self.actual_dropoff_time,
                damage_report: self.damage_report,
            },
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
struct FavoriteRecord {
    user_id: Uuid,
    vehicle_id: Uuid,
    created_at: DateTime<Utc>,
}
impl FavoriteRecord {
    fn to_domain(self) -> Favorite {
        Favorite {
            user_id: self.user_id,
            vehicle_id: self.vehicle_id,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct ReviewRecord {
    id: Uuid,
    user_id: Uuid,
    vehicle_id: Uuid,
    booking_id: Uuid,
    rating: i16,
    comment: Option<String>,
    created_at: DateTime<Utc>,
}
impl ReviewRecord {
    fn to_domain(self) -> Review {
        Review {
            id: self.id,
            user_id: self.user_id,
            vehicle_id: self.vehicle_id,
            booking_id: self.booking_id,
            rating: self.rating,
            comment: self.comment,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct DashboardTotalsRecord {
    total_vehicles: i64,
    available_vehicles: i64,
    total_bookings: i64,
    revenue: Decimal,
}

fn bookings_to_domain(records: Vec<BookingRecord>) -> PortResult<Vec<Booking>> {
    records.into_iter().map(BookingRecord::to_domain).collect()
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    // --- Profiles & Auth ---

    async fn create_profile_with_email(
        &self,
        email: &str,
        display_name: Option<&str>,
        hashed_password: &str,
    ) -> PortResult<Profile> {
        let sql = format!(
            "INSERT INTO profiles (id, email, display_name, password_hash) VALUES ($1, $2, $3, $4) \
             RETURNING {}",
            PROFILE_COLUMNS
        );
        let record = sqlx::query_as::<_, ProfileRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(email)
            .bind(display_name)
            .bind(hashed_password)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                    PortError::Conflict(format!("Email {} is already registered", email))
                }
                _ => unexpected(e),
            })?;
        Ok(record.to_domain())
    }

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT id, email, password_hash FROM profiles WHERE LOWER(email) = LOWER($1)",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, format!("User {} not found", email)))?;
        Ok(UserCredentials {
            user_id: record.id,
            email: record.email,
            hashed_password: record.password_hash,
        })
    }

    async fn get_profile(&self, user_id: Uuid) -> PortResult<Profile> {
        let sql = format!("SELECT {} FROM profiles WHERE id = $1", PROFILE_COLUMNS);
        let record = sqlx::query_as::<_, ProfileRecord>(&sql)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| not_found_or_unexpected(e, format!("Profile {} not found", user_id)))?;
        Ok(record.to_domain())
    }

    async fn update_profile(&self, user_id: Uuid, update: ProfileUpdate) -> PortResult<Profile> {
        let sql = format!(
            "UPDATE profiles SET display_name = COALESCE($2, display_name), \
             avatar_url = CASE WHEN $3 THEN $4 ELSE avatar_url END \
             WHERE id = $1 RETURNING {}",
            PROFILE_COLUMNS
        );
        let record = sqlx::query_as::<_, ProfileRecord>(&sql)
            .bind(user_id)
            .bind(update.display_name)
            .bind(update.avatar_url.is_some())
            .bind(update.avatar_url.flatten())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| not_found_or_unexpected(e, format!("Profile {} not found", user_id)))?;
        Ok(record.to_domain())
    }

    async fn set_admin_flag(&self, user_id: Uuid, is_admin: bool) -> PortResult<Profile> {
        let sql = format!(
            "UPDATE profiles SET is_admin = $2 WHERE id = $1 RETURNING {}",
            PROFILE_COLUMNS
        );
        let record = sqlx::query_as::<_, ProfileRecord>(&sql)
            .bind(user_id)
            .bind(is_admin)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| not_found_or_unexpected(e, format!("Profile {} not found", user_id)))?;
        Ok(record.to_domain())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let found: Option<(Uuid, bool)> = sqlx::query_as(
            "SELECT user_id, expires_at > NOW() FROM auth_sessions WHERE id = $1",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        match found {
            Some((user_id, true)) => Ok(user_id),
            Some((_, false)) => {
                self.delete_auth_session(session_id).await?;
                Err(PortError::Unauthorized)
            }
            None => Err(PortError::Unauthorized),
        }
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    // --- Vehicles ---

    async fn insert_vehicle(&self, vehicle: NewVehicle) -> PortResult<Vehicle> {
        let sql = format!(
            "INSERT INTO vehicles (id, name, vehicle_type, brand, model, year, price_per_day, \
             seats, fuel_type, transmission, image_url, features, location, available) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) RETURNING {}",
            VEHICLE_COLUMNS
        );
        let record = sqlx::query_as::<_, VehicleRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(vehicle.name)
            .bind(vehicle.vehicle_type)
            .bind(vehicle.brand)
            .bind(vehicle.model)
            .bind(vehicle.year)
            .bind(vehicle.price_per_day)
            .bind(vehicle.seats)
            .bind(vehicle.fuel_type)
            .bind(vehicle.transmission)
            .bind(vehicle.image_url)
            .bind(vehicle.features)
            .bind(vehicle.location)
            .bind(vehicle.available)
            .fetch_one(&self.pool)
            .await
            .map_err(rejected_write)?;
        Ok(record.to_domain())
    }

    async fn update_vehicle(&self, vehicle_id: Uuid, update: VehicleUpdate) -> PortResult<Vehicle> {
        let sql = format!(
            "UPDATE vehicles SET \
             name = COALESCE($2, name), \
             vehicle_type = COALESCE($3, vehicle_type), \
             brand = COALESCE($4, brand), \
             model = COALESCE($5, model), \
             year = COALESCE($6, year), \
             price_per_day = COALESCE($7, price_per_day), \
             seats = COALESCE($8, seats), \
             fuel_type = COALESCE($9, fuel_type), \
             transmission = COALESCE($10, transmission), \
             image_url = CASE WHEN $11 THEN $15 ELSE image_url END, \
             features = COALESCE($12, features), \
             location = COALESCE($13, location), \
             available = COALESCE($14, available) \
             WHERE id = $1 RETURNING {}",
            VEHICLE_COLUMNS
        );
        let record = sqlx::query_as::<_, VehicleRecord>(&sql)
            .bind(vehicle_id)
            .bind(update.name)
            .bind(update.vehicle_type)
            .bind(update.brand)
            .bind(update.model)
            .bind(update.year)
            .bind(update.price_per_day)
            .bind(update.seats)
            .bind(update.fuel_type)
            .bind(update.transmission)
            .bind(update.image_url.is_some())
            .bind(update.features)
            .bind(update.location)
            .bind(update.available)
            .bind(update.image_url.flatten())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => {
                    PortError::NotFound(format!("Vehicle {} not found", vehicle_id))
                }
                _ => rejected_write(e),
            })?;
        Ok(record.to_domain())
    }

    async fn delete_vehicle(&self, vehicle_id: Uuid) -> PortResult<()> {
        // Bookings, favorites and reviews go with it through ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM vehicles WHERE id = $1")
            .bind(vehicle_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Vehicle {} not found", vehicle_id)));
        }
        Ok(())
    }

    async fn get_vehicle(&self, vehicle_id: Uuid) -> PortResult<Vehicle> {
        let sql = format!("SELECT {} FROM vehicles WHERE id = $1", VEHICLE_COLUMNS);
        let record = sqlx::query_as::<_, VehicleRecord>(&sql)
            .bind(vehicle_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| not_found_or_unexpected(e, format!("Vehicle {} not found", vehicle_id)))?;
        Ok(record.to_domain())
    }

    async fn list_vehicles(&self, only_available: bool) -> PortResult<Vec<Vehicle>> {
        let sql = format!(
            "SELECT {} FROM vehicles WHERE available OR NOT $1 ORDER BY created_at DESC",
            VEHICLE_COLUMNS
        );
        let records = sqlx::query_as::<_, VehicleRecord>(&sql)
            .bind(only_available)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    // --- Bookings ---

    async fn insert_booking(&self, booking: NewBooking) -> PortResult<Booking> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        // FOR SHARE keeps the availability flag stable until the insert commits.
        let sql = format!("SELECT {} FROM vehicles WHERE id = $1 FOR SHARE", VEHICLE_COLUMNS);
        let vehicle = sqlx::query_as::<_, VehicleRecord>(&sql)
            .bind(booking.vehicle_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| PortError::NotFound(format!("Vehicle {} not found", booking.vehicle_id)))?
            .to_domain();
        rules::check_vehicle_bookable(&vehicle)?;

        let sql = format!(
            "INSERT INTO bookings (id, user_id, vehicle_id, start_date, end_date, \
             pickup_location, dropoff_location, total_price, status, payment_status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {}",
            BOOKING_COLUMNS
        );
        let record = sqlx::query_as::<_, BookingRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(booking.user_id)
            .bind(booking.vehicle_id)
            .bind(booking.start_date)
            .bind(booking.end_date)
            .bind(booking.pickup_location)
            .bind(booking.dropoff_location)
            .bind(booking.total_price)
            .bind(BookingStatus::Pending.as_str())
            .bind(PaymentStatus::Pending.as_str())
            .fetch_one(&mut *tx)
            .await
            .map_err(rejected_write)?;

        tx.commit().await.map_err(unexpected)?;
        record.to_domain()
    }

    async fn get_booking(&self, booking_id: Uuid) -> PortResult<Booking> {
        let sql = format!("SELECT {} FROM bookings WHERE id = $1", BOOKING_COLUMNS);
        let record = sqlx::query_as::<_, BookingRecord>(&sql)
            .bind(booking_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| not_found_or_unexpected(e, format!("Booking {} not found", booking_id)))?;
        record.to_domain()
    }

    async fn update_booking_status(
        &self,
        booking_id: Uuid,
        status: BookingStatus,
    ) -> PortResult<Booking> {
        let sql = format!(
            "UPDATE bookings SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            BOOKING_COLUMNS
        );
        let record = sqlx::query_as::<_, BookingRecord>(&sql)
            .bind(booking_id)
            .bind(status.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| not_found_or_unexpected(e, format!("Booking {} not found", booking_id)))?;
        record.to_domain()
    }

    async fn update_payment_status(
        &self,
        booking_id: Uuid,
        payment_status: PaymentStatus,
    ) -> PortResult<Booking> {
        let sql = format!(
            "UPDATE bookings SET payment_status = $2, updated_at = NOW() WHERE id = $1 \
             RETURNING {}",
            BOOKING_COLUMNS
        );
        let record = sqlx::query_as::<_, BookingRecord>(&sql)
            .bind(booking_id)
            .bind(payment_status.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| not_found_or_unexpected(e, format!("Booking {} not found", booking_id)))?;
        record.to_domain()
    }

    async fn update_trip_details(
        &self,
        booking_id: Uuid,
        details: TripDetails,
    ) -> PortResult<Booking> {
        let sql = format!(
            "UPDATE bookings SET \
             fuel_level_pickup = COALESCE($2, fuel_level_pickup), \
             fuel_level_dropoff = COALESCE($3, fuel_level_dropoff), \
             mileage_pickup = COALESCE($4, mileage_pickup), \
             mileage_dropoff = COALESCE($5, mileage_dropoff), \
             actual_pickup_time = COALESCE($6, actual_pickup_time), \
             actual_dropoff_time = COALESCE($7, actual_dropoff_time), \
             damage_report = COALESCE($8, damage_report), \
             updated_at = NOW() \
             WHERE id = $1 RETURNING {}",
            BOOKING_COLUMNS
        );
        let record = sqlx::query_as::<_, BookingRecord>(&sql)
            .bind(booking_id)
            .bind(details.fuel_level_pickup)
            .bind(details.fuel_level_dropoff)
            .bind(details.mileage_pickup)
            .bind(details.mileage_dropoff)
            .bind(details.actual_pickup_time)
            .bind(details.actual_dropoff_time)
            .bind(details.damage_report)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| not_found_or_unexpected(e, format!("Booking {} not found", booking_id)))?;
        record.to_domain()
    }

    async fn list_bookings(&self, owner: Option<Uuid>) -> PortResult<Vec<Booking>> {
        let sql = format!(
            "SELECT {} FROM bookings WHERE $1::uuid IS NULL OR user_id = $1 \
             ORDER BY created_at DESC",
            BOOKING_COLUMNS
        );
        let records = sqlx::query_as::<_, BookingRecord>(&sql)
            .bind(owner)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        bookings_to_domain(records)
    }

    // --- Favorites ---

    async fn add_favorite(&self, user_id: Uuid, vehicle_id: Uuid) -> PortResult<bool> {
        let result = sqlx::query(
            "INSERT INTO favorites (user_id, vehicle_id) VALUES ($1, $2) \
             ON CONFLICT (user_id, vehicle_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(vehicle_id)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => {
                PortError::NotFound(format!("Vehicle {} not found", vehicle_id))
            }
            _ => unexpected(e),
        })?;
        Ok(result.rows_affected() == 1)
    }

    async fn remove_favorite(&self, user_id: Uuid, vehicle_id: Uuid) -> PortResult<bool> {
        let result = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND vehicle_id = $2")
            .bind(user_id)
            .bind(vehicle_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_favorites(&self, user_id: Uuid) -> PortResult<Vec<Favorite>> {
        let records = sqlx::query_as::<_, FavoriteRecord>(
            "SELECT user_id, vehicle_id, created_at FROM favorites WHERE user_id = $1 \
             ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    // --- Admin ---

    async fn dashboard_stats(&self) -> PortResult<DashboardStats> {
        let totals = sqlx::query_as::<_, DashboardTotalsRecord>(
            "SELECT \
             (SELECT COUNT(*) FROM vehicles) AS total_vehicles, \
             (SELECT COUNT(*) FILTER (WHERE available) FROM vehicles) AS available_vehicles, \
             (SELECT COUNT(*) FROM bookings) AS total_bookings, \
             (SELECT COALESCE(SUM(total_price) FILTER (WHERE payment_status = $1), 0) \
              FROM bookings) AS revenue",
        )
        .bind(PaymentStatus::Completed.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;

        let by_status: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM bookings GROUP BY status")
                .fetch_all(&self.pool)
                .await
                .map_err(unexpected)?;
        let by_status = by_status
            .into_iter()
            .map(|(status, n)| Ok((status.parse::<BookingStatus>()?, count(n))))
            .collect::<PortResult<Vec<_>>>()?;

        Ok(DashboardStats {
            total_vehicles: count(totals.total_vehicles),
            available_vehicles: count(totals.available_vehicles),
            total_bookings: count(totals.total_bookings),
            bookings_by_status: rules::status_breakdown(by_status),
            revenue: totals.revenue,
        })
    }

    // --- Reviews ---

    async fn create_review(&self, review: NewReview) -> PortResult<Review> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        // Locking the booking serializes competing reviews for it.
        let sql = format!("SELECT {} FROM bookings WHERE id = $1 FOR UPDATE", BOOKING_COLUMNS);
        let booking = sqlx::query_as::<_, BookingRecord>(&sql)
            .bind(review.booking_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| PortError::NotFound(format!("Booking {} not found", review.booking_id)))?
            .to_domain()?;

        let already_reviewed: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM reviews WHERE user_id = $1 AND booking_id = $2)",
        )
        .bind(review.user_id)
        .bind(review.booking_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(unexpected)?;

        rules::check_review_eligibility(&review, &booking, already_reviewed)?;

        let sql = format!(
            "INSERT INTO reviews (id, user_id, vehicle_id, booking_id, rating, comment) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            REVIEW_COLUMNS
        );
        let record = sqlx::query_as::<_, ReviewRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(review.user_id)
            .bind(review.vehicle_id)
            .bind(review.booking_id)
            .bind(review.rating)
            .bind(review.comment)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                    PortError::DuplicateReview
                }
                _ => unexpected(e),
            })?;

        tx.commit().await.map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn update_review(
        &self,
        review_id: Uuid,
        rating: i16,
        comment: Option<String>,
    ) -> PortResult<Review> {
        let sql = format!(
            "UPDATE reviews SET rating = $2, comment = $3 WHERE id = $1 RETURNING {}",
            REVIEW_COLUMNS
        );
        let record = sqlx::query_as::<_, ReviewRecord>(&sql)
            .bind(review_id)
            .bind(rating)
            .bind(comment)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| not_found_or_unexpected(e, format!("Review {} not found", review_id)))?;
        Ok(record.to_domain())
    }

    async fn delete_review(&self, review_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(review_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Review {} not found", review_id)));
        }
        Ok(())
    }

    async fn get_review(&self, review_id: Uuid) -> PortResult<Review> {
        let sql = format!("SELECT {} FROM reviews WHERE id = $1", REVIEW_COLUMNS);
        let record = sqlx::query_as::<_, ReviewRecord>(&sql)
            .bind(review_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| not_found_or_unexpected(e, format!("Review {} not found", review_id)))?;
        Ok(record.to_domain())
    }

    async fn list_reviews_for_vehicle(&self, vehicle_id: Uuid) -> PortResult<Vec<Review>> {
        let sql = format!(
            "SELECT {} FROM reviews WHERE vehicle_id = $1 ORDER BY created_at DESC",
            REVIEW_COLUMNS
        );
        let records = sqlx::query_as::<_, ReviewRecord>(&sql)
            .bind(vehicle_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }
}
