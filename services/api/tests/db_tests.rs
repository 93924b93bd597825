//! Postgres adapter tests. Each test gets a fresh database with the migrations
//! applied; run them with a `DATABASE_URL` and `cargo test -- --ignored`.

use api_lib::adapters::DbAdapter;
use chrono::{Duration, NaiveDate, Utc};
use futures::future::join_all;
use rental_core::{
    BookingStatus, DatabaseService, NewBooking, NewReview, NewVehicle, PaymentStatus, PortError,
    Profile, ProfileUpdate, VehicleUpdate,
};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

async fn user(db: &DbAdapter, email: &str) -> Profile {
    db.create_profile_with_email(email, None, "hash").await.unwrap()
}

async fn vehicle(db: &DbAdapter, available: bool) -> Uuid {
    db.insert_vehicle(NewVehicle {
        name: "Hatchback".to_string(),
        vehicle_type: "Compact".to_string(),
        brand: "Renault".to_string(),
        model: "Clio".to_string(),
        year: 2022,
        price_per_day: Decimal::new(3900, 2),
        seats: 5,
        fuel_type: "Petrol".to_string(),
        transmission: "Manual".to_string(),
        image_url: None,
        features: vec!["Bluetooth".to_string()],
        location: "Porto".to_string(),
        available,
    })
    .await
    .unwrap()
    .id
}

fn new_booking(user_id: Uuid, vehicle_id: Uuid, start: NaiveDate, end: NaiveDate) -> NewBooking {
    NewBooking {
        user_id,
        vehicle_id,
        start_date: start,
        end_date: end,
        pickup_location: "Porto".to_string(),
        dropoff_location: "Porto".to_string(),
        total_price: Decimal::new(18000, 2),
    }
}

async fn completed_booking(db: &DbAdapter, user_id: Uuid, vehicle_id: Uuid) -> Uuid {
    let booking = db
        .insert_booking(new_booking(user_id, vehicle_id, date(2025, 1, 10), date(2025, 1, 12)))
        .await
        .unwrap();
    db.update_booking_status(booking.id, BookingStatus::Completed)
        .await
        .unwrap();
    booking.id
}

fn review(user_id: Uuid, vehicle_id: Uuid, booking_id: Uuid, rating: i16) -> NewReview {
    NewReview {
        user_id,
        vehicle_id,
        booking_id,
        rating,
        comment: None,
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn rating_trigger_tracks_review_writes(pool: PgPool) {
    let db = DbAdapter::new(pool);
    let alice = user(&db, "alice@example.com").await;
    let vehicle_id = vehicle(&db, true).await;

    let mut ids = Vec::new();
    for rating in [4, 5, 5] {
        let booking_id = completed_booking(&db, alice.id, vehicle_id).await;
        let created = db
            .create_review(review(alice.id, vehicle_id, booking_id, rating))
            .await
            .unwrap();
        ids.push(created.id);
    }
    let v = db.get_vehicle(vehicle_id).await.unwrap();
    assert_eq!(v.total_reviews, 3);
    assert!((v.rating - 14.0 / 3.0).abs() < 1e-9);

    db.delete_review(ids[0]).await.unwrap();
    let v = db.get_vehicle(vehicle_id).await.unwrap();
    assert_eq!((v.rating, v.total_reviews), (5.0, 2));

    db.update_review(ids[1], 3, Some("fine".to_string()))
        .await
        .unwrap();
    let v = db.get_vehicle(vehicle_id).await.unwrap();
    assert_eq!((v.rating, v.total_reviews), (4.0, 2));

    db.delete_review(ids[1]).await.unwrap();
    db.delete_review(ids[2]).await.unwrap();
    let v = db.get_vehicle(vehicle_id).await.unwrap();
    assert_eq!((v.rating, v.total_reviews), (0.0, 0));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn concurrent_reviews_serialize_on_the_vehicle(pool: PgPool) {
    let db = DbAdapter::new(pool);
    let vehicle_id = vehicle(&db, true).await;

    let mut requests = Vec::new();
    for i in 0..10 {
        let reviewer = user(&db, &format!("driver{}@example.com", i)).await;
        let booking_id = completed_booking(&db, reviewer.id, vehicle_id).await;
        let rating = (i % 5 + 1) as i16;
        requests.push(review(reviewer.id, vehicle_id, booking_id, rating));
    }

    let results = join_all(requests.into_iter().map(|r| db.create_review(r))).await;
    assert!(results.iter().all(|r| r.is_ok()));

    let v = db.get_vehicle(vehicle_id).await.unwrap();
    assert_eq!(v.total_reviews, 10);
    assert_eq!(v.rating, 3.0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn one_review_per_booking_even_under_contention(pool: PgPool) {
    let db = DbAdapter::new(pool);
    let alice = user(&db, "alice@example.com").await;
    let vehicle_id = vehicle(&db, true).await;
    let booking_id = completed_booking(&db, alice.id, vehicle_id).await;

    let attempts = (0..5).map(|_| db.create_review(review(alice.id, vehicle_id, booking_id, 4)));
    let results = join_all(attempts).await;

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| *e == PortError::DuplicateReview));
    let v = db.get_vehicle(vehicle_id).await.unwrap();
    assert_eq!((v.rating, v.total_reviews), (4.0, 1));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn reviews_need_an_owned_completed_booking(pool: PgPool) {
    let db = DbAdapter::new(pool);
    let alice = user(&db, "alice@example.com").await;
    let bob = user(&db, "bob@example.com").await;
    let vehicle_id = vehicle(&db, true).await;

    let pending = db
        .insert_booking(new_booking(alice.id, vehicle_id, date(2025, 3, 1), date(2025, 3, 2)))
        .await
        .unwrap();
    assert_eq!(
        db.create_review(review(alice.id, vehicle_id, pending.id, 5)).await,
        Err(PortError::ReviewNotAllowed)
    );

    let done = completed_booking(&db, alice.id, vehicle_id).await;
    assert_eq!(
        db.create_review(review(bob.id, vehicle_id, done, 5)).await,
        Err(PortError::ReviewNotAllowed)
    );
    assert!(matches!(
        db.create_review(review(alice.id, vehicle_id, Uuid::new_v4(), 5)).await,
        Err(PortError::NotFound(_))
    ));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn booking_constraints_map_to_ledger_errors(pool: PgPool) {
    let db = DbAdapter::new(pool);
    let alice = user(&db, "alice@example.com").await;
    let vehicle_id = vehicle(&db, true).await;
    let parked = vehicle(&db, false).await;

    let same_day = new_booking(alice.id, vehicle_id, date(2025, 6, 1), date(2025, 6, 1));
    assert_eq!(db.insert_booking(same_day).await, Err(PortError::InvalidDateRange));

    let negative = NewBooking {
        total_price: Decimal::new(-100, 2),
        ..new_booking(alice.id, vehicle_id, date(2025, 6, 1), date(2025, 6, 2))
    };
    assert!(matches!(
        db.insert_booking(negative).await,
        Err(PortError::InvalidInput(_))
    ));

    let unavailable = new_booking(alice.id, parked, date(2025, 6, 1), date(2025, 6, 2));
    assert_eq!(db.insert_booking(unavailable).await, Err(PortError::VehicleUnavailable));

    let missing = new_booking(alice.id, Uuid::new_v4(), date(2025, 6, 1), date(2025, 6, 2));
    assert!(matches!(
        db.insert_booking(missing).await,
        Err(PortError::NotFound(_))
    ));
    assert!(db.list_bookings(None).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn oversized_price_is_a_client_error(pool: PgPool) {
    let db = DbAdapter::new(pool);
    let vehicle_id = vehicle(&db, true).await;

    let update = VehicleUpdate {
        price_per_day: Some(Decimal::new(12_345_678_900, 2)),
        ..Default::default()
    };
    assert!(matches!(
        db.update_vehicle(vehicle_id, update).await,
        Err(PortError::InvalidInput(_))
    ));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn deleting_a_vehicle_cascades(pool: PgPool) {
    let db = DbAdapter::new(pool);
    let alice = user(&db, "alice@example.com").await;
    let vehicle_id = vehicle(&db, true).await;
    let booking_id = completed_booking(&db, alice.id, vehicle_id).await;
    let created = db
        .create_review(review(alice.id, vehicle_id, booking_id, 5))
        .await
        .unwrap();
    assert!(db.add_favorite(alice.id, vehicle_id).await.unwrap());
    assert!(!db.add_favorite(alice.id, vehicle_id).await.unwrap());

    db.delete_vehicle(vehicle_id).await.unwrap();

    assert!(matches!(db.get_booking(booking_id).await, Err(PortError::NotFound(_))));
    assert!(matches!(db.get_review(created.id).await, Err(PortError::NotFound(_))));
    assert!(db.list_favorites(alice.id).await.unwrap().is_empty());
    assert!(matches!(
        db.delete_vehicle(vehicle_id).await,
        Err(PortError::NotFound(_))
    ));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn expired_sessions_are_purged(pool: PgPool) {
    let db = DbAdapter::new(pool.clone());
    let alice = user(&db, "alice@example.com").await;
    let past = Utc::now() - Duration::minutes(1);

    for id in ["stale", "older"] {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(id)
            .bind(alice.id)
            .bind(past)
            .execute(&pool)
            .await
            .unwrap();
    }
    assert_eq!(db.validate_auth_session("stale").await, Err(PortError::Unauthorized));

    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM auth_sessions")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(remaining, 1);

    db.create_auth_session("fresh", alice.id, Utc::now() + Duration::days(1))
        .await
        .unwrap();
    let ids: Vec<String> = sqlx::query_scalar("SELECT id FROM auth_sessions")
        .fetch_all(&pool)
        .await
        .unwrap();
    assert_eq!(ids, vec!["fresh".to_string()]);
    assert_eq!(db.validate_auth_session("fresh").await, Ok(alice.id));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn nullable_fields_can_be_cleared(pool: PgPool) {
    let db = DbAdapter::new(pool);
    let alice = user(&db, "alice@example.com").await;
    let vehicle_id = vehicle(&db, true).await;

    let set = ProfileUpdate {
        display_name: Some("Alice".to_string()),
        avatar_url: Some(Some("https://img/a.png".to_string())),
    };
    let profile = db.update_profile(alice.id, set).await.unwrap();
    assert_eq!(profile.avatar_url.as_deref(), Some("https://img/a.png"));

    let rename = ProfileUpdate { display_name: Some("Al".to_string()), ..Default::default() };
    let profile = db.update_profile(alice.id, rename).await.unwrap();
    assert_eq!(profile.avatar_url.as_deref(), Some("https://img/a.png"));

    let clear = ProfileUpdate { avatar_url: Some(None), ..Default::default() };
    let profile = db.update_profile(alice.id, clear).await.unwrap();
    assert_eq!(profile.avatar_url, None);
    assert_eq!(profile.display_name.as_deref(), Some("Al"));

    let image = VehicleUpdate {
        image_url: Some(Some("https://img/car.jpg".to_string())),
        ..Default::default()
    };
    let v = db.update_vehicle(vehicle_id, image).await.unwrap();
    assert_eq!(v.image_url.as_deref(), Some("https://img/car.jpg"));
    let clear = VehicleUpdate { image_url: Some(None), ..Default::default() };
    let v = db.update_vehicle(vehicle_id, clear).await.unwrap();
    assert_eq!(v.image_url, None);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn dashboard_is_aggregated_in_sql(pool: PgPool) {
    let db = DbAdapter::new(pool);
    let alice = user(&db, "alice@example.com").await;
    let v1 = vehicle(&db, true).await;
    vehicle(&db, false).await;

    let paid = db
        .insert_booking(new_booking(alice.id, v1, date(2025, 6, 1), date(2025, 6, 5)))
        .await
        .unwrap();
    db.update_payment_status(paid.id, PaymentStatus::Completed)
        .await
        .unwrap();
    completed_booking(&db, alice.id, v1).await;

    let stats = db.dashboard_stats().await.unwrap();
    assert_eq!(stats.total_vehicles, 2);
    assert_eq!(stats.available_vehicles, 1);
    assert_eq!(stats.total_bookings, 2);
    assert_eq!(stats.revenue, Decimal::new(18000, 2));
    assert_eq!(stats.bookings_by_status.len(), BookingStatus::ALL.len());
    assert!(stats.bookings_by_status.contains(&(BookingStatus::Pending, 1)));
    assert!(stats.bookings_by_status.contains(&(BookingStatus::Completed, 1)));
    assert!(stats.bookings_by_status.contains(&(BookingStatus::Cancelled, 0)));
}
