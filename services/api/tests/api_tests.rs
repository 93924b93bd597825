use api_lib::config::Config;
use api_lib::web::{build_router, state::AppState};
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use rental_core::InMemoryStore;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use tracing::Level;

const ADMIN_EMAIL: &str = "admin@rental.test";

fn create_test_app() -> Router {
    let config = Arc::new(Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        database_url: "postgres://unused".to_string(),
        db_max_connections: 1,
        log_level: Level::INFO,
        admin_emails: vec![ADMIN_EMAIL.to_string()],
        session_ttl_days: 1,
        cors_origin: "http://localhost:3000".to_string(),
    });
    let state = Arc::new(AppState::new(Arc::new(InMemoryStore::new()), config));
    build_router(state).unwrap()
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    cookie: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, value)
}

/// Signs up and returns the `session=...` cookie pair.
async fn signup(app: &Router, email: &str) -> String {
    let request = Request::builder()
        .method("POST")
        .uri("/auth/signup")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "email": email, "password": "correct horse battery" }).to_string(),
        ))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

async fn create_vehicle(app: &Router, admin: &str, name: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/vehicles",
        Some(admin),
        Some(json!({
            "name": name,
            "vehicle_type": "SUV",
            "brand": "Kia",
            "model": "Sportage",
            "year": 2024,
            "price_per_day": "45.00",
            "seats": 5,
            "fuel_type": "Diesel",
            "transmission": "Manual",
            "features": ["GPS", "Roof rack"],
            "location": "Porto"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn protected_routes_require_a_session() {
    let app = create_test_app();
    let (status, _) = send(&app, "GET", "/vehicles", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "GET", "/bookings", Some("session=forged"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn signup_rejects_duplicates_and_bad_input() {
    let app = create_test_app();
    signup(&app, "driver@example.com").await;

    let (status, _) = send(
        &app,
        "POST",
        "/auth/signup",
        None,
        Some(json!({ "email": "Driver@Example.com", "password": "another password" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app,
        "POST",
        "/auth/signup",
        None,
        Some(json!({ "email": "not-an-email", "password": "long enough pw" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_and_logout_cycle() {
    let app = create_test_app();
    signup(&app, "driver@example.com").await;

    let (status, _) = send(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": "driver@example.com", "password": "wrong password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .method("POST")
        .uri("/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "email": "driver@example.com", "password": "correct horse battery" })
                .to_string(),
        ))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response.headers()[header::SET_COOKIE]
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string();

    let (status, body) = send(&app, "GET", "/profile", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "driver@example.com");
    assert_eq!(body["admin_capable"], false);

    let (status, _) = send(&app, "POST", "/auth/logout", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "GET", "/profile", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn booking_and_review_flow() {
    let app = create_test_app();
    let admin = signup(&app, ADMIN_EMAIL).await;
    let driver = signup(&app, "driver@example.com").await;
    let vehicle_id = create_vehicle(&app, &admin, "Family SUV").await;

    let (status, _) = send(
        &app,
        "POST",
        "/vehicles",
        Some(&driver),
        Some(json!({
            "name": "Sneaky", "vehicle_type": "Van", "brand": "Ford", "model": "Transit",
            "year": 2020, "price_per_day": "10.00", "seats": 3, "fuel_type": "Diesel",
            "transmission": "Manual", "location": "Porto"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        "POST",
        "/bookings",
        Some(&driver),
        Some(json!({
            "vehicle_id": vehicle_id,
            "start_date": "2099-06-01",
            "end_date": "2099-06-05",
            "pickup_location": "Porto Airport",
            "total_price": "180.00"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["payment_status"], "pending");
    assert_eq!(body["timeline"], "upcoming");
    assert_eq!(body["dropoff_location"], "Porto Airport");
    let booking_id = body["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        "POST",
        "/bookings",
        Some(&driver),
        Some(json!({
            "vehicle_id": vehicle_id,
            "start_date": "2099-06-05",
            "end_date": "2099-06-01",
            "pickup_location": "Porto Airport",
            "total_price": "180.00"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, "GET", "/bookings", Some(&driver), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["upcoming"].as_array().unwrap().len(), 1);
    assert!(body["past"].as_array().unwrap().is_empty());

    // Not completed yet.
    let review = json!({ "vehicle_id": vehicle_id, "booking_id": booking_id, "rating": 4 });
    let (status, _) = send(&app, "POST", "/reviews", Some(&driver), Some(review.clone())).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = send(
        &app,
        "PATCH",
        &format!("/bookings/{}/status", booking_id),
        Some(&driver),
        Some(json!({ "status": "completed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");

    let (status, _) = send(
        &app,
        "PATCH",
        &format!("/bookings/{}/status", booking_id),
        Some(&driver),
        Some(json!({ "status": "teleported" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, "POST", "/reviews", Some(&driver), Some(review.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["rating"], 4);

    let (status, _) = send(&app, "POST", "/reviews", Some(&driver), Some(review)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(
        &app,
        "GET",
        &format!("/vehicles/{}/rating", vehicle_id),
        Some(&driver),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rating"].as_f64(), Some(4.0));
    assert_eq!(body["total_reviews"], 1);

    let (status, body) = send(
        &app,
        "GET",
        &format!("/vehicles/{}/reviews", vehicle_id),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn bookings_are_private_to_their_owner() {
    let app = create_test_app();
    let admin = signup(&app, ADMIN_EMAIL).await;
    let alice = signup(&app, "alice@example.com").await;
    let bob = signup(&app, "bob@example.com").await;
    let vehicle_id = create_vehicle(&app, &admin, "Shared Car").await;

    let (_, body) = send(
        &app,
        "POST",
        "/bookings",
        Some(&alice),
        Some(json!({
            "vehicle_id": vehicle_id,
            "start_date": "2020-01-01",
            "end_date": "2020-01-03",
            "pickup_location": "Station",
            "total_price": "90.00"
        })),
    )
    .await;
    let booking_id = body["id"].as_str().unwrap().to_string();
    assert_eq!(body["timeline"], "past");

    let (_, body) = send(&app, "GET", "/bookings", Some(&bob), None).await;
    assert!(body["upcoming"].as_array().unwrap().is_empty());
    assert!(body["past"].as_array().unwrap().is_empty());

    let (status, _) = send(
        &app,
        "PATCH",
        &format!("/bookings/{}/payment", booking_id),
        Some(&bob),
        Some(json!({ "payment_status": "refunded" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        "PATCH",
        &format!("/bookings/{}/payment", booking_id),
        Some(&admin),
        Some(json!({ "payment_status": "completed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["payment_status"], "completed");

    let (_, body) = send(&app, "GET", "/bookings", Some(&admin), None).await;
    assert_eq!(body["past"].as_array().unwrap().len(), 1);

    let (status, body) = send(&app, "GET", "/admin/dashboard", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_bookings"], 1);
    assert_eq!(body["revenue"], "90.00");
    assert_eq!(body["bookings_by_status"]["pending"], 1);

    let (status, _) = send(&app, "GET", "/admin/dashboard", Some(&alice), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unavailable_vehicles_are_hidden_and_unbookable() {
    let app = create_test_app();
    let admin = signup(&app, ADMIN_EMAIL).await;
    let driver = signup(&app, "driver@example.com").await;
    let vehicle_id = create_vehicle(&app, &admin, "Seasonal Car").await;

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/vehicles/{}/availability", vehicle_id),
        Some(&admin),
        Some(json!({ "available": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["available"], false);

    let (_, body) = send(&app, "GET", "/vehicles?search=seasonal", Some(&driver), None).await;
    assert!(body.as_array().unwrap().is_empty());
    let (_, body) = send(&app, "GET", "/vehicles?search=seasonal", Some(&admin), None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, _) = send(
        &app,
        "GET",
        &format!("/vehicles/{}", vehicle_id),
        Some(&driver),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "POST",
        "/bookings",
        Some(&driver),
        Some(json!({
            "vehicle_id": vehicle_id,
            "start_date": "2099-01-01",
            "end_date": "2099-01-02",
            "pickup_location": "Porto",
            "total_price": "45.00"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn favorites_toggle() {
    let app = create_test_app();
    let admin = signup(&app, ADMIN_EMAIL).await;
    let driver = signup(&app, "driver@example.com").await;
    let vehicle_id = create_vehicle(&app, &admin, "Favorite Car").await;
    let toggle = format!("/favorites/{}/toggle", vehicle_id);

    let (status, body) = send(&app, "POST", &toggle, Some(&driver), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_favorite"], true);

    let (_, body) = send(&app, "GET", "/favorites", Some(&driver), None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["vehicle_id"], vehicle_id.as_str());

    let (_, body) = send(&app, "POST", &toggle, Some(&driver), None).await;
    assert_eq!(body["is_favorite"], false);
    let (_, body) = send(&app, "GET", "/favorites", Some(&driver), None).await;
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn users_cannot_grant_themselves_admin() {
    let app = create_test_app();
    let admin = signup(&app, ADMIN_EMAIL).await;
    let driver = signup(&app, "driver@example.com").await;

    let (status, _) = send(
        &app,
        "PATCH",
        "/profile",
        Some(&driver),
        Some(json!({ "display_name": "Dee", "is_admin": true })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = send(
        &app,
        "PATCH",
        "/profile",
        Some(&driver),
        Some(json!({ "display_name": "Dee" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["display_name"], "Dee");
    assert_eq!(body["is_admin"], false);
    let driver_id = body["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/profiles/{}/admin", driver_id),
        Some(&driver),
        Some(json!({ "is_admin": true })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/profiles/{}/admin", driver_id),
        Some(&admin),
        Some(json!({ "is_admin": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["admin_capable"], true);
}

#[tokio::test]
async fn money_beyond_two_decimals_is_a_bad_request() {
    let app = create_test_app();
    let admin = signup(&app, ADMIN_EMAIL).await;
    let driver = signup(&app, "driver@example.com").await;
    let vehicle_id = create_vehicle(&app, &admin, "Precise Car").await;

    let (status, _) = send(
        &app,
        "POST",
        "/bookings",
        Some(&driver),
        Some(json!({
            "vehicle_id": vehicle_id,
            "start_date": "2099-06-01",
            "end_date": "2099-06-05",
            "pickup_location": "Porto",
            "total_price": "180.005"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "PATCH",
        &format!("/vehicles/{}", vehicle_id),
        Some(&admin),
        Some(json!({ "price_per_day": "123456789.00" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn explicit_null_clears_the_avatar() {
    let app = create_test_app();
    let driver = signup(&app, "driver@example.com").await;

    let (_, body) = send(
        &app,
        "PATCH",
        "/profile",
        Some(&driver),
        Some(json!({ "avatar_url": "https://img/me.png" })),
    )
    .await;
    assert_eq!(body["avatar_url"], "https://img/me.png");

    let (_, body) = send(
        &app,
        "PATCH",
        "/profile",
        Some(&driver),
        Some(json!({ "display_name": "Dee" })),
    )
    .await;
    assert_eq!(body["avatar_url"], "https://img/me.png");

    let (status, body) = send(
        &app,
        "PATCH",
        "/profile",
        Some(&driver),
        Some(json!({ "avatar_url": null })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["avatar_url"].is_null());
    assert_eq!(body["display_name"], "Dee");
}
