//! services/api/src/web/routes.rs
//!
//! Assembles the HTTP router: public auth routes plus the session-protected API.

use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use axum::{
    middleware as axum_middleware,
    routing::{get, patch, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::error::ApiError;
use crate::web::{
    admin, auth, bookings, favorites, middleware::require_auth, profiles, reviews,
    state::AppState, vehicles,
};

pub fn build_router(app_state: Arc<AppState>) -> Result<Router, ApiError> {
    let origin = app_state
        .config
        .cors_origin
        .parse::<HeaderValue>()
        .map_err(|e| ApiError::Internal(format!("Invalid CORS origin: {}", e)))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/signup", post(auth::signup_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/logout", post(auth::logout_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route(
            "/profile",
            get(profiles::get_own_profile_handler).patch(profiles::update_own_profile_handler),
        )
        .route("/profiles/{id}", get(profiles::get_profile_handler))
        .route("/profiles/{id}/admin", put(profiles::set_admin_handler))
        .route(
            "/vehicles",
            get(vehicles::list_vehicles_handler).post(vehicles::create_vehicle_handler),
        )
        .route(
            "/vehicles/{id}",
            get(vehicles::get_vehicle_handler)
                .patch(vehicles::update_vehicle_handler)
                .delete(vehicles::delete_vehicle_handler),
        )
        .route(
            "/vehicles/{id}/availability",
            put(vehicles::set_availability_handler),
        )
        .route("/vehicles/{id}/rating", get(vehicles::vehicle_rating_handler))
        .route("/vehicles/{id}/reviews", get(reviews::list_reviews_handler))
        .route(
            "/bookings",
            get(bookings::list_bookings_handler).post(bookings::create_booking_handler),
        )
        .route("/bookings/{id}/status", patch(bookings::update_status_handler))
        .route("/bookings/{id}/payment", patch(bookings::update_payment_handler))
        .route("/bookings/{id}/trip", patch(bookings::record_trip_handler))
        .route("/reviews", post(reviews::submit_review_handler))
        .route(
            "/reviews/{id}",
            patch(reviews::update_review_handler).delete(reviews::delete_review_handler),
        )
        .route("/favorites", get(favorites::list_favorites_handler))
        .route(
            "/favorites/{vehicle_id}/toggle",
            post(favorites::toggle_favorite_handler),
        )
        .route("/admin/dashboard", get(admin::dashboard_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    Ok(Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors)
        .with_state(app_state))
}
