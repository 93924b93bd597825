pub mod admin;
pub mod auth;
pub mod bookings;
pub mod favorites;
pub mod middleware;
pub mod profiles;
pub mod rest;
pub mod reviews;
pub mod routes;
pub mod state;
pub mod vehicles;

pub use routes::build_router;
