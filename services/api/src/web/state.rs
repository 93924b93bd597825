//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use rental_core::{AdminPolicy, DatabaseService, RentalService};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Used directly only by the auth endpoints; everything else goes through `service`.
    pub db: Arc<dyn DatabaseService>,
    pub service: RentalService,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: Arc<dyn DatabaseService>, config: Arc<Config>) -> Self {
        let policy = AdminPolicy::new(&config.admin_emails);
        Self {
            service: RentalService::new(db.clone(), policy),
            db,
            config,
        }
    }
}
