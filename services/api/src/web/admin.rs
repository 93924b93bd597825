//! services/api/src/web/admin.rs

use axum::{extract::State, Extension, Json};
use rental_core::Profile;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::web::rest::{port_error, HandlerError};
use crate::web::state::AppState;

#[derive(Serialize, ToSchema)]
pub struct DashboardResponse {
    pub total_vehicles: usize,
    pub available_vehicles: usize,
    pub total_bookings: usize,
    pub bookings_by_status: BTreeMap<String, usize>,
    /// Sum of booking prices whose payment completed.
    pub revenue: Decimal,
}

#[utoipa::path(
    get,
    path = "/admin/dashboard",
    responses(
        (status = 200, description = "Fleet and booking totals", body = DashboardResponse),
        (status = 403, description = "Caller is not an admin")
    )
)]
pub async fn dashboard_handler(
    State(state): State<Arc<AppState>>,
    Extension(requester): Extension<Profile>,
) -> Result<Json<DashboardResponse>, HandlerError> {
    let stats = state
        .service
        .dashboard(&requester)
        .await
        .map_err(port_error)?;
    Ok(Json(DashboardResponse {
        total_vehicles: stats.total_vehicles,
        available_vehicles: stats.available_vehicles,
        total_bookings: stats.total_bookings,
        bookings_by_status: stats
            .bookings_by_status
            .into_iter()
            .map(|(status, count)| (status.to_string(), count))
            .collect(),
        revenue: stats.revenue,
    }))
}
