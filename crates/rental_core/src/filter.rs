//! crates/rental_core/src/filter.rs
//!
//! Search and filtering over the vehicle catalogue.

use rust_decimal::Decimal;

use crate::domain::Vehicle;

#[derive(Debug, Clone, Default)]
pub struct VehicleFilter {
    /// Case-insensitive substring matched against name, brand, model and location.
    pub search: Option<String>,
    pub vehicle_type: Option<String>,
    pub max_price_per_day: Option<Decimal>,
    pub min_seats: Option<i32>,
}

impl VehicleFilter {
    pub fn matches(&self, vehicle: &Vehicle) -> bool {
        if let Some(needle) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let needle = needle.to_lowercase();
            let hit = [
                &vehicle.name,
                &vehicle.brand,
                &vehicle.model,
                &vehicle.location,
            ]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        if let Some(kind) = &self.vehicle_type {
            if !vehicle.vehicle_type.eq_ignore_ascii_case(kind.trim()) {
                return false;
            }
        }
        if matches!(self.max_price_per_day, Some(max) if vehicle.price_per_day > max) {
            return false;
        }
        if matches!(self.min_seats, Some(min) if vehicle.seats < min) {
            return false;
        }
        true
    }

    /// Keeps matching vehicles, ordered by name ignoring case.
    pub fn apply(&self, vehicles: Vec<Vehicle>) -> Vec<Vehicle> {
        let mut out: Vec<Vehicle> = vehicles.into_iter().filter(|v| self.matches(v)).collect();
        out.sort_by_cached_key(|v| v.name.to_lowercase());
        out
    }
}
