pub mod access;
pub mod domain;
pub mod filter;
pub mod memory;
pub mod ports;
pub mod rules;
pub mod service;

pub use access::AdminPolicy;
pub use domain::{
    AuthSession, Booking, BookingStatus, BookingTimeline, DashboardStats, Favorite, NewBooking,
    NewReview, NewVehicle, PaymentStatus, Profile, ProfileUpdate, Review, TripDetails,
    UserCredentials, Vehicle, VehicleRating, VehicleUpdate,
};
pub use filter::VehicleFilter;
pub use memory::InMemoryStore;
pub use ports::{DatabaseService, PortError, PortResult};
pub use service::{BookingRequest, RentalService};
