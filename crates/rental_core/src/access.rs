//! crates/rental_core/src/access.rs
//!
//! Row-level access rules. Every decision goes through the single
//! `AdminPolicy::is_admin` capability check.

use std::collections::HashSet;

use crate::domain::{Booking, Profile, Review, Vehicle};
use crate::ports::{PortError, PortResult};

/// Decides which identities are admin-capable.
///
/// A profile is admin-capable when its `is_admin` flag is set or its email is one of
/// the designated admin emails supplied through configuration.
#[derive(Debug, Clone, Default)]
pub struct AdminPolicy {
    admin_emails: HashSet<String>,
}

impl AdminPolicy {
    pub fn new<I, S>(admin_emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            admin_emails: admin_emails
                .into_iter()
                .map(|e| e.as_ref().trim().to_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }

    pub fn is_admin(&self, identity: &Profile) -> bool {
        identity.is_admin || self.admin_emails.contains(&identity.email.to_lowercase())
    }

    pub fn require_admin(&self, identity: &Profile) -> PortResult<()> {
        if self.is_admin(identity) {
            Ok(())
        } else {
            Err(PortError::Unauthorized)
        }
    }

    pub fn can_read_profile(&self, identity: &Profile, target: &Profile) -> bool {
        identity.id == target.id || self.is_admin(identity)
    }

    /// Non-admins only see vehicles currently marked available.
    pub fn can_read_vehicle(&self, identity: &Profile, vehicle: &Vehicle) -> bool {
        vehicle.available || self.is_admin(identity)
    }

    pub fn can_read_booking(&self, identity: &Profile, booking: &Booking) -> bool {
        booking.user_id == identity.id || self.is_admin(identity)
    }

    pub fn can_update_booking(&self, identity: &Profile, booking: &Booking) -> bool {
        self.can_read_booking(identity, booking)
    }

    pub fn can_edit_review(&self, identity: &Profile, review: &Review) -> bool {
        review.user_id == identity.id
    }

    pub fn can_delete_review(&self, identity: &Profile, review: &Review) -> bool {
        review.user_id == identity.id || self.is_admin(identity)
    }
}
