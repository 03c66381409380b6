// src/policy.rs
//! Role-based visibility of labs, bookings and users.
//!
//! Everything here is a pure function of the caller's claims; handlers list
//! or fetch first and then narrow the result through a [`Scope`].

use crate::auth::{Claims, UserRole};
use crate::error::{ApiError, ApiResult};
use crate::models::{BookingDetails, LabDetails};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Admins, and managers without a campus binding.
    All,
    /// Manager bound to a campus.
    Campus(i64),
    /// Regular user; only their own bookings.
    Own { user_id: i64 },
}

impl Scope {
    pub fn new(role: UserRole, campus_id: Option<i64>, user_id: i64) -> Self {
        match (role, campus_id) {
            (UserRole::Admin, _) => Scope::All,
            (UserRole::Manager, Some(campus_id)) => Scope::Campus(campus_id),
            (UserRole::Manager, None) => Scope::All,
            (UserRole::User, _) => Scope::Own { user_id },
        }
    }

    pub fn from_claims(claims: &Claims) -> Self {
        Self::new(claims.role, claims.campus_id, claims.sub)
    }

    pub fn can_see_booking(&self, booking: &BookingDetails) -> bool {
        match *self {
            Scope::All => true,
            Scope::Campus(campus_id) => booking.campus_id == campus_id,
            Scope::Own { user_id } => booking.booking.user_id == user_id,
        }
    }

    /// Users see every lab; campus managers only their own campus.
    pub fn can_see_lab(&self, lab: &LabDetails) -> bool {
        match *self {
            Scope::Campus(campus_id) => lab.lab.campus_id == campus_id,
            Scope::All | Scope::Own { .. } => true,
        }
    }

    pub fn filter_bookings(&self, bookings: Vec<BookingDetails>) -> Vec<BookingDetails> {
        bookings.into_iter().filter(|b| self.can_see_booking(b)).collect()
    }

    pub fn filter_labs(&self, labs: Vec<LabDetails>) -> Vec<LabDetails> {
        labs.into_iter().filter(|l| self.can_see_lab(l)).collect()
    }

    /// Out-of-scope records are reported as missing, not forbidden.
    pub fn require_booking(&self, booking: BookingDetails) -> ApiResult<BookingDetails> {
        if self.can_see_booking(&booking) {
            Ok(booking)
        } else {
            Err(ApiError::booking_not_found(booking.booking.id))
        }
    }

    pub fn require_lab(&self, lab: LabDetails) -> ApiResult<LabDetails> {
        if self.can_see_lab(&lab) {
            Ok(lab)
        } else {
            Err(ApiError::lab_not_found(lab.lab.id))
        }
    }
}

/// Campus restriction for the user directory: `None` means every user.
pub fn user_directory_scope(claims: &Claims) -> ApiResult<Option<i64>> {
    if !claims.role.can_view_users() {
        return Err(ApiError::Forbidden("Insufficient permissions".to_string()));
    }
    match claims.role {
        UserRole::Manager => Ok(claims.campus_id),
        _ => Ok(None),
    }
}

/// Whether the caller may create labs or inventory on `campus_id`.
pub fn can_manage_campus(claims: &Claims, campus_id: i64) -> bool {
    match claims.role {
        UserRole::Admin => true,
        UserRole::Manager => claims.campus_id.map_or(true, |own| own == campus_id),
        UserRole::User => false,
    }
}
