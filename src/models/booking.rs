// src/models/booking.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use validator::Validate;

use super::money::Money;

// ==================== BOOKING ====================

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Booking {
    pub id: i64,
    pub user_id: i64,
    pub lab_id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub purpose: Option<String>,
    pub participants: i64,
    pub status: BookingStatus,
    pub cost: Money,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Booking joined with the names shown in listings and the lab's campus,
/// which the access policy scopes on.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BookingDetails {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub booking: Booking,
    pub user_name: String,
    pub lab_name: String,
    pub campus_id: i64,
}

/// Статус бронирования.
///
/// New bookings are always `pending`; there is no transition operation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
    sqlx::Type, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum BookingStatus {
    #[default]
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

/// Timestamps arrive as strings so that an unparsable value surfaces as a
/// validation error instead of a generic JSON rejection.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateBookingRequest {
    pub lab_id: i64,

    #[validate(length(min = 1, message = "start_time is required"))]
    pub start_time: String,

    #[validate(length(min = 1, message = "end_time is required"))]
    pub end_time: String,

    #[validate(length(max = 200, message = "Purpose cannot exceed 200 characters"))]
    pub purpose: Option<String>,

    #[validate(range(min = 1, max = 10000, message = "Participants must be between 1 and 10000"))]
    pub participants: Option<i64>,

    #[validate(length(max = 1000, message = "Notes cannot exceed 1000 characters"))]
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BookingFilter {
    pub user_id: Option<i64>,
    pub lab_id: Option<i64>,
    pub campus_id: Option<i64>,
    pub status: Option<BookingStatus>,
}

/// Result of the booking flow.
#[derive(Debug, Clone, Serialize)]
pub struct BookingReceipt {
    pub id: i64,
    pub cost: Money,
    pub transaction_id: i64,
    pub booking: Booking,
}
