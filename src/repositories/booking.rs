// src/repositories/booking.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};

use super::{filtered_select, Repository};
use crate::error::{ApiError, ApiResult};
use crate::models::{Booking, BookingDetails, BookingFilter, BookingStatus, Money};

const DETAILS_SELECT: &str = r#"
    SELECT b.*, u.username AS user_name, l.name AS lab_name, l.campus_id AS campus_id
    FROM bookings b
    JOIN users u ON u.id = b.user_id
    JOIN labs l ON l.id = b.lab_id"#;

/// A priced booking ready to be stored. Only the ledger engine builds these.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub user_id: i64,
    pub lab_id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub purpose: Option<String>,
    pub participants: i64,
    pub cost: Money,
    pub notes: Option<String>,
}

pub struct BookingRepository;

#[async_trait]
impl Repository for BookingRepository {
    type Entity = Booking;
    type Listed = BookingDetails;
    type Create = NewBooking;
    type Filter = BookingFilter;

    fn table_name(&self) -> &'static str {
        "bookings"
    }

    fn entity_name(&self) -> &'static str {
        "Booking"
    }

    async fn create(&self, conn: &mut SqliteConnection, data: NewBooking) -> ApiResult<Booking> {
        let booking = sqlx::query_as::<_, Booking>(
            r#"INSERT INTO bookings
               (user_id, lab_id, start_time, end_time, purpose, participants, status, cost, notes, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
               RETURNING *"#,
        )
        .bind(data.user_id)
        .bind(data.lab_id)
        .bind(data.start_time)
        .bind(data.end_time)
        .bind(&data.purpose)
        .bind(data.participants)
        .bind(BookingStatus::Pending)
        .bind(data.cost)
        .bind(&data.notes)
        .bind(Utc::now())
        .fetch_one(&mut *conn)
        .await?;

        Ok(booking)
    }

    async fn list(&self, pool: &SqlitePool, filter: &BookingFilter) -> ApiResult<Vec<BookingDetails>> {
        let mut builder = filtered_select(DETAILS_SELECT);

        if let Some(user_id) = filter.user_id {
            builder.push(" AND b.user_id = ").push_bind(user_id);
        }
        if let Some(lab_id) = filter.lab_id {
            builder.push(" AND b.lab_id = ").push_bind(lab_id);
        }
        if let Some(campus_id) = filter.campus_id {
            builder.push(" AND l.campus_id = ").push_bind(campus_id);
        }
        if let Some(status) = filter.status {
            builder.push(" AND b.status = ").push_bind(status);
        }
        builder.push(" ORDER BY b.id");

        let bookings = builder.build_query_as::<BookingDetails>().fetch_all(pool).await?;
        Ok(bookings)
    }
}

impl BookingRepository {
    pub async fn get_details(&self, pool: &SqlitePool, id: i64) -> ApiResult<BookingDetails> {
        let query = format!("{} WHERE b.id = ?", DETAILS_SELECT);
        sqlx::query_as::<_, BookingDetails>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| ApiError::booking_not_found(id))
    }

    /// Most recently created first; ties broken by id.
    pub async fn recent(&self, pool: &SqlitePool, limit: i64) -> ApiResult<Vec<BookingDetails>> {
        let query = format!("{} ORDER BY b.created_at DESC, b.id DESC LIMIT ?", DETAILS_SELECT);
        let bookings = sqlx::query_as::<_, BookingDetails>(&query)
            .bind(limit)
            .fetch_all(pool)
            .await?;
        Ok(bookings)
    }

    #[cfg(test)]
    pub async fn sum_cost(&self, pool: &SqlitePool) -> ApiResult<Money> {
        let total: Money = sqlx::query_scalar("SELECT COALESCE(SUM(cost), 0) FROM bookings")
            .fetch_one(pool)
            .await?;
        Ok(total)
    }
}
