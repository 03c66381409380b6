// src/ledger.rs
//! Booking pricing and the budget ledger.
//!
//! A booking, its ledger entry and the campus `budget_used` increment are
//! written in one SQLite transaction. Bookings on the same campus are
//! additionally serialized through a per-campus async mutex, so the running
//! total and the ledger never drift apart under concurrent requests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::SqlitePool;
use tokio::sync::Mutex as AsyncMutex;
use tracing::instrument;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::models::{
    BookingReceipt, CreateBookingRequest, Money, NewBudgetTransaction, TransactionType,
};
use crate::repositories::{
    BookingRepository, BudgetTransactionRepository, CampusRepository, LabRepository, NewBooking,
    Repository,
};

const MILLIS_PER_HOUR: i128 = 3_600_000;

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

// ==================== TIMESTAMPS & PRICING ====================

/// Accepts RFC 3339 with `Z` or an explicit offset, or a naive ISO-8601
/// date-time which is taken as UTC.
pub fn parse_timestamp(field: &str, value: &str) -> ApiResult<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| ApiError::invalid_timestamp(field, value))
}

/// `duration_hours * hourly_rate` in cents, rounded half-up. A cost that does
/// not fit in i64 or exceeds `Money::MAX_AMOUNT` is a ValidationError.
pub fn compute_cost(start: DateTime<Utc>, end: DateTime<Utc>, hourly_rate: Money) -> ApiResult<Money> {
    let millis = (end - start).num_milliseconds() as i128;
    let numerator = millis * hourly_rate.cents() as i128;

    let cents = if numerator >= 0 {
        (numerator + MILLIS_PER_HOUR / 2) / MILLIS_PER_HOUR
    } else {
        -((-numerator + MILLIS_PER_HOUR / 2) / MILLIS_PER_HOUR)
    };

    i64::try_from(cents)
        .ok()
        .map(Money::from_cents)
        .filter(|cost| *cost <= Money::MAX_AMOUNT)
        .ok_or_else(|| {
            ApiError::ValidationError(format!(
                "Booking cost exceeds the maximum of {}",
                Money::MAX_AMOUNT
            ))
        })
}

// ==================== CAMPUS LOCKS ====================

/// One async mutex per campus, created on first use.
#[derive(Default)]
pub struct CampusLocks {
    locks: Mutex<HashMap<i64, Arc<AsyncMutex<()>>>>,
}

impl CampusLocks {
    pub fn for_campus(&self, campus_id: i64) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(campus_id).or_default().clone()
    }
}

// ==================== ENGINE ====================

pub struct LedgerEngine {
    pool: SqlitePool,
    locks: CampusLocks,
}

impl LedgerEngine {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            locks: CampusLocks::default(),
        }
    }

    /// Prices and stores a booking for `user_id`. Every failure leaves the
    /// store untouched.
    #[instrument(name = "ledger_create_booking", skip(self, request), fields(lab_id = request.lab_id))]
    pub async fn create_booking(
        &self,
        user_id: i64,
        request: CreateBookingRequest,
    ) -> ApiResult<BookingReceipt> {
        request.validate()?;

        let start_time = parse_timestamp("start_time", &request.start_time)?;
        let end_time = parse_timestamp("end_time", &request.end_time)?;
        if end_time <= start_time {
            return Err(ApiError::ValidationError(
                "end_time must be later than start_time".to_string(),
            ));
        }

        let lab = LabRepository
            .get(&self.pool, request.lab_id)
            .await
            .map_err(|err| match err {
                ApiError::NotFound(_) => ApiError::lab_not_found(request.lab_id),
                other => other,
            })?;

        let cost = compute_cost(start_time, end_time, lab.hourly_rate)?;

        let campus_lock = self.locks.for_campus(lab.campus_id);
        let _guard = campus_lock.lock().await;

        // The first statement is a write, so the transaction takes SQLite's
        // write lock up front instead of upgrading from a read.
        let mut tx = self.pool.begin().await?;

        let booking = BookingRepository
            .create(
                &mut *tx,
                NewBooking {
                    user_id,
                    lab_id: lab.id,
                    start_time,
                    end_time,
                    purpose: request.purpose,
                    participants: request.participants.unwrap_or(1),
                    cost,
                    notes: request.notes,
                },
            )
            .await?;

        let transaction = BudgetTransactionRepository
            .create(
                &mut *tx,
                NewBudgetTransaction {
                    campus_id: lab.campus_id,
                    booking_id: Some(booking.id),
                    transaction_type: TransactionType::Booking,
                    amount: cost,
                    description: Some(format!("Lab booking: {}", lab.name)),
                },
            )
            .await?;

        CampusRepository
            .add_to_budget_used(&mut *tx, lab.campus_id, cost)
            .await?;

        tx.commit().await?;

        log::info!(
            "Booking {} created by user {} for lab '{}' ({} - {}), cost {}",
            booking.id, user_id, lab.name, start_time, end_time, cost
        );

        if let Ok(campus) = CampusRepository.get(&self.pool, lab.campus_id).await {
            if campus.budget_remaining().is_negative() {
                log::warn!(
                    "Campus {} is over budget: used {} of {}",
                    campus.id, campus.budget_used, campus.budget_allocated
                );
            }
        }

        Ok(BookingReceipt {
            id: booking.id,
            cost,
            transaction_id: transaction.id,
            booking,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::UserRole;
    use crate::db::test_support::{file_pool, memory_pool};
    use crate::models::{BookingStatus, TransactionFilter};
    use crate::repositories::fixtures;
    use chrono::TimeZone;

    fn request(lab_id: i64, start: &str, end: &str) -> CreateBookingRequest {
        CreateBookingRequest {
            lab_id,
            start_time: start.to_string(),
            end_time: end.to_string(),
            purpose: Some("Intro to C".to_string()),
            participants: Some(12),
            notes: None,
        }
    }

    async fn ledger_state(pool: &SqlitePool, campus_id: i64) -> (i64, i64, Money) {
        let bookings = BookingRepository.count(pool).await.unwrap();
        let transactions = BudgetTransactionRepository.count(pool).await.unwrap();
        let used = CampusRepository.get(pool, campus_id).await.unwrap().budget_used;
        (bookings, transactions, used)
    }

    #[test]
    fn test_parse_timestamp_forms() {
        let expected = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();

        assert_eq!(parse_timestamp("start_time", "2025-03-01T09:00:00Z").unwrap(), expected);
        assert_eq!(parse_timestamp("start_time", "2025-03-01T11:00:00+02:00").unwrap(), expected);
        assert_eq!(parse_timestamp("start_time", "2025-03-01T09:00:00").unwrap(), expected);
        assert_eq!(parse_timestamp("start_time", "2025-03-01T09:00").unwrap(), expected);
        assert_eq!(parse_timestamp("start_time", "2025-03-01T09:00:00.000Z").unwrap(), expected);

        for bad in ["", "tomorrow", "2025-13-01T09:00:00Z", "09:00"] {
            assert!(matches!(
                parse_timestamp("start_time", bad),
                Err(ApiError::ValidationError(_))
            ));
        }
    }

    #[test]
    fn test_compute_cost() {
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();

        let two_hours = start + chrono::Duration::hours(2);
        assert_eq!(compute_cost(start, two_hours, Money::from_major(25.0)).unwrap(), Money::from_major(50.0));

        let ninety_minutes = start + chrono::Duration::minutes(90);
        assert_eq!(compute_cost(start, ninety_minutes, Money::from_major(35.0)).unwrap(), Money::from_major(52.5));

        // half a cent rounds up
        let one_minute = start + chrono::Duration::minutes(1);
        assert_eq!(compute_cost(start, one_minute, Money::from_cents(30)).unwrap(), Money::from_cents(1));
        assert_eq!(compute_cost(start, one_minute, Money::from_cents(29)).unwrap(), Money::ZERO);

        assert_eq!(compute_cost(start, two_hours, Money::ZERO).unwrap(), Money::ZERO);

        // 1e19 cents does not fit in i64
        assert!(matches!(
            compute_cost(start, two_hours, Money::from_major(5.0e16)),
            Err(ApiError::ValidationError(_))
        ));
        // fits in i64 but is above the maximum amount
        let one_year = start + chrono::Duration::days(365);
        assert!(matches!(
            compute_cost(start, one_year, Money::MAX_AMOUNT),
            Err(ApiError::ValidationError(_))
        ));
    }

    #[actix_rt::test]
    async fn test_oversized_cost_rejected_without_writes() {
        let pool = memory_pool().await;
        let campus = fixtures::campus(&pool, "Main Campus", 1000.0).await;
        // stored directly, bypassing request validation
        let lab = fixtures::lab(&pool, campus, "Gold Plated Lab", 5.0e16).await;
        let user = fixtures::user(&pool, "student1", UserRole::User, Some(campus)).await;

        let engine = LedgerEngine::new(pool.clone());
        let result = engine
            .create_booking(user, request(lab.id, "2025-03-01T09:00:00Z", "2025-03-01T11:00:00Z"))
            .await;

        assert!(matches!(result, Err(ApiError::ValidationError(_))));
        assert_eq!(ledger_state(&pool, campus).await, (0, 0, Money::ZERO));
    }

    #[test]
    fn test_campus_locks_are_shared_per_campus() {
        let locks = CampusLocks::default();
        assert!(Arc::ptr_eq(&locks.for_campus(1), &locks.for_campus(1)));
        assert!(!Arc::ptr_eq(&locks.for_campus(1), &locks.for_campus(2)));
    }

    #[actix_rt::test]
    async fn test_two_hour_booking_charges_campus() {
        let pool = memory_pool().await;
        let campus = fixtures::campus(&pool, "Main Campus", 100000.0).await;
        let lab = fixtures::lab(&pool, campus, "Computer Lab A", 25.0).await;
        let user = fixtures::user(&pool, "student1", UserRole::User, Some(campus)).await;

        let engine = LedgerEngine::new(pool.clone());
        let receipt = engine
            .create_booking(user, request(lab.id, "2025-03-01T09:00:00Z", "2025-03-01T11:00:00Z"))
            .await
            .unwrap();

        assert_eq!(receipt.cost, Money::from_major(50.0));
        assert_eq!(receipt.booking.status, BookingStatus::Pending);
        assert_eq!(receipt.booking.participants, 12);

        let campus_row = CampusRepository.get(&pool, campus).await.unwrap();
        assert_eq!(campus_row.budget_used, Money::from_major(50.0));
        assert_eq!(campus_row.budget_remaining(), Money::from_major(99950.0));

        let entries = BudgetTransactionRepository
            .list(&pool, &TransactionFilter::default())
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        let entry = &entries[0].transaction;
        assert_eq!(entry.id, receipt.transaction_id);
        assert_eq!(entry.transaction_type, TransactionType::Booking);
        assert_eq!(entry.amount, Money::from_major(50.0));
        assert_eq!(entry.booking_id, Some(receipt.id));
        assert_eq!(entry.campus_id, campus);
        assert_eq!(entry.description.as_deref(), Some("Lab booking: Computer Lab A"));
    }

    #[actix_rt::test]
    async fn test_failures_leave_no_side_effects() {
        let pool = memory_pool().await;
        let campus = fixtures::campus(&pool, "Main Campus", 1000.0).await;
        let lab = fixtures::lab(&pool, campus, "Computer Lab A", 25.0).await;
        let user = fixtures::user(&pool, "student1", UserRole::User, Some(campus)).await;
        let engine = LedgerEngine::new(pool.clone());

        let unknown_lab = engine
            .create_booking(user, request(lab.id + 100, "2025-03-01T09:00:00Z", "2025-03-01T11:00:00Z"))
            .await;
        assert!(matches!(unknown_lab, Err(ApiError::NotFound(_))));

        let malformed = engine
            .create_booking(user, request(lab.id, "next monday", "2025-03-01T11:00:00Z"))
            .await;
        assert!(matches!(malformed, Err(ApiError::ValidationError(_))));

        let reversed = engine
            .create_booking(user, request(lab.id, "2025-03-01T11:00:00Z", "2025-03-01T09:00:00Z"))
            .await;
        assert!(matches!(reversed, Err(ApiError::ValidationError(_))));

        let empty = engine
            .create_booking(user, request(lab.id, "2025-03-01T09:00:00Z", "2025-03-01T09:00:00Z"))
            .await;
        assert!(matches!(empty, Err(ApiError::ValidationError(_))));

        // unknown user fails inside the transaction and is rolled back
        let ghost = engine
            .create_booking(9999, request(lab.id, "2025-03-01T09:00:00Z", "2025-03-01T11:00:00Z"))
            .await;
        assert!(matches!(ghost, Err(ApiError::ReferenceError(_))));

        assert_eq!(ledger_state(&pool, campus).await, (0, 0, Money::ZERO));
    }

    #[actix_rt::test]
    async fn test_concurrent_bookings_keep_ledger_consistent() {
        let dir = tempfile::tempdir().unwrap();
        let pool = file_pool(&dir, 4).await;
        let main = fixtures::campus(&pool, "Main Campus", 1000.0).await;
        let north = fixtures::campus(&pool, "North Campus", 1000.0).await;
        let chemistry = fixtures::lab(&pool, main, "Chemistry Lab", 35.0).await;
        let physics = fixtures::lab(&pool, north, "Physics Lab", 30.0).await;
        let user = fixtures::user(&pool, "student1", UserRole::User, Some(main)).await;

        let engine = LedgerEngine::new(pool.clone());
        let bookings = (0..12).map(|i| {
            let lab_id = if i % 3 == 0 { physics.id } else { chemistry.id };
            let end = format!("2025-03-01T09:{:02}:00Z", 10 + i * 3);
            engine.create_booking(user, request(lab_id, "2025-03-01T09:00:00Z", &end))
        });
        let receipts: Vec<BookingReceipt> = futures::future::join_all(bookings)
            .await
            .into_iter()
            .collect::<ApiResult<_>>()
            .unwrap();
        assert_eq!(receipts.len(), 12);

        for (campus_id, lab_id) in [(main, chemistry.id), (north, physics.id)] {
            let expected: Money = receipts
                .iter()
                .filter(|r| r.booking.lab_id == lab_id)
                .map(|r| r.cost)
                .sum();
            let campus = CampusRepository.get(&pool, campus_id).await.unwrap();
            assert_eq!(campus.budget_used, expected);
            assert_eq!(
                BudgetTransactionRepository.sum_for_campus(&pool, campus_id).await.unwrap(),
                expected
            );
        }

        assert_eq!(BudgetTransactionRepository.count(&pool).await.unwrap(), 12);
    }
}
