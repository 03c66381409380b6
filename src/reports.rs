// src/reports.rs
//! Read-only aggregates: campus budgets, the dashboard and ledger history.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::error::{ApiError, ApiResult};
use crate::models::{BookingStatus, BudgetSummary, Money, TransactionDetails, TransactionFilter};
use crate::repositories::{
    BookingRepository, BudgetTransactionRepository, CampusRepository, InventoryRepository,
    LabRepository, Repository,
};

const RECENT_BOOKINGS_LIMIT: i64 = 5;

// ==================== DASHBOARD ====================

#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub total_campuses: i64,
    pub total_labs: i64,
    pub total_bookings: i64,
    pub total_inventory_items: i64,
}

#[derive(Debug, Serialize)]
pub struct RecentBooking {
    pub id: i64,
    pub lab_name: String,
    pub user_name: String,
    pub start_time: DateTime<Utc>,
    pub status: BookingStatus,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct BudgetOverview {
    pub total_allocated: Money,
    pub total_used: Money,
    pub remaining: Money,
}

#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub statistics: DashboardStats,
    pub recent_bookings: Vec<RecentBooking>,
    pub budget_summary: BudgetOverview,
}

pub async fn dashboard(pool: &SqlitePool) -> ApiResult<Dashboard> {
    let statistics = DashboardStats {
        total_campuses: CampusRepository.count(pool).await?,
        total_labs: LabRepository.count(pool).await?,
        total_bookings: BookingRepository.count(pool).await?,
        total_inventory_items: InventoryRepository.count(pool).await?,
    };

    let recent_bookings = BookingRepository
        .recent(pool, RECENT_BOOKINGS_LIMIT)
        .await?
        .into_iter()
        .map(|details| RecentBooking {
            id: details.booking.id,
            lab_name: details.lab_name,
            user_name: details.user_name,
            start_time: details.booking.start_time,
            status: details.booking.status,
        })
        .collect();

    let (total_allocated, total_used): (Money, Money) = sqlx::query_as(
        "SELECT COALESCE(SUM(budget_allocated), 0), COALESCE(SUM(budget_used), 0) FROM campuses",
    )
    .fetch_one(pool)
    .await?;

    Ok(Dashboard {
        statistics,
        recent_bookings,
        budget_summary: BudgetOverview {
            total_allocated,
            total_used,
            remaining: total_allocated - total_used,
        },
    })
}

// ==================== BUDGET ====================

pub async fn campus_budget(pool: &SqlitePool, campus_id: i64) -> ApiResult<BudgetSummary> {
    let campus = CampusRepository.get(pool, campus_id).await.map_err(|err| match err {
        ApiError::NotFound(_) => ApiError::campus_not_found(campus_id),
        other => other,
    })?;
    Ok(BudgetSummary::from(&campus))
}

pub async fn all_budgets(pool: &SqlitePool) -> ApiResult<Vec<BudgetSummary>> {
    let campuses = CampusRepository.list(pool, &()).await?;
    Ok(campuses.iter().map(|overview| BudgetSummary::from(&overview.campus)).collect())
}

/// Ledger entries, newest first.
pub async fn transaction_history(
    pool: &SqlitePool,
    campus_id: Option<i64>,
) -> ApiResult<Vec<TransactionDetails>> {
    let filter = TransactionFilter { campus_id, transaction_type: None };
    let mut transactions = BudgetTransactionRepository.list(pool, &filter).await?;

    transactions.sort_by(|a, b| {
        b.transaction.transaction_date
            .cmp(&a.transaction.transaction_date)
            .then(b.transaction.id.cmp(&a.transaction.id))
    });

    Ok(transactions)
}

pub fn transactions_csv(transactions: &[TransactionDetails]) -> ApiResult<Vec<u8>> {
    let mut csv_data = Vec::new();
    {
        let mut writer = csv::Writer::from_writer(&mut csv_data);

        writer.write_record([
            "ID", "Date", "Campus", "Type", "Amount", "Booking ID", "Description",
        ]).map_err(|e| ApiError::InternalServerError(e.to_string()))?;

        for details in transactions {
            let transaction = &details.transaction;
            writer.write_record([
                transaction.id.to_string(),
                transaction.transaction_date.to_rfc3339(),
                details.campus_name.clone(),
                transaction.transaction_type.to_string(),
                transaction.amount.to_string(),
                transaction.booking_id.map(|id| id.to_string()).unwrap_or_default(),
                transaction.description.clone().unwrap_or_default(),
            ]).map_err(|e| ApiError::InternalServerError(e.to_string()))?;
        }

        writer.flush().map_err(|e| ApiError::InternalServerError(e.to_string()))?;
    }

    Ok(csv_data)
}
