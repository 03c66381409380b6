// src/models/budget.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use super::campus::Campus;
use super::money::Money;

// ==================== BUDGET LEDGER ====================

/// Immutable ledger entry. Booking entries are positive and mirror an
/// increase of the campus `budget_used`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BudgetTransaction {
    pub id: i64,
    pub campus_id: i64,
    pub booking_id: Option<i64>,
    pub transaction_type: TransactionType,
    pub amount: Money,
    pub description: Option<String>,
    pub transaction_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TransactionDetails {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub transaction: BudgetTransaction,
    pub campus_name: String,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize,
    sqlx::Type, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TransactionType {
    Booking,
    Maintenance,
    Purchase,
    Allocation,
}

/// New ledger entry; id and timestamp are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewBudgetTransaction {
    pub campus_id: i64,
    pub booking_id: Option<i64>,
    pub transaction_type: TransactionType,
    pub amount: Money,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TransactionFilter {
    pub campus_id: Option<i64>,
    pub transaction_type: Option<TransactionType>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BudgetSummary {
    pub campus_id: i64,
    pub campus_name: String,
    pub budget_allocated: Money,
    pub budget_used: Money,
    pub budget_remaining: Money,
}

impl From<&Campus> for BudgetSummary {
    fn from(campus: &Campus) -> Self {
        Self {
            campus_id: campus.id,
            campus_name: campus.name.clone(),
            budget_allocated: campus.budget_allocated,
            budget_used: campus.budget_used,
            budget_remaining: campus.budget_remaining(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CampusQuery {
    pub campus_id: Option<i64>,
}
