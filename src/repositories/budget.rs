// src/repositories/budget.rs
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};

use super::{filtered_select, require_reference, CampusRepository, Repository};
use crate::error::ApiResult;
use crate::models::{BudgetTransaction, NewBudgetTransaction, TransactionDetails, TransactionFilter};

const DETAILS_SELECT: &str = r#"
    SELECT t.*, c.name AS campus_name
    FROM budget_transactions t
    JOIN campuses c ON c.id = t.campus_id"#;

/// Append-only: there is no update or delete.
pub struct BudgetTransactionRepository;

#[async_trait]
impl Repository for BudgetTransactionRepository {
    type Entity = BudgetTransaction;
    type Listed = TransactionDetails;
    type Create = NewBudgetTransaction;
    type Filter = TransactionFilter;

    fn table_name(&self) -> &'static str {
        "budget_transactions"
    }

    fn entity_name(&self) -> &'static str {
        "Transaction"
    }

    async fn create(
        &self,
        conn: &mut SqliteConnection,
        data: NewBudgetTransaction,
    ) -> ApiResult<BudgetTransaction> {
        require_reference(&CampusRepository, &mut *conn, data.campus_id).await?;

        let transaction = sqlx::query_as::<_, BudgetTransaction>(
            r#"INSERT INTO budget_transactions
               (campus_id, booking_id, transaction_type, amount, description, transaction_date)
               VALUES (?, ?, ?, ?, ?, ?)
               RETURNING *"#,
        )
        .bind(data.campus_id)
        .bind(data.booking_id)
        .bind(data.transaction_type)
        .bind(data.amount)
        .bind(&data.description)
        .bind(Utc::now())
        .fetch_one(&mut *conn)
        .await?;

        Ok(transaction)
    }

    async fn list(
        &self,
        pool: &SqlitePool,
        filter: &TransactionFilter,
    ) -> ApiResult<Vec<TransactionDetails>> {
        let mut builder = filtered_select(DETAILS_SELECT);

        if let Some(campus_id) = filter.campus_id {
            builder.push(" AND t.campus_id = ").push_bind(campus_id);
        }
        if let Some(transaction_type) = filter.transaction_type {
            builder.push(" AND t.transaction_type = ").push_bind(transaction_type);
        }
        builder.push(" ORDER BY t.id");

        let transactions = builder
            .build_query_as::<TransactionDetails>()
            .fetch_all(pool)
            .await?;
        Ok(transactions)
    }
}

impl BudgetTransactionRepository {
    /// Sum of all ledger amounts for one campus, zero when it has none.
    #[cfg(test)]
    pub async fn sum_for_campus(&self, pool: &SqlitePool, campus_id: i64) -> ApiResult<crate::models::Money> {
        let total = sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount), 0) FROM budget_transactions WHERE campus_id = ?",
        )
        .bind(campus_id)
        .fetch_one(pool)
        .await?;
        Ok(total)
    }
}
