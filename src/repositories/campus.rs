// src/repositories/campus.rs
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};

use super::Repository;
use crate::error::{ApiError, ApiResult};
use crate::models::{Campus, CampusOverview, CreateCampusRequest, Money};

const OVERVIEW_SELECT: &str = r#"
    SELECT c.*,
           (SELECT COUNT(*) FROM labs l WHERE l.campus_id = c.id) AS labs_count
    FROM campuses c"#;

pub struct CampusRepository;

#[async_trait]
impl Repository for CampusRepository {
    type Entity = Campus;
    type Listed = CampusOverview;
    type Create = CreateCampusRequest;
    type Filter = ();

    fn table_name(&self) -> &'static str {
        "campuses"
    }

    fn entity_name(&self) -> &'static str {
        "Campus"
    }

    async fn create(&self, conn: &mut SqliteConnection, data: CreateCampusRequest) -> ApiResult<Campus> {
        let campus = sqlx::query_as::<_, Campus>(
            r#"INSERT INTO campuses
               (name, location, contact_email, contact_phone, budget_allocated, budget_used, created_at)
               VALUES (?, ?, ?, ?, ?, 0, ?)
               RETURNING *"#,
        )
        .bind(&data.name)
        .bind(&data.location)
        .bind(&data.contact_email)
        .bind(&data.contact_phone)
        .bind(data.budget_allocated.unwrap_or(Money::ZERO))
        .bind(Utc::now())
        .fetch_one(&mut *conn)
        .await?;

        Ok(campus)
    }

    async fn list(&self, pool: &SqlitePool, _filter: &()) -> ApiResult<Vec<CampusOverview>> {
        let query = format!("{} ORDER BY c.id", OVERVIEW_SELECT);
        let campuses: Vec<CampusOverview> = sqlx::query_as(&query).fetch_all(pool).await?;

        Ok(campuses.into_iter().map(CampusOverview::with_remaining).collect())
    }
}

impl CampusRepository {
    pub async fn get_overview(&self, pool: &SqlitePool, id: i64) -> ApiResult<CampusOverview> {
        let query = format!("{} WHERE c.id = ?", OVERVIEW_SELECT);
        let campus: Option<CampusOverview> = sqlx::query_as(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;

        campus
            .map(CampusOverview::with_remaining)
            .ok_or_else(|| ApiError::campus_not_found(id))
    }

    /// Atomic in-place increment, so concurrent writers cannot lose updates.
    pub async fn add_to_budget_used(
        &self,
        conn: &mut SqliteConnection,
        campus_id: i64,
        amount: Money,
    ) -> ApiResult<()> {
        let result = sqlx::query("UPDATE campuses SET budget_used = budget_used + ? WHERE id = ?")
            .bind(amount)
            .bind(campus_id)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::campus_not_found(campus_id));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::memory_pool;
    use crate::repositories::fixtures;

    #[actix_rt::test]
    async fn test_create_and_get() {
        let pool = memory_pool().await;
        let id = fixtures::campus(&pool, "Main Campus", 100000.0).await;

        let campus = CampusRepository.get(&pool, id).await.unwrap();
        assert_eq!(campus.name, "Main Campus");
        assert_eq!(campus.budget_allocated, Money::from_major(100000.0));
        assert_eq!(campus.budget_used, Money::ZERO);

        assert!(matches!(CampusRepository.get(&pool, id + 1).await, Err(ApiError::NotFound(_))));
    }

    #[actix_rt::test]
    async fn test_list_counts_labs_and_derives_remaining() {
        let pool = memory_pool().await;
        let main = fixtures::campus(&pool, "Main Campus", 100.0).await;
        let north = fixtures::campus(&pool, "North Campus", 50.0).await;
        fixtures::lab(&pool, main, "Computer Lab A", 25.0).await;
        fixtures::lab(&pool, main, "Chemistry Lab", 35.0).await;

        let mut conn = pool.acquire().await.unwrap();
        CampusRepository
            .add_to_budget_used(&mut conn, north, Money::from_major(20.0))
            .await
            .unwrap();
        drop(conn);

        let campuses = CampusRepository.list(&pool, &()).await.unwrap();
        assert_eq!(campuses.len(), 2);
        assert_eq!(campuses[0].campus.id, main);
        assert_eq!(campuses[0].labs_count, 2);
        assert_eq!(campuses[1].labs_count, 0);
        assert_eq!(campuses[1].budget_remaining, Money::from_major(30.0));
    }

    #[actix_rt::test]
    async fn test_increment_unknown_campus() {
        let pool = memory_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let result = CampusRepository
            .add_to_budget_used(&mut conn, 77, Money::from_cents(100))
            .await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }
}
