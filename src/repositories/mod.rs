// src/repositories/mod.rs
//! Keyed storage for every entity: create, get and filtered listing in
//! insertion order. Foreign keys are checked up front so that a dangling
//! reference is reported as a ReferenceError rather than a constraint failure.

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use crate::error::{ApiError, ApiResult};

pub mod booking;
pub mod budget;
pub mod campus;
pub mod inventory;
pub mod lab;

pub use booking::{BookingRepository, NewBooking};
pub use budget::BudgetTransactionRepository;
pub use campus::CampusRepository;
pub use inventory::InventoryRepository;
pub use lab::LabRepository;

/// Базовый trait для хранилища сущностей
#[async_trait]
pub trait Repository: Send + Sync {
    /// Stored record.
    type Entity: Send + Unpin + for<'r> FromRow<'r, SqliteRow>;
    /// Record as returned by listings, with joined display fields.
    type Listed: Send + Unpin + for<'r> FromRow<'r, SqliteRow>;
    type Create: Send + 'static;
    type Filter: Send + Sync;

    /// Имя таблицы в базе данных
    fn table_name(&self) -> &'static str;

    /// Human readable name used in error messages
    fn entity_name(&self) -> &'static str;

    /// Создать новую запись. Принимает соединение, чтобы вызов можно было
    /// выполнить внутри транзакции.
    async fn create(&self, conn: &mut SqliteConnection, data: Self::Create) -> ApiResult<Self::Entity>;

    /// Список с фильтрами, в порядке вставки
    async fn list(&self, pool: &SqlitePool, filter: &Self::Filter) -> ApiResult<Vec<Self::Listed>>;

    /// Получить запись по ID
    async fn get(&self, pool: &SqlitePool, id: i64) -> ApiResult<Self::Entity> {
        let query = format!("SELECT * FROM {} WHERE id = ?", self.table_name());

        sqlx::query_as::<_, Self::Entity>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| {
                ApiError::NotFound(format!("{} with ID '{}' not found", self.entity_name(), id))
            })
    }

    async fn exists(&self, conn: &mut SqliteConnection, id: i64) -> ApiResult<bool> {
        let query = format!("SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?)", self.table_name());

        let exists: bool = sqlx::query_scalar(&query)
            .bind(id)
            .fetch_one(&mut *conn)
            .await?;

        Ok(exists)
    }

    async fn count(&self, pool: &SqlitePool) -> ApiResult<i64> {
        let query = format!("SELECT COUNT(*) FROM {}", self.table_name());
        let count: i64 = sqlx::query_scalar(&query).fetch_one(pool).await?;
        Ok(count)
    }

    /// Convenience wrapper over `create` for callers outside a transaction.
    async fn insert(&self, pool: &SqlitePool, data: Self::Create) -> ApiResult<Self::Entity> {
        let mut conn = pool.acquire().await?;
        self.create(&mut conn, data).await
    }
}

/// Fails with ReferenceError when `id` is absent from `repository`.
pub(crate) async fn require_reference<R>(
    repository: &R,
    conn: &mut SqliteConnection,
    id: i64,
) -> ApiResult<()>
where
    R: Repository + ?Sized,
{
    if repository.exists(conn, id).await? {
        Ok(())
    } else {
        Err(ApiError::unknown_reference(&repository.entity_name().to_lowercase(), id))
    }
}

/// Starts a `SELECT ... WHERE 1 = 1` so filters can be appended with `AND`.
pub(crate) fn filtered_select(base: &str) -> QueryBuilder<'static, Sqlite> {
    let mut builder = QueryBuilder::new(base.to_string());
    builder.push(" WHERE 1 = 1");
    builder
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Rows shared by store, ledger and reporting tests.
    use super::*;
    use crate::auth::{NewUser, User, UserRole};
    use crate::models::{CreateCampusRequest, CreateLabRequest, Lab, Money};

    pub async fn campus(pool: &SqlitePool, name: &str, allocated: f64) -> i64 {
        let request = CreateCampusRequest {
            name: name.to_string(),
            location: "Somewhere".to_string(),
            contact_email: None,
            contact_phone: None,
            budget_allocated: Some(Money::from_major(allocated)),
        };
        CampusRepository.insert(pool, request).await.unwrap().id
    }

    pub async fn lab(pool: &SqlitePool, campus_id: i64, name: &str, hourly_rate: f64) -> Lab {
        let request = CreateLabRequest {
            name: name.to_string(),
            description: None,
            capacity: 20,
            location: None,
            equipment_list: vec!["Whiteboard".to_string()],
            hourly_rate: Some(Money::from_major(hourly_rate)),
            campus_id,
            status: None,
        };
        LabRepository.insert(pool, request).await.unwrap()
    }

    /// Inserts a user with a placeholder hash; these tests never log in.
    pub async fn user(pool: &SqlitePool, username: &str, role: UserRole, campus_id: Option<i64>) -> i64 {
        let new_user = NewUser {
            username: username.to_string(),
            email: format!("{}@university.edu", username),
            password: String::new(),
            role,
            campus_id,
        };
        let mut conn = pool.acquire().await.unwrap();
        User::insert(&mut conn, new_user, "x".to_string()).await.unwrap().id
    }
}
