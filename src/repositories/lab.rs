// src/repositories/lab.rs
use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use sqlx::{SqliteConnection, SqlitePool};

use super::{filtered_select, require_reference, CampusRepository, Repository};
use crate::error::{ApiError, ApiResult};
use crate::models::{CreateLabRequest, Lab, LabDetails, LabFilter, Money};

const DETAILS_SELECT: &str =
    "SELECT l.*, c.name AS campus_name FROM labs l JOIN campuses c ON c.id = l.campus_id";

pub struct LabRepository;

#[async_trait]
impl Repository for LabRepository {
    type Entity = Lab;
    type Listed = LabDetails;
    type Create = CreateLabRequest;
    type Filter = LabFilter;

    fn table_name(&self) -> &'static str {
        "labs"
    }

    fn entity_name(&self) -> &'static str {
        "Lab"
    }

    async fn create(&self, conn: &mut SqliteConnection, data: CreateLabRequest) -> ApiResult<Lab> {
        require_reference(&CampusRepository, &mut *conn, data.campus_id).await?;

        let lab = sqlx::query_as::<_, Lab>(
            r#"INSERT INTO labs
               (name, description, capacity, location, equipment_list, hourly_rate, campus_id, status, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
               RETURNING *"#,
        )
        .bind(&data.name)
        .bind(&data.description)
        .bind(data.capacity)
        .bind(&data.location)
        .bind(Json(&data.equipment_list))
        .bind(data.hourly_rate.unwrap_or(Money::ZERO))
        .bind(data.campus_id)
        .bind(data.status.unwrap_or_default())
        .bind(Utc::now())
        .fetch_one(&mut *conn)
        .await?;

        Ok(lab)
    }

    async fn list(&self, pool: &SqlitePool, filter: &LabFilter) -> ApiResult<Vec<LabDetails>> {
        let mut builder = filtered_select(DETAILS_SELECT);

        if let Some(campus_id) = filter.campus_id {
            builder.push(" AND l.campus_id = ").push_bind(campus_id);
        }
        if let Some(status) = filter.status {
            builder.push(" AND l.status = ").push_bind(status);
        }
        builder.push(" ORDER BY l.id");

        let labs = builder.build_query_as::<LabDetails>().fetch_all(pool).await?;
        Ok(labs)
    }
}

impl LabRepository {
    pub async fn get_details(&self, pool: &SqlitePool, id: i64) -> ApiResult<LabDetails> {
        let query = format!("{} WHERE l.id = ?", DETAILS_SELECT);
        sqlx::query_as::<_, LabDetails>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| ApiError::lab_not_found(id))
    }
}
