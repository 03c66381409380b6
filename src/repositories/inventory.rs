// src/repositories/inventory.rs
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};

use super::{filtered_select, require_reference, LabRepository, Repository};
use crate::error::{ApiError, ApiResult};
use crate::models::{
    CreateInventoryItemRequest, InventoryFilter, InventoryItem, InventoryItemDetails, Money,
};

const DETAILS_SELECT: &str =
    "SELECT i.*, l.name AS lab_name FROM inventory_items i JOIN labs l ON l.id = i.lab_id";

pub struct InventoryRepository;

#[async_trait]
impl Repository for InventoryRepository {
    type Entity = InventoryItem;
    type Listed = InventoryItemDetails;
    type Create = CreateInventoryItemRequest;
    type Filter = InventoryFilter;

    fn table_name(&self) -> &'static str {
        "inventory_items"
    }

    fn entity_name(&self) -> &'static str {
        "Inventory item"
    }

    async fn create(
        &self,
        conn: &mut SqliteConnection,
        data: CreateInventoryItemRequest,
    ) -> ApiResult<InventoryItem> {
        let available = data.effective_available();
        if available > data.quantity_total {
            return Err(ApiError::ValidationError(
                "Available quantity cannot exceed total quantity".to_string(),
            ));
        }

        require_reference(&LabRepository, &mut *conn, data.lab_id).await?;

        let item = sqlx::query_as::<_, InventoryItem>(
            r#"INSERT INTO inventory_items
               (name, description, category, quantity_total, quantity_available, unit_cost,
                supplier, purchase_date, warranty_expiry, lab_id, status, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
               RETURNING *"#,
        )
        .bind(&data.name)
        .bind(&data.description)
        .bind(&data.category)
        .bind(data.quantity_total)
        .bind(available)
        .bind(data.unit_cost.unwrap_or(Money::ZERO))
        .bind(&data.supplier)
        .bind(data.purchase_date)
        .bind(data.warranty_expiry)
        .bind(data.lab_id)
        .bind(data.status.unwrap_or_default())
        .bind(Utc::now())
        .fetch_one(&mut *conn)
        .await?;

        Ok(item)
    }

    /// `lab_id` takes precedence over `campus_id` when both are given.
    async fn list(
        &self,
        pool: &SqlitePool,
        filter: &InventoryFilter,
    ) -> ApiResult<Vec<InventoryItemDetails>> {
        let mut builder = filtered_select(DETAILS_SELECT);

        if let Some(lab_id) = filter.lab_id {
            builder.push(" AND i.lab_id = ").push_bind(lab_id);
        } else if let Some(campus_id) = filter.campus_id {
            builder.push(" AND l.campus_id = ").push_bind(campus_id);
        }
        if let Some(category) = &filter.category {
            builder.push(" AND i.category = ").push_bind(category.clone());
        }
        builder.push(" ORDER BY i.id");

        let items = builder
            .build_query_as::<InventoryItemDetails>()
            .fetch_all(pool)
            .await?;
        Ok(items)
    }
}

impl InventoryRepository {
    pub async fn get_details(&self, pool: &SqlitePool, id: i64) -> ApiResult<InventoryItemDetails> {
        let query = format!("{} WHERE i.id = ?", DETAILS_SELECT);
        sqlx::query_as::<_, InventoryItemDetails>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| ApiError::not_found("Inventory item"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::memory_pool;
    use crate::repositories::fixtures;

    fn item(lab_id: i64, name: &str, category: Option<&str>) -> CreateInventoryItemRequest {
        CreateInventoryItemRequest {
            name: name.to_string(),
            description: None,
            category: category.map(str::to_string),
            quantity_total: 10,
            quantity_available: None,
            unit_cost: Some(Money::from_major(1200.0)),
            supplier: None,
            purchase_date: None,
            warranty_expiry: None,
            lab_id,
            status: None,
        }
    }

    #[actix_rt::test]
    async fn test_create_defaults_available_to_total() {
        let pool = memory_pool().await;
        let campus = fixtures::campus(&pool, "South Campus", 0.0).await;
        let lab = fixtures::lab(&pool, campus, "Biology Lab", 40.0).await;

        let created = InventoryRepository
            .insert(&pool, item(lab.id, "Microscope", Some("Lab Equipment")))
            .await
            .unwrap();
        assert_eq!(created.quantity_available, 10);

        let details = InventoryRepository.get_details(&pool, created.id).await.unwrap();
        assert_eq!(details.lab_name, "Biology Lab");
        assert_eq!(details.item.unit_cost, Money::from_major(1200.0));
    }

    #[actix_rt::test]
    async fn test_unknown_lab_and_excess_available_rejected() {
        let pool = memory_pool().await;

        let result = InventoryRepository.insert(&pool, item(9, "Oscilloscope", None)).await;
        assert!(matches!(result, Err(ApiError::ReferenceError(_))));

        let mut excess = item(9, "Oscilloscope", None);
        excess.quantity_available = Some(11);
        let result = InventoryRepository.insert(&pool, excess).await;
        assert!(matches!(result, Err(ApiError::ValidationError(_))));
    }

    #[actix_rt::test]
    async fn test_list_filters() {
        let pool = memory_pool().await;
        let main = fixtures::campus(&pool, "Main Campus", 0.0).await;
        let north = fixtures::campus(&pool, "North Campus", 0.0).await;
        let computer = fixtures::lab(&pool, main, "Computer Lab A", 25.0).await;
        let physics = fixtures::lab(&pool, north, "Physics Lab", 30.0).await;

        InventoryRepository.insert(&pool, item(computer.id, "Desktop PC", Some("Computer"))).await.unwrap();
        InventoryRepository.insert(&pool, item(physics.id, "Oscilloscope", Some("Electronics"))).await.unwrap();
        InventoryRepository.insert(&pool, item(computer.id, "Monitor", Some("Electronics"))).await.unwrap();

        let by_campus = InventoryFilter { campus_id: Some(main), ..Default::default() };
        let names: Vec<String> = InventoryRepository
            .list(&pool, &by_campus)
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.item.name)
            .collect();
        assert_eq!(names, vec!["Desktop PC", "Monitor"]);

        // lab filter wins over campus filter
        let both = InventoryFilter { lab_id: Some(physics.id), campus_id: Some(main), category: None };
        assert_eq!(InventoryRepository.list(&pool, &both).await.unwrap().len(), 1);

        let by_category = InventoryFilter { category: Some("Electronics".to_string()), ..Default::default() };
        assert_eq!(InventoryRepository.list(&pool, &by_category).await.unwrap().len(), 2);
    }
}
