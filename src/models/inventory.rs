// src/models/inventory.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use validator::{Validate, ValidationError};

use super::money::{validate_amount_range, Money};

// ==================== INVENTORY ITEM ====================

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct InventoryItem {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub quantity_total: i64,
    pub quantity_available: i64,
    pub unit_cost: Money,
    pub supplier: Option<String>,
    pub purchase_date: Option<NaiveDate>,
    pub warranty_expiry: Option<NaiveDate>,
    pub lab_id: i64,
    pub status: InventoryStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct InventoryItemDetails {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub item: InventoryItem,
    pub lab_name: String,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
    sqlx::Type, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum InventoryStatus {
    #[default]
    Active,
    Maintenance,
    Retired,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "validate_quantities", skip_on_field_errors = false))]
pub struct CreateInventoryItemRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: String,

    #[validate(length(max = 1000, message = "Description cannot exceed 1000 characters"))]
    pub description: Option<String>,

    #[validate(length(max = 50, message = "Category cannot exceed 50 characters"))]
    pub category: Option<String>,

    #[validate(range(min = 0, message = "Total quantity cannot be negative"))]
    pub quantity_total: i64,

    #[validate(range(min = 0, message = "Available quantity cannot be negative"))]
    pub quantity_available: Option<i64>,

    #[validate(custom(function = "validate_amount_range"))]
    pub unit_cost: Option<Money>,

    #[validate(length(max = 100, message = "Supplier cannot exceed 100 characters"))]
    pub supplier: Option<String>,

    /// `YYYY-MM-DD`
    pub purchase_date: Option<NaiveDate>,
    pub warranty_expiry: Option<NaiveDate>,

    pub lab_id: i64,

    pub status: Option<InventoryStatus>,
}

impl CreateInventoryItemRequest {
    pub fn effective_available(&self) -> i64 {
        self.quantity_available.unwrap_or(self.quantity_total)
    }
}

/// quantity_total >= quantity_available
fn validate_quantities(request: &CreateInventoryItemRequest) -> Result<(), ValidationError> {
    if request.effective_available() > request.quantity_total {
        let mut error = ValidationError::new("quantity_available_exceeds_total");
        error.message = Some("Available quantity cannot exceed total quantity".into());
        return Err(error);
    }
    Ok(())
}

#[derive(Debug, Default, Deserialize)]
pub struct InventoryFilter {
    pub lab_id: Option<i64>,
    pub campus_id: Option<i64>,
    pub category: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(total: i64, available: Option<i64>) -> CreateInventoryItemRequest {
        serde_json::from_value(serde_json::json!({
            "name": "Microscope",
            "quantity_total": total,
            "quantity_available": available,
            "unit_cost": 1200.0,
            "purchase_date": "2024-02-01",
            "lab_id": 4
        }))
        .unwrap()
    }

    #[test]
    fn test_available_defaults_to_total() {
        let req = request(10, None);
        assert_eq!(req.effective_available(), 10);
        assert!(req.validate().is_ok());
        assert_eq!(req.purchase_date, NaiveDate::from_ymd_opt(2024, 2, 1));
    }

    #[test]
    fn test_available_cannot_exceed_total() {
        assert!(request(10, Some(9)).validate().is_ok());
        assert!(request(10, Some(11)).validate().is_err());
        assert!(request(10, Some(-1)).validate().is_err());
    }
}
