// src/models/lab.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use strum::{AsRefStr, Display, EnumString};
use validator::Validate;

use super::money::{validate_amount_range, Money};

// ==================== LAB ====================

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Lab {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub capacity: i64,
    pub location: Option<String>,
    /// Stored as a JSON text column, decoded on read.
    pub equipment_list: Json<Vec<String>>,
    pub hourly_rate: Money,
    pub campus_id: i64,
    pub status: LabStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct LabDetails {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub lab: Lab,
    pub campus_name: String,
}

/// Статус лаборатории
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
    sqlx::Type, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LabStatus {
    #[default]
    Active,
    Maintenance,
    Inactive,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateLabRequest {
    #[validate(length(min = 1, max = 100, message = "Lab name must be between 1 and 100 characters"))]
    pub name: String,

    #[validate(length(max = 1000, message = "Description cannot exceed 1000 characters"))]
    pub description: Option<String>,

    #[validate(range(min = 1, max = 10000, message = "Capacity must be between 1 and 10000"))]
    pub capacity: i64,

    #[validate(length(max = 200, message = "Location cannot exceed 200 characters"))]
    pub location: Option<String>,

    #[serde(default)]
    pub equipment_list: Vec<String>,

    #[validate(custom(function = "validate_amount_range"))]
    pub hourly_rate: Option<Money>,

    pub campus_id: i64,

    pub status: Option<LabStatus>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LabFilter {
    pub campus_id: Option<i64>,
    pub status: Option<LabStatus>,
}
