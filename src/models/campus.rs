// src/models/campus.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::money::{validate_amount_range, Money};

// ==================== CAMPUS ====================

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Campus {
    pub id: i64,
    pub name: String,
    pub location: String,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub budget_allocated: Money,
    pub budget_used: Money,
    pub created_at: DateTime<Utc>,
}

impl Campus {
    /// Always derived, never persisted.
    pub fn budget_remaining(&self) -> Money {
        self.budget_allocated - self.budget_used
    }
}

/// Campus row as listed by the API, with its lab count.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CampusOverview {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub campus: Campus,
    pub labs_count: i64,
    #[sqlx(skip)]
    pub budget_remaining: Money,
}

impl CampusOverview {
    pub fn with_remaining(mut self) -> Self {
        self.budget_remaining = self.campus.budget_remaining();
        self
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCampusRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: String,

    #[validate(length(min = 1, max = 200, message = "Location must be between 1 and 200 characters"))]
    pub location: String,

    #[validate(email(message = "Invalid contact email format"))]
    pub contact_email: Option<String>,

    #[validate(length(max = 20, message = "Contact phone cannot exceed 20 characters"))]
    pub contact_phone: Option<String>,

    #[validate(custom(function = "validate_amount_range"))]
    pub budget_allocated: Option<Money>,
}
