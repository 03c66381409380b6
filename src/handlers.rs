// src/handlers.rs
use actix_web::{web, HttpResponse};
use serde::Serialize;
use std::sync::Arc;

use crate::error::ApiResult;
use crate::reports;
use crate::AppState;

// ==================== COMMON STRUCTURES ====================

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn success_with_message(data: T, message: String) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message),
        }
    }
}

// ==================== DASHBOARD ====================

pub async fn get_dashboard(app_state: web::Data<Arc<AppState>>) -> ApiResult<HttpResponse> {
    let dashboard = reports::dashboard(&app_state.db_pool).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(dashboard)))
}
