// src/inventory_handlers.rs
use actix_web::{web, HttpRequest, HttpResponse};
use std::sync::Arc;
use validator::Validate;

use crate::audit;
use crate::auth::{require_permission, UserRole};
use crate::error::{ApiError, ApiResult};
use crate::handlers::ApiResponse;
use crate::models::{CreateInventoryItemRequest, InventoryFilter};
use crate::policy::can_manage_campus;
use crate::repositories::{InventoryRepository, LabRepository, Repository};
use crate::AppState;

pub async fn get_inventory(
    app_state: web::Data<Arc<AppState>>,
    query: web::Query<InventoryFilter>,
) -> ApiResult<HttpResponse> {
    let items = InventoryRepository.list(&app_state.db_pool, &query).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(items)))
}

pub async fn get_inventory_item(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let item = InventoryRepository
        .get_details(&app_state.db_pool, path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(item)))
}

pub async fn create_inventory_item(
    app_state: web::Data<Arc<AppState>>,
    item: web::Json<CreateInventoryItemRequest>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let claims = require_permission(&http_request, UserRole::can_manage_inventory)?;
    item.validate()?;

    // Campus of the target lab decides whether a manager may stock it
    let lab = LabRepository
        .get(&app_state.db_pool, item.lab_id)
        .await
        .map_err(|err| match err {
            ApiError::NotFound(_) => ApiError::unknown_reference("lab", item.lab_id),
            other => other,
        })?;

    if !can_manage_campus(&claims, lab.campus_id) {
        return Err(ApiError::Forbidden(
            "Managers can only manage inventory on their own campus".to_string(),
        ));
    }

    let created = InventoryRepository
        .insert(&app_state.db_pool, item.into_inner())
        .await?;

    audit::audit(
        &app_state.db_pool, claims.sub, "create", "inventory_item", created.id,
        &format!("Added {} x '{}' to lab '{}'", created.quantity_total, created.name, lab.name),
        &http_request,
    ).await;

    log::info!("Created inventory item: {} ({})", created.name, created.id);
    Ok(HttpResponse::Created().json(ApiResponse::success(created)))
}
