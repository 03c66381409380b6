// src/campus_handlers.rs
use actix_web::{web, HttpRequest, HttpResponse};
use std::sync::Arc;
use validator::Validate;

use crate::audit;
use crate::auth::{require_permission, UserRole};
use crate::error::ApiResult;
use crate::handlers::ApiResponse;
use crate::models::CreateCampusRequest;
use crate::repositories::{CampusRepository, Repository};
use crate::AppState;

pub async fn get_campuses(app_state: web::Data<Arc<AppState>>) -> ApiResult<HttpResponse> {
    let campuses = CampusRepository.list(&app_state.db_pool, &()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(campuses)))
}

pub async fn get_campus(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let campus = CampusRepository
        .get_overview(&app_state.db_pool, path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(campus)))
}

pub async fn create_campus(
    app_state: web::Data<Arc<AppState>>,
    campus: web::Json<CreateCampusRequest>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let claims = require_permission(&http_request, UserRole::can_create_campuses)?;
    campus.validate()?;

    let created = CampusRepository
        .insert(&app_state.db_pool, campus.into_inner())
        .await?;

    audit::audit(
        &app_state.db_pool, claims.sub, "create", "campus", created.id,
        &format!("Created campus '{}'", created.name),
        &http_request,
    ).await;

    log::info!("Created campus: {} ({})", created.name, created.id);
    Ok(HttpResponse::Created().json(ApiResponse::success(created)))
}
