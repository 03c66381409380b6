// src/lab_handlers.rs
use actix_web::{web, HttpRequest, HttpResponse};
use std::sync::Arc;
use validator::Validate;

use crate::audit;
use crate::auth::{get_current_user, require_permission, UserRole};
use crate::error::{ApiError, ApiResult};
use crate::handlers::ApiResponse;
use crate::models::{CreateLabRequest, LabFilter};
use crate::policy::{can_manage_campus, Scope};
use crate::repositories::{LabRepository, Repository};
use crate::AppState;

pub async fn get_labs(
    app_state: web::Data<Arc<AppState>>,
    query: web::Query<LabFilter>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let claims = get_current_user(&http_request)?;

    let labs = LabRepository.list(&app_state.db_pool, &query).await?;
    let labs = Scope::from_claims(&claims).filter_labs(labs);

    Ok(HttpResponse::Ok().json(ApiResponse::success(labs)))
}

pub async fn get_lab(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<i64>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let claims = get_current_user(&http_request)?;

    let lab = LabRepository.get_details(&app_state.db_pool, path.into_inner()).await?;
    let lab = Scope::from_claims(&claims).require_lab(lab)?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(lab)))
}

pub async fn create_lab(
    app_state: web::Data<Arc<AppState>>,
    lab: web::Json<CreateLabRequest>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let claims = require_permission(&http_request, UserRole::can_create_labs)?;
    lab.validate()?;

    if !can_manage_campus(&claims, lab.campus_id) {
        return Err(ApiError::Forbidden(
            "Managers can only create labs on their own campus".to_string(),
        ));
    }

    let created = LabRepository.insert(&app_state.db_pool, lab.into_inner()).await?;

    audit::audit(
        &app_state.db_pool, claims.sub, "create", "lab", created.id,
        &format!("Created lab '{}' on campus {}", created.name, created.campus_id),
        &http_request,
    ).await;

    log::info!("Created lab: {} ({})", created.name, created.id);
    Ok(HttpResponse::Created().json(ApiResponse::success(created)))
}
