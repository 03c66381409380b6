// src/budget_handlers.rs
use actix_web::{web, HttpRequest, HttpResponse};
use std::sync::Arc;

use crate::auth::get_current_user;
use crate::error::ApiResult;
use crate::handlers::ApiResponse;
use crate::models::CampusQuery;
use crate::reports;
use crate::AppState;

/// One campus when `campus_id` is given, otherwise every campus.
pub async fn get_budget_summary(
    app_state: web::Data<Arc<AppState>>,
    query: web::Query<CampusQuery>,
) -> ApiResult<HttpResponse> {
    match query.campus_id {
        Some(campus_id) => {
            let summary = reports::campus_budget(&app_state.db_pool, campus_id).await?;
            Ok(HttpResponse::Ok().json(ApiResponse::success(summary)))
        }
        None => {
            let summaries = reports::all_budgets(&app_state.db_pool).await?;
            Ok(HttpResponse::Ok().json(ApiResponse::success(summaries)))
        }
    }
}

pub async fn get_transactions(
    app_state: web::Data<Arc<AppState>>,
    query: web::Query<CampusQuery>,
) -> ApiResult<HttpResponse> {
    let transactions = reports::transaction_history(&app_state.db_pool, query.campus_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(transactions)))
}

pub async fn export_transactions(
    app_state: web::Data<Arc<AppState>>,
    query: web::Query<CampusQuery>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let claims = get_current_user(&http_request)?;

    let transactions = reports::transaction_history(&app_state.db_pool, query.campus_id).await?;
    let csv_data = reports::transactions_csv(&transactions)?;

    log::info!("User {} exported {} transactions", claims.username, transactions.len());

    Ok(HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header(("Content-Disposition", "attachment; filename=\"transactions.csv\""))
        .body(csv_data))
}
