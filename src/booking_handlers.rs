// src/booking_handlers.rs
use actix_web::{web, HttpRequest, HttpResponse};
use std::sync::Arc;

use crate::audit;
use crate::auth::get_current_user;
use crate::error::ApiResult;
use crate::handlers::ApiResponse;
use crate::models::{BookingFilter, CreateBookingRequest};
use crate::policy::Scope;
use crate::repositories::{BookingRepository, Repository};
use crate::AppState;

pub async fn get_bookings(
    app_state: web::Data<Arc<AppState>>,
    query: web::Query<BookingFilter>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let claims = get_current_user(&http_request)?;

    let bookings = BookingRepository.list(&app_state.db_pool, &query).await?;
    let bookings = Scope::from_claims(&claims).filter_bookings(bookings);

    Ok(HttpResponse::Ok().json(ApiResponse::success(bookings)))
}

pub async fn get_booking(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<i64>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let claims = get_current_user(&http_request)?;

    let booking = BookingRepository
        .get_details(&app_state.db_pool, path.into_inner())
        .await?;
    let booking = Scope::from_claims(&claims).require_booking(booking)?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(booking)))
}

pub async fn create_booking(
    app_state: web::Data<Arc<AppState>>,
    request: web::Json<CreateBookingRequest>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let claims = get_current_user(&http_request)?;

    let receipt = app_state
        .ledger
        .create_booking(claims.sub, request.into_inner())
        .await?;

    audit::audit(
        &app_state.db_pool, claims.sub, "create", "booking", receipt.id,
        &format!("Booked lab {} for {}", receipt.booking.lab_id, receipt.cost),
        &http_request,
    ).await;

    Ok(HttpResponse::Created().json(ApiResponse::success_with_message(
        receipt,
        "Booking created successfully".to_string(),
    )))
}
