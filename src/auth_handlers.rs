// src/auth_handlers.rs - Authentication and user directory handlers

use actix_web::{web, HttpRequest, HttpResponse};
use serde::Serialize;
use std::sync::Arc;
use validator::Validate;

use crate::audit;
use crate::auth::{
    get_current_user, require_permission, AuthService, CreateUserRequest, LoginRequest,
    LoginResponse, NewUser, RegisterRequest, User, UserInfo, UserRole,
};
use crate::error::{ApiError, ApiResult};
use crate::handlers::ApiResponse;
use crate::policy::user_directory_scope;
use crate::AppState;

pub async fn login(
    app_state: web::Data<Arc<AppState>>,
    auth_service: web::Data<Arc<AuthService>>,
    request: web::Json<LoginRequest>,
) -> ApiResult<HttpResponse> {
    request.validate()?;

    let invalid = || ApiError::AuthError("Invalid username or password".to_string());

    let user = User::find_by_username(&app_state.db_pool, &request.username)
        .await
        .map_err(|err| match err {
            ApiError::NotFound(_) => invalid(),
            other => other,
        })?;

    if !auth_service.verify_password(&request.password, &user.password_hash)? {
        log::warn!("Failed login attempt for user {}", user.username);
        return Err(invalid());
    }

    let token = auth_service.generate_token(&user)?;

    let response = LoginResponse {
        token,
        expires_in: auth_service.token_lifetime_seconds(),
        user: user.into(),
    };

    log::info!("User {} logged in successfully", response.user.username);

    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
        response,
        "Login successful".to_string(),
    )))
}

/// Self-registration; always yields a regular user.
pub async fn register(
    app_state: web::Data<Arc<AppState>>,
    auth_service: web::Data<Arc<AuthService>>,
    request: web::Json<RegisterRequest>,
) -> ApiResult<HttpResponse> {
    request.validate()?;
    let request = request.into_inner();

    let new_user = NewUser {
        username: request.username,
        email: request.email,
        password: request.password,
        role: UserRole::User,
        campus_id: request.campus_id,
    };
    let user = User::create(&app_state.db_pool, new_user, &auth_service).await?;

    let token = auth_service.generate_token(&user)?;

    let response = LoginResponse {
        token,
        expires_in: auth_service.token_lifetime_seconds(),
        user: user.into(),
    };

    log::info!("New user registered: {}", response.user.username);

    Ok(HttpResponse::Created().json(ApiResponse::success_with_message(
        response,
        "User registered successfully".to_string(),
    )))
}

pub async fn get_profile(
    app_state: web::Data<Arc<AppState>>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let claims = get_current_user(&http_request)?;

    #[derive(Serialize)]
    struct ProfileResponse {
        #[serde(flatten)]
        user: UserInfo,
        can_manage_users: bool,
        can_manage_inventory: bool,
    }

    let user = User::find_by_id(&app_state.db_pool, claims.sub).await?;
    let response = ProfileResponse {
        user: user.into(),
        can_manage_users: claims.role.can_manage_users(),
        can_manage_inventory: claims.role.can_manage_inventory(),
    };

    Ok(HttpResponse::Ok().json(ApiResponse::success(response)))
}

/// Tokens are stateless; the client discards its copy.
pub async fn logout(http_request: HttpRequest) -> ApiResult<HttpResponse> {
    let claims = get_current_user(&http_request)?;
    log::info!("User {} logged out", claims.username);

    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
        (),
        "Logged out successfully".to_string(),
    )))
}

// ==================== USER DIRECTORY ====================

pub async fn get_users(
    app_state: web::Data<Arc<AppState>>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let claims = get_current_user(&http_request)?;
    let campus_scope = user_directory_scope(&claims)?;

    let users: Vec<UserInfo> = User::list(&app_state.db_pool, campus_scope)
        .await?
        .into_iter()
        .map(UserInfo::from)
        .collect();

    Ok(HttpResponse::Ok().json(ApiResponse::success(users)))
}

pub async fn create_user(
    app_state: web::Data<Arc<AppState>>,
    auth_service: web::Data<Arc<AuthService>>,
    request: web::Json<CreateUserRequest>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let claims = require_permission(&http_request, UserRole::can_manage_users)?;
    request.validate()?;
    let request = request.into_inner();

    let new_user = NewUser {
        username: request.username,
        email: request.email,
        password: request.password,
        role: request.role,
        campus_id: request.campus_id,
    };
    let user = User::create(&app_state.db_pool, new_user, &auth_service).await?;

    audit::audit(
        &app_state.db_pool, claims.sub, "create", "user", user.id,
        &format!("Created user '{}' with role {}", user.username, user.role),
        &http_request,
    ).await;

    log::info!("User {} created by {}", user.username, claims.username);

    Ok(HttpResponse::Created().json(ApiResponse::success(UserInfo::from(user))))
}
