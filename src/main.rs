// src/main.rs - Campus lab management service
use actix_cors::Cors;
use actix_web::http::header;
use actix_web::middleware::{DefaultHeaders, Logger};
use actix_web::{web, App, HttpServer};
use actix_web_httpauth::middleware::HttpAuthentication;
use anyhow::Context;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// Module declarations
mod audit;
mod auth;
mod auth_handlers;
mod booking_handlers;
mod budget_handlers;
mod campus_handlers;
mod config;
mod db;
mod error;
mod handlers;
mod inventory_handlers;
mod lab_handlers;
mod ledger;
mod models;
mod monitoring;
mod policy;
mod reports;
pub mod repositories;
mod seed;

use auth::{jwt_middleware, AuthService};
use config::{load_config, Config, SecurityConfig};
use error::ApiError;
use ledger::LedgerEngine;

pub struct AppState {
    pub db_pool: SqlitePool,
    pub config: Config,
    pub ledger: LedgerEngine,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(db_pool: SqlitePool, config: Config) -> Self {
        Self {
            ledger: LedgerEngine::new(db_pool.clone()),
            db_pool,
            config,
            started_at: Utc::now(),
        }
    }
}

// ==================== ROUTES ====================

fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg
        // Health checks (no auth)
        .service(
            web::scope("/health")
                .route("", web::get().to(monitoring::health_check))
                .route("/ready", web::get().to(monitoring::readiness_check)),
        )
        // Public auth routes
        .service(
            web::scope("/auth")
                .route("/login", web::post().to(auth_handlers::login))
                .route("/register", web::post().to(auth_handlers::register)),
        )
        // Protected API
        .service(
            web::scope("/api/v1")
                .wrap(HttpAuthentication::bearer(jwt_middleware))
                .service(
                    web::scope("/auth")
                        .route("/profile", web::get().to(auth_handlers::get_profile))
                        .route("/logout", web::post().to(auth_handlers::logout)),
                )
                .service(
                    web::scope("/users")
                        .route("", web::get().to(auth_handlers::get_users))
                        .route("", web::post().to(auth_handlers::create_user)),
                )
                .service(
                    web::scope("/campuses")
                        .route("", web::get().to(campus_handlers::get_campuses))
                        .route("", web::post().to(campus_handlers::create_campus))
                        .route("/{id}", web::get().to(campus_handlers::get_campus)),
                )
                .service(
                    web::scope("/labs")
                        .route("", web::get().to(lab_handlers::get_labs))
                        .route("", web::post().to(lab_handlers::create_lab))
                        .route("/{id}", web::get().to(lab_handlers::get_lab)),
                )
                .service(
                    web::scope("/inventory")
                        .route("", web::get().to(inventory_handlers::get_inventory))
                        .route("", web::post().to(inventory_handlers::create_inventory_item))
                        .route("/{id}", web::get().to(inventory_handlers::get_inventory_item)),
                )
                .service(
                    web::scope("/bookings")
                        .route("", web::get().to(booking_handlers::get_bookings))
                        .route("", web::post().to(booking_handlers::create_booking))
                        .route("/{id}", web::get().to(booking_handlers::get_booking)),
                )
                .service(
                    web::scope("/budget")
                        .route("/summary", web::get().to(budget_handlers::get_budget_summary))
                        .route("/transactions", web::get().to(budget_handlers::get_transactions))
                        .route("/transactions/export", web::get().to(budget_handlers::export_transactions)),
                )
                .service(
                    web::scope("/analytics")
                        .route("/dashboard", web::get().to(handlers::get_dashboard)),
                ),
        );
}

/// Malformed JSON bodies and query strings answer with the standard error
/// envelope instead of actix's plain-text default.
fn json_config(max_request_size: usize) -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(max_request_size)
        .error_handler(|err, _req| ApiError::bad_request(&err.to_string()).into())
}

fn query_config() -> web::QueryConfig {
    web::QueryConfig::default()
        .error_handler(|err, _req| ApiError::bad_request(&err.to_string()).into())
}

// ==================== MAIN ====================

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration (this calls load_env_file internally)
    let config = load_config()?;

    setup_logging(&config)?;
    config.print_startup_info();

    let pool = db::create_pool(&config.database).await?;
    db::run_migrations(&pool).await?;

    let auth_service = Arc::new(AuthService::new(&config.auth));

    if config.seed.enabled {
        seed::seed_if_empty(&pool, &auth_service, &config.seed)
            .await
            .context("Failed to seed database")?;
    }

    let app_state = Arc::new(AppState::new(pool, config.clone()));

    let bind_address = format!("{}:{}", config.server.host, config.server.port);
    log::info!("Starting server at http://{}", bind_address);

    let server_config = config.clone();
    let mut server = HttpServer::new(move || {
        let cors = setup_cors(&server_config.security.allowed_origins, server_config.is_production());
        let security_headers = setup_security_headers(&server_config.security);

        App::new()
            .wrap(cors)
            .wrap(security_headers)
            .wrap(Logger::default())
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::Data::new(auth_service.clone()))
            .app_data(json_config(server_config.security.max_request_size))
            .app_data(query_config())
            .configure(configure_routes)
    })
    .keep_alive(Duration::from_secs(config.server.keep_alive));

    if let Some(workers) = config.server.workers {
        server = server.workers(workers);
    }

    server
        .bind(&bind_address)
        .with_context(|| format!("Failed to bind to {}", bind_address))?
        .run()
        .await
        .context("Server failed to run")?;

    Ok(())
}

// ==================== HELPER FUNCTIONS ====================

fn setup_cors(allowed_origins: &[String], is_production: bool) -> Cors {
    let mut cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "OPTIONS"])
        .allowed_headers(vec![
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
        ])
        .expose_headers(vec![header::CONTENT_LENGTH, header::CONTENT_DISPOSITION])
        .max_age(3600);

    // Config::validate already refuses a wildcard in production
    if allowed_origins.iter().any(|o| o == "*") && !is_production {
        log::warn!("Using wildcard CORS (*) in development mode");
        return cors.allow_any_origin();
    }

    for origin in allowed_origins.iter().filter(|o| !o.is_empty() && o.as_str() != "*") {
        cors = cors.allowed_origin(origin);
    }

    cors
}

fn setup_logging(config: &Config) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.logging.level.as_str()));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .context("Failed to initialise logging")?;

    Ok(())
}

fn setup_security_headers(config: &SecurityConfig) -> DefaultHeaders {
    let mut headers = DefaultHeaders::new()
        .add(("X-Content-Type-Options", "nosniff"))
        .add(("X-Frame-Options", "DENY"))
        .add(("X-XSS-Protection", "1; mode=block"))
        .add(("Referrer-Policy", "strict-origin-when-cross-origin"));

    if config.require_https {
        headers = headers.add((
            "Strict-Transport-Security",
            "max-age=31536000; includeSubDomains; preload",
        ));
    }

    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SeedConfig;
    use crate::db::test_support::memory_pool;
    use actix_web::http::StatusCode;
    use actix_web::test;
    use serde_json::{json, Value};

    const SEED_PASSWORD: &str = "campus2024";

    async fn seeded_state() -> (Arc<AppState>, Arc<AuthService>) {
        let pool = memory_pool().await;
        let config = Config::for_tests();
        let auth_service = Arc::new(AuthService::new(&config.auth));
        let seed_config = SeedConfig { enabled: true, password: Some(SEED_PASSWORD.to_string()) };
        seed::seed_if_empty(&pool, &auth_service, &seed_config).await.unwrap();

        (Arc::new(AppState::new(pool, config)), auth_service)
    }

    macro_rules! test_app {
        () => {{
            let (app_state, auth_service) = seeded_state().await;
            test::init_service(
                App::new()
                    .app_data(web::Data::new(app_state))
                    .app_data(web::Data::new(auth_service))
                    .app_data(json_config(1024 * 1024))
                    .app_data(query_config())
                    .configure(configure_routes),
            )
            .await
        }};
    }

    macro_rules! login {
        ($app:expr, $username:expr) => {{
            let req = test::TestRequest::post()
                .uri("/auth/login")
                .set_json(json!({ "username": $username, "password": SEED_PASSWORD }))
                .to_request();
            let body: Value = test::call_and_read_body_json(&$app, req).await;
            body["data"]["token"].as_str().unwrap().to_string()
        }};
    }

    fn bearer(token: &str) -> (header::HeaderName, String) {
        (header::AUTHORIZATION, format!("Bearer {}", token))
    }

    #[actix_rt::test]
    async fn test_health_is_public() {
        let app = test_app!();
        let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = test::call_service(&app, test::TestRequest::get().uri("/health/ready").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_rt::test]
    async fn test_api_requires_token() {
        let app = test_app!();
        let resp = test::call_service(&app, test::TestRequest::get().uri("/api/v1/labs").to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::get()
            .uri("/api/v1/labs")
            .insert_header((header::AUTHORIZATION, "Bearer not-a-token"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_rt::test]
    async fn test_login_rejects_wrong_password() {
        let app = test_app!();
        let req = test::TestRequest::post()
            .uri("/auth/login")
            .set_json(json!({ "username": "admin", "password": "wrong-password1" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert!(body["message"].is_string());
    }

    #[actix_rt::test]
    async fn test_duplicate_registration_conflicts() {
        let app = test_app!();
        let req = test::TestRequest::post()
            .uri("/auth/register")
            .set_json(json!({
                "username": "admin",
                "email": "someone.else@university.edu",
                "password": "password123"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        assert!(body["message"].as_str().unwrap().contains("Username already exists"));
    }

    #[actix_rt::test]
    async fn test_register_yields_regular_user() {
        let app = test_app!();
        let req = test::TestRequest::post()
            .uri("/auth/register")
            .set_json(json!({
                "username": "newstudent",
                "email": "newstudent@university.edu",
                "password": "password123",
                "campus_id": 2
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"]["user"]["role"], "user");
        assert_eq!(body["data"]["user"]["campus_id"], 2);
        assert_eq!(body["data"]["expires_in"], 24 * 3600);
    }

    #[actix_rt::test]
    async fn test_booking_flow_and_scoping() {
        let app = test_app!();
        let student = login!(app, "student1");
        let manager = login!(app, "manager1");

        let req = test::TestRequest::post()
            .uri("/api/v1/bookings")
            .insert_header(bearer(&student))
            .set_json(json!({
                "lab_id": 1,
                "start_time": "2025-03-01T09:00:00Z",
                "end_time": "2025-03-01T11:00:00Z",
                "purpose": "Intro to C"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"]["cost"], 50.0);
        let booking_id = body["data"]["id"].as_i64().unwrap();

        // budget reads follow campus_id for every role
        let req = test::TestRequest::get()
            .uri("/api/v1/budget/summary?campus_id=1")
            .insert_header(bearer(&student))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["campus_id"], 1);
        assert_eq!(body["data"]["budget_used"], 50.0);
        assert_eq!(body["data"]["budget_remaining"], 99950.0);

        let req = test::TestRequest::get()
            .uri("/api/v1/budget/summary")
            .insert_header(bearer(&manager))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let summaries = body["data"].as_array().unwrap();
        assert_eq!(summaries.len(), 3);
        assert_eq!(summaries[0]["budget_used"], 50.0);
        assert_eq!(summaries[1]["budget_used"], 0.0);

        let req = test::TestRequest::get()
            .uri("/api/v1/budget/transactions?campus_id=2")
            .insert_header(bearer(&student))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert!(body["data"].as_array().unwrap().is_empty());

        let req = test::TestRequest::get()
            .uri("/api/v1/budget/summary?campus_id=99")
            .insert_header(bearer(&student))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        // manager1 is on Main Campus; the booking is visible to them
        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/bookings/{}", booking_id))
            .insert_header(bearer(&manager))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::get()
            .uri("/api/v1/bookings")
            .insert_header(bearer(&student))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"][0]["lab_name"], "Computer Lab A");

        let req = test::TestRequest::get()
            .uri("/api/v1/budget/transactions/export")
            .insert_header(bearer(&manager))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let csv = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
        assert!(csv.contains("Lab booking: Computer Lab A"));
    }

    #[actix_rt::test]
    async fn test_booking_unknown_lab_is_not_found() {
        let app = test_app!();
        let student = login!(app, "student1");

        let req = test::TestRequest::post()
            .uri("/api/v1/bookings")
            .insert_header(bearer(&student))
            .set_json(json!({
                "lab_id": 99,
                "start_time": "2025-03-01T09:00:00Z",
                "end_time": "2025-03-01T11:00:00Z"
            }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_rt::test]
    async fn test_manager_limited_to_own_campus() {
        let app = test_app!();
        let manager = login!(app, "manager1");

        let req = test::TestRequest::get()
            .uri("/api/v1/labs")
            .insert_header(bearer(&manager))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let names: Vec<&str> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|lab| lab["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Computer Lab A", "Chemistry Lab"]);

        let req = test::TestRequest::post()
            .uri("/api/v1/labs")
            .insert_header(bearer(&manager))
            .set_json(json!({ "name": "Robotics Lab", "capacity": 12, "campus_id": 2 }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::post()
            .uri("/api/v1/campuses")
            .insert_header(bearer(&manager))
            .set_json(json!({ "name": "East Campus", "location": "East District" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
    }

    #[actix_rt::test]
    async fn test_admin_creates_lab_and_sees_dashboard() {
        let app = test_app!();
        let admin = login!(app, "admin");

        let req = test::TestRequest::post()
            .uri("/api/v1/labs")
            .insert_header(bearer(&admin))
            .set_json(json!({
                "name": "Robotics Lab",
                "capacity": 12,
                "campus_id": 2,
                "hourly_rate": 45.5,
                "equipment_list": ["Robot arms"]
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"]["hourly_rate"], 45.5);
        assert_eq!(body["data"]["equipment_list"], json!(["Robot arms"]));

        let req = test::TestRequest::post()
            .uri("/api/v1/labs")
            .insert_header(bearer(&admin))
            .set_json(json!({ "name": "Ghost Lab", "capacity": 5, "campus_id": 42 }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get()
            .uri("/api/v1/analytics/dashboard")
            .insert_header(bearer(&admin))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["statistics"]["total_campuses"], 3);
        assert_eq!(body["data"]["statistics"]["total_labs"], 5);
        assert_eq!(body["data"]["statistics"]["total_inventory_items"], 3);
        assert_eq!(body["data"]["budget_summary"]["total_allocated"], 225000.0);

        let req = test::TestRequest::get()
            .uri("/api/v1/users")
            .insert_header(bearer(&admin))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 3);
    }

    #[actix_rt::test]
    async fn test_malformed_body_uses_error_envelope() {
        let app = test_app!();
        let req = test::TestRequest::post()
            .uri("/auth/login")
            .insert_header((header::CONTENT_TYPE, "application/json"))
            .set_payload("{not json")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
    }
}
