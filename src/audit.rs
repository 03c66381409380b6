// src/audit.rs
//! Запись событий в audit_logs.
//!
//! Failures are logged and swallowed; an audit problem never fails the
//! request that triggered it.

use actix_web::HttpRequest;
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

/// One audit event.
#[derive(Debug, Clone, Copy)]
pub struct AuditEvent<'a> {
    pub user_id: Option<i64>,
    pub action: &'a str,
    pub entity_type: &'a str,
    pub entity_id: i64,
    pub description: &'a str,
}

pub async fn log_activity(
    pool: &SqlitePool,
    event: AuditEvent<'_>,
    request: Option<&HttpRequest>,
) -> Result<(), sqlx::Error> {
    let ip_address = request.and_then(|req| {
        req.connection_info()
            .realip_remote_addr()
            .map(|s| s.to_string())
    });

    let user_agent = request.and_then(|req| {
        req.headers()
            .get("User-Agent")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
    });

    sqlx::query(
        r#"INSERT INTO audit_logs
           (id, user_id, action, entity_type, entity_id, description, ip_address, user_agent, created_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(event.user_id)
    .bind(event.action)
    .bind(event.entity_type)
    .bind(event.entity_id.to_string())
    .bind(event.description)
    .bind(&ip_address)
    .bind(&user_agent)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(())
}

/// Короткая версия для частых вызовов
pub async fn audit(
    pool: &SqlitePool,
    user_id: i64,
    action: &str,
    entity_type: &str,
    entity_id: i64,
    description: &str,
    request: &HttpRequest,
) {
    let event = AuditEvent {
        user_id: Some(user_id),
        action,
        entity_type,
        entity_id,
        description,
    };

    if let Err(e) = log_activity(pool, event, Some(request)).await {
        log::error!("Failed to write audit log: {}", e);
    }
}
