use std::collections::BTreeMap;

use async_trait::async_trait;
use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::Serialize;
use sqlx::PgPool;
use tracing::warn;

use crate::db::StoreError;
use crate::response::{self, ApiResponse};
use crate::state::AppState;

/// Tables the service cannot work without.
pub const HEALTH_TABLES: [&str; 3] = ["posts", "profiles", "keep_alive"];

#[async_trait]
pub trait TableProbe: Send + Sync {
    async fn probe(&self, table: &'static str) -> Result<(), StoreError>;
}

#[derive(Clone)]
pub struct PgTableProbe {
    pool: PgPool,
}

impl PgTableProbe {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TableProbe for PgTableProbe {
    async fn probe(&self, table: &'static str) -> Result<(), StoreError> {
        sqlx::query(&format!("SELECT 1 FROM {table} LIMIT 1"))
            .fetch_optional(&self.pool)
            .await?;
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub timestamp: String,
    pub tables: BTreeMap<&'static str, &'static str>,
}

#[derive(Debug, Serialize)]
pub struct Pong {
    pub timestamp: String,
}

/// GET /api/v1/health
/// 200 when every table answers, 503 otherwise.
pub async fn health_handler(
    State(state): State<AppState>,
) -> (StatusCode, Json<ApiResponse<HealthReport>>) {
    let mut tables = BTreeMap::new();
    let mut healthy = true;
    for table in HEALTH_TABLES {
        let status = match state.probe.probe(table).await {
            Ok(()) => "ok",
            Err(e) => {
                warn!("Health probe on {table} failed: {e}");
                healthy = false;
                "unreachable"
            }
        };
        tables.insert(table, status);
    }

    let report = HealthReport {
        status: if healthy { "healthy" } else { "unhealthy" },
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now().to_rfc3339(),
        tables,
    };

    if healthy {
        (StatusCode::OK, response::ok(report))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiResponse {
                success: false,
                data: Some(report),
                message: Some("Database connectivity check failed".to_string()),
                error: Some("SERVICE_UNAVAILABLE".to_string()),
            }),
        )
    }
}

/// GET /api/v1/ping
pub async fn ping_handler() -> Json<ApiResponse<Pong>> {
    response::ok_with_message(
        Pong {
            timestamp: Utc::now().to_rfc3339(),
        },
        "pong",
    )
}
