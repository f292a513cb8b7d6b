//! Health check endpoints
//!
//! - /health, /healthz - liveness probe (is the service running?)
//! - /ready, /readyz   - readiness probe (is the database reachable?)
//! - /version          - build info for deployment verification
//! - /status           - runtime stats

use hyper::{Response, StatusCode};
use serde::Serialize;

use crate::routes::{json_response, BoxBody};
use crate::server::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: &'static str,
    pub uptime: u64,
    pub node_id: String,
    pub mode: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionResponse {
    pub name: &'static str,
    pub version: &'static str,
    pub git_commit: &'static str,
    pub built_at: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub healthy: bool,
    pub version: &'static str,
    pub uptime_secs: u64,
    pub node_id: String,
    pub database_ok: bool,
    pub tenant_count: Option<u32>,
}

/// Liveness probe
pub fn health_check(state: &AppState) -> Response<BoxBody> {
    json_response(
        StatusCode::OK,
        &HealthResponse {
            healthy: true,
            version: env!("CARGO_PKG_VERSION"),
            uptime: state.uptime_secs(),
            node_id: state.args.node_id.to_string(),
            mode: if state.args.dev_mode {
                "development".into()
            } else {
                "production".into()
            },
        },
    )
}

/// Readiness probe - 200 only when the database answers
pub fn readiness_check(state: &AppState) -> Response<BoxBody> {
    let ready = state
        .store
        .conn()
        .and_then(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i32>(0))
                .map_err(crate::types::AtriumError::from)
        })
        .is_ok();

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    json_response(status, &serde_json::json!({ "ready": ready }))
}

/// Build info
pub fn version_info() -> Response<BoxBody> {
    json_response(
        StatusCode::OK,
        &VersionResponse {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            git_commit: env!("GIT_COMMIT_SHORT"),
            built_at: env!("BUILD_TIMESTAMP"),
        },
    )
}

/// Runtime stats
pub fn status_check(state: &AppState) -> Response<BoxBody> {
    let (database_ok, tenant_count) = match state.store.conn() {
        Ok(conn) => {
            let count = conn
                .query_row("SELECT COUNT(*) FROM tenants", [], |row| row.get::<_, u32>(0))
                .ok();
            (count.is_some(), count)
        }
        Err(_) => (false, None),
    };

    json_response(
        StatusCode::OK,
        &StatusResponse {
            healthy: database_ok,
            version: env!("CARGO_PKG_VERSION"),
            uptime_secs: state.uptime_secs(),
            node_id: state.args.node_id.to_string(),
            database_ok,
            tenant_count,
        },
    )
}
