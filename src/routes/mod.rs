//! HTTP routes for atrium
//!
//! Every tenant endpoint follows the same shape: authenticate the
//! session, resolve the caller's tenant, validate the body, perform the
//! CRUD, then fire best-effort secondary writes (activity log, workflow
//! triggers) whose failures are logged and swallowed.

pub mod activity;
pub mod auth_routes;
pub mod clients;
pub mod contracts;
pub mod events;
pub mod goals;
pub mod health;
pub mod invoices;
pub mod leads;
pub mod payroll;
pub mod portal;
pub mod projects;
pub mod proposals;
pub mod resources;
pub mod surveys;
pub mod tasks;
pub mod team;
pub mod time_entries;
pub mod workflows;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::auth::{extract_session_cookie, extract_token_from_header, Role};
use crate::db::{activity as activity_db, projects as projects_db, tenants, workflows as workflows_db};
use crate::plans::Feature;
use crate::server::AppState;
use crate::types::AtriumError;

pub type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Error body shape shared by all endpoints
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// The authenticated caller: user, tenant, role
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: String,
    pub tenant_id: String,
    pub email: String,
    pub role: Role,
}

// =============================================================================
// Response helpers
// =============================================================================

pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<BoxBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, PATCH, DELETE, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type, Authorization")
        .body(full_body(json))
        .unwrap()
}

pub fn error_response(err: &AtriumError) -> Response<BoxBody> {
    json_response(
        err.status_code(),
        &ErrorResponse {
            error: err.to_string(),
            code: None,
        },
    )
}

pub fn error_with_code(
    status: StatusCode,
    error: impl Into<String>,
    code: impl Into<String>,
) -> Response<BoxBody> {
    json_response(
        status,
        &ErrorResponse {
            error: error.into(),
            code: Some(code.into()),
        },
    )
}

pub fn not_found(what: &str) -> Response<BoxBody> {
    json_response(
        StatusCode::NOT_FOUND,
        &ErrorResponse {
            error: format!("{} not found", what),
            code: None,
        },
    )
}

pub fn method_not_allowed() -> Response<BoxBody> {
    json_response(
        StatusCode::METHOD_NOT_ALLOWED,
        &ErrorResponse {
            error: "Method not allowed".into(),
            code: None,
        },
    )
}

pub fn cors_preflight() -> Response<BoxBody> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, PATCH, DELETE, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type, Authorization")
        .header("Access-Control-Max-Age", "86400")
        .body(empty_body())
        .unwrap()
}

pub fn full_body(data: impl Into<Bytes>) -> BoxBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

pub fn empty_body() -> BoxBody {
    Full::new(Bytes::new())
        .map_err(|never| match never {})
        .boxed()
}

// =============================================================================
// Request helpers
// =============================================================================

/// Read and deserialize a JSON body, enforcing the configured size cap
pub async fn parse_json_body<T: for<'de> Deserialize<'de>>(
    req: Request<Incoming>,
    max_bytes: usize,
) -> Result<T, AtriumError> {
    let body = req
        .collect()
        .await
        .map_err(|e| AtriumError::Http(format!("Failed to read body: {}", e)))?;

    let bytes = body.to_bytes();
    if bytes.len() > max_bytes {
        return Err(AtriumError::Http("Request body too large".into()));
    }

    serde_json::from_slice(&bytes).map_err(|e| AtriumError::Http(format!("Invalid JSON: {}", e)))
}

/// Resolve the session token (cookie first, then Authorization header)
/// into the caller's auth context
pub fn authenticate(
    req: &Request<Incoming>,
    state: &AppState,
) -> Result<AuthContext, AtriumError> {
    let cookie_header = req
        .headers()
        .get(hyper::header::COOKIE)
        .and_then(|v| v.to_str().ok());
    let auth_header = req
        .headers()
        .get(hyper::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let token = extract_session_cookie(cookie_header)
        .or_else(|| extract_token_from_header(auth_header))
        .ok_or_else(|| AtriumError::Unauthorized("Missing session".into()))?;

    let result = state.sessions.verify(token);
    let claims = match result.claims {
        Some(claims) if result.valid => claims,
        _ => {
            return Err(AtriumError::Unauthorized(
                result.error.unwrap_or_else(|| "Invalid session".into()),
            ))
        }
    };

    Ok(AuthContext {
        user_id: claims.sub,
        tenant_id: claims.tenant_id,
        email: claims.email,
        role: claims.role,
    })
}

/// Enforce a minimum role
pub fn require_role(ctx: &AuthContext, required: Role) -> Result<(), AtriumError> {
    if ctx.role.at_least(required) {
        Ok(())
    } else {
        Err(AtriumError::Forbidden(format!(
            "Requires {} role or above",
            required
        )))
    }
}

/// Enforce a plan feature gate for the caller's tenant.
///
/// Gated features 403 with an UPGRADE_REQUIRED code so the UI can route
/// the tenant to the billing page.
pub fn require_feature(
    conn: &rusqlite::Connection,
    ctx: &AuthContext,
    feature: Feature,
) -> Result<(), Response<BoxBody>> {
    let plan = match tenants::get_tenant_plan(conn, &ctx.tenant_id) {
        Ok(plan) => plan,
        Err(e) => return Err(error_response(&e)),
    };

    if plan.allows(feature) {
        Ok(())
    } else {
        Err(error_with_code(
            StatusCode::FORBIDDEN,
            format!("Your plan does not include {}", feature),
            "UPGRADE_REQUIRED",
        ))
    }
}

/// Extract a query parameter from a request URI
pub fn query_param(req: &Request<Incoming>, name: &str) -> Option<String> {
    let query = req.uri().query()?;
    for pair in query.split('&') {
        if let Some((key, value)) = pair.split_once('=') {
            if key == name && !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}

/// Split `/api/<resource>/{id}[/rest]` into (id, rest)
pub fn split_path<'a>(path: &'a str, prefix: &str) -> Option<(&'a str, Option<&'a str>)> {
    let remainder = path.strip_prefix(prefix)?.strip_prefix('/')?;
    if remainder.is_empty() {
        return None;
    }
    match remainder.split_once('/') {
        Some((id, rest)) if !rest.is_empty() => Some((id, Some(rest))),
        Some((id, _)) => Some((id, None)),
        None => Some((remainder, None)),
    }
}

// =============================================================================
// Best-effort secondary writes
// =============================================================================

/// Record an activity-log entry after a committed primary write.
///
/// Failures are logged and swallowed; the primary write stays committed
/// without a log entry.
pub fn record_activity(
    conn: &rusqlite::Connection,
    ctx: &AuthContext,
    entity_kind: &str,
    entity_id: &str,
    verb: &str,
    detail: Option<&str>,
) {
    if let Err(e) = activity_db::record(
        conn,
        &ctx.tenant_id,
        Some(&ctx.user_id),
        entity_kind,
        entity_id,
        verb,
        detail,
    ) {
        warn!(
            "Activity log write failed for {} {} ({}): {}",
            entity_kind, entity_id, verb, e
        );
    }
}

/// Fire workflow triggers listening for `trigger` after a committed
/// primary write.
///
/// Each matching rule records a run row and applies its action.
/// Failures are logged and swallowed; no retry, no rollback.
pub fn fire_triggers(
    conn: &rusqlite::Connection,
    ctx: &AuthContext,
    trigger: &str,
    payload: serde_json::Value,
) {
    let rules = match workflows_db::workflows_for_trigger(conn, &ctx.tenant_id, trigger) {
        Ok(rules) => rules,
        Err(e) => {
            warn!("Workflow lookup failed for trigger {}: {}", trigger, e);
            return;
        }
    };

    for rule in rules {
        if let Err(e) = workflows_db::record_run(conn, &ctx.tenant_id, &rule.id, trigger, &payload)
        {
            warn!("Workflow run insert failed for {}: {}", rule.id, e);
            continue;
        }

        if rule.action == "create_task" {
            let title = rule
                .params
                .as_ref()
                .and_then(|p| p.get("title"))
                .and_then(|t| t.as_str())
                .map(String::from)
                .unwrap_or_else(|| format!("Follow up: {}", trigger));

            let task = projects_db::NewTask {
                title,
                project_id: None,
                assignee_id: None,
                estimate_hours: None,
            };
            if let Err(e) = projects_db::create_task(conn, &ctx.tenant_id, &task) {
                warn!("Workflow task creation failed for {}: {}", rule.id, e);
            }
        }
    }
}
