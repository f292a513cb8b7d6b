//! Time entry endpoints
//!
//! Members log time against themselves; managers may log for others.

use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use std::sync::Arc;

use crate::auth::Role;
use crate::db::time_entries::{self, NewTimeEntry};
use crate::routes::{
    authenticate, error_response, json_response, method_not_allowed, not_found, parse_json_body,
    query_param, require_role, split_path, AuthContext, BoxBody,
};
use crate::server::AppState;

pub async fn handle_time_entries_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    path: String,
) -> Response<BoxBody> {
    let ctx = match authenticate(&req, &state) {
        Ok(ctx) => ctx,
        Err(e) => return error_response(&e),
    };

    let user_filter = query_param(&req, "userId");
    let from = query_param(&req, "from");
    let to = query_param(&req, "to");

    match (req.method().clone(), split_path(&path, "/api/time-entries")) {
        (Method::GET, None) => list(
            &state,
            &ctx,
            user_filter.as_deref(),
            from.as_deref(),
            to.as_deref(),
        ),
        (Method::POST, None) => create(req, state.clone(), ctx).await,
        (Method::DELETE, Some((id, None))) => delete(&state, &ctx, id),
        _ => method_not_allowed(),
    }
}

fn list(
    state: &AppState,
    ctx: &AuthContext,
    user_id: Option<&str>,
    from: Option<&str>,
    to: Option<&str>,
) -> Response<BoxBody> {
    let conn = match state.store.conn() {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };
    match time_entries::list_time_entries(&conn, &ctx.tenant_id, user_id, from, to) {
        Ok(rows) => json_response(StatusCode::OK, &serde_json::json!({ "timeEntries": rows })),
        Err(e) => error_response(&e),
    }
}

async fn create(
    req: Request<Incoming>,
    state: Arc<AppState>,
    ctx: AuthContext,
) -> Response<BoxBody> {
    let body: NewTimeEntry = match parse_json_body(req, state.args.max_body_bytes).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    if body.hours <= 0.0 || body.hours > 24.0 {
        return json_response(
            StatusCode::BAD_REQUEST,
            &serde_json::json!({ "error": "Hours must be between 0 and 24" }),
        );
    }

    // Logging for someone else requires manager
    let user_id = match &body.user_id {
        Some(other) if *other != ctx.user_id => {
            if let Err(e) = require_role(&ctx, Role::Manager) {
                return error_response(&e);
            }
            other.clone()
        }
        _ => ctx.user_id.clone(),
    };

    let conn = match state.store.conn() {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    match time_entries::create_time_entry(&conn, &ctx.tenant_id, &user_id, &body) {
        Ok(entry) => json_response(
            StatusCode::CREATED,
            &serde_json::json!({ "timeEntry": entry }),
        ),
        Err(e) => error_response(&e),
    }
}

fn delete(state: &AppState, ctx: &AuthContext, id: &str) -> Response<BoxBody> {
    let conn = match state.store.conn() {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };
    match time_entries::delete_time_entry(&conn, &ctx.tenant_id, id) {
        Ok(true) => json_response(StatusCode::OK, &serde_json::json!({ "success": true })),
        Ok(false) => not_found("time entry"),
        Err(e) => error_response(&e),
    }
}
