//! Calendar event endpoints

use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use std::sync::Arc;

use crate::db::events::{self, EventPatch, NewEvent};
use crate::routes::{
    authenticate, error_response, json_response, method_not_allowed, not_found, parse_json_body,
    query_param, record_activity, split_path, AuthContext, BoxBody,
};
use crate::server::AppState;

pub async fn handle_events_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    path: String,
) -> Response<BoxBody> {
    let ctx = match authenticate(&req, &state) {
        Ok(ctx) => ctx,
        Err(e) => return error_response(&e),
    };

    let client_filter = query_param(&req, "clientId");

    match (req.method().clone(), split_path(&path, "/api/events")) {
        (Method::GET, None) => list(&state, &ctx, client_filter.as_deref()),
        (Method::POST, None) => create(req, state.clone(), ctx).await,
        (Method::GET, Some((id, None))) => get(&state, &ctx, id),
        (Method::PATCH, Some((id, None))) => patch(req, state.clone(), ctx, id.to_string()).await,
        (Method::DELETE, Some((id, None))) => delete(&state, &ctx, id),
        _ => method_not_allowed(),
    }
}

fn list(state: &AppState, ctx: &AuthContext, client_id: Option<&str>) -> Response<BoxBody> {
    let conn = match state.store.conn() {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };
    match events::list_events(&conn, &ctx.tenant_id, client_id) {
        Ok(rows) => json_response(StatusCode::OK, &serde_json::json!({ "events": rows })),
        Err(e) => error_response(&e),
    }
}

async fn create(
    req: Request<Incoming>,
    state: Arc<AppState>,
    ctx: AuthContext,
) -> Response<BoxBody> {
    let body: NewEvent = match parse_json_body(req, state.args.max_body_bytes).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    if body.title.trim().is_empty() || body.starts_at.trim().is_empty() {
        return json_response(
            StatusCode::BAD_REQUEST,
            &serde_json::json!({ "error": "Missing required fields: title, startsAt" }),
        );
    }

    let conn = match state.store.conn() {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    let event = match events::create_event(&conn, &ctx.tenant_id, &body) {
        Ok(ev) => ev,
        Err(e) => return error_response(&e),
    };

    record_activity(&conn, &ctx, "event", &event.id, "created", Some(&event.title));

    json_response(StatusCode::CREATED, &serde_json::json!({ "event": event }))
}

fn get(state: &AppState, ctx: &AuthContext, id: &str) -> Response<BoxBody> {
    let conn = match state.store.conn() {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };
    match events::get_event(&conn, &ctx.tenant_id, id) {
        Ok(Some(event)) => json_response(StatusCode::OK, &serde_json::json!({ "event": event })),
        Ok(None) => not_found("event"),
        Err(e) => error_response(&e),
    }
}

async fn patch(
    req: Request<Incoming>,
    state: Arc<AppState>,
    ctx: AuthContext,
    id: String,
) -> Response<BoxBody> {
    let body: EventPatch = match parse_json_body(req, state.args.max_body_bytes).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    let conn = match state.store.conn() {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    match events::update_event(&conn, &ctx.tenant_id, &id, &body) {
        Ok(Some(event)) => {
            record_activity(&conn, &ctx, "event", &event.id, "updated", None);
            json_response(StatusCode::OK, &serde_json::json!({ "event": event }))
        }
        Ok(None) => not_found("event"),
        Err(e) => error_response(&e),
    }
}

fn delete(state: &AppState, ctx: &AuthContext, id: &str) -> Response<BoxBody> {
    let conn = match state.store.conn() {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };
    match events::delete_event(&conn, &ctx.tenant_id, id) {
        Ok(true) => {
            record_activity(&conn, ctx, "event", id, "deleted", None);
            json_response(StatusCode::OK, &serde_json::json!({ "success": true }))
        }
        Ok(false) => not_found("event"),
        Err(e) => error_response(&e),
    }
}
