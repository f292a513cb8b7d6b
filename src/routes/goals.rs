//! Goal endpoints
//!
//! Reading a goal recomputes its metric over the goal window and
//! persists the refreshed `current_value` before returning.

use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use std::sync::Arc;

use crate::db::goals::{self, NewGoal, GOAL_METRICS};
use crate::routes::{
    authenticate, error_response, json_response, method_not_allowed, not_found, parse_json_body,
    record_activity, split_path, AuthContext, BoxBody,
};
use crate::server::AppState;

pub async fn handle_goals_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    path: String,
) -> Response<BoxBody> {
    let ctx = match authenticate(&req, &state) {
        Ok(ctx) => ctx,
        Err(e) => return error_response(&e),
    };

    match (req.method().clone(), split_path(&path, "/api/goals")) {
        (Method::GET, None) => list(&state, &ctx),
        (Method::POST, None) => create(req, state.clone(), ctx).await,
        (Method::GET, Some((id, None))) => get(&state, &ctx, id),
        (Method::DELETE, Some((id, None))) => delete(&state, &ctx, id),
        _ => method_not_allowed(),
    }
}

fn list(state: &AppState, ctx: &AuthContext) -> Response<BoxBody> {
    let conn = match state.store.conn() {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };
    match goals::list_goals(&conn, &ctx.tenant_id) {
        Ok(rows) => json_response(StatusCode::OK, &serde_json::json!({ "goals": rows })),
        Err(e) => error_response(&e),
    }
}

async fn create(
    req: Request<Incoming>,
    state: Arc<AppState>,
    ctx: AuthContext,
) -> Response<BoxBody> {
    let body: NewGoal = match parse_json_body(req, state.args.max_body_bytes).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    if !GOAL_METRICS.contains(&body.metric.as_str()) {
        return json_response(
            StatusCode::BAD_REQUEST,
            &serde_json::json!({
                "error": format!("Unknown goal metric: {}", body.metric)
            }),
        );
    }
    if body.target_value <= 0.0 {
        return json_response(
            StatusCode::BAD_REQUEST,
            &serde_json::json!({ "error": "Target value must be positive" }),
        );
    }

    let conn = match state.store.conn() {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    let goal = match goals::create_goal(&conn, &ctx.tenant_id, &body) {
        Ok(g) => g,
        Err(e) => return error_response(&e),
    };

    record_activity(&conn, &ctx, "goal", &goal.id, "created", Some(&goal.metric));

    json_response(StatusCode::CREATED, &serde_json::json!({ "goal": goal }))
}

fn get(state: &AppState, ctx: &AuthContext, id: &str) -> Response<BoxBody> {
    let conn = match state.store.conn() {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };
    // Recompute-on-read: the stored current_value is refreshed first
    match goals::refresh_goal(&conn, &ctx.tenant_id, id) {
        Ok(Some(goal)) => json_response(StatusCode::OK, &serde_json::json!({ "goal": goal })),
        Ok(None) => not_found("goal"),
        Err(e) => error_response(&e),
    }
}

fn delete(state: &AppState, ctx: &AuthContext, id: &str) -> Response<BoxBody> {
    let conn = match state.store.conn() {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };
    match goals::delete_goal(&conn, &ctx.tenant_id, id) {
        Ok(true) => json_response(StatusCode::OK, &serde_json::json!({ "success": true })),
        Ok(false) => not_found("goal"),
        Err(e) => error_response(&e),
    }
}
