//! Activity log endpoint

use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use std::sync::Arc;

use crate::db::activity;
use crate::routes::{
    authenticate, error_response, json_response, method_not_allowed, query_param, BoxBody,
};
use crate::server::AppState;

const DEFAULT_LIMIT: u32 = 50;
const MAX_LIMIT: u32 = 500;

pub async fn handle_activity_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let ctx = match authenticate(&req, &state) {
        Ok(ctx) => ctx,
        Err(e) => return error_response(&e),
    };

    if req.method() != Method::GET {
        return method_not_allowed();
    }

    let limit = query_param(&req, "limit")
        .and_then(|l| l.parse::<u32>().ok())
        .unwrap_or(DEFAULT_LIMIT)
        .clamp(1, MAX_LIMIT);

    let conn = match state.store.conn() {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };
    match activity::list_recent(&conn, &ctx.tenant_id, limit) {
        Ok(rows) => json_response(StatusCode::OK, &serde_json::json!({ "activity": rows })),
        Err(e) => error_response(&e),
    }
}
