//! Client endpoints
//!
//! - GET    /api/clients       - list tenant clients
//! - POST   /api/clients       - create (duplicate-checked, plan-capped)
//! - GET    /api/clients/{id}  - fetch one
//! - PATCH  /api/clients/{id}  - update allow-listed fields
//! - DELETE /api/clients/{id}  - delete

use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use std::sync::Arc;

use crate::auth::Role;
use crate::db::clients::{self, ClientPatch, NewClient};
use crate::db::tenants;
use crate::dedupe;
use crate::plans::{limits_for, PlanLimits};
use crate::routes::{
    authenticate, error_response, fire_triggers, json_response, method_not_allowed, not_found,
    parse_json_body, record_activity, require_role, split_path, BoxBody,
};
use crate::server::AppState;

pub async fn handle_clients_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    path: String,
) -> Response<BoxBody> {
    let ctx = match authenticate(&req, &state) {
        Ok(ctx) => ctx,
        Err(e) => return error_response(&e),
    };

    match (req.method().clone(), split_path(&path, "/api/clients")) {
        (Method::GET, None) => list(&state, &ctx),
        (Method::POST, None) => create(req, state.clone(), ctx).await,
        (Method::GET, Some((id, None))) => get(&state, &ctx, id),
        (Method::PATCH, Some((id, None))) => patch(req, state.clone(), ctx, id.to_string()).await,
        (Method::DELETE, Some((id, None))) => delete(&state, &ctx, id),
        _ => method_not_allowed(),
    }
}

fn list(state: &AppState, ctx: &crate::routes::AuthContext) -> Response<BoxBody> {
    let conn = match state.store.conn() {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };
    match clients::list_clients(&conn, &ctx.tenant_id) {
        Ok(rows) => json_response(StatusCode::OK, &serde_json::json!({ "clients": rows })),
        Err(e) => error_response(&e),
    }
}

async fn create(
    req: Request<Incoming>,
    state: Arc<AppState>,
    ctx: crate::routes::AuthContext,
) -> Response<BoxBody> {
    let body: NewClient = match parse_json_body(req, state.args.max_body_bytes).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    if body.name.trim().is_empty() {
        return json_response(
            StatusCode::BAD_REQUEST,
            &serde_json::json!({ "error": "Missing required field: name" }),
        );
    }

    let conn = match state.store.conn() {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    // Plan cap check before any write
    let plan = match tenants::get_tenant_plan(&conn, &ctx.tenant_id) {
        Ok(p) => p,
        Err(e) => return error_response(&e),
    };
    let limits = limits_for(plan);
    let current = match clients::count_clients(&conn, &ctx.tenant_id) {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };
    if !PlanLimits::within(limits.max_clients, current) {
        return json_response(
            StatusCode::FORBIDDEN,
            &serde_json::json!({
                "error": "Client limit reached for your plan",
                "code": "UPGRADE_REQUIRED",
                "limit": limits.max_clients,
            }),
        );
    }

    // Duplicate check unless forced
    if !body.force {
        let rows = match clients::contact_rows(&conn, &ctx.tenant_id) {
            Ok(rows) => rows,
            Err(e) => return error_response(&e),
        };
        let duplicates = dedupe::find_candidates(
            &rows,
            body.email.as_deref(),
            body.company.as_deref(),
            state.args.duplicate_candidate_cap,
        );
        if !duplicates.is_empty() {
            return json_response(
                StatusCode::CONFLICT,
                &serde_json::json!({
                    "error": "Possible duplicate clients found",
                    "code": "DUPLICATE_WARNING",
                    "duplicates": duplicates,
                }),
            );
        }
    }

    let client = match clients::create_client(&conn, &ctx.tenant_id, &body) {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    record_activity(&conn, &ctx, "client", &client.id, "created", Some(&client.name));
    fire_triggers(
        &conn,
        &ctx,
        "client.created",
        serde_json::json!({ "clientId": client.id, "name": client.name }),
    );

    json_response(StatusCode::CREATED, &serde_json::json!({ "client": client }))
}

fn get(state: &AppState, ctx: &crate::routes::AuthContext, id: &str) -> Response<BoxBody> {
    let conn = match state.store.conn() {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };
    match clients::get_client(&conn, &ctx.tenant_id, id) {
        Ok(Some(client)) => json_response(StatusCode::OK, &serde_json::json!({ "client": client })),
        Ok(None) => not_found("client"),
        Err(e) => error_response(&e),
    }
}

async fn patch(
    req: Request<Incoming>,
    state: Arc<AppState>,
    ctx: crate::routes::AuthContext,
    id: String,
) -> Response<BoxBody> {
    let body: ClientPatch = match parse_json_body(req, state.args.max_body_bytes).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    let conn = match state.store.conn() {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    match clients::update_client(&conn, &ctx.tenant_id, &id, &body) {
        Ok(Some(client)) => {
            record_activity(&conn, &ctx, "client", &client.id, "updated", None);
            json_response(StatusCode::OK, &serde_json::json!({ "client": client }))
        }
        Ok(None) => not_found("client"),
        Err(e) => error_response(&e),
    }
}

fn delete(state: &AppState, ctx: &crate::routes::AuthContext, id: &str) -> Response<BoxBody> {
    if let Err(e) = require_role(ctx, Role::Manager) {
        return error_response(&e);
    }

    let conn = match state.store.conn() {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };
    match clients::delete_client(&conn, &ctx.tenant_id, id) {
        Ok(true) => {
            record_activity(&conn, ctx, "client", id, "deleted", None);
            json_response(StatusCode::OK, &serde_json::json!({ "success": true }))
        }
        Ok(false) => not_found("client"),
        Err(e) => error_response(&e),
    }
}
