//! Contract endpoints
//!
//! PATCH validates status changes against the contract lifecycle table
//! and rejects illegal pairs with 400 before touching any state. A
//! `force` flag in the body bypasses the check entirely.

use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use std::sync::Arc;

use crate::db::contracts::{self, ContractPatch, NewContract};
use crate::lifecycle::{validate_transition, LifecycleKind};
use crate::routes::{
    authenticate, error_response, fire_triggers, json_response, method_not_allowed, not_found,
    parse_json_body, query_param, record_activity, split_path, AuthContext, BoxBody,
};
use crate::server::AppState;

pub async fn handle_contracts_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    path: String,
) -> Response<BoxBody> {
    let ctx = match authenticate(&req, &state) {
        Ok(ctx) => ctx,
        Err(e) => return error_response(&e),
    };

    let status_filter = query_param(&req, "status");
    let client_filter = query_param(&req, "clientId");

    match (req.method().clone(), split_path(&path, "/api/contracts")) {
        (Method::GET, None) => list(
            &state,
            &ctx,
            status_filter.as_deref(),
            client_filter.as_deref(),
        ),
        (Method::POST, None) => create(req, state.clone(), ctx).await,
        (Method::GET, Some((id, None))) => get(&state, &ctx, id),
        (Method::PATCH, Some((id, None))) => patch(req, state.clone(), ctx, id.to_string()).await,
        (Method::DELETE, Some((id, None))) => delete(&state, &ctx, id),
        _ => method_not_allowed(),
    }
}

fn list(
    state: &AppState,
    ctx: &AuthContext,
    status: Option<&str>,
    client_id: Option<&str>,
) -> Response<BoxBody> {
    let conn = match state.store.conn() {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };
    match contracts::list_contracts(&conn, &ctx.tenant_id, status, client_id) {
        Ok(rows) => json_response(StatusCode::OK, &serde_json::json!({ "contracts": rows })),
        Err(e) => error_response(&e),
    }
}

async fn create(
    req: Request<Incoming>,
    state: Arc<AppState>,
    ctx: AuthContext,
) -> Response<BoxBody> {
    let body: NewContract = match parse_json_body(req, state.args.max_body_bytes).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    if body.title.trim().is_empty() {
        return json_response(
            StatusCode::BAD_REQUEST,
            &serde_json::json!({ "error": "Missing required field: title" }),
        );
    }

    let conn = match state.store.conn() {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    let contract = match contracts::create_contract(&conn, &ctx.tenant_id, &body) {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    record_activity(&conn, &ctx, "contract", &contract.id, "created", Some(&contract.title));

    json_response(
        StatusCode::CREATED,
        &serde_json::json!({ "contract": contract }),
    )
}

fn get(state: &AppState, ctx: &AuthContext, id: &str) -> Response<BoxBody> {
    let conn = match state.store.conn() {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };
    match contracts::get_contract(&conn, &ctx.tenant_id, id) {
        Ok(Some(contract)) => {
            json_response(StatusCode::OK, &serde_json::json!({ "contract": contract }))
        }
        Ok(None) => not_found("contract"),
        Err(e) => error_response(&e),
    }
}

async fn patch(
    req: Request<Incoming>,
    state: Arc<AppState>,
    ctx: AuthContext,
    id: String,
) -> Response<BoxBody> {
    let body: ContractPatch = match parse_json_body(req, state.args.max_body_bytes).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    let conn = match state.store.conn() {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    let existing = match contracts::get_contract(&conn, &ctx.tenant_id, &id) {
        Ok(Some(c)) => c,
        Ok(None) => return not_found("contract"),
        Err(e) => return error_response(&e),
    };

    let mut newly_signed = false;
    if let Some(ref next) = body.status {
        if *next != existing.status {
            if !body.force {
                if let Err(e) =
                    validate_transition(LifecycleKind::Contract, &existing.status, next)
                {
                    return json_response(
                        StatusCode::BAD_REQUEST,
                        &serde_json::json!({ "error": e.to_string() }),
                    );
                }
            }
            newly_signed = next == "signed";
        }
    }

    match contracts::update_contract(&conn, &ctx.tenant_id, &id, &body) {
        Ok(Some(contract)) => {
            record_activity(&conn, &ctx, "contract", &contract.id, "updated", None);
            if newly_signed {
                fire_triggers(
                    &conn,
                    &ctx,
                    "contract.signed",
                    serde_json::json!({ "contractId": contract.id, "title": contract.title }),
                );
            }
            json_response(StatusCode::OK, &serde_json::json!({ "contract": contract }))
        }
        Ok(None) => not_found("contract"),
        Err(e) => error_response(&e),
    }
}

fn delete(state: &AppState, ctx: &AuthContext, id: &str) -> Response<BoxBody> {
    let conn = match state.store.conn() {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };
    match contracts::delete_contract(&conn, &ctx.tenant_id, id) {
        Ok(true) => {
            record_activity(&conn, ctx, "contract", id, "deleted", None);
            json_response(StatusCode::OK, &serde_json::json!({ "success": true }))
        }
        Ok(false) => not_found("contract"),
        Err(e) => error_response(&e),
    }
}
