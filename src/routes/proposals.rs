//! Proposal endpoints
//!
//! Same shape as contracts; acceptance fires the proposal.accepted
//! workflow trigger.

use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use std::sync::Arc;

use crate::db::proposals::{self, NewProposal, ProposalPatch};
use crate::lifecycle::{validate_transition, LifecycleKind};
use crate::routes::{
    authenticate, error_response, fire_triggers, json_response, method_not_allowed, not_found,
    parse_json_body, query_param, record_activity, split_path, AuthContext, BoxBody,
};
use crate::server::AppState;

pub async fn handle_proposals_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    path: String,
) -> Response<BoxBody> {
    let ctx = match authenticate(&req, &state) {
        Ok(ctx) => ctx,
        Err(e) => return error_response(&e),
    };

    let status_filter = query_param(&req, "status");

    match (req.method().clone(), split_path(&path, "/api/proposals")) {
        (Method::GET, None) => list(&state, &ctx, status_filter.as_deref()),
        (Method::POST, None) => create(req, state.clone(), ctx).await,
        (Method::GET, Some((id, None))) => get(&state, &ctx, id),
        (Method::PATCH, Some((id, None))) => patch(req, state.clone(), ctx, id.to_string()).await,
        (Method::DELETE, Some((id, None))) => delete(&state, &ctx, id),
        _ => method_not_allowed(),
    }
}

fn list(state: &AppState, ctx: &AuthContext, status: Option<&str>) -> Response<BoxBody> {
    let conn = match state.store.conn() {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };
    match proposals::list_proposals(&conn, &ctx.tenant_id, status) {
        Ok(rows) => json_response(StatusCode::OK, &serde_json::json!({ "proposals": rows })),
        Err(e) => error_response(&e),
    }
}

async fn create(
    req: Request<Incoming>,
    state: Arc<AppState>,
    ctx: AuthContext,
) -> Response<BoxBody> {
    let body: NewProposal = match parse_json_body(req, state.args.max_body_bytes).await {
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

    let proposal = match proposals::create_proposal(&conn, &ctx.tenant_id, &body) {
        Ok(p) => p,
        Err(e) => return error_response(&e),
    };

    record_activity(&conn, &ctx, "proposal", &proposal.id, "created", Some(&proposal.title));

    json_response(
        StatusCode::CREATED,
        &serde_json::json!({ "proposal": proposal }),
    )
}

fn get(state: &AppState, ctx: &AuthContext, id: &str) -> Response<BoxBody> {
    let conn = match state.store.conn() {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };
    match proposals::get_proposal(&conn, &ctx.tenant_id, id) {
        Ok(Some(proposal)) => {
            json_response(StatusCode::OK, &serde_json::json!({ "proposal": proposal }))
        }
        Ok(None) => not_found("proposal"),
        Err(e) => error_response(&e),
    }
}

async fn patch(
    req: Request<Incoming>,
    state: Arc<AppState>,
    ctx: AuthContext,
    id: String,
) -> Response<BoxBody> {
    let body: ProposalPatch = match parse_json_body(req, state.args.max_body_bytes).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    let conn = match state.store.conn() {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    let existing = match proposals::get_proposal(&conn, &ctx.tenant_id, &id) {
        Ok(Some(p)) => p,
        Ok(None) => return not_found("proposal"),
        Err(e) => return error_response(&e),
    };

    let mut newly_accepted = false;
    if let Some(ref next) = body.status {
        if *next != existing.status {
            if !body.force {
                if let Err(e) =
                    validate_transition(LifecycleKind::Proposal, &existing.status, next)
                {
                    return json_response(
                        StatusCode::BAD_REQUEST,
                        &serde_json::json!({ "error": e.to_string() }),
                    );
                }
            }
            newly_accepted = next == "accepted";
        }
    }

    match proposals::update_proposal(&conn, &ctx.tenant_id, &id, &body) {
        Ok(Some(proposal)) => {
            record_activity(&conn, &ctx, "proposal", &proposal.id, "updated", None);
            if newly_accepted {
                fire_triggers(
                    &conn,
                    &ctx,
                    "proposal.accepted",
                    serde_json::json!({ "proposalId": proposal.id, "title": proposal.title }),
                );
            }
            json_response(StatusCode::OK, &serde_json::json!({ "proposal": proposal }))
        }
        Ok(None) => not_found("proposal"),
        Err(e) => error_response(&e),
    }
}

fn delete(state: &AppState, ctx: &AuthContext, id: &str) -> Response<BoxBody> {
    let conn = match state.store.conn() {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };
    match proposals::delete_proposal(&conn, &ctx.tenant_id, id) {
        Ok(true) => {
            record_activity(&conn, ctx, "proposal", id, "deleted", None);
            json_response(StatusCode::OK, &serde_json::json!({ "success": true }))
        }
        Ok(false) => not_found("proposal"),
        Err(e) => error_response(&e),
    }
}
