//! Lead endpoints
//!
//! - GET    /api/leads              - list (optional ?status= filter)
//! - POST   /api/leads              - create (duplicate-checked)
//! - GET    /api/leads/{id}         - fetch one
//! - PATCH  /api/leads/{id}         - update; status changes are
//!                                    transition-checked unless forced
//! - DELETE /api/leads/{id}         - delete
//! - POST   /api/leads/{id}/convert - qualified lead -> client

use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;

use crate::db::clients::{self, NewClient};
use crate::db::leads::{self, LeadPatch, NewLead};
use crate::dedupe;
use crate::lifecycle::{validate_transition, LifecycleKind};
use crate::routes::{
    authenticate, error_response, fire_triggers, json_response, method_not_allowed, not_found,
    parse_json_body, query_param, record_activity, split_path, AuthContext, BoxBody,
};
use crate::server::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConvertRequest {
    /// Convert regardless of the lead's current status
    #[serde(default)]
    pub force: bool,
}

pub async fn handle_leads_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    path: String,
) -> Response<BoxBody> {
    let ctx = match authenticate(&req, &state) {
        Ok(ctx) => ctx,
        Err(e) => return error_response(&e),
    };

    let status_filter = query_param(&req, "status");

    match (req.method().clone(), split_path(&path, "/api/leads")) {
        (Method::GET, None) => list(&state, &ctx, status_filter.as_deref()),
        (Method::POST, None) => create(req, state.clone(), ctx).await,
        (Method::GET, Some((id, None))) => get(&state, &ctx, id),
        (Method::PATCH, Some((id, None))) => patch(req, state.clone(), ctx, id.to_string()).await,
        (Method::DELETE, Some((id, None))) => delete(&state, &ctx, id),
        (Method::POST, Some((id, Some("convert")))) => {
            convert(req, state.clone(), ctx, id.to_string()).await
        }
        _ => method_not_allowed(),
    }
}

fn list(state: &AppState, ctx: &AuthContext, status: Option<&str>) -> Response<BoxBody> {
    let conn = match state.store.conn() {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };
    match leads::list_leads(&conn, &ctx.tenant_id, status) {
        Ok(rows) => json_response(StatusCode::OK, &serde_json::json!({ "leads": rows })),
        Err(e) => error_response(&e),
    }
}

async fn create(
    req: Request<Incoming>,
    state: Arc<AppState>,
    ctx: AuthContext,
) -> Response<BoxBody> {
    let body: NewLead = match parse_json_body(req, state.args.max_body_bytes).await {
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

    if !body.force {
        let rows = match leads::contact_rows(&conn, &ctx.tenant_id) {
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
                    "error": "Possible duplicate leads found",
                    "code": "DUPLICATE_WARNING",
                    "duplicates": duplicates,
                }),
            );
        }
    }

    let lead = match leads::create_lead(&conn, &ctx.tenant_id, &body) {
        Ok(l) => l,
        Err(e) => return error_response(&e),
    };

    record_activity(&conn, &ctx, "lead", &lead.id, "created", Some(&lead.name));

    json_response(StatusCode::CREATED, &serde_json::json!({ "lead": lead }))
}

fn get(state: &AppState, ctx: &AuthContext, id: &str) -> Response<BoxBody> {
    let conn = match state.store.conn() {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };
    match leads::get_lead(&conn, &ctx.tenant_id, id) {
        Ok(Some(lead)) => json_response(StatusCode::OK, &serde_json::json!({ "lead": lead })),
        Ok(None) => not_found("lead"),
        Err(e) => error_response(&e),
    }
}

async fn patch(
    req: Request<Incoming>,
    state: Arc<AppState>,
    ctx: AuthContext,
    id: String,
) -> Response<BoxBody> {
    let body: LeadPatch = match parse_json_body(req, state.args.max_body_bytes).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    let conn = match state.store.conn() {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    let existing = match leads::get_lead(&conn, &ctx.tenant_id, &id) {
        Ok(Some(l)) => l,
        Ok(None) => return not_found("lead"),
        Err(e) => return error_response(&e),
    };

    if let Some(ref next) = body.status {
        if *next != existing.status && !body.force {
            if let Err(e) = validate_transition(LifecycleKind::Lead, &existing.status, next) {
                return json_response(
                    StatusCode::BAD_REQUEST,
                    &serde_json::json!({ "error": e.to_string() }),
                );
            }
        }
    }

    match leads::update_lead(&conn, &ctx.tenant_id, &id, &body) {
        Ok(Some(lead)) => {
            record_activity(&conn, &ctx, "lead", &lead.id, "updated", None);
            json_response(StatusCode::OK, &serde_json::json!({ "lead": lead }))
        }
        Ok(None) => not_found("lead"),
        Err(e) => error_response(&e),
    }
}

fn delete(state: &AppState, ctx: &AuthContext, id: &str) -> Response<BoxBody> {
    let conn = match state.store.conn() {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };
    match leads::delete_lead(&conn, &ctx.tenant_id, id) {
        Ok(true) => {
            record_activity(&conn, ctx, "lead", id, "deleted", None);
            json_response(StatusCode::OK, &serde_json::json!({ "success": true }))
        }
        Ok(false) => not_found("lead"),
        Err(e) => error_response(&e),
    }
}

/// Convert a qualified lead into a client.
///
/// The lead moves to `converted` and a client row is inserted from its
/// contact fields. Two sequential writes, no transaction.
async fn convert(
    req: Request<Incoming>,
    state: Arc<AppState>,
    ctx: AuthContext,
    id: String,
) -> Response<BoxBody> {
    let body: ConvertRequest = match parse_json_body(req, state.args.max_body_bytes).await {
        Ok(b) => b,
        Err(_) => ConvertRequest::default(),
    };

    let conn = match state.store.conn() {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    let lead = match leads::get_lead(&conn, &ctx.tenant_id, &id) {
        Ok(Some(l)) => l,
        Ok(None) => return not_found("lead"),
        Err(e) => return error_response(&e),
    };

    if !body.force {
        if let Err(e) = validate_transition(LifecycleKind::Lead, &lead.status, "converted") {
            return json_response(
                StatusCode::BAD_REQUEST,
                &serde_json::json!({ "error": e.to_string() }),
            );
        }
    }

    let client = match clients::create_client(
        &conn,
        &ctx.tenant_id,
        &NewClient {
            name: lead.name.clone(),
            email: lead.email.clone(),
            company: lead.company.clone(),
            phone: None,
            notes: lead.notes.clone(),
            force: true,
        },
    ) {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    if let Err(e) = leads::set_lead_status(&conn, &ctx.tenant_id, &id, "converted") {
        return error_response(&e);
    }

    record_activity(&conn, &ctx, "lead", &id, "converted", Some(&client.id));
    fire_triggers(
        &conn,
        &ctx,
        "lead.converted",
        serde_json::json!({ "leadId": id, "clientId": client.id }),
    );

    json_response(
        StatusCode::OK,
        &serde_json::json!({ "lead": { "id": id, "status": "converted" }, "client": client }),
    )
}
