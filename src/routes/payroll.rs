//! Payroll run endpoints (plan-gated: agency)
//!
//! Runs move draft -> approved -> completed; approval and completion
//! require the manager role. `completed` is terminal.

use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use std::sync::Arc;

use crate::auth::Role;
use crate::db::payroll::{self, NewPayrollRun, PayrollRunPatch};
use crate::lifecycle::{validate_transition, LifecycleKind};
use crate::plans::Feature;
use crate::routes::{
    authenticate, error_response, json_response, method_not_allowed, not_found, parse_json_body,
    record_activity, require_feature, require_role, split_path, AuthContext, BoxBody,
};
use crate::server::AppState;

pub async fn handle_payroll_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    path: String,
) -> Response<BoxBody> {
    let ctx = match authenticate(&req, &state) {
        Ok(ctx) => ctx,
        Err(e) => return error_response(&e),
    };

    match (req.method().clone(), split_path(&path, "/api/payroll-runs")) {
        (Method::GET, None) => list(&state, &ctx),
        (Method::POST, None) => create(req, state.clone(), ctx).await,
        (Method::GET, Some((id, None))) => get(&state, &ctx, id),
        (Method::PATCH, Some((id, None))) => patch(req, state.clone(), ctx, id.to_string()).await,
        _ => method_not_allowed(),
    }
}

fn list(state: &AppState, ctx: &AuthContext) -> Response<BoxBody> {
    let conn = match state.store.conn() {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };
    if let Err(resp) = require_feature(&conn, ctx, Feature::Payroll) {
        return resp;
    }
    match payroll::list_payroll_runs(&conn, &ctx.tenant_id) {
        Ok(rows) => json_response(StatusCode::OK, &serde_json::json!({ "payrollRuns": rows })),
        Err(e) => error_response(&e),
    }
}

async fn create(
    req: Request<Incoming>,
    state: Arc<AppState>,
    ctx: AuthContext,
) -> Response<BoxBody> {
    if let Err(e) = require_role(&ctx, Role::Manager) {
        return error_response(&e);
    }

    let body: NewPayrollRun = match parse_json_body(req, state.args.max_body_bytes).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    if body.period_start.is_empty() || body.period_end.is_empty() {
        return json_response(
            StatusCode::BAD_REQUEST,
            &serde_json::json!({ "error": "Missing required fields: periodStart, periodEnd" }),
        );
    }

    let conn = match state.store.conn() {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };
    if let Err(resp) = require_feature(&conn, &ctx, Feature::Payroll) {
        return resp;
    }

    let run = match payroll::create_payroll_run(&conn, &ctx.tenant_id, &body) {
        Ok(r) => r,
        Err(e) => return error_response(&e),
    };

    record_activity(&conn, &ctx, "payroll_run", &run.id, "created", None);

    json_response(StatusCode::CREATED, &serde_json::json!({ "payrollRun": run }))
}

fn get(state: &AppState, ctx: &AuthContext, id: &str) -> Response<BoxBody> {
    let conn = match state.store.conn() {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };
    if let Err(resp) = require_feature(&conn, ctx, Feature::Payroll) {
        return resp;
    }
    match payroll::get_payroll_run(&conn, &ctx.tenant_id, id) {
        Ok(Some(run)) => json_response(StatusCode::OK, &serde_json::json!({ "payrollRun": run })),
        Ok(None) => not_found("payroll run"),
        Err(e) => error_response(&e),
    }
}

async fn patch(
    req: Request<Incoming>,
    state: Arc<AppState>,
    ctx: AuthContext,
    id: String,
) -> Response<BoxBody> {
    if let Err(e) = require_role(&ctx, Role::Manager) {
        return error_response(&e);
    }

    let body: PayrollRunPatch = match parse_json_body(req, state.args.max_body_bytes).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    let conn = match state.store.conn() {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };
    if let Err(resp) = require_feature(&conn, &ctx, Feature::Payroll) {
        return resp;
    }

    let existing = match payroll::get_payroll_run(&conn, &ctx.tenant_id, &id) {
        Ok(Some(r)) => r,
        Ok(None) => return not_found("payroll run"),
        Err(e) => return error_response(&e),
    };

    if let Some(ref next) = body.status {
        if *next != existing.status && !body.force {
            if let Err(e) = validate_transition(LifecycleKind::PayrollRun, &existing.status, next)
            {
                return json_response(
                    StatusCode::BAD_REQUEST,
                    &serde_json::json!({ "error": e.to_string() }),
                );
            }
        }
    }

    match payroll::update_payroll_run(&conn, &ctx.tenant_id, &id, &body) {
        Ok(Some(run)) => {
            record_activity(&conn, &ctx, "payroll_run", &run.id, "updated", None);
            json_response(StatusCode::OK, &serde_json::json!({ "payrollRun": run }))
        }
        Ok(None) => not_found("payroll run"),
        Err(e) => error_response(&e),
    }
}
