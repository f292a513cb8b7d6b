//! Invoice endpoints
//!
//! - GET   /api/invoices                 - list (optional filters)
//! - POST  /api/invoices                 - create (monthly plan cap)
//! - GET   /api/invoices/{id}            - fetch one with payments
//! - PATCH /api/invoices/{id}            - update; transition-checked
//! - POST  /api/invoices/{id}/payments   - record a payment, then update
//!                                         totals (sequential writes)

use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use std::sync::Arc;

use crate::db::invoices::{self, InvoicePatch, NewInvoice, NewPayment};
use crate::db::tenants;
use crate::lifecycle::{validate_transition, LifecycleKind};
use crate::plans::{limits_for, PlanLimits};
use crate::routes::{
    authenticate, error_response, fire_triggers, json_response, method_not_allowed, not_found,
    parse_json_body, query_param, record_activity, split_path, AuthContext, BoxBody,
};
use crate::server::AppState;

pub async fn handle_invoices_request(
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

    match (req.method().clone(), split_path(&path, "/api/invoices")) {
        (Method::GET, None) => list(
            &state,
            &ctx,
            status_filter.as_deref(),
            client_filter.as_deref(),
        ),
        (Method::POST, None) => create(req, state.clone(), ctx).await,
        (Method::GET, Some((id, None))) => get(&state, &ctx, id),
        (Method::PATCH, Some((id, None))) => patch(req, state.clone(), ctx, id.to_string()).await,
        (Method::POST, Some((id, Some("payments")))) => {
            record_payment(req, state.clone(), ctx, id.to_string()).await
        }
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
    match invoices::list_invoices(&conn, &ctx.tenant_id, status, client_id) {
        Ok(rows) => json_response(StatusCode::OK, &serde_json::json!({ "invoices": rows })),
        Err(e) => error_response(&e),
    }
}

async fn create(
    req: Request<Incoming>,
    state: Arc<AppState>,
    ctx: AuthContext,
) -> Response<BoxBody> {
    let body: NewInvoice = match parse_json_body(req, state.args.max_body_bytes).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    if body.number.trim().is_empty() {
        return json_response(
            StatusCode::BAD_REQUEST,
            &serde_json::json!({ "error": "Missing required field: number" }),
        );
    }

    let conn = match state.store.conn() {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    let plan = match tenants::get_tenant_plan(&conn, &ctx.tenant_id) {
        Ok(p) => p,
        Err(e) => return error_response(&e),
    };
    let limits = limits_for(plan);
    let this_month = match invoices::count_invoices_this_month(&conn, &ctx.tenant_id) {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };
    if !PlanLimits::within(limits.max_invoices_per_month, this_month) {
        return json_response(
            StatusCode::FORBIDDEN,
            &serde_json::json!({
                "error": "Monthly invoice limit reached for your plan",
                "code": "UPGRADE_REQUIRED",
                "limit": limits.max_invoices_per_month,
            }),
        );
    }

    let invoice = match invoices::create_invoice(&conn, &ctx.tenant_id, &body) {
        Ok(i) => i,
        Err(e) => return error_response(&e),
    };

    record_activity(&conn, &ctx, "invoice", &invoice.id, "created", Some(&invoice.number));

    json_response(
        StatusCode::CREATED,
        &serde_json::json!({ "invoice": invoice }),
    )
}

fn get(state: &AppState, ctx: &AuthContext, id: &str) -> Response<BoxBody> {
    let conn = match state.store.conn() {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };
    let invoice = match invoices::get_invoice(&conn, &ctx.tenant_id, id) {
        Ok(Some(i)) => i,
        Ok(None) => return not_found("invoice"),
        Err(e) => return error_response(&e),
    };
    let payments = match invoices::list_payments(&conn, &ctx.tenant_id, id) {
        Ok(p) => p,
        Err(e) => return error_response(&e),
    };
    json_response(
        StatusCode::OK,
        &serde_json::json!({ "invoice": invoice, "payments": payments }),
    )
}

async fn patch(
    req: Request<Incoming>,
    state: Arc<AppState>,
    ctx: AuthContext,
    id: String,
) -> Response<BoxBody> {
    let body: InvoicePatch = match parse_json_body(req, state.args.max_body_bytes).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    let conn = match state.store.conn() {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    let existing = match invoices::get_invoice(&conn, &ctx.tenant_id, &id) {
        Ok(Some(i)) => i,
        Ok(None) => return not_found("invoice"),
        Err(e) => return error_response(&e),
    };

    if let Some(ref next) = body.status {
        if *next != existing.status && !body.force {
            if let Err(e) = validate_transition(LifecycleKind::Invoice, &existing.status, next) {
                return json_response(
                    StatusCode::BAD_REQUEST,
                    &serde_json::json!({ "error": e.to_string() }),
                );
            }
        }
    }

    match invoices::update_invoice(&conn, &ctx.tenant_id, &id, &body) {
        Ok(Some(invoice)) => {
            record_activity(&conn, &ctx, "invoice", &invoice.id, "updated", None);
            json_response(StatusCode::OK, &serde_json::json!({ "invoice": invoice }))
        }
        Ok(None) => not_found("invoice"),
        Err(e) => error_response(&e),
    }
}

async fn record_payment(
    req: Request<Incoming>,
    state: Arc<AppState>,
    ctx: AuthContext,
    id: String,
) -> Response<BoxBody> {
    let body: NewPayment = match parse_json_body(req, state.args.max_body_bytes).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    if body.amount <= 0.0 {
        return json_response(
            StatusCode::BAD_REQUEST,
            &serde_json::json!({ "error": "Payment amount must be positive" }),
        );
    }

    let conn = match state.store.conn() {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    let existing = match invoices::get_invoice(&conn, &ctx.tenant_id, &id) {
        Ok(Some(i)) => i,
        Ok(None) => return not_found("invoice"),
        Err(e) => return error_response(&e),
    };

    if existing.status == "void" {
        return json_response(
            StatusCode::CONFLICT,
            &serde_json::json!({ "error": "Cannot record a payment on a void invoice" }),
        );
    }

    let (payment, invoice) = match invoices::record_payment(&conn, &ctx.tenant_id, &id, &body) {
        Ok(pair) => pair,
        Err(e) => return error_response(&e),
    };

    record_activity(&conn, &ctx, "invoice", &id, "payment_recorded", None);
    if invoice.status == "paid" && existing.status != "paid" {
        fire_triggers(
            &conn,
            &ctx,
            "invoice.paid",
            serde_json::json!({ "invoiceId": invoice.id, "number": invoice.number }),
        );
    }

    json_response(
        StatusCode::CREATED,
        &serde_json::json!({ "payment": payment, "invoice": invoice }),
    )
}
