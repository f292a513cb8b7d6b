//! Client portal summary (plan-gated: agency)
//!
//! GET /api/portal/{client_id} - read-only snapshot of one client's
//! contracts, invoices, and upcoming events.

use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use std::sync::Arc;

use crate::db::{clients, contracts, events, invoices};
use crate::plans::Feature;
use crate::routes::{
    authenticate, error_response, json_response, method_not_allowed, not_found, require_feature,
    split_path, BoxBody,
};
use crate::server::AppState;

pub async fn handle_portal_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    path: String,
) -> Response<BoxBody> {
    let ctx = match authenticate(&req, &state) {
        Ok(ctx) => ctx,
        Err(e) => return error_response(&e),
    };

    let client_id = match (req.method(), split_path(&path, "/api/portal")) {
        (&Method::GET, Some((id, None))) => id.to_string(),
        _ => return method_not_allowed(),
    };

    let conn = match state.store.conn() {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };
    if let Err(resp) = require_feature(&conn, &ctx, Feature::ClientPortal) {
        return resp;
    }

    let client = match clients::get_client(&conn, &ctx.tenant_id, &client_id) {
        Ok(Some(c)) => c,
        Ok(None) => return not_found("client"),
        Err(e) => return error_response(&e),
    };

    let client_contracts =
        match contracts::list_contracts(&conn, &ctx.tenant_id, None, Some(&client_id)) {
            Ok(rows) => rows,
            Err(e) => return error_response(&e),
        };
    let client_invoices =
        match invoices::list_invoices(&conn, &ctx.tenant_id, None, Some(&client_id)) {
            Ok(rows) => rows,
            Err(e) => return error_response(&e),
        };
    let client_events = match events::list_events(&conn, &ctx.tenant_id, Some(&client_id)) {
        Ok(rows) => rows,
        Err(e) => return error_response(&e),
    };

    json_response(
        StatusCode::OK,
        &serde_json::json!({
            "client": client,
            "contracts": client_contracts,
            "invoices": client_invoices,
            "events": client_events,
        }),
    )
}
