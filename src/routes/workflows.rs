//! Workflow automation endpoints (plan-gated: pro and above)

use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use std::sync::Arc;

use crate::auth::Role;
use crate::db::workflows::{self, NewWorkflow, WorkflowPatch, WORKFLOW_ACTIONS, WORKFLOW_TRIGGERS};
use crate::plans::Feature;
use crate::routes::{
    authenticate, error_response, json_response, method_not_allowed, not_found, parse_json_body,
    record_activity, require_feature, require_role, split_path, AuthContext, BoxBody,
};
use crate::server::AppState;

pub async fn handle_workflows_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    path: String,
) -> Response<BoxBody> {
    let ctx = match authenticate(&req, &state) {
        Ok(ctx) => ctx,
        Err(e) => return error_response(&e),
    };

    match (req.method().clone(), split_path(&path, "/api/workflows")) {
        (Method::GET, None) => list(&state, &ctx),
        (Method::POST, None) => create(req, state.clone(), ctx).await,
        (Method::PATCH, Some((id, None))) => patch(req, state.clone(), ctx, id.to_string()).await,
        (Method::DELETE, Some((id, None))) => delete(&state, &ctx, id),
        (Method::GET, Some((id, Some("runs")))) => runs(&state, &ctx, id),
        _ => method_not_allowed(),
    }
}

fn list(state: &AppState, ctx: &AuthContext) -> Response<BoxBody> {
    let conn = match state.store.conn() {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };
    if let Err(resp) = require_feature(&conn, ctx, Feature::Workflows) {
        return resp;
    }
    match workflows::list_workflows(&conn, &ctx.tenant_id) {
        Ok(rows) => json_response(StatusCode::OK, &serde_json::json!({ "workflows": rows })),
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

    let body: NewWorkflow = match parse_json_body(req, state.args.max_body_bytes).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    if !WORKFLOW_TRIGGERS.contains(&body.trigger.as_str()) {
        return json_response(
            StatusCode::BAD_REQUEST,
            &serde_json::json!({
                "error": format!("Unknown trigger: {}", body.trigger),
                "supported": WORKFLOW_TRIGGERS,
            }),
        );
    }
    if !WORKFLOW_ACTIONS.contains(&body.action.as_str()) {
        return json_response(
            StatusCode::BAD_REQUEST,
            &serde_json::json!({
                "error": format!("Unknown action: {}", body.action),
                "supported": WORKFLOW_ACTIONS,
            }),
        );
    }

    let conn = match state.store.conn() {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };
    if let Err(resp) = require_feature(&conn, &ctx, Feature::Workflows) {
        return resp;
    }

    let workflow = match workflows::create_workflow(&conn, &ctx.tenant_id, &body) {
        Ok(w) => w,
        Err(e) => return error_response(&e),
    };

    record_activity(&conn, &ctx, "workflow", &workflow.id, "created", Some(&workflow.name));

    json_response(
        StatusCode::CREATED,
        &serde_json::json!({ "workflow": workflow }),
    )
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

    let body: WorkflowPatch = match parse_json_body(req, state.args.max_body_bytes).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    if let Some(ref trigger) = body.trigger {
        if !WORKFLOW_TRIGGERS.contains(&trigger.as_str()) {
            return json_response(
                StatusCode::BAD_REQUEST,
                &serde_json::json!({ "error": format!("Unknown trigger: {}", trigger) }),
            );
        }
    }
    if let Some(ref action) = body.action {
        if !WORKFLOW_ACTIONS.contains(&action.as_str()) {
            return json_response(
                StatusCode::BAD_REQUEST,
                &serde_json::json!({ "error": format!("Unknown action: {}", action) }),
            );
        }
    }

    let conn = match state.store.conn() {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };
    if let Err(resp) = require_feature(&conn, &ctx, Feature::Workflows) {
        return resp;
    }

    match workflows::update_workflow(&conn, &ctx.tenant_id, &id, &body) {
        Ok(Some(workflow)) => {
            record_activity(&conn, &ctx, "workflow", &workflow.id, "updated", None);
            json_response(StatusCode::OK, &serde_json::json!({ "workflow": workflow }))
        }
        Ok(None) => not_found("workflow"),
        Err(e) => error_response(&e),
    }
}

fn delete(state: &AppState, ctx: &AuthContext, id: &str) -> Response<BoxBody> {
    if let Err(e) = require_role(ctx, Role::Manager) {
        return error_response(&e);
    }

    let conn = match state.store.conn() {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };
    if let Err(resp) = require_feature(&conn, ctx, Feature::Workflows) {
        return resp;
    }
    match workflows::delete_workflow(&conn, &ctx.tenant_id, id) {
        Ok(true) => {
            record_activity(&conn, ctx, "workflow", id, "deleted", None);
            json_response(StatusCode::OK, &serde_json::json!({ "success": true }))
        }
        Ok(false) => not_found("workflow"),
        Err(e) => error_response(&e),
    }
}

fn runs(state: &AppState, ctx: &AuthContext, id: &str) -> Response<BoxBody> {
    let conn = match state.store.conn() {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };
    if let Err(resp) = require_feature(&conn, ctx, Feature::Workflows) {
        return resp;
    }

    match workflows::get_workflow(&conn, &ctx.tenant_id, id) {
        Ok(Some(_)) => {}
        Ok(None) => return not_found("workflow"),
        Err(e) => return error_response(&e),
    }

    match workflows::list_runs(&conn, &ctx.tenant_id, id) {
        Ok(rows) => json_response(StatusCode::OK, &serde_json::json!({ "runs": rows })),
        Err(e) => error_response(&e),
    }
}
