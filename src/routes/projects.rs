//! Project endpoints

use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use std::sync::Arc;

use crate::db::projects::{self, NewProject, ProjectPatch};
use crate::db::tenants;
use crate::plans::{limits_for, PlanLimits};
use crate::routes::{
    authenticate, error_response, json_response, method_not_allowed, not_found, parse_json_body,
    record_activity, split_path, AuthContext, BoxBody,
};
use crate::server::AppState;

pub async fn handle_projects_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    path: String,
) -> Response<BoxBody> {
    let ctx = match authenticate(&req, &state) {
        Ok(ctx) => ctx,
        Err(e) => return error_response(&e),
    };

    match (req.method().clone(), split_path(&path, "/api/projects")) {
        (Method::GET, None) => list(&state, &ctx),
        (Method::POST, None) => create(req, state.clone(), ctx).await,
        (Method::GET, Some((id, None))) => get(&state, &ctx, id),
        (Method::PATCH, Some((id, None))) => patch(req, state.clone(), ctx, id.to_string()).await,
        (Method::DELETE, Some((id, None))) => delete(&state, &ctx, id),
        _ => method_not_allowed(),
    }
}

fn list(state: &AppState, ctx: &AuthContext) -> Response<BoxBody> {
    let conn = match state.store.conn() {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };
    match projects::list_projects(&conn, &ctx.tenant_id) {
        Ok(rows) => json_response(StatusCode::OK, &serde_json::json!({ "projects": rows })),
        Err(e) => error_response(&e),
    }
}

async fn create(
    req: Request<Incoming>,
    state: Arc<AppState>,
    ctx: AuthContext,
) -> Response<BoxBody> {
    let body: NewProject = match parse_json_body(req, state.args.max_body_bytes).await {
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

    let plan = match tenants::get_tenant_plan(&conn, &ctx.tenant_id) {
        Ok(p) => p,
        Err(e) => return error_response(&e),
    };
    let limits = limits_for(plan);
    let current = match projects::count_projects(&conn, &ctx.tenant_id) {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };
    if !PlanLimits::within(limits.max_projects, current) {
        return json_response(
            StatusCode::FORBIDDEN,
            &serde_json::json!({
                "error": "Project limit reached for your plan",
                "code": "UPGRADE_REQUIRED",
                "limit": limits.max_projects,
            }),
        );
    }

    let project = match projects::create_project(&conn, &ctx.tenant_id, &body) {
        Ok(p) => p,
        Err(e) => return error_response(&e),
    };

    record_activity(&conn, &ctx, "project", &project.id, "created", Some(&project.name));

    json_response(
        StatusCode::CREATED,
        &serde_json::json!({ "project": project }),
    )
}

fn get(state: &AppState, ctx: &AuthContext, id: &str) -> Response<BoxBody> {
    let conn = match state.store.conn() {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };
    match projects::get_project(&conn, &ctx.tenant_id, id) {
        Ok(Some(project)) => {
            json_response(StatusCode::OK, &serde_json::json!({ "project": project }))
        }
        Ok(None) => not_found("project"),
        Err(e) => error_response(&e),
    }
}

async fn patch(
    req: Request<Incoming>,
    state: Arc<AppState>,
    ctx: AuthContext,
    id: String,
) -> Response<BoxBody> {
    let body: ProjectPatch = match parse_json_body(req, state.args.max_body_bytes).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    // Project status is a plain active/archived column, not a lifecycle
    if let Some(ref status) = body.status {
        if status != "active" && status != "archived" {
            return json_response(
                StatusCode::BAD_REQUEST,
                &serde_json::json!({ "error": format!("Unknown project status: {}", status) }),
            );
        }
    }

    let conn = match state.store.conn() {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    match projects::update_project(&conn, &ctx.tenant_id, &id, &body) {
        Ok(Some(project)) => {
            record_activity(&conn, &ctx, "project", &project.id, "updated", None);
            json_response(StatusCode::OK, &serde_json::json!({ "project": project }))
        }
        Ok(None) => not_found("project"),
        Err(e) => error_response(&e),
    }
}

fn delete(state: &AppState, ctx: &AuthContext, id: &str) -> Response<BoxBody> {
    let conn = match state.store.conn() {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };
    match projects::delete_project(&conn, &ctx.tenant_id, id) {
        Ok(true) => {
            record_activity(&conn, ctx, "project", id, "deleted", None);
            json_response(StatusCode::OK, &serde_json::json!({ "success": true }))
        }
        Ok(false) => not_found("project"),
        Err(e) => error_response(&e),
    }
}
