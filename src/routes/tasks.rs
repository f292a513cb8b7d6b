//! Task endpoints
//!
//! Status changes are checked against the task lifecycle table.

use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use std::sync::Arc;

use crate::db::projects::{self, NewTask, TaskPatch};
use crate::lifecycle::{validate_transition, LifecycleKind};
use crate::routes::{
    authenticate, error_response, json_response, method_not_allowed, not_found, parse_json_body,
    query_param, record_activity, split_path, AuthContext, BoxBody,
};
use crate::server::AppState;

pub async fn handle_tasks_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    path: String,
) -> Response<BoxBody> {
    let ctx = match authenticate(&req, &state) {
        Ok(ctx) => ctx,
        Err(e) => return error_response(&e),
    };

    let project_filter = query_param(&req, "projectId");
    let status_filter = query_param(&req, "status");

    match (req.method().clone(), split_path(&path, "/api/tasks")) {
        (Method::GET, None) => list(
            &state,
            &ctx,
            project_filter.as_deref(),
            status_filter.as_deref(),
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
    project_id: Option<&str>,
    status: Option<&str>,
) -> Response<BoxBody> {
    let conn = match state.store.conn() {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };
    match projects::list_tasks(&conn, &ctx.tenant_id, project_id, status) {
        Ok(rows) => json_response(StatusCode::OK, &serde_json::json!({ "tasks": rows })),
        Err(e) => error_response(&e),
    }
}

async fn create(
    req: Request<Incoming>,
    state: Arc<AppState>,
    ctx: AuthContext,
) -> Response<BoxBody> {
    let body: NewTask = match parse_json_body(req, state.args.max_body_bytes).await {
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

    // A task's project must belong to the same tenant
    if let Some(ref project_id) = body.project_id {
        match projects::get_project(&conn, &ctx.tenant_id, project_id) {
            Ok(Some(_)) => {}
            Ok(None) => return not_found("project"),
            Err(e) => return error_response(&e),
        }
    }

    let task = match projects::create_task(&conn, &ctx.tenant_id, &body) {
        Ok(t) => t,
        Err(e) => return error_response(&e),
    };

    record_activity(&conn, &ctx, "task", &task.id, "created", Some(&task.title));

    json_response(StatusCode::CREATED, &serde_json::json!({ "task": task }))
}

fn get(state: &AppState, ctx: &AuthContext, id: &str) -> Response<BoxBody> {
    let conn = match state.store.conn() {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };
    match projects::get_task(&conn, &ctx.tenant_id, id) {
        Ok(Some(task)) => json_response(StatusCode::OK, &serde_json::json!({ "task": task })),
        Ok(None) => not_found("task"),
        Err(e) => error_response(&e),
    }
}

async fn patch(
    req: Request<Incoming>,
    state: Arc<AppState>,
    ctx: AuthContext,
    id: String,
) -> Response<BoxBody> {
    let body: TaskPatch = match parse_json_body(req, state.args.max_body_bytes).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    let conn = match state.store.conn() {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    let existing = match projects::get_task(&conn, &ctx.tenant_id, &id) {
        Ok(Some(t)) => t,
        Ok(None) => return not_found("task"),
        Err(e) => return error_response(&e),
    };

    if let Some(ref next) = body.status {
        if *next != existing.status && !body.force {
            if let Err(e) = validate_transition(LifecycleKind::Task, &existing.status, next) {
                return json_response(
                    StatusCode::BAD_REQUEST,
                    &serde_json::json!({ "error": e.to_string() }),
                );
            }
        }
    }

    match projects::update_task(&conn, &ctx.tenant_id, &id, &body) {
        Ok(Some(task)) => {
            record_activity(&conn, &ctx, "task", &task.id, "updated", None);
            json_response(StatusCode::OK, &serde_json::json!({ "task": task }))
        }
        Ok(None) => not_found("task"),
        Err(e) => error_response(&e),
    }
}

fn delete(state: &AppState, ctx: &AuthContext, id: &str) -> Response<BoxBody> {
    let conn = match state.store.conn() {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };
    match projects::delete_task(&conn, &ctx.tenant_id, id) {
        Ok(true) => {
            record_activity(&conn, ctx, "task", id, "deleted", None);
            json_response(StatusCode::OK, &serde_json::json!({ "success": true }))
        }
        Ok(false) => not_found("task"),
        Err(e) => error_response(&e),
    }
}
