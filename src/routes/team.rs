//! Team management endpoints
//!
//! - GET   /api/team       - list tenant members
//! - POST  /api/team       - add a member (owner only, plan-capped)
//! - PATCH /api/team/{id}  - change role / capacity / active flag

use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::auth::{hash_password, Role};
use crate::db::tenants::{self, NewUser, UserPatch};
use crate::plans::{limits_for, PlanLimits};
use crate::routes::{
    authenticate, error_response, error_with_code, json_response, method_not_allowed, not_found,
    parse_json_body, require_role, split_path, AuthContext, BoxBody,
};
use crate::server::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AddMemberRequest {
    pub email: String,
    pub display_name: String,
    pub password: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default = "default_capacity")]
    pub weekly_capacity_hours: f64,
}

fn default_capacity() -> f64 {
    40.0
}

pub async fn handle_team_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    path: String,
) -> Response<BoxBody> {
    let ctx = match authenticate(&req, &state) {
        Ok(ctx) => ctx,
        Err(e) => return error_response(&e),
    };

    match (req.method().clone(), split_path(&path, "/api/team")) {
        (Method::GET, None) => list(&state, &ctx),
        (Method::POST, None) => add_member(req, state.clone(), ctx).await,
        (Method::PATCH, Some((id, None))) => patch(req, state.clone(), ctx, id.to_string()).await,
        _ => method_not_allowed(),
    }
}

fn list(state: &AppState, ctx: &AuthContext) -> Response<BoxBody> {
    let conn = match state.store.conn() {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };
    match tenants::list_users(&conn, &ctx.tenant_id) {
        Ok(rows) => json_response(StatusCode::OK, &serde_json::json!({ "members": rows })),
        Err(e) => error_response(&e),
    }
}

async fn add_member(
    req: Request<Incoming>,
    state: Arc<AppState>,
    ctx: AuthContext,
) -> Response<BoxBody> {
    if let Err(e) = require_role(&ctx, Role::Owner) {
        return error_response(&e);
    }

    let body: AddMemberRequest = match parse_json_body(req, state.args.max_body_bytes).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    if body.email.trim().is_empty() || body.display_name.trim().is_empty() {
        return json_response(
            StatusCode::BAD_REQUEST,
            &serde_json::json!({ "error": "Missing required fields: email, displayName" }),
        );
    }
    if body.password.len() < 8 {
        return error_with_code(
            StatusCode::BAD_REQUEST,
            "Password must be at least 8 characters",
            "WEAK_PASSWORD",
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
    let current = match tenants::count_users(&conn, &ctx.tenant_id) {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };
    if !PlanLimits::within(limits.max_members, current) {
        return json_response(
            StatusCode::FORBIDDEN,
            &serde_json::json!({
                "error": "Member limit reached for your plan",
                "code": "UPGRADE_REQUIRED",
                "limit": limits.max_members,
            }),
        );
    }

    match tenants::find_user_by_email(&conn, &body.email.trim().to_lowercase()) {
        Ok(Some(_)) => {
            return error_with_code(
                StatusCode::CONFLICT,
                "An account with this email already exists",
                "USER_EXISTS",
            )
        }
        Ok(None) => {}
        Err(e) => return error_response(&e),
    }

    let password_hash = match hash_password(&body.password) {
        Ok(h) => h,
        Err(e) => return error_response(&e),
    };

    let member = match tenants::create_user(
        &conn,
        &ctx.tenant_id,
        &NewUser {
            email: body.email.trim().to_lowercase(),
            password_hash,
            display_name: body.display_name.trim().to_string(),
            role: body.role,
            weekly_capacity_hours: body.weekly_capacity_hours,
        },
    ) {
        Ok(u) => u,
        Err(e) => return error_response(&e),
    };

    info!("Added member {} to tenant {}", member.email, ctx.tenant_id);

    json_response(StatusCode::CREATED, &serde_json::json!({ "member": member }))
}

async fn patch(
    req: Request<Incoming>,
    state: Arc<AppState>,
    ctx: AuthContext,
    id: String,
) -> Response<BoxBody> {
    let body: UserPatch = match parse_json_body(req, state.args.max_body_bytes).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    // Role and activation changes are owner-only; capacity and display
    // name edits need manager
    let required = if body.role.is_some() || body.is_active.is_some() {
        Role::Owner
    } else {
        Role::Manager
    };
    if let Err(e) = require_role(&ctx, required) {
        return error_response(&e);
    }

    let conn = match state.store.conn() {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    match tenants::update_user(&conn, &ctx.tenant_id, &id, &body) {
        Ok(Some(member)) => json_response(StatusCode::OK, &serde_json::json!({ "member": member })),
        Ok(None) => not_found("member"),
        Err(e) => error_response(&e),
    }
}
