//! HTTP routes for authentication
//!
//! - POST /auth/register - Create a tenant and its owner account
//! - POST /auth/login    - Authenticate and receive a session token
//! - POST /auth/logout   - Clear the session cookie
//! - GET  /auth/me       - Current user info from the session

use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::{hash_password, verify_password, Role, SESSION_COOKIE};
use crate::db::tenants::{self, NewUser};
use crate::routes::{
    authenticate, error_response, error_with_code, json_response, method_not_allowed, not_found,
    parse_json_body, BoxBody, ErrorResponse,
};
use crate::server::AppState;

/// Default weekly capacity for new accounts
const DEFAULT_CAPACITY_HOURS: f64 = 40.0;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RegisterRequest {
    pub tenant_name: String,
    pub display_name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub user: tenants::UserRow,
    pub tenant: tenants::TenantRow,
    pub expires_in: u64,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
    pub message: String,
}

/// Handle /auth/* requests
pub async fn handle_auth_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    path: String,
) -> Response<BoxBody> {
    match (req.method().clone(), path.as_str()) {
        (Method::POST, "/auth/register") => handle_register(req, state).await,
        (Method::POST, "/auth/login") => handle_login(req, state).await,
        (Method::POST, "/auth/logout") => handle_logout(),
        (Method::GET, "/auth/me") => handle_me(req, state),
        (Method::GET | Method::POST, _) => not_found(&path),
        _ => method_not_allowed(),
    }
}

/// Attach the session cookie to a response
fn with_session_cookie(
    mut response: Response<BoxBody>,
    token: &str,
    max_age: u64,
) -> Response<BoxBody> {
    let cookie = format!(
        "{}={}; HttpOnly; Path=/; Max-Age={}; SameSite=Lax",
        SESSION_COOKIE, token, max_age
    );
    if let Ok(value) = cookie.parse() {
        response.headers_mut().insert(hyper::header::SET_COOKIE, value);
    }
    response
}

async fn handle_register(req: Request<Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    let max_bytes = state.args.max_body_bytes;
    let body: RegisterRequest = match parse_json_body(req, max_bytes).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    if body.tenant_name.trim().is_empty()
        || body.display_name.trim().is_empty()
        || body.email.trim().is_empty()
    {
        return json_response(
            StatusCode::BAD_REQUEST,
            &ErrorResponse {
                error: "Missing required fields: tenantName, displayName, email".into(),
                code: None,
            },
        );
    }

    if body.password.len() < 8 {
        return error_with_code(
            StatusCode::BAD_REQUEST,
            "Password must be at least 8 characters",
            "WEAK_PASSWORD",
        );
    }

    let password_hash = match hash_password(&body.password) {
        Ok(h) => h,
        Err(e) => return error_response(&e),
    };

    let conn = match state.store.conn() {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    match tenants::find_user_by_email(&conn, &body.email) {
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

    let tenant = match tenants::create_tenant(&conn, body.tenant_name.trim()) {
        Ok(t) => t,
        Err(e) => return error_response(&e),
    };

    let user = match tenants::create_user(
        &conn,
        &tenant.id,
        &NewUser {
            email: body.email.trim().to_lowercase(),
            password_hash,
            display_name: body.display_name.trim().to_string(),
            role: Role::Owner,
            weekly_capacity_hours: DEFAULT_CAPACITY_HOURS,
        },
    ) {
        Ok(u) => u,
        Err(e) => return error_response(&e),
    };

    info!("Registered tenant {} with owner {}", tenant.id, user.email);

    let token = match state
        .sessions
        .issue(&user.id, &tenant.id, &user.email, Role::Owner)
    {
        Ok(t) => t,
        Err(e) => return error_response(&e),
    };

    let ttl = state.sessions.ttl_seconds();
    let response = json_response(
        StatusCode::CREATED,
        &AuthResponse {
            token: token.clone(),
            user,
            tenant,
            expires_in: ttl,
        },
    );
    with_session_cookie(response, &token, ttl)
}

async fn handle_login(req: Request<Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    let max_bytes = state.args.max_body_bytes;
    let body: LoginRequest = match parse_json_body(req, max_bytes).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    let conn = match state.store.conn() {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    let user = match tenants::find_user_by_email(&conn, &body.email.trim().to_lowercase()) {
        Ok(Some(u)) => u,
        Ok(None) => {
            return error_with_code(
                StatusCode::UNAUTHORIZED,
                "Invalid email or password",
                "INVALID_CREDENTIALS",
            )
        }
        Err(e) => return error_response(&e),
    };

    if !user.is_active {
        return error_with_code(
            StatusCode::FORBIDDEN,
            "This account has been deactivated",
            "ACCOUNT_DISABLED",
        );
    }

    match verify_password(&body.password, &user.password_hash) {
        Ok(true) => {}
        Ok(false) => {
            return error_with_code(
                StatusCode::UNAUTHORIZED,
                "Invalid email or password",
                "INVALID_CREDENTIALS",
            )
        }
        Err(e) => {
            warn!("Password verification failed for {}: {}", user.email, e);
            return error_response(&e);
        }
    }

    let tenant = match tenants::get_tenant(&conn, &user.tenant_id) {
        Ok(Some(t)) => t,
        Ok(None) => {
            return json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &ErrorResponse {
                    error: "Tenant missing for user".into(),
                    code: None,
                },
            )
        }
        Err(e) => return error_response(&e),
    };

    let token = match state
        .sessions
        .issue(&user.id, &user.tenant_id, &user.email, user.role())
    {
        Ok(t) => t,
        Err(e) => return error_response(&e),
    };

    info!("Login for {} (tenant {})", user.email, user.tenant_id);

    let ttl = state.sessions.ttl_seconds();
    let response = json_response(
        StatusCode::OK,
        &AuthResponse {
            token: token.clone(),
            user,
            tenant,
            expires_in: ttl,
        },
    );
    with_session_cookie(response, &token, ttl)
}

fn handle_logout() -> Response<BoxBody> {
    let response = json_response(
        StatusCode::OK,
        &SuccessResponse {
            success: true,
            message: "Logged out".into(),
        },
    );
    // Expire the cookie immediately
    with_session_cookie(response, "", 0)
}

fn handle_me(req: Request<Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    let ctx = match authenticate(&req, &state) {
        Ok(ctx) => ctx,
        Err(e) => return error_response(&e),
    };

    let conn = match state.store.conn() {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    let user = match tenants::get_user(&conn, &ctx.tenant_id, &ctx.user_id) {
        Ok(Some(u)) => u,
        Ok(None) => return not_found("user"),
        Err(e) => return error_response(&e),
    };

    let tenant = match tenants::get_tenant(&conn, &ctx.tenant_id) {
        Ok(Some(t)) => t,
        Ok(None) => return not_found("tenant"),
        Err(e) => return error_response(&e),
    };

    json_response(
        StatusCode::OK,
        &serde_json::json!({ "user": user, "tenant": tenant }),
    )
}
