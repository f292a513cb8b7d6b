//! Survey endpoints (plan-gated: pro and above)
//!
//! - GET    /api/surveys                 - list
//! - POST   /api/surveys                 - create with questions
//! - GET    /api/surveys/{id}            - survey with questions
//! - PATCH  /api/surveys/{id}            - rename / open / close
//! - DELETE /api/surveys/{id}            - delete (cascades)
//! - POST   /api/surveys/{id}/responses  - submit (no session needed;
//!                                         the survey resolves its tenant)
//! - GET    /api/surveys/{id}/analytics  - per-question rollups

use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::db::surveys::{self, NewSurvey, SurveyPatch, QUESTION_KINDS};
use crate::plans::Feature;
use crate::routes::{
    authenticate, error_response, json_response, method_not_allowed, not_found, parse_json_body,
    record_activity, require_feature, split_path, AuthContext, BoxBody,
};
use crate::server::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SubmitResponseRequest {
    pub answers: BTreeMap<String, Value>,
}

pub async fn handle_surveys_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    path: String,
) -> Response<BoxBody> {
    // Response submission is the client-facing surface: no session
    if req.method() == Method::POST {
        if let Some((id, Some("responses"))) = split_path(&path, "/api/surveys") {
            let id = id.to_string();
            return submit_response(req, state, id).await;
        }
    }

    let ctx = match authenticate(&req, &state) {
        Ok(ctx) => ctx,
        Err(e) => return error_response(&e),
    };

    match (req.method().clone(), split_path(&path, "/api/surveys")) {
        (Method::GET, None) => list(&state, &ctx),
        (Method::POST, None) => create(req, state.clone(), ctx).await,
        (Method::GET, Some((id, None))) => get(&state, &ctx, id),
        (Method::PATCH, Some((id, None))) => patch(req, state.clone(), ctx, id.to_string()).await,
        (Method::DELETE, Some((id, None))) => delete(&state, &ctx, id),
        (Method::GET, Some((id, Some("analytics")))) => analytics(&state, &ctx, id),
        _ => method_not_allowed(),
    }
}

fn list(state: &AppState, ctx: &AuthContext) -> Response<BoxBody> {
    let conn = match state.store.conn() {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };
    if let Err(resp) = require_feature(&conn, ctx, Feature::Surveys) {
        return resp;
    }
    match surveys::list_surveys(&conn, &ctx.tenant_id) {
        Ok(rows) => json_response(StatusCode::OK, &serde_json::json!({ "surveys": rows })),
        Err(e) => error_response(&e),
    }
}

async fn create(
    req: Request<Incoming>,
    state: Arc<AppState>,
    ctx: AuthContext,
) -> Response<BoxBody> {
    let body: NewSurvey = match parse_json_body(req, state.args.max_body_bytes).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    if body.name.trim().is_empty() {
        return json_response(
            StatusCode::BAD_REQUEST,
            &serde_json::json!({ "error": "Missing required field: name" }),
        );
    }
    for question in &body.questions {
        if !QUESTION_KINDS.contains(&question.kind.as_str()) {
            return json_response(
                StatusCode::BAD_REQUEST,
                &serde_json::json!({
                    "error": format!("Unknown question kind: {}", question.kind)
                }),
            );
        }
        if question.kind == "select" && question.options.is_empty() {
            return json_response(
                StatusCode::BAD_REQUEST,
                &serde_json::json!({ "error": "Select questions require options" }),
            );
        }
    }

    let conn = match state.store.conn() {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };
    if let Err(resp) = require_feature(&conn, &ctx, Feature::Surveys) {
        return resp;
    }

    let survey = match surveys::create_survey(&conn, &ctx.tenant_id, &body) {
        Ok(s) => s,
        Err(e) => return error_response(&e),
    };
    let questions = match surveys::list_questions(&conn, &survey.id) {
        Ok(q) => q,
        Err(e) => return error_response(&e),
    };

    record_activity(&conn, &ctx, "survey", &survey.id, "created", Some(&survey.name));

    json_response(
        StatusCode::CREATED,
        &serde_json::json!({ "survey": survey, "questions": questions }),
    )
}

fn get(state: &AppState, ctx: &AuthContext, id: &str) -> Response<BoxBody> {
    let conn = match state.store.conn() {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };
    if let Err(resp) = require_feature(&conn, ctx, Feature::Surveys) {
        return resp;
    }
    let survey = match surveys::get_survey(&conn, &ctx.tenant_id, id) {
        Ok(Some(s)) => s,
        Ok(None) => return not_found("survey"),
        Err(e) => return error_response(&e),
    };
    let questions = match surveys::list_questions(&conn, id) {
        Ok(q) => q,
        Err(e) => return error_response(&e),
    };
    json_response(
        StatusCode::OK,
        &serde_json::json!({ "survey": survey, "questions": questions }),
    )
}

async fn patch(
    req: Request<Incoming>,
    state: Arc<AppState>,
    ctx: AuthContext,
    id: String,
) -> Response<BoxBody> {
    let body: SurveyPatch = match parse_json_body(req, state.args.max_body_bytes).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    let conn = match state.store.conn() {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };
    if let Err(resp) = require_feature(&conn, &ctx, Feature::Surveys) {
        return resp;
    }

    match surveys::update_survey(&conn, &ctx.tenant_id, &id, &body) {
        Ok(Some(survey)) => {
            record_activity(&conn, &ctx, "survey", &survey.id, "updated", None);
            json_response(StatusCode::OK, &serde_json::json!({ "survey": survey }))
        }
        Ok(None) => not_found("survey"),
        Err(e) => error_response(&e),
    }
}

fn delete(state: &AppState, ctx: &AuthContext, id: &str) -> Response<BoxBody> {
    let conn = match state.store.conn() {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };
    if let Err(resp) = require_feature(&conn, ctx, Feature::Surveys) {
        return resp;
    }
    match surveys::delete_survey(&conn, &ctx.tenant_id, id) {
        Ok(true) => {
            record_activity(&conn, ctx, "survey", id, "deleted", None);
            json_response(StatusCode::OK, &serde_json::json!({ "success": true }))
        }
        Ok(false) => not_found("survey"),
        Err(e) => error_response(&e),
    }
}

/// Submit a response to an open survey.
///
/// No session required; the tenant scope comes from the survey row.
/// Closed surveys reject submissions with 409.
async fn submit_response(
    req: Request<Incoming>,
    state: Arc<AppState>,
    id: String,
) -> Response<BoxBody> {
    let body: SubmitResponseRequest = match parse_json_body(req, state.args.max_body_bytes).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    let conn = match state.store.conn() {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    let survey = match surveys::find_survey(&conn, &id) {
        Ok(Some(s)) => s,
        Ok(None) => return not_found("survey"),
        Err(e) => return error_response(&e),
    };

    if !survey.is_open {
        return json_response(
            StatusCode::CONFLICT,
            &serde_json::json!({ "error": "This survey is closed", "code": "SURVEY_CLOSED" }),
        );
    }

    match surveys::record_response(&conn, &survey.tenant_id, &survey.id, &body.answers) {
        Ok(response) => json_response(
            StatusCode::CREATED,
            &serde_json::json!({ "response": response }),
        ),
        Err(e) => error_response(&e),
    }
}

fn analytics(state: &AppState, ctx: &AuthContext, id: &str) -> Response<BoxBody> {
    let conn = match state.store.conn() {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };
    if let Err(resp) = require_feature(&conn, ctx, Feature::Surveys) {
        return resp;
    }

    let survey = match surveys::get_survey(&conn, &ctx.tenant_id, id) {
        Ok(Some(s)) => s,
        Ok(None) => return not_found("survey"),
        Err(e) => return error_response(&e),
    };

    let questions = match surveys::list_questions(&conn, &survey.id) {
        Ok(q) => q,
        Err(e) => return error_response(&e),
    };
    let responses = match surveys::list_responses(&conn, &ctx.tenant_id, &survey.id) {
        Ok(r) => r,
        Err(e) => return error_response(&e),
    };

    let analytics = surveys::build_analytics(&survey.id, &questions, &responses);
    json_response(StatusCode::OK, &serde_json::json!({ "analytics": analytics }))
}
