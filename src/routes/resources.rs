//! Resource utilization endpoint
//!
//! GET /api/resources/utilization?weeks=N
//!
//! Rolls billable time entries into per-member, per-week utilization
//! percentages against each member's weekly capacity. Recomputed on
//! every read from the raw rows; nothing is cached.

use chrono::{Duration, NaiveDate, Utc};
use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;

use crate::db::{tenants, time_entries};
use crate::rollup::{average, percent, round1, week_buckets};
use crate::routes::{
    authenticate, error_response, json_response, method_not_allowed, query_param, AuthContext,
    BoxBody,
};
use crate::server::AppState;

const DEFAULT_WEEKS: usize = 4;
const MAX_WEEKS: usize = 26;

/// One member's utilization across the window
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberUtilization {
    pub user_id: String,
    pub display_name: String,
    pub weekly_capacity_hours: f64,
    pub weeks: Vec<WeekUtilization>,
    pub average_percent: f64,
}

/// One week of one member's utilization
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekUtilization {
    pub week_start: String,
    pub hours: f64,
    pub utilization_percent: f64,
}

/// Summary counts across all members
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UtilizationSummary {
    pub member_count: usize,
    pub average_percent: f64,
    pub overallocated_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UtilizationResponse {
    pub window_start: String,
    pub window_end: String,
    pub weeks: usize,
    pub members: Vec<MemberUtilization>,
    pub summary: UtilizationSummary,
}

pub async fn handle_resources_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    path: String,
) -> Response<BoxBody> {
    let ctx = match authenticate(&req, &state) {
        Ok(ctx) => ctx,
        Err(e) => return error_response(&e),
    };

    match (req.method().clone(), path.as_str()) {
        (Method::GET, "/api/resources/utilization") => {
            let weeks = query_param(&req, "weeks")
                .and_then(|w| w.parse::<usize>().ok())
                .unwrap_or(DEFAULT_WEEKS)
                .clamp(1, MAX_WEEKS);
            utilization(&state, &ctx, weeks)
        }
        _ => method_not_allowed(),
    }
}

fn utilization(state: &AppState, ctx: &AuthContext, weeks: usize) -> Response<BoxBody> {
    let today = Utc::now().date_naive();
    let window_start = today - Duration::days((weeks * 7 - 1) as i64);

    let conn = match state.store.conn() {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    let users = match tenants::list_users(&conn, &ctx.tenant_id) {
        Ok(u) => u,
        Err(e) => return error_response(&e),
    };

    let entries = match time_entries::list_time_entries(
        &conn,
        &ctx.tenant_id,
        None,
        Some(&window_start.to_string()),
        Some(&today.to_string()),
    ) {
        Ok(e) => e,
        Err(e) => return error_response(&e),
    };

    let mut members = vec![];
    for user in users.iter().filter(|u| u.is_active) {
        let dated: Vec<(NaiveDate, f64)> = entries
            .iter()
            .filter(|e| e.user_id == user.id && e.billable)
            .filter_map(|e| {
                NaiveDate::parse_from_str(&e.entry_date, "%Y-%m-%d")
                    .ok()
                    .map(|date| (date, e.hours))
            })
            .collect();

        let buckets = week_buckets(&dated, window_start, weeks);
        let week_stats: Vec<WeekUtilization> = buckets
            .iter()
            .enumerate()
            .map(|(i, &hours)| WeekUtilization {
                week_start: (window_start + Duration::days((i * 7) as i64)).to_string(),
                hours: round1(hours),
                utilization_percent: percent(hours, user.weekly_capacity_hours),
            })
            .collect();

        let average_percent = round1(average(
            &week_stats
                .iter()
                .map(|w| w.utilization_percent)
                .collect::<Vec<_>>(),
        ));

        members.push(MemberUtilization {
            user_id: user.id.clone(),
            display_name: user.display_name.clone(),
            weekly_capacity_hours: user.weekly_capacity_hours,
            weeks: week_stats,
            average_percent,
        });
    }

    let overall = round1(average(
        &members.iter().map(|m| m.average_percent).collect::<Vec<_>>(),
    ));
    let overallocated = members
        .iter()
        .filter(|m| m.weeks.iter().any(|w| w.utilization_percent > 100.0))
        .count();

    let response = UtilizationResponse {
        window_start: window_start.to_string(),
        window_end: today.to_string(),
        weeks,
        summary: UtilizationSummary {
            member_count: members.len(),
            average_percent: overall,
            overallocated_count: overallocated,
        },
        members,
    };

    json_response(StatusCode::OK, &response)
}
