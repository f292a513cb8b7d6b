//! Goal records with auto-tracked progress
//!
//! A goal's `current_value` is recomputed from raw rows on read and the
//! result persisted back onto the goal row; the stored value is a cache
//! of the last recompute, not a source of truth.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::db::{clients, invoices, new_id, time_entries};
use crate::types::{AtriumError, Result};

/// Metrics a goal can track
pub const GOAL_METRICS: &[&str] = &["revenue", "hours", "clients"];

/// Goal row
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalRow {
    pub id: String,
    pub tenant_id: String,
    pub metric: String,
    pub target_value: f64,
    pub current_value: f64,
    pub window_start: String,
    pub window_end: String,
    pub created_at: String,
    pub updated_at: String,
}

impl GoalRow {
    fn from_row(row: &Row) -> std::result::Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            tenant_id: row.get("tenant_id")?,
            metric: row.get("metric")?,
            target_value: row.get("target_value")?,
            current_value: row.get("current_value")?,
            window_start: row.get("window_start")?,
            window_end: row.get("window_end")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Input for creating a goal
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewGoal {
    pub metric: String,
    pub target_value: f64,
    pub window_start: String,
    pub window_end: String,
}

pub fn create_goal(conn: &Connection, tenant_id: &str, input: &NewGoal) -> Result<GoalRow> {
    let id = new_id();
    conn.execute(
        "INSERT INTO goals (id, tenant_id, metric, target_value, window_start, window_end)
         VALUES (?, ?, ?, ?, ?, ?)",
        params![
            id,
            tenant_id,
            input.metric,
            input.target_value,
            input.window_start,
            input.window_end,
        ],
    )?;
    get_goal(conn, tenant_id, &id)?
        .ok_or_else(|| AtriumError::Internal("goal insert vanished".into()))
}

pub fn get_goal(conn: &Connection, tenant_id: &str, id: &str) -> Result<Option<GoalRow>> {
    Ok(conn
        .query_row(
            "SELECT * FROM goals WHERE tenant_id = ? AND id = ?",
            params![tenant_id, id],
            GoalRow::from_row,
        )
        .optional()?)
}

pub fn list_goals(conn: &Connection, tenant_id: &str) -> Result<Vec<GoalRow>> {
    let mut stmt =
        conn.prepare("SELECT * FROM goals WHERE tenant_id = ? ORDER BY created_at DESC")?;
    let rows = stmt
        .query_map(params![tenant_id], GoalRow::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn delete_goal(conn: &Connection, tenant_id: &str, id: &str) -> Result<bool> {
    let affected = conn.execute(
        "DELETE FROM goals WHERE tenant_id = ? AND id = ?",
        params![tenant_id, id],
    )?;
    Ok(affected > 0)
}

/// Recompute the goal's metric over its window and persist the result.
///
/// Returns the refreshed row.
pub fn refresh_goal(conn: &Connection, tenant_id: &str, id: &str) -> Result<Option<GoalRow>> {
    let goal = match get_goal(conn, tenant_id, id)? {
        Some(g) => g,
        None => return Ok(None),
    };

    let current = match goal.metric.as_str() {
        "revenue" => invoices::sum_payments_in_window(
            conn,
            tenant_id,
            &goal.window_start,
            &goal.window_end,
        )?,
        "hours" => time_entries::sum_hours_in_window(
            conn,
            tenant_id,
            &goal.window_start,
            &goal.window_end,
        )?,
        "clients" => clients::count_clients_in_window(
            conn,
            tenant_id,
            &goal.window_start,
            &goal.window_end,
        )? as f64,
        other => {
            return Err(AtriumError::Internal(format!(
                "goal {} has unknown metric '{}'",
                id, other
            )))
        }
    };

    conn.execute(
        "UPDATE goals SET current_value = ?, updated_at = datetime('now')
         WHERE tenant_id = ? AND id = ?",
        params![current, tenant_id, id],
    )?;

    get_goal(conn, tenant_id, id)
}
