//! Time entry operations
//!
//! Raw rows for the utilization and goal rollups; entries are never
//! edited in place, only created and deleted.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::new_id;
use crate::types::{AtriumError, Result};

/// Time entry row
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeEntryRow {
    pub id: String,
    pub tenant_id: String,
    pub user_id: String,
    pub project_id: Option<String>,
    pub entry_date: String,
    pub hours: f64,
    pub billable: bool,
    pub notes: Option<String>,
    pub created_at: String,
}

impl TimeEntryRow {
    fn from_row(row: &Row) -> std::result::Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            tenant_id: row.get("tenant_id")?,
            user_id: row.get("user_id")?,
            project_id: row.get("project_id")?,
            entry_date: row.get("entry_date")?,
            hours: row.get("hours")?,
            billable: row.get("billable")?,
            notes: row.get("notes")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// Input for logging time
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewTimeEntry {
    pub user_id: Option<String>,
    pub entry_date: String,
    pub hours: f64,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default = "default_billable")]
    pub billable: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

fn default_billable() -> bool {
    true
}

pub fn create_time_entry(
    conn: &Connection,
    tenant_id: &str,
    user_id: &str,
    input: &NewTimeEntry,
) -> Result<TimeEntryRow> {
    let id = new_id();
    conn.execute(
        "INSERT INTO time_entries (id, tenant_id, user_id, project_id, entry_date, hours, billable, notes)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            id,
            tenant_id,
            user_id,
            input.project_id,
            input.entry_date,
            input.hours,
            input.billable,
            input.notes,
        ],
    )?;

    conn.query_row(
        "SELECT * FROM time_entries WHERE tenant_id = ? AND id = ?",
        params![tenant_id, id],
        TimeEntryRow::from_row,
    )
    .map_err(|e| AtriumError::Database(format!("time entry insert vanished: {}", e)))
}

pub fn list_time_entries(
    conn: &Connection,
    tenant_id: &str,
    user_id: Option<&str>,
    from: Option<&str>,
    to: Option<&str>,
) -> Result<Vec<TimeEntryRow>> {
    let mut sql = String::from("SELECT * FROM time_entries WHERE tenant_id = ?");
    let mut values: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(tenant_id.to_string())];

    if let Some(user_id) = user_id {
        sql.push_str(" AND user_id = ?");
        values.push(Box::new(user_id.to_string()));
    }
    if let Some(from) = from {
        sql.push_str(" AND date(entry_date) >= date(?)");
        values.push(Box::new(from.to_string()));
    }
    if let Some(to) = to {
        sql.push_str(" AND date(entry_date) <= date(?)");
        values.push(Box::new(to.to_string()));
    }
    sql.push_str(" ORDER BY entry_date DESC");

    let mut stmt = conn.prepare(&sql)?;
    let refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v.as_ref()).collect();
    let rows = stmt
        .query_map(refs.as_slice(), TimeEntryRow::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn delete_time_entry(conn: &Connection, tenant_id: &str, id: &str) -> Result<bool> {
    let affected = conn.execute(
        "DELETE FROM time_entries WHERE tenant_id = ? AND id = ?",
        params![tenant_id, id],
    )?;
    Ok(affected > 0)
}

/// Total hours logged inside a date window (goal auto-tracking)
pub fn sum_hours_in_window(
    conn: &Connection,
    tenant_id: &str,
    start: &str,
    end: &str,
) -> Result<f64> {
    let total: f64 = conn.query_row(
        "SELECT COALESCE(SUM(hours), 0) FROM time_entries
         WHERE tenant_id = ? AND date(entry_date) >= date(?) AND date(entry_date) <= date(?)",
        params![tenant_id, start, end],
        |row| row.get(0),
    )?;
    Ok(total)
}
