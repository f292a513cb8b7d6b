//! Payroll run CRUD operations

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::db::new_id;
use crate::lifecycle::{initial_status, LifecycleKind};
use crate::types::{AtriumError, Result};

/// Payroll run row
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayrollRunRow {
    pub id: String,
    pub tenant_id: String,
    pub period_start: String,
    pub period_end: String,
    pub gross_total: f64,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl PayrollRunRow {
    fn from_row(row: &Row) -> std::result::Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            tenant_id: row.get("tenant_id")?,
            period_start: row.get("period_start")?,
            period_end: row.get("period_end")?,
            gross_total: row.get("gross_total")?,
            status: row.get("status")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Input for creating a payroll run
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewPayrollRun {
    pub period_start: String,
    pub period_end: String,
    #[serde(default)]
    pub gross_total: f64,
}

/// Fields a payroll run PATCH may touch
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PayrollRunPatch {
    pub period_start: Option<String>,
    pub period_end: Option<String>,
    pub gross_total: Option<f64>,
    pub status: Option<String>,
    /// Bypass the transition check
    #[serde(default)]
    pub force: bool,
}

pub fn create_payroll_run(
    conn: &Connection,
    tenant_id: &str,
    input: &NewPayrollRun,
) -> Result<PayrollRunRow> {
    let id = new_id();
    conn.execute(
        "INSERT INTO payroll_runs (id, tenant_id, period_start, period_end, gross_total, status)
         VALUES (?, ?, ?, ?, ?, ?)",
        params![
            id,
            tenant_id,
            input.period_start,
            input.period_end,
            input.gross_total,
            initial_status(LifecycleKind::PayrollRun),
        ],
    )?;
    get_payroll_run(conn, tenant_id, &id)?
        .ok_or_else(|| AtriumError::Internal("payroll run insert vanished".into()))
}

pub fn get_payroll_run(
    conn: &Connection,
    tenant_id: &str,
    id: &str,
) -> Result<Option<PayrollRunRow>> {
    Ok(conn
        .query_row(
            "SELECT * FROM payroll_runs WHERE tenant_id = ? AND id = ?",
            params![tenant_id, id],
            PayrollRunRow::from_row,
        )
        .optional()?)
}

pub fn list_payroll_runs(conn: &Connection, tenant_id: &str) -> Result<Vec<PayrollRunRow>> {
    let mut stmt = conn
        .prepare("SELECT * FROM payroll_runs WHERE tenant_id = ? ORDER BY period_start DESC")?;
    let rows = stmt
        .query_map(params![tenant_id], PayrollRunRow::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn update_payroll_run(
    conn: &Connection,
    tenant_id: &str,
    id: &str,
    patch: &PayrollRunPatch,
) -> Result<Option<PayrollRunRow>> {
    let mut sets = vec![];
    let mut values: Vec<Box<dyn rusqlite::ToSql>> = vec![];

    if let Some(ref period_start) = patch.period_start {
        sets.push("period_start = ?");
        values.push(Box::new(period_start.clone()));
    }
    if let Some(ref period_end) = patch.period_end {
        sets.push("period_end = ?");
        values.push(Box::new(period_end.clone()));
    }
    if let Some(gross_total) = patch.gross_total {
        sets.push("gross_total = ?");
        values.push(Box::new(gross_total));
    }
    if let Some(ref status) = patch.status {
        sets.push("status = ?");
        values.push(Box::new(status.clone()));
    }

    if !sets.is_empty() {
        let sql = format!(
            "UPDATE payroll_runs SET {}, updated_at = datetime('now') WHERE tenant_id = ? AND id = ?",
            sets.join(", ")
        );
        values.push(Box::new(tenant_id.to_string()));
        values.push(Box::new(id.to_string()));
        let refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v.as_ref()).collect();
        conn.execute(&sql, refs.as_slice())?;
    }

    get_payroll_run(conn, tenant_id, id)
}
