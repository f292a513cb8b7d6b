//! Proposal CRUD operations

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::db::new_id;
use crate::lifecycle::{initial_status, LifecycleKind};
use crate::types::{AtriumError, Result};

/// Proposal row
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalRow {
    pub id: String,
    pub tenant_id: String,
    pub client_id: Option<String>,
    pub title: String,
    pub amount: Option<f64>,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl ProposalRow {
    fn from_row(row: &Row) -> std::result::Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            tenant_id: row.get("tenant_id")?,
            client_id: row.get("client_id")?,
            title: row.get("title")?,
            amount: row.get("amount")?,
            status: row.get("status")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Input for creating a proposal
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewProposal {
    pub title: String,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub amount: Option<f64>,
}

/// Fields a proposal PATCH may touch
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProposalPatch {
    pub title: Option<String>,
    pub client_id: Option<String>,
    pub amount: Option<f64>,
    pub status: Option<String>,
    /// Bypass the transition check
    #[serde(default)]
    pub force: bool,
}

pub fn create_proposal(
    conn: &Connection,
    tenant_id: &str,
    input: &NewProposal,
) -> Result<ProposalRow> {
    let id = new_id();
    conn.execute(
        "INSERT INTO proposals (id, tenant_id, client_id, title, amount, status)
         VALUES (?, ?, ?, ?, ?, ?)",
        params![
            id,
            tenant_id,
            input.client_id,
            input.title,
            input.amount,
            initial_status(LifecycleKind::Proposal),
        ],
    )?;
    get_proposal(conn, tenant_id, &id)?
        .ok_or_else(|| AtriumError::Internal("proposal insert vanished".into()))
}

pub fn get_proposal(conn: &Connection, tenant_id: &str, id: &str) -> Result<Option<ProposalRow>> {
    Ok(conn
        .query_row(
            "SELECT * FROM proposals WHERE tenant_id = ? AND id = ?",
            params![tenant_id, id],
            ProposalRow::from_row,
        )
        .optional()?)
}

pub fn list_proposals(
    conn: &Connection,
    tenant_id: &str,
    status: Option<&str>,
) -> Result<Vec<ProposalRow>> {
    let mut sql = String::from("SELECT * FROM proposals WHERE tenant_id = ?");
    let mut values: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(tenant_id.to_string())];

    if let Some(status) = status {
        sql.push_str(" AND status = ?");
        values.push(Box::new(status.to_string()));
    }
    sql.push_str(" ORDER BY created_at DESC");

    let mut stmt = conn.prepare(&sql)?;
    let refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v.as_ref()).collect();
    let rows = stmt
        .query_map(refs.as_slice(), ProposalRow::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn update_proposal(
    conn: &Connection,
    tenant_id: &str,
    id: &str,
    patch: &ProposalPatch,
) -> Result<Option<ProposalRow>> {
    let mut sets = vec![];
    let mut values: Vec<Box<dyn rusqlite::ToSql>> = vec![];

    if let Some(ref title) = patch.title {
        sets.push("title = ?");
        values.push(Box::new(title.clone()));
    }
    if let Some(ref client_id) = patch.client_id {
        sets.push("client_id = ?");
        values.push(Box::new(client_id.clone()));
    }
    if let Some(amount) = patch.amount {
        sets.push("amount = ?");
        values.push(Box::new(amount));
    }
    if let Some(ref status) = patch.status {
        sets.push("status = ?");
        values.push(Box::new(status.clone()));
    }

    if !sets.is_empty() {
        let sql = format!(
            "UPDATE proposals SET {}, updated_at = datetime('now') WHERE tenant_id = ? AND id = ?",
            sets.join(", ")
        );
        values.push(Box::new(tenant_id.to_string()));
        values.push(Box::new(id.to_string()));
        let refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v.as_ref()).collect();
        conn.execute(&sql, refs.as_slice())?;
    }

    get_proposal(conn, tenant_id, id)
}

pub fn delete_proposal(conn: &Connection, tenant_id: &str, id: &str) -> Result<bool> {
    let affected = conn.execute(
        "DELETE FROM proposals WHERE tenant_id = ? AND id = ?",
        params![tenant_id, id],
    )?;
    Ok(affected > 0)
}
