//! Contract CRUD operations

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::db::new_id;
use crate::lifecycle::{initial_status, LifecycleKind};
use crate::types::{AtriumError, Result};

/// Contract row
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractRow {
    pub id: String,
    pub tenant_id: String,
    pub client_id: Option<String>,
    pub title: String,
    pub body: Option<String>,
    pub value: Option<f64>,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl ContractRow {
    fn from_row(row: &Row) -> std::result::Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            tenant_id: row.get("tenant_id")?,
            client_id: row.get("client_id")?,
            title: row.get("title")?,
            body: row.get("body")?,
            value: row.get("value")?,
            status: row.get("status")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Input for creating a contract
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewContract {
    pub title: String,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub value: Option<f64>,
}

/// Fields a contract PATCH may touch
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ContractPatch {
    pub title: Option<String>,
    pub client_id: Option<String>,
    pub body: Option<String>,
    pub value: Option<f64>,
    pub status: Option<String>,
    /// Bypass the transition check
    #[serde(default)]
    pub force: bool,
}

pub fn create_contract(
    conn: &Connection,
    tenant_id: &str,
    input: &NewContract,
) -> Result<ContractRow> {
    let id = new_id();
    conn.execute(
        "INSERT INTO contracts (id, tenant_id, client_id, title, body, value, status)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
        params![
            id,
            tenant_id,
            input.client_id,
            input.title,
            input.body,
            input.value,
            initial_status(LifecycleKind::Contract),
        ],
    )?;
    get_contract(conn, tenant_id, &id)?
        .ok_or_else(|| AtriumError::Internal("contract insert vanished".into()))
}

pub fn get_contract(conn: &Connection, tenant_id: &str, id: &str) -> Result<Option<ContractRow>> {
    Ok(conn
        .query_row(
            "SELECT * FROM contracts WHERE tenant_id = ? AND id = ?",
            params![tenant_id, id],
            ContractRow::from_row,
        )
        .optional()?)
}

pub fn list_contracts(
    conn: &Connection,
    tenant_id: &str,
    status: Option<&str>,
    client_id: Option<&str>,
) -> Result<Vec<ContractRow>> {
    let mut sql = String::from("SELECT * FROM contracts WHERE tenant_id = ?");
    let mut values: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(tenant_id.to_string())];

    if let Some(status) = status {
        sql.push_str(" AND status = ?");
        values.push(Box::new(status.to_string()));
    }
    if let Some(client_id) = client_id {
        sql.push_str(" AND client_id = ?");
        values.push(Box::new(client_id.to_string()));
    }
    sql.push_str(" ORDER BY created_at DESC");

    let mut stmt = conn.prepare(&sql)?;
    let refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v.as_ref()).collect();
    let rows = stmt
        .query_map(refs.as_slice(), ContractRow::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn update_contract(
    conn: &Connection,
    tenant_id: &str,
    id: &str,
    patch: &ContractPatch,
) -> Result<Option<ContractRow>> {
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
    if let Some(ref body) = patch.body {
        sets.push("body = ?");
        values.push(Box::new(body.clone()));
    }
    if let Some(value) = patch.value {
        sets.push("value = ?");
        values.push(Box::new(value));
    }
    if let Some(ref status) = patch.status {
        sets.push("status = ?");
        values.push(Box::new(status.clone()));
    }

    if !sets.is_empty() {
        let sql = format!(
            "UPDATE contracts SET {}, updated_at = datetime('now') WHERE tenant_id = ? AND id = ?",
            sets.join(", ")
        );
        values.push(Box::new(tenant_id.to_string()));
        values.push(Box::new(id.to_string()));
        let refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v.as_ref()).collect();
        conn.execute(&sql, refs.as_slice())?;
    }

    get_contract(conn, tenant_id, id)
}

pub fn delete_contract(conn: &Connection, tenant_id: &str, id: &str) -> Result<bool> {
    let affected = conn.execute(
        "DELETE FROM contracts WHERE tenant_id = ? AND id = ?",
        params![tenant_id, id],
    )?;
    Ok(affected > 0)
}
