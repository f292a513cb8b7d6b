//! Lead CRUD operations

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::db::new_id;
use crate::dedupe::ContactRow;
use crate::lifecycle::{initial_status, LifecycleKind};
use crate::types::{AtriumError, Result};

/// Lead row
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadRow {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub email: Option<String>,
    pub company: Option<String>,
    pub source: Option<String>,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl LeadRow {
    fn from_row(row: &Row) -> std::result::Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            tenant_id: row.get("tenant_id")?,
            name: row.get("name")?,
            email: row.get("email")?,
            company: row.get("company")?,
            source: row.get("source")?,
            status: row.get("status")?,
            notes: row.get("notes")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Input for creating a lead
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewLead {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Insert even when duplicate candidates exist
    #[serde(default)]
    pub force: bool,
}

/// Fields a lead PATCH may touch
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LeadPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub company: Option<String>,
    pub source: Option<String>,
    pub notes: Option<String>,
    pub status: Option<String>,
    /// Bypass the transition check
    #[serde(default)]
    pub force: bool,
}

pub fn create_lead(conn: &Connection, tenant_id: &str, input: &NewLead) -> Result<LeadRow> {
    let id = new_id();
    conn.execute(
        "INSERT INTO leads (id, tenant_id, name, email, company, source, status, notes)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            id,
            tenant_id,
            input.name,
            input.email,
            input.company,
            input.source,
            initial_status(LifecycleKind::Lead),
            input.notes,
        ],
    )?;
    get_lead(conn, tenant_id, &id)?
        .ok_or_else(|| AtriumError::Internal("lead insert vanished".into()))
}

pub fn get_lead(conn: &Connection, tenant_id: &str, id: &str) -> Result<Option<LeadRow>> {
    Ok(conn
        .query_row(
            "SELECT * FROM leads WHERE tenant_id = ? AND id = ?",
            params![tenant_id, id],
            LeadRow::from_row,
        )
        .optional()?)
}

pub fn list_leads(
    conn: &Connection,
    tenant_id: &str,
    status: Option<&str>,
) -> Result<Vec<LeadRow>> {
    let mut sql = String::from("SELECT * FROM leads WHERE tenant_id = ?");
    let mut values: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(tenant_id.to_string())];

    if let Some(status) = status {
        sql.push_str(" AND status = ?");
        values.push(Box::new(status.to_string()));
    }
    sql.push_str(" ORDER BY created_at DESC");

    let mut stmt = conn.prepare(&sql)?;
    let refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v.as_ref()).collect();
    let rows = stmt
        .query_map(refs.as_slice(), LeadRow::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Minimal contact rows for duplicate matching
pub fn contact_rows(conn: &Connection, tenant_id: &str) -> Result<Vec<ContactRow>> {
    let mut stmt =
        conn.prepare("SELECT id, name, email, company FROM leads WHERE tenant_id = ?")?;
    let rows = stmt
        .query_map(params![tenant_id], |row| {
            Ok(ContactRow {
                id: row.get(0)?,
                name: row.get(1)?,
                email: row.get(2)?,
                company: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn update_lead(
    conn: &Connection,
    tenant_id: &str,
    id: &str,
    patch: &LeadPatch,
) -> Result<Option<LeadRow>> {
    let mut sets = vec![];
    let mut values: Vec<Box<dyn rusqlite::ToSql>> = vec![];

    if let Some(ref name) = patch.name {
        sets.push("name = ?");
        values.push(Box::new(name.clone()));
    }
    if let Some(ref email) = patch.email {
        sets.push("email = ?");
        values.push(Box::new(email.clone()));
    }
    if let Some(ref company) = patch.company {
        sets.push("company = ?");
        values.push(Box::new(company.clone()));
    }
    if let Some(ref source) = patch.source {
        sets.push("source = ?");
        values.push(Box::new(source.clone()));
    }
    if let Some(ref notes) = patch.notes {
        sets.push("notes = ?");
        values.push(Box::new(notes.clone()));
    }
    if let Some(ref status) = patch.status {
        sets.push("status = ?");
        values.push(Box::new(status.clone()));
    }

    if !sets.is_empty() {
        let sql = format!(
            "UPDATE leads SET {}, updated_at = datetime('now') WHERE tenant_id = ? AND id = ?",
            sets.join(", ")
        );
        values.push(Box::new(tenant_id.to_string()));
        values.push(Box::new(id.to_string()));
        let refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v.as_ref()).collect();
        conn.execute(&sql, refs.as_slice())?;
    }

    get_lead(conn, tenant_id, id)
}

pub fn set_lead_status(conn: &Connection, tenant_id: &str, id: &str, status: &str) -> Result<()> {
    conn.execute(
        "UPDATE leads SET status = ?, updated_at = datetime('now') WHERE tenant_id = ? AND id = ?",
        params![status, tenant_id, id],
    )?;
    Ok(())
}

pub fn delete_lead(conn: &Connection, tenant_id: &str, id: &str) -> Result<bool> {
    let affected = conn.execute(
        "DELETE FROM leads WHERE tenant_id = ? AND id = ?",
        params![tenant_id, id],
    )?;
    Ok(affected > 0)
}
