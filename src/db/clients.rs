//! Client CRUD operations

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::db::new_id;
use crate::dedupe::ContactRow;
use crate::types::{AtriumError, Result};

/// Client row
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRow {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub email: Option<String>,
    pub company: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl ClientRow {
    fn from_row(row: &Row) -> std::result::Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            tenant_id: row.get("tenant_id")?,
            name: row.get("name")?,
            email: row.get("email")?,
            company: row.get("company")?,
            phone: row.get("phone")?,
            notes: row.get("notes")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Input for creating a client
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewClient {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Insert even when duplicate candidates exist
    #[serde(default)]
    pub force: bool,
}

/// Fields a client PATCH may touch
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ClientPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub company: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
}

pub fn create_client(conn: &Connection, tenant_id: &str, input: &NewClient) -> Result<ClientRow> {
    let id = new_id();
    conn.execute(
        "INSERT INTO clients (id, tenant_id, name, email, company, phone, notes)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
        params![
            id,
            tenant_id,
            input.name,
            input.email,
            input.company,
            input.phone,
            input.notes,
        ],
    )?;
    get_client(conn, tenant_id, &id)?
        .ok_or_else(|| AtriumError::Internal("client insert vanished".into()))
}

pub fn get_client(conn: &Connection, tenant_id: &str, id: &str) -> Result<Option<ClientRow>> {
    Ok(conn
        .query_row(
            "SELECT * FROM clients WHERE tenant_id = ? AND id = ?",
            params![tenant_id, id],
            ClientRow::from_row,
        )
        .optional()?)
}

pub fn list_clients(conn: &Connection, tenant_id: &str) -> Result<Vec<ClientRow>> {
    let mut stmt =
        conn.prepare("SELECT * FROM clients WHERE tenant_id = ? ORDER BY created_at DESC")?;
    let rows = stmt
        .query_map(params![tenant_id], ClientRow::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Minimal contact rows for duplicate matching
pub fn contact_rows(conn: &Connection, tenant_id: &str) -> Result<Vec<ContactRow>> {
    let mut stmt =
        conn.prepare("SELECT id, name, email, company FROM clients WHERE tenant_id = ?")?;
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

pub fn count_clients(conn: &Connection, tenant_id: &str) -> Result<u32> {
    let count: u32 = conn.query_row(
        "SELECT COUNT(*) FROM clients WHERE tenant_id = ?",
        params![tenant_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn update_client(
    conn: &Connection,
    tenant_id: &str,
    id: &str,
    patch: &ClientPatch,
) -> Result<Option<ClientRow>> {
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
    if let Some(ref phone) = patch.phone {
        sets.push("phone = ?");
        values.push(Box::new(phone.clone()));
    }
    if let Some(ref notes) = patch.notes {
        sets.push("notes = ?");
        values.push(Box::new(notes.clone()));
    }

    if !sets.is_empty() {
        let sql = format!(
            "UPDATE clients SET {}, updated_at = datetime('now') WHERE tenant_id = ? AND id = ?",
            sets.join(", ")
        );
        values.push(Box::new(tenant_id.to_string()));
        values.push(Box::new(id.to_string()));
        let refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v.as_ref()).collect();
        conn.execute(&sql, refs.as_slice())?;
    }

    get_client(conn, tenant_id, id)
}

pub fn delete_client(conn: &Connection, tenant_id: &str, id: &str) -> Result<bool> {
    let affected = conn.execute(
        "DELETE FROM clients WHERE tenant_id = ? AND id = ?",
        params![tenant_id, id],
    )?;
    Ok(affected > 0)
}

/// Clients created inside a date window (goal auto-tracking)
pub fn count_clients_in_window(
    conn: &Connection,
    tenant_id: &str,
    start: &str,
    end: &str,
) -> Result<u32> {
    let count: u32 = conn.query_row(
        "SELECT COUNT(*) FROM clients
         WHERE tenant_id = ? AND date(created_at) >= date(?) AND date(created_at) <= date(?)",
        params![tenant_id, start, end],
        |row| row.get(0),
    )?;
    Ok(count)
}
