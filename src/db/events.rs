//! Calendar event CRUD operations

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::db::new_id;
use crate::types::{AtriumError, Result};

/// Event row
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRow {
    pub id: String,
    pub tenant_id: String,
    pub client_id: Option<String>,
    pub title: String,
    pub location: Option<String>,
    pub starts_at: String,
    pub ends_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl EventRow {
    fn from_row(row: &Row) -> std::result::Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            tenant_id: row.get("tenant_id")?,
            client_id: row.get("client_id")?,
            title: row.get("title")?,
            location: row.get("location")?,
            starts_at: row.get("starts_at")?,
            ends_at: row.get("ends_at")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Input for creating an event
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewEvent {
    pub title: String,
    pub starts_at: String,
    #[serde(default)]
    pub ends_at: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
}

/// Fields an event PATCH may touch
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EventPatch {
    pub title: Option<String>,
    pub starts_at: Option<String>,
    pub ends_at: Option<String>,
    pub location: Option<String>,
    pub client_id: Option<String>,
}

pub fn create_event(conn: &Connection, tenant_id: &str, input: &NewEvent) -> Result<EventRow> {
    let id = new_id();
    conn.execute(
        "INSERT INTO events (id, tenant_id, client_id, title, location, starts_at, ends_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
        params![
            id,
            tenant_id,
            input.client_id,
            input.title,
            input.location,
            input.starts_at,
            input.ends_at,
        ],
    )?;
    get_event(conn, tenant_id, &id)?
        .ok_or_else(|| AtriumError::Internal("event insert vanished".into()))
}

pub fn get_event(conn: &Connection, tenant_id: &str, id: &str) -> Result<Option<EventRow>> {
    Ok(conn
        .query_row(
            "SELECT * FROM events WHERE tenant_id = ? AND id = ?",
            params![tenant_id, id],
            EventRow::from_row,
        )
        .optional()?)
}

pub fn list_events(
    conn: &Connection,
    tenant_id: &str,
    client_id: Option<&str>,
) -> Result<Vec<EventRow>> {
    let mut sql = String::from("SELECT * FROM events WHERE tenant_id = ?");
    let mut values: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(tenant_id.to_string())];

    if let Some(client_id) = client_id {
        sql.push_str(" AND client_id = ?");
        values.push(Box::new(client_id.to_string()));
    }
    sql.push_str(" ORDER BY starts_at ASC");

    let mut stmt = conn.prepare(&sql)?;
    let refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v.as_ref()).collect();
    let rows = stmt
        .query_map(refs.as_slice(), EventRow::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn update_event(
    conn: &Connection,
    tenant_id: &str,
    id: &str,
    patch: &EventPatch,
) -> Result<Option<EventRow>> {
    let mut sets = vec![];
    let mut values: Vec<Box<dyn rusqlite::ToSql>> = vec![];

    if let Some(ref title) = patch.title {
        sets.push("title = ?");
        values.push(Box::new(title.clone()));
    }
    if let Some(ref starts_at) = patch.starts_at {
        sets.push("starts_at = ?");
        values.push(Box::new(starts_at.clone()));
    }
    if let Some(ref ends_at) = patch.ends_at {
        sets.push("ends_at = ?");
        values.push(Box::new(ends_at.clone()));
    }
    if let Some(ref location) = patch.location {
        sets.push("location = ?");
        values.push(Box::new(location.clone()));
    }
    if let Some(ref client_id) = patch.client_id {
        sets.push("client_id = ?");
        values.push(Box::new(client_id.clone()));
    }

    if !sets.is_empty() {
        let sql = format!(
            "UPDATE events SET {}, updated_at = datetime('now') WHERE tenant_id = ? AND id = ?",
            sets.join(", ")
        );
        values.push(Box::new(tenant_id.to_string()));
        values.push(Box::new(id.to_string()));
        let refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v.as_ref()).collect();
        conn.execute(&sql, refs.as_slice())?;
    }

    get_event(conn, tenant_id, id)
}

pub fn delete_event(conn: &Connection, tenant_id: &str, id: &str) -> Result<bool> {
    let affected = conn.execute(
        "DELETE FROM events WHERE tenant_id = ? AND id = ?",
        params![tenant_id, id],
    )?;
    Ok(affected > 0)
}
