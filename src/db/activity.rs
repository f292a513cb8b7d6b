//! Activity log
//!
//! Secondary writes recorded after a primary mutation commits. Callers
//! treat failures here as best-effort: logged and swallowed.

use rusqlite::{params, Connection, Row};
use serde::Serialize;

use crate::db::new_id;
use crate::types::Result;

/// Activity log row
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRow {
    pub id: String,
    pub actor_id: Option<String>,
    pub entity_kind: String,
    pub entity_id: String,
    pub verb: String,
    pub detail: Option<String>,
    pub created_at: String,
}

impl ActivityRow {
    fn from_row(row: &Row) -> std::result::Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            actor_id: row.get("actor_id")?,
            entity_kind: row.get("entity_kind")?,
            entity_id: row.get("entity_id")?,
            verb: row.get("verb")?,
            detail: row.get("detail")?,
            created_at: row.get("created_at")?,
        })
    }
}

pub fn record(
    conn: &Connection,
    tenant_id: &str,
    actor_id: Option<&str>,
    entity_kind: &str,
    entity_id: &str,
    verb: &str,
    detail: Option<&str>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO activity_log (id, tenant_id, actor_id, entity_kind, entity_id, verb, detail)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
        params![new_id(), tenant_id, actor_id, entity_kind, entity_id, verb, detail],
    )?;
    Ok(())
}

pub fn list_recent(conn: &Connection, tenant_id: &str, limit: u32) -> Result<Vec<ActivityRow>> {
    let mut stmt = conn.prepare(
        "SELECT * FROM activity_log WHERE tenant_id = ? ORDER BY created_at DESC, rowid DESC LIMIT ?",
    )?;
    let rows = stmt
        .query_map(params![tenant_id, limit], ActivityRow::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
