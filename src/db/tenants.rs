//! Tenant and user records

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::auth::Role;
use crate::db::new_id;
use crate::plans::PlanTier;
use crate::types::{AtriumError, Result};

/// Tenant row
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantRow {
    pub id: String,
    pub name: String,
    pub plan: String,
    pub created_at: String,
    pub updated_at: String,
}

impl TenantRow {
    fn from_row(row: &Row) -> std::result::Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            plan: row.get("plan")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// User row; the password hash never serializes
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRow {
    pub id: String,
    pub tenant_id: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub display_name: String,
    pub role: String,
    pub weekly_capacity_hours: f64,
    pub is_active: bool,
    pub created_at: String,
}

impl UserRow {
    fn from_row(row: &Row) -> std::result::Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            tenant_id: row.get("tenant_id")?,
            email: row.get("email")?,
            password_hash: row.get("password_hash")?,
            display_name: row.get("display_name")?,
            role: row.get("role")?,
            weekly_capacity_hours: row.get("weekly_capacity_hours")?,
            is_active: row.get("is_active")?,
            created_at: row.get("created_at")?,
        })
    }

    /// Parse the stored role string
    pub fn role(&self) -> Role {
        self.role.parse().unwrap_or_default()
    }
}

/// Input for creating a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub display_name: String,
    pub role: Role,
    pub weekly_capacity_hours: f64,
}

/// Fields a team PATCH may touch
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UserPatch {
    pub display_name: Option<String>,
    pub role: Option<Role>,
    pub weekly_capacity_hours: Option<f64>,
    pub is_active: Option<bool>,
}

pub fn create_tenant(conn: &Connection, name: &str) -> Result<TenantRow> {
    let id = new_id();
    conn.execute(
        "INSERT INTO tenants (id, name) VALUES (?, ?)",
        params![id, name],
    )?;
    get_tenant(conn, &id)?.ok_or_else(|| AtriumError::Internal("tenant insert vanished".into()))
}

pub fn get_tenant(conn: &Connection, id: &str) -> Result<Option<TenantRow>> {
    Ok(conn
        .query_row(
            "SELECT * FROM tenants WHERE id = ?",
            params![id],
            TenantRow::from_row,
        )
        .optional()?)
}

/// The tenant's plan tier; unknown strings fall back to free
pub fn get_tenant_plan(conn: &Connection, tenant_id: &str) -> Result<PlanTier> {
    let tenant = get_tenant(conn, tenant_id)?
        .ok_or_else(|| AtriumError::NotFound(format!("tenant {} not found", tenant_id)))?;
    Ok(tenant.plan.parse().unwrap_or_default())
}

pub fn set_tenant_plan(conn: &Connection, tenant_id: &str, plan: PlanTier) -> Result<()> {
    conn.execute(
        "UPDATE tenants SET plan = ?, updated_at = datetime('now') WHERE id = ?",
        params![plan.to_string(), tenant_id],
    )?;
    Ok(())
}

pub fn create_user(conn: &Connection, tenant_id: &str, input: &NewUser) -> Result<UserRow> {
    let id = new_id();
    conn.execute(
        "INSERT INTO users (id, tenant_id, email, password_hash, display_name, role, weekly_capacity_hours)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
        params![
            id,
            tenant_id,
            input.email,
            input.password_hash,
            input.display_name,
            input.role.to_string(),
            input.weekly_capacity_hours,
        ],
    )?;
    get_user(conn, tenant_id, &id)?
        .ok_or_else(|| AtriumError::Internal("user insert vanished".into()))
}

/// Lookup by email across tenants (login does not know the tenant yet)
pub fn find_user_by_email(conn: &Connection, email: &str) -> Result<Option<UserRow>> {
    Ok(conn
        .query_row(
            "SELECT * FROM users WHERE email = ?",
            params![email],
            UserRow::from_row,
        )
        .optional()?)
}

pub fn get_user(conn: &Connection, tenant_id: &str, id: &str) -> Result<Option<UserRow>> {
    Ok(conn
        .query_row(
            "SELECT * FROM users WHERE tenant_id = ? AND id = ?",
            params![tenant_id, id],
            UserRow::from_row,
        )
        .optional()?)
}

pub fn list_users(conn: &Connection, tenant_id: &str) -> Result<Vec<UserRow>> {
    let mut stmt =
        conn.prepare("SELECT * FROM users WHERE tenant_id = ? ORDER BY created_at ASC")?;
    let rows = stmt
        .query_map(params![tenant_id], UserRow::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn count_users(conn: &Connection, tenant_id: &str) -> Result<u32> {
    let count: u32 = conn.query_row(
        "SELECT COUNT(*) FROM users WHERE tenant_id = ?",
        params![tenant_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn update_user(
    conn: &Connection,
    tenant_id: &str,
    id: &str,
    patch: &UserPatch,
) -> Result<Option<UserRow>> {
    let mut sets = vec![];
    let mut values: Vec<Box<dyn rusqlite::ToSql>> = vec![];

    if let Some(ref display_name) = patch.display_name {
        sets.push("display_name = ?");
        values.push(Box::new(display_name.clone()));
    }
    if let Some(role) = patch.role {
        sets.push("role = ?");
        values.push(Box::new(role.to_string()));
    }
    if let Some(capacity) = patch.weekly_capacity_hours {
        sets.push("weekly_capacity_hours = ?");
        values.push(Box::new(capacity));
    }
    if let Some(is_active) = patch.is_active {
        sets.push("is_active = ?");
        values.push(Box::new(is_active));
    }

    if !sets.is_empty() {
        let sql = format!(
            "UPDATE users SET {}, updated_at = datetime('now') WHERE tenant_id = ? AND id = ?",
            sets.join(", ")
        );
        values.push(Box::new(tenant_id.to_string()));
        values.push(Box::new(id.to_string()));
        let refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v.as_ref()).collect();
        conn.execute(&sql, refs.as_slice())?;
    }

    get_user(conn, tenant_id, id)
}
