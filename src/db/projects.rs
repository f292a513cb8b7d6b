//! Project and task CRUD operations

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::db::new_id;
use crate::lifecycle::{initial_status, LifecycleKind};
use crate::types::{AtriumError, Result};

/// Project row
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRow {
    pub id: String,
    pub tenant_id: String,
    pub client_id: Option<String>,
    pub name: String,
    pub status: String,
    pub budget_hours: Option<f64>,
    pub created_at: String,
    pub updated_at: String,
}

impl ProjectRow {
    fn from_row(row: &Row) -> std::result::Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            tenant_id: row.get("tenant_id")?,
            client_id: row.get("client_id")?,
            name: row.get("name")?,
            status: row.get("status")?,
            budget_hours: row.get("budget_hours")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Task row
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRow {
    pub id: String,
    pub tenant_id: String,
    pub project_id: Option<String>,
    pub assignee_id: Option<String>,
    pub title: String,
    pub estimate_hours: Option<f64>,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl TaskRow {
    fn from_row(row: &Row) -> std::result::Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            tenant_id: row.get("tenant_id")?,
            project_id: row.get("project_id")?,
            assignee_id: row.get("assignee_id")?,
            title: row.get("title")?,
            estimate_hours: row.get("estimate_hours")?,
            status: row.get("status")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Input for creating a project
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewProject {
    pub name: String,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub budget_hours: Option<f64>,
}

/// Fields a project PATCH may touch; status is a plain column here
/// (active/archived), not a lifecycle
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub client_id: Option<String>,
    pub budget_hours: Option<f64>,
    pub status: Option<String>,
}

/// Input for creating a task
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub assignee_id: Option<String>,
    #[serde(default)]
    pub estimate_hours: Option<f64>,
}

/// Fields a task PATCH may touch
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub project_id: Option<String>,
    pub assignee_id: Option<String>,
    pub estimate_hours: Option<f64>,
    pub status: Option<String>,
    /// Bypass the transition check
    #[serde(default)]
    pub force: bool,
}

pub fn create_project(
    conn: &Connection,
    tenant_id: &str,
    input: &NewProject,
) -> Result<ProjectRow> {
    let id = new_id();
    conn.execute(
        "INSERT INTO projects (id, tenant_id, client_id, name, budget_hours)
         VALUES (?, ?, ?, ?, ?)",
        params![id, tenant_id, input.client_id, input.name, input.budget_hours],
    )?;
    get_project(conn, tenant_id, &id)?
        .ok_or_else(|| AtriumError::Internal("project insert vanished".into()))
}

pub fn get_project(conn: &Connection, tenant_id: &str, id: &str) -> Result<Option<ProjectRow>> {
    Ok(conn
        .query_row(
            "SELECT * FROM projects WHERE tenant_id = ? AND id = ?",
            params![tenant_id, id],
            ProjectRow::from_row,
        )
        .optional()?)
}

pub fn list_projects(conn: &Connection, tenant_id: &str) -> Result<Vec<ProjectRow>> {
    let mut stmt =
        conn.prepare("SELECT * FROM projects WHERE tenant_id = ? ORDER BY created_at DESC")?;
    let rows = stmt
        .query_map(params![tenant_id], ProjectRow::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn count_projects(conn: &Connection, tenant_id: &str) -> Result<u32> {
    let count: u32 = conn.query_row(
        "SELECT COUNT(*) FROM projects WHERE tenant_id = ?",
        params![tenant_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn update_project(
    conn: &Connection,
    tenant_id: &str,
    id: &str,
    patch: &ProjectPatch,
) -> Result<Option<ProjectRow>> {
    let mut sets = vec![];
    let mut values: Vec<Box<dyn rusqlite::ToSql>> = vec![];

    if let Some(ref name) = patch.name {
        sets.push("name = ?");
        values.push(Box::new(name.clone()));
    }
    if let Some(ref client_id) = patch.client_id {
        sets.push("client_id = ?");
        values.push(Box::new(client_id.clone()));
    }
    if let Some(budget_hours) = patch.budget_hours {
        sets.push("budget_hours = ?");
        values.push(Box::new(budget_hours));
    }
    if let Some(ref status) = patch.status {
        sets.push("status = ?");
        values.push(Box::new(status.clone()));
    }

    if !sets.is_empty() {
        let sql = format!(
            "UPDATE projects SET {}, updated_at = datetime('now') WHERE tenant_id = ? AND id = ?",
            sets.join(", ")
        );
        values.push(Box::new(tenant_id.to_string()));
        values.push(Box::new(id.to_string()));
        let refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v.as_ref()).collect();
        conn.execute(&sql, refs.as_slice())?;
    }

    get_project(conn, tenant_id, id)
}

pub fn delete_project(conn: &Connection, tenant_id: &str, id: &str) -> Result<bool> {
    let affected = conn.execute(
        "DELETE FROM projects WHERE tenant_id = ? AND id = ?",
        params![tenant_id, id],
    )?;
    Ok(affected > 0)
}

pub fn create_task(conn: &Connection, tenant_id: &str, input: &NewTask) -> Result<TaskRow> {
    let id = new_id();
    conn.execute(
        "INSERT INTO tasks (id, tenant_id, project_id, assignee_id, title, estimate_hours, status)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
        params![
            id,
            tenant_id,
            input.project_id,
            input.assignee_id,
            input.title,
            input.estimate_hours,
            initial_status(LifecycleKind::Task),
        ],
    )?;
    get_task(conn, tenant_id, &id)?
        .ok_or_else(|| AtriumError::Internal("task insert vanished".into()))
}

pub fn get_task(conn: &Connection, tenant_id: &str, id: &str) -> Result<Option<TaskRow>> {
    Ok(conn
        .query_row(
            "SELECT * FROM tasks WHERE tenant_id = ? AND id = ?",
            params![tenant_id, id],
            TaskRow::from_row,
        )
        .optional()?)
}

pub fn list_tasks(
    conn: &Connection,
    tenant_id: &str,
    project_id: Option<&str>,
    status: Option<&str>,
) -> Result<Vec<TaskRow>> {
    let mut sql = String::from("SELECT * FROM tasks WHERE tenant_id = ?");
    let mut values: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(tenant_id.to_string())];

    if let Some(project_id) = project_id {
        sql.push_str(" AND project_id = ?");
        values.push(Box::new(project_id.to_string()));
    }
    if let Some(status) = status {
        sql.push_str(" AND status = ?");
        values.push(Box::new(status.to_string()));
    }
    sql.push_str(" ORDER BY created_at DESC");

    let mut stmt = conn.prepare(&sql)?;
    let refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v.as_ref()).collect();
    let rows = stmt
        .query_map(refs.as_slice(), TaskRow::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn update_task(
    conn: &Connection,
    tenant_id: &str,
    id: &str,
    patch: &TaskPatch,
) -> Result<Option<TaskRow>> {
    let mut sets = vec![];
    let mut values: Vec<Box<dyn rusqlite::ToSql>> = vec![];

    if let Some(ref title) = patch.title {
        sets.push("title = ?");
        values.push(Box::new(title.clone()));
    }
    if let Some(ref project_id) = patch.project_id {
        sets.push("project_id = ?");
        values.push(Box::new(project_id.clone()));
    }
    if let Some(ref assignee_id) = patch.assignee_id {
        sets.push("assignee_id = ?");
        values.push(Box::new(assignee_id.clone()));
    }
    if let Some(estimate_hours) = patch.estimate_hours {
        sets.push("estimate_hours = ?");
        values.push(Box::new(estimate_hours));
    }
    if let Some(ref status) = patch.status {
        sets.push("status = ?");
        values.push(Box::new(status.clone()));
    }

    if !sets.is_empty() {
        let sql = format!(
            "UPDATE tasks SET {}, updated_at = datetime('now') WHERE tenant_id = ? AND id = ?",
            sets.join(", ")
        );
        values.push(Box::new(tenant_id.to_string()));
        values.push(Box::new(id.to_string()));
        let refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v.as_ref()).collect();
        conn.execute(&sql, refs.as_slice())?;
    }

    get_task(conn, tenant_id, id)
}

pub fn delete_task(conn: &Connection, tenant_id: &str, id: &str) -> Result<bool> {
    let affected = conn.execute(
        "DELETE FROM tasks WHERE tenant_id = ? AND id = ?",
        params![tenant_id, id],
    )?;
    Ok(affected > 0)
}
