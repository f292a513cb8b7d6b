//! Workflow automation rules and run history

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::db::new_id;
use crate::types::{AtriumError, Result};

/// Events a workflow may fire on
pub const WORKFLOW_TRIGGERS: &[&str] = &[
    "client.created",
    "lead.converted",
    "contract.signed",
    "proposal.accepted",
    "invoice.paid",
];

/// Supported workflow actions
pub const WORKFLOW_ACTIONS: &[&str] = &["log", "create_task"];

/// Workflow rule row
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowRow {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub trigger: String,
    pub action: String,
    pub params: Option<serde_json::Value>,
    pub is_enabled: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl WorkflowRow {
    fn from_row(row: &Row) -> std::result::Result<Self, rusqlite::Error> {
        let params_json: Option<String> = row.get("params_json")?;
        let params = params_json
            .as_deref()
            .and_then(|json| serde_json::from_str(json).ok());
        Ok(Self {
            id: row.get("id")?,
            tenant_id: row.get("tenant_id")?,
            name: row.get("name")?,
            trigger: row.get("trigger_event")?,
            action: row.get("action")?,
            params,
            is_enabled: row.get("is_enabled")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Workflow run row
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowRunRow {
    pub id: String,
    pub workflow_id: String,
    pub trigger: String,
    pub payload: Option<serde_json::Value>,
    pub fired_at: String,
}

impl WorkflowRunRow {
    fn from_row(row: &Row) -> std::result::Result<Self, rusqlite::Error> {
        let payload_json: Option<String> = row.get("payload_json")?;
        let payload = payload_json
            .as_deref()
            .and_then(|json| serde_json::from_str(json).ok());
        Ok(Self {
            id: row.get("id")?,
            workflow_id: row.get("workflow_id")?,
            trigger: row.get("trigger_event")?,
            payload,
            fired_at: row.get("fired_at")?,
        })
    }
}

/// Input for creating a workflow
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewWorkflow {
    pub name: String,
    pub trigger: String,
    #[serde(default = "default_action")]
    pub action: String,
    #[serde(default)]
    pub params: Option<serde_json::Value>,
}

fn default_action() -> String {
    "log".to_string()
}

/// Fields a workflow PATCH may touch
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct WorkflowPatch {
    pub name: Option<String>,
    pub trigger: Option<String>,
    pub action: Option<String>,
    pub params: Option<serde_json::Value>,
    pub is_enabled: Option<bool>,
}

pub fn create_workflow(
    conn: &Connection,
    tenant_id: &str,
    input: &NewWorkflow,
) -> Result<WorkflowRow> {
    let id = new_id();
    let params_json = input
        .params
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;
    conn.execute(
        "INSERT INTO workflows (id, tenant_id, name, trigger_event, action, params_json)
         VALUES (?, ?, ?, ?, ?, ?)",
        params![id, tenant_id, input.name, input.trigger, input.action, params_json],
    )?;
    get_workflow(conn, tenant_id, &id)?
        .ok_or_else(|| AtriumError::Internal("workflow insert vanished".into()))
}

pub fn get_workflow(conn: &Connection, tenant_id: &str, id: &str) -> Result<Option<WorkflowRow>> {
    Ok(conn
        .query_row(
            "SELECT * FROM workflows WHERE tenant_id = ? AND id = ?",
            params![tenant_id, id],
            WorkflowRow::from_row,
        )
        .optional()?)
}

pub fn list_workflows(conn: &Connection, tenant_id: &str) -> Result<Vec<WorkflowRow>> {
    let mut stmt =
        conn.prepare("SELECT * FROM workflows WHERE tenant_id = ? ORDER BY created_at ASC")?;
    let rows = stmt
        .query_map(params![tenant_id], WorkflowRow::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Enabled workflows listening for a trigger
pub fn workflows_for_trigger(
    conn: &Connection,
    tenant_id: &str,
    trigger: &str,
) -> Result<Vec<WorkflowRow>> {
    let mut stmt = conn.prepare(
        "SELECT * FROM workflows WHERE tenant_id = ? AND trigger_event = ? AND is_enabled = 1",
    )?;
    let rows = stmt
        .query_map(params![tenant_id, trigger], WorkflowRow::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn update_workflow(
    conn: &Connection,
    tenant_id: &str,
    id: &str,
    patch: &WorkflowPatch,
) -> Result<Option<WorkflowRow>> {
    let mut sets = vec![];
    let mut values: Vec<Box<dyn rusqlite::ToSql>> = vec![];

    if let Some(ref name) = patch.name {
        sets.push("name = ?");
        values.push(Box::new(name.clone()));
    }
    if let Some(ref trigger) = patch.trigger {
        sets.push("trigger_event = ?");
        values.push(Box::new(trigger.clone()));
    }
    if let Some(ref action) = patch.action {
        sets.push("action = ?");
        values.push(Box::new(action.clone()));
    }
    if let Some(ref params) = patch.params {
        sets.push("params_json = ?");
        values.push(Box::new(serde_json::to_string(params)?));
    }
    if let Some(is_enabled) = patch.is_enabled {
        sets.push("is_enabled = ?");
        values.push(Box::new(is_enabled));
    }

    if !sets.is_empty() {
        let sql = format!(
            "UPDATE workflows SET {}, updated_at = datetime('now') WHERE tenant_id = ? AND id = ?",
            sets.join(", ")
        );
        values.push(Box::new(tenant_id.to_string()));
        values.push(Box::new(id.to_string()));
        let refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v.as_ref()).collect();
        conn.execute(&sql, refs.as_slice())?;
    }

    get_workflow(conn, tenant_id, id)
}

pub fn delete_workflow(conn: &Connection, tenant_id: &str, id: &str) -> Result<bool> {
    let affected = conn.execute(
        "DELETE FROM workflows WHERE tenant_id = ? AND id = ?",
        params![tenant_id, id],
    )?;
    Ok(affected > 0)
}

pub fn record_run(
    conn: &Connection,
    tenant_id: &str,
    workflow_id: &str,
    trigger: &str,
    payload: &serde_json::Value,
) -> Result<()> {
    conn.execute(
        "INSERT INTO workflow_runs (id, tenant_id, workflow_id, trigger_event, payload_json)
         VALUES (?, ?, ?, ?, ?)",
        params![
            new_id(),
            tenant_id,
            workflow_id,
            trigger,
            serde_json::to_string(payload)?,
        ],
    )?;
    Ok(())
}

pub fn list_runs(
    conn: &Connection,
    tenant_id: &str,
    workflow_id: &str,
) -> Result<Vec<WorkflowRunRow>> {
    let mut stmt = conn.prepare(
        "SELECT * FROM workflow_runs WHERE tenant_id = ? AND workflow_id = ?
         ORDER BY fired_at DESC",
    )?;
    let rows = stmt
        .query_map(params![tenant_id, workflow_id], WorkflowRunRow::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
