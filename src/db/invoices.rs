//! Invoice and payment operations
//!
//! Payment recording is a sequential two-step write: insert the payment
//! row, then recompute the invoice's paid total and status. There is no
//! transaction spanning the two statements; a crash in between leaves
//! the payment committed and the totals stale.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::db::new_id;
use crate::lifecycle::{initial_status, LifecycleKind};
use crate::types::{AtriumError, Result};

/// Invoice row
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceRow {
    pub id: String,
    pub tenant_id: String,
    pub client_id: Option<String>,
    pub number: String,
    pub amount_total: f64,
    pub amount_paid: f64,
    pub status: String,
    pub issued_on: Option<String>,
    pub due_on: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl InvoiceRow {
    fn from_row(row: &Row) -> std::result::Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            tenant_id: row.get("tenant_id")?,
            client_id: row.get("client_id")?,
            number: row.get("number")?,
            amount_total: row.get("amount_total")?,
            amount_paid: row.get("amount_paid")?,
            status: row.get("status")?,
            issued_on: row.get("issued_on")?,
            due_on: row.get("due_on")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Payment row
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRow {
    pub id: String,
    pub tenant_id: String,
    pub invoice_id: String,
    pub amount: f64,
    pub paid_on: String,
    pub method: Option<String>,
    pub created_at: String,
}

impl PaymentRow {
    fn from_row(row: &Row) -> std::result::Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            tenant_id: row.get("tenant_id")?,
            invoice_id: row.get("invoice_id")?,
            amount: row.get("amount")?,
            paid_on: row.get("paid_on")?,
            method: row.get("method")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// Input for creating an invoice
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewInvoice {
    pub number: String,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub amount_total: f64,
    #[serde(default)]
    pub issued_on: Option<String>,
    #[serde(default)]
    pub due_on: Option<String>,
}

/// Fields an invoice PATCH may touch
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct InvoicePatch {
    pub number: Option<String>,
    pub client_id: Option<String>,
    pub amount_total: Option<f64>,
    pub issued_on: Option<String>,
    pub due_on: Option<String>,
    pub status: Option<String>,
    /// Bypass the transition check
    #[serde(default)]
    pub force: bool,
}

/// Input for recording a payment
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewPayment {
    pub amount: f64,
    pub paid_on: String,
    #[serde(default)]
    pub method: Option<String>,
}

pub fn create_invoice(
    conn: &Connection,
    tenant_id: &str,
    input: &NewInvoice,
) -> Result<InvoiceRow> {
    let id = new_id();
    conn.execute(
        "INSERT INTO invoices (id, tenant_id, client_id, number, amount_total, issued_on, due_on, status)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            id,
            tenant_id,
            input.client_id,
            input.number,
            input.amount_total,
            input.issued_on,
            input.due_on,
            initial_status(LifecycleKind::Invoice),
        ],
    )?;
    get_invoice(conn, tenant_id, &id)?
        .ok_or_else(|| AtriumError::Internal("invoice insert vanished".into()))
}

pub fn get_invoice(conn: &Connection, tenant_id: &str, id: &str) -> Result<Option<InvoiceRow>> {
    Ok(conn
        .query_row(
            "SELECT * FROM invoices WHERE tenant_id = ? AND id = ?",
            params![tenant_id, id],
            InvoiceRow::from_row,
        )
        .optional()?)
}

pub fn list_invoices(
    conn: &Connection,
    tenant_id: &str,
    status: Option<&str>,
    client_id: Option<&str>,
) -> Result<Vec<InvoiceRow>> {
    let mut sql = String::from("SELECT * FROM invoices WHERE tenant_id = ?");
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
        .query_map(refs.as_slice(), InvoiceRow::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Invoices created this calendar month (plan cap check)
pub fn count_invoices_this_month(conn: &Connection, tenant_id: &str) -> Result<u32> {
    let count: u32 = conn.query_row(
        "SELECT COUNT(*) FROM invoices
         WHERE tenant_id = ? AND strftime('%Y-%m', created_at) = strftime('%Y-%m', 'now')",
        params![tenant_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn update_invoice(
    conn: &Connection,
    tenant_id: &str,
    id: &str,
    patch: &InvoicePatch,
) -> Result<Option<InvoiceRow>> {
    let mut sets = vec![];
    let mut values: Vec<Box<dyn rusqlite::ToSql>> = vec![];

    if let Some(ref number) = patch.number {
        sets.push("number = ?");
        values.push(Box::new(number.clone()));
    }
    if let Some(ref client_id) = patch.client_id {
        sets.push("client_id = ?");
        values.push(Box::new(client_id.clone()));
    }
    if let Some(amount_total) = patch.amount_total {
        sets.push("amount_total = ?");
        values.push(Box::new(amount_total));
    }
    if let Some(ref issued_on) = patch.issued_on {
        sets.push("issued_on = ?");
        values.push(Box::new(issued_on.clone()));
    }
    if let Some(ref due_on) = patch.due_on {
        sets.push("due_on = ?");
        values.push(Box::new(due_on.clone()));
    }
    if let Some(ref status) = patch.status {
        sets.push("status = ?");
        values.push(Box::new(status.clone()));
    }

    if !sets.is_empty() {
        let sql = format!(
            "UPDATE invoices SET {}, updated_at = datetime('now') WHERE tenant_id = ? AND id = ?",
            sets.join(", ")
        );
        values.push(Box::new(tenant_id.to_string()));
        values.push(Box::new(id.to_string()));
        let refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v.as_ref()).collect();
        conn.execute(&sql, refs.as_slice())?;
    }

    get_invoice(conn, tenant_id, id)
}

/// Record a payment, then bring the invoice totals up to date.
///
/// Two sequential statements, not a transaction. The invoice flips to
/// `paid` once payments cover the total, but only from a status that
/// allows it (sent/overdue); drafts keep their status.
pub fn record_payment(
    conn: &Connection,
    tenant_id: &str,
    invoice_id: &str,
    input: &NewPayment,
) -> Result<(PaymentRow, InvoiceRow)> {
    let id = new_id();
    conn.execute(
        "INSERT INTO payments (id, tenant_id, invoice_id, amount, paid_on, method)
         VALUES (?, ?, ?, ?, ?, ?)",
        params![id, tenant_id, invoice_id, input.amount, input.paid_on, input.method],
    )?;

    let paid: f64 = conn.query_row(
        "SELECT COALESCE(SUM(amount), 0) FROM payments WHERE tenant_id = ? AND invoice_id = ?",
        params![tenant_id, invoice_id],
        |row| row.get(0),
    )?;

    conn.execute(
        "UPDATE invoices SET amount_paid = ?,
            status = CASE
                WHEN ? >= amount_total AND status IN ('sent', 'overdue') THEN 'paid'
                ELSE status
            END,
            updated_at = datetime('now')
         WHERE tenant_id = ? AND id = ?",
        params![paid, paid, tenant_id, invoice_id],
    )?;

    let payment = conn.query_row(
        "SELECT * FROM payments WHERE tenant_id = ? AND id = ?",
        params![tenant_id, id],
        PaymentRow::from_row,
    )?;
    let invoice = get_invoice(conn, tenant_id, invoice_id)?
        .ok_or_else(|| AtriumError::Internal("invoice vanished after payment".into()))?;

    Ok((payment, invoice))
}

pub fn list_payments(
    conn: &Connection,
    tenant_id: &str,
    invoice_id: &str,
) -> Result<Vec<PaymentRow>> {
    let mut stmt = conn.prepare(
        "SELECT * FROM payments WHERE tenant_id = ? AND invoice_id = ? ORDER BY paid_on ASC",
    )?;
    let rows = stmt
        .query_map(params![tenant_id, invoice_id], PaymentRow::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Payments received inside a date window (goal auto-tracking)
pub fn sum_payments_in_window(
    conn: &Connection,
    tenant_id: &str,
    start: &str,
    end: &str,
) -> Result<f64> {
    let total: f64 = conn.query_row(
        "SELECT COALESCE(SUM(amount), 0) FROM payments
         WHERE tenant_id = ? AND date(paid_on) >= date(?) AND date(paid_on) <= date(?)",
        params![tenant_id, start, end],
        |row| row.get(0),
    )?;
    Ok(total)
}
