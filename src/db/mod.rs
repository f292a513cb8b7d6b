//! SQLite storage layer
//!
//! All application data lives in a single SQLite database behind a
//! mutex-guarded connection. Every table carries a `tenant_id` column
//! and every query in the entity modules filters on it; nothing in this
//! layer returns rows across tenants.
//!
//! Entity modules expose free functions taking `&Connection` so they
//! compose under one lock acquisition per request.

pub mod activity;
pub mod clients;
pub mod contracts;
pub mod events;
pub mod goals;
pub mod invoices;
pub mod leads;
pub mod payroll;
pub mod projects;
pub mod proposals;
pub mod schema;
pub mod surveys;
pub mod tenants;
pub mod time_entries;
pub mod workflows;

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;
use tracing::{debug, info};

use crate::types::AtriumError;

/// Database handle shared by all request handlers
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open or create the database file
    pub fn open(db_path: &Path) -> Result<Self, AtriumError> {
        info!("Opening SQLite database at {:?}", db_path);

        let conn = Connection::open(db_path)
            .map_err(|e| AtriumError::Database(format!("Failed to open SQLite: {}", e)))?;

        // Enable WAL mode for better concurrent read performance
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA foreign_keys=ON;")
            .map_err(|e| AtriumError::Database(format!("Failed to set PRAGMA: {}", e)))?;

        let store = Self {
            conn: Mutex::new(conn),
        };

        store.init_schema()?;

        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self, AtriumError> {
        debug!("Opening in-memory SQLite database");

        let conn = Connection::open_in_memory()
            .map_err(|e| AtriumError::Database(format!("Failed to open in-memory SQLite: {}", e)))?;

        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .map_err(|e| AtriumError::Database(format!("Failed to set PRAGMA: {}", e)))?;

        let store = Self {
            conn: Mutex::new(conn),
        };

        store.init_schema()?;

        Ok(store)
    }

    fn init_schema(&self) -> Result<(), AtriumError> {
        let conn = self.conn()?;
        schema::init_schema(&conn)
    }

    /// Acquire the connection for a sequence of statements
    pub fn conn(&self) -> Result<MutexGuard<'_, Connection>, AtriumError> {
        self.conn
            .lock()
            .map_err(|e| AtriumError::Internal(format!("Lock poisoned: {}", e)))
    }
}

/// Generate a fresh row id
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
