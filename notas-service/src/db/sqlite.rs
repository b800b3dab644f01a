//! SQLite connection and schema.

use rusqlite::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::error::NotasResult;

const SCHEMA: &str = "
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS people (
        ra TEXT PRIMARY KEY NOT NULL,
        nome TEXT NOT NULL,
        senha TEXT NOT NULL,
        role TEXT NOT NULL DEFAULT 'agent'
    );

    CREATE TABLE IF NOT EXISTS notas (
        ticket TEXT PRIMARY KEY NOT NULL,
        agente TEXT NOT NULL REFERENCES people(ra),
        data TEXT NOT NULL,
        nota INTEGER NOT NULL CHECK (nota >= 0 AND nota <= 10)
    );

    CREATE INDEX IF NOT EXISTS idx_notas_agente_data ON notas(agente, data);
";

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) the database file and make sure the schema exists.
    pub fn new(database_url: &str) -> NotasResult<Self> {
        if database_url != ":memory:" {
            if let Some(parent) = Path::new(database_url).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
        }

        let conn = Connection::open(database_url)?;
        Self::from_connection(conn)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> NotasResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> NotasResult<Self> {
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init_tables()?;
        Ok(db)
    }

    /// Create tables if absent. Safe to run on every open.
    pub fn init_tables(&self) -> NotasResult<()> {
        self.conn().execute_batch(SCHEMA)?;
        log::debug!("[DB] Schema ready");
        Ok(())
    }

    /// Lock the connection. A poisoned lock is recovered since every
    /// statement runs in auto-commit and leaves nothing half-written.
    pub(crate) fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
