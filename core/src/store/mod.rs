//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! The engines work on snapshots; the service applies their results
//! through store methods and never executes SQL directly.

use crate::{error::AdmResult, import::IssueKind};
use chrono::{DateTime, Utc};
use rusqlite::{types::Type, Connection, Transaction, TransactionBehavior};

mod adm;
mod agent;

pub struct RosterStore {
    conn: Connection,
}

impl RosterStore {
    pub fn open(path: &str) -> AdmResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> AdmResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> AdmResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_roster.sql"))?;
        Ok(())
    }

    /// Run `f` inside one IMMEDIATE transaction.
    ///
    /// The write lock is taken before `f` reads anything, so a
    /// read-capacity-then-assign sequence cannot interleave with another
    /// writer. Commits only if `f` returns Ok; any Err rolls everything back.
    /// Must not be nested.
    pub fn write_batch<T>(&self, f: impl FnOnce(&Self) -> AdmResult<T>) -> AdmResult<T> {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
        let out = f(self)?;
        tx.commit()?;
        Ok(out)
    }
}

/// Map a constraint failure on insert to the per-row import issue it means.
pub(crate) fn classify_conflict(err: &rusqlite::Error) -> Option<IssueKind> {
    match err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            Some(IssueKind::DuplicatePhone)
        }
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY =>
        {
            Some(IssueKind::UnknownAdm)
        }
        _ => None,
    }
}

fn now_text() -> String {
    Utc::now().to_rfc3339()
}

fn timestamp_col(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
