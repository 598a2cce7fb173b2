//! Store handle and transaction boundary.
//!
//! # Responsibility
//! - Own the single connection constructed at process start.
//! - Run read callbacks on the plain connection and write callbacks inside
//!   one `BEGIN IMMEDIATE` transaction.
//!
//! # Invariants
//! - A write callback returning `Err` leaves the database untouched.
//! - Nothing outside the callback runs inside the transaction.

use super::{RepoError, RepoResult, Repository};
use crate::db::migrations::latest_version;
use log::{error, warn};
use rusqlite::{Connection, TransactionBehavior};

/// Transaction-owning access to a repository.
///
/// Callbacks receive `&dyn Repository`, so coordinator and service code is
/// identical for SQLite and in-memory stores.
pub trait Store {
    /// Runs `op` against committed state without opening a transaction.
    fn read<T, E>(&self, op: impl FnOnce(&dyn Repository) -> Result<T, E>) -> Result<T, E>
    where
        E: From<RepoError>;

    /// Runs `op` as one atomic unit; any `Err` rolls back every write.
    fn write<T, E>(&mut self, op: impl FnOnce(&dyn Repository) -> Result<T, E>) -> Result<T, E>
    where
        E: From<RepoError>;
}

/// Lets a caller lend its store to a short-lived service.
impl<S: Store> Store for &mut S {
    fn read<T, E>(&self, op: impl FnOnce(&dyn Repository) -> Result<T, E>) -> Result<T, E>
    where
        E: From<RepoError>,
    {
        (**self).read(op)
    }

    fn write<T, E>(&mut self, op: impl FnOnce(&dyn Repository) -> Result<T, E>) -> Result<T, E>
    where
        E: From<RepoError>,
    {
        (**self).write(op)
    }
}

/// SQLite-backed repository over a connection or an open transaction.
pub struct SqliteRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

impl<'conn> SqliteRepository<'conn> {
    /// Wraps a migrated connection, rejecting schema mismatches.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

/// Process-wide store handle, injected into services.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Takes ownership of a connection returned by `open_db*`.
    pub fn try_new(conn: Connection) -> RepoResult<Self> {
        ensure_connection_ready(&conn)?;
        Ok(Self { conn })
    }

    /// Raw connection access for diagnostics and tests.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl Store for SqliteStore {
    fn read<T, E>(&self, op: impl FnOnce(&dyn Repository) -> Result<T, E>) -> Result<T, E>
    where
        E: From<RepoError>,
    {
        let repo = SqliteRepository { conn: &self.conn };
        op(&repo)
    }

    fn write<T, E>(&mut self, op: impl FnOnce(&dyn Repository) -> Result<T, E>) -> Result<T, E>
    where
        E: From<RepoError>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(RepoError::from)?;

        let outcome = {
            let repo = SqliteRepository { conn: &tx };
            op(&repo)
        };

        match outcome {
            Ok(value) => {
                tx.commit().map_err(|err| {
                    error!("event=tx_commit module=repo status=error error={err}");
                    RepoError::from(err)
                })?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback() {
                    warn!("event=tx_rollback module=repo status=error error={rollback_err}");
                }
                Err(err)
            }
        }
    }
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }
    Ok(())
}
