use crate::error::{Result, StoreError};
use rusqlite::{Connection, TransactionBehavior};
use std::ops::{Deref, DerefMut};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// How long a writer waits on a locked database file before giving up
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", true)?;

    // ==========================================================================
    // Entity tables (independent, no inter-dependencies)
    // ==========================================================================
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email TEXT UNIQUE NOT NULL,
            password TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1
        );

        CREATE TABLE IF NOT EXISTS characters (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            height TEXT NOT NULL DEFAULT 'unknown',
            mass TEXT NOT NULL DEFAULT 'unknown',
            hair_color TEXT NOT NULL DEFAULT 'unknown',
            skin_color TEXT NOT NULL DEFAULT 'unknown',
            eye_color TEXT NOT NULL DEFAULT 'unknown',
            birth_year TEXT NOT NULL DEFAULT 'unknown',
            gender TEXT NOT NULL DEFAULT 'unknown'
        );

        CREATE TABLE IF NOT EXISTS planets (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            climate TEXT NOT NULL DEFAULT 'unknown',
            population TEXT NOT NULL DEFAULT 'unknown',
            orbital_period TEXT NOT NULL DEFAULT 'unknown',
            rotation_period TEXT NOT NULL DEFAULT 'unknown',
            diameter TEXT NOT NULL DEFAULT 'unknown'
        );",
    )?;

    // ==========================================================================
    // Favorite ledger
    // Exactly one target column is set; uniqueness per (user, target) is
    // enforced here as the second line of defense behind the service check.
    // ==========================================================================
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS favorites (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            character_id INTEGER REFERENCES characters(id) ON DELETE RESTRICT,
            planet_id INTEGER REFERENCES planets(id) ON DELETE RESTRICT,
            created_at TEXT NOT NULL,
            CHECK ((character_id IS NULL) <> (planet_id IS NULL))
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_favorites_user_character
            ON favorites(user_id, character_id) WHERE character_id IS NOT NULL;
        CREATE UNIQUE INDEX IF NOT EXISTS idx_favorites_user_planet
            ON favorites(user_id, planet_id) WHERE planet_id IS NOT NULL;
        CREATE INDEX IF NOT EXISTS idx_favorites_user ON favorites(user_id);",
    )?;

    Ok(())
}

/// Open a file-backed connection configured for concurrent request handling
pub fn open_connection(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    setup_database(&conn)?;
    Ok(conn)
}

/// Run `op` inside one IMMEDIATE transaction.
///
/// The write lock is taken up front, so a read-then-write sequence in `op`
/// cannot interleave with another writer. Any error from `op` rolls back.
/// A failed COMMIT is followed by an explicit ROLLBACK before the error is
/// surfaced, so the connection is clean for the next session.
pub fn with_transaction<T, F>(conn: &mut Connection, op: F) -> Result<T>
where
    F: FnOnce(&rusqlite::Transaction<'_>) -> Result<T>,
{
    run_transaction(conn, TransactionBehavior::Immediate, op)
}

/// Run a multi-statement read in one DEFERRED transaction, so every query
/// in `op` sees the same snapshot of the database.
pub fn with_read_transaction<T, F>(conn: &mut Connection, op: F) -> Result<T>
where
    F: FnOnce(&rusqlite::Transaction<'_>) -> Result<T>,
{
    run_transaction(conn, TransactionBehavior::Deferred, op)
}

fn run_transaction<T, F>(conn: &mut Connection, behavior: TransactionBehavior, op: F) -> Result<T>
where
    F: FnOnce(&rusqlite::Transaction<'_>) -> Result<T>,
{
    let tx = conn.transaction_with_behavior(behavior)?;

    match op(&tx) {
        Ok(value) => {
            if let Err(e) = tx.commit() {
                error!(error = %e, "commit failed, rolling back");
                if !conn.is_autocommit() {
                    if let Err(rollback_err) = conn.execute_batch("ROLLBACK") {
                        warn!(error = %rollback_err, "explicit rollback failed");
                    }
                }
                return Err(StoreError::Storage(e));
            }
            Ok(value)
        }
        Err(e) => {
            debug!(error = %e, "operation failed, rolling back");
            if let Err(rollback_err) = tx.rollback() {
                warn!(error = %rollback_err, "rollback failed");
            }
            Err(e)
        }
    }
}

// ============================================================================
// STORE HANDLE
// ============================================================================

/// Shared handle to the backing store.
///
/// Cloning is cheap; every clone refers to the same connection. Callers get
/// exclusive use of it through a [`Session`] scoped to one logical request.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Open (and initialize) a database file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = open_connection(path)?;
        info!(path = %path.display(), "store opened");
        Ok(Self::from_connection(conn))
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        setup_database(&conn)?;
        Ok(Self::from_connection(conn))
    }

    /// Open from a database URL: `:memory:`, a plain path, or `sqlite://path`
    pub fn from_url(url: &str) -> Result<Self> {
        if url == ":memory:" {
            return Self::open_in_memory();
        }
        let path = url.strip_prefix("sqlite://").unwrap_or(url);
        Self::open(path)
    }

    pub fn from_connection(conn: Connection) -> Self {
        Store {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Acquire the connection for one logical request
    pub fn session(&self) -> Result<Session<'_>> {
        let guard = self.conn.lock().map_err(|_| StoreError::SessionPoisoned)?;
        Ok(Session { guard })
    }
}

/// Exclusive use of the store connection; released on drop
pub struct Session<'a> {
    guard: MutexGuard<'a, Connection>,
}

impl Deref for Session<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        &self.guard
    }
}

impl DerefMut for Session<'_> {
    fn deref_mut(&mut self) -> &mut Connection {
        &mut self.guard
    }
}
