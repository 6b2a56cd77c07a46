//! SQLite implementation of the store traits.
//!
//! One database holds every chain of a node plus its identity. Entries are
//! stored as their JSON line alongside indexed columns, so a chain exported
//! from SQLite is byte-compatible with the JSONL format.

use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::{params, Connection, ErrorCode, OptionalExtension, TransactionBehavior};
use tracing::{debug, warn};

use charter_core::{ChainEntry, ChainId, IdentityRecord};

use crate::error::{Result, StoreError};
use crate::migration::{self, now_millis};
use crate::traits::{check_link, ChainStore, IdentityStore};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. Clones share the connection, so one
/// database can serve as both the chain and the identity store.
#[derive(Clone)]
pub struct SqliteStore {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Execute an operation on the connection.
    fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Lock(format!("mutex poisoned: {}", e)))?;
        f(&mut conn)
    }
}

/// Parse stored entry rows, skipping any that no longer parse.
fn parse_rows(chain: &ChainId, rows: Vec<(i64, String)>) -> Vec<ChainEntry> {
    rows.into_iter()
        .filter_map(|(idx, json)| match serde_json::from_str(&json) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(chain = %chain, idx, error = %e, "skipping unparseable chain row");
                None
            }
        })
        .collect()
}

fn query_entries(
    conn: &Connection,
    sql: &str,
    chain: &ChainId,
    limit: i64,
) -> Result<Vec<(i64, String)>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params![chain.as_str(), limit], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

const SELECT_ASC: &str = "SELECT idx, entry_json FROM chain_entries
     WHERE chain_id = ?1 ORDER BY idx ASC LIMIT ?2";
const SELECT_DESC: &str = "SELECT idx, entry_json FROM chain_entries
     WHERE chain_id = ?1 ORDER BY idx DESC LIMIT ?2";

fn head_of(conn: &Connection, chain: &ChainId) -> Result<Option<ChainEntry>> {
    let rows = query_entries(conn, SELECT_DESC, chain, -1)?;
    Ok(rows.into_iter().find_map(|(_, json)| serde_json::from_str(&json).ok()))
}

impl ChainStore for SqliteStore {
    fn append_with<F>(&self, chain: &ChainId, build: F) -> Result<ChainEntry>
    where
        F: FnOnce(Option<&ChainEntry>) -> ChainEntry,
    {
        let entry = self.with_conn(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let head = head_of(&tx, chain)?;
            let entry = build(head.as_ref());
            check_link(chain, head.as_ref(), &entry)?;

            let json = serde_json::to_string(&entry)?;
            let inserted = tx.execute(
                "INSERT INTO chain_entries (
                    chain_id, idx, event, timestamp, hash, entry_json, appended_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    chain.as_str(),
                    entry.index as i64,
                    entry.event,
                    entry.timestamp,
                    entry.hash.to_hex(),
                    json,
                    now_millis(),
                ],
            );
            match inserted {
                Ok(_) => {}
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == ErrorCode::ConstraintViolation =>
                {
                    return Err(StoreError::Conflict {
                        chain: chain.to_string(),
                        index: entry.index,
                    });
                }
                Err(e) => return Err(e.into()),
            }

            tx.commit()?;
            Ok(entry)
        })?;

        debug!(chain = %chain, index = entry.index, event = %entry.event, "appended entry");
        Ok(entry)
    }

    fn head(&self, chain: &ChainId) -> Result<Option<ChainEntry>> {
        self.with_conn(|conn| head_of(conn, chain))
    }

    fn read_all(&self, chain: &ChainId) -> Result<Vec<ChainEntry>> {
        let rows = self.with_conn(|conn| query_entries(conn, SELECT_ASC, chain, -1))?;
        Ok(parse_rows(chain, rows))
    }

    fn read_tail(&self, chain: &ChainId, n: usize) -> Result<Vec<ChainEntry>> {
        let limit = i64::try_from(n).unwrap_or(i64::MAX);
        let mut rows = self.with_conn(|conn| query_entries(conn, SELECT_DESC, chain, limit))?;
        rows.reverse();
        Ok(parse_rows(chain, rows))
    }

    fn count(&self, chain: &ChainId) -> Result<u64> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM chain_entries WHERE chain_id = ?1",
                params![chain.as_str()],
                |row| row.get(0),
            )?;
            Ok(n as u64)
        })
    }

    fn list_chains(&self) -> Result<Vec<ChainId>> {
        let ids: Vec<String> = self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT DISTINCT chain_id FROM chain_entries ORDER BY chain_id")?;
            let ids = stmt
                .query_map([], |row| row.get(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(ids)
        })?;

        let mut chains: Vec<ChainId> = ids
            .iter()
            .filter_map(|s| ChainId::parse(s).ok())
            .collect();
        // Identity chain first, then contexts by name.
        chains.sort_by_key(|c| (!c.is_identity(), c.clone()));
        Ok(chains)
    }
}

impl IdentityStore for SqliteStore {
    fn load(&self) -> Result<Option<IdentityRecord>> {
        let json: Option<String> = self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT record_json FROM identity WHERE slot = 0",
                    [],
                    |row| row.get(0),
                )
                .optional()?)
        })?;
        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn save(&self, record: &IdentityRecord) -> Result<()> {
        let json = serde_json::to_string(record)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO identity (slot, record_json, updated_at) VALUES (0, ?1, ?2)
                 ON CONFLICT(slot) DO UPDATE SET
                    record_json = excluded.record_json,
                    updated_at = excluded.updated_at",
                params![json, now_millis()],
            )?;
            Ok(())
        })
    }
}
