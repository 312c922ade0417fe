//! Persistent member/level cache.
//!
//! One entry per (principal?, datasource, cube, level): the level's
//! member list as discovered from the server. Entries let later queries
//! resolve ancestor members without extra round trips. The durable
//! store is SQLite (`~/.prism/cache.db`), a key/value table with JSON
//! values; a process-wide in-memory index fronts it.
//!
//! Write order is durable-first: the SQLite commit happens before the
//! index update, so a concurrent reader observes either the old or the
//! new value, never a half-written one. The durable store is
//! authoritative; the index is a cache of it. Concurrent writers to the
//! same key race with last-writer-wins, acceptable because entries are
//! derived, re-computable data.
//!
//! Invalidation is whole-datasource only: every key carrying the data
//! source's normalized prefix is deleted.

pub mod key;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock};

use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::model::{Dimension, Member};

pub use key::{normalize, CacheScope};

/// Current cache schema version. Bump this when the entry format changes.
const CACHE_VERSION: i32 = 1;

/// Errors that can occur during cache operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to determine cache directory")]
    NoCacheDir,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type CacheResult<T> = Result<T, CacheError>;

/// Cached member list for one hierarchy level: the header fields plus
/// the member rows recorded at discovery time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelEntry {
    pub level_unique_name: String,
    pub level_number: i32,
    pub members: Vec<Member>,
}

impl LevelEntry {
    pub fn new(level_unique_name: impl Into<String>, level_number: i32) -> Self {
        Self {
            level_unique_name: level_unique_name.into(),
            level_number,
            members: Vec::new(),
        }
    }

    /// Find a member by unique name.
    pub fn member(&self, unique_name: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.unique_name == unique_name)
    }
}

/// The member/level cache service.
///
/// Constructed once per process and injected into the executor; there
/// is no global instance. `get`/`put` are safe to call from the query
/// thread and the cancellation thread alike.
pub struct MemberCache {
    conn: Mutex<Connection>,
    index: RwLock<HashMap<String, Arc<LevelEntry>>>,
}

impl MemberCache {
    /// Open or create the cache database at `~/.prism/cache.db`.
    ///
    /// A version mismatch clears the cache.
    pub fn open() -> CacheResult<Self> {
        let path = Self::cache_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&path)?;
        let cache = Self {
            conn: Mutex::new(conn),
            index: RwLock::new(HashMap::new()),
        };
        cache.init()?;
        Ok(cache)
    }

    /// Open an in-memory cache (for testing).
    pub fn open_in_memory() -> CacheResult<Self> {
        let conn = Connection::open_in_memory()?;
        let cache = Self {
            conn: Mutex::new(conn),
            index: RwLock::new(HashMap::new()),
        };
        cache.init()?;
        Ok(cache)
    }

    /// Get the path to the cache database.
    pub fn cache_path() -> CacheResult<PathBuf> {
        let base = dirs::home_dir().ok_or(CacheError::NoCacheDir)?;
        Ok(base.join(".prism").join("cache.db"))
    }

    fn init(&self) -> CacheResult<()> {
        let conn = self.conn.lock().expect("cache lock poisoned");
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS levels (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            ",
        )?;

        let stored: Option<i32> = conn
            .query_row("SELECT value FROM meta WHERE key = 'version'", [], |row| {
                let s: String = row.get(0)?;
                Ok(s.parse().unwrap_or(0))
            })
            .optional()?;

        match stored {
            Some(v) if v == CACHE_VERSION => {}
            Some(_) => {
                conn.execute("DELETE FROM levels", [])?;
                Self::set_version(&conn)?;
            }
            None => Self::set_version(&conn)?,
        }
        Ok(())
    }

    fn set_version(conn: &Connection) -> CacheResult<()> {
        conn.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES ('version', ?)",
            params![CACHE_VERSION.to_string()],
        )?;
        Ok(())
    }

    /// Get a level entry as an owned copy the caller may mutate.
    pub fn get(&self, key: &str) -> CacheResult<Option<LevelEntry>> {
        Ok(self.get_shared(key)?.map(|e| (*e).clone()))
    }

    /// Get a level entry read-only, without copying the member rows.
    pub fn get_shared(&self, key: &str) -> CacheResult<Option<Arc<LevelEntry>>> {
        if let Some(entry) = self.index.read().expect("cache lock poisoned").get(key) {
            return Ok(Some(Arc::clone(entry)));
        }

        let json: Option<String> = {
            let conn = self.conn.lock().expect("cache lock poisoned");
            conn.query_row(
                "SELECT value FROM levels WHERE key = ?",
                params![key],
                |row| row.get(0),
            )
            .optional()?
        };

        let Some(json) = json else {
            return Ok(None);
        };

        // An unreadable persisted blob is a miss, not a failure; the
        // level gets refetched from the server.
        let entry: LevelEntry = match serde_json::from_str(&json) {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!("discarding corrupt cache entry {}: {}", key, err);
                return Ok(None);
            }
        };

        let entry = Arc::new(entry);
        self.index
            .write()
            .expect("cache lock poisoned")
            .insert(key.to_string(), Arc::clone(&entry));
        Ok(Some(entry))
    }

    /// Persist a level entry and publish it to the in-memory index.
    ///
    /// The durable write commits first; if it fails the index is left
    /// untouched and the write is discarded.
    pub fn put(&self, key: &str, entry: LevelEntry) -> CacheResult<()> {
        let json = serde_json::to_string(&entry)?;
        {
            let conn = self.conn.lock().expect("cache lock poisoned");
            conn.execute(
                "INSERT OR REPLACE INTO levels (key, value) VALUES (?, ?)",
                params![key, json],
            )?;
        }
        self.index
            .write()
            .expect("cache lock poisoned")
            .insert(key.to_string(), Arc::new(entry));
        Ok(())
    }

    /// Drop every entry belonging to a data source, principal-salted
    /// ones included. There is no per-level invalidation; schema
    /// changes flush the whole source.
    pub fn invalidate_datasource(&self, scope: &CacheScope) -> CacheResult<usize> {
        let base = normalize(&format!("{}___", scope.datasource));
        let salted = format!("___{}", base);
        let removed = {
            let conn = self.conn.lock().expect("cache lock poisoned");
            conn.execute(
                "DELETE FROM levels WHERE key LIKE ?1 OR key LIKE ?2",
                params![format!("{}%", base), format!("%{}%", salted)],
            )?
        };
        self.index
            .write()
            .expect("cache lock poisoned")
            .retain(|k, _| !k.starts_with(&base) && !k.contains(&salted));
        Ok(removed)
    }

    /// Resolve a member's ancestor `offset` levels up by walking cached
    /// parent chains.
    ///
    /// A missing parent pointer is reconstructed by re-reading the
    /// member's own level entry, where discovery recorded the parent
    /// field. Returns `None` when the walk leaves the cached data (the
    /// caller refetches from the server).
    pub fn resolve_ancestor(
        &self,
        scope: &CacheScope,
        dimension: &Dimension,
        member: &Member,
        offset: i32,
    ) -> CacheResult<Option<Member>> {
        let mut current = member.clone();
        for _ in 0..offset {
            let parent_number = current.level_number - 1;
            let Some(parent_level) = dimension.level_at(parent_number) else {
                return Ok(None);
            };

            let parent_unique = match current.parent_unique_name.clone() {
                Some(p) => p,
                None => {
                    let own_key = scope.key(&current.level_unique_name);
                    let Some(own_entry) = self.get_shared(&own_key)? else {
                        return Ok(None);
                    };
                    match own_entry
                        .member(&current.unique_name)
                        .and_then(|m| m.parent_unique_name.clone())
                    {
                        Some(p) => p,
                        None => return Ok(None),
                    }
                }
            };

            let key = scope.key(&parent_level.unique_name);
            let Some(entry) = self.get_shared(&key)? else {
                return Ok(None);
            };
            let Some(parent) = entry.member(&parent_unique) else {
                return Ok(None);
            };
            current = parent.clone();
        }
        Ok(Some(current))
    }
}
