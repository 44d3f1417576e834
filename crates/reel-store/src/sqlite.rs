//! SQLite implementation of the store traits.
//!
//! This is the primary storage backend for the catalog. It uses rusqlite
//! with bundled SQLite, wrapped in async via tokio::spawn_blocking. Records
//! and preferences share one database file.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::watch;

use reel_core::{PrefMap, Record, RecordId};

use crate::error::{check_storable, Result, StoreError};
use crate::live::{LiveQuery, QueryFn, QueryFuture};
use crate::migration;
use crate::traits::{PreferenceStore, RecordStore};

const SELECT_RECORD: &str = "SELECT id, title, creator, year, category, score, synopsis,
        resource_url, favorite, completed_at, notes FROM records";

const LIST_ALL: &str = "SELECT id, title, creator, year, category, score, synopsis,
        resource_url, favorite, completed_at, notes FROM records
        ORDER BY title ASC, id ASC";

const LIST_FAVORITES: &str = "SELECT id, title, creator, year, category, score, synopsis,
        resource_url, favorite, completed_at, notes FROM records
        WHERE favorite = 1
        ORDER BY title ASC, id ASC";

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All database work runs on
/// spawn_blocking to avoid blocking the async runtime.
pub struct SqliteStore {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
    /// Record revision, bumped after every successful record mutation.
    changes: Arc<watch::Sender<u64>>,
    /// In-memory mirror of the `preferences` table.
    prefs: watch::Sender<Arc<PrefMap>>,
    /// Preference writes persist and publish under this gate, in call order.
    pref_gate: tokio::sync::Mutex<()>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(mut conn: Connection) -> Result<Self> {
        migration::migrate(&mut conn)?;
        let prefs = load_preferences(&conn)?;
        let (changes, _) = watch::channel(0);
        let (prefs, _) = watch::channel(Arc::new(prefs));
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            changes: Arc::new(changes),
            prefs,
            pref_gate: tokio::sync::Mutex::new(()),
        })
    }

    fn live(&self, sql: &'static str, needle: Option<String>) -> LiveQuery<Vec<Record>> {
        let conn = Arc::clone(&self.conn);
        let query: QueryFn<Vec<Record>> = Arc::new(move || -> QueryFuture<Vec<Record>> {
            let conn = Arc::clone(&conn);
            let needle = needle.clone();
            Box::pin(async move {
                let records = run_blocking(conn, move |conn| {
                    let mut stmt = conn.prepare_cached(sql)?;
                    let records = stmt
                        .query_map([], row_to_record)?
                        .collect::<rusqlite::Result<Vec<_>>>()?;
                    Ok(records)
                })
                .await
                .map_err(|e| StoreError::TransientRead(e.to_string()))?;

                // SQLite's LIKE/LOWER only fold ASCII, so matching happens here.
                Ok(match needle {
                    Some(needle) => records.into_iter().filter(|r| r.matches_text(&needle)).collect(),
                    None => records,
                })
            })
        });
        LiveQuery::new(self.changes.subscribe(), query)
    }

    /// Run a record mutation on the blocking pool.
    ///
    /// `f` reports whether it changed anything; the revision is bumped on the
    /// blocking thread right after the commit, so live queries see the change
    /// even if the caller stops waiting.
    async fn mutate<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<(T, bool)> + Send + 'static,
        T: Send + 'static,
    {
        let changes = Arc::clone(&self.changes);
        run_blocking(Arc::clone(&self.conn), move |conn| {
            let (value, changed) = f(conn)?;
            if changed {
                changes.send_modify(|rev| *rev += 1);
            }
            Ok(value)
        })
        .await
    }
}

/// Lock the connection, mapping a poisoned mutex to a database error.
fn lock(conn: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>> {
    conn.lock().map_err(|e| {
        StoreError::Database(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
            Some(format!("mutex poisoned: {}", e)),
        ))
    })
}

/// Run `f` against the connection on the blocking pool.
async fn run_blocking<F, T>(conn: Arc<Mutex<Connection>>, f: F) -> Result<T>
where
    F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut conn = lock(&conn)?;
        f(&mut conn)
    })
    .await
    .map_err(|e| {
        StoreError::Database(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
            Some(format!("spawn_blocking failed: {}", e)),
        ))
    })?
}

// Helper to convert a row to Record
fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<Record> {
    let score: f64 = row.get("score")?;
    Ok(Record {
        id: RecordId::new(row.get("id")?),
        title: row.get("title")?,
        creator: row.get("creator")?,
        year: row.get("year")?,
        category: row.get("category")?,
        score: score as f32,
        synopsis: row.get("synopsis")?,
        resource_url: row.get("resource_url")?,
        favorite: row.get("favorite")?,
        completed_at: row.get("completed_at")?,
        notes: row.get("notes")?,
    })
}

/// Map a failed write: constraint violations become conflicts.
fn write_error(e: rusqlite::Error) -> StoreError {
    match e {
        rusqlite::Error::SqliteFailure(err, msg)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            StoreError::Conflict(msg.unwrap_or_else(|| err.to_string()))
        }
        other => StoreError::Database(other),
    }
}

fn load_preferences(conn: &Connection) -> Result<PrefMap> {
    let mut stmt = conn.prepare("SELECT key, value FROM preferences")?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut map = PrefMap::new();
    for (key, raw) in rows {
        match serde_json::from_str(&raw) {
            Ok(value) => {
                map.insert(key, value);
            }
            Err(e) => tracing::warn!(%key, error = %e, "ignoring undecodable preference"),
        }
    }
    Ok(map)
}

#[async_trait]
impl RecordStore for SqliteStore {
    fn list_all(&self) -> LiveQuery<Vec<Record>> {
        self.live(LIST_ALL, None)
    }

    fn list_favorites(&self) -> LiveQuery<Vec<Record>> {
        self.live(LIST_FAVORITES, None)
    }

    fn search(&self, text: &str) -> LiveQuery<Vec<Record>> {
        self.live(LIST_ALL, Some(text.to_string()))
    }

    async fn get_by_id(&self, id: RecordId) -> Result<Option<Record>> {
        run_blocking(Arc::clone(&self.conn), move |conn| {
            let sql = format!("{SELECT_RECORD} WHERE id = ?1");
            let record = conn
                .query_row(&sql, params![id.get()], row_to_record)
                .optional()?;
            Ok(record)
        })
        .await
    }

    async fn insert(&self, record: &Record) -> Result<RecordId> {
        check_storable(record)?;
        let record = record.clone();
        self.mutate(move |conn| {
            conn.execute(
                "INSERT INTO records (
                    title, creator, year, category, score, synopsis,
                    resource_url, favorite, completed_at, notes
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    record.title,
                    record.creator,
                    record.year,
                    record.category,
                    record.score as f64,
                    record.synopsis,
                    record.resource_url,
                    record.favorite,
                    record.completed_at,
                    record.notes,
                ],
            )
            .map_err(write_error)?;
            Ok((RecordId::new(conn.last_insert_rowid()), true))
        })
        .await
    }

    async fn update(&self, record: &Record) -> Result<()> {
        check_storable(record)?;
        let record = record.clone();
        self.mutate(move |conn| {
            let changed = conn
                .execute(
                    "UPDATE records SET
                        title = ?2, creator = ?3, year = ?4, category = ?5, score = ?6,
                        synopsis = ?7, resource_url = ?8, favorite = ?9,
                        completed_at = ?10, notes = ?11
                     WHERE id = ?1",
                    params![
                        record.id.get(),
                        record.title,
                        record.creator,
                        record.year,
                        record.category,
                        record.score as f64,
                        record.synopsis,
                        record.resource_url,
                        record.favorite,
                        record.completed_at,
                        record.notes,
                    ],
                )
                .map_err(write_error)?;
            if changed == 0 {
                return Err(StoreError::NotFound(record.id));
            }
            Ok(((), true))
        })
        .await
    }

    async fn delete_by_id(&self, id: RecordId) -> Result<()> {
        self.mutate(move |conn| {
            let n = conn.execute("DELETE FROM records WHERE id = ?1", params![id.get()])?;
            Ok(((), n > 0))
        })
        .await
    }

    async fn set_favorite(&self, id: RecordId, favorite: bool) -> Result<()> {
        self.mutate(move |conn| {
            let changed = conn.execute(
                "UPDATE records SET favorite = ?2 WHERE id = ?1",
                params![id.get(), favorite],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound(id));
            }
            Ok(((), true))
        })
        .await
    }

    async fn set_completed_at(&self, id: RecordId, at: Option<i64>) -> Result<()> {
        self.mutate(move |conn| {
            let changed = conn.execute(
                "UPDATE records SET completed_at = ?2 WHERE id = ?1",
                params![id.get(), at],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound(id));
            }
            Ok(((), true))
        })
        .await
    }
}

#[async_trait]
impl PreferenceStore for SqliteStore {
    fn watch_all(&self) -> watch::Receiver<Arc<PrefMap>> {
        self.prefs.subscribe()
    }

    async fn put(&self, name: &str, value: serde_json::Value) -> Result<()> {
        let _gate = self.pref_gate.lock().await;

        let key = name.to_string();
        let raw = serde_json::to_string(&value)?;
        run_blocking(Arc::clone(&self.conn), move |conn| {
            conn.execute(
                "INSERT INTO preferences (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, raw],
            )?;
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Write(e.to_string()))?;

        self.prefs.send_if_modified(|map| {
            if map.get(name) == Some(&value) {
                return false;
            }
            Arc::make_mut(map).insert(name.to_string(), value);
            true
        });
        Ok(())
    }

    async fn clear_all(&self) -> Result<()> {
        let _gate = self.pref_gate.lock().await;

        run_blocking(Arc::clone(&self.conn), |conn| {
            conn.execute("DELETE FROM preferences", [])?;
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Write(e.to_string()))?;

        self.prefs.send_if_modified(|map| {
            if map.is_empty() {
                return false;
            }
            *map = Arc::new(PrefMap::new());
            true
        });
        Ok(())
    }
}
