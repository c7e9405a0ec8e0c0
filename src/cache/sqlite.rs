use std::path::Path as FsPath;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::types::{LinkError, Result};

use super::{CachedOutcome, CachedPath, PathCache, SortBy};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS paths (
    src TEXT NOT NULL,
    dst TEXT NOT NULL,
    code INTEGER NOT NULL,
    path TEXT NOT NULL DEFAULT '[]',
    depth INTEGER NOT NULL DEFAULT 0,
    count INTEGER NOT NULL DEFAULT 1,
    last_access INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (src, dst)
)";

const SELECT_COLUMNS: &str =
    "SELECT src, dst, code, path, depth, count, last_access FROM paths";

type RawRow = (String, String, i64, String, i64, i64, i64);

/// Cache persisted in a SQLite database file.
///
/// Paths are stored as JSON arrays of page titles.
pub struct SqliteCache {
    conn: Mutex<Connection>,
}

impl SqliteCache {
    /// Opens (creating if needed) the cache database at `path`.
    pub fn open(path: impl AsRef<FsPath>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        debug!(path = %path.as_ref().display(), journal_mode = %mode, "cache.sqlite.open");
        Self::with_connection(conn)
    }

    /// Creates a cache that lives only as long as this value.
    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute(SCHEMA, [])?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_paths_count ON paths (count)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_paths_last_access ON paths (last_access)",
            [],
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn next_tick(conn: &Connection) -> Result<i64> {
        let latest: Option<i64> =
            conn.query_row("SELECT MAX(last_access) FROM paths", [], |row| row.get(0))?;
        Ok(latest.unwrap_or(0) + 1)
    }
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn decode((src, dst, code, path, depth, count, last_access): RawRow) -> Result<CachedPath> {
    let titles: Vec<String> = serde_json::from_str(&path)?;
    let outcome = CachedOutcome::from_status(code, titles).ok_or_else(|| {
        LinkError::Cache(format!("unknown status code {code} for {src} -> {dst}"))
    })?;
    Ok(CachedPath {
        src,
        dst,
        outcome,
        depth: depth.max(0) as usize,
        count: count.max(0) as u64,
        last_access: last_access.max(0) as u64,
    })
}

impl PathCache for SqliteCache {
    fn contains(&self, src: &str, dst: &str) -> Result<Option<CachedPath>> {
        let conn = self.conn.lock();
        let raw = conn
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE src = ?1 AND dst = ?2"),
                params![src, dst],
                read_row,
            )
            .optional()?;
        raw.map(decode).transpose()
    }

    fn insert(&self, src: &str, dst: &str, depth: usize, outcome: &CachedOutcome) -> Result<()> {
        let titles = outcome.titles().unwrap_or(&[]);
        let path_json = serde_json::to_string(titles)?;
        let depth = i64::try_from(depth).unwrap_or(i64::MAX);
        let conn = self.conn.lock();
        let tick = Self::next_tick(&conn)?;
        conn.execute(
            "INSERT INTO paths (src, dst, code, path, depth, count, last_access)
             VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)
             ON CONFLICT (src, dst) DO UPDATE SET
                code = excluded.code,
                path = excluded.path,
                depth = excluded.depth,
                count = paths.count + 1,
                last_access = excluded.last_access",
            params![src, dst, outcome.status_code(), path_json, depth, tick],
        )?;
        Ok(())
    }

    fn update(&self, src: &str, dst: &str) -> Result<()> {
        let conn = self.conn.lock();
        let tick = Self::next_tick(&conn)?;
        conn.execute(
            "UPDATE paths SET count = count + 1, last_access = ?3 WHERE src = ?1 AND dst = ?2",
            params![src, dst, tick],
        )?;
        Ok(())
    }

    fn retrieve(&self, limit: usize, sort: SortBy) -> Result<Vec<CachedPath>> {
        let order = match sort {
            SortBy::Popular => "count DESC, last_access DESC",
            SortBy::Recent => "last_access DESC",
        };
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} ORDER BY {order} LIMIT ?1"))?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt
            .query_map([limit], read_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(decode).collect()
    }
}
