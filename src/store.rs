//! Metadata lifecycle store. Every capture appends one JSON entry to a kv
//! table; entries age out by expiry timestamp instead of by count, so a
//! burst of captures cannot evict recent history.

use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

pub const KEY_PREFIX: &str = "metadata-entry-";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub key: String,
    pub profile_name: String,
    pub site: String,
    pub url: String,
    pub timestamp: DateTime<Utc>,
    pub folder_path: String,
    pub expires_at: DateTime<Utc>,
}

impl MetadataEntry {
    pub fn new(
        profile_name: String,
        site: String,
        url: String,
        folder_path: String,
        now: DateTime<Utc>,
        retention: Duration,
    ) -> Self {
        MetadataEntry {
            key: format!("{KEY_PREFIX}{}", now.timestamp_millis()),
            profile_name,
            site,
            url,
            timestamp: now,
            folder_path,
            expires_at: now + retention,
        }
    }
}

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS kv (
            key        TEXT PRIMARY KEY,
            value      TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        ",
    )?;
    Ok(())
}

pub fn put_entry(conn: &Connection, entry: &MetadataEntry) -> Result<()> {
    let value = serde_json::to_string(entry)?;
    conn.execute(
        "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
        rusqlite::params![entry.key, value],
    )?;
    Ok(())
}

/// All metadata entries, newest first. Unreadable values are skipped.
pub fn fetch_entries(conn: &Connection) -> Result<Vec<MetadataEntry>> {
    let mut stmt = conn.prepare("SELECT key, value FROM kv WHERE key LIKE ?1 ORDER BY key DESC")?;
    let rows = stmt
        .query_map([format!("{KEY_PREFIX}%")], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut entries = Vec::with_capacity(rows.len());
    for (key, value) in rows {
        match serde_json::from_str::<MetadataEntry>(&value) {
            Ok(entry) => entries.push(entry),
            Err(e) => tracing::warn!(key, error = %e, "unreadable metadata entry, skipping"),
        }
    }
    Ok(entries)
}

/// Removes every entry whose expiry is at or before `now`. Running it twice
/// in a row removes nothing the second time. Entries that no longer parse
/// can never expire on their own, so they go too.
pub fn sweep_expired(conn: &Connection, now: DateTime<Utc>) -> Result<usize> {
    let mut stmt = conn.prepare("SELECT key, value FROM kv WHERE key LIKE ?1")?;
    let rows = stmt
        .query_map([format!("{KEY_PREFIX}%")], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut expired = Vec::new();
    for (key, value) in rows {
        match serde_json::from_str::<MetadataEntry>(&value) {
            Ok(entry) => {
                if entry.expires_at <= now {
                    expired.push(key);
                }
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "unreadable metadata entry, sweeping");
                expired.push(key);
            }
        }
    }

    let tx = conn.unchecked_transaction()?;
    let removed = {
        let mut del = tx.prepare("DELETE FROM kv WHERE key = ?1")?;
        let mut n = 0;
        for key in &expired {
            n += del.execute([key])?;
        }
        n
    };
    tx.commit()?;
    if removed > 0 {
        tracing::info!(removed, "swept expired metadata entries");
    }
    Ok(removed)
}
