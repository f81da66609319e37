//! Bucket operations on the SQLite store.

use async_trait::async_trait;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

use super::connection::CacheDb;
use super::hash::compute_request_key;
use super::storage::{CacheEntry, CacheStorage};
use crate::Error;

const ENTRY_COLUMNS: &str = "bucket, key, method, url, status, headers_json, body, stored_at";

/// Raw row before header decoding.
type EntryRow = (String, String, String, String, u16, String, Vec<u8>, String);

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<EntryRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
    ))
}

fn decode_row(row: EntryRow) -> Result<CacheEntry, Error> {
    let (cache_name, key, method, url, status, headers_json, body, stored_at) = row;
    let headers: Vec<(String, String)> =
        serde_json::from_str(&headers_json).map_err(|e| Error::CorruptEntry(format!("{url}: {e}")))?;
    Ok(CacheEntry { cache_name, key, method, url, status, headers, body, stored_at })
}

#[async_trait]
impl CacheStorage for CacheDb {
    async fn open(&self, cache_name: &str) -> Result<(), Error> {
        let name = cache_name.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO buckets (name, created_at) VALUES (?1, ?2)",
                    params![name, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM buckets ORDER BY name")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    async fn delete(&self, cache_name: &str) -> Result<bool, Error> {
        let name = cache_name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM buckets WHERE name = ?1", params![name])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn match_request(&self, cache_name: &str, method: &str, url: &str) -> Result<Option<CacheEntry>, Error> {
        let name = cache_name.to_string();
        let key = compute_request_key(method, url);
        self.conn
            .call(move |conn| -> Result<Option<CacheEntry>, Error> {
                let mut stmt =
                    conn.prepare(&format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE bucket = ?1 AND key = ?2"))?;

                let result = stmt.query_row(params![name, key], read_row);

                match result {
                    Ok(row) => decode_row(row).map(Some),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    async fn put(&self, entry: &CacheEntry) -> Result<(), Error> {
        entry.ensure_storable()?;
        let entry = entry.clone();
        let headers_json =
            serde_json::to_string(&entry.headers).map_err(|e| Error::InvalidInput(format!("bad headers: {e}")))?;
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO buckets (name, created_at) VALUES (?1, ?2)",
                    params![&entry.cache_name, &entry.stored_at],
                )?;
                conn.execute(
                    "INSERT INTO entries (
                    bucket, key, method, url, status, headers_json, body, stored_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ON CONFLICT(bucket, key) DO UPDATE SET
                    method = excluded.method,
                    url = excluded.url,
                    status = excluded.status,
                    headers_json = excluded.headers_json,
                    body = excluded.body,
                    stored_at = excluded.stored_at",
                    params![
                        &entry.cache_name,
                        &entry.key,
                        &entry.method,
                        &entry.url,
                        entry.status,
                        &headers_json,
                        &entry.body,
                        &entry.stored_at,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn entries(&self, cache_name: &str) -> Result<Vec<CacheEntry>, Error> {
        let name = cache_name.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<CacheEntry>, Error> {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {ENTRY_COLUMNS} FROM entries WHERE bucket = ?1 ORDER BY stored_at ASC, url ASC"
                ))?;
                let rows = stmt
                    .query_map(params![name], read_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows.into_iter().map(decode_row).collect()
            })
            .await
            .map_err(Error::from)
    }

    async fn trim(&self, cache_name: &str, max_entries: usize) -> Result<u64, Error> {
        let name = cache_name.to_string();
        let max = max_entries as i64;
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE bucket = ?1", params![name], |row| row.get(0))?;
                if count <= max {
                    return Ok(0);
                }

                let to_delete = count - max;
                let deleted = conn.execute(
                    "DELETE FROM entries WHERE bucket = ?1 AND key IN (
                    SELECT key FROM entries WHERE bucket = ?1 ORDER BY stored_at ASC, url ASC LIMIT ?2
                )",
                    params![name, to_delete],
                )?;
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)
    }
}
