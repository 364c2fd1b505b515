use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use rusqlite_migration::{Migrations, M};
use tokio::sync::watch;

use crate::app::StoreError;
use crate::domain::{sort_for_display, ArticleList, ArticleRecord, SnapshotInfo};
use crate::store::Store;

const ARTICLE_COLUMNS: &str =
    "server_id, title, author, body, thumbnail_url, photo_url, aspect_ratio, published_at";

pub struct SqliteStore {
    conn: Mutex<Connection>,
    changes: watch::Sender<u64>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        // Readers in other processes only ever see committed snapshots
        conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get::<_, String>(0))?;
        Self::with_connection(conn)
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn)
    }

    fn with_connection(mut conn: Connection) -> Result<Self, StoreError> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);
        migrations.to_latest(&mut conn)?;

        let (changes, _) = watch::channel(0);
        Ok(Self {
            conn: Mutex::new(conn),
            changes,
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Persistence(e.to_string()))
    }

    fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    }

    fn article_from_row(row: &Row<'_>) -> rusqlite::Result<ArticleRecord> {
        Ok(ArticleRecord {
            server_id: row.get(0)?,
            title: row.get(1)?,
            author: row.get(2)?,
            body: row.get(3)?,
            thumbnail_url: row.get(4)?,
            photo_url: row.get(5)?,
            aspect_ratio: row.get(6)?,
            published_date: row
                .get::<_, Option<i64>>(7)?
                .and_then(DateTime::from_timestamp_millis),
        })
    }
}

impl Store for SqliteStore {
    fn replace_all(&self, records: &[ArticleRecord]) -> Result<SnapshotInfo, StoreError> {
        let mut ordered = records.to_vec();
        sort_for_display(&mut ordered);

        let info = SnapshotInfo {
            refreshed_at: Utc::now(),
            article_count: records.len(),
            digest: SnapshotInfo::digest_of(&ordered),
        };

        {
            let mut conn = self.conn()?;
            // Dropping the transaction on any early return rolls it back
            let tx = conn.transaction()?;

            tx.execute("DELETE FROM articles", [])?;
            {
                let mut stmt = tx.prepare(&format!(
                    "INSERT INTO articles ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    ARTICLE_COLUMNS
                ))?;
                for record in records {
                    stmt.execute(params![
                        record.server_id,
                        record.title,
                        record.author,
                        record.body,
                        record.thumbnail_url,
                        record.photo_url,
                        record.aspect_ratio,
                        record.published_date.map(|dt| dt.timestamp_millis()),
                    ])?;
                }
            }

            tx.execute(
                "INSERT INTO snapshot (id, refreshed_at, article_count, digest) VALUES (1, ?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET refreshed_at = ?1, article_count = ?2, digest = ?3",
                params![
                    info.refreshed_at.to_rfc3339(),
                    info.article_count as i64,
                    info.digest
                ],
            )?;

            tx.commit()?;
        }

        // Lock released; subscribers re-query on their own time
        self.changes.send_modify(|generation| *generation += 1);

        Ok(info)
    }

    fn query_all(&self) -> Result<ArticleList, StoreError> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM articles
             ORDER BY published_at IS NULL, published_at DESC, server_id ASC",
            ARTICLE_COLUMNS
        ))?;

        let records = stmt
            .query_map([], Self::article_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(ArticleList::new(records))
    }

    fn query_by_id(&self, server_id: &str) -> Result<Option<ArticleRecord>, StoreError> {
        let conn = self.conn()?;

        let result = conn
            .query_row(
                &format!("SELECT {} FROM articles WHERE server_id = ?1", ARTICLE_COLUMNS),
                params![server_id],
                Self::article_from_row,
            )
            .optional()?;

        Ok(result)
    }

    fn snapshot_info(&self) -> Result<Option<SnapshotInfo>, StoreError> {
        let conn = self.conn()?;

        let row = conn
            .query_row(
                "SELECT refreshed_at, article_count, digest FROM snapshot WHERE id = 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;

        let Some((refreshed_at, article_count, digest)) = row else {
            return Ok(None);
        };

        let refreshed_at = Self::parse_datetime(&refreshed_at).ok_or_else(|| {
            StoreError::Persistence(format!("invalid refreshed_at value: {}", refreshed_at))
        })?;

        Ok(Some(SnapshotInfo {
            refreshed_at,
            article_count: article_count.max(0) as usize,
            digest,
        }))
    }

    fn changes(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }
}
