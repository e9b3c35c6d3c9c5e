pub mod models;
mod query_builder;


use anyhow::{anyhow, Result};
use rusqlite::functions::FunctionFlags;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Statement};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

pub use models::*;
use query_builder::SegmentQueryBuilder;

/// Bumped whenever the index layout or parser output changes, so existing
/// on-disk indexes are rebuilt on the next start.
pub const SCHEMA_VERSION: i64 = 3;

const META_INDEX_COMPLETE: &str = "index_complete";
const META_SCHEMA_VERSION: &str = "index_schema_version";

/// Tables rebuilt from scratch on every index generation
const INDEX_TABLES_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS episodes (
        file TEXT PRIMARY KEY,
        date TEXT NOT NULL,
        content_type TEXT NOT NULL,
        video_url TEXT,
        custom_title TEXT,
        segment_count INTEGER NOT NULL DEFAULT 0
    );

    CREATE INDEX IF NOT EXISTS idx_episodes_date ON episodes(date);
    CREATE INDEX IF NOT EXISTS idx_episodes_type ON episodes(content_type);

    -- Stemmed index: exact and AND semantics
    CREATE VIRTUAL TABLE IF NOT EXISTS segments_exact USING fts5(
        segment_id UNINDEXED,
        file UNINDEXED,
        line_offset UNINDEXED,
        date UNINDEXED,
        content_type UNINDEXED,
        start_seconds UNINDEXED,
        text_content,
        tokenize = 'porter unicode61'
    );

    -- Trigram index: typo-tolerant fallback
    CREATE VIRTUAL TABLE IF NOT EXISTS segments_fuzzy USING fts5(
        segment_id UNINDEXED,
        file UNINDEXED,
        line_offset UNINDEXED,
        date UNINDEXED,
        content_type UNINDEXED,
        start_seconds UNINDEXED,
        text_content,
        tokenize = 'trigram'
    );
"#;

const INSERT_SEGMENT_SQL: &str =
    "(segment_id, file, line_offset, date, content_type, start_seconds, text_content)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)";

pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn new(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(db_path)?;

        // Enable WAL mode for concurrent reads
        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            PRAGMA cache_size=10000;
            PRAGMA temp_store=MEMORY;
        ",
        )?;

        register_functions(&conn)?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.init_schema()?;

        Ok(db)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("database connection lock poisoned"))
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            r#"
            -- Build marker and other small settings
            CREATE TABLE IF NOT EXISTS index_meta (
                key TEXT PRIMARY KEY,
                value TEXT,
                updated_at TEXT DEFAULT (datetime('now'))
            );

            -- Curated links, keyed by air date; survives re-indexing
            CREATE TABLE IF NOT EXISTS links (
                date TEXT PRIMARY KEY,
                video_url TEXT NOT NULL,
                host TEXT,
                custom_title TEXT,
                notes TEXT,
                info TEXT
            );
        "#,
        )?;
        conn.execute_batch(INDEX_TABLES_SQL)?;
        Ok(())
    }

    // =========================================================================
    // Build marker
    // =========================================================================

    pub fn get_meta(&self, key: &str) -> Result<Option<String>> {
        let conn = self.lock()?;
        let value = conn
            .query_row(
                "SELECT value FROM index_meta WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn set_meta(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO index_meta (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value],
        )?;
        Ok(())
    }

    /// True when the last build finished and was produced by `schema_version`
    pub fn index_is_current(&self, schema_version: i64) -> Result<bool> {
        let complete = self.get_meta(META_INDEX_COMPLETE)?;
        let version = self.get_meta(META_SCHEMA_VERSION)?;
        Ok(complete.as_deref() == Some("true")
            && version.and_then(|v| v.parse::<i64>().ok()) == Some(schema_version))
    }

    pub fn mark_index_incomplete(&self) -> Result<()> {
        self.set_meta(META_INDEX_COMPLETE, "false")
    }

    pub fn mark_index_complete(&self, schema_version: i64) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        for (key, value) in [
            (META_SCHEMA_VERSION, schema_version.to_string()),
            (META_INDEX_COMPLETE, "true".to_string()),
        ] {
            tx.execute(
                "INSERT INTO index_meta (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, value],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    // =========================================================================
    // Index writes
    // =========================================================================

    /// Drop and recreate both segment indexes and the episode registry.
    /// Faster than row deletion at archive scale.
    pub fn reset_index(&self) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute_batch(
            "
            DROP TABLE IF EXISTS segments_exact;
            DROP TABLE IF EXISTS segments_fuzzy;
            DROP TABLE IF EXISTS episodes;
        ",
        )?;
        tx.execute_batch(INDEX_TABLES_SQL)?;
        tx.commit()?;
        Ok(())
    }

    /// Run `f` with a writer bound to one transaction. Everything written
    /// through the writer commits together or not at all.
    pub fn write_batch<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut IndexWriter<'_>) -> Result<T>,
    {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let result = {
            let mut writer = IndexWriter::new(&tx)?;
            f(&mut writer)?
        };
        tx.commit()?;
        Ok(result)
    }

    /// Replace the whole link table. Later records win on duplicate dates.
    pub fn replace_links(&self, links: &[LinkRecord]) -> Result<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM links", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO links (date, video_url, host, custom_title, notes, info)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for link in links {
                stmt.execute(params![
                    link.date,
                    link.video_url,
                    link.host,
                    link.custom_title,
                    link.notes,
                    link.info
                ])?;
            }
        }
        let count: i64 = tx.query_row("SELECT COUNT(*) FROM links", [], |row| row.get(0))?;
        tx.commit()?;
        Ok(count as usize)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn get_episode_count(&self) -> Result<i64> {
        let conn = self.lock()?;
        let count = conn.query_row("SELECT COUNT(*) FROM episodes", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn get_link_count(&self) -> Result<i64> {
        let conn = self.lock()?;
        let count = conn.query_row("SELECT COUNT(*) FROM links", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn get_segment_count(&self, kind: IndexKind) -> Result<i64> {
        let conn = self.lock()?;
        let sql = format!("SELECT COUNT(*) FROM {}", kind.table());
        let count = conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn get_link(&self, date: &str) -> Result<Option<LinkRecord>> {
        let conn = self.lock()?;
        let link = conn
            .query_row(
                "SELECT date, video_url, host, custom_title, notes, info FROM links WHERE date = ?1",
                params![date],
                |row| {
                    Ok(LinkRecord {
                        date: row.get(0)?,
                        video_url: row.get(1)?,
                        host: row.get(2)?,
                        custom_title: row.get(3)?,
                        notes: row.get(4)?,
                        info: row.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(link)
    }

    /// Registry listing, decorated with curated link values where present
    pub fn list_episodes(
        &self,
        content_type: Option<ContentType>,
        years: &[i32],
    ) -> Result<Vec<EpisodeView>> {
        let conn = self.lock()?;

        let mut sql = String::from(
            "SELECT e.file, e.date, e.content_type,
                    COALESCE(l.video_url, e.video_url),
                    COALESCE(l.custom_title, e.custom_title),
                    l.host, e.segment_count
             FROM episodes e
             LEFT JOIN links l ON l.date = e.date
             WHERE 1 = 1",
        );
        let mut values: Vec<rusqlite::types::Value> = Vec::new();

        if let Some(content_type) = content_type {
            sql.push_str(" AND e.content_type = ?");
            values.push(rusqlite::types::Value::from(content_type.as_str().to_string()));
        }
        if !years.is_empty() {
            let ors = vec!["e.date LIKE ?"; years.len()].join(" OR ");
            sql.push_str(&format!(" AND ({})", ors));
            values.extend(
                years
                    .iter()
                    .map(|y| rusqlite::types::Value::from(format!("{:04}-%", y))),
            );
        }
        sql.push_str(" ORDER BY e.date, e.file");

        let mut stmt = conn.prepare(&sql)?;
        let episodes = stmt
            .query_map(params_from_iter(values.iter()), |row| {
                Ok(EpisodeView {
                    file: row.get(0)?,
                    date: row.get(1)?,
                    content_type: row.get::<_, String>(2)?.into(),
                    video_url: row.get(3)?,
                    custom_title: row.get(4)?,
                    host: row.get(5)?,
                    segment_count: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(episodes)
    }

    /// Run one composed lookup against the index named by `query.kind`
    pub fn search_segments(
        &self,
        query: &IndexQuery,
        filter: &SegmentFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<SegmentHit>> {
        let (sql, values) = SegmentQueryBuilder::new(query, filter).build(limit, offset);
        log::debug!("segment query on {}: {}", query.kind.table(), query.match_expr);

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let hits = stmt
            .query_map(params_from_iter(values.iter()), |row| {
                Ok(SegmentHit {
                    id: row.get(0)?,
                    file: row.get(1)?,
                    line_offset: row.get(2)?,
                    date: row.get(3)?,
                    content_type: row.get::<_, String>(4)?.into(),
                    start_seconds: row.get(5)?,
                    text_content: row.get(6)?,
                    snippet: row.get(7)?,
                    rank: row.get(8)?,
                    video_url: row.get(9)?,
                    custom_title: row.get(10)?,
                    host: row.get(11)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(hits)
    }
}

/// Write-through handle over both segment indexes and the registry.
/// `index_segment` is the only way segments enter the store, so the two
/// indexes cannot drift apart.
pub struct IndexWriter<'conn> {
    exact: Statement<'conn>,
    fuzzy: Statement<'conn>,
    episode: Statement<'conn>,
    segments_written: usize,
}

impl<'conn> IndexWriter<'conn> {
    fn new(conn: &'conn Connection) -> Result<Self> {
        Ok(Self {
            exact: conn.prepare(&format!(
                "INSERT INTO segments_exact {}",
                INSERT_SEGMENT_SQL
            ))?,
            fuzzy: conn.prepare(&format!(
                "INSERT INTO segments_fuzzy {}",
                INSERT_SEGMENT_SQL
            ))?,
            episode: conn.prepare(
                "INSERT OR REPLACE INTO episodes (file, date, content_type, video_url, custom_title, segment_count)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?,
            segments_written: 0,
        })
    }

    pub fn index_segment(&mut self, segment: &Segment) -> Result<()> {
        let id = segment.id();
        let line_offset = segment.line_offset as i64;
        for stmt in [&mut self.exact, &mut self.fuzzy] {
            stmt.execute(params![
                id,
                segment.file,
                line_offset,
                segment.date,
                segment.content_type.as_str(),
                segment.start_seconds,
                segment.text_content
            ])?;
        }
        self.segments_written += 1;
        Ok(())
    }

    pub fn register_episode(&mut self, episode: &Episode) -> Result<()> {
        self.episode.execute(params![
            episode.file,
            episode.date,
            episode.content_type.as_str(),
            episode.video_url,
            episode.custom_title,
            episode.segment_count as i64
        ])?;
        Ok(())
    }

    pub fn segments_written(&self) -> usize {
        self.segments_written
    }
}

fn register_functions(conn: &Connection) -> Result<()> {
    conn.create_scalar_function(
        "fuzzy_score",
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text = ctx.get::<Option<String>>(0)?.unwrap_or_default();
            let terms = ctx.get::<Option<String>>(1)?.unwrap_or_default();
            Ok(crate::search::fuzzy::score_text(&text, &terms))
        },
    )?;
    Ok(())
}

/// Whether `err` came from SQLite rejecting a match expression rather than
/// from storage itself
pub fn is_match_syntax_error(err: &anyhow::Error) -> bool {
    match err.downcast_ref::<rusqlite::Error>() {
        Some(rusqlite::Error::SqliteFailure(_, Some(msg))) => {
            let msg = msg.to_ascii_lowercase();
            msg.contains("fts5")
                || msg.contains("syntax error")
                || msg.contains("no such column")
                || msg.contains("unterminated string")
        }
        _ => false,
    }
}
