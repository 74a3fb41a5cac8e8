//! Storage layer for heartbeats.
//!
//! Provides persistence for processed heartbeats using `rusqlite`.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! Wrap it in a `Mutex` or open one `Database` per thread when ingesting from
//! several threads; duplicate suppression stays correct either way because it
//! is enforced by the unique index on `hash`, not by the caller.
//!
//! # Schema
//!
//! ## Timestamp Format
//!
//! `time` and `created_at` are stored as TEXT in RFC 3339 format with
//! millisecond precision (e.g., `2024-01-15T10:30:00.123Z`), so lexicographic
//! ordering matches chronological ordering.
//!
//! ## Dimension Columns
//!
//! The columns named by [`SummaryDimension::column_name`] are plain TEXT with
//! an empty-string default. Aggregation queries map empty values to
//! [`UNKNOWN_SUMMARY_KEY`], matching [`Heartbeat::key`].

use std::path::Path;

use hb_core::{CustomTime, Heartbeat, HeartbeatStore, SummaryDimension, UNKNOWN_SUMMARY_KEY};
use rusqlite::{Connection, OptionalExtension, Row, Statement, params};
use thiserror::Error;

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Failed to encode or decode the dependency list.
    #[error("invalid dependency list: {0}")]
    Dependencies(#[from] serde_json::Error),
    /// Failed to parse a stored timestamp.
    #[error("invalid timestamp for heartbeat {hash}: {timestamp}")]
    TimestampParse {
        hash: String,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A stored value is out of range for its field.
    #[error("invalid heartbeat data for {hash}: {message}")]
    InvalidHeartbeatData { hash: String, message: String },
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

/// Number of heartbeats sharing one grouping key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCount {
    pub key: String,
    pub count: usize,
}

const SELECT_COLUMNS: &str = "
    id, user_id, entity, type, category, project, project_root_count,
    line_additions, line_deletions, lines, line_number, cursor_position,
    branch, language, dependencies, is_write, editor, operating_system,
    machine, user_agent, time, hash, origin, origin_id, created_at
";

const INSERT_HEARTBEAT: &str = "
    INSERT OR IGNORE INTO heartbeats
    (user_id, entity, type, category, project, project_root_count,
     line_additions, line_deletions, lines, line_number, cursor_position,
     branch, language, dependencies, is_write, editor, operating_system,
     machine, user_agent, time, hash, origin, origin_id, created_at)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
";

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            -- hash: content fingerprint, unique; duplicates are ignored on insert
            -- dependencies: JSON array of names
            CREATE TABLE IF NOT EXISTS heartbeats (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                entity TEXT NOT NULL,
                type TEXT NOT NULL DEFAULT '',
                category TEXT NOT NULL DEFAULT '',
                project TEXT NOT NULL DEFAULT '',
                project_root_count INTEGER NOT NULL DEFAULT 0,
                line_additions INTEGER NOT NULL DEFAULT 0,
                line_deletions INTEGER NOT NULL DEFAULT 0,
                lines INTEGER NOT NULL DEFAULT 0,
                line_number INTEGER NOT NULL DEFAULT 0,
                cursor_position INTEGER NOT NULL DEFAULT 0,
                branch TEXT NOT NULL DEFAULT '',
                language TEXT NOT NULL DEFAULT '',
                dependencies TEXT NOT NULL DEFAULT '[]',
                is_write INTEGER NOT NULL DEFAULT 0,
                editor TEXT NOT NULL DEFAULT '',
                operating_system TEXT NOT NULL DEFAULT '',
                machine TEXT NOT NULL DEFAULT '',
                user_agent TEXT NOT NULL DEFAULT '',
                time TEXT NOT NULL,
                hash VARCHAR(17) NOT NULL,
                origin TEXT NOT NULL DEFAULT '',
                origin_id TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL
            );

            CREATE UNIQUE INDEX IF NOT EXISTS idx_heartbeats_hash ON heartbeats(hash);
            CREATE INDEX IF NOT EXISTS idx_time_user ON heartbeats(user_id, time);
            CREATE INDEX IF NOT EXISTS idx_user_project ON heartbeats(user_id, project);
            CREATE INDEX IF NOT EXISTS idx_project ON heartbeats(project);
            CREATE INDEX IF NOT EXISTS idx_language ON heartbeats(language);
            CREATE INDEX IF NOT EXISTS idx_editor ON heartbeats(editor);
            CREATE INDEX IF NOT EXISTS idx_operating_system ON heartbeats(operating_system);
            CREATE INDEX IF NOT EXISTS idx_machine ON heartbeats(machine);
            CREATE INDEX IF NOT EXISTS idx_branch ON heartbeats(branch);
            ",
        )?;
        Ok(())
    }

    /// Inserts a heartbeat unless one with the same hash exists.
    ///
    /// Returns whether a row was written.
    pub fn insert_heartbeat(&mut self, heartbeat: &Heartbeat) -> Result<bool, DbError> {
        let mut stmt = self.conn.prepare_cached(INSERT_HEARTBEAT)?;
        insert_row(&mut stmt, heartbeat)
    }

    /// Inserts a batch of heartbeats in one transaction, ignoring duplicates by hash.
    pub fn insert_heartbeats(&mut self, heartbeats: &[Heartbeat]) -> Result<usize, DbError> {
        if heartbeats.is_empty() {
            return Ok(0);
        }
        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(INSERT_HEARTBEAT)?;
            for heartbeat in heartbeats {
                if insert_row(&mut stmt, heartbeat)? {
                    inserted += 1;
                }
            }
        }
        tx.commit()?;
        tracing::debug!(inserted, total = heartbeats.len(), "inserted heartbeat batch");
        Ok(inserted)
    }

    /// Looks up a heartbeat by fingerprint.
    pub fn get_by_hash(&self, hash: &str) -> Result<Option<Heartbeat>, DbError> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM heartbeats WHERE hash = ?");
        let row = self
            .conn
            .query_row(&sql, [hash], read_row)
            .optional()?;
        row.map(HeartbeatRow::into_heartbeat).transpose()
    }

    /// Lists a user's heartbeats within a time range, ordered by time then ID.
    ///
    /// The range is inclusive of `start` and exclusive of `end`.
    pub fn list_heartbeats(
        &self,
        user_id: &str,
        start: CustomTime,
        end: CustomTime,
    ) -> Result<Vec<Heartbeat>, DbError> {
        if end <= start {
            return Ok(Vec::new());
        }
        let sql = format!(
            "
            SELECT {SELECT_COLUMNS}
            FROM heartbeats
            WHERE user_id = ? AND time >= ? AND time < ?
            ORDER BY time ASC, id ASC
            "
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![user_id, start.to_rfc3339(), end.to_rfc3339()],
            read_row,
        )?;
        let mut heartbeats = Vec::new();
        for row in rows {
            heartbeats.push(row?.into_heartbeat()?);
        }
        Ok(heartbeats)
    }

    /// Counts a user's heartbeats.
    pub fn count_heartbeats(&self, user_id: &str) -> Result<usize, DbError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM heartbeats WHERE user_id = ?",
            [user_id],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Returns the time of a user's latest heartbeat.
    pub fn last_heartbeat_time(&self, user_id: &str) -> Result<Option<CustomTime>, DbError> {
        let latest: Option<String> = self.conn.query_row(
            "SELECT MAX(time) FROM heartbeats WHERE user_id = ?",
            [user_id],
            |row| row.get(0),
        )?;
        latest
            .map(|timestamp| {
                CustomTime::parse_rfc3339(&timestamp).map_err(|source| DbError::TimestampParse {
                    hash: String::new(),
                    timestamp,
                    source,
                })
            })
            .transpose()
    }

    /// Counts a user's heartbeats per grouping key of `dimension`.
    ///
    /// Ordered by count descending, then key. Empty values are reported
    /// under [`UNKNOWN_SUMMARY_KEY`].
    pub fn count_by_dimension(
        &self,
        user_id: &str,
        dimension: SummaryDimension,
    ) -> Result<Vec<KeyCount>, DbError> {
        // Column names come from a fixed table, never from user input.
        let column = dimension.column_name();
        let sql = format!(
            "
            SELECT COALESCE(NULLIF({column}, ''), ?) AS key, COUNT(*) AS count
            FROM heartbeats
            WHERE user_id = ?
            GROUP BY key
            ORDER BY count DESC, key ASC
            "
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![UNKNOWN_SUMMARY_KEY, user_id], |row| {
            let key: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            Ok(KeyCount {
                key,
                count: usize::try_from(count).unwrap_or_default(),
            })
        })?;
        let mut counts = Vec::new();
        for row in rows {
            counts.push(row?);
        }
        Ok(counts)
    }
}

impl HeartbeatStore for Database {
    type Error = DbError;

    fn insert(&mut self, heartbeat: &Heartbeat) -> Result<bool, Self::Error> {
        self.insert_heartbeat(heartbeat)
    }

    fn insert_all(&mut self, heartbeats: &[Heartbeat]) -> Result<usize, Self::Error> {
        self.insert_heartbeats(heartbeats)
    }

    fn find_by_hash(&self, hash: &str) -> Result<Option<Heartbeat>, Self::Error> {
        self.get_by_hash(hash)
    }
}

fn insert_row(stmt: &mut Statement<'_>, heartbeat: &Heartbeat) -> Result<bool, DbError> {
    let dependencies = serde_json::to_string(&heartbeat.dependencies)?;
    let created_at = if heartbeat.created_at.is_zero() {
        CustomTime::now()
    } else {
        heartbeat.created_at
    };
    let written = stmt.execute(params![
        heartbeat.user_id,
        heartbeat.entity,
        heartbeat.entity_type,
        heartbeat.category,
        heartbeat.project,
        heartbeat.project_root_count,
        heartbeat.line_additions,
        heartbeat.line_deletions,
        heartbeat.lines,
        heartbeat.line_number,
        heartbeat.cursor_position,
        heartbeat.branch,
        heartbeat.language,
        dependencies,
        heartbeat.is_write,
        heartbeat.editor,
        heartbeat.operating_system,
        heartbeat.machine,
        heartbeat.user_agent,
        heartbeat.time.to_rfc3339(),
        heartbeat.hash,
        heartbeat.origin,
        heartbeat.origin_id,
        created_at.to_rfc3339(),
    ])?;
    Ok(written > 0)
}

/// A heartbeat row before timestamp and dependency decoding.
struct HeartbeatRow {
    id: i64,
    dependencies: String,
    time: String,
    created_at: String,
    heartbeat: Heartbeat,
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<HeartbeatRow> {
    Ok(HeartbeatRow {
        id: row.get(0)?,
        dependencies: row.get(14)?,
        time: row.get(20)?,
        created_at: row.get(24)?,
        heartbeat: Heartbeat {
            user_id: row.get(1)?,
            entity: row.get(2)?,
            entity_type: row.get(3)?,
            category: row.get(4)?,
            project: row.get(5)?,
            project_root_count: row.get(6)?,
            line_additions: row.get(7)?,
            line_deletions: row.get(8)?,
            lines: row.get(9)?,
            line_number: row.get(10)?,
            cursor_position: row.get(11)?,
            branch: row.get(12)?,
            language: row.get(13)?,
            is_write: row.get(15)?,
            editor: row.get(16)?,
            operating_system: row.get(17)?,
            machine: row.get(18)?,
            user_agent: row.get(19)?,
            hash: row.get(21)?,
            origin: row.get(22)?,
            origin_id: row.get(23)?,
            ..Heartbeat::default()
        },
    })
}

impl HeartbeatRow {
    fn into_heartbeat(self) -> Result<Heartbeat, DbError> {
        let mut heartbeat = self.heartbeat;
        heartbeat.id = u64::try_from(self.id).map_err(|_| DbError::InvalidHeartbeatData {
            hash: heartbeat.hash.clone(),
            message: format!("negative id {}", self.id),
        })?;
        heartbeat.dependencies = serde_json::from_str(&self.dependencies)?;
        heartbeat.time = parse_timestamp(self.time, &heartbeat.hash)?;
        heartbeat.created_at = parse_timestamp(self.created_at, &heartbeat.hash)?;
        Ok(heartbeat)
    }
}

fn parse_timestamp(timestamp: String, hash: &str) -> Result<CustomTime, DbError> {
    CustomTime::parse_rfc3339(&timestamp).map_err(|source| DbError::TimestampParse {
        hash: hash.to_string(),
        timestamp,
        source,
    })
}
