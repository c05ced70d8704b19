//! SQLite-backed fact store and chat settings store.
//!
//! One connection guarded by a mutex. Every public write is either a
//! single statement or a single transaction, so callers never observe a
//! half-applied batch.

use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveTime};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::schema::{CHATS_SQL, FACTS_SQL};
use crate::types::*;
use chatdigest_core::{Error, Result};

const TIME_FORMAT: &str = "%H:%M";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// SQLite store for facts and chat settings.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

fn db_err(e: rusqlite::Error) -> Error {
    Error::Database(e.to_string())
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

impl SqliteStore {
    /// Open or create the store.
    ///
    /// `db_dir` is the directory (e.g., `data/db/`). The file will be `db_dir/chatdigest.db`.
    pub fn open(db_dir: impl AsRef<Path>) -> Result<Self> {
        let db_dir = db_dir.as_ref();
        std::fs::create_dir_all(db_dir).map_err(|e| Error::Storage(e.to_string()))?;
        let db_path = db_dir.join("chatdigest.db");

        let conn = Self::create_connection(&db_path)?;
        Self::init_schema(&conn)?;

        let store = Self {
            conn: Mutex::new(conn),
            db_path,
        };

        info!(
            "SqliteStore initialized: {} chats, path={}",
            store.count_chats()?,
            store.db_path.display()
        );

        Ok(store)
    }

    fn create_connection(db_path: &Path) -> Result<Connection> {
        let conn = Connection::open(db_path).map_err(db_err)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA synchronous = NORMAL;",
        )
        .map_err(db_err)?;
        Ok(conn)
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        let full_schema = format!("{}\n{}", CHATS_SQL, FACTS_SQL);
        conn.execute_batch(&full_schema)
            .map_err(|e| Error::Database(format!("Schema init failed: {}", e)))?;
        Ok(())
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    // ---------------------------------------------------------------
    // Facts
    // ---------------------------------------------------------------

    /// Insert a new unchecked fact. Returns the row ID.
    pub fn append(&self, fact: &NewFact) -> Result<i64> {
        self.append_at(fact, now_millis())
    }

    /// Insert a new unchecked fact with an explicit creation time (unix millis).
    pub fn append_at(&self, fact: &NewFact, created_at: i64) -> Result<i64> {
        let conn = self.conn.lock();
        insert_fact(&conn, fact, created_at).map_err(db_err)
    }

    /// Insert several facts in one transaction. Either all rows land or none do.
    pub fn append_batch(&self, facts: &[NewFact]) -> Result<Vec<i64>> {
        if facts.is_empty() {
            return Ok(Vec::new());
        }
        let now = now_millis();
        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(db_err)?;
        let mut ids = Vec::with_capacity(facts.len());
        for fact in facts {
            ids.push(insert_fact(&tx, fact, now).map_err(db_err)?);
        }
        tx.commit().map_err(db_err)?;
        debug!("Appended {} facts", ids.len());
        Ok(ids)
    }

    /// Facts of one category for a chat created at or after `since` (unix millis),
    /// newest first.
    pub fn list_window(&self, chat_id: i64, category: Category, since: i64) -> Result<Vec<Fact>> {
        let conn = self.conn.lock();
        let sql = format!(
            "SELECT * FROM {} WHERE chat_id = ?1 AND created_at >= ?2 \
             ORDER BY created_at DESC, id DESC",
            category.table()
        );
        let mut stmt = conn.prepare_cached(&sql).map_err(db_err)?;
        let rows = stmt
            .query_map(params![chat_id, since], |row| row_to_fact(category, row))
            .map_err(db_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)
    }

    /// Get a fact by category and ID.
    pub fn get_fact(&self, category: Category, id: i64) -> Result<Option<Fact>> {
        let conn = self.conn.lock();
        let sql = format!("SELECT * FROM {} WHERE id = ?1", category.table());
        let mut stmt = conn.prepare_cached(&sql).map_err(db_err)?;
        let fact = stmt
            .query_row(params![id], |row| row_to_fact(category, row))
            .optional()
            .map_err(db_err)?;
        Ok(fact)
    }

    /// Count facts of one category for a chat.
    pub fn count_facts(&self, chat_id: i64, category: Category) -> Result<i64> {
        let conn = self.conn.lock();
        let sql = format!("SELECT COUNT(*) FROM {} WHERE chat_id = ?1", category.table());
        conn.query_row(&sql, params![chat_id], |row| row.get(0))
            .map_err(db_err)
    }

    /// Stamp classifier results onto exactly the given rows, atomically.
    ///
    /// An ID that matches no row aborts the batch and nothing is written.
    pub fn mark_classified(&self, category: Category, updates: &[ClassificationUpdate]) -> Result<()> {
        if updates.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(db_err)?;
        {
            let sql = format!(
                "UPDATE {} SET is_checked = 1, is_important = ?1, about = ?2 WHERE id = ?3",
                category.table()
            );
            let mut stmt = tx.prepare(&sql).map_err(db_err)?;
            for update in updates {
                let changed = stmt
                    .execute(params![update.important, update.about, update.id])
                    .map_err(db_err)?;
                if changed == 0 {
                    return Err(Error::NotFound(format!("{} {}", category, update.id)));
                }
            }
        }
        tx.commit().map_err(db_err)?;
        debug!("Classified {} {} facts", updates.len(), category);
        Ok(())
    }

    // ---------------------------------------------------------------
    // Chat settings
    // ---------------------------------------------------------------

    /// Get a chat's settings, if the chat has a record.
    pub fn get_settings(&self, chat_id: i64) -> Result<Option<ChatSettings>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached("SELECT * FROM chats WHERE chat_id = ?1")
            .map_err(db_err)?;
        let settings = stmt
            .query_row(params![chat_id], row_to_settings)
            .optional()
            .map_err(db_err)?;
        Ok(settings)
    }

    /// Get a chat's settings, creating a default record (active, manual,
    /// all categories on) when missing. Non-empty title/username refresh
    /// the stored values.
    pub fn get_or_default(
        &self,
        chat_id: i64,
        title: Option<&str>,
        username: Option<&str>,
    ) -> Result<ChatSettings> {
        {
            let conn = self.conn.lock();
            ensure_chat(&conn, chat_id).map_err(db_err)?;
            conn.execute(
                "UPDATE chats SET title = COALESCE(?1, title), username = COALESCE(?2, username) \
                 WHERE chat_id = ?3",
                params![title, username, chat_id],
            )
            .map_err(db_err)?;
        }
        self.get_settings(chat_id)?
            .ok_or_else(|| Error::NotFound(format!("chat {}", chat_id)))
    }

    /// Refresh the title and public username of a known chat.
    ///
    /// A missing username clears the stored one, so message links fall back
    /// to the private form. Returns false when the chat has no record.
    pub fn update_chat_info(
        &self,
        chat_id: i64,
        title: Option<&str>,
        username: Option<&str>,
    ) -> Result<bool> {
        let conn = self.conn.lock();
        let changed = conn
            .execute(
                "UPDATE chats SET title = COALESCE(?1, title), username = ?2 WHERE chat_id = ?3",
                params![title, username, chat_id],
            )
            .map_err(db_err)?;
        Ok(changed > 0)
    }

    /// Turn collection on or off. Creates the chat record when missing.
    pub fn set_active(&self, chat_id: i64, active: bool) -> Result<()> {
        let conn = self.conn.lock();
        ensure_chat(&conn, chat_id).map_err(db_err)?;
        conn.execute(
            "UPDATE chats SET is_active = ?1, updated_at = ?2 WHERE chat_id = ?3",
            params![active, now_millis(), chat_id],
        )
        .map_err(db_err)?;
        info!("Chat {} collection {}", chat_id, if active { "enabled" } else { "disabled" });
        Ok(())
    }

    /// Write a single settings field. Creates the chat record when missing.
    pub fn set_field(&self, chat_id: i64, field: SettingsField) -> Result<()> {
        let conn = self.conn.lock();
        ensure_chat(&conn, chat_id).map_err(db_err)?;
        let now = now_millis();
        match field {
            SettingsField::Mode(mode) => conn.execute(
                "UPDATE chats SET digest_mode = ?1, updated_at = ?2 WHERE chat_id = ?3",
                params![mode.as_str(), now, chat_id],
            ),
            SettingsField::Time(time) => conn.execute(
                "UPDATE chats SET digest_time = ?1, updated_at = ?2 WHERE chat_id = ?3",
                params![time.format(TIME_FORMAT).to_string(), now, chat_id],
            ),
            SettingsField::Include(category, value) => conn.execute(
                &format!(
                    "UPDATE chats SET {} = ?1, updated_at = ?2 WHERE chat_id = ?3",
                    category.include_column()
                ),
                params![value, now, chat_id],
            ),
        }
        .map_err(db_err)?;
        debug!("Chat {} settings updated: {:?}", chat_id, field);
        Ok(())
    }

    /// Active chats in automatic mode that have a digest time.
    pub fn list_auto_digest_chats(&self) -> Result<Vec<ChatSettings>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached(
                "SELECT * FROM chats WHERE is_active = 1 AND digest_mode = 'auto' \
                 AND digest_time IS NOT NULL ORDER BY chat_id",
            )
            .map_err(db_err)?;
        let rows = stmt.query_map([], row_to_settings).map_err(db_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)
    }

    /// Remember the local date of the last automatic digest.
    pub fn mark_auto_digest_sent(&self, chat_id: i64, date: NaiveDate) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE chats SET last_auto_digest_on = ?1 WHERE chat_id = ?2",
            params![date.format(DATE_FORMAT).to_string(), chat_id],
        )
        .map_err(db_err)?;
        Ok(())
    }

    /// Count chat records.
    pub fn count_chats(&self) -> Result<i64> {
        let conn = self.conn.lock();
        conn.query_row("SELECT COUNT(*) FROM chats", [], |row| row.get(0))
            .map_err(db_err)
    }
}

fn ensure_chat(conn: &Connection, chat_id: i64) -> rusqlite::Result<()> {
    conn.prepare_cached("INSERT OR IGNORE INTO chats (chat_id, created_at) VALUES (?1, ?2)")?
        .execute(params![chat_id, now_millis()])?;
    Ok(())
}

fn insert_fact(conn: &Connection, fact: &NewFact, created_at: i64) -> rusqlite::Result<i64> {
    match &fact.payload {
        FactPayload::Task { description } => conn
            .prepare_cached(
                "INSERT INTO tasks (chat_id, message_id, description, context, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?
            .insert(params![fact.chat_id, fact.message_id, description, fact.context, created_at]),
        FactPayload::Link { url } => conn
            .prepare_cached(
                "INSERT INTO links (chat_id, message_id, url, context, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?
            .insert(params![fact.chat_id, fact.message_id, url, fact.context, created_at]),
        FactPayload::Document { file_name, file_id } => conn
            .prepare_cached(
                "INSERT INTO documents (chat_id, message_id, file_name, file_id, context, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?
            .insert(params![
                fact.chat_id,
                fact.message_id,
                file_name,
                file_id,
                fact.context,
                created_at,
            ]),
        FactPayload::Mention { handle } => conn
            .prepare_cached(
                "INSERT INTO mentions (chat_id, message_id, handle, context, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?
            .insert(params![fact.chat_id, fact.message_id, handle, fact.context, created_at]),
        FactPayload::Hashtag { tag } => conn
            .prepare_cached(
                "INSERT INTO hashtags (chat_id, message_id, tag, context, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?
            .insert(params![fact.chat_id, fact.message_id, tag, fact.context, created_at]),
    }
}

fn row_to_fact(category: Category, row: &rusqlite::Row<'_>) -> rusqlite::Result<Fact> {
    let payload = match category {
        Category::Task => FactPayload::Task {
            description: row.get("description")?,
        },
        Category::Link => FactPayload::Link { url: row.get("url")? },
        Category::Document => FactPayload::Document {
            file_name: row.get("file_name")?,
            file_id: row.get("file_id")?,
        },
        Category::Mention => FactPayload::Mention {
            handle: row.get("handle")?,
        },
        Category::Hashtag => FactPayload::Hashtag { tag: row.get("tag")? },
    };

    let is_checked: bool = row.get("is_checked")?;
    let classification = if is_checked {
        Classification::Checked {
            important: row.get::<_, Option<bool>>("is_important")?.unwrap_or(false),
            about: row.get("about")?,
        }
    } else {
        Classification::Unchecked
    };

    Ok(Fact {
        id: row.get("id")?,
        chat_id: row.get("chat_id")?,
        message_id: row.get("message_id")?,
        payload,
        context: row.get("context")?,
        classification,
        created_at: row.get("created_at")?,
    })
}

fn row_to_settings(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChatSettings> {
    let mode: String = row.get("digest_mode")?;
    let time: Option<String> = row.get("digest_time")?;
    let last_sent: Option<String> = row.get("last_auto_digest_on")?;

    Ok(ChatSettings {
        chat_id: row.get("chat_id")?,
        title: row.get("title")?,
        username: row.get("username")?,
        is_active: row.get("is_active")?,
        digest_mode: DigestMode::parse(&mode).unwrap_or(DigestMode::Manual),
        digest_time: time.and_then(|t| NaiveTime::parse_from_str(&t, TIME_FORMAT).ok()),
        include_tasks: row.get("include_tasks")?,
        include_links: row.get("include_links")?,
        include_documents: row.get("include_documents")?,
        include_mentions: row.get("include_mentions")?,
        include_hashtags: row.get("include_hashtags")?,
        last_auto_digest_on: last_sent.and_then(|d| NaiveDate::parse_from_str(&d, DATE_FORMAT).ok()),
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
