//! Database schema SQL.

/// Per-chat settings: activation flag, digest mode and category toggles.
pub const CHATS_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS chats (
    chat_id INTEGER PRIMARY KEY,
    title TEXT,
    username TEXT,
    is_active INTEGER NOT NULL DEFAULT 1,
    digest_mode TEXT NOT NULL DEFAULT 'manual',
    digest_time TEXT,
    include_tasks INTEGER NOT NULL DEFAULT 1,
    include_links INTEGER NOT NULL DEFAULT 1,
    include_documents INTEGER NOT NULL DEFAULT 1,
    include_mentions INTEGER NOT NULL DEFAULT 1,
    include_hashtags INTEGER NOT NULL DEFAULT 1,
    last_auto_digest_on TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER
);
"#;

/// One table per fact category. Classification columns are shared.
pub const FACTS_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS tasks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    chat_id INTEGER NOT NULL,
    message_id INTEGER NOT NULL,
    description TEXT NOT NULL,
    context TEXT NOT NULL DEFAULT '',
    is_checked INTEGER NOT NULL DEFAULT 0,
    is_important INTEGER,
    about TEXT,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS links (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    chat_id INTEGER NOT NULL,
    message_id INTEGER NOT NULL,
    url TEXT NOT NULL,
    context TEXT NOT NULL DEFAULT '',
    is_checked INTEGER NOT NULL DEFAULT 0,
    is_important INTEGER,
    about TEXT,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS documents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    chat_id INTEGER NOT NULL,
    message_id INTEGER NOT NULL,
    file_name TEXT NOT NULL,
    file_id TEXT NOT NULL,
    context TEXT NOT NULL DEFAULT '',
    is_checked INTEGER NOT NULL DEFAULT 0,
    is_important INTEGER,
    about TEXT,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS mentions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    chat_id INTEGER NOT NULL,
    message_id INTEGER NOT NULL,
    handle TEXT NOT NULL,
    context TEXT NOT NULL DEFAULT '',
    is_checked INTEGER NOT NULL DEFAULT 0,
    is_important INTEGER,
    about TEXT,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS hashtags (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    chat_id INTEGER NOT NULL,
    message_id INTEGER NOT NULL,
    tag TEXT NOT NULL,
    context TEXT NOT NULL DEFAULT '',
    is_checked INTEGER NOT NULL DEFAULT 0,
    is_important INTEGER,
    about TEXT,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_tasks_window ON tasks(chat_id, created_at);
CREATE INDEX IF NOT EXISTS idx_links_window ON links(chat_id, created_at);
CREATE INDEX IF NOT EXISTS idx_documents_window ON documents(chat_id, created_at);
CREATE INDEX IF NOT EXISTS idx_mentions_window ON mentions(chat_id, created_at);
CREATE INDEX IF NOT EXISTS idx_hashtags_window ON hashtags(chat_id, created_at);
"#;
