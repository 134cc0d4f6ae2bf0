//! Database schema and migrations for the scrapper.
//!
//! Migrations are applied sequentially when the database is first opened or
//! upgraded. Timestamps are TEXT in the format produced by
//! `crate::datetime::to_db`.

/// Database migrations.
///
/// Each migration is a SQL script that will be executed in order.
/// The schema_version table tracks which migrations have been applied.
pub const MIGRATIONS: &[&str] = &[
    // v1: Tracked links
    r#"
CREATE TABLE links (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    url                 TEXT NOT NULL UNIQUE,
    updated_at          TEXT NOT NULL,   -- last detected remote change
    last_checked_at     TEXT NOT NULL,   -- last poll, >= updated_at
    created_at          TEXT NOT NULL
);

CREATE INDEX idx_links_last_checked_at ON links(last_checked_at);
"#,
    // v2: Chats and subscriptions
    r#"
CREATE TABLE chats (
    id          INTEGER PRIMARY KEY,     -- chat platform identifier
    created_at  TEXT NOT NULL
);

CREATE TABLE chat_links (
    chat_id     INTEGER NOT NULL REFERENCES chats(id) ON DELETE CASCADE,
    link_id     INTEGER NOT NULL REFERENCES links(id) ON DELETE CASCADE,
    created_at  TEXT NOT NULL,
    PRIMARY KEY (chat_id, link_id)
);

CREATE INDEX idx_chat_links_link_id ON chat_links(link_id);
"#,
    // v3: Question state for Stack Overflow links
    r#"
CREATE TABLE questions (
    link_id         INTEGER PRIMARY KEY REFERENCES links(id) ON DELETE CASCADE,
    answer_count    INTEGER NOT NULL,
    updated_at      TEXT NOT NULL
);
"#,
    // v4: Upstream availability flag
    r#"
ALTER TABLE links ADD COLUMN unavailable_since TEXT;
ALTER TABLE links ADD COLUMN last_error TEXT;
"#,
];
