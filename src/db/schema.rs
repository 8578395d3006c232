//! Database schema and migrations for fileupload.
//!
//! Migrations are applied sequentially when the database is opened.
//! The schema_version table tracks which migrations have been applied.

/// Database migrations.
pub const MIGRATIONS: &[&str] = &[
    // v1: files table
    r#"
CREATE TABLE files (
    ID          INTEGER PRIMARY KEY AUTOINCREMENT,
    NAME        TEXT NOT NULL,
    BASE_NAME   TEXT NOT NULL,
    EXT         TEXT,
    SIZE        INTEGER NOT NULL,
    HASH        TEXT,
    PATH        TEXT NOT NULL,
    TYPE        TEXT,
    TITLE       TEXT,
    USER_ID     INTEGER,
    CREATED_AT  TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX idx_files_hash ON files(HASH);
CREATE INDEX idx_files_user_id ON files(USER_ID);
"#,
];
