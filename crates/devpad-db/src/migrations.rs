use rusqlite::Connection;
use tracing::info;

use crate::error::Result;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id             INTEGER PRIMARY KEY AUTOINCREMENT,
            email          TEXT NOT NULL UNIQUE,
            password_hash  TEXT NOT NULL,
            created_at     TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
            updated_at     TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now'))
        );

        CREATE TABLE IF NOT EXISTS notes (
            id             INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id        INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            title          TEXT NOT NULL DEFAULT 'Untitled',
            content_md     TEXT NOT NULL DEFAULT '',
            language       TEXT NOT NULL DEFAULT 'plaintext',
            favorite       INTEGER NOT NULL DEFAULT 0,
            created_at     TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
            updated_at     TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
            last_viewed_at TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_notes_user
            ON notes(user_id, updated_at);

        CREATE TABLE IF NOT EXISTS tags (
            id    INTEGER PRIMARY KEY AUTOINCREMENT,
            name  TEXT NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS note_tags (
            note_id  INTEGER NOT NULL REFERENCES notes(id) ON DELETE CASCADE,
            tag_id   INTEGER NOT NULL REFERENCES tags(id),
            PRIMARY KEY (note_id, tag_id)
        );
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
