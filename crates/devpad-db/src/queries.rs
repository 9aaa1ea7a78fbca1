use rusqlite::{Connection, OptionalExtension};

use crate::Database;
use crate::error::{Result, StoreError};
use crate::models::{NoteChanges, NoteDraft, NoteRow, NoteTagRow, UserRow};

impl Database {
    // -- Users --

    pub fn create_user(&self, email: &str, password_hash: &str) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (email, password_hash) VALUES (?1, ?2)",
                (email, password_hash),
            )
            .map_err(StoreError::from_insert)?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_email(conn, email))
    }

    // -- Notes --

    /// Insert a note and attach its tags in one transaction, so a failed tag
    /// resolution never leaves a half-created note behind.
    pub fn create_note(&self, user_id: i64, draft: NoteDraft) -> Result<i64> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            tx.execute(
                "INSERT INTO notes (user_id, title, content_md, language, favorite)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    user_id,
                    draft.title,
                    draft.content_md,
                    draft.language,
                    draft.favorite
                ],
            )?;
            let note_id = tx.last_insert_rowid();

            attach_tags(&tx, note_id, &draft.tags)?;

            tx.commit()?;
            Ok(note_id)
        })
    }

    /// All notes owned by `user_id`, most recently updated first. Ties are
    /// broken by id descending so the ordering stays deterministic.
    pub fn list_notes(&self, user_id: i64) -> Result<Vec<NoteRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, title, content_md, language, favorite,
                        created_at, updated_at, last_viewed_at
                 FROM notes
                 WHERE user_id = ?1
                 ORDER BY updated_at DESC, id DESC",
            )?;

            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(NoteRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        title: row.get(2)?,
                        content_md: row.get(3)?,
                        language: row.get(4)?,
                        favorite: row.get(5)?,
                        created_at: row.get(6)?,
                        updated_at: row.get(7)?,
                        last_viewed_at: row.get(8)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Batch-fetch tag names for a set of note ids, in attachment order.
    pub fn get_tags_for_notes(&self, note_ids: &[i64]) -> Result<Vec<NoteTagRow>> {
        if note_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> =
                (1..=note_ids.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT nt.note_id, t.name
                 FROM note_tags nt
                 JOIN tags t ON nt.tag_id = t.id
                 WHERE nt.note_id IN ({})
                 ORDER BY nt.rowid",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::types::ToSql> = note_ids
                .iter()
                .map(|id| id as &dyn rusqlite::types::ToSql)
                .collect();

            let rows = stmt
                .query_map(params.as_slice(), |row| {
                    Ok(NoteTagRow {
                        note_id: row.get(0)?,
                        name: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Apply a partial update. Existence is checked before ownership, both
    /// before any mutation; a provided tag list fully replaces the tag set.
    /// `updated_at` refreshes on every call that gets past the checks.
    pub fn update_note(&self, user_id: i64, note_id: i64, changes: NoteChanges) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            check_note_access(&tx, user_id, note_id)?;

            tx.execute(
                "UPDATE notes SET
                    title      = COALESCE(?1, title),
                    content_md = COALESCE(?2, content_md),
                    language   = COALESCE(?3, language),
                    favorite   = COALESCE(?4, favorite),
                    updated_at = strftime('%Y-%m-%dT%H:%M:%fZ','now')
                 WHERE id = ?5",
                rusqlite::params![
                    changes.title,
                    changes.content_md,
                    changes.language,
                    changes.favorite,
                    note_id
                ],
            )?;

            if let Some(tags) = changes.tags {
                tx.execute("DELETE FROM note_tags WHERE note_id = ?1", [note_id])?;
                attach_tags(&tx, note_id, &tags)?;
            }

            tx.commit()?;
            Ok(())
        })
    }

    /// Delete a note after the same existence/ownership checks as update.
    /// Join rows go with it via cascade; tag rows stay.
    pub fn delete_note(&self, user_id: i64, note_id: i64) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            check_note_access(&tx, user_id, note_id)?;

            tx.execute("DELETE FROM notes WHERE id = ?1", [note_id])?;

            tx.commit()?;
            Ok(())
        })
    }
}

/// NotFound for a missing note, then Forbidden for someone else's, in that
/// order. Both checks run before any mutation.
fn check_note_access(conn: &Connection, user_id: i64, note_id: i64) -> Result<()> {
    let owner: Option<i64> = conn
        .query_row(
            "SELECT user_id FROM notes WHERE id = ?1",
            [note_id],
            |row| row.get(0),
        )
        .optional()?;

    match owner {
        None => Err(StoreError::NotFound),
        Some(owner) if owner != user_id => Err(StoreError::Forbidden),
        Some(_) => Ok(()),
    }
}

/// Resolve each name with an idempotent get-or-create, then attach it.
/// INSERT OR IGNORE on both tables makes repeated names within one request
/// and racing requests with the same new name converge on a single tag row.
fn attach_tags(conn: &Connection, note_id: i64, names: &[String]) -> Result<()> {
    for name in names {
        conn.execute("INSERT OR IGNORE INTO tags (name) VALUES (?1)", [name])?;
        let tag_id: i64 =
            conn.query_row("SELECT id FROM tags WHERE name = ?1", [name], |row| {
                row.get(0)
            })?;
        conn.execute(
            "INSERT OR IGNORE INTO note_tags (note_id, tag_id) VALUES (?1, ?2)",
            rusqlite::params![note_id, tag_id],
        )?;
    }
    Ok(())
}

fn query_user_by_email(conn: &Connection, email: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, email, password_hash, created_at, updated_at FROM users WHERE email = ?1",
    )?;

    let row = stmt
        .query_row([email], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                email: row.get(1)?,
                password_hash: row.get(2)?,
                created_at: row.get(3)?,
                updated_at: row.get(4)?,
            })
        })
        .optional()?;

    Ok(row)
}
