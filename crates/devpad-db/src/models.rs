/// Database row and parameter types — these map directly to SQLite rows.
/// Distinct from the devpad-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub created_at: String,
    pub updated_at: String,
}

pub struct NoteRow {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub content_md: String,
    pub language: String,
    pub favorite: bool,
    pub created_at: String,
    pub updated_at: String,
    pub last_viewed_at: Option<String>,
}

/// One (note, tag name) pair from the join table, attachment order preserved.
pub struct NoteTagRow {
    pub note_id: i64,
    pub name: String,
}

/// Fully-defaulted field set for inserting a note.
pub struct NoteDraft {
    pub title: String,
    pub content_md: String,
    pub language: String,
    pub favorite: bool,
    pub tags: Vec<String>,
}

/// Partial field set for updating a note. `None` leaves the stored value
/// unchanged; `tags: None` leaves the tag set untouched, `Some(vec![])`
/// clears it.
pub struct NoteChanges {
    pub title: Option<String>,
    pub content_md: Option<String>,
    pub language: Option<String>,
    pub favorite: Option<bool>,
    pub tags: Option<Vec<String>>,
}
