use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Store-level failures the API layer translates to HTTP statuses.
/// Anything not classified here surfaces through the `Sqlite` variant.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no such row")]
    NotFound,
    #[error("row owned by another user")]
    Forbidden,
    #[error("uniqueness violation")]
    Conflict,
    #[error("db lock poisoned")]
    LockPoisoned,
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

impl StoreError {
    /// Classify a raw sqlite error, folding UNIQUE-constraint failures into
    /// `Conflict` so racing inserts of the same email surface as 409s.
    pub fn from_insert(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(e, _)
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                StoreError::Conflict
            }
            other => StoreError::Sqlite(other),
        }
    }
}
