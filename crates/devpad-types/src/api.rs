use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// -- JWT Claims --

/// JWT claims shared between token issuance (auth routes) and the
/// require_auth middleware. Canonical definition lives here in devpad-types
/// to eliminate duplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub iat: usize,
    pub exp: usize,
}

// -- Auth --

/// Fields are optional so that absent and empty credentials both surface as
/// a 400 from the handler instead of a deserialization rejection.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
}

// -- Notes --

/// Shared body shape for note create and update. Every field is optional:
/// create fills in documented defaults, update leaves absent fields alone.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NoteUpsertRequest {
    pub title: Option<String>,
    pub content_md: Option<String>,
    pub language: Option<String>,
    pub favorite: Option<bool>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct NoteResponse {
    pub id: i64,
    pub title: String,
    pub content_md: String,
    pub language: String,
    pub favorite: bool,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_viewed_at: Option<DateTime<Utc>>,
}
