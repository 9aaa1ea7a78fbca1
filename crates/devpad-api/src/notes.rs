use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{error, warn};

use devpad_db::models::{NoteChanges, NoteDraft};
use devpad_types::api::{Claims, NoteResponse, NoteUpsertRequest};

use crate::AppState;
use crate::error::ApiError;

pub async fn list_notes(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    // Run blocking DB queries off the async runtime
    let db = state.clone();
    let user_id = claims.sub;

    let (rows, tag_rows) = tokio::task::spawn_blocking(move || {
        let rows = db.db.list_notes(user_id)?;

        let note_ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let tag_rows = db.db.get_tags_for_notes(&note_ids)?;

        Ok::<_, devpad_db::StoreError>((rows, tag_rows))
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal
    })??;

    // Group tag names by note id; the join query preserves attachment order
    let mut tag_map: HashMap<i64, Vec<String>> = HashMap::new();
    for t in tag_rows {
        tag_map.entry(t.note_id).or_default().push(t.name);
    }

    let notes: Vec<NoteResponse> = rows
        .into_iter()
        .map(|row| NoteResponse {
            id: row.id,
            title: row.title,
            content_md: row.content_md,
            language: row.language,
            favorite: row.favorite,
            tags: tag_map.remove(&row.id).unwrap_or_default(),
            created_at: parse_timestamp(&row.created_at, row.id),
            updated_at: parse_timestamp(&row.updated_at, row.id),
            last_viewed_at: row
                .last_viewed_at
                .as_deref()
                .map(|ts| parse_timestamp(ts, row.id)),
        })
        .collect();

    Ok(Json(notes))
}

pub async fn create_note(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<NoteUpsertRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let draft = NoteDraft {
        title: req.title.unwrap_or_else(|| "Untitled".into()),
        content_md: req.content_md.unwrap_or_default(),
        language: req.language.unwrap_or_else(|| "plaintext".into()),
        favorite: req.favorite.unwrap_or(false),
        tags: req.tags.unwrap_or_default(),
    };

    let db = state.clone();
    let user_id = claims.sub;
    let id = tokio::task::spawn_blocking(move || db.db.create_note(user_id, draft))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal
        })??;

    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

pub async fn update_note(
    State(state): State<AppState>,
    Path(note_id): Path<i64>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<NoteUpsertRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let changes = NoteChanges {
        title: req.title,
        content_md: req.content_md,
        language: req.language,
        favorite: req.favorite,
        tags: req.tags,
    };

    let db = state.clone();
    let user_id = claims.sub;
    tokio::task::spawn_blocking(move || db.db.update_note(user_id, note_id, changes))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal
        })??;

    Ok(Json(serde_json::json!({ "msg": "Updated" })))
}

pub async fn delete_note(
    State(state): State<AppState>,
    Path(note_id): Path<i64>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let user_id = claims.sub;
    tokio::task::spawn_blocking(move || db.db.delete_note(user_id, note_id))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal
        })??;

    Ok(Json(serde_json::json!({ "msg": "Deleted" })))
}

fn parse_timestamp(raw: &str, note_id: i64) -> chrono::DateTime<chrono::Utc> {
    raw.parse::<chrono::DateTime<chrono::Utc>>()
        .or_else(|_| {
            // SQLite's datetime() emits "YYYY-MM-DD HH:MM:SS" without a
            // timezone; parse as naive UTC and convert.
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}' on note {}: {}", raw, note_id, e);
            chrono::DateTime::default()
        })
}
