pub mod auth;
pub mod error;
pub mod middleware;
pub mod notes;
pub mod token;

use std::sync::Arc;

use axum::{
    Json, Router,
    middleware::from_fn_with_state,
    routing::{get, post, put},
};

use devpad_db::Database;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
}

/// Assemble the full /api router. Note routes sit behind the auth
/// middleware; auth routes and the health check are public.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/api/ping", get(ping))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/api/notes", get(notes::list_notes).post(notes::create_note))
        .route(
            "/api/notes/{id}",
            put(notes::update_note).delete(notes::delete_note),
        )
        .layer(from_fn_with_state(state.clone(), middleware::require_auth))
        .with_state(state);

    public_routes.merge(protected_routes)
}

async fn ping() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "pong from DevPad!" }))
}
