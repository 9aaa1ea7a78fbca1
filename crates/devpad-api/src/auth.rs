use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

use devpad_types::api::{LoginRequest, RegisterRequest, TokenResponse};

use crate::AppState;
use crate::error::ApiError;
use crate::token;

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (email, password) = require_credentials(req.email, req.password)?;

    // A racing duplicate insert below still surfaces as the same 409
    // via the UNIQUE constraint on email.
    if state.db.get_user_by_email(&email)?.is_some() {
        return Err(ApiError::Conflict("User already exists"));
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| {
            tracing::error!("password hashing failed: {}", e);
            ApiError::Internal
        })?
        .to_string();

    let user_id = state.db.create_user(&email, &password_hash)?;

    let access_token = token::issue(&state.jwt_secret, user_id)?;
    Ok((StatusCode::CREATED, Json(TokenResponse { access_token })))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = req.email.unwrap_or_default();
    let password = req.password.unwrap_or_default();

    let user = state
        .db
        .get_user_by_email(&email)?
        .ok_or(ApiError::Auth("Bad credentials"))?;

    // Verify password
    let parsed_hash =
        PasswordHash::new(&user.password_hash).map_err(|e| {
            tracing::error!("stored hash for user {} is unparseable: {}", user.id, e);
            ApiError::Internal
        })?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::Auth("Bad credentials"))?;

    let access_token = token::issue(&state.jwt_secret, user.id)?;
    Ok(Json(TokenResponse { access_token }))
}

fn require_credentials(
    email: Option<String>,
    password: Option<String>,
) -> Result<(String, String), ApiError> {
    match (email, password) {
        (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
            Ok((email, password))
        }
        _ => Err(ApiError::Validation("Email and password required")),
    }
}
