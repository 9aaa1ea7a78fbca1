use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};

use devpad_types::api::Claims;

use crate::error::ApiError;

/// Access tokens expire one hour after issuance.
const TOKEN_TTL_SECS: i64 = 3600;

pub fn issue(secret: &str, user_id: i64) -> Result<String, ApiError> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user_id,
        iat: now as usize,
        exp: (now + TOKEN_TTL_SECS) as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| {
        tracing::error!("token encoding failed: {}", e);
        ApiError::Internal
    })
}

/// Validates signature and expiry; any failure is the same 401 to the caller.
pub fn verify(secret: &str, token: &str) -> Result<Claims, ApiError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| ApiError::Auth("Missing or invalid token"))
}
