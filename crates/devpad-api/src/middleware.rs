use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use crate::AppState;
use crate::error::ApiError;
use crate::token;

/// Extract and validate the bearer JWT from the Authorization header,
/// then hand the claims to the handler as a request extension.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Auth("Missing or invalid token"))?;

    let bearer = auth_header
        .strip_prefix("Bearer ")
        .ok_or(ApiError::Auth("Missing or invalid token"))?;

    let claims = token::verify(&state.jwt_secret, bearer)?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
