//! Bearer-token check for the trigger routes.
//!
//! The expected token is `NICHETRACK_INGEST_SECRET`. When it is not
//! configured every protected request fails with a configuration error
//! rather than being let through.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::{AuthError, Error};

use super::state::AppState;

pub async fn require_bearer(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let expected = match state.config.ingest_secret() {
        Ok(secret) => secret,
        Err(e) => return Error::from(e).into_response(),
    };

    let provided = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(bearer_token);

    match provided {
        Some(token) if constant_time_eq(token.as_bytes(), expected.as_bytes()) => next.run(request).await,
        Some(_) => Error::Auth(AuthError::InvalidToken).into_response(),
        None => Error::Auth(AuthError::MissingToken).into_response(),
    }
}

fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Compares every byte regardless of where the first mismatch is.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
