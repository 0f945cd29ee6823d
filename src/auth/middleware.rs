use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use tracing::warn;
use uuid::Uuid;

use crate::{error::ApiError, state::AppState};

/// Header carrying the bearer token.
pub const TOKEN_HEADER: &str = "x-auth-token";

/// Subject of a verified token, inserted into request extensions by
/// [`require_auth`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser(pub Uuid);

/// Token from the auth header; an empty value counts as absent.
pub fn header_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(TOKEN_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Verifies `token` against the state's keys and returns its subject.
pub fn authenticate(state: &AppState, token: Option<&str>) -> Result<AuthUser, ApiError> {
    let token = token.ok_or(ApiError::MissingToken)?;
    match state.keys.verify(token) {
        Ok(claims) => Ok(AuthUser(claims.sub)),
        Err(e) => {
            warn!(error = %e, "invalid or expired token");
            Err(ApiError::InvalidToken)
        }
    }
}

pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = authenticate(&state, header_token(req.headers()))?;
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn header_token_ignores_blank_values() {
        let mut headers = HeaderMap::new();
        assert_eq!(header_token(&headers), None);

        headers.insert(TOKEN_HEADER, HeaderValue::from_static("  "));
        assert_eq!(header_token(&headers), None);

        headers.insert(TOKEN_HEADER, HeaderValue::from_static("abc.def.ghi"));
        assert_eq!(header_token(&headers), Some("abc.def.ghi"));
    }
}
