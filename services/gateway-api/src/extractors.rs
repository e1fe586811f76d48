//! Axum extractors for the three credential kinds

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};

use hermes_auth_core::InternalScope;
use hermes_db::models::ServiceUserRow;
use hermes_types::HermesError;

use crate::error::ApiError;
use crate::state::AppState;

/// Customer authenticated via `x-api-key`
#[derive(Debug, Clone)]
pub struct CustomerUser(pub ServiceUserRow);

impl<S> FromRequestParts<S> for CustomerUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        let api_key = parts
            .headers
            .get("x-api-key")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(HermesError::MissingCredentials)
            .map_err(ApiError::from)?;

        let user = app_state.resolver.resolve_customer(api_key).await?;
        Ok(CustomerUser(user))
    }
}

/// Internal service caller authenticated via `x-internal-api-key`
/// (fallback `Authorization: Bearer`)
#[derive(Debug, Clone)]
pub struct InternalAuth(pub InternalScope);

impl<S> FromRequestParts<S> for InternalAuth
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        let provided = internal_key_from_headers(&parts.headers)
            .ok_or(HermesError::MissingCredentials)
            .map_err(ApiError::from)?;

        let scope = app_state
            .internal_keys
            .resolve(&provided)
            .ok_or(HermesError::InvalidInternalKey)
            .map_err(ApiError::from)?;

        Ok(InternalAuth(scope))
    }
}

fn internal_key_from_headers(headers: &HeaderMap) -> Option<String> {
    if let Some(key) = headers
        .get("x-internal-api-key")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return Some(key.to_string());
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().trim_start_matches("Bearer ").trim())
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

/// Extract a session token: `token` header first, then
/// `Authorization: Bearer` (or a bare `Authorization` value).
pub fn session_token_from_headers(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = headers
        .get("token")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
    {
        return Some(token.to_string());
    }

    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())?;

    let token = auth.strip_prefix("Bearer ").unwrap_or(auth);
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_header_wins() {
        let mut headers = HeaderMap::new();
        headers.insert("token", "wat_abc".parse().unwrap());
        headers.insert(header::AUTHORIZATION, "Bearer other".parse().unwrap());
        assert_eq!(session_token_from_headers(&headers).unwrap(), "wat_abc");
    }

    #[test]
    fn test_bearer_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer wat_abc".parse().unwrap());
        assert_eq!(session_token_from_headers(&headers).unwrap(), "wat_abc");
    }

    #[test]
    fn test_bare_authorization_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "wat_abc".parse().unwrap());
        assert_eq!(session_token_from_headers(&headers).unwrap(), "wat_abc");
    }

    #[test]
    fn test_no_token() {
        assert!(session_token_from_headers(&HeaderMap::new()).is_none());
    }

    #[test]
    fn test_internal_key_header_priority() {
        let mut headers = HeaderMap::new();
        headers.insert("x-internal-api-key", "secret-1".parse().unwrap());
        headers.insert(header::AUTHORIZATION, "Bearer secret-2".parse().unwrap());
        assert_eq!(internal_key_from_headers(&headers).unwrap(), "secret-1");
    }
}
