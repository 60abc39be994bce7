use super::response::ApiError;
use super::AppState;
use axum::{
    async_trait,
    extract::{FromRequestParts, Query},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, Uri},
};
use serde::Deserialize;

/// Shared secret guarding write operations. No token means no authentication.
#[derive(Debug, Clone, Default)]
pub struct AuthToken(Option<String>);

#[derive(Deserialize)]
struct TokenParam {
    token: Option<String>,
}

impl AuthToken {
    pub fn new(token: Option<String>) -> Self {
        Self(token.filter(|token| !token.is_empty()))
    }

    pub fn is_enabled(&self) -> bool {
        self.0.is_some()
    }

    /// Accepts `Authorization: Bearer <token>` or a `?token=<token>` query parameter.
    pub fn allows(&self, headers: &HeaderMap, uri: &Uri) -> bool {
        let Some(expected) = self.0.as_deref() else {
            return true;
        };

        let bearer = headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "));
        if bearer == Some(expected) {
            return true;
        }

        Query::<TokenParam>::try_from_uri(uri)
            .ok()
            .and_then(|Query(param)| param.token)
            .is_some_and(|token| token == expected)
    }
}

/// Extractor that rejects the request with 401 unless it carries the token.
pub struct Authorized;

#[async_trait]
impl FromRequestParts<AppState> for Authorized {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if state.auth.allows(&parts.headers, &parts.uri) {
            Ok(Authorized)
        } else {
            Err(ApiError::Unauthorized)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_disabled_allows_everything() {
        let auth = AuthToken::new(None);
        assert!(!auth.is_enabled());
        assert!(auth.allows(&HeaderMap::new(), &Uri::from_static("/queue/clear")));
        assert!(!AuthToken::new(Some(String::new())).is_enabled());
    }

    #[test]
    fn test_bearer_header() {
        let auth = AuthToken::new(Some("s3cret".into()));
        let uri = Uri::from_static("/queue/clear");
        assert!(auth.allows(&headers("Bearer s3cret"), &uri));
        assert!(!auth.allows(&headers("Bearer wrong"), &uri));
        assert!(!auth.allows(&headers("s3cret"), &uri));
        assert!(!auth.allows(&HeaderMap::new(), &uri));
    }

    #[test]
    fn test_query_token() {
        let auth = AuthToken::new(Some("s3cret".into()));
        let empty = HeaderMap::new();
        assert!(auth.allows(&empty, &Uri::from_static("/queue/add?path=a.mp4&token=s3cret")));
        assert!(!auth.allows(&empty, &Uri::from_static("/queue/add?token=nope")));
        assert!(auth.allows(&headers("Bearer wrong"), &Uri::from_static("/?token=s3cret")));
    }
}
