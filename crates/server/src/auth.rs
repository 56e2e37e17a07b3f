// crates/server/src/auth.rs
//! Owner identity, as verified by the fronting proxy.

use axum::{extract::FromRequestParts, http::request::Parts};
use reelwatch_server_jobs::OwnerId;

use crate::error::ApiError;

/// Header carrying the authenticated principal.
pub const OWNER_HEADER: &str = "x-owner-id";

/// Extracts the caller's [`OwnerId`]. Rejects with 401 when absent.
#[derive(Debug, Clone)]
pub struct Owner(pub OwnerId);

impl<S> FromRequestParts<S> for Owner
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(OWNER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| Owner(OwnerId::new(value)))
            .ok_or(ApiError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(header: Option<&str>) -> Result<Owner, ApiError> {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(OWNER_HEADER, value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        Owner::from_request_parts(&mut parts, &()).await
    }

    #[test]
    fn test_owner_from_header() {
        tokio_test::block_on(async {
            let Owner(owner) = extract(Some(" alice ")).await.unwrap();
            assert_eq!(owner.as_str(), "alice");
        });
    }

    #[test]
    fn test_missing_or_blank_header_is_unauthorized() {
        tokio_test::block_on(async {
            assert!(matches!(extract(None).await, Err(ApiError::Unauthorized)));
            assert!(matches!(extract(Some("  ")).await, Err(ApiError::Unauthorized)));
        });
    }
}
