//! Caller identity resolution.
//!
//! Clients authenticate upstream and forward their stable user id in the
//! `x-player-id` header. The extractor only checks shape; authorization
//! (host vs. player) is decided per operation in the services.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::AppError;

/// Header carrying the caller's user id.
pub const PLAYER_ID_HEADER: &str = "x-player-id";

/// Maximum accepted id length; anything longer is rejected as malformed.
const MAX_ID_LENGTH: usize = 128;

/// Identity of the authenticated caller, extracted from request headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    /// Stable user id, also used as the roster key.
    pub id: String,
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(raw) = parts.headers.get(PLAYER_ID_HEADER) else {
            return Err(AppError::Unauthorized(format!(
                "missing {PLAYER_ID_HEADER} header"
            )));
        };

        let id = raw
            .to_str()
            .map_err(|_| {
                AppError::Unauthorized(format!("{PLAYER_ID_HEADER} header is not valid UTF-8"))
            })?
            .trim();

        if id.is_empty() || id.len() > MAX_ID_LENGTH {
            return Err(AppError::Unauthorized(format!(
                "{PLAYER_ID_HEADER} header is malformed"
            )));
        }

        Ok(CurrentUser { id: id.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    async fn extract(request: Request<()>) -> Result<CurrentUser, AppError> {
        let (mut parts, _) = request.into_parts();
        CurrentUser::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn header_is_required() {
        let request = Request::builder().body(()).unwrap();
        assert!(extract(request).await.is_err());
    }

    #[tokio::test]
    async fn header_value_is_trimmed() {
        let request = Request::builder()
            .header(PLAYER_ID_HEADER, "  user-7  ")
            .body(())
            .unwrap();
        let user = extract(request).await.unwrap();
        assert_eq!(user.id, "user-7");
    }

    #[tokio::test]
    async fn blank_header_is_rejected() {
        let request = Request::builder()
            .header(PLAYER_ID_HEADER, "   ")
            .body(())
            .unwrap();
        assert!(extract(request).await.is_err());
    }
}
