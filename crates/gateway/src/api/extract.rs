use std::ops::Deref;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::Json;

use sk_sessions::SessionHandle;

/// Axum extractor for the current request's session.
///
/// Requires [`session_middleware`](super::session::session_middleware) on
/// the route; without it extraction fails with a 500.
pub struct CurrentSession(pub SessionHandle);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<serde_json::Value>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionHandle>()
            .cloned()
            .map(CurrentSession)
            .ok_or_else(|| {
                tracing::error!("CurrentSession used on a route without the session middleware");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({ "error": "session middleware not installed" })),
                )
            })
    }
}

impl Deref for CurrentSession {
    type Target = SessionHandle;

    fn deref(&self) -> &SessionHandle {
        &self.0
    }
}
