//! Session middleware.
//!
//! Loads the session before the inner service runs and exposes it to
//! handlers through [`CurrentSession`](super::extract::CurrentSession).
//! Once the handler has produced a response, whatever its status, the
//! session is saved and any cookies or headers raised along the way are
//! written onto that response.

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::state::AppState;
use crate::transport::{request_view, HeaderSurface};

/// Attach via `axum::middleware::from_fn_with_state`.
pub async fn session_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let (mut parts, body) = req.into_parts();
    let view = request_view(&parts);

    let open = match state.sessions.open(&view).await {
        Ok(open) => open,
        Err(e) => {
            tracing::error!(error = %e, "failed to load session");
            return unavailable();
        }
    };
    parts.extensions.insert(open.handle().clone());

    let mut response = next.run(Request::from_parts(parts, body)).await;
    let mut headers = HeaderSurface(response.headers_mut());
    if let Err(e) = state.sessions.commit(open, &mut headers).await {
        tracing::error!(error = %e, "failed to save session");
        return unavailable();
    }
    response
}

fn unavailable() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        axum::Json(serde_json::json!({ "error": "session storage unavailable" })),
    )
        .into_response()
}
