//! Small login/logout application exercising the session layer.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

use super::extract::CurrentSession;

/// The whole session and its identifier.
pub async fn index(session: CurrentSession) -> Json<serde_json::Value> {
    Json(json!({
        "session": session.all(),
        "sessionId": session.id(),
    }))
}

pub async fn login(session: CurrentSession) -> Json<serde_json::Value> {
    session.set("isConnected", true);
    session.set("name", "John");
    Json(json!({ "ok": true }))
}

pub async fn logout(session: CurrentSession) -> Json<serde_json::Value> {
    session.set("isConnected", false);
    session.remove("name");
    Json(json!({ "ok": true }))
}

pub async fn my_profile(session: CurrentSession) -> Response {
    if session.get_or("isConnected", json!(false)) != json!(true) {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({ "error": "not connected" })),
        )
            .into_response();
    }
    Json(json!({ "name": session.get("name") })).into_response()
}

/// Destroy the session; the identifier cookie is expired on the way out.
pub async fn forget(session: CurrentSession) -> StatusCode {
    session.destroy();
    StatusCode::NO_CONTENT
}
