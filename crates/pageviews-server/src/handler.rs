//! Visit handler: one counter increment per request.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};

use crate::app_state::AppState;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
pub const ERROR_BODY: &str = "Internal server error";

pub fn visit_message(count: u64) -> String {
    format!("Service up and running! Total page views: {count}")
}

fn text(status: StatusCode, body: String) -> Response {
    (status, [(header::CONTENT_TYPE, TEXT_PLAIN)], body).into_response()
}

pub async fn count_visit(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let client = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");
    tracing::info!(%client, "request received");

    match state.counter().increment_and_read().await {
        Ok(count) => text(StatusCode::OK, visit_message(count)),
        Err(e) => {
            // detail stays in the log
            tracing::error!(
                kind = e.kind().as_str(),
                backend = state.counter().backend(),
                error = %e,
                "increment failed"
            );
            text(StatusCode::INTERNAL_SERVER_ERROR, ERROR_BODY.to_string())
        }
    }
}
