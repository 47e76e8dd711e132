use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use crate::config::Environment;
use crate::error::{envelope, error_code_for_status, ErrorReport};

/// Largest plain-text error body reused as a message
const MAX_TEXT_BODY: usize = 16 * 1024;

/// Renders every error response as the JSON envelope.
///
/// `ApiError` responses get their `stack` outside production. Anything else
/// at 4xx/5xx that is not already JSON (framework rejections, unmatched
/// routes, static misses) is wrapped in the same envelope.
pub async fn format_errors(
    State(environment): State<Environment>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;

    if let Some(report) = response.extensions_mut().remove::<ErrorReport>() {
        if environment.is_production() {
            return response;
        }
        let mut body = report.body;
        body["stack"] = json!(report.stack);
        return rebuild(response, body);
    }

    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) || is_json(&response) {
        return response;
    }

    let (parts, body) = response.into_parts();
    let text = to_bytes(body, MAX_TEXT_BODY)
        .await
        .ok()
        .and_then(|bytes| String::from_utf8(bytes.to_vec()).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    let message = text
        .or_else(|| status.canonical_reason().map(str::to_string))
        .unwrap_or_else(|| status.to_string());

    let mut body = envelope(status, error_code_for_status(status), &message);
    if !environment.is_production() {
        body["stack"] = json!([format!("{}: {}", error_code_for_status(status), message)]);
    }
    rebuild(Response::from_parts(parts, Body::empty()), body)
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("application/json"))
        .unwrap_or(false)
}

/// Same status and headers, new JSON body
fn rebuild(response: Response, body: Value) -> Response {
    let (mut parts, _) = response.into_parts();
    parts.headers.remove(header::CONTENT_LENGTH);
    parts
        .headers
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));

    match serde_json::to_vec(&body) {
        Ok(bytes) => Response::from_parts(parts, Body::from(bytes)),
        Err(e) => {
            tracing::error!("Failed to serialize error body: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": true, "message": "Failed to format error" })),
            )
                .into_response()
        }
    }
}
