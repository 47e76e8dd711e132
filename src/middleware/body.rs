//! Request body parsing for JSON and urlencoded forms.

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
    http::header::CONTENT_TYPE,
    Form, Json,
};
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::error::ApiError;

/// A request body as JSON, whatever encoding it arrived in.
///
/// Form fields become string values. A request without a body, or with only
/// whitespace, parses to `{}` regardless of its content type.
#[derive(Debug, Clone)]
pub struct ParsedBody(pub Value);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Json,
    Form,
    Other,
}

fn body_kind(content_type: Option<&str>) -> BodyKind {
    let Some(content_type) = content_type else {
        return BodyKind::Other;
    };
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    if mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json")) {
        BodyKind::Json
    } else if mime == "application/x-www-form-urlencoded" {
        BodyKind::Form
    } else {
        BodyKind::Other
    }
}

#[async_trait]
impl<S> FromRequest<S> for ParsedBody
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let kind = body_kind(
            req.headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok()),
        );

        if kind == BodyKind::Form {
            let Form(fields) = Form::<HashMap<String, String>>::from_request(req, state).await?;
            let object: Map<String, Value> = fields
                .into_iter()
                .map(|(k, v)| (k, Value::String(v)))
                .collect();
            return Ok(ParsedBody(Value::Object(object)));
        }

        let bytes = Bytes::from_request(req, state).await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(ParsedBody(Value::Object(Map::new())));
        }

        match kind {
            BodyKind::Json => {
                let Json(value) = Json::<Value>::from_bytes(&bytes)?;
                Ok(ParsedBody(value))
            }
            _ => Err(ApiError::UnsupportedMediaType(
                "Expected request with `Content-Type: application/json` or `application/x-www-form-urlencoded`"
                    .to_string(),
            )),
        }
    }
}
