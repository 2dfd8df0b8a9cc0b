//! Request body extraction.

use axum::Form;
use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use axum::http::header::CONTENT_TYPE;
use serde_json::Value;
use std::convert::Infallible;
use tracing::debug;
use tracker_core::service::Fields;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const JSON_CONTENT_TYPE: &str = "application/json";

/// How a body is decoded, chosen by its `Content-Type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Json,
    Form,
    Unsupported,
}

impl BodyKind {
    /// A missing header reads as JSON. Parameters after `;` are ignored and
    /// any `+json` suffix type counts as JSON.
    fn from_header(content_type: Option<&str>) -> Self {
        let Some(content_type) = content_type else {
            return Self::Json;
        };
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        if essence == FORM_CONTENT_TYPE {
            Self::Form
        } else if essence == JSON_CONTENT_TYPE
            || (essence.starts_with("application/") && essence.ends_with("+json"))
        {
            Self::Json
        } else {
            Self::Unsupported
        }
    }
}

/// The request body as a field map.
///
/// JSON objects are taken as-is. Url-encoded forms become string values,
/// the last occurrence of a repeated key winning. Any other content type, and
/// anything that does not decode (malformed JSON, a non-object, an unreadable
/// body), yields an empty map so the handler's own validation decides the
/// answer.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RequestFields(pub Fields);

impl RequestFields {
    fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        Self(
            pairs
                .into_iter()
                .map(|(key, value)| (key, Value::String(value)))
                .collect(),
        )
    }

    fn from_json(bytes: &[u8]) -> Self {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Self::default();
        }
        match serde_json::from_slice::<Value>(bytes) {
            Ok(Value::Object(map)) => Self(map),
            Ok(other) => {
                debug!(kind = json_kind(&other), "ignoring non-object body");
                Self::default()
            }
            Err(e) => {
                debug!(error = %e, "ignoring undecodable body");
                Self::default()
            }
        }
    }
}

#[axum::async_trait]
impl<S> FromRequest<S> for RequestFields
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        // A header that is not visible ASCII reads as empty, hence unsupported.
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .map(|value| value.to_str().unwrap_or_default().to_owned());
        let kind = BodyKind::from_header(content_type.as_deref());

        Ok(match kind {
            BodyKind::Form => match Form::<Vec<(String, String)>>::from_request(req, state).await {
                Ok(Form(pairs)) => Self::from_pairs(pairs),
                Err(rejection) => {
                    debug!(error = %rejection, "ignoring undecodable form");
                    Self::default()
                }
            },
            BodyKind::Json => match Bytes::from_request(req, state).await {
                Ok(bytes) => Self::from_json(&bytes),
                Err(rejection) => {
                    debug!(error = %rejection, "ignoring unreadable body");
                    Self::default()
                }
            },
            BodyKind::Unsupported => {
                debug!(?content_type, "ignoring body of unsupported type");
                Self::default()
            }
        })
    }
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
