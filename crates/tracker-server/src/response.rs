//! Flat JSON payloads.
//!
//! Every answer on the issue routes is HTTP 200; success and failure are told
//! apart by the presence of `result` / record keys versus `error`.

use axum::Json;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::Value;
use tracker_core::IssueError;

/// `{ "error": <message>, "_id"?: <id> }`
#[derive(Debug)]
pub struct ApiError(pub IssueError);

impl From<IssueError> for ApiError {
    fn from(error: IssueError) -> Self {
        Self(error)
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'static str,
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<&'a Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        Json(ErrorBody {
            error: self.0.public_message(),
            id: self.0.id(),
        })
        .into_response()
    }
}

/// `{ "result": <message>, "_id": <id> }`, the id echoed as it was sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultBody {
    pub result: &'static str,
    #[serde(rename = "_id")]
    pub id: Value,
}

impl ResultBody {
    #[must_use]
    pub const fn updated(id: Value) -> Self {
        Self {
            result: "successfully updated",
            id,
        }
    }

    #[must_use]
    pub const fn deleted(id: Value) -> Self {
        Self {
            result: "successfully deleted",
            id,
        }
    }
}

impl IntoResponse for ResultBody {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use axum::http::StatusCode;
    use serde_json::json;
    use tracker_core::error::{NotFound, ValidationError, Verb};

    async fn body_of(response: Response) -> (StatusCode, Value) {
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    #[tokio::test]
    async fn error_without_id() {
        let error = ApiError(ValidationError::MissingId.into());
        let (status, body) = body_of(error.into_response()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"error": "missing _id"}));
    }

    #[tokio::test]
    async fn error_echoes_id() {
        let error = ApiError(
            NotFound::Issue {
                verb: Verb::Delete,
                id: json!("invalidId"),
            }
            .into(),
        );
        let (status, body) = body_of(error.into_response()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"error": "could not delete", "_id": "invalidId"}));
    }

    #[tokio::test]
    async fn result_payload() {
        let (status, body) = body_of(ResultBody::updated(json!("abc")).into_response()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"result": "successfully updated", "_id": "abc"}));
    }

    #[tokio::test]
    async fn numeric_id_keeps_its_type() {
        let error = ApiError(
            NotFound::Issue {
                verb: Verb::Update,
                id: json!(123),
            }
            .into(),
        );
        let (_, body) = body_of(error.into_response()).await;
        assert_eq!(body, json!({"error": "could not update", "_id": 123}));
    }
}
