//! Routes for `/api/issues/:project`.

use crate::extract::RequestFields;
use crate::response::{ApiError, ResultBody};
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};
use tracker_core::error::{StoreError, ValidationError, Verb};
use tracker_core::model::{CastError, Issue};
use tracker_core::{IssueError, IssueService, RecordStore};

/// Route path of the issue resource.
pub const ISSUES_ROUTE: &str = "/api/issues/:project";

/// Shared handler state: one service, and so one store, per process.
pub struct AppState<S> {
    service: Arc<IssueService<S>>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
        }
    }
}

impl<S: RecordStore + 'static> AppState<S> {
    #[must_use]
    pub fn new(service: IssueService<S>) -> Self {
        Self {
            service: Arc::new(service),
        }
    }

    /// Run a blocking service call on the blocking pool.
    async fn run<T, F>(&self, verb: Verb, call: F) -> Result<T, IssueError>
    where
        T: Send + 'static,
        F: FnOnce(&IssueService<S>) -> Result<T, IssueError> + Send + 'static,
    {
        let service = Arc::clone(&self.service);
        tokio::task::spawn_blocking(move || call(&service))
            .await
            .map_err(|e| IssueError::Store {
                verb,
                id: None,
                source: StoreError::Task(e.to_string()),
            })?
    }
}

/// Build the application router around `service`.
pub fn router<S: RecordStore + 'static>(service: IssueService<S>) -> Router {
    Router::new()
        .route(
            ISSUES_ROUTE,
            get(list_issues::<S>)
                .post(create_issue::<S>)
                .put(update_issue::<S>)
                .delete(delete_issue::<S>),
        )
        .fallback(not_found)
        .layer(middleware::from_fn(trace_request))
        .with_state(AppState::new(service))
}

async fn list_issues<S: RecordStore + 'static>(
    State(state): State<AppState<S>>,
    Path(project): Path<String>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Json<Vec<Issue>>, ApiError> {
    let filters = match query {
        Ok(Query(pairs)) => pairs,
        Err(rejection) => {
            return Err(ApiError(
                ValidationError::Cast {
                    verb: Verb::List,
                    id: None,
                    source: CastError {
                        field: "query".to_string(),
                        expected: "query string",
                        value: rejection.body_text(),
                    },
                }
                .into(),
            ));
        }
    };

    let issues = state
        .run(Verb::List, move |service| service.list(&project, filters))
        .await?;
    Ok(Json(issues))
}

async fn create_issue<S: RecordStore + 'static>(
    State(state): State<AppState<S>>,
    Path(project): Path<String>,
    RequestFields(body): RequestFields,
) -> Result<Json<Issue>, ApiError> {
    let issue = state
        .run(Verb::Create, move |service| service.create(&project, &body))
        .await?;
    Ok(Json(issue))
}

// The project segment is not consulted: `_id` alone names the issue.
async fn update_issue<S: RecordStore + 'static>(
    State(state): State<AppState<S>>,
    RequestFields(body): RequestFields,
) -> Result<ResultBody, ApiError> {
    let id = state
        .run(Verb::Update, move |service| service.update(&body))
        .await?;
    Ok(ResultBody::updated(id))
}

async fn delete_issue<S: RecordStore + 'static>(
    State(state): State<AppState<S>>,
    RequestFields(body): RequestFields,
) -> Result<ResultBody, ApiError> {
    let id = state
        .run(Verb::Delete, move |service| service.delete(&body))
        .await?;
    Ok(ResultBody::deleted(id))
}

async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({"error": "not found"}))).into_response()
}

async fn trace_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let started = Instant::now();

    let response = next.run(request).await;

    let status = response.status().as_u16();
    if response.status().is_success() {
        debug!(%method, %path, status, elapsed = ?started.elapsed(), "request");
    } else {
        info!(%method, %path, status, elapsed = ?started.elapsed(), "request");
    }
    response
}
