//! HTTP routes over a [`Storage`].
//!
//! Every response body is a JSON [`Resp`]. Successful calls carry `code: 0`
//! and the result in `data`; failures repeat the HTTP status in `code` and
//! omit `data`.

use axum::{
    Json, Router,
    extract::{
        Form, Query, State,
        rejection::{FormRejection, QueryRejection},
    },
    http::StatusCode,
    routing::{get, post},
};
use core::time::Duration;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tempmsg_core::{StorageError, storage::Storage};
use tower_http::cors::{Any, CorsLayer};

/// Shared by every request. Cloned per request, so the storage sits behind an
/// [`Arc`].
pub struct AppState<S> {
    storage: Arc<S>,
    share_ttl: Duration,
    request_timeout: Duration,
}

impl<S> AppState<S> {
    pub fn new(storage: Arc<S>, share_ttl: Duration, request_timeout: Duration) -> Self {
        Self {
            storage,
            share_ttl,
            request_timeout,
        }
    }
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            share_ttl: self.share_ttl,
            request_timeout: self.request_timeout,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Resp {
    pub code: u16,
    pub msg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

type Reply = (StatusCode, Json<Resp>);

fn success(data: String) -> Reply {
    (
        StatusCode::OK,
        Json(Resp {
            code: 0,
            msg: "success".to_string(),
            data: Some(data),
        }),
    )
}

fn failure(status: StatusCode, msg: &str) -> Reply {
    (
        status,
        Json(Resp {
            code: status.as_u16(),
            msg: msg.to_string(),
            data: None,
        }),
    )
}

#[derive(Debug, Deserialize)]
pub struct ShareForm {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
pub struct QueryParams {
    #[serde(default)]
    tid: String,
}

pub fn router<S>(state: AppState<S>) -> Router
where
    S: Storage + 'static,
{
    Router::new()
        .route("/share", post(share::<S>))
        .route("/query", get(query::<S>))
        .route("/health", get(health))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// `POST /share` with form field `content`.
async fn share<S: Storage>(
    State(state): State<AppState<S>>,
    form: Result<Form<ShareForm>, FormRejection>,
) -> Reply {
    let content = match form {
        Ok(Form(ShareForm { content })) if !content.is_empty() => content,
        _ => return failure(StatusCode::BAD_REQUEST, "require parameter content"),
    };

    let put = state.storage.put(&content, state.share_ttl);
    match tokio::time::timeout(state.request_timeout, put).await {
        Ok(Ok(key)) => success(key),
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Share failed");
            failure(StatusCode::INTERNAL_SERVER_ERROR, "fail")
        }
        Err(_) => {
            tracing::warn!(timeout = ?state.request_timeout, "Share timed out");
            failure(StatusCode::INTERNAL_SERVER_ERROR, "fail")
        }
    }
}

/// `GET /query?tid=<key>`.
async fn query<S: Storage>(
    State(state): State<AppState<S>>,
    params: Result<Query<QueryParams>, QueryRejection>,
) -> Reply {
    let tid = match params {
        Ok(Query(QueryParams { tid })) if !tid.is_empty() => tid,
        _ => return failure(StatusCode::BAD_REQUEST, "require parameter tid"),
    };

    match tokio::time::timeout(state.request_timeout, state.storage.get(&tid)).await {
        Ok(Ok(value)) => success(value),
        Ok(Err(StorageError::NotFound { .. })) => failure(StatusCode::NOT_FOUND, "not found"),
        Ok(Err(e)) => {
            tracing::error!(error = %e, %tid, "Query failed");
            failure(StatusCode::INTERNAL_SERVER_ERROR, "fail")
        }
        Err(_) => {
            tracing::warn!(timeout = ?state.request_timeout, %tid, "Query timed out");
            failure(StatusCode::INTERNAL_SERVER_ERROR, "fail")
        }
    }
}

async fn health() -> &'static str {
    "ok"
}
