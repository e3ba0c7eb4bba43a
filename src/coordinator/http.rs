//! HTTP API of a node
//!
//! Client-facing:
//! - `POST /put`, `GET /get/:key`
//! - `POST /gossip`, `POST /crash`, `POST /preference_list`
//! - `GET /health`, `GET /metrics`
//!
//! Peer-facing:
//! - `POST /internal/replicate`, `POST /internal/batch_replicate`
//! - `GET /internal/node_get/:key`

use crate::common::tracing_middleware::request_tracing_middleware;
use crate::common::Error;
use crate::coordinator::node::DynamoServer;
use crate::transport::messages::{
    BatchReplicateArgs, CrashArgs, DynamoResult, ErrorResponse, HealthResponse,
    PreferenceListArgs, PutArgs, SuccessResponse,
};
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

type ApiResult<T> = std::result::Result<T, Error>;

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.to_http_status();
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

pub fn create_router(node: Arc<DynamoServer>, max_body_bytes: usize) -> Router {
    Router::new()
        // Client-facing
        .route("/put", post(put))
        .route("/get/:key", get(get_key))
        .route("/gossip", post(gossip))
        .route("/crash", post(crash))
        .route("/preference_list", post(preference_list))
        // Peer-facing
        .route("/internal/replicate", post(replicate))
        .route("/internal/batch_replicate", post(batch_replicate))
        .route("/internal/node_get/:key", get(node_get))
        // Observability
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .layer(middleware::from_fn_with_state(
            node.clone(),
            request_tracing_middleware,
        ))
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(node)
}

async fn put(
    State(node): State<Arc<DynamoServer>>,
    Json(args): Json<PutArgs>,
) -> ApiResult<Json<SuccessResponse>> {
    let success = node.put(args).await?;
    Ok(Json(SuccessResponse { success }))
}

async fn get_key(
    State(node): State<Arc<DynamoServer>>,
    Path(key): Path<String>,
) -> ApiResult<Json<DynamoResult>> {
    let entries = node.get(&key).await?;
    Ok(Json(DynamoResult { entries }))
}

async fn replicate(
    State(node): State<Arc<DynamoServer>>,
    Json(args): Json<PutArgs>,
) -> ApiResult<Json<SuccessResponse>> {
    let success = node.replicate(args)?;
    Ok(Json(SuccessResponse { success }))
}

async fn batch_replicate(
    State(node): State<Arc<DynamoServer>>,
    Json(args): Json<BatchReplicateArgs>,
) -> ApiResult<Json<SuccessResponse>> {
    let success = node.batch_replicate(args)?;
    Ok(Json(SuccessResponse { success }))
}

async fn node_get(
    State(node): State<Arc<DynamoServer>>,
    Path(key): Path<String>,
) -> ApiResult<Json<DynamoResult>> {
    let entries = node.node_get(&key)?;
    Ok(Json(DynamoResult { entries }))
}

async fn gossip(State(node): State<Arc<DynamoServer>>) -> ApiResult<impl IntoResponse> {
    let report = node.gossip().await?;
    Ok(Json(json!({ "status": "ok", "report": report })))
}

async fn crash(
    State(node): State<Arc<DynamoServer>>,
    Json(args): Json<CrashArgs>,
) -> Json<SuccessResponse> {
    Json(SuccessResponse {
        success: node.crash(args.seconds),
    })
}

async fn preference_list(
    State(node): State<Arc<DynamoServer>>,
    Json(nodes): Json<PreferenceListArgs>,
) -> impl IntoResponse {
    let replicas = nodes.len();
    node.send_preference_list(nodes);
    Json(json!({ "status": "ok", "replicas": replicas }))
}

/// Process liveness; answers even inside a crash window
async fn health(State(node): State<Arc<DynamoServer>>) -> Json<HealthResponse> {
    let state = node.state();
    Json(HealthResponse {
        status: "ok".to_string(),
        node_id: node.node_id().to_string(),
        available: state.is_available(),
        state,
        keys: node.key_count(),
        pending_gossip: node.total_pending(),
        version: crate::VERSION.to_string(),
    })
}

async fn metrics(State(node): State<Arc<DynamoServer>>) -> impl IntoResponse {
    let available = u64::from(node.state().is_available());
    let body = node.metrics().to_prometheus(
        node.node_id(),
        &[
            ("dynamo_keys", node.key_count() as u64),
            ("dynamo_pending_gossip_keys", node.total_pending() as u64),
            ("dynamo_available", available),
        ],
    );
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
}
