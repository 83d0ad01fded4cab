// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! HTTP adapter.
//!
//! Everything outside `/_statehost/` is converted into a `RequestDescriptor`
//! and handed to the processor. The reserved routes read atomics and the
//! metrics registry only, so they never wait behind queued requests.

use crate::api::HealthResponse;
use crate::errors::EngineError;
use crate::worker::ProcessorHandle;
use axum::{
    body::{Body, Bytes},
    extract::{DefaultBodyLimit, State},
    http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri},
    response::Response,
    routing::get,
    Json, Router,
};
use statehost_kernel::{Header, RequestDescriptor, ResponseDescriptor};
use tower_http::trace::TraceLayer;

pub const RESERVED_PREFIX: &str = "/_statehost/";

pub fn build_router(handle: ProcessorHandle, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/_statehost/health", get(health))
        .route("/_statehost/metrics", get(metrics_handler))
        .fallback(forward)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(handle)
}

async fn health(State(handle): State<ProcessorHandle>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        sequence: handle.committed_sequence(),
    })
}

async fn metrics_handler() -> String {
    crate::telemetry::get_metrics()
}

async fn forward(
    State(handle): State<ProcessorHandle>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, EngineError> {
    if uri.path().starts_with(RESERVED_PREFIX) {
        return Ok(into_response(ResponseDescriptor::not_found()));
    }

    let request = to_descriptor(&method, &uri, &headers, body);
    let response = handle.handle(request).await?;
    Ok(into_response(response))
}

/// Header names are lower-cased by `http`; the list is sorted so the
/// recorded request does not depend on client header order. Values outside
/// visible ASCII (obs-text) are decoded as lossy UTF-8.
pub fn to_descriptor(method: &Method, uri: &Uri, headers: &HeaderMap, body: Bytes) -> RequestDescriptor {
    let uri = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());

    let mut list: Vec<Header> = headers
        .iter()
        .map(|(name, value)| Header::new(name.as_str(), String::from_utf8_lossy(value.as_bytes())))
        .collect();
    list.sort();

    RequestDescriptor {
        method: method.as_str().to_string(),
        uri,
        headers: list,
        body: body.to_vec(),
    }
}

pub fn into_response(descriptor: ResponseDescriptor) -> Response {
    let status = StatusCode::from_u16(descriptor.status).unwrap_or_else(|_| {
        tracing::warn!("Program returned invalid status {}", descriptor.status);
        StatusCode::INTERNAL_SERVER_ERROR
    });

    let mut response = Response::new(Body::from(descriptor.body));
    *response.status_mut() = status;

    for header in descriptor.headers {
        match (
            HeaderName::from_bytes(header.name.as_bytes()),
            HeaderValue::from_str(&header.value),
        ) {
            (Ok(name), Ok(value)) => {
                response.headers_mut().append(name, value);
            }
            _ => tracing::warn!("Dropping invalid response header {:?}", header.name),
        }
    }
    response
}
