//! Request counting middleware
//!
//! Feeds the counters reported by `/metrics`.

use crate::state::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;

/// Count every request and the status class of its response
pub async fn metrics_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let path = request.uri().path().to_string();

    state.increment_requests();
    let response = next.run(request).await;

    let status = response.status();
    state.record_status(status.as_u16());
    tracing::debug!(
        %path,
        status = status.as_u16(),
        latency_us = start.elapsed().as_micros() as u64,
        "Request finished"
    );

    response
}
