use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Instant,
};

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use tracing::{debug, error, warn};

use crate::application::error::ErrorReport;

use super::SOURCE_HEADER;

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Per-request id, visible to handlers and to the response logger.
#[derive(Clone, Copy, Debug)]
pub struct RequestContext {
    pub request_id: u64,
}

pub async fn set_request_context(mut request: Request<Body>, next: Next) -> Response {
    let ctx = RequestContext {
        request_id: NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed),
    };
    request.extensions_mut().insert(ctx);

    let mut response = next.run(request).await;
    response.extensions_mut().insert(ctx);
    response
}

/// Log every gateway response. Successes go out at debug with the cache
/// source; failures carry the attached [`ErrorReport`] chain.
pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();
    let request_id = request
        .extensions()
        .get::<RequestContext>()
        .map_or(0, |ctx| ctx.request_id);

    let mut response = next.run(request).await;
    let status = response.status().as_u16();
    let elapsed_ms = started.elapsed().as_millis() as u64;

    if !(response.status().is_client_error() || response.status().is_server_error()) {
        let cache = response
            .headers()
            .get(&SOURCE_HEADER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("none");
        debug!(
            target = "smart_erp::http::response",
            request_id,
            method = %method,
            path = %path,
            status,
            cache,
            elapsed_ms,
            "request served"
        );
        return response;
    }

    // Upstream 4xx/5xx are relayed as-is and carry no report.
    let (source, chain) = response
        .extensions_mut()
        .remove::<ErrorReport>()
        .map_or(("upstream", Vec::new()), |report| {
            (report.source, report.messages)
        });
    let detail = chain.first().map_or("relayed from upstream", String::as_str);

    if response.status().is_server_error() {
        error!(
            target = "smart_erp::http::response",
            request_id,
            method = %method,
            path = %path,
            status,
            elapsed_ms,
            source,
            detail,
            chain = ?chain,
            "request failed"
        );
    } else {
        warn!(
            target = "smart_erp::http::response",
            request_id,
            method = %method,
            path = %path,
            status,
            elapsed_ms,
            source,
            detail,
            chain = ?chain,
            "request rejected"
        );
    }

    response
}
