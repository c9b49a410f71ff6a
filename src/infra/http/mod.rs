//! HTTP surface of the gateway: a control endpoint plus a catch-all proxy.

mod middleware;

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Body,
    extract::{Request, State},
    http::{HeaderName, HeaderValue},
    middleware as axum_middleware,
    response::Response,
    routing::{get, post},
};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use serde::Serialize;

use crate::{
    application::error::AppError,
    gateway::{CacheGateway, ControlMessage, ControlOutcome, GatewayResponse, Served},
    infra::error::InfraError,
};

use self::middleware::{log_responses, set_request_context};

/// Response header naming where the gateway got the body from.
pub const SOURCE_HEADER: HeaderName = HeaderName::from_static("x-smart-erp-cache");

pub const CONTROL_PATH: &str = "/__gateway/message";
pub const STATUS_PATH: &str = "/__gateway/status";

/// Largest request body the proxy buffers before forwarding.
pub const DEFAULT_BODY_LIMIT: usize = 8 * 1024 * 1024;

#[derive(Clone)]
pub struct GatewayState {
    pub gateway: Arc<CacheGateway>,
    pub body_limit: usize,
}

impl GatewayState {
    pub fn new(gateway: Arc<CacheGateway>) -> Self {
        Self {
            gateway,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }
}

pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .route(CONTROL_PATH, post(control_message))
        .route(STATUS_PATH, get(status))
        .fallback(proxy)
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}

#[derive(Debug, Serialize)]
struct ControlReply {
    outcome: &'static str,
    state: &'static str,
    deleted: Vec<String>,
}

async fn control_message(
    State(state): State<GatewayState>,
    Json(message): Json<ControlMessage>,
) -> Result<Json<ControlReply>, AppError> {
    let outcome = state.gateway.handle_message(message).await?;
    let (outcome, deleted) = match outcome {
        ControlOutcome::Activated { deleted } => ("activated", deleted),
        ControlOutcome::AlreadyActive => ("already_active", Vec::new()),
        ControlOutcome::Cleared { deleted } => ("cleared", deleted),
    };
    Ok(Json(ControlReply {
        outcome,
        state: state.gateway.state().as_str(),
        deleted,
    }))
}

#[derive(Debug, Serialize)]
struct StatusReply {
    state: &'static str,
    refreshes_in_flight: usize,
}

async fn status(State(state): State<GatewayState>) -> Json<StatusReply> {
    Json(StatusReply {
        state: state.gateway.state().as_str(),
        refreshes_in_flight: state.gateway.refreshes_in_flight(),
    })
}

async fn proxy(State(state): State<GatewayState>, request: Request) -> Result<Response, AppError> {
    let (parts, body) = request.into_parts();
    let path_and_query = parts
        .uri
        .path_and_query()
        .map_or("/", |value| value.as_str());

    let mut gateway_request = state.gateway.request(parts.method.clone(), path_and_query);
    gateway_request.headers = parts.headers;
    gateway_request.body = Limited::new(body, state.body_limit)
        .collect()
        .await
        .map_err(|err| {
            if err.is::<LengthLimitError>() {
                AppError::PayloadTooLarge {
                    limit: state.body_limit,
                }
            } else {
                AppError::Infra(InfraError::upstream(format!("failed to read body: {err}")))
            }
        })?
        .to_bytes();

    let served = state.gateway.respond(&gateway_request).await?;
    Ok(into_response(served))
}

fn into_response(served: Served) -> Response {
    let Served { response, source } = served;
    let GatewayResponse {
        status,
        headers,
        body,
    } = response;

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
        .headers_mut()
        .insert(SOURCE_HEADER, HeaderValue::from_static(source.as_str()));
    response
}
