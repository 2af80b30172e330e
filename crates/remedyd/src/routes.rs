use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use remedy_core::error::RemedyError;
use remedy_core::types::{CleanupBody, ErrorBody, MessageBody, RemediationResult, ScaleRequest};
use serde_json::{Map, Value};

use crate::metrics_cleanup::MetricsCleaner;
use crate::observe::{observe_requests, RequestObserver};
use crate::remediation::Remediator;

const RESTART_ALIASES: &[&str] = &["component", "service", "service_name"];
const SCALE_ALIASES: &[&str] = &["service", "component"];

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) remediator: Arc<Remediator>,
    pub(crate) metrics: MetricsCleaner,
    pub(crate) observer: Arc<dyn RequestObserver>,
    pub(crate) default_replicas: i64,
}

pub(crate) fn router(state: AppState) -> Router {
    let observer = state.observer.clone();
    Router::new()
        .route("/health", get(health))
        .route("/restart-service", post(restart_service))
        .route("/scale-service", post(scale_service))
        .route("/cleanup-prometheus", post(cleanup_prometheus))
        .layer(middleware::from_fn_with_state(observer, observe_requests))
        .with_state(state)
}

async fn health() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

async fn restart_service(State(state): State<AppState>, body: Bytes) -> Response {
    const ROUTE: &str = "restart-service";
    let payload = match parse_payload(&body) {
        Ok(v) => v,
        Err(err) => return error_response(&state, ROUTE, err),
    };
    let Some(service) = first_service_name(&payload, RESTART_ALIASES) else {
        return error_response(
            &state,
            ROUTE,
            RemedyError::Validation("No service name in payload".to_string()),
        );
    };

    match state.remediator.restart_service(&service).await {
        Ok(result) => result_response(&state, ROUTE, result),
        Err(err) => {
            state.observer.on_error(ROUTE, &err.to_string());
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(MessageBody {
                    message: err.to_string(),
                }),
            )
                .into_response()
        }
    }
}

async fn scale_service(State(state): State<AppState>, body: Bytes) -> Response {
    const ROUTE: &str = "scale-service";
    let payload = match parse_payload(&body) {
        Ok(v) => v,
        Err(err) => return error_response(&state, ROUTE, err),
    };
    let Some(service) = first_service_name(&payload, SCALE_ALIASES) else {
        return error_response(
            &state,
            ROUTE,
            RemedyError::Validation("service field required".to_string()),
        );
    };
    let replicas = match parse_replicas(&payload, state.default_replicas) {
        Ok(v) => v,
        Err(err) => return error_response(&state, ROUTE, err),
    };

    let result = state
        .remediator
        .scale_service(&ScaleRequest { service, replicas })
        .await;
    result_response(&state, ROUTE, result)
}

async fn cleanup_prometheus(State(state): State<AppState>) -> Response {
    match state.metrics.delete_all_series().await {
        Ok(code) => {
            let status = StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_GATEWAY);
            (status, Json(CleanupBody { status: code })).into_response()
        }
        Err(err) => error_response(&state, "cleanup-prometheus", err),
    }
}

/// Malformed or non-object bodies become a `BadRequest` instead of a fault.
fn parse_payload(body: &[u8]) -> Result<Map<String, Value>, RemedyError> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(RemedyError::BadRequest(
            "payload must be a JSON object".to_string(),
        )),
        Err(err) => Err(RemedyError::BadRequest(err.to_string())),
    }
}

/// First alias, in the given order, holding a non-empty string.
fn first_service_name(payload: &Map<String, Value>, aliases: &[&str]) -> Option<String> {
    aliases
        .iter()
        .filter_map(|key| payload.get(*key).and_then(Value::as_str))
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

fn parse_replicas(payload: &Map<String, Value>, default: i64) -> Result<i64, RemedyError> {
    let invalid = || RemedyError::Validation("replicas must be an integer".to_string());
    match payload.get("replicas") {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                    .map(|f| f as i64)
            })
            .ok_or_else(invalid),
        Some(Value::String(s)) => s.trim().parse::<i64>().map_err(|_| invalid()),
        Some(_) => Err(invalid()),
    }
}

fn status_for(err: &RemedyError) -> StatusCode {
    match err {
        RemedyError::BadRequest(_) | RemedyError::Validation(_) => StatusCode::BAD_REQUEST,
        RemedyError::UpstreamRequestFailed(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(state: &AppState, route: &str, err: RemedyError) -> Response {
    let message = err.to_string();
    state.observer.on_error(route, &message);
    (status_for(&err), Json(ErrorBody { error: message })).into_response()
}

// "Service not found" shares the 500 with genuine runtime failures.
fn result_response(state: &AppState, route: &str, result: RemediationResult) -> Response {
    let status = if result.success {
        StatusCode::OK
    } else {
        state.observer.on_error(route, &result.message);
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (
        status,
        Json(MessageBody {
            message: result.message,
        }),
    )
        .into_response()
}
