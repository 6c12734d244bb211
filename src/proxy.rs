use axum::body::Body;
use axum::extract::{Path, Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::config::CollectorConfig;
use crate::error::ApiError;
use crate::services::rate_limit::{self, RateLimitConfig};
use crate::state::AppState;
use crate::store::AuditRecord;

/// Forwards power-telemetry traffic to the external collector service.
///
/// Three console prefixes map onto the collector:
/// `/api/power/readings` -> `{base}/readings`, `/api/power/sse` ->
/// `{base}/sse`, `/api/export/{rest}` -> `{base}/export/{rest}`. The query
/// string and method are preserved, the internal secret header is injected,
/// and the upstream body streams back without buffering (SSE stays live).
pub struct TelemetryProxy {
    client: reqwest::Client,
    base_url: String,
    internal_secret: String,
}

impl TelemetryProxy {
    pub fn new(config: &CollectorConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            internal_secret: config.internal_secret.clone(),
        }
    }

    /// Forward one request to `{base}{upstream_path}` and stream the
    /// response back. Collector unreachable maps to a 502 envelope.
    pub async fn forward(&self, upstream_path: &str, request: Request) -> Result<Response, ApiError> {
        let url = upstream_url(&self.base_url, upstream_path, request.uri().query());

        let (parts, body) = request.into_parts();
        let method = reqwest::Method::from_bytes(parts.method.as_str().as_bytes())
            .map_err(|_| ApiError::bad_request("Unsupported method"))?;
        let body_bytes = axum::body::to_bytes(body, MAX_FORWARD_BODY)
            .await
            .map_err(|_| ApiError::bad_request("Request body too large"))?;

        let mut upstream = self
            .client
            .request(method, &url)
            .header("x-internal-secret", &self.internal_secret)
            .body(body_bytes);
        // Keep content negotiation and SSE resumption working upstream
        for name in ["accept", "content-type", "last-event-id"] {
            if let Some(value) = parts.headers.get(name) {
                upstream = upstream.header(name, value.clone());
            }
        }

        let response = upstream.send().await.map_err(|e| {
            tracing::error!(url = %url, error = %e, "telemetry collector unreachable");
            ApiError::bad_gateway("Telemetry collector unavailable")
        })?;

        let status = StatusCode::from_u16(response.status().as_u16())
            .unwrap_or(StatusCode::BAD_GATEWAY);
        let mut builder = Response::builder().status(status);
        for name in ["content-type", "cache-control", "content-disposition"] {
            if let Some(value) = response.headers().get(name) {
                builder = builder.header(name, value.clone());
            }
        }

        builder
            .body(Body::from_stream(response.bytes_stream()))
            .map_err(|e| {
                tracing::error!("failed to assemble proxied response: {}", e);
                ApiError::internal_error("An error occurred while processing your request")
            })
    }
}

const MAX_FORWARD_BODY: usize = 16 * 1024 * 1024;

fn upstream_url(base_url: &str, path: &str, query: Option<&str>) -> String {
    match query {
        Some(query) => format!("{}{}?{}", base_url, path, query),
        None => format!("{}{}", base_url, path),
    }
}

/// GET /api/power/readings
pub async fn readings(State(state): State<AppState>, request: Request) -> Response {
    forward_authenticated(state, "/readings".to_string(), request).await
}

/// GET /api/power/sse
pub async fn sse(State(state): State<AppState>, request: Request) -> Response {
    forward_authenticated(state, "/sse".to_string(), request).await
}

/// ANY /api/export/{rest} - rate-limited and recorded in the audit trail.
pub async fn export(
    State(state): State<AppState>,
    Path(rest): Path<String>,
    request: Request,
) -> Response {
    let session = match state.resolver.resolve(request.headers()).await {
        Ok(session) => session,
        Err(e) => {
            tracing::info!(error = %e, "unauthenticated export request");
            return ApiError::from(e).into_response();
        }
    };

    let identifier = rate_limit::client_identifier(request.headers());
    let outcome = state
        .rate_limiter
        .check(&identifier, RateLimitConfig::EXPORT)
        .await;
    if !outcome.allowed {
        tracing::warn!(client = %identifier, "export rate limit exceeded");
        return rate_limit::limited_response(&outcome);
    }

    let export_type = export_type(&rest);
    if let Err(e) = state
        .audit
        .record(AuditRecord::export_event(session.user_id, export_type, None))
        .await
    {
        // Audit failures never fail the export itself
        tracing::warn!("failed to record export audit entry: {}", e);
    }

    let upstream_path = format!("/export/{}", rest);
    match state.proxy.forward(&upstream_path, request).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

async fn forward_authenticated(state: AppState, upstream_path: String, request: Request) -> Response {
    if let Err(e) = state.resolver.resolve(request.headers()).await {
        tracing::info!(error = %e, "unauthenticated telemetry request");
        return ApiError::from(e).into_response();
    }
    match state.proxy.forward(&upstream_path, request).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

fn export_type(rest: &str) -> &str {
    let first = rest.split('/').next().unwrap_or(rest);
    if first.is_empty() {
        "bulk"
    } else {
        first
    }
}
