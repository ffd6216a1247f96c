//! Per-client rate limiting for the read endpoints

use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header::HeaderName, HeaderMap, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::api::state::AppState;
use crate::api::types::ApiError;
use crate::infrastructure::rate_limit::{RateLimitPolicy, RateLimitResult};

/// Limits `GET /users`
pub async fn list_rate_limit(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let policy = state.rate_limits.list_policy();
    enforce(&state, "list", policy, request, next).await
}

/// Limits single user and summary reads
pub async fn read_rate_limit(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let policy = state.rate_limits.read_policy();
    enforce(&state, "read", policy, request, next).await
}

async fn enforce(
    state: &AppState,
    group: &str,
    policy: RateLimitPolicy,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !state.rate_limits.enabled {
        return next.run(request).await;
    }

    let client = client_key(&request, state.rate_limits.trust_forwarded_for);
    let key = format!("{}:{}", group, client);
    let result = state.rate_limiter.check_and_record(&key, &policy).await;

    if !result.allowed {
        warn!(
            client = %client,
            group = group,
            limit = result.limit,
            limit_type = ?result.limit_type,
            "Rate limit exceeded"
        );

        let window = result
            .limit_type
            .map(|t| t.to_string())
            .unwrap_or_else(|| "per_minute".to_string());

        let mut response = ApiError::rate_limited(
            format!(
                "Rate limit exceeded: {} requests {}. Retry in {} seconds.",
                result.limit,
                window.replace('_', " "),
                result.reset_in_seconds
            ),
            result.reset_in_seconds,
        )
        .with_code(window)
        .into_response();
        add_rate_limit_headers(response.headers_mut(), &result);
        return response;
    }

    let mut response = next.run(request).await;
    add_rate_limit_headers(response.headers_mut(), &result);
    response
}

fn add_rate_limit_headers(headers: &mut HeaderMap, result: &RateLimitResult) {
    headers.insert(
        HeaderName::from_static("x-ratelimit-limit"),
        HeaderValue::from(result.limit),
    );
    headers.insert(
        HeaderName::from_static("x-ratelimit-remaining"),
        HeaderValue::from(result.remaining),
    );
}

/// Client identity: the first `x-forwarded-for` hop when trusted, then the
/// socket address
fn client_key(request: &Request<Body>, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for {
        let forwarded = request
            .headers()
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());

        if let Some(client) = forwarded {
            return client.to_string();
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
