use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::{IpAddr, SocketAddr};

use crate::{errors::AppError, handlers::AppState};

/// Per-client fixed-window limit. A Redis outage lets traffic through.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if !state.config.rate_limit_enabled {
        return next.run(request).await;
    }

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    let client_ip = extract_client_ip(request.headers())
        .or(peer)
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let result = match state.rate_limiter.check(&format!("ip:{}", client_ip)).await {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!("Rate limiter unavailable, allowing request: {}", e);
            return next.run(request).await;
        }
    };

    if !result.allowed {
        tracing::info!(%client_ip, "rate limit exceeded");
        return AppError::RateLimit.into_response();
    }

    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert("X-RateLimit-Limit", HeaderValue::from(result.limit));
    headers.insert("X-RateLimit-Remaining", HeaderValue::from(result.remaining));
    headers.insert("X-RateLimit-Reset", HeaderValue::from(result.reset_time));
    response
}

pub fn extract_client_ip(headers: &HeaderMap) -> Option<IpAddr> {
    let ip_headers = [
        "CF-Connecting-IP",  // Cloudflare
        "X-Real-IP",         // Nginx
        "X-Forwarded-For",   // Standard proxy header
    ];

    for header_name in &ip_headers {
        if let Some(value) = headers.get(*header_name).and_then(|v| v.to_str().ok()) {
            // X-Forwarded-For can contain multiple IPs, take the first one
            let candidate = value.split(',').next().unwrap_or(value).trim();
            if let Ok(ip) = candidate.parse::<IpAddr>() {
                return Some(ip);
            }
        }
    }

    None
}
