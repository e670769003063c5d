use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::handlers::AppState;

/// Behind a TLS-terminating proxy, send plain-HTTP requests to the https origin.
pub async fn https_redirect_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if state.config.force_https {
        if let Some(target) = https_target(&request) {
            return Redirect::permanent(&target).into_response();
        }
    }

    next.run(request).await
}

fn https_target(request: &Request) -> Option<String> {
    let proto = request
        .headers()
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())?;

    if proto.eq_ignore_ascii_case("https") {
        return None;
    }

    let host = request
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())?;
    let path = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    Some(format!("https://{}{}", host, path))
}
