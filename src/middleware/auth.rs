use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    database::queries::UserQueries,
    handlers::AppState,
    models::User,
};

/// The caller behind a valid bearer token, loaded fresh from the database.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub user: User,
}

fn reject(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(json!({ "error": message, "status": status.as_u16() })),
    )
        .into_response()
}

pub fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(parts) else {
            return Err(reject(StatusCode::UNAUTHORIZED, "Not authorized, no token"));
        };

        let user_id = state
            .jwt
            .verify_token(token)
            .and_then(|claims| claims.user_id())
            .map_err(|e| {
                tracing::debug!("Token verification failed: {}", e);
                reject(StatusCode::UNAUTHORIZED, "Not authorized, token failed")
            })?;

        // Tokens outlive deleted accounts, so the user must still exist.
        match UserQueries::find_by_id(state.database.pool(), user_id).await {
            Ok(Some(user)) => Ok(AuthenticatedUser { id: user.id, user }),
            Ok(None) => Err(reject(StatusCode::UNAUTHORIZED, "User not found")),
            Err(e) => {
                tracing::error!("Failed to load authenticated user: {}", e);
                Err(reject(StatusCode::INTERNAL_SERVER_ERROR, "Database error"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with(header_value: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/chat/history");
        if let Some(value) = header_value {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token_extraction() {
        assert_eq!(bearer_token(&parts_with(Some("Bearer abc.def"))), Some("abc.def"));
        assert_eq!(bearer_token(&parts_with(Some("Basic abc"))), None);
        assert_eq!(bearer_token(&parts_with(Some("Bearer "))), None);
        assert_eq!(bearer_token(&parts_with(None)), None);
    }
}
