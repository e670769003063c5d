use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, Json},
};

use crate::{
    auth::VerificationTokenService,
    database::queries::UserQueries,
    errors::Result,
    handlers::AppState,
    middleware::auth::AuthenticatedUser,
    models::ProfileResponse,
};

const INVALID_LINK_PAGE: &str =
    "<h1>Invalid Link</h1><p>This verification link is invalid or has already been used.</p>";
const SERVER_ERROR_PAGE: &str =
    "<h1>Server Error</h1><p>We could not verify your account right now. Please try the link again later.</p>";
const VERIFIED_PAGE: &str =
    "<h1>Success!</h1><p>Your Aura account is verified. You can now <a href=\"login.html\">Login</a>.</p>";

pub async fn profile(user: AuthenticatedUser) -> Result<Json<ProfileResponse>> {
    Ok(Json(ProfileResponse {
        id: user.id,
        email: user.user.email,
    }))
}

/// Target of the emailed link. Answers with HTML because a browser opens it,
/// including when the lookup itself fails.
pub async fn verify_email(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> (StatusCode, Html<&'static str>) {
    if !VerificationTokenService::is_well_formed(&token) {
        return (StatusCode::BAD_REQUEST, Html(INVALID_LINK_PAGE));
    }

    let token_hash = VerificationTokenService::hash_token(&token);
    match UserQueries::consume_verification_token(state.database.pool(), &token_hash).await {
        Ok(Some(user_id)) => {
            tracing::info!(%user_id, "email verified");
            (StatusCode::OK, Html(VERIFIED_PAGE))
        }
        Ok(None) => (StatusCode::BAD_REQUEST, Html(INVALID_LINK_PAGE)),
        Err(e) => {
            tracing::error!("Email verification failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, Html(SERVER_ERROR_PAGE))
        }
    }
}
