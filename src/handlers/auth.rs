use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use chrono::Utc;
use serde_json::json;

use crate::{
    auth::{PasswordService, VerificationTokenService},
    database::queries::UserQueries,
    errors::{AppError, Result},
    handlers::AppState,
    middleware::auth::AuthenticatedUser,
    models::{AuthResponse, LoginRequest, SignupRequest, StatusResponse, UserResponse},
    services::email_domain,
};

pub async fn signup(
    State(state): State<AppState>,
    Json(request): Json<SignupRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>)> {
    let username = request.username.trim();
    let email = request.email.trim().to_lowercase();

    if username.is_empty() || email.is_empty() || request.password.is_empty() {
        return Err(AppError::Validation("Please enter all fields".to_string()));
    }

    let domain = email_domain(&email)
        .ok_or_else(|| AppError::Validation("Invalid email format".to_string()))?;

    PasswordService::validate_password_strength(&request.password)?;

    if !state.email_domains.accepts_mail(&domain).await {
        return Err(AppError::Validation(
            "The provided email domain is invalid or cannot receive mail.".to_string(),
        ));
    }

    if UserQueries::exists_with_username_or_email(state.database.pool(), username, &email).await? {
        return Err(AppError::Validation("User already exists".to_string()));
    }

    let password_hash = PasswordService::hash_password_async(request.password).await?;
    let verification_token = VerificationTokenService::generate_token();

    let user = UserQueries::create_user(
        state.database.pool(),
        username,
        &email,
        &password_hash,
        &VerificationTokenService::hash_token(&verification_token),
    )
    .await?;

    tracing::info!(user_id = %user.id, "user registered");

    // The conversation is also created lazily on the first message.
    if let Err(e) = state.chat.start_conversation(user.id).await {
        tracing::warn!(user_id = %user.id, "Failed to create initial conversation: {}", e);
    }

    let link = VerificationTokenService::verification_link(
        &state.config.public_base_url,
        &verification_token,
    );
    if let Err(e) = state
        .mailer
        .send_verification(&user.email, &user.username, &link)
        .await
    {
        tracing::warn!(user_id = %user.id, "Failed to send verification email: {}", e);
    }

    let token = state.jwt.generate_token(user.id, &user.username)?;
    let response = AuthResponse {
        token,
        user: UserResponse::from(user),
    };

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Sign-up successful! Check your email to verify your account.",
            "data": response
        })),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<serde_json::Value>> {
    let email = request.email.trim().to_lowercase();
    if email.is_empty() || request.password.is_empty() {
        return Err(AppError::Validation("Please enter all fields".to_string()));
    }

    let user = UserQueries::find_by_email(state.database.pool(), &email)
        .await?
        .ok_or_else(|| AppError::Auth("Invalid credentials".to_string()))?;

    if !PasswordService::verify_password_async(request.password, user.password_hash.clone()).await? {
        return Err(AppError::Auth("Invalid credentials".to_string()));
    }

    if state.config.require_email_verification && !user.is_verified {
        return Err(AppError::Forbidden(
            "Please verify your email before logging in.".to_string(),
        ));
    }

    let token = state.jwt.generate_token(user.id, &user.username)?;
    let response = AuthResponse {
        token,
        user: UserResponse::from(user),
    };

    Ok(Json(json!({
        "message": "Login successful",
        "data": response
    })))
}

pub async fn status(user: AuthenticatedUser) -> Result<Json<StatusResponse>> {
    Ok(Json(StatusResponse {
        is_paid: user.user.has_active_subscription(Utc::now()),
        subscription_expiry: user.user.subscription_expiry,
    }))
}
