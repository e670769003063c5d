use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};

use crate::{
    errors::Result,
    handlers::AppState,
    middleware::auth::AuthenticatedUser,
    models::{ChatReply, HistoryResponse, SendMessageRequest},
};

pub async fn send_message(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<SendMessageRequest>,
) -> Result<Json<ChatReply>> {
    let reply = state.chat.send_message(user.id, &request.message).await?;
    Ok(Json(reply))
}

pub async fn history(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<HistoryResponse>> {
    let messages = state.chat.history(user.id).await?;
    Ok(Json(HistoryResponse { messages }))
}

pub async fn clear_history(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<StatusCode> {
    state.chat.clear_history(user.id).await?;
    tracing::info!(user_id = %user.id, "chat history cleared");
    Ok(StatusCode::NO_CONTENT)
}
