pub mod auth;
pub mod config;
pub mod database;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use axum::{
    http::{header, Method},
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub use handlers::AppState;

use crate::{
    handlers::{auth as auth_handlers, chat, health, journal, payments, user},
    middleware::{https_redirect_middleware, rate_limit_middleware},
};

pub fn create_app(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/signup", post(auth_handlers::signup))
        .route("/login", post(auth_handlers::login))
        .route("/status", get(auth_handlers::status));

    let user_routes = Router::new()
        .route("/profile", get(user::profile))
        .route("/verify/:token", get(user::verify_email));

    let chat_routes = Router::new()
        .route("/message", post(chat::send_message))
        .route("/history", get(chat::history).delete(chat::clear_history));

    let journal_routes = Router::new()
        .route("/", get(journal::list_entries).post(journal::create_entry))
        .route("/:id", put(journal::update_entry).delete(journal::delete_entry));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .nest("/api/auth", auth_routes)
        .nest("/api/user", user_routes)
        .nest("/api/chat", chat_routes)
        .nest("/api/journal", journal_routes)
        .route("/api/pay/subscribe", post(payments::subscribe))
        .route("/api/intasend-webhook", post(payments::webhook))
        .fallback(health::not_found)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            https_redirect_middleware,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
