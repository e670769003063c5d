use crate::{
    auth::JwtService,
    config::Config,
    database::Database,
    services::{
        ChatService, EmailDomainValidator, GeminiClient, LogMailer, Mailer, PaymentService,
        PgConversationStore, RateLimiter, RedisService, SmtpMailer,
    },
};
use std::sync::Arc;

pub mod auth;
pub mod chat;
pub mod health;
pub mod journal;
pub mod payments;
pub mod user;

#[derive(Clone)]
pub struct AppState {
    pub database: Database,
    pub redis: RedisService,
    pub config: Arc<Config>,
    pub jwt: Arc<JwtService>,
    pub chat: Arc<ChatService>,
    pub mailer: Arc<dyn Mailer>,
    pub email_domains: Arc<EmailDomainValidator>,
    pub payments: Arc<PaymentService>,
    pub rate_limiter: RateLimiter,
}

impl AppState {
    /// Wires every service from configuration. Nothing here opens a network
    /// connection; Redis and the HTTP clients connect on first use.
    pub fn from_config(config: Config, database: Database) -> anyhow::Result<Self> {
        let redis = RedisService::new(&config.redis_url)?;
        let rate_limiter = RateLimiter::new(
            redis.clone(),
            config.rate_limit_requests,
            config.rate_limit_window,
        );

        if config.generation.api_key.is_empty() {
            tracing::warn!("GEMINI_API_KEY is not set; chat requests will fail upstream");
        }
        let generator = GeminiClient::new(&config.generation)?;
        let chat = ChatService::new(
            Arc::new(PgConversationStore::new(database.pool().clone())),
            Arc::new(generator),
            config.generation.system_instruction.clone(),
            config.generation.timeout(),
        );

        let mailer: Arc<dyn Mailer> = match &config.smtp {
            Some(smtp) => Arc::new(SmtpMailer::new(smtp)?),
            None => {
                tracing::warn!("SMTP_HOST is not set; verification links will be logged");
                Arc::new(LogMailer)
            }
        };

        let email_domains = EmailDomainValidator::new(config.email_domain_check)?;
        let payments = PaymentService::new(config.payments.clone(), config.frontend_url.clone())?;
        let jwt = JwtService::new(&config.jwt_secret, config.token_ttl_days);

        Ok(Self {
            database,
            redis,
            jwt: Arc::new(jwt),
            chat: Arc::new(chat),
            mailer,
            email_domains: Arc::new(email_domains),
            payments: Arc::new(payments),
            rate_limiter,
            config: Arc::new(config),
        })
    }
}
