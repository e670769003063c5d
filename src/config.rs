use anyhow::{Context, Result};
use std::{env, time::Duration};

const DEFAULT_SYSTEM_INSTRUCTION: &str = "You are Aura, a warm and non-judgmental well-being \
companion. Offer reflective listening and gentle self-help suggestions. You are not a \
therapist or an emergency service; if the user mentions self-harm or harming others, \
urge them to contact the emergency lines listed in the app right away.";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub redis_url: String,
    pub jwt_secret: String,
    pub token_ttl_days: i64,
    /// Base URL this server is reachable on, used in emailed links.
    pub public_base_url: String,
    pub frontend_url: String,
    pub require_email_verification: bool,
    pub email_domain_check: bool,
    pub force_https: bool,
    pub rate_limit_enabled: bool,
    pub rate_limit_requests: u32,
    pub rate_limit_window: u64,
    pub generation: GenerationConfig,
    pub smtp: Option<SmtpConfig>,
    pub payments: PaymentConfig,
}

#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub api_key: String,
    pub api_base: String,
    pub model: String,
    pub timeout_secs: u64,
    pub system_instruction: String,
}

impl GenerationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct PaymentConfig {
    pub api_base: String,
    pub public_key: String,
    pub webhook_challenge: Option<String>,
    pub subscription_amount: u32,
    pub subscription_days: i64,
    pub currency: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Config {
            port: env::var("PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .context("PORT")?,
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgresql://localhost/aura".to_string()),
            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            jwt_secret: require_secret("JWT_SECRET", env::var("JWT_SECRET").ok())?,
            token_ttl_days: env::var("TOKEN_TTL_DAYS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .context("TOKEN_TTL_DAYS")?,
            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:5000".to_string())
                .trim_end_matches('/')
                .to_string(),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string())
                .trim_end_matches('/')
                .to_string(),
            require_email_verification: env_flag("REQUIRE_EMAIL_VERIFICATION", false)?,
            email_domain_check: env_flag("EMAIL_DOMAIN_CHECK", true)?,
            force_https: env_flag("FORCE_HTTPS", false)?,
            rate_limit_enabled: env_flag("RATE_LIMIT_ENABLED", true)?,
            rate_limit_requests: env::var("RATE_LIMIT_REQUESTS")
                .unwrap_or_else(|_| "100".to_string())
                .parse()
                .context("RATE_LIMIT_REQUESTS")?,
            rate_limit_window: env::var("RATE_LIMIT_WINDOW")
                .unwrap_or_else(|_| "900".to_string()) // 15 minutes
                .parse()
                .context("RATE_LIMIT_WINDOW")?,
            generation: GenerationConfig {
                api_key: env::var("GEMINI_API_KEY").unwrap_or_default(),
                api_base: env::var("GEMINI_API_BASE")
                    .unwrap_or_else(|_| {
                        "https://generativelanguage.googleapis.com".to_string()
                    })
                    .trim_end_matches('/')
                    .to_string(),
                model: env::var("GEMINI_MODEL")
                    .unwrap_or_else(|_| "gemini-2.5-flash".to_string()),
                timeout_secs: env::var("GENERATION_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .context("GENERATION_TIMEOUT_SECS")?,
                system_instruction: load_system_instruction()?,
            },
            smtp: match env::var("SMTP_HOST") {
                Ok(host) if !host.trim().is_empty() => Some(SmtpConfig {
                    host,
                    port: env::var("SMTP_PORT")
                        .unwrap_or_else(|_| "587".to_string())
                        .parse()
                        .context("SMTP_PORT")?,
                    username: env::var("SMTP_USERNAME").unwrap_or_default(),
                    password: env::var("SMTP_PASSWORD").unwrap_or_default(),
                    from: env::var("SMTP_FROM")
                        .unwrap_or_else(|_| "Aura <no-reply@localhost>".to_string()),
                }),
                _ => None,
            },
            payments: PaymentConfig {
                api_base: env::var("INTASEND_API_BASE")
                    .unwrap_or_else(|_| "https://payment.intasend.com".to_string())
                    .trim_end_matches('/')
                    .to_string(),
                public_key: env::var("INTASEND_PUBLIC_KEY").unwrap_or_default(),
                webhook_challenge: env::var("INTASEND_WEBHOOK_CHALLENGE")
                    .ok()
                    .filter(|c| !c.is_empty()),
                subscription_amount: env::var("SUBSCRIPTION_AMOUNT")
                    .unwrap_or_else(|_| "500".to_string())
                    .parse()
                    .context("SUBSCRIPTION_AMOUNT")?,
                subscription_days: env::var("SUBSCRIPTION_DAYS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .context("SUBSCRIPTION_DAYS")?,
                currency: env::var("SUBSCRIPTION_CURRENCY")
                    .unwrap_or_else(|_| "KES".to_string()),
            },
        })
    }
}

/// Signing keys have no default; a missing or blank value stops start-up.
fn require_secret(name: &str, value: Option<String>) -> Result<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .with_context(|| format!("{name} must be set"))
}

fn env_flag(name: &str, default: bool) -> Result<bool> {
    match env::var(name) {
        Ok(value) => parse_flag(&value).with_context(|| format!("{name} must be a boolean")),
        Err(_) => Ok(default),
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn load_system_instruction() -> Result<String> {
    if let Ok(path) = env::var("SYSTEM_INSTRUCTION_PATH") {
        return std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read system instruction from {path}"));
    }

    Ok(env::var("SYSTEM_INSTRUCTION")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_SYSTEM_INSTRUCTION.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("true"), Some(true));
        assert_eq!(parse_flag(" ON "), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn test_require_secret() {
        let missing = require_secret("JWT_SECRET", None).unwrap_err();
        assert!(missing.to_string().contains("JWT_SECRET must be set"));
        assert!(require_secret("JWT_SECRET", Some("   ".to_string())).is_err());
        assert_eq!(
            require_secret("JWT_SECRET", Some("k3y".to_string())).unwrap(),
            "k3y"
        );
    }

    #[test]
    fn test_from_env_requires_jwt_secret() {
        // Only this test touches JWT_SECRET in the unit-test binary.
        let saved = env::var("JWT_SECRET").ok();
        env::remove_var("JWT_SECRET");

        let result = Config::from_env();

        if let Some(value) = saved {
            env::set_var("JWT_SECRET", value);
        }
        let err = result.unwrap_err();
        assert!(format!("{err:#}").contains("JWT_SECRET"));
    }
}
