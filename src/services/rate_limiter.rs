use std::time::{SystemTime, UNIX_EPOCH};

use crate::{
    errors::{AppError, Result},
    services::redis::RedisService,
};

// INCR and EXPIRE in one round trip so a counter never outlives its window.
const FIXED_WINDOW_SCRIPT: &str = r#"
    local current = redis.call('INCR', KEYS[1])
    if current == 1 then
        redis.call('EXPIRE', KEYS[1], ARGV[1])
    end
    local ttl = redis.call('TTL', KEYS[1])
    return {current, ttl}
"#;

#[derive(Clone)]
pub struct RateLimiter {
    redis: RedisService,
    max_requests: u32,
    window_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitResult {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_time: u64,
}

impl RateLimitResult {
    pub fn from_count(count: u64, limit: u32, ttl_secs: i64, now: u64) -> Self {
        Self {
            allowed: count <= limit as u64,
            limit,
            remaining: (limit as u64).saturating_sub(count) as u32,
            reset_time: now + ttl_secs.max(0) as u64,
        }
    }
}

impl RateLimiter {
    pub fn new(redis: RedisService, max_requests: u32, window_secs: u64) -> Self {
        Self {
            redis,
            max_requests,
            window_secs,
        }
    }

    pub async fn check(&self, client_key: &str) -> Result<RateLimitResult> {
        let key = format!("rate_limit:{}", client_key);
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| AppError::Internal(e.into()))?
            .as_secs();

        let mut conn = self.redis.connection_manager().await?;
        let (count, ttl): (u64, i64) = redis::Script::new(FIXED_WINDOW_SCRIPT)
            .key(&key)
            .arg(self.window_secs)
            .invoke_async(&mut conn)
            .await?;

        Ok(RateLimitResult::from_count(count, self.max_requests, ttl, now))
    }
}
