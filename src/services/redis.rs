use redis::{aio::ConnectionManager, Client};
use tokio::sync::OnceCell;
use std::sync::Arc;
use crate::errors::Result;

/// Redis handle whose connection manager is opened on first use, so the
/// server can start (and tests can run) while Redis is still coming up.
#[derive(Clone)]
pub struct RedisService {
    client: Client,
    connection_manager: Arc<OnceCell<ConnectionManager>>,
}

impl RedisService {
    pub fn new(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url)?;

        Ok(Self {
            client,
            connection_manager: Arc::new(OnceCell::new()),
        })
    }

    pub async fn connection_manager(&self) -> Result<ConnectionManager> {
        let manager = self
            .connection_manager
            .get_or_try_init(|| ConnectionManager::new(self.client.clone()))
            .await?;

        Ok(manager.clone())
    }

    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.connection_manager().await?;
        redis::cmd("PING").query_async::<_, String>(&mut conn).await?;
        Ok(())
    }
}
