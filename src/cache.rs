use crate::utils::{get_env_var_or, Connectable};
use async_trait::async_trait;
use mockall::mock;
use redis::Commands;

/// Cache key holding the current reference price.
pub const ETH_USD_PRICE_KEY: &str = "prices:ethusd";

/// Seconds a cached price stays valid. Expiry is passive; entries are
/// overwritten on refresh, never explicitly deleted.
pub const PRICE_TTL_SECONDS: usize = 30;

pub trait Cache: Connectable {
    fn get_text(&mut self, key: &str) -> Result<Option<String>, String>;
    fn set_text_ex(&mut self, key: &str, value: &str, ttl_seconds: usize) -> Result<(), String>;
}

mock! {
    pub Cache {}

    impl Cache for Cache {
        fn get_text(&mut self, key: &str) -> Result<Option<String>, String>;
        fn set_text_ex(&mut self, key: &str, value: &str, ttl_seconds: usize) -> Result<(), String>;
    }

    #[async_trait]
    impl Connectable for Cache {
        async fn is_connected(&self) -> bool;
        async fn connect(&mut self) -> Result<(), String>;
        async fn ping(&mut self) -> Result<(), String>;
    }
}

pub struct RedisCache {
    pub connection: Option<redis::Connection>,
}

impl Cache for RedisCache {
    fn get_text(&mut self, key: &str) -> Result<Option<String>, String> {
        let connection = match self.connection.as_mut() {
            Some(connection) => connection,
            None => return Err("Failed to get redis connection".to_string()),
        };
        connection
            .get::<_, Option<String>>(key)
            .map_err(|e| e.to_string())
    }

    fn set_text_ex(&mut self, key: &str, value: &str, ttl_seconds: usize) -> Result<(), String> {
        let connection = match self.connection.as_mut() {
            Some(connection) => connection,
            None => return Err("Failed to get redis connection".to_string()),
        };
        connection
            .set_ex::<_, _, ()>(key, value, ttl_seconds)
            .map_err(|e| e.to_string())
    }
}

#[async_trait]
impl Connectable for RedisCache {
    async fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    async fn ping(&mut self) -> Result<(), String> {
        let connection = match self.connection.as_mut() {
            Some(connection) => connection,
            None => return Err("Failed to get redis connection".to_string()),
        };
        match redis::cmd("PING").query::<String>(&mut *connection) {
            Ok(response) => {
                if response == "PONG" {
                    Ok(())
                } else {
                    Err("Ping returned unexpected result".to_string())
                }
            }
            Err(e) => Err(e.to_string()),
        }
    }

    async fn connect(&mut self) -> Result<(), String> {
        let redis_url = get_env_var_or("REDIS_URL", "redis://127.0.0.1:6379");
        let client = redis::Client::open(redis_url).map_err(|e| e.to_string())?;
        let connection = client.get_connection().map_err(|e| e.to_string())?;
        self.connection = Some(connection);
        self.ping().await
    }
}
