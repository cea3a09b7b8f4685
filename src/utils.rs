use async_trait::async_trait;
use mockall::{automock, predicate::*};
use std::env;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

pub fn get_env_var(name: &str) -> Result<String, String> {
    env::var(name).map_err(|_| format!("env var \"{}\" not set", name))
}

pub fn get_env_var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

/// A resource with a lazily established, reusable connection.
#[automock]
#[async_trait]
pub trait Connectable {
    async fn is_connected(&self) -> bool;
    async fn connect(&mut self) -> Result<(), String>;
    async fn ping(&mut self) -> Result<(), String>;
}

/// Locks the mutex and hands back a guard whose connection is known good,
/// reconnecting if the resource was never connected or stopped answering.
pub async fn lock_connectable_mutex_safely<T: Connectable>(
    mutex: &Mutex<T>,
) -> Result<MutexGuard<T>, String> {
    let mut mutex_guard = match mutex.try_lock() {
        Ok(mutex_guard) => mutex_guard,
        Err(_) => return Err("Failed to lock mutex".to_string()),
    };
    if !mutex_guard.is_connected().await {
        info!("Establishing new connection...");
        mutex_guard.connect().await?;
    } else if let Err(e) = mutex_guard.ping().await {
        warn!("Ping failed: {}. Attempting to reconnect...", e);
        mutex_guard.connect().await?;
    }

    Ok(mutex_guard)
}
