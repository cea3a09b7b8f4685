//! Mirrors on-chain auction state into a local store and serves it over
//! HTTP, keeping a cached view of the ETH/USD price feed fresh.

pub mod cache;
pub mod config;
pub mod database;
pub mod dummy_data;
pub mod error;
pub mod http;
pub mod interfaces;
pub mod prices;
pub mod reader;
pub mod sink;
pub mod supervisor;
pub mod transport;
pub mod utils;
pub mod watcher;
