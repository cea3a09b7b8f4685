use crate::utils::{get_env_var_or, Connectable};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::mock;
use serde::{Deserialize, Serialize};
use tokio_postgres::NoTls;
use tracing::error;

/// A persisted auction instance, keyed uniquely by its contract address.
/// The HTTP layer owns writes; the supervisor reads the set once at boot
/// to decide which instances to watch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuctionRecord {
    pub auction_address: String,
    pub nft_address: String,
    pub token_id: i64,
    pub seller: String,
    pub end_time: i64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait Database: Connectable {
    async fn ensure_schema(&mut self) -> Result<(), String>;
    async fn list_auctions(&mut self) -> Result<Vec<AuctionRecord>, String>;
    async fn upsert_auction(&mut self, record: &AuctionRecord) -> Result<(), String>;
    async fn auction_addresses(&mut self) -> Result<Vec<String>, String>;
}

mock! {
    pub Database {}

    #[async_trait]
    impl Database for Database {
        async fn ensure_schema(&mut self) -> Result<(), String>;
        async fn list_auctions(&mut self) -> Result<Vec<AuctionRecord>, String>;
        async fn upsert_auction(&mut self, record: &AuctionRecord) -> Result<(), String>;
        async fn auction_addresses(&mut self) -> Result<Vec<String>, String>;
    }

    #[async_trait]
    impl Connectable for Database {
        async fn is_connected(&self) -> bool;
        async fn connect(&mut self) -> Result<(), String>;
        async fn ping(&mut self) -> Result<(), String>;
    }
}

pub struct PgStore {
    pub client: Option<tokio_postgres::Client>,
}

impl PgStore {
    fn client(&mut self) -> Result<&mut tokio_postgres::Client, String> {
        self.client
            .as_mut()
            .ok_or_else(|| "Failed to get postgres client".to_string())
    }
}

#[async_trait]
impl Database for PgStore {
    async fn ensure_schema(&mut self) -> Result<(), String> {
        let client = self.client()?;
        client
            .batch_execute(
                "
                CREATE TABLE IF NOT EXISTS auctions (
                    id BIGSERIAL PRIMARY KEY,
                    auction_address TEXT NOT NULL UNIQUE,
                    nft_address TEXT NOT NULL,
                    token_id BIGINT NOT NULL,
                    seller TEXT NOT NULL,
                    end_time BIGINT NOT NULL,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
                );
                CREATE INDEX IF NOT EXISTS auctions_nft_address_idx ON auctions (nft_address);
                CREATE INDEX IF NOT EXISTS auctions_seller_idx ON auctions (seller);
                ",
            )
            .await
            .map_err(|e| e.to_string())
    }

    async fn list_auctions(&mut self) -> Result<Vec<AuctionRecord>, String> {
        let client = self.client()?;
        let rows = client
            .query(
                "SELECT auction_address, nft_address, token_id, seller, end_time, created_at
                 FROM auctions ORDER BY id DESC",
                &[],
            )
            .await
            .map_err(|e| e.to_string())?;
        Ok(rows
            .iter()
            .map(|row| AuctionRecord {
                auction_address: row.get(0),
                nft_address: row.get(1),
                token_id: row.get(2),
                seller: row.get(3),
                end_time: row.get(4),
                created_at: Some(row.get(5)),
            })
            .collect())
    }

    async fn upsert_auction(&mut self, record: &AuctionRecord) -> Result<(), String> {
        let client = self.client()?;
        client
            .execute(
                "INSERT INTO auctions (auction_address, nft_address, token_id, seller, end_time)
                 VALUES ($1, $2, $3, $4, $5)
                 ON CONFLICT (auction_address) DO UPDATE SET
                     nft_address = EXCLUDED.nft_address,
                     token_id = EXCLUDED.token_id,
                     seller = EXCLUDED.seller,
                     end_time = EXCLUDED.end_time",
                &[
                    &record.auction_address,
                    &record.nft_address,
                    &record.token_id,
                    &record.seller,
                    &record.end_time,
                ],
            )
            .await
            .map_err(|e| e.to_string())?;
        Ok(())
    }

    async fn auction_addresses(&mut self) -> Result<Vec<String>, String> {
        let client = self.client()?;
        let rows = client
            .query("SELECT auction_address FROM auctions", &[])
            .await
            .map_err(|e| e.to_string())?;
        Ok(rows.iter().map(|row| row.get(0)).collect())
    }
}

#[async_trait]
impl Connectable for PgStore {
    async fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    async fn ping(&mut self) -> Result<(), String> {
        let client = self.client()?;
        client
            .query("SELECT 1", &[])
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }

    async fn connect(&mut self) -> Result<(), String> {
        let connect_string = get_env_var_or(
            "DATABASE_URL",
            "host=127.0.0.1 port=5432 user=postgres dbname=nft_auction",
        );
        let (client, connection) = tokio_postgres::connect(&connect_string, NoTls)
            .await
            .map_err(|e| e.to_string())?;

        // The connection object performs the actual communication with the
        // database, so spawn it off to run on its own.
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!("postgres connection error: {}", e);
            }
        });

        self.client = Some(client);
        self.ensure_schema().await
    }
}
