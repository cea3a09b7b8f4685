use crate::error::ChainError;
use crate::interfaces::{ContractInterfaces, ContractKind};
use crate::transport::ChainTransport;
use ethers::abi::Token;
use ethers::types::{Address, U256};
use ethers::utils::to_checksum;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Point-in-time view of one auction instance, assembled from nine
/// independent contract reads. Either every field populated or the whole
/// read failed; a half-filled snapshot is never produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionSnapshot {
    pub seller: String,
    pub nft: String,
    pub token_id: String,
    pub end_time: u64,
    pub highest_bidder: String,
    pub highest_currency: String,
    pub highest_amount: String,
    pub highest_usd: String,
    pub settled: bool,
}

pub struct AuctionStateReader {
    transport: Arc<dyn ChainTransport>,
    interfaces: Arc<ContractInterfaces>,
}

impl AuctionStateReader {
    pub fn new(
        transport: Arc<dyn ChainTransport>,
        interfaces: Arc<ContractInterfaces>,
    ) -> AuctionStateReader {
        AuctionStateReader {
            transport,
            interfaces,
        }
    }

    /// Reads a full snapshot of the auction at `auction`. The nine getter
    /// calls are issued concurrently; the first failure aborts the whole
    /// operation, wrapped with the field that broke.
    pub async fn read_auction_state(
        &self,
        auction: Address,
    ) -> Result<AuctionSnapshot, ChainError> {
        let (
            seller,
            nft,
            token_id,
            end_time,
            highest_bidder,
            highest_currency,
            highest_amount,
            highest_usd,
            settled,
        ) = tokio::try_join!(
            self.read_address(auction, "seller"),
            self.read_address(auction, "nft"),
            self.read_uint(auction, "tokenId"),
            self.read_uint(auction, "endTime"),
            self.read_address(auction, "highestBidder"),
            self.read_address(auction, "highestCurrency"),
            self.read_uint(auction, "highestAmount"),
            self.read_uint(auction, "highestUsd"),
            self.read_bool(auction, "settled"),
        )?;

        if end_time.bits() > 64 {
            return Err(ChainError::Read {
                field: "endTime",
                source: Box::new(ChainError::decode("endTime", "value exceeds u64 range")),
            });
        }

        Ok(AuctionSnapshot {
            seller: to_checksum(&seller, None),
            nft: to_checksum(&nft, None),
            token_id: token_id.to_string(),
            end_time: end_time.low_u64(),
            highest_bidder: to_checksum(&highest_bidder, None),
            highest_currency: to_checksum(&highest_currency, None),
            highest_amount: highest_amount.to_string(),
            highest_usd: highest_usd.to_string(),
            settled,
        })
    }

    async fn read_single_token(
        &self,
        auction: Address,
        field: &'static str,
    ) -> Result<Token, ChainError> {
        let data = self
            .interfaces
            .encode_call(ContractKind::Auction, field, &[])
            .map_err(ChainError::while_reading(field))?;
        let output = self
            .transport
            .call(auction, data)
            .await
            .map_err(ChainError::while_reading(field))?;
        let mut tokens = self
            .interfaces
            .decode_output(ContractKind::Auction, field, &output)
            .map_err(ChainError::while_reading(field))?;
        if tokens.len() != 1 {
            return Err(ChainError::Read {
                field,
                source: Box::new(ChainError::decode(field, "expected a single return value")),
            });
        }
        Ok(tokens.remove(0))
    }

    async fn read_address(
        &self,
        auction: Address,
        field: &'static str,
    ) -> Result<Address, ChainError> {
        match self.read_single_token(auction, field).await? {
            Token::Address(value) => Ok(value),
            other => Err(ChainError::Read {
                field,
                source: Box::new(ChainError::decode(
                    field,
                    format!("expected address, got {:?}", other),
                )),
            }),
        }
    }

    async fn read_uint(&self, auction: Address, field: &'static str) -> Result<U256, ChainError> {
        match self.read_single_token(auction, field).await? {
            Token::Uint(value) => Ok(value),
            other => Err(ChainError::Read {
                field,
                source: Box::new(ChainError::decode(
                    field,
                    format!("expected uint, got {:?}", other),
                )),
            }),
        }
    }

    async fn read_bool(&self, auction: Address, field: &'static str) -> Result<bool, ChainError> {
        match self.read_single_token(auction, field).await? {
            Token::Bool(value) => Ok(value),
            other => Err(ChainError::Read {
                field,
                source: Box::new(ChainError::decode(
                    field,
                    format!("expected bool, got {:?}", other),
                )),
            }),
        }
    }
}
