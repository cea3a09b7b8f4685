use crate::watcher::ChainEvent;
use async_trait::async_trait;
use ethers::utils::to_checksum;
use mockall::automock;
use tracing::info;

/// Receives decoded events from a watcher. The default sink just emits
/// structured log lines; a message queue or the persistence layer could
/// stand here instead.
#[automock]
#[async_trait]
pub trait EventSink: Send {
    async fn deliver(&mut self, event: &ChainEvent) -> Result<(), String>;
}

pub struct LogSink;

#[async_trait]
impl EventSink for LogSink {
    async fn deliver(&mut self, event: &ChainEvent) -> Result<(), String> {
        match event {
            ChainEvent::AuctionCreated {
                auction,
                seller,
                token_id,
                tx,
                ..
            } => info!(
                "AuctionCreated auction={} seller={} tokenId={} tx={:?}",
                to_checksum(auction, None),
                to_checksum(seller, None),
                token_id,
                tx
            ),
            ChainEvent::BidPlaced {
                auction,
                bidder,
                amount,
                tx,
                ..
            } => info!(
                "BidPlaced auction={} bidder={} amount={} tx={:?}",
                to_checksum(auction, None),
                to_checksum(bidder, None),
                amount,
                tx
            ),
            ChainEvent::AuctionEnded {
                auction,
                winner,
                amount,
                tx,
                ..
            } => info!(
                "AuctionEnded auction={} winner={} amount={} tx={:?}",
                to_checksum(auction, None),
                to_checksum(winner, None),
                amount,
                tx
            ),
        }
        Ok(())
    }
}
