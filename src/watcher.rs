use crate::error::ChainError;
use crate::interfaces::{ContractInterfaces, ContractKind};
use crate::sink::EventSink;
use crate::transport::ChainTransport;
use ethers::abi::{Log as DecodedLog, Token};
use ethers::types::{Address, Filter, Log, ValueOrArray, H256, U256};
use ethers::utils::to_checksum;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::sleep;
use tracing::{info, warn};

/// Sleep between polling cycles, whether or not new blocks were found.
pub const POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Shorter sleep after a failed head lookup or log query.
pub const HEAD_RETRY_INTERVAL: Duration = Duration::from_secs(5);

/// A decoded contract event, ready for a sink.
#[derive(Debug, Clone, PartialEq)]
pub enum ChainEvent {
    AuctionCreated {
        auction: Address,
        seller: Address,
        nft: Address,
        token_id: U256,
        end_time: U256,
        tx: Option<H256>,
    },
    BidPlaced {
        auction: Address,
        bidder: Address,
        currency: Address,
        amount: U256,
        usd_value: U256,
        tx: Option<H256>,
    },
    AuctionEnded {
        auction: Address,
        winner: Address,
        currency: Address,
        amount: U256,
        tx: Option<H256>,
    },
}

/// What a watcher is pointed at. The factory emits `AuctionCreated`;
/// auction instances share one subscription for `BidPlaced` and
/// `AuctionEnded`, disambiguated by the log's primary topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchTarget {
    Factory(Address),
    Auction(Address),
}

impl WatchTarget {
    pub fn address(&self) -> Address {
        match self {
            WatchTarget::Factory(address) => *address,
            WatchTarget::Auction(address) => *address,
        }
    }
}

/// Per-instance ingestion task. Opens a live subscription and, if setup
/// fails, drops to a bounded polling loop over block ranges. Shutdown is
/// observed at every suspension point.
pub struct EventWatcher {
    target: WatchTarget,
    transport: Arc<dyn ChainTransport>,
    interfaces: Arc<ContractInterfaces>,
    shutdown: watch::Receiver<bool>,
}

impl EventWatcher {
    pub fn new(
        target: WatchTarget,
        transport: Arc<dyn ChainTransport>,
        interfaces: Arc<ContractInterfaces>,
        shutdown: watch::Receiver<bool>,
    ) -> EventWatcher {
        EventWatcher {
            target,
            transport,
            interfaces,
            shutdown,
        }
    }

    /// The event signatures this watcher cares about.
    pub fn event_topics(&self) -> Result<Vec<H256>, ChainError> {
        match self.target {
            WatchTarget::Factory(_) => Ok(vec![self
                .interfaces
                .event_topic(ContractKind::Factory, "AuctionCreated")?]),
            WatchTarget::Auction(_) => Ok(vec![
                self.interfaces
                    .event_topic(ContractKind::Auction, "BidPlaced")?,
                self.interfaces
                    .event_topic(ContractKind::Auction, "AuctionEnded")?,
            ]),
        }
    }

    fn subscription_filter(&self, topics: &[H256]) -> Filter {
        let mut filter = Filter::new().address(self.target.address());
        filter.topics[0] = Some(ValueOrArray::Array(
            topics.iter().map(|topic| Some(*topic)).collect(),
        ));
        filter
    }

    fn range_filter(&self, topics: &[H256], from: u64, to: u64) -> Filter {
        self.subscription_filter(topics).from_block(from).to_block(to)
    }

    pub async fn run(mut self, mut sink: Box<dyn EventSink>) {
        let address = to_checksum(&self.target.address(), None);
        let topics = match self.event_topics() {
            Ok(topics) => topics,
            Err(e) => {
                warn!("watcher for {} cannot resolve event topics: {}", address, e);
                return;
            }
        };

        match self
            .transport
            .subscribe_logs(&self.subscription_filter(&topics))
            .await
        {
            Ok(deliveries) => {
                info!("watcher for {} entering live mode", address);
                self.run_live(deliveries, sink.as_mut()).await;
            }
            Err(e) => {
                warn!(
                    "subscription setup for {} failed ({}); entering polling mode",
                    address, e
                );
                self.run_polling(&topics, sink.as_mut()).await;
            }
        }
    }

    /// Live mode: block on the subscription, decode and forward each log.
    /// A closed delivery channel is the subscription-error signal and ends
    /// the task.
    async fn run_live(&mut self, mut deliveries: mpsc::Receiver<Log>, sink: &mut dyn EventSink) {
        let address = to_checksum(&self.target.address(), None);
        loop {
            tokio::select! {
                _ = self.shutdown.changed() => {
                    info!("watcher for {} shutting down", address);
                    return;
                }
                delivery = deliveries.recv() => match delivery {
                    Some(log) => self.handle_log(&log, sink).await,
                    None => {
                        warn!("subscription for {} closed; watcher exiting", address);
                        return;
                    }
                }
            }
        }
    }

    /// Polling mode: scan `(last_scanned, head]` each cycle and advance the
    /// cursor only when the query succeeded, so no range is ever skipped.
    /// Every transport await is raced against the shutdown signal; a
    /// stalled RPC call never delays cancellation.
    async fn run_polling(&mut self, topics: &[H256], sink: &mut dyn EventSink) {
        let address = to_checksum(&self.target.address(), None);
        let mut shutdown = self.shutdown.clone();
        let mut last_scanned: u64 = 0;
        loop {
            if *shutdown.borrow() {
                return;
            }
            let head = tokio::select! {
                _ = shutdown.changed() => return,
                result = self.transport.block_number() => match result {
                    Ok(head) => head,
                    Err(e) => {
                        warn!("head lookup for {} failed: {}", address, e);
                        if self.sleep_or_shutdown(HEAD_RETRY_INTERVAL).await {
                            return;
                        }
                        continue;
                    }
                }
            };
            if head > last_scanned {
                let polled = tokio::select! {
                    _ = shutdown.changed() => return,
                    result = self.poll_range(topics, last_scanned + 1, head, sink) => result,
                };
                match polled {
                    Ok(()) => last_scanned = head,
                    Err(e) => {
                        warn!("log query for {} failed: {}", address, e);
                        if self.sleep_or_shutdown(HEAD_RETRY_INTERVAL).await {
                            return;
                        }
                        continue;
                    }
                }
            }
            if self.sleep_or_shutdown(POLL_INTERVAL).await {
                return;
            }
        }
    }

    /// One log query covering the inclusive block range `[from, to]`.
    /// Individual undecodable logs are reported and skipped; only a failed
    /// query makes the whole range fail (and the cursor stand still).
    pub async fn poll_range(
        &self,
        topics: &[H256],
        from: u64,
        to: u64,
        sink: &mut dyn EventSink,
    ) -> Result<(), ChainError> {
        let logs = self
            .transport
            .get_logs(&self.range_filter(topics, from, to))
            .await?;
        for log in &logs {
            self.handle_log(log, sink).await;
        }
        Ok(())
    }

    async fn handle_log(&self, log: &Log, sink: &mut dyn EventSink) {
        match self.decode_log(log) {
            Ok(event) => {
                if let Err(e) = sink.deliver(&event).await {
                    warn!("event sink rejected delivery: {}", e);
                }
            }
            Err(e) => warn!(
                "undecodable log from {}: {}",
                to_checksum(&log.address, None),
                e
            ),
        }
    }

    /// Routes a received log to the right decode path by its primary topic.
    pub fn decode_log(&self, log: &Log) -> Result<ChainEvent, ChainError> {
        let topic0 = log
            .topics
            .first()
            .ok_or_else(|| ChainError::decode("log", "missing primary topic"))?;

        match self.target {
            WatchTarget::Factory(_) => {
                let created = self
                    .interfaces
                    .event_topic(ContractKind::Factory, "AuctionCreated")?;
                if *topic0 != created {
                    return Err(ChainError::decode("log", "unexpected primary topic"));
                }
                let decoded =
                    self.interfaces
                        .decode_event(ContractKind::Factory, "AuctionCreated", log)?;
                Ok(ChainEvent::AuctionCreated {
                    auction: param_address(&decoded, "auction")?,
                    seller: param_address(&decoded, "seller")?,
                    nft: param_address(&decoded, "nft")?,
                    token_id: param_uint(&decoded, "tokenId")?,
                    end_time: param_uint(&decoded, "endTime")?,
                    tx: log.transaction_hash,
                })
            }
            WatchTarget::Auction(auction) => {
                let bid = self
                    .interfaces
                    .event_topic(ContractKind::Auction, "BidPlaced")?;
                let ended = self
                    .interfaces
                    .event_topic(ContractKind::Auction, "AuctionEnded")?;
                if *topic0 == bid {
                    let decoded =
                        self.interfaces
                            .decode_event(ContractKind::Auction, "BidPlaced", log)?;
                    Ok(ChainEvent::BidPlaced {
                        auction,
                        bidder: param_address(&decoded, "bidder")?,
                        currency: param_address(&decoded, "currency")?,
                        amount: param_uint(&decoded, "amount")?,
                        usd_value: param_uint(&decoded, "usdValue")?,
                        tx: log.transaction_hash,
                    })
                } else if *topic0 == ended {
                    let decoded =
                        self.interfaces
                            .decode_event(ContractKind::Auction, "AuctionEnded", log)?;
                    Ok(ChainEvent::AuctionEnded {
                        auction,
                        winner: param_address(&decoded, "winner")?,
                        currency: param_address(&decoded, "currency")?,
                        amount: param_uint(&decoded, "amount")?,
                        tx: log.transaction_hash,
                    })
                } else {
                    Err(ChainError::decode("log", "unexpected primary topic"))
                }
            }
        }
    }

    /// Returns true when shutdown was signalled during the wait.
    async fn sleep_or_shutdown(&mut self, duration: Duration) -> bool {
        tokio::select! {
            _ = sleep(duration) => false,
            _ = self.shutdown.changed() => true,
        }
    }
}

fn param<'a>(decoded: &'a DecodedLog, name: &str) -> Result<&'a Token, ChainError> {
    decoded
        .params
        .iter()
        .find(|param| param.name == name)
        .map(|param| &param.value)
        .ok_or_else(|| ChainError::decode(name, "event parameter missing"))
}

fn param_address(decoded: &DecodedLog, name: &str) -> Result<Address, ChainError> {
    match param(decoded, name)? {
        Token::Address(value) => Ok(*value),
        other => Err(ChainError::decode(
            name,
            format!("expected address, got {:?}", other),
        )),
    }
}

fn param_uint(decoded: &DecodedLog, name: &str) -> Result<U256, ChainError> {
    match param(decoded, name)? {
        Token::Uint(value) => Ok(*value),
        other => Err(ChainError::decode(
            name,
            format!("expected uint, got {:?}", other),
        )),
    }
}
