use crate::cache::{Cache, ETH_USD_PRICE_KEY, PRICE_TTL_SECONDS};
use crate::error::ChainError;
use crate::interfaces::{ContractInterfaces, ContractKind};
use crate::transport::ChainTransport;
use crate::utils::lock_connectable_mutex_safely;
use ethers::abi::Token;
use ethers::types::{Address, I256};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;

/// Resolves the reference price from the chain: one read against the
/// factory for the feed address, one read against the feed itself.
pub struct PriceOracle {
    transport: Arc<dyn ChainTransport>,
    interfaces: Arc<ContractInterfaces>,
    factory: Address,
}

impl PriceOracle {
    pub fn new(
        transport: Arc<dyn ChainTransport>,
        interfaces: Arc<ContractInterfaces>,
        factory: Address,
    ) -> PriceOracle {
        PriceOracle {
            transport,
            interfaces,
            factory,
        }
    }

    /// Latest ETH/USD answer from the aggregator behind the factory's
    /// `ethUsdFeed`. Round id and timestamps are observability metadata
    /// and are dropped here.
    pub async fn latest_answer(&self) -> Result<I256, ChainError> {
        let data = self
            .interfaces
            .encode_call(ContractKind::Factory, "ethUsdFeed", &[])?;
        let output = self.transport.call(self.factory, data).await?;
        let tokens = self
            .interfaces
            .decode_output(ContractKind::Factory, "ethUsdFeed", &output)?;
        let feed = match tokens.first() {
            Some(Token::Address(feed)) => *feed,
            _ => return Err(ChainError::decode("ethUsdFeed", "expected a feed address")),
        };

        let data = self
            .interfaces
            .encode_call(ContractKind::Aggregator, "latestRoundData", &[])?;
        let output = self.transport.call(feed, data).await?;
        let tokens =
            self.interfaces
                .decode_output(ContractKind::Aggregator, "latestRoundData", &output)?;
        match tokens.get(1) {
            Some(Token::Int(answer)) => Ok(I256::from_raw(*answer)),
            _ => Err(ChainError::decode(
                "latestRoundData",
                "expected an int256 answer",
            )),
        }
    }
}

/// Cache-aside read of the reference price, returned as a decimal string.
///
/// Cache trouble is never fatal here: an unreachable cache degrades to a
/// chain read, and a failed write-back is swallowed after logging. The
/// chain stays the source of truth. Concurrent misses may both refresh;
/// last write wins, which is fine for an idempotently derivable value
/// with a 30-second lifetime.
pub async fn get_reference_price(
    oracle: &PriceOracle,
    cache_mutex: &Mutex<impl Cache>,
) -> Result<String, ChainError> {
    let cached = match lock_connectable_mutex_safely(cache_mutex).await {
        Ok(mut cache) => match cache.get_text(ETH_USD_PRICE_KEY) {
            Ok(value) => value,
            Err(e) => {
                warn!("price cache read failed: {}", e);
                None
            }
        },
        Err(e) => {
            warn!("price cache unavailable: {}", e);
            None
        }
    };
    if let Some(text) = cached {
        // A cached entry that no longer parses is treated as a miss.
        match I256::from_dec_str(&text) {
            Ok(value) => return Ok(value.to_string()),
            Err(e) => warn!("discarding unparsable cached price {:?}: {}", text, e),
        }
    }

    let answer = oracle.latest_answer().await?;
    let text = answer.to_string();

    match lock_connectable_mutex_safely(cache_mutex).await {
        Ok(mut cache) => {
            if let Err(e) = cache.set_text_ex(ETH_USD_PRICE_KEY, &text, PRICE_TTL_SECONDS) {
                warn!("price cache write failed: {}", e);
            }
        }
        Err(e) => warn!("price cache unavailable for write-back: {}", e),
    }

    Ok(text)
}
