use crate::error::ChainError;
use ethers::abi::{Abi, Event, Function, Log as DecodedLog, RawLog, Token};
use ethers::types::{Bytes, Log, H256};
use std::fs;
use std::path::Path;

/// The three contract interfaces the mirror speaks. Fixed and known in
/// advance, so call sites dispatch over this enum instead of carrying
/// free-form interface names around.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractKind {
    Aggregator,
    Factory,
    Auction,
}

impl ContractKind {
    fn label(&self) -> &'static str {
        match self {
            ContractKind::Aggregator => "aggregator",
            ContractKind::Factory => "factory",
            ContractKind::Auction => "auction",
        }
    }
}

/// Immutable name-to-signature mappings for every contract the process
/// talks to, loaded once at startup and shared read-only.
///
/// Unknown function or event names are rejected here, at the boundary,
/// with [`ChainError::UnknownSelector`].
pub struct ContractInterfaces {
    aggregator: Abi,
    factory: Abi,
    auction: Abi,
    factory_document: serde_json::Value,
    auction_document: serde_json::Value,
    erc20_document: serde_json::Value,
}

impl ContractInterfaces {
    /// Loads `aggregator.json`, `factory.json`, `auction.json` and
    /// `erc20.json` from `dir`. A missing or malformed document is a fatal
    /// startup error for the caller.
    pub fn load(dir: &Path) -> Result<ContractInterfaces, ChainError> {
        let read = |file: &str| -> Result<String, ChainError> {
            fs::read_to_string(dir.join(file))
                .map_err(|e| ChainError::decode(file, e.to_string()))
        };
        let parse_abi = |file: &str, text: &str| -> Result<Abi, ChainError> {
            serde_json::from_str::<Abi>(text).map_err(|e| ChainError::decode(file, e.to_string()))
        };
        let parse_document = |file: &str, text: &str| -> Result<serde_json::Value, ChainError> {
            serde_json::from_str::<serde_json::Value>(text)
                .map_err(|e| ChainError::decode(file, e.to_string()))
        };

        let aggregator_text = read("aggregator.json")?;
        let factory_text = read("factory.json")?;
        let auction_text = read("auction.json")?;
        let erc20_text = read("erc20.json")?;

        Ok(ContractInterfaces {
            aggregator: parse_abi("aggregator.json", &aggregator_text)?,
            factory: parse_abi("factory.json", &factory_text)?,
            auction: parse_abi("auction.json", &auction_text)?,
            factory_document: parse_document("factory.json", &factory_text)?,
            auction_document: parse_document("auction.json", &auction_text)?,
            erc20_document: parse_document("erc20.json", &erc20_text)?,
        })
    }

    fn abi(&self, kind: ContractKind) -> &Abi {
        match kind {
            ContractKind::Aggregator => &self.aggregator,
            ContractKind::Factory => &self.factory,
            ContractKind::Auction => &self.auction,
        }
    }

    fn function(&self, kind: ContractKind, name: &str) -> Result<&Function, ChainError> {
        self.abi(kind)
            .function(name)
            .map_err(|_| ChainError::UnknownSelector(format!("{}.{}", kind.label(), name)))
    }

    fn event(&self, kind: ContractKind, name: &str) -> Result<&Event, ChainError> {
        self.abi(kind)
            .event(name)
            .map_err(|_| ChainError::UnknownSelector(format!("{}.{}", kind.label(), name)))
    }

    /// ABI-encodes a call to `name` with `args`.
    pub fn encode_call(
        &self,
        kind: ContractKind,
        name: &str,
        args: &[Token],
    ) -> Result<Bytes, ChainError> {
        let function = self.function(kind, name)?;
        let data = function
            .encode_input(args)
            .map_err(|e| ChainError::decode(name, e.to_string()))?;
        Ok(Bytes::from(data))
    }

    /// Decodes the return payload of `name`, validating the byte layout.
    /// Truncated or malformed payloads fail instead of yielding defaults.
    pub fn decode_output(
        &self,
        kind: ContractKind,
        name: &str,
        data: &[u8],
    ) -> Result<Vec<Token>, ChainError> {
        let function = self.function(kind, name)?;
        if data.is_empty() && !function.outputs.is_empty() {
            return Err(ChainError::decode(name, "empty return payload"));
        }
        function
            .decode_output(data)
            .map_err(|e| ChainError::decode(name, e.to_string()))
    }

    /// Topic hash identifying logs emitted by the named event.
    pub fn event_topic(&self, kind: ContractKind, name: &str) -> Result<H256, ChainError> {
        Ok(self.event(kind, name)?.signature())
    }

    /// Decodes a received log against the named event signature, resolving
    /// indexed parameters from the topics and the rest from the data.
    pub fn decode_event(
        &self,
        kind: ContractKind,
        name: &str,
        log: &Log,
    ) -> Result<DecodedLog, ChainError> {
        let event = self.event(kind, name)?;
        let raw = RawLog {
            topics: log.topics.clone(),
            data: log.data.to_vec(),
        };
        event
            .parse_log(raw)
            .map_err(|e| ChainError::decode(name, e.to_string()))
    }

    pub fn factory_document(&self) -> &serde_json::Value {
        &self.factory_document
    }

    pub fn auction_document(&self) -> &serde_json::Value {
        &self.auction_document
    }

    pub fn erc20_document(&self) -> &serde_json::Value {
        &self.erc20_document
    }
}
