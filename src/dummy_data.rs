use crate::database::AuctionRecord;
use crate::interfaces::{ContractInterfaces, ContractKind};
use ethers::abi::Token;
use ethers::types::{Address, Bytes, Log, H256, I256, U256};
use std::path::Path;
use std::str::FromStr;

pub enum LogOption {
    AuctionCreated,
    BidPlaced,
    AuctionEnded,
    ForeignTopic,
    MissingTopics,
}

pub fn interfaces() -> ContractInterfaces {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("abi");
    ContractInterfaces::load(&dir).unwrap()
}

pub fn factory_address() -> Address {
    Address::from_str("0xFeebabE6b0418eC13b30aAdF129F5DcDd4f70CeA").unwrap()
}

pub fn auction_address() -> Address {
    Address::from_str("0xd2090025857B9C7B24387741f120538E928A3a59").unwrap()
}

pub fn seller_address() -> Address {
    Address::from_str("0x63FaC9201494f0bd17B9892B9fae4d52fe3BD377").unwrap()
}

pub fn bidder_address() -> Address {
    Address::from_str("0x66aB6D9362d4F35596279692F0251Db635165871").unwrap()
}

pub fn nft_address() -> Address {
    Address::from_str("0x33A4622B82D4c04a53e170c638B944ce27cffce3").unwrap()
}

pub fn feed_address() -> Address {
    Address::from_str("0x0E801D84Fa97b50751Dbf25036d067dCf18858bF").unwrap()
}

pub fn currency_address() -> Address {
    Address::zero()
}

pub fn new_auction_record() -> AuctionRecord {
    AuctionRecord {
        auction_address: format!("{:#x}", auction_address()),
        nft_address: format!("{:#x}", nft_address()),
        token_id: 7,
        seller: format!("{:#x}", seller_address()),
        end_time: 1_700_000_000,
        created_at: None,
    }
}

/// A raw log shaped like the given event, ready for a watcher to decode.
pub fn new_log(option: LogOption, interfaces: &ContractInterfaces) -> Log {
    match option {
        LogOption::AuctionCreated => {
            let topic = interfaces
                .event_topic(ContractKind::Factory, "AuctionCreated")
                .unwrap();
            Log {
                address: factory_address(),
                topics: vec![
                    topic,
                    address_topic(auction_address()),
                    address_topic(seller_address()),
                ],
                data: Bytes::from(ethers::abi::encode(&[
                    Token::Address(nft_address()),
                    Token::Uint(U256::from(7u64)),
                    Token::Uint(U256::from(1_700_000_000u64)),
                ])),
                ..Default::default()
            }
        }
        LogOption::BidPlaced => {
            let topic = interfaces
                .event_topic(ContractKind::Auction, "BidPlaced")
                .unwrap();
            Log {
                address: auction_address(),
                topics: vec![topic, address_topic(bidder_address())],
                data: Bytes::from(ethers::abi::encode(&[
                    Token::Address(currency_address()),
                    Token::Uint(U256::from(500_000_000_000_000_000u64)),
                    Token::Uint(U256::from(150_000_000_000u64)),
                ])),
                ..Default::default()
            }
        }
        LogOption::AuctionEnded => {
            let topic = interfaces
                .event_topic(ContractKind::Auction, "AuctionEnded")
                .unwrap();
            Log {
                address: auction_address(),
                topics: vec![topic],
                data: Bytes::from(ethers::abi::encode(&[
                    Token::Address(bidder_address()),
                    Token::Address(currency_address()),
                    Token::Uint(U256::from(500_000_000_000_000_000u64)),
                ])),
                ..Default::default()
            }
        }
        LogOption::ForeignTopic => Log {
            address: auction_address(),
            topics: vec![H256::repeat_byte(0xab)],
            data: Bytes::default(),
            ..Default::default()
        },
        LogOption::MissingTopics => Log {
            address: auction_address(),
            topics: Vec::new(),
            data: Bytes::default(),
            ..Default::default()
        },
    }
}

pub fn address_topic(address: Address) -> H256 {
    let mut topic = [0u8; 32];
    topic[12..].copy_from_slice(address.as_bytes());
    H256::from(topic)
}

pub fn encoded_address(address: Address) -> Bytes {
    Bytes::from(ethers::abi::encode(&[Token::Address(address)]))
}

pub fn encoded_uint(value: U256) -> Bytes {
    Bytes::from(ethers::abi::encode(&[Token::Uint(value)]))
}

pub fn encoded_bool(value: bool) -> Bytes {
    Bytes::from(ethers::abi::encode(&[Token::Bool(value)]))
}

/// An aggregator `latestRoundData` payload carrying the given answer.
pub fn encoded_latest_round(answer: I256) -> Bytes {
    Bytes::from(ethers::abi::encode(&[
        Token::Uint(U256::from(42u64)),
        Token::Int(answer.into_raw()),
        Token::Uint(U256::from(1_700_000_000u64)),
        Token::Uint(U256::from(1_700_000_000u64)),
        Token::Uint(U256::from(42u64)),
    ]))
}
