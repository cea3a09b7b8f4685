use auction_mirror_api::cache::{MockCache, ETH_USD_PRICE_KEY, PRICE_TTL_SECONDS};
use auction_mirror_api::database::MockDatabase;
use auction_mirror_api::dummy_data;
use auction_mirror_api::error::ChainError;
use auction_mirror_api::http::{router, AppState};
use auction_mirror_api::interfaces::ContractKind;
use auction_mirror_api::prices::{get_reference_price, PriceOracle};
use auction_mirror_api::reader::AuctionStateReader;
use auction_mirror_api::sink::MockEventSink;
use auction_mirror_api::supervisor::WatcherSupervisor;
use auction_mirror_api::transport::{ChainTransport, MockChainTransport};
use auction_mirror_api::watcher::{ChainEvent, EventWatcher, WatchTarget};
use ethers::types::{
    Address, BlockNumber, Bytes, Filter, FilterBlockOption, ValueOrArray, I256, U256,
};
use ethers::utils::keccak256;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

fn filter_range(filter: &Filter) -> Option<(u64, u64)> {
    match filter.block_option {
        FilterBlockOption::Range {
            from_block: Some(BlockNumber::Number(from)),
            to_block: Some(BlockNumber::Number(to)),
        } => Some((from.as_u64(), to.as_u64())),
        _ => None,
    }
}

fn filter_address(filter: &Filter) -> Option<Address> {
    match &filter.address {
        Some(ValueOrArray::Value(address)) => Some(*address),
        Some(ValueOrArray::Array(addresses)) => addresses.first().copied(),
        None => None,
    }
}

/// Transport whose head lookups never resolve. Subscriptions are refused
/// so any watcher pointed at it lands in polling mode.
struct StalledHeadTransport;

#[async_trait::async_trait]
impl ChainTransport for StalledHeadTransport {
    async fn call(&self, _to: Address, _data: Bytes) -> Result<Bytes, ChainError> {
        Err(ChainError::Transport("unexpected call".to_string()))
    }

    async fn block_number(&self) -> Result<u64, ChainError> {
        futures::future::pending().await
    }

    async fn get_logs(&self, _filter: &Filter) -> Result<Vec<ethers::types::Log>, ChainError> {
        Err(ChainError::Transport("unexpected query".to_string()))
    }

    async fn subscribe_logs(
        &self,
        _filter: &Filter,
    ) -> Result<tokio::sync::mpsc::Receiver<ethers::types::Log>, ChainError> {
        Err(ChainError::Transport(
            "subscriptions unavailable".to_string(),
        ))
    }
}

/// Transport answering every auction getter from a canned selector map.
fn snapshot_transport(
    overrides: HashMap<Vec<u8>, Result<Bytes, String>>,
) -> MockChainTransport {
    let interfaces = dummy_data::interfaces();
    let mut responses: HashMap<Vec<u8>, Result<Bytes, String>> = HashMap::new();
    let getters: [(&str, Bytes); 9] = [
        ("seller", dummy_data::encoded_address(dummy_data::seller_address())),
        ("nft", dummy_data::encoded_address(dummy_data::nft_address())),
        ("tokenId", dummy_data::encoded_uint(U256::from(7u64))),
        ("endTime", dummy_data::encoded_uint(U256::from(1_700_000_000u64))),
        ("highestBidder", dummy_data::encoded_address(Address::zero())),
        ("highestCurrency", dummy_data::encoded_address(Address::zero())),
        ("highestAmount", dummy_data::encoded_uint(U256::zero())),
        ("highestUsd", dummy_data::encoded_uint(U256::zero())),
        ("settled", dummy_data::encoded_bool(false)),
    ];
    for (name, payload) in getters {
        let data = interfaces
            .encode_call(ContractKind::Auction, name, &[])
            .unwrap();
        responses.insert(data.to_vec(), Ok(payload));
    }
    for (data, response) in overrides {
        responses.insert(data, response);
    }

    let mut transport = MockChainTransport::new();
    transport.expect_call().returning(move |_to, data| {
        match responses.get(&data.to_vec()) {
            Some(Ok(payload)) => Ok(payload.clone()),
            Some(Err(message)) => Err(ChainError::Transport(message.clone())),
            None => Err(ChainError::Transport("unexpected call".to_string())),
        }
    });
    transport
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codec_rejects_unknown_selector() {
        let interfaces = dummy_data::interfaces();
        let result = interfaces.encode_call(ContractKind::Auction, "selfDestruct", &[]);
        assert!(matches!(result, Err(ChainError::UnknownSelector(_))));

        let result = interfaces.event_topic(ContractKind::Factory, "AuctionPaused");
        assert!(matches!(result, Err(ChainError::UnknownSelector(_))));
    }

    #[test]
    fn codec_rejects_truncated_payload() {
        let interfaces = dummy_data::interfaces();
        let full = dummy_data::encoded_uint(U256::from(7u64));
        let truncated = &full[..16];
        let result = interfaces.decode_output(ContractKind::Auction, "tokenId", truncated);
        assert!(matches!(result, Err(ChainError::Decode { .. })));

        let result = interfaces.decode_output(ContractKind::Auction, "tokenId", &[]);
        assert!(matches!(result, Err(ChainError::Decode { .. })));
    }

    #[test]
    fn codec_encodes_expected_selector() {
        let interfaces = dummy_data::interfaces();
        let data = interfaces
            .encode_call(ContractKind::Auction, "seller", &[])
            .unwrap();
        assert_eq!(&data[..4], &keccak256("seller()")[..4]);
        assert_eq!(data.len(), 4);
    }

    #[tokio::test]
    async fn snapshot_read_returns_all_nine_fields() {
        let transport = snapshot_transport(HashMap::new());
        let reader = AuctionStateReader::new(
            Arc::new(transport),
            Arc::new(dummy_data::interfaces()),
        );

        let snapshot = reader
            .read_auction_state(dummy_data::auction_address())
            .await
            .unwrap();

        assert_eq!(snapshot.token_id, "7");
        assert_eq!(snapshot.end_time, 1_700_000_000);
        assert_eq!(
            snapshot.highest_bidder,
            "0x0000000000000000000000000000000000000000"
        );
        assert_eq!(snapshot.highest_amount, "0");
        assert_eq!(snapshot.highest_usd, "0");
        assert!(!snapshot.settled);

        let json = serde_json::to_value(&snapshot).unwrap();
        for key in [
            "seller",
            "nft",
            "tokenId",
            "endTime",
            "highestBidder",
            "highestCurrency",
            "highestAmount",
            "highestUsd",
            "settled",
        ] {
            assert!(json.get(key).is_some(), "missing field {}", key);
        }
    }

    #[tokio::test]
    async fn snapshot_read_is_atomic_on_single_field_failure() {
        let interfaces = dummy_data::interfaces();
        let settled_call = interfaces
            .encode_call(ContractKind::Auction, "settled", &[])
            .unwrap();
        let mut overrides = HashMap::new();
        overrides.insert(settled_call.to_vec(), Err("connection refused".to_string()));

        let transport = snapshot_transport(overrides);
        let reader = AuctionStateReader::new(Arc::new(transport), Arc::new(interfaces));

        let result = reader
            .read_auction_state(dummy_data::auction_address())
            .await;
        match result {
            Err(ChainError::Read { field, .. }) => assert_eq!(field, "settled"),
            other => panic!("expected a read error naming the field, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn snapshot_read_is_atomic_on_decode_failure() {
        let interfaces = dummy_data::interfaces();
        let token_id_call = interfaces
            .encode_call(ContractKind::Auction, "tokenId", &[])
            .unwrap();
        let mut overrides = HashMap::new();
        // Truncated return payload: must fail, never default to zero.
        overrides.insert(token_id_call.to_vec(), Ok(Bytes::from(vec![0u8; 16])));

        let transport = snapshot_transport(overrides);
        let reader = AuctionStateReader::new(Arc::new(transport), Arc::new(interfaces));

        let result = reader
            .read_auction_state(dummy_data::auction_address())
            .await;
        match result {
            Err(ChainError::Read { field, .. }) => assert_eq!(field, "tokenId"),
            other => panic!("expected a read error naming the field, got {:?}", other),
        }
    }

    fn price_transport() -> MockChainTransport {
        let interfaces = dummy_data::interfaces();
        let feed_lookup = interfaces
            .encode_call(ContractKind::Factory, "ethUsdFeed", &[])
            .unwrap()
            .to_vec();
        let round_lookup = interfaces
            .encode_call(ContractKind::Aggregator, "latestRoundData", &[])
            .unwrap()
            .to_vec();

        let mut transport = MockChainTransport::new();
        transport.expect_call().returning(move |to, data| {
            if data.to_vec() == feed_lookup {
                assert_eq!(to, dummy_data::factory_address());
                Ok(dummy_data::encoded_address(dummy_data::feed_address()))
            } else if data.to_vec() == round_lookup {
                assert_eq!(to, dummy_data::feed_address());
                Ok(dummy_data::encoded_latest_round(I256::from(
                    312_345_000_000i64,
                )))
            } else {
                Err(ChainError::Transport("unexpected call".to_string()))
            }
        });
        transport
    }

    fn connected_mock_cache() -> MockCache {
        let mut cache = MockCache::new();
        cache.expect_is_connected().return_const(true);
        cache.expect_ping().returning(|| Ok(()));
        cache
    }

    #[tokio::test]
    async fn price_miss_resolves_from_chain_and_writes_back() {
        let oracle = PriceOracle::new(
            Arc::new(price_transport()),
            Arc::new(dummy_data::interfaces()),
            dummy_data::factory_address(),
        );

        let mut cache = connected_mock_cache();
        cache
            .expect_get_text()
            .withf(|key| key == ETH_USD_PRICE_KEY)
            .times(1)
            .returning(|_| Ok(None));
        cache
            .expect_set_text_ex()
            .withf(|key, value, ttl| {
                key == ETH_USD_PRICE_KEY && value == "312345000000" && *ttl == PRICE_TTL_SECONDS
            })
            .times(1)
            .returning(|_, _, _| Ok(()));

        let cache_mutex = Mutex::new(cache);
        let price = get_reference_price(&oracle, &cache_mutex).await.unwrap();
        assert_eq!(price, "312345000000");
    }

    #[tokio::test]
    async fn price_hit_issues_no_chain_calls() {
        // A transport with no expectations panics if anything touches it.
        let oracle = PriceOracle::new(
            Arc::new(MockChainTransport::new()),
            Arc::new(dummy_data::interfaces()),
            dummy_data::factory_address(),
        );

        let mut cache = connected_mock_cache();
        cache
            .expect_get_text()
            .times(1)
            .returning(|_| Ok(Some("312345000000".to_string())));
        cache.expect_set_text_ex().times(0);

        let cache_mutex = Mutex::new(cache);
        let price = get_reference_price(&oracle, &cache_mutex).await.unwrap();
        assert_eq!(price, "312345000000");
    }

    #[tokio::test]
    async fn price_expired_entry_triggers_refresh() {
        let oracle = PriceOracle::new(
            Arc::new(price_transport()),
            Arc::new(dummy_data::interfaces()),
            dummy_data::factory_address(),
        );

        // Passive expiry: the store answers None once the TTL has elapsed.
        let mut cache = connected_mock_cache();
        cache.expect_get_text().times(1).returning(|_| Ok(None));
        cache
            .expect_set_text_ex()
            .times(1)
            .returning(|_, _, _| Ok(()));

        let cache_mutex = Mutex::new(cache);
        let price = get_reference_price(&oracle, &cache_mutex).await.unwrap();
        assert_eq!(price, "312345000000");
    }

    #[tokio::test]
    async fn price_cache_write_failure_is_not_fatal() {
        let oracle = PriceOracle::new(
            Arc::new(price_transport()),
            Arc::new(dummy_data::interfaces()),
            dummy_data::factory_address(),
        );

        let mut cache = connected_mock_cache();
        cache.expect_get_text().returning(|_| Ok(None));
        cache
            .expect_set_text_ex()
            .returning(|_, _, _| Err("redis is down".to_string()));

        let cache_mutex = Mutex::new(cache);
        let price = get_reference_price(&oracle, &cache_mutex).await.unwrap();
        assert_eq!(price, "312345000000");
    }

    fn new_watcher(target: WatchTarget, transport: MockChainTransport) -> EventWatcher {
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        // Sender dropped on purpose; decode/poll tests never wait on it.
        EventWatcher::new(
            target,
            Arc::new(transport),
            Arc::new(dummy_data::interfaces()),
            shutdown_rx,
        )
    }

    #[test]
    fn watcher_routes_auction_logs_by_primary_topic() {
        let interfaces = dummy_data::interfaces();
        let watcher = new_watcher(
            WatchTarget::Auction(dummy_data::auction_address()),
            MockChainTransport::new(),
        );

        let bid_log = dummy_data::new_log(dummy_data::LogOption::BidPlaced, &interfaces);
        match watcher.decode_log(&bid_log).unwrap() {
            ChainEvent::BidPlaced {
                auction,
                bidder,
                amount,
                ..
            } => {
                assert_eq!(auction, dummy_data::auction_address());
                assert_eq!(bidder, dummy_data::bidder_address());
                assert_eq!(amount, U256::from(500_000_000_000_000_000u64));
            }
            other => panic!("expected BidPlaced, got {:?}", other),
        }

        let ended_log = dummy_data::new_log(dummy_data::LogOption::AuctionEnded, &interfaces);
        match watcher.decode_log(&ended_log).unwrap() {
            ChainEvent::AuctionEnded { winner, .. } => {
                assert_eq!(winner, dummy_data::bidder_address());
            }
            other => panic!("expected AuctionEnded, got {:?}", other),
        }

        let foreign = dummy_data::new_log(dummy_data::LogOption::ForeignTopic, &interfaces);
        assert!(watcher.decode_log(&foreign).is_err());

        let missing = dummy_data::new_log(dummy_data::LogOption::MissingTopics, &interfaces);
        assert!(watcher.decode_log(&missing).is_err());
    }

    #[test]
    fn watcher_decodes_factory_creation_event() {
        let interfaces = dummy_data::interfaces();
        let watcher = new_watcher(
            WatchTarget::Factory(dummy_data::factory_address()),
            MockChainTransport::new(),
        );

        let log = dummy_data::new_log(dummy_data::LogOption::AuctionCreated, &interfaces);
        match watcher.decode_log(&log).unwrap() {
            ChainEvent::AuctionCreated {
                auction,
                seller,
                nft,
                token_id,
                end_time,
                ..
            } => {
                assert_eq!(auction, dummy_data::auction_address());
                assert_eq!(seller, dummy_data::seller_address());
                assert_eq!(nft, dummy_data::nft_address());
                assert_eq!(token_id, U256::from(7u64));
                assert_eq!(end_time, U256::from(1_700_000_000u64));
            }
            other => panic!("expected AuctionCreated, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn polling_issues_one_query_covering_the_gap() {
        let interfaces = dummy_data::interfaces();
        let bid_log = dummy_data::new_log(dummy_data::LogOption::BidPlaced, &interfaces);

        let mut transport = MockChainTransport::new();
        transport
            .expect_get_logs()
            .withf(|filter| {
                filter_range(filter) == Some((101, 105))
                    && filter_address(filter) == Some(dummy_data::auction_address())
            })
            .times(1)
            .returning(move |_| Ok(vec![bid_log.clone()]));

        let watcher = new_watcher(
            WatchTarget::Auction(dummy_data::auction_address()),
            transport,
        );
        let topics = watcher.event_topics().unwrap();

        let mut sink = MockEventSink::new();
        sink.expect_deliver()
            .withf(|event| matches!(event, ChainEvent::BidPlaced { .. }))
            .times(1)
            .returning(|_| Ok(()));

        watcher
            .poll_range(&topics, 101, 105, &mut sink)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn polling_query_error_propagates_without_delivery() {
        let mut transport = MockChainTransport::new();
        transport
            .expect_get_logs()
            .times(1)
            .returning(|_| Err(ChainError::Transport("timeout".to_string())));

        let watcher = new_watcher(
            WatchTarget::Auction(dummy_data::auction_address()),
            transport,
        );
        let topics = watcher.event_topics().unwrap();

        let mut sink = MockEventSink::new();
        sink.expect_deliver().times(0);

        let result = watcher.poll_range(&topics, 1, 10, &mut sink).await;
        assert!(matches!(result, Err(ChainError::Transport(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn polling_cursor_advances_only_past_successful_queries() {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut transport = MockChainTransport::new();
        transport.expect_subscribe_logs().returning(|_| {
            Err(ChainError::Transport(
                "subscriptions unavailable".to_string(),
            ))
        });
        let heads = std::sync::Mutex::new(vec![105u64, 110].into_iter());
        transport
            .expect_block_number()
            .returning(move || Ok(heads.lock().unwrap().next().unwrap_or(110)));
        let ranges: Arc<std::sync::Mutex<Vec<(u64, u64)>>> =
            Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen = ranges.clone();
        transport.expect_get_logs().returning(move |filter| {
            let mut seen = seen.lock().unwrap();
            seen.push(filter_range(filter).unwrap());
            // The second query fails; the cursor must stand still and the
            // same range must be retried.
            if seen.len() == 2 {
                Err(ChainError::Transport("timeout".to_string()))
            } else {
                Ok(Vec::new())
            }
        });

        let watcher = EventWatcher::new(
            WatchTarget::Auction(dummy_data::auction_address()),
            Arc::new(transport),
            Arc::new(dummy_data::interfaces()),
            shutdown_rx,
        );
        let mut sink = MockEventSink::new();
        sink.expect_deliver().times(0);
        let task = tokio::spawn(watcher.run(Box::new(sink)));

        for _ in 0..3000 {
            if ranges.lock().unwrap().len() >= 3 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        shutdown_tx.send(true).unwrap();
        task.await.unwrap();

        assert_eq!(
            *ranges.lock().unwrap(),
            vec![(1, 105), (106, 110), (106, 110)]
        );
    }

    #[tokio::test]
    async fn stop_interrupts_a_stalled_head_lookup() {
        let supervisor = WatcherSupervisor::new(
            Arc::new(StalledHeadTransport),
            Arc::new(dummy_data::interfaces()),
            dummy_data::factory_address(),
        );
        supervisor
            .spawn_auction(dummy_data::auction_address())
            .await;

        let stopped = tokio::time::timeout(
            std::time::Duration::from_secs(2),
            supervisor.stop(dummy_data::auction_address()),
        )
        .await
        .expect("stop did not return while the head lookup was pending");
        assert!(stopped);
    }

    fn connected_mock_database(addresses: Vec<String>) -> MockDatabase {
        let mut db = MockDatabase::new();
        db.expect_is_connected().return_const(true);
        db.expect_ping().returning(|| Ok(()));
        db.expect_auction_addresses()
            .returning(move || Ok(addresses.clone()));
        db
    }

    #[tokio::test]
    async fn supervisor_spawn_failure_is_isolated() {
        let interfaces = dummy_data::interfaces();
        let unlucky = dummy_data::bidder_address();
        let known = vec![
            format!("{:#x}", dummy_data::auction_address()),
            format!("{:#x}", unlucky),
            format!("{:#x}", dummy_data::nft_address()),
        ];

        let mut transport = MockChainTransport::new();
        transport.expect_subscribe_logs().returning(move |filter| {
            if filter_address(filter) == Some(unlucky) {
                return Err(ChainError::Transport("subscription refused".to_string()));
            }
            let (tx, rx) = tokio::sync::mpsc::channel(8);
            // Keep the subscription open for the lifetime of the test.
            std::mem::forget(tx);
            Ok(rx)
        });
        // The refused watcher drops to polling and looks up the head.
        transport.expect_block_number().returning(|| Ok(0));

        let supervisor = WatcherSupervisor::new(
            Arc::new(transport),
            Arc::new(interfaces),
            dummy_data::factory_address(),
        );
        let db_mutex = Mutex::new(connected_mock_database(known));
        supervisor.start(&db_mutex).await;

        let watched = supervisor.watched_addresses().await;
        assert_eq!(watched.len(), 4);
        assert!(watched.contains(&dummy_data::factory_address()));
        assert!(watched.contains(&dummy_data::auction_address()));
        assert!(watched.contains(&unlucky));
        assert!(watched.contains(&dummy_data::nft_address()));

        assert!(supervisor.stop(unlucky).await);
        assert!(!supervisor.stop(unlucky).await);

        supervisor.stop_all().await;
        assert!(supervisor.watched_addresses().await.is_empty());
    }

    #[tokio::test]
    async fn supervisor_watches_newly_discovered_auctions() {
        let interfaces = dummy_data::interfaces();
        let (factory_tx, factory_rx) = tokio::sync::mpsc::channel(8);
        let factory_rx = std::sync::Mutex::new(Some(factory_rx));

        let mut transport = MockChainTransport::new();
        let factory = dummy_data::factory_address();
        transport.expect_subscribe_logs().returning(move |filter| {
            if filter_address(filter) == Some(factory) {
                match factory_rx.lock().unwrap().take() {
                    Some(rx) => Ok(rx),
                    None => Err(ChainError::Transport("already subscribed".to_string())),
                }
            } else {
                let (tx, rx) = tokio::sync::mpsc::channel(8);
                std::mem::forget(tx);
                Ok(rx)
            }
        });

        let supervisor = WatcherSupervisor::new(
            Arc::new(transport),
            Arc::new(dummy_data::interfaces()),
            factory,
        );
        let db_mutex = Mutex::new(connected_mock_database(Vec::new()));
        supervisor.start(&db_mutex).await;
        assert_eq!(supervisor.watched_addresses().await.len(), 1);

        let created = dummy_data::new_log(dummy_data::LogOption::AuctionCreated, &interfaces);
        factory_tx.send(created).await.unwrap();

        let mut spawned = false;
        for _ in 0..100 {
            if supervisor
                .watched_addresses()
                .await
                .contains(&dummy_data::auction_address())
            {
                spawned = true;
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert!(spawned, "no watcher spawned for the discovered auction");

        supervisor.stop_all().await;
    }

    mod http_surface {
        use super::*;
        use auction_mirror_api::cache::RedisCache;
        use auction_mirror_api::database::PgStore;
        use axum::body::Body;
        use axum::http::{Request, StatusCode};
        use tower::ServiceExt;

        fn offline_state() -> Arc<AppState> {
            Arc::new(AppState {
                chain: None,
                interfaces: Arc::new(dummy_data::interfaces()),
                cache: Arc::new(Mutex::new(RedisCache { connection: None })),
                db: Arc::new(Mutex::new(PgStore { client: None })),
            })
        }

        #[tokio::test]
        async fn chain_endpoints_fail_without_configuration() {
            for uri in ["/api/prices", "/api/auctions/0xd2090025857B9C7B24387741f120538E928A3a59"] {
                let response = router(offline_state())
                    .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                    .await
                    .unwrap();
                assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
                let body = hyper::body::to_bytes(response.into_body()).await.unwrap();
                let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
                assert_eq!(json["error"], "chain not configured");
            }
        }

        #[tokio::test]
        async fn abi_documents_are_served() {
            for uri in ["/abi/factory", "/abi/auction", "/abi/erc20"] {
                let response = router(offline_state())
                    .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                    .await
                    .unwrap();
                assert_eq!(response.status(), StatusCode::OK);
                let body = hyper::body::to_bytes(response.into_body()).await.unwrap();
                let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
                assert!(json["abi"].is_array());
            }
        }

        #[tokio::test]
        async fn preflight_gets_cors_headers() {
            let response = router(offline_state())
                .oneshot(
                    Request::builder()
                        .method("OPTIONS")
                        .uri("/api/prices")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::NO_CONTENT);
            assert_eq!(
                response.headers()["Access-Control-Allow-Origin"],
                "*"
            );
        }

        #[tokio::test]
        async fn malformed_auction_address_is_rejected() {
            let state = Arc::new(AppState {
                chain: Some(auction_mirror_api::http::ChainContext {
                    reader: AuctionStateReader::new(
                        Arc::new(MockChainTransport::new()),
                        Arc::new(dummy_data::interfaces()),
                    ),
                    oracle: PriceOracle::new(
                        Arc::new(MockChainTransport::new()),
                        Arc::new(dummy_data::interfaces()),
                        dummy_data::factory_address(),
                    ),
                }),
                interfaces: Arc::new(dummy_data::interfaces()),
                cache: Arc::new(Mutex::new(RedisCache { connection: None })),
                db: Arc::new(Mutex::new(PgStore { client: None })),
            });
            let response = router(state)
                .oneshot(
                    Request::builder()
                        .uri("/api/auctions/not-an-address")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }
    }
}
