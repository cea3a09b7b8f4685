use crate::database::Database;
use crate::interfaces::ContractInterfaces;
use crate::sink::{EventSink, LogSink};
use crate::transport::ChainTransport;
use crate::utils::lock_connectable_mutex_safely;
use crate::watcher::{ChainEvent, EventWatcher, WatchTarget};
use async_trait::async_trait;
use ethers::types::Address;
use ethers::utils::to_checksum;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Buffered newly-discovered auction addresses awaiting a watcher.
const DISCOVERY_BUFFER: usize = 32;

struct WatcherHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Owns every watcher lifetime. One registry entry per watched address,
/// each holding its own cancellation handle; `stop`/`stop_all` release
/// subscription resources deterministically.
#[derive(Clone)]
pub struct WatcherSupervisor {
    transport: Arc<dyn ChainTransport>,
    interfaces: Arc<ContractInterfaces>,
    factory: Address,
    registry: Arc<Mutex<HashMap<Address, WatcherHandle>>>,
}

impl WatcherSupervisor {
    pub fn new(
        transport: Arc<dyn ChainTransport>,
        interfaces: Arc<ContractInterfaces>,
        factory: Address,
    ) -> WatcherSupervisor {
        WatcherSupervisor {
            transport,
            interfaces,
            factory,
            registry: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Boot sequence: one watcher for the factory, one per persisted
    /// auction address, plus a loop that spawns a watcher for every
    /// auction the factory reports from now on. Each spawn is independent;
    /// one instance failing to set up never blocks the others.
    pub async fn start<D: Database>(&self, db_mutex: &Mutex<D>) {
        let (discovered_tx, discovered_rx) = mpsc::channel(DISCOVERY_BUFFER);

        self.spawn(
            WatchTarget::Factory(self.factory),
            Box::new(DiscoverySink {
                inner: LogSink,
                discovered: discovered_tx,
            }),
        )
        .await;

        let addresses = match lock_connectable_mutex_safely(db_mutex).await {
            Ok(mut db) => match db.auction_addresses().await {
                Ok(addresses) => addresses,
                Err(e) => {
                    error!("cannot enumerate persisted auctions: {}", e);
                    Vec::new()
                }
            },
            Err(e) => {
                error!("auction store unavailable at boot: {}", e);
                Vec::new()
            }
        };
        for text in addresses {
            match Address::from_str(&text) {
                Ok(address) => self.spawn_auction(address).await,
                Err(_) => warn!("skipping persisted auction with malformed address {}", text),
            }
        }

        self.spawn_discovery_loop(discovered_rx);
    }

    pub async fn spawn_auction(&self, address: Address) {
        self.spawn(WatchTarget::Auction(address), Box::new(LogSink))
            .await;
    }

    async fn spawn(&self, target: WatchTarget, sink: Box<dyn EventSink>) {
        let mut registry = self.registry.lock().await;
        if registry.contains_key(&target.address()) {
            return;
        }
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let watcher = EventWatcher::new(
            target,
            self.transport.clone(),
            self.interfaces.clone(),
            shutdown_rx,
        );
        let task = tokio::spawn(watcher.run(sink));
        registry.insert(
            target.address(),
            WatcherHandle {
                shutdown: shutdown_tx,
                task,
            },
        );
    }

    fn spawn_discovery_loop(&self, mut discovered: mpsc::Receiver<Address>) {
        let supervisor = self.clone();
        tokio::spawn(async move {
            while let Some(address) = discovered.recv().await {
                info!(
                    "spawning watcher for newly created auction {}",
                    to_checksum(&address, None)
                );
                supervisor.spawn_auction(address).await;
            }
        });
    }

    /// Cancels the watcher for `address` and waits for its task to finish.
    /// Returns false if no such watcher was registered.
    pub async fn stop(&self, address: Address) -> bool {
        let handle = self.registry.lock().await.remove(&address);
        match handle {
            Some(handle) => {
                let _ = handle.shutdown.send(true);
                let _ = handle.task.await;
                true
            }
            None => false,
        }
    }

    /// Cancels every registered watcher and waits for all tasks to finish.
    pub async fn stop_all(&self) {
        let handles: Vec<WatcherHandle> = {
            let mut registry = self.registry.lock().await;
            registry.drain().map(|(_, handle)| handle).collect()
        };
        for handle in &handles {
            let _ = handle.shutdown.send(true);
        }
        for handle in handles {
            let _ = handle.task.await;
        }
    }

    pub async fn watched_addresses(&self) -> Vec<Address> {
        self.registry.lock().await.keys().copied().collect()
    }
}

/// Sink for the factory watcher: logs like any other sink, then feeds the
/// new auction address back to the supervisor's spawn loop.
struct DiscoverySink {
    inner: LogSink,
    discovered: mpsc::Sender<Address>,
}

#[async_trait]
impl EventSink for DiscoverySink {
    async fn deliver(&mut self, event: &ChainEvent) -> Result<(), String> {
        self.inner.deliver(event).await?;
        if let ChainEvent::AuctionCreated { auction, .. } = event {
            if self.discovered.send(*auction).await.is_err() {
                warn!("discovery channel closed; new auctions will not be watched");
            }
        }
        Ok(())
    }
}
