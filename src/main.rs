use auction_mirror_api::cache::RedisCache;
use auction_mirror_api::config::Config;
use auction_mirror_api::database::PgStore;
use auction_mirror_api::http::{router, AppState, ChainContext};
use auction_mirror_api::interfaces::ContractInterfaces;
use auction_mirror_api::prices::PriceOracle;
use auction_mirror_api::reader::AuctionStateReader;
use auction_mirror_api::supervisor::WatcherSupervisor;
use auction_mirror_api::transport::{ChainTransport, RpcTransport};
use auction_mirror_api::utils::lock_connectable_mutex_safely;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let interfaces = match ContractInterfaces::load(Path::new("abi")) {
        Ok(interfaces) => Arc::new(interfaces),
        Err(e) => {
            error!("failed to load contract interfaces: {}", e);
            std::process::exit(1);
        }
    };

    let cache = Arc::new(Mutex::new(RedisCache { connection: None }));
    let db = Arc::new(Mutex::new(PgStore { client: None }));
    // Bring the store up front so the schema exists before the supervisor
    // enumerates persisted auctions. A down database is not fatal; the
    // connection is retried on first use.
    if let Err(e) = lock_connectable_mutex_safely(&db).await {
        warn!("auction store unavailable at boot: {}", e);
    }

    let transport: Option<Arc<dyn ChainTransport>> = match config.chain_settings() {
        Some((url, _)) => match RpcTransport::connect(url).await {
            Ok(transport) => Some(Arc::new(transport)),
            Err(e) => {
                warn!("chain transport unavailable: {}", e);
                None
            }
        },
        None => {
            warn!("RPC_URL/FACTORY_ADDRESS not set; chain-backed endpoints disabled");
            None
        }
    };

    let mut supervisor = None;
    let chain = match (&transport, config.factory_address) {
        (Some(transport), Some(factory)) => {
            let sup = WatcherSupervisor::new(transport.clone(), interfaces.clone(), factory);
            sup.start(&db).await;
            supervisor = Some(sup);
            Some(ChainContext {
                reader: AuctionStateReader::new(transport.clone(), interfaces.clone()),
                oracle: PriceOracle::new(transport.clone(), interfaces.clone(), factory),
            })
        }
        _ => None,
    };

    let state = Arc::new(AppState {
        chain,
        interfaces,
        cache,
        db,
    });
    let app = router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("listening on http://{}", addr);

    let server = axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        });
    if let Err(e) = server.await {
        error!("server error: {}", e);
    }

    if let Some(supervisor) = supervisor {
        supervisor.stop_all().await;
        info!("all watchers stopped");
    }
}
