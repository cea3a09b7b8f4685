use crate::error::ChainError;
use async_trait::async_trait;
use ethers::providers::{Http, Middleware, Provider, Ws};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, Filter, Log, TransactionRequest};
use futures::StreamExt;
use mockall::automock;
use tokio::sync::{mpsc, oneshot};

/// Buffered log deliveries per open subscription.
pub const SUBSCRIPTION_BUFFER: usize = 128;

/// The single shared connection to the remote JSON-RPC endpoint.
///
/// One handle is constructed at boot and injected into every component;
/// all reads and subscriptions multiplex over it concurrently. Closing of
/// the receiver returned by [`subscribe_logs`](ChainTransport::subscribe_logs)
/// is the subscription-error signal.
#[automock]
#[async_trait]
pub trait ChainTransport: Send + Sync {
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ChainError>;
    async fn block_number(&self) -> Result<u64, ChainError>;
    async fn get_logs(&self, filter: &Filter) -> Result<Vec<Log>, ChainError>;
    async fn subscribe_logs(&self, filter: &Filter) -> Result<mpsc::Receiver<Log>, ChainError>;
}

/// JSON-RPC transport over websocket or plain HTTP. HTTP endpoints cannot
/// push notifications, so subscribing over one fails and callers drop to
/// their polling path.
pub enum RpcTransport {
    Ws(Provider<Ws>),
    Http(Provider<Http>),
}

impl RpcTransport {
    pub async fn connect(url: &str) -> Result<RpcTransport, ChainError> {
        if url.starts_with("ws://") || url.starts_with("wss://") {
            let ws = Ws::connect(url)
                .await
                .map_err(|e| ChainError::Transport(e.to_string()))?;
            Ok(RpcTransport::Ws(Provider::new(ws)))
        } else {
            let provider = Provider::<Http>::try_from(url)
                .map_err(|e| ChainError::Transport(e.to_string()))?;
            Ok(RpcTransport::Http(provider))
        }
    }
}

fn call_request(to: Address, data: Bytes) -> TypedTransaction {
    TransactionRequest::new().to(to).data(data).into()
}

#[async_trait]
impl ChainTransport for RpcTransport {
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ChainError> {
        let tx = call_request(to, data);
        let result = match self {
            RpcTransport::Ws(provider) => provider.call(&tx, None).await,
            RpcTransport::Http(provider) => provider.call(&tx, None).await,
        };
        result.map_err(|e| ChainError::Transport(e.to_string()))
    }

    async fn block_number(&self) -> Result<u64, ChainError> {
        let result = match self {
            RpcTransport::Ws(provider) => provider.get_block_number().await,
            RpcTransport::Http(provider) => provider.get_block_number().await,
        };
        result
            .map(|n| n.as_u64())
            .map_err(|e| ChainError::Transport(e.to_string()))
    }

    async fn get_logs(&self, filter: &Filter) -> Result<Vec<Log>, ChainError> {
        let result = match self {
            RpcTransport::Ws(provider) => provider.get_logs(filter).await,
            RpcTransport::Http(provider) => provider.get_logs(filter).await,
        };
        result.map_err(|e| ChainError::Transport(e.to_string()))
    }

    async fn subscribe_logs(&self, filter: &Filter) -> Result<mpsc::Receiver<Log>, ChainError> {
        let provider = match self {
            RpcTransport::Ws(provider) => provider.clone(),
            RpcTransport::Http(_) => {
                return Err(ChainError::Transport(
                    "log subscriptions are not supported over http".to_string(),
                ))
            }
        };

        let filter = filter.clone();
        let (ready_tx, ready_rx) = oneshot::channel();
        let (log_tx, log_rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        tokio::spawn(async move {
            let mut stream = match provider.subscribe_logs(&filter).await {
                Ok(stream) => stream,
                Err(e) => {
                    let _ = ready_tx.send(Err(ChainError::Transport(e.to_string())));
                    return;
                }
            };
            if ready_tx.send(Ok(())).is_err() {
                return;
            }
            // The stream ending is the subscription-error signal; dropping
            // log_tx closes the receiver the watcher is blocked on.
            while let Some(log) = stream.next().await {
                if log_tx.send(log).await.is_err() {
                    return;
                }
            }
        });

        match ready_rx.await {
            Ok(Ok(())) => Ok(log_rx),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(ChainError::Transport(
                "subscription task exited before reporting readiness".to_string(),
            )),
        }
    }
}
