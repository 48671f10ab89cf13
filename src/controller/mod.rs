pub mod api;
mod error;
mod storage;

use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;

use tokio::runtime::Runtime;
use tokio::sync::mpsc::channel;
use tokio::sync::RwLock;
use tracing::instrument;

pub use api::ServerConfig;
pub use error::ControllerError;

use crate::config::CHANNEL_SIZE;
use crate::datastore::TodoDataStore;

use self::storage::{RequestResponse, StorageService};

type Shared<D> = Arc<RwLock<D>>;

/// Runs the storage service and the HTTP api, each on its own runtime.
pub struct TodoController {
    local_addr: SocketAddr,
    _storage_runtime: Runtime,
    _api_runtime: Runtime,
}

impl TodoController {
    /// Binds the listen address right away so address errors surface to the caller.
    #[instrument(skip(datastore, cfg))]
    pub fn start<D>(datastore: Shared<D>, cfg: ServerConfig) -> anyhow::Result<Self>
    where
        D: TodoDataStore + Send + Sync + 'static,
    {
        let (tx_storage, rx_storage) = channel::<RequestResponse>(CHANNEL_SIZE);
        let storage_service = StorageService::new(datastore, rx_storage);

        let listener = TcpListener::bind(cfg.addr)?;
        let local_addr = listener.local_addr()?;

        Ok(Self {
            local_addr,
            _storage_runtime: storage_service.build_runtime()?,
            _api_runtime: api::build_runtime(cfg, listener, tx_storage)?,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn stop(self) -> Result<(), ControllerError> {
        self._api_runtime.shutdown_background();
        self._storage_runtime
            .shutdown_timeout(std::time::Duration::from_millis(100));
        Ok(())
    }
}
