use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;
use wsr_contract::Ledger;
use wsr_state::{FileStateConfig, FileWorldState, InMemoryWorldState, StateBackend, SyncMode};

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::{build_router, AppState};

/// WSR gateway server.
pub struct WsrServer {
    config: ServerConfig,
}

impl WsrServer {
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Open the world state the config points at and host the default
    /// contracts on it, seeding them if the ledger is empty and seeding is
    /// enabled.
    pub fn open_ledger(&self) -> ServerResult<Ledger> {
        let backend: Arc<dyn StateBackend> = match &self.config.data_dir {
            Some(dir) => {
                let sync_mode = if self.config.sync_every_write {
                    SyncMode::EveryWrite
                } else {
                    SyncMode::OsDefault
                };
                Arc::new(FileWorldState::open(
                    dir,
                    FileStateConfig {
                        node_id: self.config.node_id,
                        sync_mode,
                    },
                )?)
            }
            None => Arc::new(InMemoryWorldState::new(self.config.node_id)),
        };

        let ledger = Ledger::with_default_contracts(backend);
        if self.config.seed_on_start && ledger.height()? == 0 {
            ledger.init_ledger()?;
        }
        Ok(ledger)
    }

    /// Build the router over a freshly opened ledger (useful for testing).
    pub fn router(&self) -> ServerResult<axum::Router> {
        let ledger = self.open_ledger()?;
        Ok(build_router(AppState::new(Arc::new(ledger))))
    }

    /// Start serving requests until Ctrl-C.
    pub async fn serve(self) -> ServerResult<()> {
        let app = self.router()?;
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        info!(
            addr = %self.config.bind_addr,
            data_dir = ?self.config.data_dir,
            "WSR server listening"
        );
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown requested");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_construction() {
        let server = WsrServer::new(ServerConfig::default());
        assert_eq!(server.config().bind_addr, "127.0.0.1:7051".parse().unwrap());
    }

    #[test]
    fn in_memory_ledger_is_seeded() {
        let server = WsrServer::new(ServerConfig::default());
        let ledger = server.open_ledger().unwrap();
        assert_eq!(ledger.height().unwrap(), 3);
    }

    #[test]
    fn seeding_can_be_disabled() {
        let server = WsrServer::new(ServerConfig {
            seed_on_start: false,
            ..ServerConfig::default()
        });
        assert_eq!(server.open_ledger().unwrap().height().unwrap(), 0);
    }

    #[test]
    fn file_ledger_is_seeded_once() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            data_dir: Some(dir.path().to_path_buf()),
            ..ServerConfig::default()
        };
        let first = WsrServer::new(config.clone()).open_ledger().unwrap();
        assert_eq!(first.height().unwrap(), 3);
        drop(first);

        let second = WsrServer::new(config).open_ledger().unwrap();
        assert_eq!(second.height().unwrap(), 3);
    }
}
