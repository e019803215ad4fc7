use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

pub const DEFAULT_PORT: u16 = 7051;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Directory holding the ledger journal. `None` keeps state in memory.
    pub data_dir: Option<PathBuf>,
    /// Run every contract's `InitLedger` when the ledger starts empty.
    pub seed_on_start: bool,
    /// `fsync` the journal after every block. Handlers run ledger work on
    /// the blocking pool, so a slow disk delays other writers but not the
    /// async runtime.
    pub sync_every_write: bool,
    /// Tie-breaker stamped into commit timestamps.
    pub node_id: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), DEFAULT_PORT),
            data_dir: None,
            seed_on_start: true,
            sync_every_write: false,
            node_id: 0,
        }
    }
}

impl ServerConfig {
    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> ServerResult<Self> {
        toml::from_str(s).map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn from_file(path: &Path) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }
}
