//! Service configuration
//!
//! Read from a JSON file, then overridden by environment variables:
//! `MTREE_PEER_ADDR`, `MTREE_LISTEN_ADDR`, `MTREE_SIGNING_KEY`, `MTREE_HASH`.

use crate::client::DEFAULT_TIMEOUT_SECS;
use crate::model::HashAlgorithm;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Added to the peer's listen port to get the publication port
pub const PUBLICATION_PORT_OFFSET: u16 = 1000;

/// Default peer listen address
pub const DEFAULT_PEER_ADDR: &str = "0.0.0.0:7051";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Listen address of the host peer; the publication port is derived
    /// from it unless `listen_address` is set
    pub peer_listen_address: String,
    /// Explicit publication service address
    pub listen_address: Option<String>,
    pub hash_algorithm: HashAlgorithm,
    /// Signing key file; the key store default is used when unset
    pub signing_key_path: Option<PathBuf>,
    /// Client request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            peer_listen_address: DEFAULT_PEER_ADDR.to_string(),
            listen_address: None,
            hash_algorithm: HashAlgorithm::default(),
            signing_key_path: None,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Load from a file path; a missing file yields defaults
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }

    /// Load from an optional file, then apply environment overrides
    pub fn from_env(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_env_with(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    fn apply_env_with(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(addr) = var("MTREE_PEER_ADDR") {
            self.peer_listen_address = addr;
        }
        if let Some(addr) = var("MTREE_LISTEN_ADDR") {
            self.listen_address = Some(addr);
        }
        if let Some(path) = var("MTREE_SIGNING_KEY") {
            self.signing_key_path = Some(PathBuf::from(path));
        }
        if let Some(alg) = var("MTREE_HASH") {
            self.hash_algorithm = alg.parse()?;
        }
        Ok(())
    }

    /// Save to a file path
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Address the publication service binds to
    ///
    /// Either `listen_address`, or all interfaces on the peer's port + 1000.
    pub fn publication_address(&self) -> Result<SocketAddr> {
        if let Some(addr) = &self.listen_address {
            return addr
                .parse()
                .map_err(|e| Error::Config(format!("Invalid listen address {}: {}", addr, e)));
        }

        let port = self
            .peer_listen_address
            .rsplit_once(':')
            .and_then(|(_, port)| port.parse::<u16>().ok())
            .ok_or_else(|| {
                Error::Config(format!(
                    "Invalid peer listen address: {}",
                    self.peer_listen_address
                ))
            })?;
        let port = port.checked_add(PUBLICATION_PORT_OFFSET).ok_or_else(|| {
            Error::Config(format!("Peer port {} leaves no room for the offset", port))
        })?;
        Ok(SocketAddr::from(([0, 0, 0, 0], port)))
    }
}
