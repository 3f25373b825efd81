//! YAML configuration of a ringlet node.
use std::fs;
use std::io;
use std::time::Duration;

use ringlet_core::consts::DEFAULT_CALL_TIMEOUT_MS;
use ringlet_core::consts::DEFAULT_MAX_LOOKUP_HOPS;
use ringlet_core::consts::DEFAULT_STABILIZE_INTERVAL;
use ringlet_core::consts::DEFAULT_SUCC_MAX;
use ringlet_core::dht::PeerRecord;
use ringlet_core::message::Metadata;
use ringlet_core::node::RingConfig;
use serde::Deserialize;
use serde::Serialize;

use crate::error::Error;
use crate::error::Result;
use crate::util::ensure_parent_dir;
use crate::util::expand_home;

pub const DEFAULT_CONFIG_PATH: &str = "~/.ringlet/config.yaml";
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 50000;
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";

/// Address of a peer as written in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PeerAddress {
    pub host: String,
    pub port: u16,
}

impl From<&PeerAddress> for PeerRecord {
    fn from(addr: &PeerAddress) -> Self {
        PeerRecord::new(addr.host.clone(), addr.port)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Host other peers use to reach this node. Part of the node identity.
    pub host: String,
    /// Port other peers use to reach this node. `0` picks a free port at startup.
    pub port: u16,
    /// Interface the HTTP listener binds to.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Peers tried when this node finds itself alone.
    #[serde(default)]
    pub well_known_peers: Vec<PeerAddress>,
    /// Stabilization cadence in seconds.
    #[serde(default = "default_stabilize_interval")]
    pub stabilize_interval: u64,
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,
    #[serde(default = "default_successor_list_len")]
    pub successor_list_len: u8,
    #[serde(default = "default_max_lookup_hops")]
    pub max_lookup_hops: usize,
    #[serde(default = "default_finger_table")]
    pub finger_table: bool,
    /// Opaque data served by the `metadata` operation.
    #[serde(default)]
    pub metadata: Metadata,
}

fn default_bind_address() -> String {
    DEFAULT_BIND_ADDRESS.to_string()
}

fn default_stabilize_interval() -> u64 {
    DEFAULT_STABILIZE_INTERVAL
}

fn default_call_timeout_ms() -> u64 {
    DEFAULT_CALL_TIMEOUT_MS
}

fn default_successor_list_len() -> u8 {
    DEFAULT_SUCC_MAX
}

fn default_max_lookup_hops() -> usize {
    DEFAULT_MAX_LOOKUP_HOPS
}

fn default_finger_table() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT)
    }
}

impl From<&Config> for RingConfig {
    fn from(config: &Config) -> Self {
        Self {
            stabilize_interval: Duration::from_secs(config.stabilize_interval),
            call_timeout: Duration::from_millis(config.call_timeout_ms),
            succ_max: config.successor_list_len,
            max_lookup_hops: config.max_lookup_hops,
            finger_table: config.finger_table,
        }
    }
}

impl Config {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            bind_address: default_bind_address(),
            well_known_peers: vec![],
            stabilize_interval: DEFAULT_STABILIZE_INTERVAL,
            call_timeout_ms: DEFAULT_CALL_TIMEOUT_MS,
            successor_list_len: DEFAULT_SUCC_MAX,
            max_lookup_hops: DEFAULT_MAX_LOOKUP_HOPS,
            finger_table: true,
            metadata: Metadata::new(),
        }
    }

    /// Reject values the ring cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.stabilize_interval == 0 {
            return Err(Error::InvalidConfig(
                "stabilize_interval must be at least 1 second".to_string(),
            ));
        }
        if self.call_timeout_ms == 0 {
            return Err(Error::InvalidConfig("call_timeout_ms must be positive".to_string()));
        }
        if self.successor_list_len == 0 {
            return Err(Error::InvalidConfig(
                "successor_list_len must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn well_known_peers(&self) -> Vec<PeerRecord> {
        self.well_known_peers.iter().map(PeerRecord::from).collect()
    }

    pub fn write_fs<P>(&self, path: P) -> Result<String>
    where P: AsRef<std::path::Path> {
        let path = expand_home(path)?;
        ensure_parent_dir(&path)?;
        let f =
            fs::File::create(path.as_path()).map_err(|e| Error::CreateFileError(e.to_string()))?;
        let f_writer = io::BufWriter::new(f);
        serde_yaml::to_writer(f_writer, self)?;
        Ok(path.to_string_lossy().to_string())
    }

    pub fn read_fs<P>(path: P) -> Result<Config>
    where P: AsRef<std::path::Path> {
        let path = expand_home(path)?;
        tracing::debug!("Read config from: {:?}", path);
        let f = fs::File::open(path).map_err(|e| Error::OpenFileError(e.to_string()))?;
        let f_rdr = io::BufReader::new(f);
        let config: Config = serde_yaml::from_reader(f_rdr)?;
        config.validate()?;
        Ok(config)
    }
}
