//! Construction of a [Node].
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashSet;
use tokio_util::sync::CancellationToken;

use super::Node;
use crate::consts::DEFAULT_CALL_TIMEOUT_MS;
use crate::consts::DEFAULT_MAX_LOOKUP_HOPS;
use crate::consts::DEFAULT_STABILIZE_INTERVAL;
use crate::consts::DEFAULT_SUCC_MAX;
use crate::consts::LOOKUP_RETRY_FACTOR;
use crate::dht::PeerRecord;
use crate::dht::PeerRing;
use crate::gateway::FailureDetector;
use crate::gateway::SharedGateway;
use crate::message::ActionHandler;
use crate::message::HandlerRegistry;
use crate::message::Metadata;

/// Tunables of the ring protocol.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RingConfig {
    /// Cadence of stabilization rounds.
    pub stabilize_interval: Duration,
    /// Bound of one remote call.
    pub call_timeout: Duration,
    /// Length of the successor list.
    pub succ_max: u8,
    /// Bound of one lookup walk.
    pub max_lookup_hops: usize,
    /// Maintain a finger table to shorten lookups.
    pub finger_table: bool,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            stabilize_interval: Duration::from_secs(DEFAULT_STABILIZE_INTERVAL),
            call_timeout: Duration::from_millis(DEFAULT_CALL_TIMEOUT_MS),
            succ_max: DEFAULT_SUCC_MAX,
            max_lookup_hops: DEFAULT_MAX_LOOKUP_HOPS,
            finger_table: true,
        }
    }
}

impl RingConfig {
    /// Bound of a whole lookup: every hop may time out, and the walk may run twice.
    pub fn lookup_timeout(&self) -> Duration {
        self.call_timeout * (self.max_lookup_hops as u32).max(1) * LOOKUP_RETRY_FACTOR
    }
}

/// Creates a [Node] listening on `host:port`.
pub struct NodeBuilder {
    peer: PeerRecord,
    gateway: SharedGateway,
    config: RingConfig,
    metadata: Metadata,
    handlers: HandlerRegistry,
    well_known_peers: Vec<PeerRecord>,
}

impl NodeBuilder {
    pub fn new(host: impl Into<String>, port: u16, gateway: SharedGateway) -> Self {
        Self {
            peer: PeerRecord::new(host, port),
            gateway,
            config: RingConfig::default(),
            metadata: Metadata::new(),
            handlers: HandlerRegistry::new(),
            well_known_peers: vec![],
        }
    }

    pub fn config(mut self, config: RingConfig) -> Self {
        self.config = config;
        self
    }

    pub fn metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Serve `handler` under `handle/{name}`.
    pub fn action(mut self, name: impl Into<String>, handler: Arc<dyn ActionHandler>) -> Self {
        self.handlers.register(name, handler);
        self
    }

    /// Peers a lonely node tries to join.
    pub fn well_known_peers(mut self, peers: Vec<PeerRecord>) -> Self {
        self.well_known_peers = peers;
        self
    }

    pub fn build(self) -> Arc<Node> {
        let well_known = DashSet::new();
        for peer in self.well_known_peers {
            if peer != self.peer {
                well_known.insert(peer);
            }
        }
        Arc::new(Node {
            ring: Arc::new(PeerRing::new(self.peer, self.config.succ_max)),
            detector: FailureDetector::new(self.gateway, self.config.call_timeout),
            handlers: self.handlers,
            metadata: self.metadata,
            well_known,
            config: self.config,
            shutdown: CancellationToken::new(),
        })
    }
}
