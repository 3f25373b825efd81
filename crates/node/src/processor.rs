//! Processor of ringlet-node: one ring position served over HTTP.
use std::net::SocketAddr;
use std::net::TcpListener;
use std::sync::Arc;
use std::sync::Mutex;

use ringlet_core::dht::Did;
use ringlet_core::dht::PeerRecord;
use ringlet_core::gateway::SharedGateway;
use ringlet_core::message::ActionHandler;
use ringlet_core::node::Node;
use ringlet_core::node::NodeBuilder;
use ringlet_core::node::RingConfig;
use tokio::task::JoinHandle;

use crate::client::HttpGateway;
use crate::config::Config;
use crate::endpoint;
use crate::error::Error;
use crate::error::Result;

/// ProcessorBuilder is used to initialize a [Processor] instance.
pub struct ProcessorBuilder {
    config: Config,
    gateway: Option<SharedGateway>,
    actions: Vec<(String, Arc<dyn ActionHandler>)>,
}

/// Processor owns a [Node] and the listener its peers reach it on.
pub struct Processor {
    /// the ring node
    pub node: Arc<Node>,
    local_addr: SocketAddr,
    listener: Mutex<Option<TcpListener>>,
}

impl ProcessorBuilder {
    /// initialize a [ProcessorBuilder] with a [Config].
    pub fn from_config(config: &Config) -> Self {
        Self {
            config: config.clone(),
            gateway: None,
            actions: vec![],
        }
    }

    /// initialize a [ProcessorBuilder] with a serialized [Config].
    pub fn from_serialized(config: &str) -> Result<Self> {
        let config = serde_yaml::from_str::<Config>(config)?;
        Ok(Self::from_config(&config))
    }

    /// Replace the default [HttpGateway].
    pub fn gateway(mut self, gateway: SharedGateway) -> Self {
        self.gateway = Some(gateway);
        self
    }

    /// Register an application action served under `handle/{name}`.
    pub fn action(mut self, name: impl Into<String>, handler: Arc<dyn ActionHandler>) -> Self {
        self.actions.push((name.into(), handler));
        self
    }

    /// Bind the listener and build the [Processor].
    /// With port `0` the node takes the port the system picked.
    pub fn build(self) -> Result<Processor> {
        self.config.validate()?;
        let listener = TcpListener::bind((self.config.bind_address.as_str(), self.config.port))
            .map_err(|e| {
                Error::BindFailed(format!(
                    "{}:{}: {}",
                    self.config.bind_address, self.config.port, e
                ))
            })?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| Error::BindFailed(e.to_string()))?;

        let ring_config = RingConfig::from(&self.config);
        let gateway = match self.gateway {
            Some(gateway) => gateway,
            None => Arc::new(HttpGateway::new(ring_config.call_timeout)?),
        };

        let mut builder = NodeBuilder::new(self.config.host.clone(), local_addr.port(), gateway)
            .config(ring_config)
            .metadata(self.config.metadata.clone())
            .well_known_peers(self.config.well_known_peers());
        for (name, handler) in self.actions {
            builder = builder.action(name, handler);
        }

        Ok(Processor {
            node: builder.build(),
            local_addr,
            listener: Mutex::new(Some(listener)),
        })
    }
}

impl Processor {
    /// Get current did
    pub fn did(&self) -> Did {
        self.node.did()
    }

    /// Address other peers use for this node.
    pub fn peer(&self) -> &PeerRecord {
        self.node.peer()
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve HTTP and run stabilization in the background. The returned task ends
    /// once the node stops.
    pub fn listen(&self) -> Result<JoinHandle<()>> {
        let listener = self
            .listener
            .lock()
            .map_err(|_| Error::Lock)?
            .take()
            .ok_or(Error::AlreadyListening)?;
        let node = self.node.clone();
        let server = tokio::spawn(endpoint::serve(
            listener,
            node.clone(),
            node.shutdown_token(),
        ));
        let stabilizer = node.start();

        Ok(tokio::spawn(async move {
            let (served, stabilized) = futures::join!(server, stabilizer);
            match served {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::error!("[{}] endpoint stopped: {}", node.peer(), e),
                Err(e) => tracing::error!("[{}] endpoint task failed: {}", node.peer(), e),
            }
            if let Err(e) = stabilized {
                tracing::error!("[{}] stabilization task failed: {}", node.peer(), e);
            }
        }))
    }

    /// Join through `bootstrap`, or through the well-known peers one by one.
    /// Returns whether a join happened.
    pub async fn join(&self, bootstrap: Option<PeerRecord>) -> Result<bool> {
        if let Some(bootstrap) = bootstrap {
            return Ok(self.node.join(bootstrap).await?);
        }
        for peer in self.node.well_known_peers() {
            match self.node.join(peer.clone()).await {
                Ok(joined) => return Ok(joined),
                Err(e) => tracing::warn!(
                    "[{}] failed to join via well-known peer {}: {}",
                    self.peer(),
                    peer,
                    e
                ),
            }
        }
        Ok(false)
    }

    /// Leave the ring and stop serving.
    pub async fn shutdown(&self) -> Result<()> {
        let left = self.node.leave().await;
        self.node.stop();
        Ok(left?)
    }
}
