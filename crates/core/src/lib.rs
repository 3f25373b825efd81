//! Ringlet core, a Chord overlay engine that stays indifferent to its transport.
//!
//! A process owns one [dht::PeerRing] position on a 160-bit identifier ring. The
//! [node::Node] handle glues the ring state to a [gateway::RemoteGateway] and runs:
//!
//! - join against a bootstrap peer ([node::Node::join]),
//! - periodic stabilization ([dht::Stabilizer]),
//! - key lookup ([node::Node::find_successor]),
//! - graceful departure ([node::Node::leave]).
//!
//! Everything a remote peer can ask of a node is expressed as an [gateway::Operation]
//! and served by [node::Node::handle_request], so the HTTP layer in `ringlet-node` and
//! the in-memory [gateway::LocalNetwork] share one dispatcher.

pub mod consts;
pub mod dht;
pub mod error;
pub mod gateway;
pub mod inspect;
pub mod message;
pub mod node;


pub use async_trait;
pub use error::Error;
pub use error::Result;
