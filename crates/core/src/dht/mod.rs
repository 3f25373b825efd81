//! Implementation of the Chord ring: identifiers, peers and a node's local view.
mod did;
pub use did::BiasId;
pub use did::Did;
pub use did::Interval;
pub use did::SortRing;
pub mod finger;
pub use finger::FingerTable;
pub mod peer;
pub use peer::MaybePeer;
pub use peer::PeerRecord;
pub mod ring;
pub use ring::PeerRing;
pub mod successor;
pub use successor::SuccessorSeq;
mod types;
pub use types::DepartNotice;
pub use types::PeerStatus;
pub use types::RingEvent;
pub use types::RingSnapshot;
pub mod stabilization;
pub use stabilization::Stabilizer;
