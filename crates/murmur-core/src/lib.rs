//! murmur-core — identity types, routing table contract, and configuration.
//! The gossip crates depend on this one.

pub mod config;
pub mod id;
pub mod routing;

pub use config::MurmurConfig;
pub use id::{IdError, PeerId, TopicId};
pub use routing::{NodeId, RoutingError, RoutingTable};
