//! Replica node coordination
//!
//! The node is responsible for:
//! - Quorum writes (local write + ordered fan-out until W replicas hold it)
//! - Sloppy quorum reads (local read + the next R-1 replicas)
//! - Serving replicate / batch replicate / node get for its peers
//! - Gossip delivery of writes missed at write time
//! - Simulated crash windows

pub mod gossip;
pub mod http;
pub mod node;
pub mod server;

pub use gossip::{spawn_periodic_gossip, GossipReport};
pub use node::DynamoServer;
pub use server::{serve_listener, NodeServer};
