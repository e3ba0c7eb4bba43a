//! # dynamokv
//!
//! A quorum-replicated key-value store with Dynamo-style eventual consistency:
//! - Vector clocks for causal ordering of versions
//! - Per-key conflict sets instead of last-writer-wins
//! - Quorum writes (W) and sloppy quorum reads (R) over a preference list
//! - A pending-gossip ledger and gossip cycles for replicas missed at write time
//! - Crash injection for fault testing
//!
//! ## Architecture
//!
//! ```text
//!            Put(key, ctx, v)
//!                  │
//!            ┌─────▼──────┐  replicate   ┌────────────┐
//!            │  Node 0    ├─────────────►│  Node 1    │
//!            │ (home)     │              └────────────┘
//!            │ store      │  replicate   ┌────────────┐
//!            │ ledger ────┼─────────────►│  Node 2    │  W reached
//!            └─────┬──────┘              └────────────┘
//!                  │ gossip (batch_replicate)
//!            ┌─────▼──────┐              ┌────────────┐
//!            │  Node 3    │              │  Node 4    │
//!            └────────────┘              └────────────┘
//! ```
//!
//! ## Usage
//!
//! ### Start a node
//! ```bash
//! dynamo-node serve \
//!   --id n1 \
//!   --bind 127.0.0.1:7000 \
//!   --peers 127.0.0.1:7001,127.0.0.1:7002 \
//!   --w 2 --r 2
//! ```
//!
//! ### Use the CLI
//! ```bash
//! dynamo put s1 abc --node http://127.0.0.1:7000
//! dynamo get s1 --node http://127.0.0.1:7000
//! dynamo gossip --node http://127.0.0.1:7000
//! dynamo crash 2 --node http://127.0.0.1:7001
//! ```

#![allow(clippy::result_large_err)]

pub mod common;
pub mod coordinator;
pub mod replica;
pub mod transport;

// Re-export commonly used types
pub use common::{DynamoNode, Error, NodeConfig, PreferenceList, Result};
pub use coordinator::{DynamoServer, NodeServer};
pub use replica::{VectorClock, VersionSet, VersionedEntry};

/// Current version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build info
pub const BUILD_INFO: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("CARGO_PKG_NAME"), ")");
