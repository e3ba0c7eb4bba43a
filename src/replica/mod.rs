//! Per-node replica state
//!
//! - Vector clocks for causal ordering
//! - Version sets holding causally-concurrent siblings
//! - The key/value table reconciling writes by context
//! - The pending-gossip ledger for replicas missed at write time
//! - Simulated crash windows

pub mod availability;
pub mod ledger;
pub mod store;
pub mod vector_clock;
pub mod version_set;

pub use availability::{NodeAvailability, NodeState};
pub use ledger::PendingGossipLedger;
pub use store::{BatchOutcome, VersionedStore};
pub use vector_clock::VectorClock;
pub use version_set::{Reconcile, VersionSet, VersionedEntry};
