//! Simulated crash/recovery state

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

/// Longest crash window honoured; larger requests are clamped
pub const MAX_CRASH_WINDOW: Duration = Duration::from_secs(100 * 365 * 24 * 3600);

/// Node health state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeState {
    Alive,
    Crashed,
}

impl NodeState {
    /// Can this node serve any operation?
    pub fn is_available(&self) -> bool {
        matches!(self, NodeState::Alive)
    }
}

impl std::fmt::Display for NodeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeState::Alive => write!(f, "alive"),
            NodeState::Crashed => write!(f, "crashed"),
        }
    }
}

/// Crash window tracked as a deadline.
///
/// The node is crashed while `now < crashed_until`; revival needs no timer,
/// every operation observes the deadline on entry.
#[derive(Debug, Clone, Default)]
pub struct NodeAvailability {
    crashed_until: Option<Instant>,
}

impl NodeAvailability {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state, clearing an expired crash window
    pub fn state(&mut self) -> NodeState {
        match self.crashed_until {
            Some(deadline) if Instant::now() < deadline => NodeState::Crashed,
            Some(_) => {
                self.crashed_until = None;
                tracing::info!("Crash window elapsed, node revived");
                NodeState::Alive
            }
            None => NodeState::Alive,
        }
    }

    pub fn is_alive(&mut self) -> bool {
        self.state().is_available()
    }

    /// Enter the crashed state for `duration`.
    ///
    /// Returns false, leaving the current window untouched, if already crashed.
    pub fn crash(&mut self, duration: Duration) -> bool {
        if !self.is_alive() {
            return false;
        }
        let now = Instant::now();
        let deadline = now
            .checked_add(duration.min(MAX_CRASH_WINDOW))
            .unwrap_or(now);
        self.crashed_until = Some(deadline);
        true
    }

    /// Time left in the crash window
    pub fn remaining(&mut self) -> Option<Duration> {
        if self.is_alive() {
            return None;
        }
        self.crashed_until
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_state() {
        assert!(NodeState::Alive.is_available());
        assert!(!NodeState::Crashed.is_available());
        assert_eq!(NodeState::Crashed.to_string(), "crashed");
    }

    #[tokio::test(start_paused = true)]
    async fn test_crash_window() {
        let mut availability = NodeAvailability::new();
        assert!(availability.is_alive());

        assert!(availability.crash(Duration::from_secs(2)));
        assert_eq!(availability.state(), NodeState::Crashed);
        // A second crash while down has no effect
        assert!(!availability.crash(Duration::from_secs(60)));

        tokio::time::advance(Duration::from_millis(1500)).await;
        assert!(!availability.is_alive());
        assert_eq!(availability.remaining(), Some(Duration::from_millis(500)));

        tokio::time::advance(Duration::from_millis(600)).await;
        assert!(availability.is_alive());
        assert!(availability.remaining().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_crash_window_is_clamped() {
        let mut availability = NodeAvailability::new();
        assert!(availability.crash(Duration::from_secs(u64::MAX)));
        assert_eq!(availability.state(), NodeState::Crashed);
        assert_eq!(availability.remaining(), Some(MAX_CRASH_WINDOW));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_duration_crash_revives_immediately() {
        let mut availability = NodeAvailability::new();
        assert!(availability.crash(Duration::ZERO));
        assert!(availability.is_alive());
    }
}
