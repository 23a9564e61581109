//! Signaling emission
//!
//! After a propagated pass, the coordinator broadcasts the authoritative
//! screen/active state so other clients converge on the same primary-tile
//! decision. The sink trait decouples the coordinator from the actual
//! signaling channel; the broadcast implementation serves in-process
//! consumers and tests.

use crate::{Error, Result};
use mediagrid_layout::ScreenState;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Outbound `update-active-state` payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveStateUpdate {
    /// Session this update belongs to
    pub session_id: String,
    /// Display names currently rendered
    pub active_names: Vec<String>,
    /// Authoritative primary-screen state
    pub screen_states: Vec<ScreenState>,
}

/// Trait for signaling delivery targets
pub trait SignalingSink: Send + Sync {
    /// Emit an active-state update to this sink
    fn emit(&self, update: ActiveStateUpdate) -> Result<()>;

    /// Close the sink and perform any cleanup
    fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Broadcast channel sink
///
/// Sends updates to a tokio broadcast channel that can have multiple
/// subscribers (local UI, the signaling client, tests).
pub struct BroadcastSink {
    sender: broadcast::Sender<ActiveStateUpdate>,
}

impl BroadcastSink {
    /// Create a new broadcast sink with the specified capacity
    pub fn new(capacity: usize) -> (Self, broadcast::Receiver<ActiveStateUpdate>) {
        let (sender, receiver) = broadcast::channel(capacity);
        (Self { sender }, receiver)
    }

    /// Create a new broadcast sink with default capacity (64)
    pub fn with_default_capacity() -> (Self, broadcast::Receiver<ActiveStateUpdate>) {
        Self::new(64)
    }

    /// Subscribe to receive updates from this sink
    pub fn subscribe(&self) -> broadcast::Receiver<ActiveStateUpdate> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl SignalingSink for BroadcastSink {
    fn emit(&self, update: ActiveStateUpdate) -> Result<()> {
        self.sender
            .send(update)
            .map(|_| ())
            .map_err(|e| Error::SignalingError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediagrid_layout::ParticipantId;

    fn update(names: &[&str]) -> ActiveStateUpdate {
        ActiveStateUpdate {
            session_id: "session-1".to_string(),
            active_names: names.iter().map(|s| s.to_string()).collect(),
            screen_states: vec![ScreenState::default()],
        }
    }

    #[tokio::test]
    async fn test_broadcast_sink_delivery() {
        let (sink, mut rx) = BroadcastSink::with_default_capacity();

        sink.emit(update(&["alice"])).unwrap();
        sink.emit(update(&["alice", "bob"])).unwrap();

        assert_eq!(rx.recv().await.unwrap().active_names, vec!["alice"]);
        assert_eq!(
            rx.recv().await.unwrap().active_names,
            vec!["alice", "bob"]
        );
    }

    #[tokio::test]
    async fn test_broadcast_sink_multiple_subscribers() {
        let (sink, mut rx1) = BroadcastSink::with_default_capacity();
        let mut rx2 = sink.subscribe();
        assert_eq!(sink.receiver_count(), 2);

        sink.emit(update(&["alice"])).unwrap();
        assert_eq!(rx1.recv().await.unwrap().active_names, vec!["alice"]);
        assert_eq!(rx2.recv().await.unwrap().active_names, vec!["alice"]);
    }

    #[test]
    fn test_emit_without_subscribers_is_error() {
        let (sink, rx) = BroadcastSink::with_default_capacity();
        drop(rx);
        assert!(sink.emit(update(&[])).is_err());
    }

    #[test]
    fn test_update_serialization() {
        let mut u = update(&["alice"]);
        u.screen_states[0].main_screen_person = Some(ParticipantId::from("alice"));
        let json = serde_json::to_string(&u).unwrap();
        let back: ActiveStateUpdate = serde_json::from_str(&json).unwrap();
        assert_eq!(u, back);
    }
}
