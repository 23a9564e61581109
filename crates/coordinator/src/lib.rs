//! Async coordination shell for mediagrid
//!
//! This crate owns everything with a side effect: session state built
//! from inbound room events, the transport throttler that pauses and
//! resumes producer handles, the signaling sink that announces the
//! authoritative active/screen state, and the two-cadence scheduler
//! that drives reconciliation passes. The layout decisions themselves
//! live in `mediagrid-layout` and run synchronously inside each pass.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use mediagrid_coordinator::{
//!     BroadcastSink, Coordinator, CoordinatorConfig, UpdateScheduler,
//! };
//! # use mediagrid_coordinator::{MediaTransport, Result};
//! # use mediagrid_layout::ProducerId;
//! # struct MyTransport;
//! # #[async_trait::async_trait]
//! # impl MediaTransport for MyTransport {
//! #     async fn pause(&self, _id: &ProducerId) -> Result<()> { Ok(()) }
//! #     async fn resume(&self, _id: &ProducerId) -> Result<()> { Ok(()) }
//! # }
//! # tokio_test::block_on(async {
//! let (sink, mut updates) = BroadcastSink::with_default_capacity();
//! let coordinator = Arc::new(Coordinator::new(
//!     CoordinatorConfig::default(),
//!     Arc::new(MyTransport),
//!     Arc::new(sink),
//! ).unwrap());
//! let scheduler = UpdateScheduler::spawn(coordinator.clone());
//!
//! // Feed room events via coordinator.handle_event(..), consume
//! // ActiveStateUpdate messages from `updates`.
//!
//! scheduler.shutdown().await;
//! # });
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod scheduler;
pub mod signaling;
pub mod state;
pub mod transport;

pub use config::CoordinatorConfig;
pub use coordinator::Coordinator;
pub use error::{Error, Result};
pub use events::{ProducerKind, RoomEvent, Urgency};
pub use scheduler::UpdateScheduler;
pub use signaling::{ActiveStateUpdate, BroadcastSink, SignalingSink};
pub use state::SessionState;
pub use transport::{HandleState, MediaTransport, TransportThrottler};

/// Get the version of this crate
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        let ver = version();
        assert!(!ver.is_empty());
    }
}
