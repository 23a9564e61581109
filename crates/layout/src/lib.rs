//! Pure layout core for mediagrid
//!
//! This crate decides *what* renders and *what shape* it renders in:
//! grid geometry, candidate stream mixing, change detection, adaptive
//! sizing, and the layout reconciler. Everything here is synchronous and
//! side-effect free; the async shell (`mediagrid-coordinator`) feeds it
//! collaborator state at the start of each pass and acts on its output.
//!
//! # Architecture
//!
//! ```text
//! roster / producers / share / breakout state
//!        ↓
//! StreamSetBuilder (mixer)  → ordered CandidateSet
//!        ↓
//! LayoutReconciler (reconcile) → RenderSet + add/remove lists
//!        ↓                        ↓
//! GridPlanner (grid)        ChangeDetector (detect)
//!        ↓
//! AdaptiveSizer (sizer)     → per-tile pixel bounds
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod detect;
pub mod error;
pub mod grid;
pub mod mixer;
pub mod participant;
pub mod reconcile;
pub mod sizer;
pub mod stream;

pub use config::{EventType, LayoutConfig, MeetingDisplayType};
pub use detect::{compare_active_names, compare_screen_states, ScreenState};
pub use error::{Error, Result};
pub use grid::{calculate_grid, check_grid, GridPlanner, GridSpec};
pub use participant::{BreakoutPartition, Participant, ParticipantLevel};
pub use reconcile::{reconcile, ReconcileInput, RenderPlan};
pub use sizer::{auto_adjust, update_mini_cards_grid, AdaptiveSizer, ContainerSize};
pub use stream::{
    ParticipantId, ProducerId, StreamKind, StreamRef, TileContent, TileDescriptor, TileRect,
};

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
