//! Change detection
//!
//! Structural diffs of the active-name and screen-state snapshots decide
//! whether a reconciliation pass needs to propagate at all. Snapshots are
//! overwritten every pass, never merged. A `false` from both comparisons
//! short-circuits the pass, which is the primary defense against needless
//! transport churn.

use crate::stream::ParticipantId;
use serde::{Deserialize, Serialize};

/// Authoritative primary-screen state, broadcast so peers converge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ScreenState {
    /// Participant pinned to the primary tile, if any
    pub main_screen_person: Option<ParticipantId>,
    /// Whether the primary tile is occupied
    pub main_screen_filled: bool,
    /// Whether the admin/host occupies the primary tile
    pub admin_on_main_screen: bool,
}

/// Compare active-name snapshots, order-insensitive
///
/// Returns `true` when the sets differ by membership (by name, not by
/// reference or position). Identical sets in different array order compare
/// equal.
pub fn compare_active_names(current: &[String], previous: &[String]) -> bool {
    if current.len() != previous.len() {
        return true;
    }

    let mut cur: Vec<&str> = current.iter().map(String::as_str).collect();
    let mut prev: Vec<&str> = previous.iter().map(String::as_str).collect();
    cur.sort_unstable();
    prev.sort_unstable();
    cur != prev
}

/// Compare screen-state snapshots, field-wise and order-sensitive
pub fn compare_screen_states(current: &[ScreenState], previous: &[ScreenState]) -> bool {
    current != previous
}
