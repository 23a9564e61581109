//! Configuration types for the layout core

use crate::stream::ProducerId;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Session event type, drives sizing heuristics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    /// One-to-many presentation, primary tile dominates
    Broadcast,
    /// Small conversational session
    Chat,
    /// Many-to-many meeting, grid splits evenly as it grows
    Conference,
    /// Presenter plus audience
    Webinar,
}

/// Which candidate streams are eligible for the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeetingDisplayType {
    /// Only participants with a live camera or screen stream
    Video,
    /// Participants with any live media (audio counts)
    Media,
    /// Everyone, audio-only placeholders included
    All,
}

/// Layout configuration
///
/// Supplied by the session-configuration collaborator at initialization and
/// updatable at runtime via setter calls on the coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Maximum tiles per page in normal layout (default: 4)
    pub item_page_limit: usize,

    /// Maximum tiles per page while a screen-share is active (default: 2)
    pub screen_page_limit: usize,

    /// Candidate eligibility filter (default: All)
    pub meeting_display_type: MeetingDisplayType,

    /// Session event type (default: Conference)
    pub event_type: EventType,

    /// Order candidates by descending recent loudness (default: true)
    pub sort_audio_loudness: bool,

    /// Producer id of the admin/host stream, handled separately from the
    /// sorted grid to guarantee host visibility (default: None)
    pub admin_producer_id: Option<ProducerId>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            item_page_limit: 4,
            screen_page_limit: 2,
            meeting_display_type: MeetingDisplayType::All,
            event_type: EventType::Conference,
            sort_audio_loudness: true,
            admin_producer_id: None,
        }
    }
}

impl LayoutConfig {
    /// Validate configuration parameters
    ///
    /// # Errors
    ///
    /// Returns an error if either page limit is zero.
    pub fn validate(&self) -> crate::Result<()> {
        use crate::Error;

        if self.item_page_limit == 0 {
            return Err(Error::InvalidConfig(
                "item_page_limit must be at least 1".to_string(),
            ));
        }

        if self.screen_page_limit == 0 {
            return Err(Error::InvalidConfig(
                "screen_page_limit must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Return a copy with degenerate values clamped to safe minimums
    ///
    /// Non-positive page limits are forced to 1 instead of erroring at use
    /// sites; the clamp is logged.
    pub fn clamped(&self) -> Self {
        let mut out = self.clone();

        if out.item_page_limit == 0 {
            warn!("item_page_limit of 0 clamped to 1");
            out.item_page_limit = 1;
        }

        if out.screen_page_limit == 0 {
            warn!("screen_page_limit of 0 clamped to 1");
            out.screen_page_limit = 1;
        }

        out
    }

    /// Page limit in effect for the given share state
    pub fn page_limit(&self, share_active: bool) -> usize {
        let limit = if share_active {
            self.screen_page_limit
        } else {
            self.item_page_limit
        };
        limit.max(1)
    }
}
