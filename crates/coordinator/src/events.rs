//! Inbound room events
//!
//! The consumed signaling surface: roster sync, producer lifecycle,
//! screen-share lifecycle, breakout-room lifecycle, display-mode changes,
//! and local pagination/resize calls. Events mutate session state through
//! `SessionState::apply` and report the urgency of the next pass.

use mediagrid_layout::{
    ContainerSize, MeetingDisplayType, Participant, ParticipantId, ParticipantLevel, ProducerId,
};
use serde::{Deserialize, Serialize};

/// Media kind carried by a producer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProducerKind {
    /// Microphone track
    Audio,
    /// Camera track
    Video,
    /// Screen-share track
    Screen,
}

/// One inbound event from the signaling channel or a local collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum RoomEvent {
    /// Full participant-list replacement from roster sync
    RosterSync {
        /// The complete current roster
        participants: Vec<Participant>,
    },
    /// A remote producer appeared
    NewProducer {
        /// Producer id on the transport layer
        producer_id: ProducerId,
        /// Owning participant
        participant_id: ParticipantId,
        /// Media kind
        kind: ProducerKind,
        /// Owner's privilege level
        level: ParticipantLevel,
    },
    /// A producer closed on the transport layer
    ProducerClosed {
        /// Producer id
        producer_id: ProducerId,
    },
    /// A producer paused at the source
    ProducerPaused {
        /// Producer id
        producer_id: ProducerId,
        /// Media kind
        kind: ProducerKind,
    },
    /// A producer resumed at the source
    ProducerResumed {
        /// Producer id
        producer_id: ProducerId,
        /// Media kind
        kind: ProducerKind,
    },
    /// A screen-share started
    ShareStarted {
        /// The share producer
        producer_id: ProducerId,
        /// The sharing participant
        participant_id: ParticipantId,
    },
    /// The screen-share stopped
    ShareStopped,
    /// Breakout-room partition changed
    BreakoutUpdated {
        /// Room membership, indexed by room number
        rooms: Vec<Vec<ParticipantId>>,
        /// Whether breakout rooms have started
        started: bool,
        /// Whether breakout rooms have ended
        ended: bool,
    },
    /// Local display-mode switch
    DisplayModeChanged {
        /// The new display mode
        mode: MeetingDisplayType,
    },
    /// Recent audio levels, one sample per participant
    AudioLevels {
        /// Raw level samples in `[0, 1]`
        levels: Vec<(ParticipantId, f64)>,
    },
    /// Local pagination request
    PageChanged {
        /// Requested page index (clamped during reconciliation)
        page: usize,
    },
    /// Rendering container resized
    ContainerResized {
        /// New container size
        size: ContainerSize,
    },
}

/// How soon the next reconciliation pass should run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Urgency {
    /// No pass needed, the event was a no-op
    None,
    /// Passive reconciliation on the slow cadence is enough
    Normal,
    /// Local action, reconcile on the fast cadence
    Fast,
}
