//! Participants and breakout-room partitions

use crate::stream::ParticipantId;
use serde::{Deserialize, Serialize};

/// Participant privilege level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantLevel {
    /// Session host; retains visibility across breakout rooms
    Host,
    /// Co-host; same override visibility as the host
    CoHost,
    /// Regular attendee
    Attendee,
}

impl ParticipantLevel {
    /// Whether this level carries breakout-room override visibility
    pub fn has_room_override(&self) -> bool {
        matches!(self, ParticipantLevel::Host | ParticipantLevel::CoHost)
    }
}

/// One session participant
///
/// Owned by the roster-sync collaborator; this subsystem treats participants
/// as read-only references re-fetched at the start of each pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    /// Unique participant id
    pub id: ParticipantId,
    /// Display name shown on tiles and in active-state updates
    pub display_name: String,
    /// Privilege level
    pub level: ParticipantLevel,
    /// Whether the microphone is muted
    pub audio_muted: bool,
    /// Whether a camera stream is live
    pub video_on: bool,
    /// Whether a screen-share is live
    pub screen_share_on: bool,
    /// Assigned breakout room, if any
    pub breakout_room: Option<u32>,
    /// Banned participants never reach the candidate set
    pub banned: bool,
    /// Suspended participants never reach the candidate set
    pub suspended: bool,
}

impl Participant {
    /// Minimal attendee, used as a construction convenience
    pub fn attendee(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: ParticipantId::new(id),
            display_name: display_name.into(),
            level: ParticipantLevel::Attendee,
            audio_muted: false,
            video_on: false,
            screen_share_on: false,
            breakout_room: None,
            banned: false,
            suspended: false,
        }
    }

    /// Whether this participant is eligible to appear anywhere
    pub fn is_eligible(&self) -> bool {
        !self.banned && !self.suspended
    }

    /// Whether this participant has any live media
    pub fn has_live_media(&self) -> bool {
        self.video_on || self.screen_share_on || !self.audio_muted
    }
}

/// Breakout-room partition
///
/// Restricts visibility to same-room participants, with host/co-host
/// override. Room assignment lives on both the partition and the
/// participant; the partition is authoritative when both are present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct BreakoutPartition {
    /// Room membership, indexed by room number
    pub rooms: Vec<Vec<ParticipantId>>,
    /// Whether breakout rooms have started
    pub started: bool,
    /// Whether breakout rooms have ended
    pub ended: bool,
}

impl BreakoutPartition {
    /// Whether the partition currently restricts visibility
    pub fn is_active(&self) -> bool {
        self.started && !self.ended
    }

    /// The room index a participant is assigned to, if any
    pub fn room_of(&self, participant_id: &ParticipantId) -> Option<u32> {
        self.rooms
            .iter()
            .position(|room| room.contains(participant_id))
            .map(|i| i as u32)
    }

    /// Whether `participant` is visible to a viewer in `viewer_room`
    ///
    /// Same-room participants are visible; hosts and co-hosts are visible
    /// from any room; unassigned participants stay in the main room and are
    /// visible only to viewers who are also unassigned.
    pub fn visible_to(
        &self,
        viewer_room: Option<u32>,
        participant_id: &ParticipantId,
        level: ParticipantLevel,
    ) -> bool {
        if !self.is_active() {
            return true;
        }

        if level.has_room_override() {
            return true;
        }

        self.room_of(participant_id) == viewer_room
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn partition() -> BreakoutPartition {
        BreakoutPartition {
            rooms: vec![
                vec![ParticipantId::from("alice"), ParticipantId::from("bob")],
                vec![ParticipantId::from("carol")],
            ],
            started: true,
            ended: false,
        }
    }

    #[test]
    fn test_room_of() {
        let p = partition();
        assert_eq!(p.room_of(&ParticipantId::from("alice")), Some(0));
        assert_eq!(p.room_of(&ParticipantId::from("carol")), Some(1));
        assert_eq!(p.room_of(&ParticipantId::from("dave")), None);
    }

    #[test]
    fn test_same_room_visibility() {
        let p = partition();
        assert!(p.visible_to(
            Some(0),
            &ParticipantId::from("bob"),
            ParticipantLevel::Attendee
        ));
        assert!(!p.visible_to(
            Some(0),
            &ParticipantId::from("carol"),
            ParticipantLevel::Attendee
        ));
    }

    #[test]
    fn test_host_override_visibility() {
        let p = partition();
        assert!(p.visible_to(
            Some(0),
            &ParticipantId::from("carol"),
            ParticipantLevel::Host
        ));
        assert!(p.visible_to(
            Some(1),
            &ParticipantId::from("alice"),
            ParticipantLevel::CoHost
        ));
    }

    #[test]
    fn test_inactive_partition_is_transparent() {
        let mut p = partition();
        p.ended = true;
        assert!(p.visible_to(
            Some(0),
            &ParticipantId::from("carol"),
            ParticipantLevel::Attendee
        ));
    }

    #[test]
    fn test_unassigned_stays_in_main_room() {
        let p = partition();
        // dave is unassigned; visible only to unassigned viewers
        assert!(p.visible_to(None, &ParticipantId::from("dave"), ParticipantLevel::Attendee));
        assert!(!p.visible_to(
            Some(0),
            &ParticipantId::from("dave"),
            ParticipantLevel::Attendee
        ));
    }

    #[test]
    fn test_participant_eligibility() {
        let mut p = Participant::attendee("alice", "Alice");
        assert!(p.is_eligible());
        p.banned = true;
        assert!(!p.is_eligible());
    }
}
