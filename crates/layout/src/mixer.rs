//! Candidate stream mixing
//!
//! Builds the ordered candidate list for one reconciliation pass: live
//! video/screen refs first in their arrival order, then audio-only
//! placeholders for roster members without live video. The candidate set
//! is built fresh each pass and never persisted.

use crate::grid::GridSpec;
use crate::participant::Participant;
use crate::stream::{ProducerId, StreamRef, TileDescriptor};
use std::collections::HashSet;
use tracing::debug;

/// Drop the designated admin stream from the raw producer list
///
/// The admin/host tile is handled separately by the reconciler to guarantee
/// host visibility, so it never competes for a sorted grid slot.
pub fn filter_videos(refs: Vec<StreamRef>, admin_producer_id: Option<&ProducerId>) -> Vec<StreamRef> {
    let Some(admin) = admin_producer_id else {
        return refs;
    };

    refs.into_iter()
        .filter(|r| r.producer_id() != Some(admin))
        .collect()
}

/// Merge live refs and audio-only placeholders into one ordered candidate list
///
/// Each room participant appears exactly once. A live camera/screen ref wins
/// over the audio-only placeholder for the same participant. Live refs keep
/// their given order (loudness/insertion order from the caller); placeholders
/// follow in roster order.
pub fn mix_streams(
    video_refs: Vec<StreamRef>,
    audio_only: Vec<StreamRef>,
    room_participants: &[Participant],
) -> Vec<StreamRef> {
    let roster: HashSet<_> = room_participants
        .iter()
        .filter(|p| p.is_eligible())
        .map(|p| &p.id)
        .collect();

    let mut seen = HashSet::new();
    let mut mixed = Vec::with_capacity(video_refs.len() + audio_only.len());

    for stream in video_refs {
        if !roster.contains(stream.participant_id()) {
            debug!(participant = %stream.participant_id(), "dropping ref with no roster entry");
            continue;
        }
        if seen.insert(stream.participant_id().clone()) {
            mixed.push(stream);
        }
    }

    for stream in audio_only {
        if !roster.contains(stream.participant_id()) {
            continue;
        }
        if seen.insert(stream.participant_id().clone()) {
            mixed.push(stream);
        }
    }

    mixed
}

/// Produce the final ordered tile sequence for the main and alt grids
///
/// Pads the main grid with `num_to_add` placeholder tiles per the GridSpec
/// and reports whether the alt (screen-share-adjacent) grid remains visible.
/// With alt candidates present the GridSpec describes the alt grid, which
/// lays out uniformly and takes no pads.
pub fn add_videos_grid(
    main: &[StreamRef],
    alt: &[StreamRef],
    spec: &GridSpec,
) -> (Vec<TileDescriptor>, bool) {
    let alt_active = !alt.is_empty() && !spec.remove_alt_grid;

    let mut tiles = Vec::with_capacity(main.len() + spec.num_to_add + alt.len());

    for stream in main {
        tiles.push(TileDescriptor::stream(stream.clone(), false));
    }
    if alt.is_empty() {
        for _ in 0..spec.num_to_add {
            tiles.push(TileDescriptor::pad(false));
        }
    }

    if alt_active {
        for stream in alt {
            tiles.push(TileDescriptor::stream(stream.clone(), true));
        }
    }

    (tiles, alt_active)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::check_grid;
    use crate::stream::{ParticipantId, TileContent};

    fn camera(producer: &str, participant: &str) -> StreamRef {
        StreamRef::Camera {
            producer_id: ProducerId::from(producer),
            participant_id: ParticipantId::from(participant),
        }
    }

    fn avatar(participant: &str) -> StreamRef {
        StreamRef::AudioOnly {
            participant_id: ParticipantId::from(participant),
        }
    }

    #[test]
    fn test_filter_videos_removes_admin() {
        let refs = vec![camera("prod-admin", "host"), camera("prod-1", "alice")];
        let admin = ProducerId::from("prod-admin");

        let filtered = filter_videos(refs.clone(), Some(&admin));
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].participant_id().as_str(), "alice");

        let unfiltered = filter_videos(refs, None);
        assert_eq!(unfiltered.len(), 2);
    }

    #[test]
    fn test_mix_prefers_live_over_placeholder() {
        let participants = vec![
            Participant::attendee("alice", "Alice"),
            Participant::attendee("bob", "Bob"),
        ];
        let mixed = mix_streams(
            vec![camera("prod-1", "alice")],
            vec![avatar("alice"), avatar("bob")],
            &participants,
        );

        assert_eq!(mixed.len(), 2);
        assert!(!mixed[0].is_placeholder());
        assert_eq!(mixed[0].participant_id().as_str(), "alice");
        assert!(mixed[1].is_placeholder());
        assert_eq!(mixed[1].participant_id().as_str(), "bob");
    }

    #[test]
    fn test_mix_each_participant_once() {
        let participants = vec![Participant::attendee("alice", "Alice")];
        let mixed = mix_streams(
            vec![camera("prod-1", "alice"), camera("prod-2", "alice")],
            vec![avatar("alice")],
            &participants,
        );
        assert_eq!(mixed.len(), 1);
    }

    #[test]
    fn test_mix_drops_non_roster_refs() {
        let participants = vec![Participant::attendee("alice", "Alice")];
        let mixed = mix_streams(
            vec![camera("prod-1", "alice"), camera("prod-9", "ghost")],
            vec![avatar("ghost")],
            &participants,
        );
        assert_eq!(mixed.len(), 1);
        assert_eq!(mixed[0].participant_id().as_str(), "alice");
    }

    #[test]
    fn test_mix_drops_banned_participants() {
        let mut banned = Participant::attendee("bob", "Bob");
        banned.banned = true;
        let participants = vec![Participant::attendee("alice", "Alice"), banned];

        let mixed = mix_streams(
            vec![camera("prod-1", "alice"), camera("prod-2", "bob")],
            vec![],
            &participants,
        );
        assert_eq!(mixed.len(), 1);
    }

    #[test]
    fn test_add_videos_grid_pads_main() {
        // Five tiles in a (2, 3) grid needs one pad.
        let spec = check_grid(2, 3, 5);
        let main: Vec<_> = (0..5).map(|i| camera(&format!("p{i}"), &format!("u{i}"))).collect();

        let (tiles, alt_active) = add_videos_grid(&main, &[], &spec);
        assert_eq!(tiles.len(), 6);
        assert!(matches!(tiles[5].content, TileContent::Pad));
        assert!(!alt_active);
    }

    #[test]
    fn test_add_videos_grid_alt_flag() {
        let spec = check_grid(2, 2, 3); // remove_alt_grid = false
        let main = vec![camera("p0", "u0")];
        let alt = vec![camera("p1", "u1")];

        let (tiles, alt_active) = add_videos_grid(&main, &alt, &spec);
        assert!(alt_active);
        assert!(tiles.iter().any(|t| t.alt_grid));

        let spec = check_grid(2, 2, 2); // remove_alt_grid = true
        let (tiles, alt_active) = add_videos_grid(&main, &alt, &spec);
        assert!(!alt_active);
        assert!(tiles.iter().all(|t| !t.alt_grid));
    }
}
