//! Session state
//!
//! The coordinator's exclusively-owned view of the room: roster, producer
//! table, share state, breakout partition, loudness, and the snapshot pair
//! consumed by the change detector. Collaborator-owned data (participants,
//! transport handles) is mirrored here read-only and replaced wholesale by
//! sync events; pipeline stages read the latest fields at pass start rather
//! than capturing them ahead of time.

use crate::events::{ProducerKind, RoomEvent, Urgency};
use mediagrid_layout::{
    mixer, BreakoutPartition, ContainerSize, LayoutConfig, MeetingDisplayType, Participant,
    ParticipantId, ProducerId, ScreenState, StreamRef,
};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// Smoothing factor for the recent-average loudness
const LOUDNESS_ALPHA: f64 = 0.3;

/// Progress of the initial roster/producer sync
///
/// One explicit state machine instead of scattered boolean flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitialSyncState {
    /// Nothing received yet
    Pending,
    /// Producers observed before the first full roster
    PartiallyReceived,
    /// First full roster received
    Complete,
}

/// A producer known to the transport layer
#[derive(Debug, Clone, PartialEq)]
struct ProducerEntry {
    participant_id: ParticipantId,
    kind: ProducerKind,
    /// Paused at the source (not the consume-side throttle state)
    source_paused: bool,
}

/// Active screen-share
#[derive(Debug, Clone, PartialEq)]
pub struct ShareState {
    /// The share producer
    pub producer_id: ProducerId,
    /// The sharing participant
    pub participant_id: ParticipantId,
}

/// Everything a reconciliation pass reads, assembled at pass start
#[derive(Debug, Clone)]
pub struct PassContext {
    /// Ordered candidate set from the mixer
    pub candidates: Vec<StreamRef>,
    /// Latest roster
    pub participants: HashMap<ParticipantId, Participant>,
    /// Smoothed loudness
    pub loudness: HashMap<ParticipantId, f64>,
    /// Breakout partition
    pub partition: Option<BreakoutPartition>,
    /// The local viewer's room
    pub viewer_room: Option<u32>,
    /// Whether a remote share is live
    pub shared: bool,
    /// Whether the local participant is the sharer
    pub share_screen_started: bool,
    /// The sharer's pinned ref
    pub sharer: Option<StreamRef>,
    /// Producers live on the transport layer
    pub live_producers: HashSet<ProducerId>,
    /// Requested page
    pub page: usize,
    /// Previous render set
    pub previous_render: Vec<ProducerId>,
    /// Current screen-state snapshot
    pub screen_states: Vec<ScreenState>,
    /// Previous active-name snapshot
    pub prev_active_names: Vec<String>,
    /// Previous screen-state snapshot
    pub prev_screen_states: Vec<ScreenState>,
}

/// Mutable session state, owned by the coordinator
#[derive(Debug, Clone)]
pub struct SessionState {
    participants: HashMap<ParticipantId, Participant>,
    roster_order: Vec<ParticipantId>,
    producers: HashMap<ProducerId, ProducerEntry>,
    producer_order: Vec<ProducerId>,
    share: Option<ShareState>,
    partition: Option<BreakoutPartition>,
    local_participant: Option<ParticipantId>,
    display_override: Option<MeetingDisplayType>,
    page: usize,
    loudness: HashMap<ParticipantId, f64>,
    sync: InitialSyncState,
    container: ContainerSize,
    prev_active_names: Vec<String>,
    prev_screen_states: Vec<ScreenState>,
    prev_render: Vec<ProducerId>,
}

impl SessionState {
    /// Create empty state for the given container
    pub fn new(container: ContainerSize) -> Self {
        Self {
            participants: HashMap::new(),
            roster_order: Vec::new(),
            producers: HashMap::new(),
            producer_order: Vec::new(),
            share: None,
            partition: None,
            local_participant: None,
            display_override: None,
            page: 0,
            loudness: HashMap::new(),
            sync: InitialSyncState::Pending,
            container,
            prev_active_names: Vec::new(),
            prev_screen_states: Vec::new(),
            prev_render: Vec::new(),
        }
    }

    /// Identify the local participant (for breakout-room scoping)
    pub fn set_local_participant(&mut self, id: ParticipantId) {
        self.local_participant = Some(id);
    }

    /// Initial-sync progress
    pub fn sync_state(&self) -> InitialSyncState {
        self.sync
    }

    /// Current page index (clamping happens during reconciliation)
    pub fn page(&self) -> usize {
        self.page
    }

    /// Current container size
    pub fn container(&self) -> ContainerSize {
        self.container
    }

    /// Active share, if any
    pub fn share(&self) -> Option<&ShareState> {
        self.share.as_ref()
    }

    /// Local display-mode override, if one was set at runtime
    pub fn display_override(&self) -> Option<MeetingDisplayType> {
        self.display_override
    }

    /// The local viewer's breakout room
    pub fn viewer_room(&self) -> Option<u32> {
        let partition = self.partition.as_ref()?;
        let local = self.local_participant.as_ref()?;
        partition.room_of(local)
    }

    /// Apply one inbound event, returning the urgency of the next pass
    pub fn apply(&mut self, event: RoomEvent) -> Urgency {
        match event {
            RoomEvent::RosterSync { participants } => self.apply_roster(participants),
            RoomEvent::NewProducer {
                producer_id,
                participant_id,
                kind,
                level,
            } => self.apply_new_producer(producer_id, participant_id, kind, level),
            RoomEvent::ProducerClosed { producer_id } => self.apply_producer_closed(&producer_id),
            RoomEvent::ProducerPaused { producer_id, kind } => {
                self.apply_producer_paused(&producer_id, kind, true)
            }
            RoomEvent::ProducerResumed { producer_id, kind } => {
                self.apply_producer_paused(&producer_id, kind, false)
            }
            RoomEvent::ShareStarted {
                producer_id,
                participant_id,
            } => self.apply_share_started(producer_id, participant_id),
            RoomEvent::ShareStopped => self.apply_share_stopped(),
            RoomEvent::BreakoutUpdated {
                rooms,
                started,
                ended,
            } => {
                info!(rooms = rooms.len(), started, ended, "breakout partition updated");
                self.partition = Some(BreakoutPartition {
                    rooms,
                    started,
                    ended,
                });
                Urgency::Normal
            }
            RoomEvent::DisplayModeChanged { mode } => {
                info!(?mode, "display mode changed");
                self.display_override = Some(mode);
                Urgency::Fast
            }
            RoomEvent::AudioLevels { levels } => {
                for (id, sample) in levels {
                    let entry = self.loudness.entry(id).or_insert(0.0);
                    *entry = (1.0 - LOUDNESS_ALPHA) * *entry + LOUDNESS_ALPHA * sample.clamp(0.0, 1.0);
                }
                Urgency::Normal
            }
            RoomEvent::PageChanged { page } => {
                debug!(page, "page change requested");
                self.page = page;
                Urgency::Fast
            }
            RoomEvent::ContainerResized { size } => {
                self.container = size;
                Urgency::Fast
            }
        }
    }

    fn apply_roster(&mut self, participants: Vec<Participant>) -> Urgency {
        info!(count = participants.len(), "roster sync");

        self.roster_order = participants.iter().map(|p| p.id.clone()).collect();
        self.participants = participants.into_iter().map(|p| (p.id.clone(), p)).collect();

        // Loudness and producers for departed participants go with them.
        let present = &self.participants;
        self.loudness.retain(|id, _| present.contains_key(id));
        self.producers
            .retain(|_, entry| present.contains_key(&entry.participant_id));
        let producers = &self.producers;
        self.producer_order.retain(|id| producers.contains_key(id));

        if let Some(share) = &self.share {
            if !self.participants.contains_key(&share.participant_id) {
                debug!("sharer left, clearing share state");
                self.share = None;
            }
        }

        self.sync = InitialSyncState::Complete;
        Urgency::Normal
    }

    fn apply_new_producer(
        &mut self,
        producer_id: ProducerId,
        participant_id: ParticipantId,
        kind: ProducerKind,
        level: mediagrid_layout::ParticipantLevel,
    ) -> Urgency {
        debug!(%producer_id, %participant_id, ?kind, "new remote producer");

        if self.producers.contains_key(&producer_id) {
            return Urgency::None;
        }

        if !self.participants.contains_key(&participant_id) {
            // Producer raced ahead of the roster; track a provisional entry
            // until the next sync replaces it.
            let mut provisional =
                Participant::attendee(participant_id.as_str(), participant_id.as_str());
            provisional.level = level;
            self.participants.insert(participant_id.clone(), provisional);
            self.roster_order.push(participant_id.clone());
            if self.sync == InitialSyncState::Pending {
                self.sync = InitialSyncState::PartiallyReceived;
            }
        }

        self.producers.insert(
            producer_id.clone(),
            ProducerEntry {
                participant_id: participant_id.clone(),
                kind,
                source_paused: false,
            },
        );
        self.producer_order.push(producer_id);
        self.refresh_media_flags(&participant_id);

        Urgency::Normal
    }

    fn apply_producer_closed(&mut self, producer_id: &ProducerId) -> Urgency {
        let Some(entry) = self.producers.remove(producer_id) else {
            debug!(%producer_id, "close for unknown producer ignored");
            return Urgency::None;
        };
        self.producer_order.retain(|id| id != producer_id);

        if self.share.as_ref().map(|s| &s.producer_id) == Some(producer_id) {
            debug!("share producer closed, clearing share state");
            self.share = None;
        }

        self.refresh_media_flags(&entry.participant_id);
        Urgency::Normal
    }

    fn apply_producer_paused(
        &mut self,
        producer_id: &ProducerId,
        kind: ProducerKind,
        paused: bool,
    ) -> Urgency {
        let Some(entry) = self.producers.get_mut(producer_id) else {
            return Urgency::None;
        };
        if entry.kind != kind {
            warn!(%producer_id, ?kind, actual = ?entry.kind, "pause/resume kind mismatch");
        }
        if entry.source_paused == paused {
            return Urgency::None;
        }
        entry.source_paused = paused;
        let owner = entry.participant_id.clone();
        self.refresh_media_flags(&owner);
        Urgency::Normal
    }

    fn apply_share_started(
        &mut self,
        producer_id: ProducerId,
        participant_id: ParticipantId,
    ) -> Urgency {
        info!(%producer_id, %participant_id, "screen share started");

        if !self.producers.contains_key(&producer_id) {
            self.producers.insert(
                producer_id.clone(),
                ProducerEntry {
                    participant_id: participant_id.clone(),
                    kind: ProducerKind::Screen,
                    source_paused: false,
                },
            );
            self.producer_order.push(producer_id.clone());
        }

        self.share = Some(ShareState {
            producer_id,
            participant_id: participant_id.clone(),
        });
        self.refresh_media_flags(&participant_id);
        Urgency::Fast
    }

    fn apply_share_stopped(&mut self) -> Urgency {
        let Some(share) = self.share.take() else {
            return Urgency::None;
        };
        info!(producer_id = %share.producer_id, "screen share stopped");
        // The share producer dies with the share; a trailing
        // producer-closed for it becomes a no-op.
        self.producers.remove(&share.producer_id);
        self.producer_order.retain(|id| id != &share.producer_id);
        self.refresh_media_flags(&share.participant_id);
        Urgency::Fast
    }

    /// Re-derive a participant's media flags from their producer entries
    fn refresh_media_flags(&mut self, participant_id: &ParticipantId) {
        let mut video_on = false;
        let mut screen_on = false;
        let mut audio_live = false;

        for entry in self.producers.values() {
            if &entry.participant_id != participant_id || entry.source_paused {
                continue;
            }
            match entry.kind {
                ProducerKind::Video => video_on = true,
                ProducerKind::Screen => screen_on = true,
                ProducerKind::Audio => audio_live = true,
            }
        }

        if let Some(p) = self.participants.get_mut(participant_id) {
            p.video_on = video_on;
            p.screen_share_on = screen_on;
            p.audio_muted = !audio_live;
        }
    }

    /// Current authoritative screen-state snapshot
    pub fn screen_states(&self) -> Vec<ScreenState> {
        let state = match &self.share {
            Some(share) => {
                let admin = self
                    .participants
                    .get(&share.participant_id)
                    .map(|p| p.level.has_room_override())
                    .unwrap_or(false);
                ScreenState {
                    main_screen_person: Some(share.participant_id.clone()),
                    main_screen_filled: true,
                    admin_on_main_screen: admin,
                }
            }
            None => ScreenState::default(),
        };
        vec![state]
    }

    /// Assemble everything one reconciliation pass reads
    ///
    /// Candidate building runs the mixer: live video/screen refs in producer
    /// arrival order (admin stream filtered out), then audio-only
    /// placeholders for roster members without live video.
    pub fn pass_context(&self, config: &LayoutConfig) -> PassContext {
        let mut video_refs = Vec::new();
        for producer_id in &self.producer_order {
            let Some(entry) = self.producers.get(producer_id) else {
                continue;
            };
            if entry.source_paused {
                continue;
            }
            let stream = match entry.kind {
                ProducerKind::Video => StreamRef::Camera {
                    producer_id: producer_id.clone(),
                    participant_id: entry.participant_id.clone(),
                },
                ProducerKind::Screen => StreamRef::Screen {
                    producer_id: producer_id.clone(),
                    participant_id: entry.participant_id.clone(),
                },
                ProducerKind::Audio => continue,
            };
            video_refs.push(stream);
        }
        let video_refs = mixer::filter_videos(video_refs, config.admin_producer_id.as_ref());

        let with_video: HashSet<&ParticipantId> =
            video_refs.iter().map(|s| s.participant_id()).collect();
        let audio_only: Vec<StreamRef> = self
            .roster_order
            .iter()
            .filter(|id| !with_video.contains(id))
            .map(|id| StreamRef::AudioOnly {
                participant_id: id.clone(),
            })
            .collect();

        let roster: Vec<Participant> = self
            .roster_order
            .iter()
            .filter_map(|id| self.participants.get(id))
            .cloned()
            .collect();

        let candidates = mixer::mix_streams(video_refs, audio_only, &roster);

        let sharer = self.share.as_ref().map(|share| StreamRef::Screen {
            producer_id: share.producer_id.clone(),
            participant_id: share.participant_id.clone(),
        });
        let share_is_local = match (&self.share, &self.local_participant) {
            (Some(share), Some(local)) => &share.participant_id == local,
            _ => false,
        };

        PassContext {
            candidates,
            participants: self.participants.clone(),
            loudness: self.loudness.clone(),
            partition: self.partition.clone(),
            viewer_room: self.viewer_room(),
            shared: self.share.is_some() && !share_is_local,
            share_screen_started: share_is_local,
            sharer,
            live_producers: self.producers.keys().cloned().collect(),
            page: self.page,
            previous_render: self.prev_render.clone(),
            screen_states: self.screen_states(),
            prev_active_names: self.prev_active_names.clone(),
            prev_screen_states: self.prev_screen_states.clone(),
        }
    }

    /// Audio producers the throttler should keep resumed
    ///
    /// Audio has no tile requirement: any unmuted, eligible room
    /// participant stays audible regardless of video visibility. Breakout
    /// scoping applies, with the usual host/co-host override.
    pub fn audio_resume_set(&self) -> HashSet<ProducerId> {
        let viewer_room = self.viewer_room();
        self.producers
            .iter()
            .filter(|(_, entry)| entry.kind == ProducerKind::Audio && !entry.source_paused)
            .filter(|(_, entry)| {
                let Some(owner) = self.participants.get(&entry.participant_id) else {
                    return false;
                };
                if !owner.is_eligible() {
                    return false;
                }
                match &self.partition {
                    Some(partition) => partition.visible_to(viewer_room, &owner.id, owner.level),
                    None => true,
                }
            })
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// All producers currently live on the transport layer
    pub fn producer_ids(&self) -> HashSet<ProducerId> {
        self.producers.keys().cloned().collect()
    }

    /// All registered audio producers
    pub fn audio_producers(&self) -> HashSet<ProducerId> {
        self.producers
            .iter()
            .filter(|(_, e)| e.kind == ProducerKind::Audio)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// All registered video/screen producers
    pub fn video_producers(&self) -> HashSet<ProducerId> {
        self.producers
            .iter()
            .filter(|(_, e)| e.kind != ProducerKind::Audio)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Producers that must never be throttled off: the admin stream and the
    /// live share
    pub fn pinned_producers(&self, config: &LayoutConfig) -> Vec<ProducerId> {
        let mut pinned = Vec::new();
        if let Some(admin) = &config.admin_producer_id {
            if self.producers.contains_key(admin) {
                pinned.push(admin.clone());
            }
        }
        if let Some(share) = &self.share {
            if !pinned.contains(&share.producer_id) {
                pinned.push(share.producer_id.clone());
            }
        }
        pinned
    }

    /// Record the snapshots after a propagated pass
    ///
    /// Leaves `page` alone: a pagination request applied while the pass was
    /// in flight must survive into the next pass, and clamping happens
    /// during reconciliation anyway.
    pub fn record_pass(
        &mut self,
        active_names: Vec<String>,
        screen_states: Vec<ScreenState>,
        render: Vec<ProducerId>,
    ) {
        self.prev_active_names = active_names;
        self.prev_screen_states = screen_states;
        self.prev_render = render;
    }
}
