//! Layout reconciliation
//!
//! The central engine: given the candidate list, pagination limits,
//! breakout-room membership, and display mode, computes the authoritative
//! render set, its grid, and explicit add/remove instructions for the
//! transport throttler. A pass never aborts due to one bad entry; stale
//! refs are dropped silently before slicing, and the render-set bound is
//! defensively enforced at construction.

use crate::config::{LayoutConfig, MeetingDisplayType};
use crate::grid::{GridPlanner, GridSpec};
use crate::mixer::add_videos_grid;
use crate::participant::{BreakoutPartition, Participant};
use crate::stream::{ParticipantId, ProducerId, StreamRef, TileDescriptor};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Inputs to one reconciliation pass
///
/// Collaborator state is borrowed, read at pass start, and never cached
/// across an async boundary.
pub struct ReconcileInput<'a> {
    /// Ordered candidate set from the mixer
    pub candidates: Vec<StreamRef>,
    /// Latest roster, keyed by participant id
    pub participants: &'a HashMap<ParticipantId, Participant>,
    /// Smoothed recent loudness per participant
    pub loudness: &'a HashMap<ParticipantId, f64>,
    /// Breakout partition, when breakout rooms exist
    pub partition: Option<&'a BreakoutPartition>,
    /// The local viewer's room assignment
    pub viewer_room: Option<u32>,
    /// Whether a remote screen-share is live
    pub shared: bool,
    /// Whether the local participant is sharing
    pub share_screen_started: bool,
    /// The sharer's screen ref, pinned to the primary tile when live
    pub sharer: Option<&'a StreamRef>,
    /// Producers currently live on the transport layer
    pub live_producers: &'a HashSet<ProducerId>,
    /// Requested page index
    pub page: usize,
    /// Producer ids rendered by the previous pass
    pub previous_render: &'a [ProducerId],
    /// Layout configuration
    pub config: &'a LayoutConfig,
}

/// Output of one reconciliation pass
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPlan {
    /// The authoritative render set, primary tile first when pinned
    pub render_set: Vec<StreamRef>,
    /// Grid geometry for the render set
    pub grid: GridSpec,
    /// Producers newly rendered by this pass, in render order
    pub added: Vec<ProducerId>,
    /// Producers no longer rendered, in previous-render order
    pub removed: Vec<ProducerId>,
    /// Ordered tile sequence for the presentation layer
    pub tiles: Vec<TileDescriptor>,
    /// Whether the alt (screen-share-adjacent) grid remains visible
    pub alt_grid_active: bool,
    /// Whether the candidate set spans more than one page
    pub do_paginate: bool,
    /// Page index actually rendered (clamped)
    pub page: usize,
    /// Total page count (at least 1)
    pub total_pages: usize,
}

impl RenderPlan {
    /// Producer ids present in the render set, in render order
    pub fn render_producers(&self) -> Vec<ProducerId> {
        self.render_set
            .iter()
            .filter_map(|s| s.producer_id().cloned())
            .collect()
    }

    /// Display names of rendered participants, used as the active snapshot
    pub fn active_names(&self, participants: &HashMap<ParticipantId, Participant>) -> Vec<String> {
        self.render_set
            .iter()
            .filter_map(|s| participants.get(s.participant_id()))
            .map(|p| p.display_name.clone())
            .collect()
    }
}

/// Run one reconciliation pass
pub fn reconcile(input: ReconcileInput<'_>, planner: &mut GridPlanner) -> RenderPlan {
    let config = input.config.clamped();

    let mut candidates = input.candidates;
    drop_stale(&mut candidates, input.live_producers);
    filter_eligible(&mut candidates, input.participants, config.meeting_display_type);
    restrict_to_room(
        &mut candidates,
        input.partition,
        input.viewer_room,
        input.participants,
    );

    // The sharer is pinned only while their producer is still live; a
    // share whose producer closed mid-pass degrades to normal layout.
    let pinned = input.sharer.filter(|s| {
        s.producer_id()
            .is_some_and(|p| input.live_producers.contains(p))
    });
    let share_active = (input.shared || input.share_screen_started) && pinned.is_some();

    if let Some(sharer) = pinned {
        candidates.retain(|c| c.participant_id() != sharer.participant_id());
    }

    if !share_active && config.sort_audio_loudness {
        sort_by_loudness(&mut candidates, input.loudness);
    }

    let limit = config.page_limit(share_active);

    let (render_set, do_paginate, page, total_pages) = if share_active {
        paginate_shared(pinned, candidates, limit, input.page)
    } else {
        paginate(candidates, limit, input.page)
    };

    // Invariant: the render set never exceeds the page limit. Truncation
    // here covers logic defects upstream rather than surfacing them.
    let mut render_set = render_set;
    if render_set.len() > limit {
        warn!(
            len = render_set.len(),
            limit, "render set exceeded page limit, truncating"
        );
        render_set.truncate(limit);
    }

    let (grid, tiles, alt_grid_active) = if share_active {
        let others = &render_set[1..];
        let grid = planner.plan(others.len());
        let (tiles, alt_active) = add_videos_grid(&render_set[..1], others, &grid);
        (grid, tiles, alt_active)
    } else {
        let grid = planner.plan(render_set.len());
        let (tiles, alt_active) = add_videos_grid(&render_set, &[], &grid);
        (grid, tiles, alt_active)
    };

    let new_producers: Vec<ProducerId> = render_set
        .iter()
        .filter_map(|s| s.producer_id().cloned())
        .collect();
    let (added, removed) = diff_render(&new_producers, input.previous_render);

    debug!(
        rendered = render_set.len(),
        added = added.len(),
        removed = removed.len(),
        page,
        total_pages,
        share_active,
        "reconciliation pass complete"
    );

    RenderPlan {
        render_set,
        grid,
        added,
        removed,
        tiles,
        alt_grid_active,
        do_paginate,
        page,
        total_pages,
    }
}

/// Drop refs whose producer closed mid-pass
fn drop_stale(candidates: &mut Vec<StreamRef>, live: &HashSet<ProducerId>) {
    candidates.retain(|c| match c.producer_id() {
        Some(producer) => {
            let alive = live.contains(producer);
            if !alive {
                debug!(%producer, "dropping stale ref");
            }
            alive
        }
        None => true,
    });
}

/// Drop banned/suspended owners and apply the display-mode filter
fn filter_eligible(
    candidates: &mut Vec<StreamRef>,
    participants: &HashMap<ParticipantId, Participant>,
    display: MeetingDisplayType,
) {
    candidates.retain(|c| {
        let Some(owner) = participants.get(c.participant_id()) else {
            return false;
        };
        if !owner.is_eligible() {
            return false;
        }
        match display {
            MeetingDisplayType::Video => !c.is_placeholder(),
            MeetingDisplayType::Media => !c.is_placeholder() || owner.has_live_media(),
            MeetingDisplayType::All => true,
        }
    });
}

/// Restrict to same-room participants, host/co-host override included
fn restrict_to_room(
    candidates: &mut Vec<StreamRef>,
    partition: Option<&BreakoutPartition>,
    viewer_room: Option<u32>,
    participants: &HashMap<ParticipantId, Participant>,
) {
    let Some(partition) = partition else {
        return;
    };
    if !partition.is_active() {
        return;
    }

    candidates.retain(|c| {
        participants
            .get(c.participant_id())
            .map(|p| partition.visible_to(viewer_room, &p.id, p.level))
            .unwrap_or(false)
    });
}

/// Stable sort by descending smoothed loudness
///
/// Equal scores keep their insertion order: the tie-break is documented as
/// stable rather than guessed.
fn sort_by_loudness(candidates: &mut [StreamRef], loudness: &HashMap<ParticipantId, f64>) {
    candidates.sort_by(|a, b| {
        let la = loudness.get(a.participant_id()).copied().unwrap_or(0.0);
        let lb = loudness.get(b.participant_id()).copied().unwrap_or(0.0);
        lb.partial_cmp(&la).unwrap_or(std::cmp::Ordering::Equal)
    });
}

/// Slice the candidate set into fixed-size pages
fn paginate(
    candidates: Vec<StreamRef>,
    limit: usize,
    page: usize,
) -> (Vec<StreamRef>, bool, usize, usize) {
    let total_pages = candidates.len().div_ceil(limit).max(1);
    let page = page.min(total_pages - 1);
    let do_paginate = candidates.len() > limit;

    let start = page * limit;
    let render: Vec<StreamRef> = candidates.into_iter().skip(start).take(limit).collect();

    (render, do_paginate, page, total_pages)
}

/// Sharer pinned first, remaining slots paged through the other candidates
fn paginate_shared(
    pinned: Option<&StreamRef>,
    others: Vec<StreamRef>,
    limit: usize,
    page: usize,
) -> (Vec<StreamRef>, bool, usize, usize) {
    let slots = limit.saturating_sub(1).max(1);
    let total_pages = others.len().div_ceil(slots).max(1);
    let page = page.min(total_pages - 1);
    let do_paginate = others.len() > slots;

    let mut render = Vec::with_capacity(limit);
    if let Some(sharer) = pinned {
        render.push(sharer.clone());
    }
    let start = page * slots;
    render.extend(
        others
            .into_iter()
            .skip(start)
            .take(limit.saturating_sub(render.len())),
    );

    (render, do_paginate, page, total_pages)
}

/// Explicit add/remove lists against the previous render set
fn diff_render(new: &[ProducerId], previous: &[ProducerId]) -> (Vec<ProducerId>, Vec<ProducerId>) {
    let prev_set: HashSet<_> = previous.iter().collect();
    let new_set: HashSet<_> = new.iter().collect();

    let added = new
        .iter()
        .filter(|p| !prev_set.contains(*p))
        .cloned()
        .collect();
    let removed = previous
        .iter()
        .filter(|p| !new_set.contains(*p))
        .cloned()
        .collect();

    (added, removed)
}
