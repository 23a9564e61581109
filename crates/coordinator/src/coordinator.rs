//! The reconciliation coordinator
//!
//! Convergence point of the pipeline: inbound events mutate session state,
//! and `pass()` runs ChangeDetector → StreamSetBuilder → LayoutReconciler →
//! GridPlanner/AdaptiveSizer → TransportThrottler, then reports the new
//! authoritative screen/active state over the signaling sink. Passes are
//! synchronous and cheap; only the throttler's in-flight commands outlive
//! them, guarded by the pass version counter. Nothing here panics or
//! errors across the public boundary once constructed.

use crate::config::CoordinatorConfig;
use crate::events::{RoomEvent, Urgency};
use crate::signaling::{ActiveStateUpdate, SignalingSink};
use crate::state::{PassContext, SessionState};
use crate::transport::{MediaTransport, TransportThrottler};
use crate::Result;
use mediagrid_layout::{
    compare_active_names, compare_screen_states, reconcile, update_mini_cards_grid, AdaptiveSizer,
    ContainerSize, GridPlanner, LayoutConfig, MeetingDisplayType, ParticipantId, ProducerId,
    ReconcileInput, RenderPlan, ScreenState, TileRect,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Notify, RwLock};
use tracing::{debug, info, warn};

/// Adaptive media layout and transport-lifecycle coordinator
///
/// One instance per session. Feed it [`RoomEvent`]s, drive it with the
/// scheduler (or call [`Coordinator::pass`] directly), and hand the
/// returned [`RenderPlan`]s to the presentation layer.
pub struct Coordinator {
    config: RwLock<CoordinatorConfig>,
    state: RwLock<SessionState>,
    planner: parking_lot::Mutex<GridPlanner>,
    sizer: parking_lot::Mutex<AdaptiveSizer>,
    throttler: TransportThrottler,
    sink: Arc<dyn SignalingSink>,
    /// Pass version counter; superseding a pass is the cancellation
    /// mechanism for in-flight transport commands
    version: Arc<AtomicU64>,
    update_requested: Notify,
    session_id: String,
}

impl Coordinator {
    /// Create a new coordinator
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(
        config: CoordinatorConfig,
        transport: Arc<dyn MediaTransport>,
        sink: Arc<dyn SignalingSink>,
    ) -> Result<Self> {
        config.validate()?;

        let session_id = config
            .session_id
            .clone()
            .unwrap_or_else(|| format!("session-{}", uuid::Uuid::new_v4()));

        info!(%session_id, "creating coordinator");

        let version = Arc::new(AtomicU64::new(0));
        let throttler = TransportThrottler::new(transport, Arc::clone(&version));
        let state = SessionState::new(config.container);
        let sizer = AdaptiveSizer::new(config.container);

        Ok(Self {
            config: RwLock::new(config),
            state: RwLock::new(state),
            planner: parking_lot::Mutex::new(GridPlanner::new()),
            sizer: parking_lot::Mutex::new(sizer),
            throttler,
            sink,
            version,
            update_requested: Notify::new(),
            session_id,
        })
    }

    /// The session id carried in outbound updates
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Identify the local participant (breakout scoping, local share)
    pub async fn set_local_participant(&self, id: ParticipantId) {
        self.state.write().await.set_local_participant(id);
    }

    /// Apply one inbound event and schedule the next pass
    ///
    /// Never fails: unknown producers and redundant events degrade to
    /// no-ops. Returns the urgency the event produced.
    pub async fn handle_event(&self, event: RoomEvent) -> Urgency {
        // Handle-registry bookkeeping tracks the transport layer's
        // lifecycle notifications; the throttler never creates handles.
        match &event {
            RoomEvent::NewProducer { producer_id, .. }
            | RoomEvent::ShareStarted { producer_id, .. } => {
                self.throttler.register(producer_id.clone());
            }
            RoomEvent::ProducerClosed { producer_id } => {
                self.throttler.unregister(producer_id);
            }
            _ => {}
        }

        let prune_registry = matches!(
            event,
            RoomEvent::RosterSync { .. } | RoomEvent::ShareStopped
        );

        let urgency = {
            let mut state = self.state.write().await;
            let urgency = state.apply(event);
            if prune_registry {
                self.throttler.retain(&state.producer_ids());
            }
            urgency
        };

        if urgency == Urgency::Fast {
            self.update_requested.notify_one();
        }
        urgency
    }

    /// Request an out-of-cadence pass on the fast interval
    pub fn request_update(&self) {
        self.update_requested.notify_one();
    }

    /// Resolves when a fast pass has been requested
    pub async fn fast_requested(&self) {
        self.update_requested.notified().await;
    }

    /// Current (fast, slow) cadence in milliseconds
    pub async fn intervals(&self) -> (u64, u64) {
        let config = self.config.read().await;
        (config.fast_interval_ms, config.slow_interval_ms)
    }

    /// Replace the layout configuration at runtime
    ///
    /// # Errors
    ///
    /// Returns an error if the new configuration is invalid; the previous
    /// configuration stays in effect.
    pub async fn update_layout_config(&self, layout: LayoutConfig) -> Result<()> {
        layout.validate().map_err(crate::Error::from)?;
        self.config.write().await.layout = layout;
        self.update_requested.notify_one();
        Ok(())
    }

    /// Update the pass cadences at runtime
    ///
    /// The running scheduler picks the new values up on its next
    /// iteration; the notify below makes that iteration happen promptly.
    ///
    /// # Errors
    ///
    /// Returns an error if the intervals violate the floor or ordering
    /// constraints; the previous cadences stay in effect.
    pub async fn set_intervals(&self, fast_interval_ms: u64, slow_interval_ms: u64) -> Result<()> {
        let mut config = self.config.write().await;
        let mut candidate = config.clone();
        candidate.fast_interval_ms = fast_interval_ms;
        candidate.slow_interval_ms = slow_interval_ms;
        candidate.validate()?;
        config.fast_interval_ms = fast_interval_ms;
        config.slow_interval_ms = slow_interval_ms;
        drop(config);
        self.update_requested.notify_one();
        Ok(())
    }

    /// Switch the meeting display type (explicit local call)
    pub async fn set_display_type(&self, mode: MeetingDisplayType) {
        self.handle_event(RoomEvent::DisplayModeChanged { mode }).await;
    }

    /// Request a page (clamped into range during the next pass)
    pub async fn set_page(&self, page: usize) {
        self.handle_event(RoomEvent::PageChanged { page }).await;
    }

    /// Report a container resize
    pub async fn set_container(&self, size: ContainerSize) {
        self.handle_event(RoomEvent::ContainerResized { size }).await;
    }

    /// Run one reconciliation pass
    ///
    /// Returns `None` when the change detector short-circuits (nothing to
    /// render, throttle, or announce), otherwise the new render plan.
    pub async fn pass(&self) -> Option<RenderPlan> {
        self.run_pass(false).await
    }

    /// Run a pass plus the low-frequency pinned-stream sweep
    ///
    /// Used by the scheduler on the slow cadence.
    pub async fn sweep_pass(&self) -> Option<RenderPlan> {
        self.run_pass(true).await
    }

    async fn run_pass(&self, sweep: bool) -> Option<RenderPlan> {
        let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;

        let mut layout_config = {
            let config = self.config.read().await;
            config.layout.clamped()
        };

        // State is read fresh at pass start; nothing below holds it across
        // an await.
        let (ctx, video_scope, audio_scope, audio_eligible, pinned, container) = {
            let state = self.state.read().await;
            if let Some(mode) = state.display_override() {
                layout_config.meeting_display_type = mode;
            }
            (
                state.pass_context(&layout_config),
                state.video_producers(),
                state.audio_producers(),
                state.audio_resume_set(),
                state.pinned_producers(&layout_config),
                state.container(),
            )
        };

        let PassContext {
            candidates,
            participants,
            loudness,
            partition,
            viewer_room,
            shared,
            share_screen_started,
            sharer,
            live_producers,
            page,
            previous_render,
            screen_states,
            prev_active_names,
            prev_screen_states,
        } = ctx;

        let mut plan = {
            let input = ReconcileInput {
                candidates,
                participants: &participants,
                loudness: &loudness,
                partition: partition.as_ref(),
                viewer_room,
                shared,
                share_screen_started,
                sharer: sharer.as_ref(),
                live_producers: &live_producers,
                page,
                previous_render: &previous_render,
                config: &layout_config,
            };
            let mut planner = self.planner.lock();
            reconcile(input, &mut planner)
        };

        let active_names = plan.active_names(&participants);
        let names_changed = compare_active_names(&active_names, &prev_active_names);
        let screens_changed = compare_screen_states(&screen_states, &prev_screen_states);

        if !names_changed && !screens_changed && plan.added.is_empty() && plan.removed.is_empty() {
            if !sweep {
                debug!(version, "no change detected, pass short-circuited");
                return None;
            }
            // Sweep passes still run the peripheral resume path below.
        }

        // Sizing: fractions from the adaptive heuristics, then concrete
        // per-tile bounds within the split regions.
        {
            let mut sizer = self.sizer.lock();
            sizer.set_container(container);
            sizer.readjust(
                plan.render_set.len(),
                layout_config.event_type,
                share_screen_started,
                shared,
            );
            let (primary, secondary) = sizer.regions();
            apply_tile_rects(&mut plan, primary, secondary);
        }

        // Throttling: resumed video producers are exactly the render set
        // plus the pinned (admin/host, live share) streams.
        let mut active_video: HashSet<ProducerId> = plan.render_producers().into_iter().collect();
        active_video.extend(pinned.iter().cloned());
        self.throttler
            .process_consumer_transports(&video_scope, &active_video, version);
        self.throttler
            .process_consumer_transports_audio(&audio_scope, &audio_eligible, version);
        if sweep {
            self.throttler.resume_pause_streams(&pinned, version);
            self.throttler
                .resume_pause_audio_streams(&audio_scope, &audio_eligible, version);
        }

        if names_changed || screens_changed {
            self.emit_active_state(active_names.clone(), screen_states.clone());
        }

        self.state
            .write()
            .await
            .record_pass(active_names, screen_states, plan.render_producers());

        debug!(version, rendered = plan.render_set.len(), "pass complete");
        Some(plan)
    }

    /// Best-effort emission with a single retry
    fn emit_active_state(&self, active_names: Vec<String>, screen_states: Vec<ScreenState>) {
        let update = ActiveStateUpdate {
            session_id: self.session_id.clone(),
            active_names,
            screen_states,
        };

        if let Err(first) = self.sink.emit(update.clone()) {
            if first.is_retryable() {
                if let Err(second) = self.sink.emit(update) {
                    warn!(error = %second, "active-state emission failed twice");
                }
            } else {
                warn!(error = %first, "active-state emission failed");
            }
        }
    }

    /// Wait until no transport commands are in flight (shutdown, tests)
    pub async fn wait_transport_idle(&self) {
        self.throttler.wait_idle().await;
    }

    /// Assumed pause state of a handle, if tracked
    pub fn handle_state(&self, producer_id: &ProducerId) -> Option<crate::transport::HandleState> {
        self.throttler.handle_state(producer_id)
    }
}

/// Fill tile rects: pinned primary tile spans the primary region, alt tiles
/// grid into the secondary region, a plain grid fills the primary region.
fn apply_tile_rects(plan: &mut RenderPlan, primary: TileRect, secondary: TileRect) {
    let has_alt = plan.tiles.iter().any(|t| t.alt_grid);

    if has_alt {
        let mut alt_rects = update_mini_cards_grid(&plan.grid, secondary, true).into_iter();
        for tile in plan.tiles.iter_mut() {
            tile.rect = if tile.alt_grid {
                alt_rects.next()
            } else {
                Some(primary)
            };
        }
    } else {
        let rects = update_mini_cards_grid(&plan.grid, primary, false);
        for (tile, rect) in plan.tiles.iter_mut().zip(rects) {
            tile.rect = Some(rect);
        }
    }
}
