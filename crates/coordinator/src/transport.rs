//! Transport throttling
//!
//! Pauses and resumes consume-side transport handles so only the streams in
//! the current render set are actively decoded. Handles are owned by the
//! transport layer; this module only mirrors their assumed pause state and
//! issues commands. Commands are fire-and-forget async round-trips: each
//! captures the pass version it was issued under, and a result lands only
//! while that version is still current. Superseding a pass is the
//! cancellation mechanism; there are no locks and no timeouts.

use crate::{Error, Result};
use dashmap::DashMap;
use mediagrid_layout::ProducerId;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Collaborator that executes pause/resume against the media transport
#[async_trait::async_trait]
pub trait MediaTransport: Send + Sync {
    /// Pause decoding of the given producer
    async fn pause(&self, producer_id: &ProducerId) -> Result<()>;

    /// Resume decoding of the given producer
    async fn resume(&self, producer_id: &ProducerId) -> Result<()>;
}

/// Assumed consume-side state of one handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandleState {
    /// Whether the handle is assumed paused
    pub paused: bool,
}

/// Pause/resume engine keyed to the pass version counter
pub struct TransportThrottler {
    transport: Arc<dyn MediaTransport>,
    handles: Arc<DashMap<ProducerId, HandleState>>,
    /// Current pass version, shared with the coordinator
    version: Arc<AtomicU64>,
    in_flight: Arc<AtomicUsize>,
}

impl TransportThrottler {
    /// Create a throttler issuing commands to `transport`
    ///
    /// `version` is the coordinator's pass version counter; commands issued
    /// under an older version discard their results on completion.
    pub fn new(transport: Arc<dyn MediaTransport>, version: Arc<AtomicU64>) -> Self {
        Self {
            transport,
            handles: Arc::new(DashMap::new()),
            version,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Track a handle created by the transport layer
    ///
    /// New consumers start paused until a pass resumes them.
    pub fn register(&self, producer_id: ProducerId) {
        self.handles
            .entry(producer_id)
            .or_insert(HandleState { paused: true });
    }

    /// Stop tracking a closed handle
    pub fn unregister(&self, producer_id: &ProducerId) {
        self.handles.remove(producer_id);
    }

    /// Drop every handle not in `keep` (roster sync pruned its producers)
    pub fn retain(&self, keep: &HashSet<ProducerId>) {
        self.handles.retain(|id, _| keep.contains(id));
    }

    /// Assumed state of a handle, if tracked
    pub fn handle_state(&self, producer_id: &ProducerId) -> Option<HandleState> {
        self.handles.get(producer_id).map(|h| *h.value())
    }

    /// Number of tracked handles
    pub fn handle_count(&self) -> usize {
        self.handles.len()
    }

    /// Reconcile video handles against the render set
    ///
    /// Every handle in `scope` is driven toward: resumed when its producer
    /// is in `active`, paused otherwise. Commands are only issued when the
    /// assumed state differs, so an unchanged pass issues nothing.
    pub fn process_consumer_transports(
        &self,
        scope: &HashSet<ProducerId>,
        active: &HashSet<ProducerId>,
        version: u64,
    ) {
        for producer_id in scope {
            let desired_paused = !active.contains(producer_id);
            self.drive(producer_id, desired_paused, version);
        }
    }

    /// Reconcile audio handles: always-resume for the eligible set
    ///
    /// Audio has no tile requirement; eligibility is decided by the caller
    /// (unmuted, same breakout room or override).
    pub fn process_consumer_transports_audio(
        &self,
        scope: &HashSet<ProducerId>,
        eligible: &HashSet<ProducerId>,
        version: u64,
    ) {
        for producer_id in scope {
            let desired_paused = !eligible.contains(producer_id);
            self.drive(producer_id, desired_paused, version);
        }
    }

    /// Low-frequency sweep forcing the pinned streams (admin/host, live
    /// share) to stay resumed regardless of grid membership
    pub fn resume_pause_streams(&self, pinned: &[ProducerId], version: u64) {
        for producer_id in pinned {
            self.drive(producer_id, false, version);
        }
    }

    /// Low-frequency audio sweep, same decision as the per-pass path
    pub fn resume_pause_audio_streams(
        &self,
        scope: &HashSet<ProducerId>,
        eligible: &HashSet<ProducerId>,
        version: u64,
    ) {
        self.process_consumer_transports_audio(scope, eligible, version);
    }

    /// Issue one pause/resume command if the assumed state differs
    fn drive(&self, producer_id: &ProducerId, desired_paused: bool, version: u64) {
        let Some(current) = self.handle_state(producer_id) else {
            // Stale reference: the handle closed mid-pass. Dropped, not an
            // error.
            debug!(%producer_id, "skipping command for untracked handle");
            return;
        };
        if current.paused == desired_paused {
            return;
        }

        let transport = Arc::clone(&self.transport);
        let handles = Arc::clone(&self.handles);
        let current_version = Arc::clone(&self.version);
        let in_flight = Arc::clone(&self.in_flight);
        let producer_id = producer_id.clone();

        in_flight.fetch_add(1, Ordering::SeqCst);
        tokio::spawn(async move {
            let result = Self::issue(transport.as_ref(), &producer_id, desired_paused).await;

            match result {
                Ok(()) => {
                    // Stale (superseded) results are discarded; the newer
                    // pass has already re-decided this handle.
                    if version >= current_version.load(Ordering::SeqCst) {
                        if let Some(mut handle) = handles.get_mut(&producer_id) {
                            handle.paused = desired_paused;
                        }
                    } else {
                        debug!(%producer_id, version, "discarding stale command result");
                    }
                }
                Err(e) => {
                    // Assumed state left unchanged: prefer an over-active
                    // stream to a silently-dropped one.
                    warn!(%producer_id, desired_paused, error = %e, "transport command failed twice");
                }
            }

            in_flight.fetch_sub(1, Ordering::SeqCst);
        });
    }

    /// One command with a single immediate retry
    async fn issue(
        transport: &dyn MediaTransport,
        producer_id: &ProducerId,
        desired_paused: bool,
    ) -> Result<()> {
        let first = Self::send(transport, producer_id, desired_paused).await;
        match first {
            Ok(()) => Ok(()),
            Err(e) if e.is_retryable() => {
                debug!(%producer_id, error = %e, "transport command failed, retrying once");
                Self::send(transport, producer_id, desired_paused).await
            }
            Err(e) => Err(e),
        }
    }

    async fn send(
        transport: &dyn MediaTransport,
        producer_id: &ProducerId,
        desired_paused: bool,
    ) -> Result<()> {
        if desired_paused {
            transport.pause(producer_id).await
        } else {
            transport.resume(producer_id).await
        }
    }

    /// Wait until no commands are in flight
    ///
    /// Used on shutdown and by tests; the event loop itself never blocks on
    /// outstanding commands.
    pub async fn wait_idle(&self) {
        while self.in_flight.load(Ordering::SeqCst) > 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }
}
