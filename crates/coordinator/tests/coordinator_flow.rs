//! End-to-end coordinator flows: events in, render plans and transport
//! commands out, active-state updates over the signaling sink.

use mediagrid_coordinator::{
    BroadcastSink, Coordinator, CoordinatorConfig, MediaTransport, ProducerKind, Result, RoomEvent,
};
use mediagrid_layout::{Participant, ParticipantId, ParticipantLevel, ProducerId, StreamKind};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Records every command; optionally fails the first N calls.
struct RecordingTransport {
    calls: Mutex<Vec<(ProducerId, bool)>>,
    fail_remaining: Mutex<usize>,
}

impl RecordingTransport {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            fail_remaining: Mutex::new(0),
        })
    }

    fn calls(&self) -> Vec<(ProducerId, bool)> {
        self.calls.lock().clone()
    }

    fn should_fail_this_call(&self) -> bool {
        let mut remaining = self.fail_remaining.lock();
        if *remaining > 0 {
            *remaining -= 1;
            true
        } else {
            false
        }
    }
}

#[async_trait::async_trait]
impl MediaTransport for RecordingTransport {
    async fn pause(&self, producer_id: &ProducerId) -> Result<()> {
        if self.should_fail_this_call() {
            return Err(mediagrid_coordinator::Error::TransportError(
                "injected pause failure".to_string(),
            ));
        }
        self.calls.lock().push((producer_id.clone(), true));
        Ok(())
    }

    async fn resume(&self, producer_id: &ProducerId) -> Result<()> {
        if self.should_fail_this_call() {
            return Err(mediagrid_coordinator::Error::TransportError(
                "injected resume failure".to_string(),
            ));
        }
        self.calls.lock().push((producer_id.clone(), false));
        Ok(())
    }
}

fn setup() -> (
    Arc<Coordinator>,
    Arc<RecordingTransport>,
    broadcast::Receiver<mediagrid_coordinator::ActiveStateUpdate>,
) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    let transport = RecordingTransport::new();
    let (sink, rx) = BroadcastSink::with_default_capacity();
    let coordinator = Coordinator::new(
        CoordinatorConfig::default(),
        transport.clone(),
        Arc::new(sink),
    )
    .expect("default config is valid");
    (Arc::new(coordinator), transport, rx)
}

async fn join(coordinator: &Coordinator, n: usize) {
    coordinator
        .handle_event(RoomEvent::RosterSync {
            participants: (0..n)
                .map(|i| Participant::attendee(format!("user-{i}"), format!("User {i}")))
                .collect(),
        })
        .await;
    for i in 0..n {
        coordinator
            .handle_event(RoomEvent::NewProducer {
                producer_id: ProducerId::new(format!("prod-{i}")),
                participant_id: ParticipantId::new(format!("user-{i}")),
                kind: ProducerKind::Video,
                level: ParticipantLevel::Attendee,
            })
            .await;
    }
}

#[tokio::test]
async fn test_pagination_flow() {
    // 7 cameras with the default limit of 4: page 0 holds 4 in a 2x2
    // grid, page 1 holds the remaining 3 on one merged row.
    let (coordinator, _transport, _rx) = setup();
    join(&coordinator, 7).await;

    let plan = coordinator.pass().await.expect("initial pass renders");
    assert_eq!(plan.render_set.len(), 4);
    assert_eq!((plan.grid.rows, plan.grid.cols), (2, 2));
    assert!(plan.do_paginate);
    assert_eq!(plan.total_pages, 2);

    coordinator.set_page(1).await;
    let plan = coordinator.pass().await.expect("page change renders");
    assert_eq!(plan.page, 1);
    assert_eq!(plan.render_set.len(), 3);
    assert_eq!(plan.grid.last_row_cols, 3);
}

#[tokio::test]
async fn test_share_flow_pins_and_unpins() {
    let (coordinator, _transport, _rx) = setup();
    join(&coordinator, 5).await;
    coordinator.pass().await;

    coordinator
        .handle_event(RoomEvent::ShareStarted {
            producer_id: ProducerId::from("prod-share"),
            participant_id: ParticipantId::from("user-2"),
        })
        .await;

    let plan = coordinator.pass().await.expect("share changes layout");
    assert_eq!(plan.render_set[0].kind(), StreamKind::Screen);
    assert_eq!(plan.render_set[0].participant_id().as_str(), "user-2");
    // screen_page_limit = 2: sharer plus one alt tile.
    assert_eq!(plan.render_set.len(), 2);
    assert!(plan.alt_grid_active);

    coordinator.handle_event(RoomEvent::ShareStopped).await;
    let plan = coordinator.pass().await.expect("share end changes layout");
    assert!(plan
        .render_set
        .iter()
        .all(|s| s.kind() != StreamKind::Screen));
    assert_eq!(plan.render_set.len(), 4);
}

#[tokio::test]
async fn test_transport_converges_to_render_set() {
    let (coordinator, transport, _rx) = setup();
    join(&coordinator, 6).await;

    let plan = coordinator.pass().await.expect("pass renders");
    coordinator.wait_transport_idle().await;

    let rendered: HashSet<ProducerId> = plan.render_producers().into_iter().collect();
    for i in 0..6 {
        let id = ProducerId::new(format!("prod-{i}"));
        let paused = coordinator.handle_state(&id).expect("tracked").paused;
        assert_eq!(paused, !rendered.contains(&id));
    }

    // A quiescent second pass short-circuits and issues nothing.
    let before = transport.calls().len();
    assert!(coordinator.pass().await.is_none());
    coordinator.wait_transport_idle().await;
    assert_eq!(transport.calls().len(), before);
}

#[tokio::test]
async fn test_sweep_pass_reissues_nothing_when_converged() {
    let (coordinator, transport, _rx) = setup();
    join(&coordinator, 3).await;

    coordinator.pass().await;
    coordinator.wait_transport_idle().await;
    let before = transport.calls().len();

    // The sweep runs the peripheral resume path but assumed state already
    // matches, so no commands go out.
    coordinator.sweep_pass().await;
    coordinator.wait_transport_idle().await;
    assert_eq!(transport.calls().len(), before);
}

#[tokio::test]
async fn test_retry_once_recovers_from_transient_failure() {
    let (coordinator, transport, _rx) = setup();
    *transport.fail_remaining.lock() = 1;
    join(&coordinator, 2).await;

    coordinator.pass().await;
    coordinator.wait_transport_idle().await;

    // Both producers resumed despite the injected first failure.
    for i in 0..2 {
        let id = ProducerId::new(format!("prod-{i}"));
        assert!(!coordinator.handle_state(&id).expect("tracked").paused);
    }
}

#[tokio::test]
async fn test_breakout_restricts_and_roster_prunes() {
    let (coordinator, _transport, _rx) = setup();
    join(&coordinator, 4).await;
    coordinator
        .set_local_participant(ParticipantId::from("user-0"))
        .await;

    coordinator
        .handle_event(RoomEvent::BreakoutUpdated {
            rooms: vec![
                vec![ParticipantId::from("user-0"), ParticipantId::from("user-1")],
                vec![ParticipantId::from("user-2"), ParticipantId::from("user-3")],
            ],
            started: true,
            ended: false,
        })
        .await;

    let plan = coordinator.pass().await.expect("breakout changes layout");
    let rendered: Vec<&str> = plan
        .render_set
        .iter()
        .map(|s| s.participant_id().as_str())
        .collect();
    assert_eq!(rendered, vec!["user-0", "user-1"]);

    // A roster sync without user-3 drops their producer handle.
    coordinator
        .handle_event(RoomEvent::RosterSync {
            participants: (0..3)
                .map(|i| Participant::attendee(format!("user-{i}"), format!("User {i}")))
                .collect(),
        })
        .await;
    assert!(coordinator
        .handle_state(&ProducerId::from("prod-3"))
        .is_none());
}

#[tokio::test]
async fn test_emissions_only_on_change() {
    let (coordinator, _transport, mut rx) = setup();
    join(&coordinator, 2).await;

    coordinator.pass().await;
    coordinator.pass().await;
    coordinator.sweep_pass().await;

    let update = rx.recv().await.expect("one update emitted");
    assert_eq!(
        update.active_names,
        vec!["User 0".to_string(), "User 1".to_string()]
    );
    assert!(matches!(
        rx.try_recv(),
        Err(broadcast::error::TryRecvError::Empty)
    ));
}

#[tokio::test]
async fn test_reorder_without_membership_change_short_circuits() {
    // All three fit on one page; louder audio reorders the candidates but
    // membership (and therefore the name snapshot) is unchanged, so the
    // pass propagates nothing.
    let (coordinator, transport, _rx) = setup();
    join(&coordinator, 3).await;
    coordinator.pass().await;
    coordinator.wait_transport_idle().await;
    let before = transport.calls().len();

    for _ in 0..5 {
        coordinator
            .handle_event(RoomEvent::AudioLevels {
                levels: vec![(ParticipantId::from("user-2"), 0.8)],
            })
            .await;
    }

    assert!(coordinator.pass().await.is_none());
    coordinator.wait_transport_idle().await;
    assert_eq!(transport.calls().len(), before);
}

#[tokio::test]
async fn test_breakout_move_drops_and_pauses_the_mover() {
    let (coordinator, transport, _rx) = setup();
    join(&coordinator, 3).await;
    coordinator
        .set_local_participant(ParticipantId::from("user-0"))
        .await;
    coordinator
        .handle_event(RoomEvent::BreakoutUpdated {
            rooms: vec![
                vec![ParticipantId::from("user-0"), ParticipantId::from("user-1")],
                vec![ParticipantId::from("user-2")],
            ],
            started: true,
            ended: false,
        })
        .await;
    coordinator.pass().await;
    coordinator.wait_transport_idle().await;

    // user-1 moves to the other room mid-session.
    coordinator
        .handle_event(RoomEvent::BreakoutUpdated {
            rooms: vec![
                vec![ParticipantId::from("user-0")],
                vec![ParticipantId::from("user-1"), ParticipantId::from("user-2")],
            ],
            started: true,
            ended: false,
        })
        .await;
    let before = transport.calls().len();
    let plan = coordinator.pass().await.expect("room move changes layout");
    coordinator.wait_transport_idle().await;

    assert!(plan
        .render_set
        .iter()
        .all(|s| s.participant_id().as_str() != "user-1"));
    assert!(coordinator
        .handle_state(&ProducerId::from("prod-1"))
        .expect("still tracked")
        .paused);
    // No resume was issued for the mover after the move.
    let resumes_after = transport.calls()[before..]
        .iter()
        .filter(|(id, paused)| !*paused && *id == ProducerId::from("prod-1"))
        .count();
    assert_eq!(resumes_after, 0);
}

#[tokio::test]
async fn test_audio_levels_reorder_grid() {
    let (coordinator, _transport, _rx) = setup();
    join(&coordinator, 6).await;
    coordinator.pass().await;

    // Push user-5 loud enough to claim a page-0 slot.
    for _ in 0..10 {
        coordinator
            .handle_event(RoomEvent::AudioLevels {
                levels: vec![(ParticipantId::from("user-5"), 0.9)],
            })
            .await;
    }

    let plan = coordinator.pass().await.expect("reorder changes layout");
    assert_eq!(plan.render_set[0].participant_id().as_str(), "user-5");
}
