//! Controller scenarios: startup barrier, dispatch, readiness edges.

mod support;

use tokio::time::{Duration, Instant};

use support::{FakeSession, FakeState};
use wearcheck_fleet::{BotController, ControllerEvent, InspectError};
use wearcheck_session::{SessionError, SessionEvent};

fn controller() -> BotController {
    BotController::new(support::settings(), support::fixed_totp())
}

#[tokio::test(start_paused = true)]
async fn cold_start_emits_ready_exactly_once() {
    let controller = controller();
    let mut events = controller.take_events().await.unwrap();

    let (session, _handle) = FakeSession::new();
    controller.add_bot(support::creds("acc00"), Box::new(session)).await;
    controller
        .wait_for_initialization_within(Duration::from_secs(60))
        .await;
    support::wait_until(|| controller.ready_count() == 1).await;

    // The barrier resolves on the first concluded attempt, so the
    // completion event precedes the readiness edge.
    assert!(matches!(
        events.recv().await,
        Some(ControllerEvent::InitializationComplete)
    ));
    assert!(matches!(events.recv().await, Some(ControllerEvent::Ready)));
    // No duplicate ready edge.
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
    assert!(events.try_recv().is_err());

    let status = controller.status();
    assert_eq!(status.len(), 1);
    assert_eq!(status[0].username, "acc00");
    assert!(status[0].ready);
    assert!(!status[0].busy);
}

#[tokio::test(start_paused = true)]
async fn take_events_only_once() {
    let controller = controller();
    assert!(controller.take_events().await.is_some());
    assert!(controller.take_events().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn initialization_completes_when_every_bot_has_tried() {
    let controller = controller();
    let mut events = controller.take_events().await.unwrap();

    for name in ["acc00", "acc01"] {
        let (session, handle) = FakeSession::new();
        handle.script_logon([Err(SessionError::new("InvalidPassword"))]);
        controller.add_bot(support::creds(name), Box::new(session)).await;
    }

    let started = Instant::now();
    controller
        .wait_for_initialization_within(Duration::from_secs(300))
        .await;
    // Resolved by the all-attempted arm, not the timeout.
    assert!(started.elapsed() < Duration::from_secs(300));
    assert_eq!(controller.ready_count(), 0);

    // Let the second bot's failure drain into the event queue.
    for _ in 0..50 {
        tokio::task::yield_now().await;
    }

    let mut failures = 0;
    let mut complete = 0;
    while let Ok(event) = events.try_recv() {
        match event {
            ControllerEvent::LoginFailed { username, .. } => {
                assert!(username.starts_with("acc"));
                failures += 1;
            }
            ControllerEvent::InitializationComplete => complete += 1,
            ControllerEvent::Ready | ControllerEvent::Unready => {
                panic!("no readiness edges expected")
            }
            ControllerEvent::GcReconnectFailed { .. } => {
                panic!("no GC events expected")
            }
        }
    }
    assert_eq!(failures, 2);
    assert_eq!(complete, 1);
}

#[tokio::test(start_paused = true)]
async fn initialization_times_out_with_an_empty_pool() {
    let controller = controller();
    let started = Instant::now();
    controller
        .wait_for_initialization_within(Duration::from_secs(1))
        .await;
    assert!(started.elapsed() >= Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn lookup_fails_fast_without_free_bots() {
    let controller = controller();
    assert_eq!(
        controller.lookup_inspect(support::test_link()).await,
        Err(InspectError::NoBotsAvailable)
    );
}

#[tokio::test(start_paused = true)]
async fn lookup_routes_through_a_free_ready_bot() {
    let controller = std::sync::Arc::new(controller());
    let (session_a, handle_a) = FakeSession::new();
    let (session_b, handle_b) = FakeSession::new();
    controller.add_bot(support::creds("acc00"), Box::new(session_a)).await;
    controller.add_bot(support::creds("acc01"), Box::new(session_b)).await;
    controller
        .wait_for_initialization_within(Duration::from_secs(60))
        .await;
    support::wait_until(|| controller.ready_count() == 2).await;

    let lookup = tokio::spawn({
        let controller = controller.clone();
        let link = support::test_link();
        async move { controller.lookup_inspect(link).await }
    });

    // One of the two bots got the RPC; answer it.
    support::wait_until(|| handle_a.inspect_count() + handle_b.inspect_count() == 1).await;
    let served_by = if handle_a.inspect_count() == 1 {
        &handle_a
    } else {
        &handle_b
    };
    served_by.emit_item(6768147729).await;

    let info = lookup.await.unwrap().unwrap();
    assert_eq!(info.item_id, 6768147729);
    assert_eq!(info.a, "6768147729");
}

#[tokio::test(start_paused = true)]
async fn gc_flap_produces_single_unready_and_ready_edges() {
    let controller = controller();
    let mut events = controller.take_events().await.unwrap();

    let (session, handle) = FakeSession::new();
    controller.add_bot(support::creds("acc00"), Box::new(session)).await;
    controller
        .wait_for_initialization_within(Duration::from_secs(60))
        .await;
    assert!(matches!(
        events.recv().await,
        Some(ControllerEvent::InitializationComplete)
    ));
    assert!(matches!(events.recv().await, Some(ControllerEvent::Ready)));

    handle
        .emit(SessionEvent::DisconnectedFromGc {
            reason: "GC going down".into(),
        })
        .await;
    assert!(matches!(events.recv().await, Some(ControllerEvent::Unready)));
    support::wait_until(|| controller.status()[0].gc_attempt == 1).await;

    // Reattach completes on the backoff ladder; exactly one new edge.
    assert!(matches!(events.recv().await, Some(ControllerEvent::Ready)));
    support::wait_until(|| controller.status()[0].gc_attempt == 0).await;
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
    assert!(events.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn destroy_cascades_to_every_bot() {
    let controller = controller();
    let (session_a, handle_a) = FakeSession::new();
    let (session_b, handle_b) = FakeSession::new();
    controller.add_bot(support::creds("acc00"), Box::new(session_a)).await;
    controller.add_bot(support::creds("acc01"), Box::new(session_b)).await;
    controller
        .wait_for_initialization_within(Duration::from_secs(60))
        .await;

    controller.destroy().await;
    assert_eq!(handle_a.with_state(|s| s.logoffs), 1);
    assert_eq!(handle_b.with_state(|s| s.logoffs), 1);
    assert!(controller.status().is_empty());
    assert_eq!(
        controller.lookup_inspect(support::test_link()).await,
        Err(InspectError::NoBotsAvailable)
    );
}

#[tokio::test(start_paused = true)]
async fn unowned_account_still_becomes_ready() {
    let controller = controller();
    let (session, handle) = FakeSession::with_state(FakeState {
        owns_game: false,
        auto_gc: true,
        ..FakeState::default()
    });
    controller.add_bot(support::creds("acc00"), Box::new(session)).await;
    controller
        .wait_for_initialization_within(Duration::from_secs(60))
        .await;
    support::wait_until(|| controller.ready_count() == 1).await;
    assert_eq!(handle.with_state(|s| s.license_requests), 1);
}
