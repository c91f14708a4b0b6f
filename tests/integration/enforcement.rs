use std::time::Duration;

use proctored_player::models::EventType;
use proctored_player::player::{Key, SinkEvent};
use serde_json::json;

use crate::common::builders::BootstrapBuilder;
use crate::common::Harness;

fn watch_until(harness: &Harness, seconds: f64) {
    harness.sink.lock().unwrap().current_time = seconds;
    harness
        .handle
        .sink_event(SinkEvent::TimeUpdate {
            current_time: seconds,
        })
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_blocked_seek_is_reverted_and_reported() {
    let mut harness = Harness::spawn(
        BootstrapBuilder::proctored()
            .with_policy(json!({"seek": {"mode": "blocked"}}))
            .build(),
    );
    harness.sink.lock().unwrap().duration = Some(600.0);
    watch_until(&harness, 12.0);

    harness.handle.seek(100.0).unwrap();
    // The sink echoes the corrective write; that must not count as a second attempt.
    harness
        .handle
        .sink_event(SinkEvent::Seeking { target: 12.0 })
        .unwrap();

    let snapshot = harness.handle.snapshot().await.unwrap();
    assert_eq!(harness.sink.lock().unwrap().seeks, vec![12.0]);
    assert_eq!(snapshot.queued_events, vec![EventType::SeekAttempt]);
    assert_eq!(snapshot.state.current_time, 12.0);
    assert!(snapshot.state.toast.is_some());

    harness.advance(Duration::from_millis(2_300)).await;
    let batches = harness.backend.batches();
    assert_eq!(batches.len(), 1);
    let event = &batches[0].events[0];
    assert_eq!(event.kind, EventType::SeekAttempt);
    assert_eq!(event.payload["mode"], json!("blocked"));
    assert_eq!(event.payload["target"], json!(100.0));
    assert_eq!(event.payload["max_watched"], json!(12.0));

    harness.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_native_scrub_past_bound_snaps_to_grace_window() {
    let mut harness = Harness::spawn(
        BootstrapBuilder::proctored()
            .with_policy(json!({"seek": {"mode": "bounded_forward", "grace_seconds": 3}}))
            .build(),
    );
    watch_until(&harness, 30.0);

    harness
        .handle
        .sink_event(SinkEvent::Seeking { target: 90.0 })
        .unwrap();
    let snapshot = harness.handle.snapshot().await.unwrap();
    assert_eq!(harness.sink.lock().unwrap().seeks, vec![33.0]);
    assert_eq!(snapshot.queued_events, vec![EventType::SeekAttempt]);

    // Inside the grace window is fine.
    harness.handle.seek(32.0).unwrap();
    let snapshot = harness.handle.snapshot().await.unwrap();
    assert_eq!(harness.sink.lock().unwrap().seeks, vec![33.0, 32.0]);
    assert_eq!(snapshot.queued_events.len(), 1);

    harness.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_backward_seeks_are_always_allowed() {
    let mut harness = Harness::spawn(
        BootstrapBuilder::proctored()
            .with_policy(json!({"seek": {"mode": "bounded_forward"}}))
            .build(),
    );
    watch_until(&harness, 80.0);

    harness.handle.key(Key::Char('j'), false).unwrap();
    harness.handle.key(Key::ArrowLeft, false).unwrap();
    let snapshot = harness.handle.snapshot().await.unwrap();

    assert_eq!(harness.sink.lock().unwrap().seeks, vec![70.0, 65.0]);
    assert!(snapshot.queued_events.is_empty());
    harness.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_speed_lock_resets_native_rate_changes() {
    let mut harness = Harness::spawn(
        BootstrapBuilder::proctored()
            .with_policy(json!({"playback_rate": {"max": 1.0, "ui_control": false}}))
            .build(),
    );

    harness
        .handle
        .sink_event(SinkEvent::RateChange { rate: 1.75 })
        .unwrap();
    harness.handle.set_rate(2.0).unwrap();
    let snapshot = harness.handle.snapshot().await.unwrap();

    // The first write is the lock applied at attach time.
    assert_eq!(harness.sink.lock().unwrap().rate_writes, vec![1.0, 1.0, 1.0]);
    assert_eq!(snapshot.state.rate, 1.0);
    assert_eq!(
        snapshot.queued_events,
        vec![EventType::SpeedChangeAttempt, EventType::SpeedChangeAttempt]
    );

    let surface = harness.handle.surface().await.unwrap();
    assert!(surface.controls.speed_locked);
    assert!(surface.controls.rate_menu.is_empty());

    harness.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_rate_cap_clamps_menu_requests_silently() {
    let mut harness = Harness::spawn(
        BootstrapBuilder::proctored()
            .with_policy(json!({"playback_rate": {"max": 1.5}}))
            .build(),
    );

    harness.handle.set_rate(2.0).unwrap();
    harness
        .handle
        .sink_event(SinkEvent::RateChange { rate: 1.5 })
        .unwrap();
    let snapshot = harness.handle.snapshot().await.unwrap();

    assert_eq!(harness.sink.lock().unwrap().rate_writes, vec![1.5]);
    assert!(snapshot.queued_events.is_empty());

    // A rate forced past the cap outside the menu is a violation.
    harness
        .handle
        .sink_event(SinkEvent::RateChange { rate: 3.0 })
        .unwrap();
    let snapshot = harness.handle.snapshot().await.unwrap();
    assert_eq!(harness.sink.lock().unwrap().rate_writes, vec![1.5, 1.5]);
    assert_eq!(snapshot.queued_events, vec![EventType::SpeedChangeAttempt]);

    harness.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_hotkeys_are_ignored_while_typing() {
    let mut harness = Harness::spawn(BootstrapBuilder::review().build());

    harness.handle.key(Key::Char('k'), true).unwrap();
    harness.handle.key(Key::Space, true).unwrap();
    harness.handle.snapshot().await.unwrap();
    assert_eq!(harness.sink.lock().unwrap().play_calls, 0);

    harness.handle.key(Key::Space, false).unwrap();
    harness.handle.key(Key::Char('m'), false).unwrap();
    let snapshot = harness.handle.snapshot().await.unwrap();
    assert_eq!(harness.sink.lock().unwrap().play_calls, 1);
    assert!(snapshot.state.muted);

    harness.shutdown().await;
}
