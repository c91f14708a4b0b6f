use std::time::Duration;

use proctored_player::player::{PointerInput, StageRect};
use serde_json::json;

use crate::common::builders::BootstrapBuilder;
use crate::common::Harness;

fn click(harness: &Harness, x: f64) {
    harness
        .handle
        .pointer(PointerInput::Click { x, y: 300.0 })
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_double_tap_left_seeks_back() {
    let mut harness = Harness::spawn(BootstrapBuilder::review().build());
    harness.sink.lock().unwrap().current_time = 50.0;

    click(&harness, 100.0);
    click(&harness, 100.0);
    harness.advance(Duration::from_millis(300)).await;
    harness.handle.snapshot().await.unwrap();

    let sink = harness.sink.lock().unwrap().clone();
    assert_eq!(sink.seeks, vec![40.0]);
    assert_eq!(sink.play_calls, 0);
    harness.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_triple_tap_right_seeks_forward() {
    let mut harness = Harness::spawn(BootstrapBuilder::review().build());
    harness.sink.lock().unwrap().current_time = 50.0;

    for _ in 0..3 {
        click(&harness, 1_100.0);
    }
    harness.advance(Duration::from_millis(300)).await;
    harness.handle.snapshot().await.unwrap();

    assert_eq!(harness.sink.lock().unwrap().seeks, vec![70.0]);
    harness.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_multi_tap_forward_respects_seek_policy() {
    let mut harness = Harness::spawn(
        BootstrapBuilder::proctored()
            .with_policy(json!({"seek": {"mode": "blocked"}}))
            .build(),
    );
    harness.sink.lock().unwrap().current_time = 50.0;

    click(&harness, 1_100.0);
    click(&harness, 1_100.0);
    harness.advance(Duration::from_millis(300)).await;
    let snapshot = harness.handle.snapshot().await.unwrap();

    // Nothing watched yet, so the seek lands back at zero.
    assert_eq!(harness.sink.lock().unwrap().seeks, vec![0.0]);
    assert_eq!(snapshot.queued_events.len(), 1);
    harness.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_single_center_tap_toggles_play_after_window() {
    let mut harness = Harness::spawn(BootstrapBuilder::review().build());

    click(&harness, 640.0);
    harness.handle.snapshot().await.unwrap();
    assert_eq!(harness.sink.lock().unwrap().play_calls, 0);

    harness.advance(Duration::from_millis(300)).await;
    harness.handle.snapshot().await.unwrap();
    assert_eq!(harness.sink.lock().unwrap().play_calls, 1);
    harness.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_long_press_boosts_then_restores_rate() {
    let mut harness = Harness::spawn(BootstrapBuilder::review().build());

    harness
        .handle
        .pointer(PointerInput::Down { x: 1_000.0, y: 300.0 })
        .unwrap();
    harness.advance(Duration::from_millis(600)).await;
    let snapshot = harness.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.state.rate, 2.0);

    harness
        .handle
        .pointer(PointerInput::Up { x: 1_000.0, y: 300.0 })
        .unwrap();
    harness.advance(Duration::from_millis(300)).await;
    let snapshot = harness.handle.snapshot().await.unwrap();

    assert_eq!(harness.sink.lock().unwrap().rate_writes, vec![2.0, 1.0]);
    assert_eq!(snapshot.state.rate, 1.0);
    // The release after a boost is not a tap.
    assert_eq!(harness.sink.lock().unwrap().play_calls, 0);
    harness.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_long_press_does_nothing_when_speed_locked() {
    let mut harness = Harness::spawn(
        BootstrapBuilder::proctored()
            .with_policy(json!({"playback_rate": {"ui_control": false}}))
            .build(),
    );

    harness
        .handle
        .pointer(PointerInput::Down { x: 1_000.0, y: 300.0 })
        .unwrap();
    harness.advance(Duration::from_millis(800)).await;
    let snapshot = harness.handle.snapshot().await.unwrap();

    // Only the lock applied at attach time.
    assert_eq!(harness.sink.lock().unwrap().rate_writes, vec![1.0]);
    assert!(snapshot.queued_events.is_empty());
    harness.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_vertical_swipe_on_right_changes_volume() {
    let mut harness = Harness::spawn(BootstrapBuilder::review().build());
    harness
        .handle
        .resize_stage(StageRect::new(0.0, 0.0, 900.0, 500.0))
        .unwrap();
    harness
        .handle
        .pointer(PointerInput::Down { x: 800.0, y: 400.0 })
        .unwrap();
    harness
        .handle
        .pointer(PointerInput::Move { x: 800.0, y: 300.0 })
        .unwrap();
    harness
        .handle
        .pointer(PointerInput::Up { x: 800.0, y: 300.0 })
        .unwrap();
    harness.advance(Duration::from_millis(300)).await;
    let snapshot = harness.handle.snapshot().await.unwrap();

    // Starts at full volume; swiping up cannot exceed it.
    assert_eq!(snapshot.state.volume, 1.0);
    assert!(!snapshot.state.muted);
    assert_eq!(harness.sink.lock().unwrap().play_calls, 0);

    harness
        .handle
        .pointer(PointerInput::Down { x: 800.0, y: 100.0 })
        .unwrap();
    harness
        .handle
        .pointer(PointerInput::Move { x: 800.0, y: 400.0 })
        .unwrap();
    harness
        .handle
        .pointer(PointerInput::Up { x: 800.0, y: 400.0 })
        .unwrap();
    harness.advance(Duration::from_millis(300)).await;
    let snapshot = harness.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.state.volume, 0.0);
    assert!(snapshot.state.muted);
    assert!(harness.sink.lock().unwrap().muted);

    harness.shutdown().await;
}
