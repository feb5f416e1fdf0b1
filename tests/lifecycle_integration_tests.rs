//! Integration tests for lifecycle change events
//!
//! These tests verify that the LifecycleMonitor:
//! - Delivers events from the simulation thread to async subscribers
//! - Orders them Initialized … Deinitialized
//! - Reports each one-shot transition exactly once

mod common;

use common::{FakeEngine, argv, temp_app_dir};
use simclient::cli::parse_args;
use simclient::models::{AssetKind, LauncherSettings, SimulationState};
use simclient::{LifecycleChange, Launcher};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::time::{Duration, timeout};

async fn collect_until_deinit(rx: &mut broadcast::Receiver<LifecycleChange>) -> Vec<LifecycleChange> {
    let mut events = Vec::new();
    loop {
        let event = timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("Timeout waiting for event")
            .expect("Channel closed");
        let done = event == LifecycleChange::Deinitialized;
        events.push(event);
        if done {
            return events;
        }
    }
}

fn position(events: &[LifecycleChange], wanted: &LifecycleChange) -> usize {
    events
        .iter()
        .position(|e| e == wanted)
        .unwrap_or_else(|| panic!("missing {:?} in {:?}", wanted, events))
}

#[tokio::test]
async fn test_lifecycle_event_order() {
    let (_temp_dir, app_dir) = temp_app_dir();
    let launcher = Arc::new(Launcher::new(LauncherSettings::default(), app_dir));
    let mut rx = launcher.monitor().subscribe();
    let engine = Arc::new(FakeEngine::new());
    let options = parse_args(&argv(&["-H", "-s300", "-q", "scene.simscene.xml"])).unwrap();

    // The true-headless loop blocks on the init gate, so it runs off the runtime.
    let run = {
        let launcher = Arc::clone(&launcher);
        tokio::task::spawn_blocking(move || launcher.run_with_engine(engine, &options))
    };

    let events = collect_until_deinit(&mut rx).await;
    let outcome = run.await.unwrap().unwrap();

    assert_eq!(events.first(), Some(&LifecycleChange::Initialized));
    assert_eq!(events.last(), Some(&LifecycleChange::Deinitialized));

    let loaded = position(
        &events,
        &LifecycleChange::AssetLoaded {
            kind: AssetKind::Scene,
            path: "scene.simscene.xml".to_string(),
        },
    );
    let started = position(&events, &LifecycleChange::AutoStarted);
    let run_started = position(&events, &LifecycleChange::RunStarted { run: 1 });
    let stop_at = outcome.lifecycle.auto_stopped_at_ms.unwrap();
    let stopped = position(&events, &LifecycleChange::AutoStopped { at_ms: stop_at });
    let posted = position(&events, &LifecycleChange::ExitPosted);
    let observed = position(&events, &LifecycleChange::ExitObserved);

    assert!(loaded < started);
    assert!(started < run_started);
    assert!(run_started < stopped);
    assert!(stopped < posted);
    assert!(posted < observed);

    for once in [
        LifecycleChange::AutoStarted,
        LifecycleChange::ExitPosted,
        LifecycleChange::ExitObserved,
    ] {
        assert_eq!(events.iter().filter(|e| **e == once).count(), 1, "{:?}", once);
    }
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, LifecycleChange::RunStarted { .. }))
            .count(),
        1
    );
}

#[tokio::test]
async fn test_state_changes_follow_engine() {
    let (_temp_dir, app_dir) = temp_app_dir();
    let launcher = Arc::new(Launcher::new(LauncherSettings::default(), app_dir));
    let mut rx = launcher.monitor().subscribe();
    let engine = Arc::new(FakeEngine::new());
    let options = parse_args(&argv(&["-H", "-s1", "-q"])).unwrap();

    let run = {
        let launcher = Arc::clone(&launcher);
        tokio::task::spawn_blocking(move || launcher.run_with_engine(engine, &options))
    };

    let events = collect_until_deinit(&mut rx).await;
    run.await.unwrap().unwrap();

    let transitions: Vec<(SimulationState, SimulationState)> = events
        .iter()
        .filter_map(|e| match e {
            LifecycleChange::StateChanged { from, to } => Some((*from, *to)),
            _ => None,
        })
        .collect();
    assert_eq!(
        transitions,
        vec![
            (SimulationState::Stopped, SimulationState::AdvancingFirstAfterStop),
            (
                SimulationState::AdvancingFirstAfterStop,
                SimulationState::AdvancingRunning
            ),
            (
                SimulationState::AdvancingRunning,
                SimulationState::AdvancingLastBeforeStop
            ),
            (SimulationState::AdvancingLastBeforeStop, SimulationState::Stopped),
        ]
    );
}

#[tokio::test]
async fn test_broadcast_metrics_counted() {
    let (_temp_dir, app_dir) = temp_app_dir();
    let launcher = Arc::new(Launcher::new(LauncherSettings::default(), app_dir));
    let mut rx = launcher.monitor().subscribe();
    let engine = Arc::new(FakeEngine::new());
    let options = parse_args(&argv(&["-H", "-s1", "-q"])).unwrap();

    let run = {
        let launcher = Arc::clone(&launcher);
        tokio::task::spawn_blocking(move || launcher.run_with_engine(engine, &options))
    };
    let events = collect_until_deinit(&mut rx).await;
    let outcome = run.await.unwrap().unwrap();

    assert_eq!(outcome.metrics.lifecycle_broadcasts, events.len() as u64);
    assert_eq!(outcome.metrics.lifecycle_broadcasts_dropped, 0);
}
