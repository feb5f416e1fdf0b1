// Lifecycle monitoring
//
// The simulation thread owns its SimulationLifecycleState outright and never
// shares it behind a lock. Observers instead receive LifecycleChange events,
// derived by diffing the state before and after every tick and fanned out over
// a tokio broadcast channel.

use crate::metrics::LaunchMetrics;
use crate::models::{AssetKind, SimulationLifecycleState, SimulationState, ThreadPhase};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Change events emitted by the simulation thread.
#[derive(Clone, Debug, PartialEq)]
pub enum LifecycleChange {
    /// Engine thread-init returned and the system/remaining plugin phases ran
    Initialized,

    /// A scene or model passed on the command line was loaded
    AssetLoaded { kind: AssetKind, path: String },

    /// A scene or model could not be loaded (or was not recognized)
    AssetLoadFailed { path: String },

    /// Auto-start issued the start command
    AutoStarted,

    /// The engine reported a new transition into its first step after a stop
    RunStarted { run: u32 },

    /// Reported simulation state changed
    StateChanged {
        from: SimulationState,
        to: SimulationState,
    },

    /// The stop delay elapsed and the simulation was stopped
    AutoStopped { at_ms: u64 },

    /// Auto-quit posted the exit request
    ExitPosted,

    /// The loop observed the exit request and is unwinding
    ExitObserved,

    /// Engine deinit returned; the simulation thread is done
    Deinitialized,
}

/// Broadcasts [`LifecycleChange`] events to any number of subscribers.
///
/// Cheap to clone: every clone feeds the same channel. Sending never blocks
/// and never fails the caller; events sent while nobody listens are dropped.
#[derive(Clone)]
pub struct LifecycleMonitor {
    tx: broadcast::Sender<LifecycleChange>,
    metrics: Option<Arc<LaunchMetrics>>,
}

impl LifecycleMonitor {
    /// Create a monitor with a broadcast buffer of 256 events
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(256);
        Self { tx, metrics: None }
    }

    /// Count broadcasts into the given metrics.
    pub fn with_metrics(mut self, metrics: Arc<LaunchMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Subscribe to all future lifecycle changes.
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleChange> {
        self.tx.subscribe()
    }

    /// Send a single event.
    pub fn publish(&self, change: LifecycleChange) {
        tracing::debug!(?change, "lifecycle");
        let sent = self.tx.send(change).is_ok();
        if let Some(metrics) = &self.metrics {
            if sent {
                metrics.record_lifecycle_broadcast();
            } else {
                metrics.record_lifecycle_broadcast_dropped();
            }
        }
    }

    /// Diff two lifecycle snapshots, send the resulting events and return them.
    pub fn publish_changes(
        &self,
        old: &SimulationLifecycleState,
        new: &SimulationLifecycleState,
    ) -> Vec<LifecycleChange> {
        let changes = detect_changes(old, new);
        for change in &changes {
            self.publish(change.clone());
        }
        changes
    }
}

impl Default for LifecycleMonitor {
    fn default() -> Self {
        Self::new()
    }
}

/// Work out which events separate two lifecycle snapshots.
///
/// Events come out in the order the tick applies its steps, so a subscriber
/// sees `AutoStarted` before the `RunStarted` it causes.
pub fn detect_changes(
    old: &SimulationLifecycleState,
    new: &SimulationLifecycleState,
) -> Vec<LifecycleChange> {
    let mut changes = Vec::new();

    if old.phase != new.phase && new.phase == ThreadPhase::Running {
        changes.push(LifecycleChange::Initialized);
    }

    if !old.auto_started && new.auto_started {
        changes.push(LifecycleChange::AutoStarted);
    }

    if old.simulation_state != new.simulation_state {
        changes.push(LifecycleChange::StateChanged {
            from: old.simulation_state,
            to: new.simulation_state,
        });
    }

    if new.run_count > old.run_count {
        changes.push(LifecycleChange::RunStarted { run: new.run_count });
    }

    if !old.exit_posted && new.exit_posted {
        changes.push(LifecycleChange::ExitPosted);
    }

    if old.auto_stopped_at_ms.is_none() {
        if let Some(at_ms) = new.auto_stopped_at_ms {
            changes.push(LifecycleChange::AutoStopped { at_ms });
        }
    }

    if !old.exit_requested && new.exit_requested {
        changes.push(LifecycleChange::ExitObserved);
    }

    if old.phase != new.phase && new.phase == ThreadPhase::Exited {
        changes.push(LifecycleChange::Deinitialized);
    }

    changes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_changes_for_identical_states() {
        let state = SimulationLifecycleState::default();
        assert!(detect_changes(&state, &state).is_empty());
    }

    #[test]
    fn test_initialized_on_running_phase() {
        let old = SimulationLifecycleState {
            phase: ThreadPhase::Initializing,
            ..Default::default()
        };
        let new = SimulationLifecycleState {
            phase: ThreadPhase::Running,
            ..old
        };
        assert_eq!(detect_changes(&old, &new), vec![LifecycleChange::Initialized]);
    }

    #[test]
    fn test_auto_start_tick_ordering() {
        let old = SimulationLifecycleState {
            phase: ThreadPhase::Running,
            ..Default::default()
        };
        let new = SimulationLifecycleState {
            auto_started: true,
            simulation_state: SimulationState::AdvancingFirstAfterStop,
            run_count: 1,
            ..old
        };

        let changes = detect_changes(&old, &new);
        assert_eq!(
            changes,
            vec![
                LifecycleChange::AutoStarted,
                LifecycleChange::StateChanged {
                    from: SimulationState::Stopped,
                    to: SimulationState::AdvancingFirstAfterStop,
                },
                LifecycleChange::RunStarted { run: 1 },
            ]
        );
    }

    #[test]
    fn test_auto_stop_reported_once() {
        let old = SimulationLifecycleState {
            phase: ThreadPhase::Running,
            ..Default::default()
        };
        let fired = SimulationLifecycleState {
            auto_stopped_at_ms: Some(510),
            ..old
        };
        assert_eq!(
            detect_changes(&old, &fired),
            vec![LifecycleChange::AutoStopped { at_ms: 510 }]
        );
        assert!(detect_changes(&fired, &fired).is_empty());
    }

    #[test]
    fn test_exit_and_deinit() {
        let old = SimulationLifecycleState {
            phase: ThreadPhase::Running,
            ..Default::default()
        };
        let new = SimulationLifecycleState {
            phase: ThreadPhase::Exited,
            exit_requested: true,
            ..old
        };
        assert_eq!(
            detect_changes(&old, &new),
            vec![LifecycleChange::ExitObserved, LifecycleChange::Deinitialized]
        );
    }

    #[test]
    fn test_publish_without_subscribers_counts_drop() {
        let metrics = Arc::new(LaunchMetrics::new());
        let monitor = LifecycleMonitor::new().with_metrics(metrics.clone());

        monitor.publish(LifecycleChange::Initialized);

        assert_eq!(metrics.snapshot().lifecycle_broadcasts_dropped, 1);
    }

    #[test]
    fn test_subscribers_receive_events() {
        let monitor = LifecycleMonitor::new();
        let mut rx1 = monitor.subscribe();
        let mut rx2 = monitor.clone().subscribe();

        monitor.publish(LifecycleChange::ExitPosted);

        assert_eq!(rx1.try_recv().unwrap(), LifecycleChange::ExitPosted);
        assert_eq!(rx2.try_recv().unwrap(), LifecycleChange::ExitPosted);
    }
}
