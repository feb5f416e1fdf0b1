use std::fmt;

use crate::engine::consts;

/// Simulation state as reported by the engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SimulationState {
    #[default]
    Stopped,
    Paused,
    AdvancingFirstAfterStop,
    AdvancingRunning,
    AdvancingLastBeforePause,
    AdvancingFirstAfterPause,
    AdvancingAboutToStop,
    AdvancingLastBeforeStop,
    Unknown(i32),
}

impl SimulationState {
    /// Decodes the engine's raw state word.
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            consts::SIMULATION_STOPPED => SimulationState::Stopped,
            consts::SIMULATION_PAUSED => SimulationState::Paused,
            consts::SIMULATION_ADVANCING_FIRSTAFTERSTOP => SimulationState::AdvancingFirstAfterStop,
            consts::SIMULATION_ADVANCING_RUNNING => SimulationState::AdvancingRunning,
            consts::SIMULATION_ADVANCING_LASTBEFOREPAUSE => {
                SimulationState::AdvancingLastBeforePause
            }
            consts::SIMULATION_ADVANCING_FIRSTAFTERPAUSE => {
                SimulationState::AdvancingFirstAfterPause
            }
            consts::SIMULATION_ADVANCING_ABOUTTOSTOP => SimulationState::AdvancingAboutToStop,
            consts::SIMULATION_ADVANCING_LASTBEFORESTOP => SimulationState::AdvancingLastBeforeStop,
            other => SimulationState::Unknown(other),
        }
    }

    /// Encodes back into the engine's raw state word.
    pub fn to_raw(self) -> i32 {
        match self {
            SimulationState::Stopped => consts::SIMULATION_STOPPED,
            SimulationState::Paused => consts::SIMULATION_PAUSED,
            SimulationState::AdvancingFirstAfterStop => consts::SIMULATION_ADVANCING_FIRSTAFTERSTOP,
            SimulationState::AdvancingRunning => consts::SIMULATION_ADVANCING_RUNNING,
            SimulationState::AdvancingLastBeforePause => {
                consts::SIMULATION_ADVANCING_LASTBEFOREPAUSE
            }
            SimulationState::AdvancingFirstAfterPause => {
                consts::SIMULATION_ADVANCING_FIRSTAFTERPAUSE
            }
            SimulationState::AdvancingAboutToStop => consts::SIMULATION_ADVANCING_ABOUTTOSTOP,
            SimulationState::AdvancingLastBeforeStop => consts::SIMULATION_ADVANCING_LASTBEFORESTOP,
            SimulationState::Unknown(raw) => raw,
        }
    }

    pub fn is_advancing(self) -> bool {
        self.to_raw() & consts::SIMULATION_ADVANCING != 0
    }
}

impl fmt::Display for SimulationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationState::Stopped => f.write_str("stopped"),
            SimulationState::Paused => f.write_str("paused"),
            SimulationState::AdvancingFirstAfterStop => f.write_str("advancing (first after stop)"),
            SimulationState::AdvancingRunning => f.write_str("advancing"),
            SimulationState::AdvancingLastBeforePause => {
                f.write_str("advancing (last before pause)")
            }
            SimulationState::AdvancingFirstAfterPause => {
                f.write_str("advancing (first after pause)")
            }
            SimulationState::AdvancingAboutToStop => f.write_str("advancing (about to stop)"),
            SimulationState::AdvancingLastBeforeStop => f.write_str("advancing (last before stop)"),
            SimulationState::Unknown(raw) => write!(f, "unknown ({:#x})", raw),
        }
    }
}

/// Phase of the simulation thread itself.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ThreadPhase {
    #[default]
    WaitingForInit,
    Initializing,
    Running,
    Exited,
}

/// Lifecycle bookkeeping owned by the simulation thread.
///
/// Only the simulation thread mutates this; observers see it through
/// [`LifecycleChange`](crate::state::LifecycleChange) events.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SimulationLifecycleState {
    pub phase: ThreadPhase,
    pub simulation_state: SimulationState,
    /// Completed-run transitions seen so far.
    pub run_count: u32,
    pub auto_started: bool,
    /// Auto-quit already posted its exit request.
    pub exit_posted: bool,
    /// Exit observed by the loop; never reverts.
    pub exit_requested: bool,
    /// Simulated time (ms) at which the auto-stop fired.
    pub auto_stopped_at_ms: Option<u64>,
    pub ticks: u64,
}

impl SimulationLifecycleState {
    /// Records a freshly read simulation state and returns `true` when it
    /// is a new transition into the first step after a stop.
    pub fn observe(&mut self, state: SimulationState) -> bool {
        let new_run = state == SimulationState::AdvancingFirstAfterStop
            && self.simulation_state != SimulationState::AdvancingFirstAfterStop;
        if new_run {
            self.run_count += 1;
        }
        self.simulation_state = state;
        new_run
    }

    pub fn mark_exit_requested(&mut self) {
        self.exit_requested = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_state_round_trip() {
        for raw in [0x00, 0x08, 0x10, 0x11, 0x13, 0x14, 0x15, 0x16] {
            assert_eq!(SimulationState::from_raw(raw).to_raw(), raw);
        }
        assert_eq!(SimulationState::from_raw(0x42), SimulationState::Unknown(0x42));
    }

    #[test]
    fn test_is_advancing() {
        assert!(!SimulationState::Stopped.is_advancing());
        assert!(!SimulationState::Paused.is_advancing());
        assert!(SimulationState::AdvancingFirstAfterStop.is_advancing());
        assert!(SimulationState::AdvancingLastBeforeStop.is_advancing());
    }

    #[test]
    fn test_run_count_increments_once_per_transition() {
        let mut lifecycle = SimulationLifecycleState::default();

        assert!(lifecycle.observe(SimulationState::AdvancingFirstAfterStop));
        // Same state read twice in a row is one transition
        assert!(!lifecycle.observe(SimulationState::AdvancingFirstAfterStop));
        assert!(!lifecycle.observe(SimulationState::AdvancingRunning));
        assert!(!lifecycle.observe(SimulationState::Stopped));
        assert_eq!(lifecycle.run_count, 1);

        assert!(lifecycle.observe(SimulationState::AdvancingFirstAfterStop));
        assert_eq!(lifecycle.run_count, 2);
    }
}
