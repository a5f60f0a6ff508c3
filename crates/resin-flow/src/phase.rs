//! Phase controller.
//!
//! Owns the current [`Phase`], the phase clock, and the snapshot taken when
//! convergence begins. Transitions:
//!
//! ```text
//! disordered --activate--> converging --timer--> settled
//!      ^                                            |
//!      +------------------- reset ------------------+
//! ```
//!
//! `reset` is accepted from any phase. In [`CycleMode::Auto`] the controller
//! also activates after the dwell time and resets once the cycle time has
//! elapsed.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::clock::PhaseClock;
use crate::config::{CycleMode, Timing};
use crate::motion::Regime;
use crate::particle::{ParticleStore, Snapshot};

/// The engine's three states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Phase {
    /// Scattered, chaotic motion.
    #[default]
    Disordered,
    /// Timed transition toward the flowchart.
    Converging,
    /// The assembled flowchart.
    Settled,
}

impl Phase {
    /// Human-readable status line.
    pub fn label(self) -> &'static str {
        match self {
            Phase::Disordered => "Chaos: scattered and aimless",
            Phase::Converging => "Organizing...",
            Phase::Settled => "Clarity: structured flow",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Disordered => "disordered",
            Phase::Converging => "converging",
            Phase::Settled => "settled",
        })
    }
}

/// What caused a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Trigger {
    /// An explicit `activate` call.
    Activate,
    /// An explicit `reset` call.
    Reset,
    /// A phase timer (convergence end or an automatic cycle step).
    Timer,
}

/// A completed transition.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PhaseChange {
    /// Phase before the transition.
    pub from: Phase,
    /// Phase after the transition.
    pub to: Phase,
    /// Cause.
    pub trigger: Trigger,
    /// Host timestamp the new phase starts at, if one has been observed.
    pub at_ms: Option<f64>,
}

#[derive(Debug, Clone)]
enum PhaseState {
    Disordered,
    Converging { snapshot: Snapshot },
    Settled,
}

impl PhaseState {
    fn phase(&self) -> Phase {
        match self {
            PhaseState::Disordered => Phase::Disordered,
            PhaseState::Converging { .. } => Phase::Converging,
            PhaseState::Settled => Phase::Settled,
        }
    }
}

/// The single authority on the current phase.
#[derive(Debug, Clone)]
pub struct PhaseController {
    state: PhaseState,
    clock: PhaseClock,
    /// Time since the last entry into disordered, for automatic cycling.
    cycle_clock: PhaseClock,
    timing: Timing,
    cycle: CycleMode,
}

impl PhaseController {
    /// Creates a controller in the disordered phase.
    pub fn new(timing: Timing, cycle: CycleMode) -> Self {
        Self {
            state: PhaseState::Disordered,
            clock: PhaseClock::new(),
            cycle_clock: PhaseClock::new(),
            timing,
            cycle,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    /// Start positions captured on entry to converging.
    pub fn snapshot(&self) -> Option<&Snapshot> {
        match &self.state {
            PhaseState::Converging { snapshot } => Some(snapshot),
            _ => None,
        }
    }

    /// Milliseconds since the current phase began.
    pub fn elapsed_ms(&self) -> f64 {
        self.clock.elapsed_ms()
    }

    /// 0 while disordered, normalized transition progress while converging,
    /// 1 once settled.
    pub fn progress(&self) -> f32 {
        match self.state {
            PhaseState::Disordered => 0.0,
            PhaseState::Converging { .. } => {
                (self.clock.elapsed_ms() / self.timing.transition_ms).clamp(0.0, 1.0) as f32
            }
            PhaseState::Settled => 1.0,
        }
    }

    /// The motion regime for the current phase.
    pub fn regime(&self) -> Regime<'_> {
        let elapsed_ms = self.clock.elapsed_ms();
        match &self.state {
            PhaseState::Disordered => Regime::Disordered { elapsed_ms },
            PhaseState::Converging { snapshot } => Regime::Converging {
                elapsed_ms,
                duration_ms: self.timing.transition_ms,
                snapshot: Some(snapshot),
            },
            PhaseState::Settled => Regime::Settled { elapsed_ms },
        }
    }

    /// Records a host timestamp; returns the delta since the previous one.
    pub fn observe(&mut self, now_ms: f64) -> f64 {
        self.cycle_clock.observe(now_ms);
        self.clock.observe(now_ms)
    }

    /// Starts converging, capturing the store's current positions.
    ///
    /// Only valid while disordered; otherwise returns `None` and changes
    /// nothing.
    pub fn activate(&mut self, store: &ParticleStore) -> Option<PhaseChange> {
        if !matches!(self.state, PhaseState::Disordered) {
            return None;
        }
        self.clock.restart();
        Some(self.enter_converging(store, Trigger::Activate))
    }

    /// Returns to disordered from any phase.
    pub fn reset(&mut self) -> PhaseChange {
        self.clock.restart();
        self.cycle_clock.restart();
        self.enter_disordered(Trigger::Reset)
    }

    /// Fires at most one due timer transition.
    ///
    /// A timer that fired late starts the next phase at its scheduled
    /// instant, so call this until it returns `None` to catch up.
    pub fn poll(&mut self, store: &ParticleStore) -> Option<PhaseChange> {
        let origin = self.clock.origin()?;
        let elapsed = self.clock.elapsed_ms();

        match (&self.state, self.cycle) {
            (PhaseState::Converging { .. }, _) if elapsed >= self.timing.transition_ms => {
                self.clock.set_origin(origin + self.timing.transition_ms);
                let change = PhaseChange {
                    from: Phase::Converging,
                    to: Phase::Settled,
                    trigger: Trigger::Timer,
                    at_ms: self.clock.origin(),
                };
                self.state = PhaseState::Settled;
                Some(change)
            }
            (PhaseState::Disordered, CycleMode::Auto { dwell_ms, .. }) if elapsed >= dwell_ms => {
                self.clock.set_origin(origin + dwell_ms);
                Some(self.enter_converging(store, Trigger::Timer))
            }
            (PhaseState::Settled, CycleMode::Auto { cycle_ms, .. }) => {
                let cycle_origin = self.cycle_clock.origin()?;
                let cycle_elapsed = self.cycle_clock.elapsed_ms();
                if cycle_elapsed < cycle_ms {
                    return None;
                }
                // Skip whole cycles missed while the host was paused.
                let restart = cycle_origin + (cycle_elapsed / cycle_ms).floor() * cycle_ms;
                self.clock.set_origin(restart);
                self.cycle_clock.set_origin(restart);
                Some(self.enter_disordered(Trigger::Timer))
            }
            _ => None,
        }
    }

    fn enter_converging(&mut self, store: &ParticleStore, trigger: Trigger) -> PhaseChange {
        self.state = PhaseState::Converging {
            snapshot: store.snapshot(),
        };
        PhaseChange {
            from: Phase::Disordered,
            to: Phase::Converging,
            trigger,
            at_ms: self.clock.origin(),
        }
    }

    fn enter_disordered(&mut self, trigger: Trigger) -> PhaseChange {
        let from = self.state.phase();
        self.state = PhaseState::Disordered;
        PhaseChange {
            from,
            to: Phase::Disordered,
            trigger,
            at_ms: self.clock.origin(),
        }
    }
}
