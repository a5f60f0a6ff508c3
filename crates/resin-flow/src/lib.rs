//! Phased particle flow for resin.
//!
//! Animates a fixed set of particles through three phases: a chaotic
//! scatter, a timed convergence, and a settled flowchart with energy pulses
//! travelling its connections. The host drives the engine once per display
//! frame and supplies a [`Surface`] to draw on.
//!
//! # Example
//!
//! ```
//! use glam::Vec2;
//! use rhizome_resin_flow::{DrawList, EngineConfig, FlowEngine, Phase};
//!
//! let mut engine = FlowEngine::new(EngineConfig::new(800.0, 600.0).with_seed(7)).unwrap();
//! engine.on_phase_change(|change| println!("{} -> {}", change.from, change.to));
//!
//! let mut surface = DrawList::new(Vec2::new(800.0, 600.0));
//! let mut now = 0.0;
//! engine.tick(now, &mut surface);
//! engine.activate();
//! while engine.phase() != Phase::Settled {
//!     now += 16.0;
//!     engine.tick(now, &mut surface);
//! }
//! assert!(!surface.commands().is_empty());
//! ```

pub mod clock;
pub mod color;
pub mod config;
pub mod easing;
pub mod engine;
pub mod error;
pub mod motion;
pub mod particle;
pub mod phase;
pub mod pulse;
pub mod render;

pub use clock::PhaseClock;
pub use color::{Hsl, Rgba};
pub use config::{
    Connection, CycleMode, EngineConfig, Layout, MotionConfig, Palette, PulseConfig, RenderStyle,
    Timing,
};
pub use easing::Easing;
pub use engine::{FlowEngine, FrameReport};
pub use error::{ConfigError, SurfaceError};
pub use motion::{Pose, Regime};
pub use particle::{FlowRng, FrozenState, Particle, ParticleStore, Snapshot};
pub use phase::{Phase, PhaseChange, PhaseController, Trigger};
pub use pulse::{FlowPulse, PulseField, ScatterPulse, ScatterStats};
pub use render::{DrawCommand, DrawList, DrawStats, Frame, Paint, Renderer, Surface};
