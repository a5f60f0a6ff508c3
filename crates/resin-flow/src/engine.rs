//! The engine façade.
//!
//! [`FlowEngine`] owns the particle store, the pulse field and the phase
//! controller, and runs one strictly ordered step per host frame:
//!
//! 1. read the clock,
//! 2. fire due phase timers,
//! 3. apply the motion regime,
//! 4. advance the pulses,
//! 5. render.
//!
//! The engine is single-threaded. `activate` and `reset` may be called
//! between frames from the host's input handling.

use std::fmt;

use glam::Vec2;

use crate::config::EngineConfig;
use crate::error::ConfigError;
use crate::motion::{self, MotionContext};
use crate::particle::{FlowRng, Particle, ParticleStore};
use crate::phase::{Phase, PhaseChange, PhaseController};
use crate::pulse::{PulseContext, PulseField};
use crate::render::{DrawStats, Frame, Renderer, Surface};

/// Upper bound on timer transitions processed in one frame.
const MAX_CATCH_UP: usize = 8;

/// What happened during one [`FlowEngine::tick`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    /// Phase after the frame's timers fired.
    pub phase: Phase,
    /// Time since that phase began.
    pub elapsed_ms: f64,
    /// Time since the previous frame (unclamped).
    pub delta_ms: f64,
    /// Draw counts, or `None` if the surface failed and the draw was skipped.
    pub drawn: Option<DrawStats>,
}

type Listener = Box<dyn FnMut(&PhaseChange)>;

/// Phased particle-flow engine.
///
/// # Example
///
/// ```
/// use glam::Vec2;
/// use rhizome_resin_flow::{DrawList, EngineConfig, FlowEngine, Phase};
///
/// let mut engine = FlowEngine::new(EngineConfig::new(800.0, 600.0)).unwrap();
/// let mut surface = DrawList::new(Vec2::new(800.0, 600.0));
///
/// engine.tick(0.0, &mut surface);
/// assert!(engine.activate());
/// engine.tick(1800.0, &mut surface);
/// assert_eq!(engine.phase(), Phase::Settled);
/// ```
pub struct FlowEngine {
    config: EngineConfig,
    size: Vec2,
    targets: Vec<Vec2>,
    output_mask: Vec<bool>,
    store: ParticleStore,
    controller: PhaseController,
    pulses: PulseField,
    renderer: Renderer,
    rng: FlowRng,
    listeners: Vec<Listener>,
}

impl fmt::Debug for FlowEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowEngine")
            .field("phase", &self.controller.phase())
            .field("elapsed_ms", &self.controller.elapsed_ms())
            .field("particles", &self.store.len())
            .field("pulses", &self.pulses.len())
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl FlowEngine {
    /// Validates `config` and builds an engine in the disordered phase.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let size = config.size();
        let targets = config.layout.resolve(size);
        let output_mask = config.layout.output_mask();
        let mut rng = FlowRng::new(config.seed);

        let mut store = ParticleStore::new(config.particle_count);
        store.populate(&targets, size, &config.motion, &mut rng);

        let pulses = PulseField::for_phase(
            Phase::Disordered,
            &pulse_context(&config, &store, &targets),
            &mut rng,
        );

        log::info!(
            "flow engine: {}x{}, {} particles, {} groups, {} connections",
            size.x,
            size.y,
            store.len(),
            targets.len(),
            config.layout.connections.len()
        );

        Ok(Self {
            controller: PhaseController::new(config.timing, config.cycle),
            renderer: Renderer::new(config.palette, config.style),
            config,
            size,
            targets,
            output_mask,
            store,
            pulses,
            rng,
            listeners: Vec::new(),
        })
    }

    /// Registers a listener called after every phase transition.
    pub fn on_phase_change<F>(&mut self, listener: F)
    where
        F: FnMut(&PhaseChange) + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    /// Starts converging. Returns false (and does nothing) unless the
    /// engine is disordered.
    pub fn activate(&mut self) -> bool {
        match self.controller.activate(&self.store) {
            Some(change) => {
                self.apply(change);
                true
            }
            None => false,
        }
    }

    /// Returns to the disordered phase with freshly scattered particles.
    pub fn reset(&mut self) {
        let change = self.controller.reset();
        log::info!("flow engine reset from {}", change.from);
        self.apply(change);
    }

    /// Advances the simulation to `now_ms` without drawing.
    ///
    /// Returns the time since the previous frame.
    pub fn update(&mut self, now_ms: f64) -> f64 {
        let delta_ms = self.controller.observe(now_ms);

        for _ in 0..MAX_CATCH_UP {
            let Some(change) = self.controller.poll(&self.store) else {
                break;
            };
            self.apply(change);
        }

        let motion_ctx = MotionContext {
            config: &self.config.motion,
            palette: &self.config.palette,
            size: self.size,
            groups: self.targets.len(),
            outputs: &self.output_mask,
            fade_in_ms: self.config.timing.fade_in_ms,
        };
        motion::advance(
            self.store.particles_mut(),
            &self.controller.regime(),
            &motion_ctx,
        );

        let dt_secs = (delta_ms.min(self.config.timing.max_frame_delta_ms) / 1000.0) as f32;
        self.pulses.advance(
            dt_secs,
            &pulse_context(&self.config, &self.store, &self.targets),
            &mut self.rng,
        );

        log::trace!(
            "frame at {now_ms:.1}ms: {} +{delta_ms:.1}ms ({:.1}ms in phase)",
            self.controller.phase(),
            self.controller.elapsed_ms()
        );
        delta_ms
    }

    /// Runs one full frame: update, then draw onto `surface`.
    ///
    /// A surface error skips the draw and leaves the simulation untouched.
    pub fn tick(&mut self, now_ms: f64, surface: &mut dyn Surface) -> FrameReport {
        let delta_ms = self.update(now_ms);
        let drawn = match self.renderer.render(&self.frame(), surface) {
            Ok(stats) => Some(stats),
            Err(err) => {
                log::warn!("skipping frame at {now_ms:.1}ms: {err}");
                None
            }
        };
        FrameReport {
            phase: self.controller.phase(),
            elapsed_ms: self.controller.elapsed_ms(),
            delta_ms,
            drawn,
        }
    }

    /// Borrowed view of everything the renderer draws.
    pub fn frame(&self) -> Frame<'_> {
        Frame {
            phase: self.controller.phase(),
            progress: self.controller.progress(),
            size: self.size,
            particles: self.store.particles(),
            pulses: &self.pulses,
            targets: &self.targets,
            connections: &self.config.layout.connections,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.controller.phase()
    }

    /// 0 while disordered, transition progress while converging, 1 settled.
    pub fn progress(&self) -> f32 {
        self.controller.progress()
    }

    /// Milliseconds since the current phase began.
    pub fn elapsed_ms(&self) -> f64 {
        self.controller.elapsed_ms()
    }

    /// All particles.
    pub fn particles(&self) -> &[Particle] {
        self.store.particles()
    }

    /// The particle store.
    pub fn store(&self) -> &ParticleStore {
        &self.store
    }

    /// Pulses of the current phase.
    pub fn pulses(&self) -> &PulseField {
        &self.pulses
    }

    /// The phase controller.
    pub fn controller(&self) -> &PhaseController {
        &self.controller
    }

    /// Group targets in surface pixels.
    pub fn targets(&self) -> &[Vec2] {
        &self.targets
    }

    /// Surface size the engine was built for.
    pub fn size(&self) -> Vec2 {
        self.size
    }

    /// The configuration the engine was built from.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Runs a transition's side effects, then notifies listeners.
    fn apply(&mut self, change: PhaseChange) {
        if change.to == Phase::Disordered {
            self.store
                .populate(&self.targets, self.size, &self.config.motion, &mut self.rng);
        }
        self.pulses = PulseField::for_phase(
            change.to,
            &pulse_context(&self.config, &self.store, &self.targets),
            &mut self.rng,
        );

        log::debug!(
            "phase {} -> {} ({:?}) at {:?}",
            change.from,
            change.to,
            change.trigger,
            change.at_ms
        );
        for listener in &mut self.listeners {
            listener(&change);
        }
    }
}

fn pulse_context<'a>(
    config: &'a EngineConfig,
    store: &'a ParticleStore,
    targets: &'a [Vec2],
) -> PulseContext<'a> {
    PulseContext {
        config: &config.pulses,
        particles: store.particles(),
        targets,
        outputs: &config.layout.outputs,
        connections: &config.layout.connections,
    }
}
