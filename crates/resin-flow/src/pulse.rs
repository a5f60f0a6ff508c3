//! Pulse model.
//!
//! Energy markers owned by whichever phase is active:
//!
//! - Disordered: [`ScatterPulse`]s race from a random particle toward a
//!   random output along a bent quadratic path. Most fizzle out before
//!   arriving; every one respawns the moment it completes its path.
//! - Converging: no pulses.
//! - Settled: [`FlowPulse`]s travel the fixed connection list, evenly
//!   spaced, and all of them arrive.

use glam::Vec2;

use crate::config::{Connection, PulseConfig};
use crate::easing::smoothstep;
use crate::particle::{FlowRng, Particle};
use crate::phase::Phase;

/// Share of the path over which a pulse fades in from its source.
const HEAD_FADE: f32 = 0.08;
/// Share of the path over which a wasted pulse fades out.
const FIZZLE_SPAN: f32 = 0.12;
/// Progress range in which a wasted pulse starts to fizzle.
const FIZZLE_RANGE: (f32, f32) = (0.3, 0.85);
/// Largest sideways bow of a scatter path, relative to its chord.
const MAX_BOW: f32 = 0.5;

/// A disordered-phase pulse.
#[derive(Debug, Clone, PartialEq)]
pub struct ScatterPulse {
    /// Particle the pulse left from.
    pub source: usize,
    /// Output group the pulse heads for.
    pub destination: usize,
    /// Path start.
    pub from: Vec2,
    /// Quadratic control point bending the path.
    pub control: Vec2,
    /// Path end.
    pub to: Vec2,
    /// Position along the path, 0-1.
    pub progress: f32,
    /// Progress per second.
    pub speed: f32,
    /// Progress at which a wasted pulse has fully faded; `None` for pulses
    /// that reach their destination.
    pub fizzle_at: Option<f32>,
}

impl ScatterPulse {
    /// Current point on the path.
    pub fn position(&self) -> Vec2 {
        quadratic_point(self.from, self.control, self.to, self.progress)
    }

    /// Control points `[start, control, end]` of the stretch of path between
    /// progress `t0` and `t1`.
    pub fn segment(&self, t0: f32, t1: f32) -> [Vec2; 3] {
        // Blossom of the quadratic at (t0, t1).
        let control = self.from * ((1.0 - t0) * (1.0 - t1))
            + self.control * ((1.0 - t0) * t1 + t0 * (1.0 - t1))
            + self.to * (t0 * t1);
        [
            quadratic_point(self.from, self.control, self.to, t0),
            control,
            quadratic_point(self.from, self.control, self.to, t1),
        ]
    }

    /// Returns true if this pulse visibly arrives at its destination.
    pub fn reaches(&self) -> bool {
        self.fizzle_at.is_none()
    }

    /// Opacity factor from the fade-in at the source and, for wasted
    /// pulses, the fizzle before the destination.
    pub fn visibility(&self) -> f32 {
        let head = smoothstep(self.progress / HEAD_FADE);
        match self.fizzle_at {
            None => head,
            Some(end) => {
                let fizzle = smoothstep((self.progress - (end - FIZZLE_SPAN)) / FIZZLE_SPAN);
                head * (1.0 - fizzle)
            }
        }
    }
}

/// A settled-phase pulse travelling one connection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowPulse {
    /// Index into the layout's connection list.
    pub connection: usize,
    /// Position along the connection, 0-1.
    pub progress: f32,
    /// Progress per second.
    pub speed: f32,
}

impl FlowPulse {
    /// Current point between the connection's endpoints.
    pub fn position(&self, from: Vec2, to: Vec2) -> Vec2 {
        from.lerp(to, self.progress)
    }
}

/// Disordered-phase spawn counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScatterStats {
    /// Pulses spawned since the phase began.
    pub spawned: u64,
    /// How many of those were spawned to reach their destination.
    pub reaching: u64,
}

impl ScatterStats {
    /// Observed share of reaching pulses.
    pub fn reach_share(&self) -> f32 {
        if self.spawned == 0 {
            0.0
        } else {
            self.reaching as f32 / self.spawned as f32
        }
    }
}

/// Read-only inputs to the pulse model.
#[derive(Debug, Clone, Copy)]
pub struct PulseContext<'a> {
    /// Pulse tunables.
    pub config: &'a PulseConfig,
    /// Current particles (scatter sources).
    pub particles: &'a [Particle],
    /// Group targets in surface pixels.
    pub targets: &'a [Vec2],
    /// Output group indices.
    pub outputs: &'a [usize],
    /// Connection list.
    pub connections: &'a [Connection],
}

/// The pulses of the active phase.
#[derive(Debug, Clone, PartialEq)]
pub enum PulseField {
    /// No pulses (converging).
    Dormant,
    /// Disordered pulses.
    Scattered {
        /// Live pulses.
        pulses: Vec<ScatterPulse>,
        /// Spawn counters.
        stats: ScatterStats,
    },
    /// Settled pulses.
    Flowing {
        /// Live pulses, grouped by connection.
        pulses: Vec<FlowPulse>,
    },
}

impl PulseField {
    /// Builds the pulse set owned by `phase`.
    pub fn for_phase(phase: Phase, ctx: &PulseContext, rng: &mut FlowRng) -> Self {
        match phase {
            Phase::Disordered => {
                let mut stats = ScatterStats::default();
                let pulses = (0..ctx.config.scatter_count)
                    .map(|_| {
                        let mut pulse = spawn_scatter(ctx, rng, &mut stats);
                        // Stagger the first wave along its paths.
                        pulse.progress = rng.next_f32();
                        pulse
                    })
                    .collect();
                PulseField::Scattered { pulses, stats }
            }
            Phase::Converging => PulseField::Dormant,
            Phase::Settled => {
                let per = ctx.config.per_connection;
                let pulses = (0..ctx.connections.len())
                    .flat_map(|connection| {
                        (0..per).map(move |k| FlowPulse {
                            connection,
                            progress: k as f32 / per as f32,
                            speed: ctx.config.flow_speed,
                        })
                    })
                    .collect();
                PulseField::Flowing { pulses }
            }
        }
    }

    /// Advances every pulse by `dt_secs`.
    pub fn advance(&mut self, dt_secs: f32, ctx: &PulseContext, rng: &mut FlowRng) {
        match self {
            PulseField::Dormant => {}
            PulseField::Scattered { pulses, stats } => {
                for pulse in pulses.iter_mut() {
                    pulse.progress += pulse.speed * dt_secs;
                    if pulse.progress >= 1.0 {
                        *pulse = spawn_scatter(ctx, rng, stats);
                    }
                }
            }
            PulseField::Flowing { pulses } => {
                for pulse in pulses.iter_mut() {
                    pulse.progress = (pulse.progress + pulse.speed * dt_secs).rem_euclid(1.0);
                }
            }
        }
    }

    /// The phase that owns this pulse set.
    pub fn phase(&self) -> Phase {
        match self {
            PulseField::Dormant => Phase::Converging,
            PulseField::Scattered { .. } => Phase::Disordered,
            PulseField::Flowing { .. } => Phase::Settled,
        }
    }

    /// Number of live pulses.
    pub fn len(&self) -> usize {
        match self {
            PulseField::Dormant => 0,
            PulseField::Scattered { pulses, .. } => pulses.len(),
            PulseField::Flowing { pulses } => pulses.len(),
        }
    }

    /// Returns true if there are no live pulses.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Disordered pulses, empty in other phases.
    pub fn scattered(&self) -> &[ScatterPulse] {
        match self {
            PulseField::Scattered { pulses, .. } => pulses,
            _ => &[],
        }
    }

    /// Settled pulses, empty in other phases.
    pub fn flowing(&self) -> &[FlowPulse] {
        match self {
            PulseField::Flowing { pulses } => pulses,
            _ => &[],
        }
    }

    /// Spawn counters of the disordered phase.
    pub fn stats(&self) -> Option<ScatterStats> {
        match self {
            PulseField::Scattered { stats, .. } => Some(*stats),
            _ => None,
        }
    }
}

fn spawn_scatter(ctx: &PulseContext, rng: &mut FlowRng, stats: &mut ScatterStats) -> ScatterPulse {
    let destination = if ctx.outputs.is_empty() {
        rng.index(ctx.targets.len())
    } else {
        ctx.outputs[rng.index(ctx.outputs.len())]
    };
    let to = ctx.targets.get(destination).copied().unwrap_or(Vec2::ZERO);

    let source = rng.index(ctx.particles.len());
    let from = ctx.particles.get(source).map_or(to, |p| p.position);

    let chord = to - from;
    let normal = chord.perp().try_normalize().unwrap_or_else(|| rng.unit_circle());
    let control = (from + to) * 0.5 + normal * chord.length() * rng.range(-MAX_BOW, MAX_BOW);

    let speed = rng.range(ctx.config.scatter_speed_min, ctx.config.scatter_speed_max);
    let fizzle_at = if rng.chance(ctx.config.reach_ratio) {
        None
    } else {
        Some(rng.range(FIZZLE_RANGE.0, FIZZLE_RANGE.1))
    };

    stats.spawned += 1;
    if fizzle_at.is_none() {
        stats.reaching += 1;
    }

    ScatterPulse {
        source,
        destination,
        from,
        control,
        to,
        progress: 0.0,
        speed,
        fizzle_at,
    }
}

/// Point on a quadratic Bézier curve at `t`.
fn quadratic_point(p0: Vec2, p1: Vec2, p2: Vec2, t: f32) -> Vec2 {
    let u = 1.0 - t;
    p0 * (u * u) + p1 * (2.0 * u * t) + p2 * (t * t)
}
