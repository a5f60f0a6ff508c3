//! Motion model.
//!
//! Three regimes, one per phase, each a pure function from a particle and
//! the phase clock to a [`Pose`]. [`advance`] applies the regime to the
//! whole store once per frame.
//!
//! - Disordered: slow per-particle wander plus layered jitter around a
//!   drifting cluster center, clamped inside the surface margin.
//! - Converging: eased interpolation from the frozen snapshot to the group
//!   target, staggered by path length, with a brief spiral flourish and a
//!   two-segment color ramp. Duplicates fade out on a per-group schedule.
//! - Settled: primaries breathe around their targets; duplicates stay hidden.

use std::f32::consts::TAU;

use glam::Vec2;

use crate::color::{Hsl, Rgba, ramp_through};
use crate::config::{MotionConfig, Palette};
use crate::easing::smoothstep;
use crate::particle::{FrozenState, Particle, Snapshot};
use crate::phase::Phase;

/// One oscillator term: weight, rate in rad/s, multiplier on the particle's
/// phase offset.
type Wave = (f32, f32, f32);

/// Opacity of a scattered particle before shimmer.
const CHAOS_OPACITY: f32 = 0.6;
/// Relative depth of the scattered opacity shimmer.
const CHAOS_FLICKER: f32 = 0.25;
const FLICKER_WAVE: Wave = (1.0, 1.9, 1.1);
/// Relative depth of the scattered radius shimmer.
const CHAOS_SWELL: f32 = 0.25;
const SWELL_WAVE: Wave = (1.0, 2.3, 1.0);

/// Drift of the cluster center as a fraction of the surface size.
const DRIFT_AMPLITUDE: Vec2 = Vec2::new(0.04, 0.05);
/// Drift rate per axis, in rad/s.
const DRIFT_RATE: Vec2 = Vec2::new(0.21, 0.17);
/// Fixed offset between the two drift axes, in radians.
const DRIFT_Y_OFFSET: f32 = 1.3;

/// Vertical wander rate relative to `wander_speed`.
const WANDER_Y_RATE: f32 = 0.8;
const WANDER_Y_PHASE: f32 = 1.3;

const JITTER_X: [Wave; 2] = [(1.0, 3.1, 2.0), (0.5, 7.3, 3.7)];
const JITTER_Y: [Wave; 2] = [(1.0, 2.7, 1.9), (0.5, 6.1, 5.3)];
/// Sum of the jitter weights; normalizes the peak to `jitter`.
const JITTER_PEAK: f32 = 1.5;

/// Hue wobble of a scattered particle, in degrees.
const HUE_WOBBLE_DEG: f32 = 6.0;
const HUE_WOBBLE_WAVE: Wave = (1.0, 1.7, 1.0);
/// Salt separating the hue hash from the motion hash.
const HUE_SALT: u32 = 0x5bd1_e995;

/// Scales `s (1 - s)^2` so its peak (at s = 1/3) is 1.
const SPIRAL_GAIN: f32 = 6.75;
/// Turns made over the spiral window.
const SPIRAL_TURNS: f32 = 1.5;
/// Fraction of its radius a duplicate loses while fading.
const DUPLICATE_SHRINK: f32 = 0.5;

/// Relative weight of the faster of the two settled breathing terms.
const BREATH_OVERTONE: f32 = 0.35;
const BREATH_X: [Wave; 2] = [(1.0, 1.3, 1.0), (BREATH_OVERTONE, 4.7, 2.1)];
const BREATH_Y: [Wave; 2] = [(1.0, 1.1, 0.7), (BREATH_OVERTONE, 5.3, 1.7)];
const NODE_PULSE_WAVE: Wave = (1.0, 2.0, 1.0);
/// Seconds over which settled breathing ramps up from zero.
const SETTLE_EASE_IN_SECS: f32 = 0.4;

/// Per-frame inputs shared by every particle.
#[derive(Debug, Clone, Copy)]
pub struct MotionContext<'a> {
    /// Motion tunables.
    pub config: &'a MotionConfig,
    /// Phase colors.
    pub palette: &'a Palette,
    /// Surface size in pixels.
    pub size: Vec2,
    /// Number of groups.
    pub groups: usize,
    /// Output flag per group.
    pub outputs: &'a [bool],
    /// Fade-in length after a reset.
    pub fade_in_ms: f64,
}

impl MotionContext<'_> {
    fn is_output(&self, group: usize) -> bool {
        self.outputs.get(group).copied().unwrap_or(false)
    }

    fn settled_color(&self, group: usize) -> Hsl {
        if self.is_output(group) {
            self.palette.output
        } else {
            self.palette.clarity
        }
    }
}

/// The active motion regime and the inputs only it needs.
#[derive(Debug, Clone, Copy)]
pub enum Regime<'a> {
    /// Chaotic drift.
    Disordered {
        /// Time since the phase began.
        elapsed_ms: f64,
    },
    /// Eased convergence toward the targets.
    Converging {
        /// Time since the phase began.
        elapsed_ms: f64,
        /// Fixed transition length.
        duration_ms: f64,
        /// Particle states frozen on entry; `None` falls back to each
        /// particle's current state.
        snapshot: Option<&'a Snapshot>,
    },
    /// Settled oscillation.
    Settled {
        /// Time since the phase began.
        elapsed_ms: f64,
    },
}

impl Regime<'_> {
    /// The phase this regime animates.
    pub fn phase(&self) -> Phase {
        match self {
            Regime::Disordered { .. } => Phase::Disordered,
            Regime::Converging { .. } => Phase::Converging,
            Regime::Settled { .. } => Phase::Settled,
        }
    }
}

/// Derived per-frame visual state of one particle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    /// Position in surface pixels.
    pub position: Vec2,
    /// Radius.
    pub radius: f32,
    /// Color.
    pub color: Rgba,
    /// Opacity.
    pub opacity: f32,
}

impl Pose {
    fn apply(self, particle: &mut Particle) {
        particle.position = self.position;
        particle.radius = self.radius;
        particle.color = self.color;
        particle.opacity = self.opacity;
    }
}

/// Deterministic per-particle fraction in [0, 1) derived from the id.
fn hash01(id: u32) -> f32 {
    (id.wrapping_mul(0x9E37_79B1) >> 8) as f32 / (1u32 << 24) as f32
}

/// Per-particle phase offset in radians.
fn phase_offset(id: u32) -> f32 {
    hash01(id) * TAU
}

/// Angle `rate * t + offset` with the time term reduced in f64, so phases
/// that run for hours keep full f32 resolution.
fn angle(t_secs: f64, rate: f32, offset: f32) -> f32 {
    (t_secs * f64::from(rate)).rem_euclid(std::f64::consts::TAU) as f32 + offset
}

fn sin_wave(&(weight, rate, k): &Wave, t_secs: f64, phase: f32) -> f32 {
    weight * angle(t_secs, rate, phase * k).sin()
}

fn cos_wave(&(weight, rate, k): &Wave, t_secs: f64, phase: f32) -> f32 {
    weight * angle(t_secs, rate, phase * k).cos()
}

/// Scattered color of a particle at `t_secs` into the phase.
pub fn chaos_color(id: u32, palette: &Palette, t_secs: f64) -> Hsl {
    let hue = palette.chaos.h
        + palette.chaos_hue_spread * hash01(id ^ HUE_SALT)
        + HUE_WOBBLE_DEG * sin_wave(&HUE_WOBBLE_WAVE, t_secs, phase_offset(id));
    Hsl::new(hue, palette.chaos.s, palette.chaos.l)
}

/// Pose of a particle in the disordered regime.
pub fn disordered_pose(p: &Particle, ctx: &MotionContext, elapsed_ms: f64) -> Pose {
    let c = ctx.config;
    let t = elapsed_ms / 1000.0;
    let phase = phase_offset(p.id);
    let size = ctx.size;

    let drift = Vec2::new(
        angle(t, DRIFT_RATE.x, 0.0).sin(),
        angle(t, DRIFT_RATE.y, DRIFT_Y_OFFSET).sin(),
    );
    let center = size * 0.5 + drift * DRIFT_AMPLITUDE * size;

    let reach = c.wander * size.min_element();
    let wander = Vec2::new(
        angle(t, c.wander_speed, phase).sin(),
        angle(t, c.wander_speed * WANDER_Y_RATE, phase * WANDER_Y_PHASE).cos(),
    ) * reach;

    let jitter = Vec2::new(
        JITTER_X.iter().map(|w| sin_wave(w, t, phase)).sum(),
        JITTER_Y.iter().map(|w| cos_wave(w, t, phase)).sum(),
    ) * (c.jitter / JITTER_PEAK);

    let lo = Vec2::splat(c.margin);
    let position = (center + p.anchor + wander + jitter).clamp(lo, size - lo);

    let fade_in = smoothstep((elapsed_ms / ctx.fade_in_ms) as f32);
    let flicker = 1.0 + CHAOS_FLICKER * sin_wave(&FLICKER_WAVE, t, phase);

    Pose {
        position,
        radius: p.base_radius * (1.0 + CHAOS_SWELL * sin_wave(&SWELL_WAVE, t, phase)),
        color: chaos_color(p.id, ctx.palette, t).to_rgba(),
        opacity: (CHAOS_OPACITY * flicker * fade_in).clamp(0.0, 1.0),
    }
}

/// Normalized local progress of a particle whose path runs from `start` to
/// `target`.
///
/// Shorter paths get a smaller start delay, so they begin moving first;
/// every path still reaches 1 exactly at `duration_ms`.
pub fn convergence_progress(
    start: Vec2,
    target: Vec2,
    size: Vec2,
    stagger: f32,
    elapsed_ms: f64,
    duration_ms: f64,
) -> f32 {
    let max_dist = size.length().max(f32::EPSILON);
    let share = (start.distance(target) / max_dist).clamp(0.0, 1.0);
    let duration = duration_ms as f32;
    let delay = stagger * share * duration;
    let span = (duration - delay).max(f32::EPSILON);
    ((elapsed_ms as f32 - delay) / span).clamp(0.0, 1.0)
}

/// Pose of a particle in the converging regime, starting from the state
/// frozen on entry.
///
/// At zero elapsed the pose equals `start`; position, opacity, radius and
/// color all continue from there.
pub fn converging_pose(
    p: &Particle,
    start: &FrozenState,
    ctx: &MotionContext,
    elapsed_ms: f64,
    duration_ms: f64,
) -> Pose {
    let c = ctx.config;
    let duration_ms = duration_ms.max(1.0);
    let elapsed_ms = elapsed_ms.clamp(0.0, duration_ms);
    let phase_t = (elapsed_ms / duration_ms) as f32;
    let from = if start.position.is_finite() {
        start.position
    } else {
        p.target
    };

    let local = convergence_progress(from, p.target, ctx.size, c.stagger, elapsed_ms, duration_ms);
    let mut position = from.lerp(p.target, c.easing.ease(local));

    if phase_t < c.spiral_window {
        let s = phase_t / c.spiral_window;
        let envelope = SPIRAL_GAIN * s * (1.0 - s) * (1.0 - s);
        let angle = phase_offset(p.id) + s * TAU * SPIRAL_TURNS;
        position += Vec2::from_angle(angle) * c.spiral_radius * envelope;
    }

    let color = ramp_through(
        start.color,
        ctx.palette.accent,
        ctx.settled_color(p.group),
        phase_t,
    )
    .to_rgba();

    let (opacity, radius) = if p.primary {
        let grow = smoothstep(phase_t);
        // Both reach their settled values exactly at the end.
        (
            1.0 - (1.0 - start.opacity) * (1.0 - grow),
            c.node_radius + (start.radius - c.node_radius) * (1.0 - smoothstep(local)),
        )
    } else {
        let share = p.group as f32 / ctx.groups.max(1) as f32;
        let fade_from = c.fade_start + c.fade_stagger * share;
        let fade = smoothstep((phase_t - fade_from) / c.fade_length);
        (
            start.opacity * (1.0 - fade),
            start.radius * (1.0 - DUPLICATE_SHRINK * fade),
        )
    };

    Pose {
        position,
        radius,
        color,
        opacity,
    }
}

/// Pose of a particle in the settled regime.
pub fn settled_pose(p: &Particle, ctx: &MotionContext, elapsed_ms: f64) -> Pose {
    let color = ctx.settled_color(p.group).to_rgba();
    if !p.primary {
        return Pose {
            position: p.target,
            radius: 0.0,
            color,
            opacity: 0.0,
        };
    }

    let c = ctx.config;
    let t = elapsed_ms / 1000.0;
    let phase = phase_offset(p.id);
    let ease_in = smoothstep(t as f32 / SETTLE_EASE_IN_SECS);
    let output = ctx.is_output(p.group);

    let amp = if output { c.output_breath } else { c.breath } * ease_in;
    let breathe = Vec2::new(
        BREATH_X.iter().map(|w| sin_wave(w, t, phase)).sum(),
        BREATH_Y.iter().map(|w| cos_wave(w, t, phase)).sum(),
    ) * amp;

    let pulse = if output { c.output_pulse } else { c.node_pulse } * ease_in;

    Pose {
        position: p.target + breathe,
        radius: c.node_radius * (1.0 + pulse * sin_wave(&NODE_PULSE_WAVE, t, phase)),
        color,
        opacity: 1.0,
    }
}

/// Applies one frame of the regime to every particle.
///
/// `previous_position` is updated before the new pose lands.
pub fn advance(particles: &mut [Particle], regime: &Regime, ctx: &MotionContext) {
    for (index, p) in particles.iter_mut().enumerate() {
        let pose = match *regime {
            Regime::Disordered { elapsed_ms } => disordered_pose(p, ctx, elapsed_ms),
            Regime::Converging {
                elapsed_ms,
                duration_ms,
                snapshot,
            } => {
                let start = snapshot
                    .and_then(|s| s.get(index))
                    .filter(|s| s.is_finite())
                    .copied()
                    .unwrap_or_else(|| FrozenState::of(p));
                converging_pose(p, &start, ctx, elapsed_ms, duration_ms)
            }
            Regime::Settled { elapsed_ms } => settled_pose(p, ctx, elapsed_ms),
        };
        p.previous_position = p.position;
        pose.apply(p);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Layout;
    use crate::particle::{FlowRng, ParticleStore};

    const SIZE: Vec2 = Vec2::new(800.0, 600.0);
    const DURATION: f64 = 1800.0;

    struct Fixture {
        config: MotionConfig,
        palette: Palette,
        outputs: Vec<bool>,
        store: ParticleStore,
    }

    impl Fixture {
        fn new(count: usize) -> Self {
            let layout = Layout::workflow();
            let config = MotionConfig::default();
            let mut store = ParticleStore::new(count);
            store.populate(&layout.resolve(SIZE), SIZE, &config, &mut FlowRng::new(21));
            let mut fx = Self {
                config,
                palette: Palette::default(),
                outputs: layout.output_mask(),
                store,
            };

            // Give every particle a scattered pose to converge from.
            let (palette, outputs) = (fx.palette, fx.outputs.clone());
            let ctx = MotionContext {
                config: &config,
                palette: &palette,
                size: SIZE,
                groups: 12,
                outputs: &outputs,
                fade_in_ms: 600.0,
            };
            let regime = Regime::Disordered { elapsed_ms: 2000.0 };
            advance(fx.store.particles_mut(), &regime, &ctx);
            fx
        }

        fn ctx(&self) -> MotionContext<'_> {
            MotionContext {
                config: &self.config,
                palette: &self.palette,
                size: SIZE,
                groups: 12,
                outputs: &self.outputs,
                fade_in_ms: 600.0,
            }
        }
    }

    #[test]
    fn test_disordered_stays_inside_margin() {
        let fx = Fixture::new(120);
        let ctx = fx.ctx();
        let margin = fx.config.margin;
        for step in 0..200 {
            let elapsed = step as f64 * 97.0;
            for p in fx.store.particles() {
                let pose = disordered_pose(p, &ctx, elapsed);
                assert!(pose.position.is_finite());
                assert!(pose.position.x >= margin && pose.position.x <= SIZE.x - margin);
                assert!(pose.position.y >= margin && pose.position.y <= SIZE.y - margin);
            }
        }
    }

    #[test]
    fn test_disordered_is_deterministic_and_unsynchronized() {
        let fx = Fixture::new(24);
        let ctx = fx.ctx();
        let a = &fx.store.particles()[0];
        let b = &fx.store.particles()[1];
        assert_eq!(disordered_pose(a, &ctx, 1234.0), disordered_pose(a, &ctx, 1234.0));

        let ra = disordered_pose(a, &ctx, 1234.0).radius / a.base_radius;
        let rb = disordered_pose(b, &ctx, 1234.0).radius / b.base_radius;
        assert!((ra - rb).abs() > 1e-4, "particles shimmer in lockstep");
    }

    #[test]
    fn test_disordered_fades_in() {
        let fx = Fixture::new(12);
        let ctx = fx.ctx();
        let p = &fx.store.particles()[0];
        assert_eq!(disordered_pose(p, &ctx, 0.0).opacity, 0.0);
        assert!(disordered_pose(p, &ctx, 2000.0).opacity > 0.3);
    }

    #[test]
    fn test_converging_starts_at_snapshot() {
        let fx = Fixture::new(60);
        let ctx = fx.ctx();
        for p in fx.store.particles() {
            let start = FrozenState {
                position: p.position + Vec2::new(13.0, -7.0),
                ..FrozenState::of(p)
            };
            let pose = converging_pose(p, &start, &ctx, 0.0, DURATION);
            assert_eq!(pose.position, start.position);
        }
    }

    #[test]
    fn test_converging_ends_at_target() {
        let fx = Fixture::new(60);
        let ctx = fx.ctx();
        for p in fx.store.particles() {
            let pose = converging_pose(p, &FrozenState::of(p), &ctx, DURATION, DURATION);
            assert!((pose.position - p.target).length() < 1e-3);
            if p.primary {
                assert_eq!(pose.opacity, 1.0);
                assert!((pose.radius - fx.config.node_radius).abs() < 1e-4);
            } else {
                assert_eq!(pose.opacity, 0.0);
            }
        }
    }

    #[test]
    fn test_duplicates_hidden_before_transition_ends() {
        let fx = Fixture::new(96);
        let ctx = fx.ctx();
        let c = &fx.config;
        let deadline = (c.fade_start + c.fade_stagger + c.fade_length) as f64 * DURATION;
        for p in fx.store.particles().iter().filter(|p| !p.primary) {
            let pose = converging_pose(p, &FrozenState::of(p), &ctx, deadline, DURATION);
            assert_eq!(pose.opacity, 0.0, "group {} still visible", p.group);
        }
    }

    #[test]
    fn test_duplicate_fades_staggered_by_group() {
        let fx = Fixture::new(12);
        let ctx = fx.ctx();
        let mut early = fx.store.particles()[0].clone();
        early.primary = false;
        early.group = 0;
        let mut late = early.clone();
        late.group = 11;

        let mid = 0.35 * DURATION;
        let start = FrozenState::of(&early);
        let early_pose = converging_pose(&early, &start, &ctx, mid, DURATION);
        let late_pose = converging_pose(&late, &start, &ctx, mid, DURATION);
        assert!(early_pose.opacity < late_pose.opacity);
    }

    #[test]
    fn test_short_paths_start_first() {
        let target = Vec2::new(400.0, 300.0);
        let near = target + Vec2::new(30.0, 0.0);
        let far = target + Vec2::new(350.0, 250.0);

        let elapsed = 150.0;
        let near_t = convergence_progress(near, target, SIZE, 0.25, elapsed, DURATION);
        let far_t = convergence_progress(far, target, SIZE, 0.25, elapsed, DURATION);
        assert!(near_t > 0.0);
        assert!(near_t > far_t);

        assert_eq!(convergence_progress(far, target, SIZE, 0.25, DURATION, DURATION), 1.0);
    }

    #[test]
    fn test_spiral_offset_decays() {
        let fx = Fixture::new(12);
        let ctx = fx.ctx();
        let p = &fx.store.particles()[0];
        let start = FrozenState::of(p);
        let window_ms = fx.config.spiral_window as f64 * DURATION;

        let plain = |elapsed: f64| {
            let from = start.position;
            let local = convergence_progress(from, p.target, SIZE, fx.config.stagger, elapsed, DURATION);
            from.lerp(p.target, fx.config.easing.ease(local))
        };

        let during = converging_pose(p, &start, &ctx, window_ms / 3.0, DURATION);
        assert!((during.position - plain(window_ms / 3.0)).length() > 1.0);

        let after = converging_pose(p, &start, &ctx, window_ms * 1.5, DURATION);
        assert!((after.position - plain(window_ms * 1.5)).length() < 1e-4);
    }

    #[test]
    fn test_color_passes_through_accent() {
        let fx = Fixture::new(12);
        let ctx = fx.ctx();
        let p = &fx.store.particles()[2];
        let mid = converging_pose(p, &FrozenState::of(p), &ctx, DURATION / 2.0, DURATION);
        let accent = fx.palette.accent.to_rgba();
        assert!((mid.color.r - accent.r).abs() < 1e-3);
        assert!((mid.color.g - accent.g).abs() < 1e-3);
        assert!((mid.color.b - accent.b).abs() < 1e-3);
    }

    #[test]
    fn test_missing_snapshot_falls_back_to_current_position() {
        let mut fx = Fixture::new(30);
        let before: Vec<Vec2> = fx.store.particles().iter().map(|p| p.position).collect();
        let regime = Regime::Converging {
            elapsed_ms: 0.0,
            duration_ms: DURATION,
            snapshot: None,
        };
        let config = fx.config;
        let palette = fx.palette;
        let outputs = fx.outputs.clone();
        let ctx = MotionContext {
            config: &config,
            palette: &palette,
            size: SIZE,
            groups: 12,
            outputs: &outputs,
            fade_in_ms: 600.0,
        };
        advance(fx.store.particles_mut(), &regime, &ctx);
        for (p, start) in fx.store.particles().iter().zip(&before) {
            assert!(p.position.is_finite());
            assert_eq!(p.position, *start);
            assert_eq!(p.previous_position, *start);
        }
    }

    #[test]
    fn test_non_finite_start_never_yields_nan() {
        let fx = Fixture::new(12);
        let ctx = fx.ctx();
        let p = &fx.store.particles()[4];
        let start = FrozenState {
            position: Vec2::new(f32::NAN, 3.0),
            ..FrozenState::of(p)
        };
        let pose = converging_pose(p, &start, &ctx, 900.0, DURATION);
        assert!(pose.position.is_finite());
    }

    #[test]
    fn test_converging_continues_visual_state() {
        let fx = Fixture::new(60);
        let ctx = fx.ctx();
        for p in fx.store.particles() {
            let start = FrozenState::of(p);
            let pose = converging_pose(p, &start, &ctx, 0.0, DURATION);
            assert!((pose.opacity - p.opacity).abs() < 1e-5, "opacity of {}", p.id);
            assert!((pose.radius - p.radius).abs() < 1e-4, "radius of {}", p.id);
            assert!((pose.color.r - p.color.r).abs() < 1e-3);
            assert!((pose.color.g - p.color.g).abs() < 1e-3);
            assert!((pose.color.b - p.color.b).abs() < 1e-3);
        }
    }

    #[test]
    fn test_converging_from_faint_start_has_no_pop() {
        let fx = Fixture::new(24);
        let ctx = fx.ctx();
        for p in fx.store.particles() {
            let start = FrozenState {
                opacity: 0.02,
                ..FrozenState::of(p)
            };
            let first = converging_pose(p, &start, &ctx, 16.0, DURATION);
            assert!(first.opacity < 0.05, "{} jumped to {}", p.id, first.opacity);
        }
    }

    #[test]
    fn test_waves_stay_smooth_after_hours() {
        let fx = Fixture::new(12);
        let ctx = fx.ctx();
        let p = fx.store.primary(10).unwrap();
        let hours = 9.0 * 3600.0 * 1000.0;
        let mut last = settled_pose(p, &ctx, hours);
        for i in 1..60 {
            let pose = settled_pose(p, &ctx, hours + i as f64 * 16.0);
            let step = (pose.position - last.position).length();
            assert!(step > 0.0 && step < 0.5, "step {step} at frame {i}");
            last = pose;
        }
    }

    #[test]
    fn test_settled_breathes_near_target() {
        let fx = Fixture::new(40);
        let ctx = fx.ctx();
        let bound = fx.config.output_breath * std::f32::consts::SQRT_2 * (1.0 + BREATH_OVERTONE) + 1e-3;
        for step in 0..100 {
            for p in fx.store.particles() {
                let pose = settled_pose(p, &ctx, step as f64 * 53.0);
                if p.primary {
                    assert!((pose.position - p.target).length() <= bound);
                    assert_eq!(pose.opacity, 1.0);
                } else {
                    assert_eq!(pose.opacity, 0.0);
                }
            }
        }
    }

    #[test]
    fn test_settled_starts_exactly_on_target() {
        let fx = Fixture::new(12);
        let ctx = fx.ctx();
        for p in fx.store.particles() {
            let pose = settled_pose(p, &ctx, 0.0);
            assert_eq!(pose.position, p.target);
        }
    }

    #[test]
    fn test_outputs_pulse_harder() {
        let fx = Fixture::new(12);
        let ctx = fx.ctx();
        let swing = |group: usize| {
            let p = fx.store.primary(group).unwrap();
            let radii: Vec<f32> = (0..400)
                .map(|i| settled_pose(p, &ctx, 1000.0 + i as f64 * 16.0).radius)
                .collect();
            let max = radii.iter().cloned().fold(f32::MIN, f32::max);
            let min = radii.iter().cloned().fold(f32::MAX, f32::min);
            max - min
        };
        assert!(swing(10) > swing(5));
    }

    #[test]
    fn test_regime_phase_tags() {
        assert_eq!(Regime::Disordered { elapsed_ms: 0.0 }.phase(), Phase::Disordered);
        assert_eq!(
            Regime::Converging {
                elapsed_ms: 0.0,
                duration_ms: 1.0,
                snapshot: None
            }
            .phase(),
            Phase::Converging
        );
        assert_eq!(Regime::Settled { elapsed_ms: 0.0 }.phase(), Phase::Settled);
    }
}
