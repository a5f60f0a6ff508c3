//! Engine configuration.
//!
//! Everything here is set once at construction and validated by
//! [`EngineConfig::validate`]. Group targets are given in percentage space
//! (0-100 on both axes) and resolved to surface pixels by the engine.

use glam::Vec2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::color::{Hsl, Rgba};
use crate::easing::Easing;
use crate::error::ConfigError;

/// A static edge between two groups in the settled layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Connection {
    /// Source group index.
    pub from: usize,
    /// Destination group index.
    pub to: usize,
}

impl Connection {
    /// Creates a connection from `from` to `to`.
    pub const fn new(from: usize, to: usize) -> Self {
        Self { from, to }
    }
}

/// Group targets, connections and output groups of the settled flowchart.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Layout {
    /// One target per group, in percent of surface width/height.
    pub targets: Vec<Vec2>,
    /// Edges between groups.
    pub connections: Vec<Connection>,
    /// Groups drawn as endpoints of the flow.
    pub outputs: Vec<usize>,
}

impl Default for Layout {
    fn default() -> Self {
        Self::workflow()
    }
}

impl Layout {
    /// The twelve-node workflow chart: two intakes fanning through three
    /// processing columns into three outputs.
    pub fn workflow() -> Self {
        let targets = [
            (12.0, 30.0),
            (12.0, 70.0),
            (32.0, 35.0),
            (32.0, 65.0),
            (50.0, 20.0),
            (50.0, 50.0),
            (50.0, 80.0),
            (68.0, 35.0),
            (68.0, 65.0),
            (86.0, 22.0),
            (86.0, 50.0),
            (86.0, 78.0),
        ]
        .into_iter()
        .map(|(x, y)| Vec2::new(x, y))
        .collect();

        let connections = [
            (0, 2),
            (1, 3),
            (2, 4),
            (2, 5),
            (3, 5),
            (3, 6),
            (4, 7),
            (5, 7),
            (5, 8),
            (6, 8),
            (7, 9),
            (7, 10),
            (8, 10),
            (8, 11),
        ]
        .into_iter()
        .map(|(from, to)| Connection::new(from, to))
        .collect();

        Self {
            targets,
            connections,
            outputs: vec![9, 10, 11],
        }
    }

    /// Number of groups.
    pub fn groups(&self) -> usize {
        self.targets.len()
    }

    /// Resolves percentage targets to surface coordinates.
    pub fn resolve(&self, size: Vec2) -> Vec<Vec2> {
        self.targets.iter().map(|t| *t / 100.0 * size).collect()
    }

    /// Per-group flag marking output groups.
    pub fn output_mask(&self) -> Vec<bool> {
        let mut mask = vec![false; self.groups()];
        for &group in &self.outputs {
            if let Some(slot) = mask.get_mut(group) {
                *slot = true;
            }
        }
        mask
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let groups = self.groups();
        if groups == 0 {
            return Err(ConfigError::EmptyLayout);
        }

        for (group, t) in self.targets.iter().enumerate() {
            let inside = t.is_finite()
                && (0.0..=100.0).contains(&t.x)
                && (0.0..=100.0).contains(&t.y);
            if !inside {
                return Err(ConfigError::TargetOutOfBounds {
                    group,
                    x: t.x,
                    y: t.y,
                });
            }
        }

        for first in 0..groups {
            for second in first + 1..groups {
                if self.targets[first].distance_squared(self.targets[second]) < 1e-6 {
                    return Err(ConfigError::DuplicateTarget { first, second });
                }
            }
        }

        for (index, c) in self.connections.iter().enumerate() {
            for group in [c.from, c.to] {
                if group >= groups {
                    return Err(ConfigError::ConnectionOutOfRange {
                        index,
                        group,
                        groups,
                    });
                }
            }
            if c.from == c.to {
                return Err(ConfigError::SelfConnection {
                    index,
                    group: c.from,
                });
            }
        }

        for &group in &self.outputs {
            if group >= groups {
                return Err(ConfigError::OutputOutOfRange { group, groups });
            }
        }

        Ok(())
    }
}

/// Phase durations in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Timing {
    /// Length of the converging phase. Every staggered effect finishes
    /// inside it.
    pub transition_ms: f64,
    /// Fade-in of freshly reset particles.
    pub fade_in_ms: f64,
    /// Upper bound on the frame delta fed to the pulse model.
    pub max_frame_delta_ms: f64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            transition_ms: 1800.0,
            fade_in_ms: 600.0,
            max_frame_delta_ms: 100.0,
        }
    }
}

/// How the engine leaves the disordered and settled phases.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CycleMode {
    /// Only explicit `activate`/`reset` calls change phase (besides the
    /// timed converging to settled step).
    #[default]
    Manual,
    /// Cycle on timers.
    Auto {
        /// Time spent disordered before converging.
        dwell_ms: f64,
        /// Full cycle length measured from entering disordered; the engine
        /// resets once it has elapsed.
        cycle_ms: f64,
    },
}

/// Tunables of the three motion regimes. Lengths are in surface pixels
/// unless noted.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MotionConfig {
    /// Keep-out band along the surface edges in the disordered phase.
    pub margin: f32,
    /// Radius of the initial scatter, as a fraction of the surface size.
    pub spread: f32,
    /// Amplitude of the slow wander, as a fraction of the smaller dimension.
    pub wander: f32,
    /// Angular speed of the wander in radians per second.
    pub wander_speed: f32,
    /// Amplitude of the fast jitter.
    pub jitter: f32,
    /// Smallest rest radius of a scattered particle.
    pub radius_min: f32,
    /// Largest rest radius of a scattered particle.
    pub radius_max: f32,
    /// Radius of a settled node.
    pub node_radius: f32,
    /// Largest start delay, as a fraction of the transition.
    pub stagger: f32,
    /// Share of the transition during which the spiral offset plays.
    pub spiral_window: f32,
    /// Peak radius of the spiral offset.
    pub spiral_radius: f32,
    /// Transition fraction at which the first duplicates start fading.
    pub fade_start: f32,
    /// Extra fade delay spread across groups, as a transition fraction.
    pub fade_stagger: f32,
    /// Length of each duplicate's fade, as a transition fraction.
    pub fade_length: f32,
    /// Breathing amplitude of settled nodes.
    pub breath: f32,
    /// Breathing amplitude of output nodes.
    pub output_breath: f32,
    /// Relative radius pulse of settled nodes.
    pub node_pulse: f32,
    /// Relative radius pulse of output nodes.
    pub output_pulse: f32,
    /// Curve from snapshot to target.
    pub easing: Easing,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            margin: 24.0,
            spread: 0.34,
            wander: 0.08,
            wander_speed: 0.35,
            jitter: 5.0,
            radius_min: 1.5,
            radius_max: 3.5,
            node_radius: 6.0,
            stagger: 0.25,
            spiral_window: 0.18,
            spiral_radius: 28.0,
            fade_start: 0.1,
            fade_stagger: 0.35,
            fade_length: 0.4,
            breath: 1.5,
            output_breath: 2.5,
            node_pulse: 0.08,
            output_pulse: 0.22,
            easing: Easing::Elastic,
        }
    }
}

impl MotionConfig {
    /// Sets the convergence curve.
    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    /// Sets the largest start delay.
    pub fn with_stagger(mut self, stagger: f32) -> Self {
        self.stagger = stagger;
        self
    }

    fn validate(&self, size: Vec2) -> Result<(), ConfigError> {
        in_range("motion.margin", self.margin, 0.0, size.min_element() / 2.0 - 1.0)?;
        in_range("motion.spread", self.spread, 0.0, 0.5)?;
        in_range("motion.stagger", self.stagger, 0.0, 0.9)?;
        in_range("motion.spiral_window", self.spiral_window, 0.01, 0.5)?;
        in_range("motion.radius_min", self.radius_min, 0.0, self.radius_max)?;
        in_range("motion.fade_start", self.fade_start, 0.0, 1.0)?;
        in_range("motion.fade_stagger", self.fade_stagger, 0.0, 1.0)?;
        in_range("motion.fade_length", self.fade_length, 0.01, 1.0)?;
        // The last group's fade must end inside the transition.
        in_range(
            "motion.fade_start + fade_stagger + fade_length",
            self.fade_start + self.fade_stagger + self.fade_length,
            0.0,
            1.0,
        )?;
        for (name, value) in [
            ("motion.wander", self.wander),
            ("motion.wander_speed", self.wander_speed),
            ("motion.jitter", self.jitter),
            ("motion.node_radius", self.node_radius),
            ("motion.spiral_radius", self.spiral_radius),
            ("motion.breath", self.breath),
            ("motion.output_breath", self.output_breath),
            ("motion.node_pulse", self.node_pulse),
            ("motion.output_pulse", self.output_pulse),
        ] {
            in_range(name, value, 0.0, f32::MAX)?;
        }
        Ok(())
    }
}

/// Tunables of the energy pulses.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PulseConfig {
    /// Number of pulses alive in the disordered phase.
    pub scatter_count: usize,
    /// Slowest disordered pulse, in progress per second.
    pub scatter_speed_min: f32,
    /// Fastest disordered pulse, in progress per second.
    pub scatter_speed_max: f32,
    /// Share of disordered pulses that reach their endpoint; the rest fizzle.
    pub reach_ratio: f32,
    /// Evenly spaced pulses per connection in the settled phase.
    pub per_connection: usize,
    /// Settled pulse speed, in progress per second.
    pub flow_speed: f32,
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            scatter_count: 24,
            scatter_speed_min: 0.6,
            scatter_speed_max: 1.6,
            reach_ratio: 0.25,
            per_connection: 4,
            flow_speed: 0.35,
        }
    }
}

impl PulseConfig {
    /// Sets the share of disordered pulses that reach an endpoint.
    pub fn with_reach_ratio(mut self, ratio: f32) -> Self {
        self.reach_ratio = ratio;
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        in_range("pulses.reach_ratio", self.reach_ratio, 0.0, 1.0)?;
        in_range("pulses.scatter_speed_min", self.scatter_speed_min, 0.01, f32::MAX)?;
        in_range(
            "pulses.scatter_speed_max",
            self.scatter_speed_max,
            self.scatter_speed_min,
            f32::MAX,
        )?;
        in_range("pulses.flow_speed", self.flow_speed, 0.01, f32::MAX)?;
        Ok(())
    }
}

/// Colors of every phase.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Palette {
    /// Surface clear color.
    pub background: Rgba,
    /// Base color of scattered particles.
    pub chaos: Hsl,
    /// Hue spread (degrees) across scattered particles.
    pub chaos_hue_spread: f32,
    /// Color every particle passes through mid-transition.
    pub accent: Hsl,
    /// Color of settled nodes.
    pub clarity: Hsl,
    /// Color of settled output nodes.
    pub output: Hsl,
    /// Color of connection lines at full strength.
    pub connection: Rgba,
    /// Color of disordered pulses.
    pub chaos_pulse: Rgba,
    /// Color of settled pulses.
    pub flow_pulse: Rgba,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            background: Rgba::from_hex(0x0B1020),
            chaos: Hsl::new(4.0, 0.85, 0.58),
            chaos_hue_spread: 36.0,
            accent: Hsl::new(275.0, 0.8, 0.64),
            clarity: Hsl::new(192.0, 0.85, 0.58),
            output: Hsl::new(150.0, 0.75, 0.55),
            connection: Rgba::from_hex(0x3FA9D6).with_alpha(0.35),
            chaos_pulse: Rgba::from_hex(0xFF6B4A),
            flow_pulse: Rgba::from_hex(0x7FE9FF),
        }
    }
}

/// Renderer look, independent of simulation state.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RenderStyle {
    /// Particles at or below this opacity are not drawn.
    pub visibility_threshold: f32,
    /// Glow radius relative to element radius at full opacity.
    pub glow: f32,
    /// Draw motion streaks in the disordered phase.
    pub trails: bool,
    /// Streak opacity relative to the particle.
    pub trail_alpha: f32,
    /// Connection and streak width.
    pub line_width: f32,
    /// Pulse marker radius.
    pub pulse_radius: f32,
    /// Transition fraction at which connections begin to fade in.
    pub connection_fade_start: f32,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            visibility_threshold: 0.01,
            glow: 2.5,
            trails: true,
            trail_alpha: 0.25,
            line_width: 1.5,
            pulse_radius: 2.5,
            connection_fade_start: 0.55,
        }
    }
}

/// Complete engine configuration.
///
/// # Example
///
/// ```
/// use rhizome_resin_flow::{CycleMode, EngineConfig};
///
/// let config = EngineConfig::new(800.0, 600.0)
///     .with_particle_count(60)
///     .with_cycle(CycleMode::Auto { dwell_ms: 3000.0, cycle_ms: 9000.0 });
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EngineConfig {
    /// Surface width in pixels.
    pub width: f32,
    /// Surface height in pixels.
    pub height: f32,
    /// Total particles, primaries included.
    pub particle_count: usize,
    /// Seed for scatter positions, group assignment and pulses.
    pub seed: u64,
    /// Settled flowchart.
    pub layout: Layout,
    /// Phase durations.
    pub timing: Timing,
    /// Manual or timed cycling.
    pub cycle: CycleMode,
    /// Motion tunables.
    pub motion: MotionConfig,
    /// Pulse tunables.
    pub pulses: PulseConfig,
    /// Colors.
    pub palette: Palette,
    /// Renderer look.
    pub style: RenderStyle,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(800.0, 600.0)
    }
}

impl EngineConfig {
    /// Creates the default configuration for a surface of the given size.
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            particle_count: 96,
            seed: 0x5EED_F10A,
            layout: Layout::workflow(),
            timing: Timing::default(),
            cycle: CycleMode::Manual,
            motion: MotionConfig::default(),
            pulses: PulseConfig::default(),
            palette: Palette::default(),
            style: RenderStyle::default(),
        }
    }

    /// Surface size as a vector.
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    /// Sets the particle count.
    pub fn with_particle_count(mut self, count: usize) -> Self {
        self.particle_count = count;
        self
    }

    /// Sets the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the layout.
    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    /// Sets the phase durations.
    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }

    /// Sets the cycle mode.
    pub fn with_cycle(mut self, cycle: CycleMode) -> Self {
        self.cycle = cycle;
        self
    }

    /// Sets the motion tunables.
    pub fn with_motion(mut self, motion: MotionConfig) -> Self {
        self.motion = motion;
        self
    }

    /// Sets the pulse tunables.
    pub fn with_pulses(mut self, pulses: PulseConfig) -> Self {
        self.pulses = pulses;
        self
    }

    /// Sets the palette.
    pub fn with_palette(mut self, palette: Palette) -> Self {
        self.palette = palette;
        self
    }

    /// Sets the render style.
    pub fn with_style(mut self, style: RenderStyle) -> Self {
        self.style = style;
        self
    }

    /// Checks every field, returning the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let size = self.size();
        if !(size.is_finite() && size.x > 0.0 && size.y > 0.0) {
            return Err(ConfigError::InvalidSurface {
                width: self.width,
                height: self.height,
            });
        }
        if self.particle_count == 0 {
            return Err(ConfigError::NoParticles);
        }

        self.layout.validate()?;
        let groups = self.layout.groups();
        if self.particle_count < groups {
            return Err(ConfigError::TooFewParticles {
                particles: self.particle_count,
                groups,
            });
        }

        positive("timing.transition_ms", self.timing.transition_ms)?;
        positive("timing.fade_in_ms", self.timing.fade_in_ms)?;
        positive("timing.max_frame_delta_ms", self.timing.max_frame_delta_ms)?;
        if let CycleMode::Auto { dwell_ms, cycle_ms } = self.cycle {
            positive("cycle.dwell_ms", dwell_ms)?;
            positive("cycle.cycle_ms", cycle_ms)?;
            let minimum_ms = dwell_ms + self.timing.transition_ms;
            if cycle_ms <= minimum_ms {
                return Err(ConfigError::CycleTooShort {
                    cycle_ms,
                    minimum_ms,
                });
            }
        }

        self.motion.validate(size)?;
        self.pulses.validate()?;
        in_range(
            "style.visibility_threshold",
            self.style.visibility_threshold,
            0.0,
            1.0,
        )?;
        in_range(
            "style.connection_fade_start",
            self.style.connection_fade_start,
            0.0,
            0.99,
        )?;
        Ok(())
    }

    /// Parses and validates a JSON configuration. Missing fields take
    /// their defaults.
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

fn positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidDuration { name, value })
    }
}

fn in_range(name: &'static str, value: f32, min: f32, max: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= min && value <= max {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            name,
            value,
            min,
            max,
        })
    }
}
