//! Renderer and drawing surfaces.
//!
//! The renderer is stateless: every frame it clears the surface and redraws
//! connections, particles and pulses from scratch, back to front. It never
//! touches simulation state, so a failed surface only costs the frame's
//! draw calls.
//!
//! [`Surface`] is the seam to the host's 2D API. [`DrawList`] records the
//! calls instead of drawing them, for replay onto any backend and for tests.

use glam::Vec2;

use crate::color::Rgba;
use crate::config::{Connection, Palette, RenderStyle};
use crate::easing::smoothstep;
use crate::error::SurfaceError;
use crate::particle::Particle;
use crate::phase::Phase;
use crate::pulse::PulseField;

/// Length of a scatter pulse's tail, in path progress.
const PULSE_TAIL: f32 = 0.12;
/// Tail opacity relative to the pulse head.
const PULSE_TAIL_ALPHA: f32 = 0.4;

// ============================================================================
// Surface
// ============================================================================

/// Fill color plus soft glow for a draw call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Paint {
    /// Color; alpha carries the element's opacity.
    pub color: Rgba,
    /// Extent of the glow halo in pixels. Zero draws no halo.
    pub glow: f32,
}

impl Paint {
    /// Paint without glow.
    pub fn solid(color: Rgba) -> Self {
        Self { color, glow: 0.0 }
    }

    /// Paint with a glow halo.
    pub fn glowing(color: Rgba, glow: f32) -> Self {
        Self { color, glow }
    }
}

/// A 2D drawing target.
///
/// Any call may fail; the renderer stops at the first error and the frame is
/// skipped.
pub trait Surface {
    /// Prepares a frame and reports the current surface size in pixels.
    fn begin(&mut self) -> Result<Vec2, SurfaceError>;

    /// Fills the whole surface.
    fn clear(&mut self, color: Rgba) -> Result<(), SurfaceError>;

    /// Draws a filled circle.
    fn circle(&mut self, center: Vec2, radius: f32, paint: Paint) -> Result<(), SurfaceError>;

    /// Draws a straight stroke.
    fn line(&mut self, from: Vec2, to: Vec2, width: f32, paint: Paint)
    -> Result<(), SurfaceError>;

    /// Draws a quadratic Bézier stroke.
    fn curve(
        &mut self,
        from: Vec2,
        control: Vec2,
        to: Vec2,
        width: f32,
        paint: Paint,
    ) -> Result<(), SurfaceError>;

    /// Completes the frame.
    fn finish(&mut self) -> Result<(), SurfaceError> {
        Ok(())
    }
}

/// A recorded draw call.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    /// Fill the whole surface.
    Clear(Rgba),
    /// Filled circle.
    Circle {
        /// Center.
        center: Vec2,
        /// Radius.
        radius: f32,
        /// Paint.
        paint: Paint,
    },
    /// Straight stroke.
    Line {
        /// Start.
        from: Vec2,
        /// End.
        to: Vec2,
        /// Stroke width.
        width: f32,
        /// Paint.
        paint: Paint,
    },
    /// Quadratic Bézier stroke.
    Curve {
        /// Start.
        from: Vec2,
        /// Control point.
        control: Vec2,
        /// End.
        to: Vec2,
        /// Stroke width.
        width: f32,
        /// Paint.
        paint: Paint,
    },
}

/// A surface that records draw calls for the most recent frame.
#[derive(Debug, Clone)]
pub struct DrawList {
    size: Vec2,
    commands: Vec<DrawCommand>,
    detached: bool,
}

impl DrawList {
    /// Creates a recording surface of the given size.
    pub fn new(size: Vec2) -> Self {
        Self {
            size,
            commands: Vec::new(),
            detached: false,
        }
    }

    /// Changes the reported size.
    pub fn resize(&mut self, size: Vec2) {
        self.size = size;
    }

    /// Makes every subsequent call fail with [`SurfaceError::Detached`].
    pub fn detach(&mut self) {
        self.detached = true;
    }

    /// Undoes [`detach`](Self::detach).
    pub fn attach(&mut self) {
        self.detached = false;
    }

    /// Calls recorded since the last `begin`.
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    fn push(&mut self, command: DrawCommand) -> Result<(), SurfaceError> {
        if self.detached {
            return Err(SurfaceError::Detached);
        }
        self.commands.push(command);
        Ok(())
    }
}

impl Surface for DrawList {
    fn begin(&mut self) -> Result<Vec2, SurfaceError> {
        if self.detached {
            return Err(SurfaceError::Detached);
        }
        self.commands.clear();
        Ok(self.size)
    }

    fn clear(&mut self, color: Rgba) -> Result<(), SurfaceError> {
        self.push(DrawCommand::Clear(color))
    }

    fn circle(&mut self, center: Vec2, radius: f32, paint: Paint) -> Result<(), SurfaceError> {
        self.push(DrawCommand::Circle {
            center,
            radius,
            paint,
        })
    }

    fn line(
        &mut self,
        from: Vec2,
        to: Vec2,
        width: f32,
        paint: Paint,
    ) -> Result<(), SurfaceError> {
        self.push(DrawCommand::Line {
            from,
            to,
            width,
            paint,
        })
    }

    fn curve(
        &mut self,
        from: Vec2,
        control: Vec2,
        to: Vec2,
        width: f32,
        paint: Paint,
    ) -> Result<(), SurfaceError> {
        self.push(DrawCommand::Curve {
            from,
            control,
            to,
            width,
            paint,
        })
    }
}

// ============================================================================
// Renderer
// ============================================================================

/// Everything drawn in one frame, borrowed from the engine.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    /// Current phase.
    pub phase: Phase,
    /// Transition progress (0 disordered, 1 settled).
    pub progress: f32,
    /// Size the layout was resolved for.
    pub size: Vec2,
    /// Particles.
    pub particles: &'a [Particle],
    /// Pulses.
    pub pulses: &'a PulseField,
    /// Group targets in surface pixels.
    pub targets: &'a [Vec2],
    /// Connection list.
    pub connections: &'a [Connection],
}

/// Per-frame draw counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawStats {
    /// Connection lines drawn.
    pub connections: usize,
    /// Motion streaks drawn.
    pub trails: usize,
    /// Particles drawn.
    pub particles: usize,
    /// Particles skipped as invisible.
    pub culled: usize,
    /// Pulses drawn.
    pub pulses: usize,
}

/// Draws frames onto a [`Surface`].
#[derive(Debug, Clone, Default)]
pub struct Renderer {
    palette: Palette,
    style: RenderStyle,
}

impl Renderer {
    /// Creates a renderer.
    pub fn new(palette: Palette, style: RenderStyle) -> Self {
        Self { palette, style }
    }

    /// Draws one frame.
    ///
    /// Fails with [`SurfaceError::Resized`] if the surface no longer has the
    /// size the layout was resolved for, or with the first error the surface
    /// reports.
    pub fn render(
        &self,
        frame: &Frame,
        surface: &mut dyn Surface,
    ) -> Result<DrawStats, SurfaceError> {
        let actual = surface.begin()?;
        if (actual - frame.size).abs().max_element() > 0.5 {
            return Err(SurfaceError::Resized {
                expected: frame.size,
                actual,
            });
        }

        let mut stats = DrawStats::default();
        surface.clear(self.palette.background)?;
        self.draw_connections(frame, surface, &mut stats)?;
        self.draw_particles(frame, surface, &mut stats)?;
        if frame.phase != Phase::Converging {
            self.draw_pulses(frame, surface, &mut stats)?;
        }
        surface.finish()?;
        Ok(stats)
    }

    /// Opacity of the connection lines for the frame's phase.
    pub fn connection_alpha(&self, phase: Phase, progress: f32) -> f32 {
        match phase {
            Phase::Disordered => 0.0,
            Phase::Converging => {
                let start = self.style.connection_fade_start;
                smoothstep((progress - start) / (1.0 - start).max(f32::EPSILON))
            }
            Phase::Settled => 1.0,
        }
    }

    fn draw_connections(
        &self,
        frame: &Frame,
        surface: &mut dyn Surface,
        stats: &mut DrawStats,
    ) -> Result<(), SurfaceError> {
        let alpha = self.connection_alpha(frame.phase, frame.progress);
        if alpha <= self.style.visibility_threshold {
            return Ok(());
        }
        let paint = Paint::glowing(
            self.palette.connection.fade(alpha),
            self.style.glow * self.style.line_width * alpha,
        );
        for connection in frame.connections {
            let (Some(&from), Some(&to)) = (
                frame.targets.get(connection.from),
                frame.targets.get(connection.to),
            ) else {
                continue;
            };
            surface.line(from, to, self.style.line_width, paint)?;
            stats.connections += 1;
        }
        Ok(())
    }

    fn draw_particles(
        &self,
        frame: &Frame,
        surface: &mut dyn Surface,
        stats: &mut DrawStats,
    ) -> Result<(), SurfaceError> {
        let threshold = self.style.visibility_threshold;
        let trails = self.style.trails && frame.phase == Phase::Disordered;

        for p in frame.particles {
            if !p.is_visible(threshold) || p.radius <= 0.0 {
                stats.culled += 1;
                continue;
            }
            if trails && p.previous_position.distance_squared(p.position) > 0.25 {
                let streak = p.color.fade(p.opacity * self.style.trail_alpha);
                surface.line(
                    p.previous_position,
                    p.position,
                    self.style.line_width.min(p.radius),
                    Paint::solid(streak),
                )?;
                stats.trails += 1;
            }
            surface.circle(
                p.position,
                p.radius,
                Paint::glowing(p.color.fade(p.opacity), self.style.glow * p.radius * p.opacity),
            )?;
            stats.particles += 1;
        }
        Ok(())
    }

    fn draw_pulses(
        &self,
        frame: &Frame,
        surface: &mut dyn Surface,
        stats: &mut DrawStats,
    ) -> Result<(), SurfaceError> {
        let threshold = self.style.visibility_threshold;
        let radius = self.style.pulse_radius;

        match frame.pulses {
            PulseField::Dormant => {}
            PulseField::Scattered { pulses, .. } => {
                for pulse in pulses {
                    let visibility = pulse.visibility();
                    if visibility <= threshold {
                        continue;
                    }
                    let color = self.palette.chaos_pulse.fade(visibility);
                    let [from, control, to] =
                        pulse.segment((pulse.progress - PULSE_TAIL).max(0.0), pulse.progress);
                    surface.curve(
                        from,
                        control,
                        to,
                        radius * 0.5,
                        Paint::solid(color.fade(PULSE_TAIL_ALPHA)),
                    )?;
                    surface.circle(
                        pulse.position(),
                        radius,
                        Paint::glowing(color, self.style.glow * radius * visibility),
                    )?;
                    stats.pulses += 1;
                }
            }
            PulseField::Flowing { pulses } => {
                let paint = Paint::glowing(self.palette.flow_pulse, self.style.glow * radius);
                for pulse in pulses {
                    let Some(connection) = frame.connections.get(pulse.connection) else {
                        continue;
                    };
                    let (Some(&from), Some(&to)) = (
                        frame.targets.get(connection.from),
                        frame.targets.get(connection.to),
                    ) else {
                        continue;
                    };
                    surface.circle(pulse.position(from, to), radius, paint)?;
                    stats.pulses += 1;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Layout, MotionConfig, PulseConfig};
    use crate::particle::{FlowRng, ParticleStore};
    use crate::pulse::PulseContext;

    const SIZE: Vec2 = Vec2::new(800.0, 600.0);

    struct Scene {
        layout: Layout,
        targets: Vec<Vec2>,
        store: ParticleStore,
        pulses: PulseField,
    }

    impl Scene {
        fn new(phase: Phase) -> Self {
            let layout = Layout::workflow();
            let targets = layout.resolve(SIZE);
            let mut rng = FlowRng::new(6);
            let mut store = ParticleStore::new(30);
            store.populate(&targets, SIZE, &MotionConfig::default(), &mut rng);
            for p in store.particles_mut() {
                p.opacity = 0.8;
                p.color = Rgba::WHITE;
            }
            let config = PulseConfig::default();
            let ctx = PulseContext {
                config: &config,
                particles: store.particles(),
                targets: &targets,
                outputs: &layout.outputs,
                connections: &layout.connections,
            };
            let mut pulses = PulseField::for_phase(phase, &ctx, &mut rng);
            // Past the fade-in, all reaching.
            if let PulseField::Scattered { pulses, .. } = &mut pulses {
                for pulse in pulses.iter_mut() {
                    pulse.progress = 0.2;
                    pulse.fizzle_at = None;
                }
            }
            Self {
                layout,
                targets,
                store,
                pulses,
            }
        }

        fn frame(&self, phase: Phase, progress: f32) -> Frame<'_> {
            Frame {
                phase,
                progress,
                size: SIZE,
                particles: self.store.particles(),
                pulses: &self.pulses,
                targets: &self.targets,
                connections: &self.layout.connections,
            }
        }
    }

    fn is_circle(command: &DrawCommand) -> bool {
        matches!(command, DrawCommand::Circle { .. })
    }

    #[test]
    fn test_settled_draw_order() {
        let scene = Scene::new(Phase::Settled);
        let renderer = Renderer::default();
        let mut list = DrawList::new(SIZE);

        let stats = renderer
            .render(&scene.frame(Phase::Settled, 1.0), &mut list)
            .unwrap();
        assert_eq!(stats.connections, 14);
        assert_eq!(stats.particles, 30);
        assert_eq!(stats.pulses, 56);
        assert_eq!(stats.trails, 0);

        let commands = list.commands();
        assert_eq!(commands.len(), 1 + 14 + 30 + 56);
        assert!(matches!(commands[0], DrawCommand::Clear(_)));
        assert!(
            commands[1..15]
                .iter()
                .all(|c| matches!(c, DrawCommand::Line { .. }))
        );
        assert!(commands[15..].iter().all(is_circle));

        let flow = Palette::default().flow_pulse;
        for command in &commands[45..] {
            if let DrawCommand::Circle { paint, .. } = command {
                assert_eq!(paint.color, flow);
            }
        }
    }

    #[test]
    fn test_invisible_particles_skipped() {
        let mut scene = Scene::new(Phase::Settled);
        for p in scene.store.particles_mut().iter_mut().filter(|p| !p.primary) {
            p.opacity = 0.0;
        }
        let mut list = DrawList::new(SIZE);
        let stats = Renderer::default()
            .render(&scene.frame(Phase::Settled, 1.0), &mut list)
            .unwrap();
        assert_eq!(stats.particles, 12);
        assert_eq!(stats.culled, 18);
    }

    #[test]
    fn test_glow_follows_opacity() {
        let mut scene = Scene::new(Phase::Settled);
        scene.store.particles_mut()[0].opacity = 1.0;
        scene.store.particles_mut()[1].opacity = 0.25;
        let mut list = DrawList::new(SIZE);
        Renderer::default()
            .render(&scene.frame(Phase::Settled, 1.0), &mut list)
            .unwrap();

        let glow_of = |index: usize| {
            let p = &scene.store.particles()[index];
            list.commands()
                .iter()
                .find_map(|c| match c {
                    DrawCommand::Circle { center, paint, .. } if *center == p.position => {
                        Some(paint.glow / p.radius)
                    }
                    _ => None,
                })
                .unwrap()
        };
        assert!((glow_of(0) / glow_of(1) - 4.0).abs() < 1e-3);
    }

    #[test]
    fn test_converging_has_no_pulses() {
        let scene = Scene::new(Phase::Settled);
        let renderer = Renderer::default();
        let mut list = DrawList::new(SIZE);

        let early = renderer
            .render(&scene.frame(Phase::Converging, 0.3), &mut list)
            .unwrap();
        assert_eq!(early.pulses, 0);
        assert_eq!(early.connections, 0);

        let late = renderer
            .render(&scene.frame(Phase::Converging, 0.9), &mut list)
            .unwrap();
        assert_eq!(late.pulses, 0);
        assert_eq!(late.connections, 14);
    }

    #[test]
    fn test_disordered_draws_trails_and_scatter() {
        let mut scene = Scene::new(Phase::Disordered);
        for p in scene.store.particles_mut() {
            p.previous_position = p.position - Vec2::new(3.0, 0.0);
        }
        let mut list = DrawList::new(SIZE);
        let stats = Renderer::default()
            .render(&scene.frame(Phase::Disordered, 0.0), &mut list)
            .unwrap();
        assert_eq!(stats.connections, 0);
        assert_eq!(stats.trails, 30);
        assert_eq!(stats.pulses, 24);

        let last_particle = list
            .commands()
            .iter()
            .rposition(|c| matches!(c, DrawCommand::Line { .. }))
            .unwrap();
        let first_curve = list
            .commands()
            .iter()
            .position(|c| matches!(c, DrawCommand::Curve { .. }))
            .unwrap();
        assert!(first_curve > last_particle);
    }

    #[test]
    fn test_detached_surface_fails() {
        let scene = Scene::new(Phase::Settled);
        let mut list = DrawList::new(SIZE);
        list.detach();
        let err = Renderer::default()
            .render(&scene.frame(Phase::Settled, 1.0), &mut list)
            .unwrap_err();
        assert_eq!(err, SurfaceError::Detached);
    }

    #[test]
    fn test_resized_surface_fails() {
        let scene = Scene::new(Phase::Settled);
        let mut list = DrawList::new(Vec2::new(1024.0, 768.0));
        let err = Renderer::default()
            .render(&scene.frame(Phase::Settled, 1.0), &mut list)
            .unwrap_err();
        assert!(matches!(err, SurfaceError::Resized { .. }));
        assert!(list.commands().is_empty());
    }
}
