//! Particle store.
//!
//! Holds the fixed set of particle records and nothing else: no motion and
//! no drawing. The motion model mutates the records in place once per frame.

use glam::Vec2;

use crate::color::{Hsl, Rgba};
use crate::config::MotionConfig;

/// A single particle.
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    /// Stable identity, never reused while the engine lives.
    pub id: u32,
    /// Current position in surface pixels.
    pub position: Vec2,
    /// Position on the previous frame, for velocity and trails only.
    pub previous_position: Vec2,
    /// Settled position of this particle's group.
    pub target: Vec2,
    /// Group (flowchart node) this particle belongs to.
    pub group: usize,
    /// Whether this particle represents its group in the settled phase.
    pub primary: bool,
    /// Offset from the cluster center while disordered.
    pub anchor: Vec2,
    /// Current radius, derived each frame.
    pub radius: f32,
    /// Rest radius while disordered.
    pub base_radius: f32,
    /// Current color, derived each frame.
    pub color: Rgba,
    /// Current opacity, derived each frame.
    pub opacity: f32,
}

impl Particle {
    /// Velocity estimated from the last two positions, in pixels per second.
    pub fn velocity(&self, dt_secs: f32) -> Vec2 {
        if dt_secs > 0.0 {
            (self.position - self.previous_position) / dt_secs
        } else {
            Vec2::ZERO
        }
    }

    /// Returns true if the particle would be drawn at the given threshold.
    pub fn is_visible(&self, threshold: f32) -> bool {
        self.opacity > threshold
    }
}

/// Small deterministic xorshift generator for scatter and pulse choices.
#[derive(Debug, Clone)]
pub struct FlowRng {
    state: u64,
}

impl Default for FlowRng {
    fn default() -> Self {
        Self::new(12345)
    }
}

impl FlowRng {
    /// Creates a new RNG with the given seed.
    pub fn new(seed: u64) -> Self {
        // xorshift is stuck at zero
        let state = if seed == 0 { 0x9E37_79B9_7F4A_7C15 } else { seed };
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state ^= self.state << 13;
        self.state ^= self.state >> 7;
        self.state ^= self.state << 17;
        self.state
    }

    /// Returns a random f32 in [0, 1).
    pub fn next_f32(&mut self) -> f32 {
        (self.next_u64() >> 40) as f32 / (1u64 << 24) as f32
    }

    /// Returns a random f32 in [min, max).
    pub fn range(&mut self, min: f32, max: f32) -> f32 {
        min + self.next_f32() * (max - min)
    }

    /// Returns a random index in `0..len`. `len` must be non-zero.
    pub fn index(&mut self, len: usize) -> usize {
        ((self.next_f32() * len as f32) as usize).min(len.saturating_sub(1))
    }

    /// Returns true with probability `p`.
    pub fn chance(&mut self, p: f32) -> bool {
        self.next_f32() < p
    }

    /// Returns a random unit vector.
    pub fn unit_circle(&mut self) -> Vec2 {
        let angle = self.next_f32() * std::f32::consts::TAU;
        Vec2::new(angle.cos(), angle.sin())
    }
}

/// Visual state of one particle at the moment a transition began.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrozenState {
    /// Position in surface pixels.
    pub position: Vec2,
    /// Radius.
    pub radius: f32,
    /// Opacity.
    pub opacity: f32,
    /// Color, as the start of the convergence color ramp.
    pub color: Hsl,
}

impl FrozenState {
    /// Captures the current derived state of `particle`.
    pub fn of(particle: &Particle) -> Self {
        Self {
            position: particle.position,
            radius: particle.radius,
            opacity: particle.opacity,
            color: particle.color.to_hsl(),
        }
    }

    /// Returns true if every captured value is finite.
    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.radius.is_finite() && self.opacity.is_finite()
    }
}

/// Particle states frozen at the start of a transition.
///
/// Read-only once captured; indexed like the store it was taken from.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    states: Box<[FrozenState]>,
}

impl Snapshot {
    /// Frozen state of the particle at `index`, if captured.
    pub fn get(&self, index: usize) -> Option<&FrozenState> {
        self.states.get(index)
    }

    /// Start position of the particle at `index`, if captured.
    pub fn position(&self, index: usize) -> Option<Vec2> {
        self.get(index).map(|s| s.position)
    }

    /// Number of captured particles.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Returns true if nothing was captured.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// All captured states.
    pub fn states(&self) -> &[FrozenState] {
        &self.states
    }
}

impl FromIterator<FrozenState> for Snapshot {
    fn from_iter<I: IntoIterator<Item = FrozenState>>(iter: I) -> Self {
        Self {
            states: iter.into_iter().collect(),
        }
    }
}

/// Fixed-capacity store of particle records.
#[derive(Debug, Clone)]
pub struct ParticleStore {
    particles: Vec<Particle>,
    /// Index of each group's primary particle.
    primaries: Vec<usize>,
    capacity: usize,
    next_id: u32,
}

impl ParticleStore {
    /// Creates an empty store for `capacity` particles.
    pub fn new(capacity: usize) -> Self {
        Self {
            particles: Vec::with_capacity(capacity),
            primaries: Vec::new(),
            capacity,
            next_id: 0,
        }
    }

    /// Replaces every particle with a fresh scattered one.
    ///
    /// The first particle of each group is its primary; the remaining
    /// particles are duplicates assigned to random groups. New particles get
    /// new ids.
    pub fn populate(
        &mut self,
        targets: &[Vec2],
        size: Vec2,
        motion: &MotionConfig,
        rng: &mut FlowRng,
    ) {
        self.particles.clear();
        self.primaries.clear();

        let groups = targets.len();
        if groups == 0 {
            return;
        }

        let center = size * 0.5;
        let lo = Vec2::splat(motion.margin);
        let hi = size - lo;

        for slot in 0..self.capacity {
            let primary = slot < groups;
            let group = if primary { slot } else { rng.index(groups) };
            if primary {
                self.primaries.push(slot);
            }

            let anchor = rng.unit_circle() * rng.next_f32().sqrt() * size * motion.spread;
            let position = (center + anchor).clamp(lo, hi);
            let base_radius = rng.range(motion.radius_min, motion.radius_max);

            self.particles.push(Particle {
                id: self.next_id,
                position,
                previous_position: position,
                target: targets[group],
                group,
                primary,
                anchor,
                radius: base_radius,
                base_radius,
                color: Rgba::TRANSPARENT,
                opacity: 0.0,
            });
            self.next_id = self.next_id.wrapping_add(1);
        }
    }

    /// Freezes the current position, radius, opacity and color of every
    /// particle.
    pub fn snapshot(&self) -> Snapshot {
        self.particles.iter().map(FrozenState::of).collect()
    }

    /// Number of particles.
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    /// Returns true if the store holds no particles.
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// All particles.
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// All particles, mutably.
    pub fn particles_mut(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    /// Index of each group's primary, ordered by group.
    pub fn primaries(&self) -> &[usize] {
        &self.primaries
    }

    /// The primary particle of `group`.
    pub fn primary(&self, group: usize) -> Option<&Particle> {
        self.primaries
            .get(group)
            .and_then(|&index| self.particles.get(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Layout;

    fn populated(count: usize, seed: u64) -> ParticleStore {
        let size = Vec2::new(800.0, 600.0);
        let targets = Layout::workflow().resolve(size);
        let mut store = ParticleStore::new(count);
        store.populate(&targets, size, &MotionConfig::default(), &mut FlowRng::new(seed));
        store
    }

    #[test]
    fn test_rng_ranges() {
        let mut rng = FlowRng::new(42);
        for _ in 0..1000 {
            let v = rng.next_f32();
            assert!((0.0..1.0).contains(&v));
            let i = rng.index(12);
            assert!(i < 12);
        }
    }

    #[test]
    fn test_rng_zero_seed() {
        let mut rng = FlowRng::new(0);
        let a = rng.next_f32();
        let b = rng.next_f32();
        assert!(a != b);
    }

    #[test]
    fn test_one_primary_per_group() {
        let store = populated(60, 7);
        assert_eq!(store.len(), 60);
        assert_eq!(store.primaries().len(), 12);

        let primaries: Vec<_> = store.particles().iter().filter(|p| p.primary).collect();
        assert_eq!(primaries.len(), 12);
        for group in 0..12 {
            let p = store.primary(group).unwrap();
            assert!(p.primary);
            assert_eq!(p.group, group);
        }
    }

    #[test]
    fn test_targets_follow_groups() {
        let size = Vec2::new(800.0, 600.0);
        let targets = Layout::workflow().resolve(size);
        let store = populated(60, 3);
        for p in store.particles() {
            assert!(p.group < 12);
            assert_eq!(p.target, targets[p.group]);
        }
    }

    #[test]
    fn test_scatter_inside_margin() {
        let store = populated(200, 11);
        let margin = MotionConfig::default().margin;
        for p in store.particles() {
            assert!(p.position.x >= margin && p.position.x <= 800.0 - margin);
            assert!(p.position.y >= margin && p.position.y <= 600.0 - margin);
        }
    }

    #[test]
    fn test_repopulate_issues_new_ids() {
        let size = Vec2::new(800.0, 600.0);
        let targets = Layout::workflow().resolve(size);
        let mut rng = FlowRng::new(5);
        let mut store = ParticleStore::new(20);
        store.populate(&targets, size, &MotionConfig::default(), &mut rng);
        let first: Vec<u32> = store.particles().iter().map(|p| p.id).collect();

        store.populate(&targets, size, &MotionConfig::default(), &mut rng);
        let second: Vec<u32> = store.particles().iter().map(|p| p.id).collect();

        assert_eq!(second.len(), 20);
        assert!(second.iter().all(|id| !first.contains(id)));
    }

    #[test]
    fn test_snapshot_matches_particles() {
        let mut store = populated(30, 9);
        for (i, p) in store.particles_mut().iter_mut().enumerate() {
            p.opacity = i as f32 / 30.0;
            p.radius = 2.0 + i as f32 * 0.1;
            p.color = Hsl::new(12.0 * i as f32, 0.8, 0.5).to_rgba();
        }

        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 30);
        for (i, p) in store.particles().iter().enumerate() {
            let frozen = snapshot.get(i).unwrap();
            assert_eq!(snapshot.position(i), Some(p.position));
            assert_eq!(frozen.opacity, p.opacity);
            assert_eq!(frozen.radius, p.radius);
            let back = frozen.color.to_rgba();
            assert!((back.r - p.color.r).abs() < 1e-3);
            assert!((back.g - p.color.g).abs() < 1e-3);
            assert!((back.b - p.color.b).abs() < 1e-3);
        }
        assert!(snapshot.get(30).is_none());
    }

    #[test]
    fn test_velocity_from_previous_position() {
        let store = populated(12, 1);
        let mut p = store.particles()[0].clone();
        p.previous_position = p.position - Vec2::new(2.0, 0.0);
        assert!((p.velocity(0.5) - Vec2::new(4.0, 0.0)).length() < 1e-4);
        assert_eq!(p.velocity(0.0), Vec2::ZERO);
    }
}
