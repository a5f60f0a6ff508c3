//! Error types for resin-flow.

use glam::Vec2;
use thiserror::Error;

/// Errors raised while validating an [`EngineConfig`](crate::EngineConfig).
///
/// Configuration problems fail construction outright; nothing is clamped
/// to a fallback value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// The particle count is zero.
    #[error("particle count must be at least 1")]
    NoParticles,

    /// The layout has no group targets.
    #[error("layout must define at least one group target")]
    EmptyLayout,

    /// Fewer particles than groups, so some group would lack a primary.
    #[error("{particles} particles cannot cover {groups} groups (one primary per group)")]
    TooFewParticles {
        /// Configured particle count.
        particles: usize,
        /// Number of groups in the layout.
        groups: usize,
    },

    /// A connection references a group index that does not exist.
    #[error("connection {index} references group {group}, but only {groups} groups exist")]
    ConnectionOutOfRange {
        /// Connection index in the layout.
        index: usize,
        /// Offending group index.
        group: usize,
        /// Number of groups in the layout.
        groups: usize,
    },

    /// A connection joins a group to itself.
    #[error("connection {index} joins group {group} to itself")]
    SelfConnection {
        /// Connection index in the layout.
        index: usize,
        /// The group on both ends.
        group: usize,
    },

    /// An output group index does not exist.
    #[error("output group {group} is out of range ({groups} groups)")]
    OutputOutOfRange {
        /// Offending group index.
        group: usize,
        /// Number of groups in the layout.
        groups: usize,
    },

    /// Two groups share the same target point.
    #[error("groups {first} and {second} share the same target")]
    DuplicateTarget {
        /// First group index.
        first: usize,
        /// Second group index.
        second: usize,
    },

    /// A target lies outside the 0-100 percentage layout space.
    #[error("target for group {group} ({x}, {y}) lies outside the 0-100 layout space")]
    TargetOutOfBounds {
        /// Group index.
        group: usize,
        /// Target x in percent.
        x: f32,
        /// Target y in percent.
        y: f32,
    },

    /// Surface dimensions are not positive and finite.
    #[error("surface size must be positive and finite, got {width}x{height}")]
    InvalidSurface {
        /// Configured width.
        width: f32,
        /// Configured height.
        height: f32,
    },

    /// A duration is zero, negative or not finite.
    #[error("{name} must be positive and finite, got {value}")]
    InvalidDuration {
        /// Name of the timing field.
        name: &'static str,
        /// Configured value in milliseconds.
        value: f64,
    },

    /// The auto-cycle period cannot fit the dwell and transition.
    #[error("auto cycle of {cycle_ms} ms must exceed dwell plus transition ({minimum_ms} ms)")]
    CycleTooShort {
        /// Configured cycle length.
        cycle_ms: f64,
        /// Dwell plus transition duration.
        minimum_ms: f64,
    },

    /// A tunable lies outside its permitted range.
    #[error("{name} must lie in [{min}, {max}], got {value}")]
    OutOfRange {
        /// Name of the tunable.
        name: &'static str,
        /// Configured value.
        value: f32,
        /// Inclusive lower bound.
        min: f32,
        /// Inclusive upper bound.
        max: f32,
    },

    /// The configuration document could not be parsed.
    #[cfg(feature = "serde")]
    #[error("config parse error: {0}")]
    Parse(String),
}

/// Errors reported by a drawing [`Surface`](crate::Surface).
///
/// A surface error only ever skips the current frame's draw calls.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SurfaceError {
    /// The surface is no longer attached to anything that can be drawn on.
    #[error("surface is detached")]
    Detached,

    /// The surface size no longer matches the engine's layout.
    #[error("surface resized: expected {expected}, got {actual}")]
    Resized {
        /// Size the engine was built for.
        expected: Vec2,
        /// Size the surface reported.
        actual: Vec2,
    },

    /// A backend-specific draw failure.
    #[error("draw call failed: {0}")]
    Draw(String),
}
