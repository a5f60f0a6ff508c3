//! Colors for particles, pulses and connections.
//!
//! Colors are derived every frame from the phase and elapsed time, so the
//! types here are small `Copy` values with interpolation helpers.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// RGBA color with straight (non-premultiplied) alpha, channels in 0-1.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Rgba {
    /// Red channel (0-1).
    pub r: f32,
    /// Green channel (0-1).
    pub g: f32,
    /// Blue channel (0-1).
    pub b: f32,
    /// Alpha channel (0-1).
    pub a: f32,
}

impl Rgba {
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);
    /// Opaque white.
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);

    /// Creates a new color.
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Creates an opaque color from a hex code (e.g. `0x0B1020`).
    pub fn from_hex(hex: u32) -> Self {
        let r = ((hex >> 16) & 0xFF) as f32 / 255.0;
        let g = ((hex >> 8) & 0xFF) as f32 / 255.0;
        let b = (hex & 0xFF) as f32 / 255.0;
        Self::new(r, g, b, 1.0)
    }

    /// Returns the same color with a different alpha.
    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    /// Returns the color with alpha multiplied by `factor`.
    pub fn fade(self, factor: f32) -> Self {
        Self {
            a: (self.a * factor).clamp(0.0, 1.0),
            ..self
        }
    }

    /// Linear interpolation between two colors.
    pub fn lerp(self, other: Self, t: f32) -> Self {
        Self::new(
            self.r + (other.r - self.r) * t,
            self.g + (other.g - self.g) * t,
            self.b + (other.b - self.b) * t,
            self.a + (other.a - self.a) * t,
        )
    }

    /// Converts to HSL, dropping alpha. Grays get hue 0.
    pub fn to_hsl(self) -> Hsl {
        let max = self.r.max(self.g).max(self.b);
        let min = self.r.min(self.g).min(self.b);
        let l = (max + min) / 2.0;
        let d = max - min;

        if d < 1e-4 {
            return Hsl::new(0.0, 0.0, l);
        }

        let s = if l > 0.5 {
            d / (2.0 - max - min)
        } else {
            d / (max + min)
        };

        let h = if max == self.r {
            (self.g - self.b) / d + if self.g < self.b { 6.0 } else { 0.0 }
        } else if max == self.g {
            (self.b - self.r) / d + 2.0
        } else {
            (self.r - self.g) / d + 4.0
        };

        Hsl::new(h * 60.0, s, l)
    }

    /// Converts to 8-bit channels, clamping out-of-range values.
    pub fn to_rgba8(self) -> [u8; 4] {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }
}

/// HSL color. Hue is in degrees, saturation and lightness in 0-1.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Hsl {
    /// Hue in degrees (wraps at 360).
    pub h: f32,
    /// Saturation (0-1).
    pub s: f32,
    /// Lightness (0-1).
    pub l: f32,
}

impl Hsl {
    /// Creates a new HSL color.
    pub const fn new(h: f32, s: f32, l: f32) -> Self {
        Self { h, s, l }
    }

    /// Converts to an opaque [`Rgba`].
    pub fn to_rgba(self) -> Rgba {
        let h = self.h.rem_euclid(360.0) / 360.0;
        let s = self.s.clamp(0.0, 1.0);
        let l = self.l.clamp(0.0, 1.0);

        if s < 1e-4 {
            return Rgba::new(l, l, l, 1.0);
        }

        let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let p = 2.0 * l - q;

        Rgba::new(
            hue_to_channel(p, q, h + 1.0 / 3.0),
            hue_to_channel(p, q, h),
            hue_to_channel(p, q, h - 1.0 / 3.0),
            1.0,
        )
    }

    /// Interpolates along the shortest arc of the hue circle.
    pub fn lerp(self, other: Self, t: f32) -> Self {
        let mut dh = (other.h - self.h).rem_euclid(360.0);
        if dh > 180.0 {
            dh -= 360.0;
        }
        Self::new(
            self.h + dh * t,
            self.s + (other.s - self.s) * t,
            self.l + (other.l - self.l) * t,
        )
    }
}

fn hue_to_channel(p: f32, q: f32, t: f32) -> f32 {
    let t = t.rem_euclid(1.0);
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

/// Two-segment color ramp: `start` to `accent` over the first half of `t`,
/// then `accent` to `end` over the second half.
///
/// The accent is hit exactly at `t = 0.5` instead of blending straight
/// from start to end.
pub fn ramp_through(start: Hsl, accent: Hsl, end: Hsl, t: f32) -> Hsl {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        start.lerp(accent, t * 2.0)
    } else {
        accent.lerp(end, t * 2.0 - 1.0)
    }
}
